use anyhow::anyhow;
use async_trait::async_trait;
use subs_types::subscription::repository::{RepositoryError, SubscriptionRepository};
use subs_types::subscription::{NewSubscription, Subscription, TotalCostFilter};
use subs_types::Deadline;
use tokio::sync::RwLock;
use typesafe_repository::{IdentityOf, Repository};
use uuid::Uuid;

/// Process-local store. Records are kept in creation order.
#[derive(Default)]
pub struct InMemorySubscriptionRepository {
    items: RwLock<Vec<Subscription>>,
}

impl InMemorySubscriptionRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Repository<Subscription> for InMemorySubscriptionRepository {
    type Error = RepositoryError;
}

#[async_trait]
impl SubscriptionRepository for InMemorySubscriptionRepository {
    async fn ping(&self, deadline: &Deadline) -> Result<(), RepositoryError> {
        deadline.check()
    }

    async fn add(
        &self,
        deadline: &Deadline,
        sub: NewSubscription,
    ) -> Result<Subscription, RepositoryError> {
        let mut items = self.items.write().await;
        deadline.check()?;
        let sub = sub.with_id(Uuid::new_v4());
        items.push(sub.clone());
        log::debug!("Added subscription {} ({} total)", sub.id, items.len());
        Ok(sub)
    }

    async fn update(&self, deadline: &Deadline, sub: Subscription) -> Result<(), RepositoryError> {
        let mut items = self.items.write().await;
        deadline.check()?;
        let slot = items
            .iter_mut()
            .find(|s| s.id == sub.id)
            .ok_or(RepositoryError::NotFound)?;
        *slot = sub;
        Ok(())
    }

    async fn remove(
        &self,
        deadline: &Deadline,
        id: &IdentityOf<Subscription>,
    ) -> Result<(), RepositoryError> {
        let mut items = self.items.write().await;
        deadline.check()?;
        let pos = items
            .iter()
            .position(|s| &s.id == id)
            .ok_or(RepositoryError::NotFound)?;
        items.remove(pos);
        Ok(())
    }

    async fn get(
        &self,
        deadline: &Deadline,
        id: &IdentityOf<Subscription>,
    ) -> Result<Subscription, RepositoryError> {
        let items = self.items.read().await;
        deadline.check()?;
        items
            .iter()
            .find(|s| &s.id == id)
            .cloned()
            .ok_or(RepositoryError::NotFound)
    }

    async fn list(&self, deadline: &Deadline) -> Result<Vec<Subscription>, RepositoryError> {
        let items = self.items.read().await;
        deadline.check()?;
        Ok(items.clone())
    }

    async fn total_cost(
        &self,
        deadline: &Deadline,
        filter: &TotalCostFilter,
    ) -> Result<i64, RepositoryError> {
        if !filter.has_valid_period() {
            return Err(RepositoryError::InvalidPeriod);
        }
        let items = self.items.read().await;
        deadline.check()?;
        items
            .iter()
            .filter(|s| filter.matches(s))
            .try_fold(0i64, |acc, s| acc.checked_add(s.price))
            .ok_or_else(|| anyhow!("total cost overflows a 64-bit integer").into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::time::Duration;
    use subs_types::YearMonth;
    use tokio_util::sync::CancellationToken;

    const USER: &str = "60601fee-2bf1-4721-ae6f-7636e79a0cba";

    fn deadline() -> Deadline {
        Deadline::after(Duration::from_secs(5), &CancellationToken::new())
    }

    fn ym(s: &str) -> YearMonth {
        s.parse().unwrap()
    }

    fn new_sub(service: &str, price: i64, start: &str, end: &str) -> NewSubscription {
        NewSubscription {
            service_name: service.to_string(),
            price,
            user_id: USER.to_string(),
            start_date: ym(start),
            end_date: ym(end),
        }
    }

    fn filter(from: &str, to: &str) -> TotalCostFilter {
        TotalCostFilter {
            service_name: "Yandex Plus".to_string(),
            user_id: USER.to_string(),
            from: ym(from),
            to: ym(to),
        }
    }

    #[tokio::test]
    async fn crud_round() {
        let repo = InMemorySubscriptionRepository::new();
        let d = deadline();
        let created = repo
            .add(&d, new_sub("Yandex Plus", 400, "07-2025", "07-2026"))
            .await
            .unwrap();
        assert_eq!(repo.get(&d, &created.id).await.unwrap(), created);

        let mut changed = created.clone();
        changed.price = 500;
        repo.update(&d, changed.clone()).await.unwrap();
        assert_eq!(repo.get(&d, &created.id).await.unwrap().price, 500);

        repo.remove(&d, &created.id).await.unwrap();
        assert!(matches!(
            repo.get(&d, &created.id).await,
            Err(RepositoryError::NotFound)
        ));
    }

    #[tokio::test]
    async fn missing_ids_are_not_found() {
        let repo = InMemorySubscriptionRepository::new();
        let d = deadline();
        let ghost = new_sub("Netflix", 1, "01-2025", "01-2025").with_id(Uuid::new_v4());
        assert!(matches!(
            repo.update(&d, ghost.clone()).await,
            Err(RepositoryError::NotFound)
        ));
        assert!(matches!(
            repo.remove(&d, &ghost.id).await,
            Err(RepositoryError::NotFound)
        ));
        assert!(matches!(
            repo.get(&d, &ghost.id).await,
            Err(RepositoryError::NotFound)
        ));
    }

    #[tokio::test]
    async fn lists_in_creation_order_after_updates() {
        let repo = InMemorySubscriptionRepository::new();
        let d = deadline();
        assert!(repo.list(&d).await.unwrap().is_empty());
        let a = repo.add(&d, new_sub("A", 1, "01-2025", "01-2025")).await.unwrap();
        let b = repo.add(&d, new_sub("B", 2, "01-2025", "01-2025")).await.unwrap();
        let mut a2 = a.clone();
        a2.service_name = "A2".to_string();
        repo.update(&d, a2).await.unwrap();
        let ids: Vec<_> = repo.list(&d).await.unwrap().into_iter().map(|s| s.id).collect();
        assert_eq!(ids, [a.id, b.id]);
    }

    #[tokio::test]
    async fn sums_overlapping_prices() {
        let repo = InMemorySubscriptionRepository::new();
        let d = deadline();
        repo.add(&d, new_sub("Yandex Plus", 400, "07-2025", "07-2026"))
            .await
            .unwrap();
        repo.add(&d, new_sub("Yandex Plus", 300, "01-2026", "03-2026"))
            .await
            .unwrap();
        repo.add(&d, new_sub("Netflix", 1000, "01-2025", "12-2026"))
            .await
            .unwrap();
        assert_eq!(repo.total_cost(&d, &filter("01-2025", "12-2026")).await.unwrap(), 700);
        assert_eq!(repo.total_cost(&d, &filter("07-2026", "08-2026")).await.unwrap(), 400);
        assert_eq!(repo.total_cost(&d, &filter("08-2026", "09-2026")).await.unwrap(), 0);
        assert!(matches!(
            repo.total_cost(&d, &filter("02-2026", "01-2026")).await,
            Err(RepositoryError::InvalidPeriod)
        ));
    }

    #[tokio::test]
    async fn total_cost_overflow_is_an_error() {
        let repo = InMemorySubscriptionRepository::new();
        let d = deadline();
        for _ in 0..2 {
            repo.add(&d, new_sub("Yandex Plus", i64::MAX, "07-2025", "07-2026"))
                .await
                .unwrap();
        }
        assert!(matches!(
            repo.total_cost(&d, &filter("01-2025", "12-2026")).await,
            Err(RepositoryError::Backend(_))
        ));
        assert_eq!(
            repo.total_cost(&d, &filter("08-2026", "09-2026")).await.unwrap(),
            0
        );
    }

    #[tokio::test]
    async fn refuses_work_after_deadline() {
        let repo = InMemorySubscriptionRepository::new();
        let d = deadline();
        d.cancel();
        assert!(matches!(
            repo.add(&d, new_sub("A", 1, "01-2025", "01-2025")).await,
            Err(RepositoryError::Timeout)
        ));
        assert!(repo.list(&deadline()).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn concurrent_update_and_remove_serialize() {
        let repo = Arc::new(InMemorySubscriptionRepository::new());
        let d = deadline();
        let sub = repo
            .add(&d, new_sub("A", 1, "01-2025", "01-2025"))
            .await
            .unwrap();
        let mut changed = sub.clone();
        changed.price = 2;
        let (r1, r2) = {
            let (repo1, repo2) = (repo.clone(), repo.clone());
            let (d1, d2) = (d.clone(), d.clone());
            let id = sub.id;
            tokio::join!(
                async move { repo1.update(&d1, changed).await },
                async move { repo2.remove(&d2, &id).await }
            )
        };
        assert!(r2.is_ok());
        assert!(r1.is_ok() || matches!(r1, Err(RepositoryError::NotFound)));
        assert!(repo.list(&d).await.unwrap().is_empty());
    }
}
