use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use subs_types::subscription::repository::{RepositoryError, SubscriptionRepository};
use subs_types::subscription::{NewSubscription, Subscription, TotalCostFilter};
use subs_types::Deadline;
use typesafe_repository::{IdentityOf, Repository};

/// Fails every call with the error produced by `error`, counting calls.
pub struct FailingRepository {
    error: fn() -> RepositoryError,
    calls: AtomicUsize,
}

impl FailingRepository {
    pub fn new(error: fn() -> RepositoryError) -> Self {
        Self {
            error,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn backend() -> Self {
        Self::new(|| RepositoryError::Backend(anyhow::anyhow!("dial tcp 10.0.0.7:5432: refused")))
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn fail<T>(&self) -> Result<T, RepositoryError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Err((self.error)())
    }
}

impl Repository<Subscription> for FailingRepository {
    type Error = RepositoryError;
}

#[async_trait]
impl SubscriptionRepository for FailingRepository {
    async fn ping(&self, _: &Deadline) -> Result<(), RepositoryError> {
        self.fail()
    }
    async fn add(&self, _: &Deadline, _: NewSubscription) -> Result<Subscription, RepositoryError> {
        self.fail()
    }
    async fn update(&self, _: &Deadline, _: Subscription) -> Result<(), RepositoryError> {
        self.fail()
    }
    async fn remove(&self, _: &Deadline, _: &IdentityOf<Subscription>) -> Result<(), RepositoryError> {
        self.fail()
    }
    async fn get(&self, _: &Deadline, _: &IdentityOf<Subscription>) -> Result<Subscription, RepositoryError> {
        self.fail()
    }
    async fn list(&self, _: &Deadline) -> Result<Vec<Subscription>, RepositoryError> {
        self.fail()
    }
    async fn total_cost(&self, _: &Deadline, _: &TotalCostFilter) -> Result<i64, RepositoryError> {
        self.fail()
    }
}

/// Never answers and ignores its deadline, like a backend stuck on the network.
pub struct StalledRepository;

impl StalledRepository {
    async fn stall<T>(&self) -> Result<T, RepositoryError> {
        std::future::pending().await
    }
}

impl Repository<Subscription> for StalledRepository {
    type Error = RepositoryError;
}

#[async_trait]
impl SubscriptionRepository for StalledRepository {
    async fn ping(&self, _: &Deadline) -> Result<(), RepositoryError> {
        self.stall().await
    }
    async fn add(&self, _: &Deadline, _: NewSubscription) -> Result<Subscription, RepositoryError> {
        self.stall().await
    }
    async fn update(&self, _: &Deadline, _: Subscription) -> Result<(), RepositoryError> {
        self.stall().await
    }
    async fn remove(&self, _: &Deadline, _: &IdentityOf<Subscription>) -> Result<(), RepositoryError> {
        self.stall().await
    }
    async fn get(&self, _: &Deadline, _: &IdentityOf<Subscription>) -> Result<Subscription, RepositoryError> {
        self.stall().await
    }
    async fn list(&self, _: &Deadline) -> Result<Vec<Subscription>, RepositoryError> {
        self.stall().await
    }
    async fn total_cost(&self, _: &Deadline, _: &TotalCostFilter) -> Result<i64, RepositoryError> {
        self.stall().await
    }
}
