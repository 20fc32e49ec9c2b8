use crate::SqlWrapper;
use async_trait::async_trait;
use std::sync::Arc;
use subs_types::subscription::repository::{RepositoryError, SubscriptionRepository};
use subs_types::subscription::{NewSubscription, Subscription, TotalCostFilter};
use subs_types::{Deadline, YearMonth};
use time::Date;
use tokio_postgres::types::ToSql;
use tokio_postgres::{Client, Row};
use typesafe_repository::{IdentityOf, Repository};
use uuid::Uuid;

const COLUMNS: &str = "id, service_name, price, user_id, start_date, end_date";

impl TryFrom<Row> for SqlWrapper<Subscription> {
    type Error = anyhow::Error;

    fn try_from(r: Row) -> Result<Self, Self::Error> {
        Ok(SqlWrapper(Subscription {
            id: r.try_get("id")?,
            service_name: r.try_get("service_name")?,
            price: r.try_get("price")?,
            user_id: r.try_get("user_id")?,
            start_date: YearMonth::from_date(r.try_get::<_, Date>("start_date")?),
            end_date: YearMonth::from_date(r.try_get::<_, Date>("end_date")?),
        }))
    }
}

fn backend(err: tokio_postgres::Error) -> RepositoryError {
    RepositoryError::Backend(err.into())
}

fn total_cost_sql(filter: &TotalCostFilter) -> String {
    let mut sql = String::from(
        "SELECT COALESCE(SUM(price), 0)::BIGINT AS total FROM subscriptions \
         WHERE start_date <= $1 AND end_date >= $2",
    );
    let mut idx = 3;
    if !filter.service_name.is_empty() {
        sql.push_str(&format!(" AND service_name = ${idx}"));
        idx += 1;
    }
    if !filter.user_id.is_empty() {
        sql.push_str(&format!(" AND user_id = ${idx}"));
    }
    sql
}

pub struct PostgresSubscriptionRepository {
    client: Arc<Client>,
}

impl PostgresSubscriptionRepository {
    pub fn new(client: Arc<Client>) -> Self {
        Self { client }
    }
}

impl Repository<Subscription> for PostgresSubscriptionRepository {
    type Error = RepositoryError;
}

/// Callers bound each call with [`Deadline::run`]; methods only refuse to
/// start once the deadline has passed.
#[async_trait]
impl SubscriptionRepository for PostgresSubscriptionRepository {
    async fn ping(&self, deadline: &Deadline) -> Result<(), RepositoryError> {
        deadline.check()?;
        self.client.execute("SELECT 1", &[]).await.map_err(backend)?;
        Ok(())
    }

    async fn add(
        &self,
        deadline: &Deadline,
        sub: NewSubscription,
    ) -> Result<Subscription, RepositoryError> {
        deadline.check()?;
        let id = Uuid::new_v4();
        log::debug!(
            "Adding subscription user={} service={} price={} period={}..{}",
            sub.user_id,
            sub.service_name,
            sub.price,
            sub.start_date,
            sub.end_date
        );
        let row = self
            .client
            .query_one(
                &format!(
                    "INSERT INTO subscriptions ({COLUMNS}) VALUES ($1, $2, $3, $4, $5, $6) \
                     RETURNING {COLUMNS}"
                ),
                &[
                    &id,
                    &sub.service_name,
                    &sub.price,
                    &sub.user_id,
                    &sub.start_date.first_day(),
                    &sub.end_date.first_day(),
                ],
            )
            .await
            .map_err(backend)?;
        Ok(SqlWrapper::<Subscription>::from_sql(row)?)
    }

    async fn update(&self, deadline: &Deadline, sub: Subscription) -> Result<(), RepositoryError> {
        deadline.check()?;
        let affected = self
            .client
            .execute(
                "UPDATE subscriptions SET service_name = $2, price = $3, user_id = $4, \
                 start_date = $5, end_date = $6 WHERE id = $1",
                &[
                    &sub.id,
                    &sub.service_name,
                    &sub.price,
                    &sub.user_id,
                    &sub.start_date.first_day(),
                    &sub.end_date.first_day(),
                ],
            )
            .await
            .map_err(backend)?;
        if affected == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    async fn remove(
        &self,
        deadline: &Deadline,
        id: &IdentityOf<Subscription>,
    ) -> Result<(), RepositoryError> {
        deadline.check()?;
        let affected = self
            .client
            .execute("DELETE FROM subscriptions WHERE id = $1", &[id])
            .await
            .map_err(backend)?;
        if affected == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    async fn get(
        &self,
        deadline: &Deadline,
        id: &IdentityOf<Subscription>,
    ) -> Result<Subscription, RepositoryError> {
        deadline.check()?;
        let row = self
            .client
            .query_opt(
                &format!("SELECT {COLUMNS} FROM subscriptions WHERE id = $1"),
                &[id],
            )
            .await
            .map_err(backend)?
            .ok_or(RepositoryError::NotFound)?;
        Ok(SqlWrapper::<Subscription>::from_sql(row)?)
    }

    async fn list(&self, deadline: &Deadline) -> Result<Vec<Subscription>, RepositoryError> {
        deadline.check()?;
        let rows = self
            .client
            .query(
                &format!("SELECT {COLUMNS} FROM subscriptions ORDER BY created_at, id"),
                &[],
            )
            .await
            .map_err(backend)?;
        let subs = rows
            .into_iter()
            .map(SqlWrapper::<Subscription>::from_sql)
            .collect::<Result<Vec<_>, _>>()?;
        log::debug!("Listed {} subscriptions", subs.len());
        Ok(subs)
    }

    async fn total_cost(
        &self,
        deadline: &Deadline,
        filter: &TotalCostFilter,
    ) -> Result<i64, RepositoryError> {
        if !filter.has_valid_period() {
            return Err(RepositoryError::InvalidPeriod);
        }
        deadline.check()?;
        let to = filter.to.first_day();
        let from = filter.from.first_day();
        let mut params: Vec<&(dyn ToSql + Sync)> = vec![&to, &from];
        if !filter.service_name.is_empty() {
            params.push(&filter.service_name);
        }
        if !filter.user_id.is_empty() {
            params.push(&filter.user_id);
        }
        let row = self
            .client
            .query_one(total_cost_sql(filter).as_str(), &params)
            .await
            .map_err(backend)?;
        row.try_get::<_, i64>("total").map_err(backend)
    }
}
