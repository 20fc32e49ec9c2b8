use crate::deadline::Deadline;
use crate::subscription::{NewSubscription, Subscription, TotalCostFilter};
use async_trait::async_trait;
use derive_more::{Display, Error};
use typesafe_repository::{IdentityOf, Repository};

#[derive(Debug, Display, Error)]
pub enum RepositoryError {
    #[display("subscription not found")]
    NotFound,
    #[display("repository call timed out")]
    Timeout,
    #[display("invalid period: end before start")]
    InvalidPeriod,
    #[error(ignore)]
    #[display("{_0}")]
    Backend(anyhow::Error),
}

impl From<anyhow::Error> for RepositoryError {
    fn from(err: anyhow::Error) -> Self {
        Self::Backend(err)
    }
}

/// Storage for subscriptions.
///
/// Every call receives the caller's [`Deadline`]; callers drive the call
/// through [`Deadline::run`] and implementations [`Deadline::check`] it
/// before doing any work. Operations on a single
/// record are atomic with respect to each other; `list` returns records in
/// a stable, backend-defined order.
#[async_trait]
pub trait SubscriptionRepository:
    Repository<Subscription, Error = RepositoryError> + Send + Sync
{
    async fn ping(&self, deadline: &Deadline) -> Result<(), RepositoryError>;

    /// Persists `sub` under a freshly generated identifier.
    async fn add(
        &self,
        deadline: &Deadline,
        sub: NewSubscription,
    ) -> Result<Subscription, RepositoryError>;

    /// Replaces every mutable field of the record with `sub.id`.
    async fn update(&self, deadline: &Deadline, sub: Subscription) -> Result<(), RepositoryError>;

    async fn remove(
        &self,
        deadline: &Deadline,
        id: &IdentityOf<Subscription>,
    ) -> Result<(), RepositoryError>;

    async fn get(
        &self,
        deadline: &Deadline,
        id: &IdentityOf<Subscription>,
    ) -> Result<Subscription, RepositoryError>;

    async fn list(&self, deadline: &Deadline) -> Result<Vec<Subscription>, RepositoryError>;

    /// Sums prices of records overlapping `[filter.from, filter.to]`.
    ///
    /// Fails with [`RepositoryError::InvalidPeriod`] when `to` precedes `from`.
    async fn total_cost(
        &self,
        deadline: &Deadline,
        filter: &TotalCostFilter,
    ) -> Result<i64, RepositoryError>;
}
