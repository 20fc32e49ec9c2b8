use crate::subscription::repository::RepositoryError;
use std::future::Future;
use std::time::Duration;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

/// Time budget of a single repository call.
///
/// Expiry and cancellation are reported the same way, as
/// [`RepositoryError::Timeout`].
#[derive(Debug, Clone)]
pub struct Deadline {
    at: Instant,
    token: CancellationToken,
}

impl Deadline {
    /// Expires `timeout` from now, or earlier if `parent` is cancelled.
    pub fn after(timeout: Duration, parent: &CancellationToken) -> Self {
        Self {
            at: Instant::now() + timeout,
            token: parent.child_token(),
        }
    }

    pub fn is_expired(&self) -> bool {
        self.token.is_cancelled() || Instant::now() >= self.at
    }

    pub fn check(&self) -> Result<(), RepositoryError> {
        if self.is_expired() {
            Err(RepositoryError::Timeout)
        } else {
            Ok(())
        }
    }

    pub fn cancel(&self) {
        self.token.cancel();
    }

    /// Drives `fut` until it completes or the budget runs out. In the latter
    /// case `fut` is dropped.
    pub async fn run<T, F>(&self, fut: F) -> Result<T, RepositoryError>
    where
        F: Future<Output = Result<T, RepositoryError>>,
    {
        tokio::select! {
            biased;
            _ = self.token.cancelled() => Err(RepositoryError::Timeout),
            res = tokio::time::timeout_at(self.at, fut) => match res {
                Ok(res) => res,
                Err(_) => Err(RepositoryError::Timeout),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn passes_through_result_within_budget() {
        let deadline = Deadline::after(Duration::from_secs(5), &CancellationToken::new());
        let res = deadline.run(async { Ok(42) }).await;
        assert!(matches!(res, Ok(42)));
        let res: Result<(), _> = deadline.run(async { Err(RepositoryError::NotFound) }).await;
        assert!(matches!(res, Err(RepositoryError::NotFound)));
    }

    #[tokio::test(start_paused = true)]
    async fn expires_slow_calls() {
        let deadline = Deadline::after(Duration::from_secs(5), &CancellationToken::new());
        let res = deadline
            .run(async {
                tokio::time::sleep(Duration::from_secs(60)).await;
                Ok(())
            })
            .await;
        assert!(matches!(res, Err(RepositoryError::Timeout)));
        assert!(deadline.is_expired());
        assert!(matches!(deadline.check(), Err(RepositoryError::Timeout)));
    }

    #[tokio::test(start_paused = true)]
    async fn parent_cancellation_reads_as_timeout() {
        let root = CancellationToken::new();
        let deadline = Deadline::after(Duration::from_secs(5), &root);
        assert!(deadline.check().is_ok());
        root.cancel();
        let res = deadline.run(std::future::pending::<Result<(), _>>()).await;
        assert!(matches!(res, Err(RepositoryError::Timeout)));
    }

    #[tokio::test(start_paused = true)]
    async fn cancelling_one_budget_leaves_siblings_alone() {
        let root = CancellationToken::new();
        let first = Deadline::after(Duration::from_secs(5), &root);
        let second = Deadline::after(Duration::from_secs(5), &root);
        first.cancel();
        assert!(first.is_expired());
        assert!(!second.is_expired());
    }
}
