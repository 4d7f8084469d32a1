//! The lookup seam between the scheduler and a registrar.

use crate::error::SweepError;
use crate::types::{Outcome, Task};
use async_trait::async_trait;

/// Performs one availability lookup per task.
///
/// `check` returns `Ok` with a classified [`Outcome`] for every lookup that
/// reached a verdict or failed in transport. An `Err` (or a panic) is
/// treated by the scheduler as a transport failure of that task alone.
///
/// Implementations do not retry.
#[async_trait]
pub trait Checker: Send + Sync {
    async fn check(&self, task: &Task) -> Result<Outcome, SweepError>;

    /// Reject suffixes this checker cannot serve.
    ///
    /// Called once per distinct suffix before any task is dispatched, so a
    /// misconfigured suffix aborts the run instead of failing every task.
    fn validate_suffix(&self, _suffix: &str) -> Result<(), SweepError> {
        Ok(())
    }
}
