//! Time-bounded execution of one workflow step.

use crate::domain::{StepFailure, WorkflowStep};
use std::fmt::Display;
use std::future::Future;
use std::time::Duration;

/// Run `fut` under `timeout`, capturing any error as a [`StepFailure`].
pub async fn bounded<T, E, F>(step: WorkflowStep, timeout: Duration, fut: F) -> Result<T, StepFailure>
where
    E: Display,
    F: Future<Output = Result<T, E>>,
{
    match tokio::time::timeout(timeout, fut).await {
        Ok(Ok(value)) => Ok(value),
        Ok(Err(e)) => Err(StepFailure::new(step, e)),
        Err(_) => Err(StepFailure::timed_out(step, timeout.as_millis() as u64)),
    }
}
