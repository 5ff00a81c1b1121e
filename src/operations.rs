/// Remote operation orchestration
///
/// Every mutating call to the agent returns a long-running operation
/// handle. This module turns those fire-and-forget handles into bounded,
/// cleaned-up, retry-safe calls with a consistent error taxonomy:
/// submit, wait under a hard deadline, delete the handle, classify failure.
use crate::agent::{AgentClient, Operation};
use crate::error::{BffError, BffResult};
use std::future::Future;
use std::time::Duration;
use tokio::time::Instant;

/// Drive a submitted remote call to completion.
///
/// The submit future performs the mutating call and yields the operation
/// handle. If the handle is not already done, the agent's bounded-wait
/// primitive is invoked under a hard `timeout` deadline. The handle is
/// deleted from the agent in every observed-done path and after a timeout;
/// a failed delete is logged, never raised.
pub async fn run_to_completion<F>(
    client: &dyn AgentClient,
    kind: &str,
    submit: F,
    timeout: Duration,
) -> BffResult<Operation>
where
    F: Future<Output = BffResult<Operation>> + Send,
{
    let started = Instant::now();
    let operation = submit.await?;
    tracing::debug!("Submitted {} operation: {}", kind, operation.name);

    let operation = if operation.done {
        operation
    } else {
        match tokio::time::timeout(timeout, client.wait_operation(&operation.name, timeout)).await
        {
            Ok(Ok(completed)) if completed.done => completed,
            Ok(Ok(_)) => {
                // The agent's own wait bound elapsed without completion
                return Err(timed_out(client, kind, &operation.name, started).await);
            }
            Ok(Err(e)) => {
                cleanup(client, &operation.name).await;
                return Err(e);
            }
            Err(_) => {
                return Err(timed_out(client, kind, &operation.name, started).await);
            }
        }
    };

    if let Some(error) = operation.error {
        tracing::warn!(
            "{} operation {} completed with error: {}",
            kind,
            operation.name,
            error
        );
        cleanup(client, &operation.name).await;
        return Err(BffError::RemoteOperation { payload: error });
    }

    cleanup(client, &operation.name).await;
    tracing::debug!(
        "{} operation {} completed in {}ms",
        kind,
        operation.name,
        started.elapsed().as_millis()
    );

    Ok(operation)
}

/// Best-effort cleanup of the orphaned handle, then the timeout error
async fn timed_out(
    client: &dyn AgentClient,
    kind: &str,
    name: &str,
    started: Instant,
) -> BffError {
    let elapsed_ms = started.elapsed().as_millis() as u64;
    tracing::warn!(
        "{} operation {} did not complete within {}ms, cleaning up",
        kind,
        name,
        elapsed_ms
    );
    cleanup(client, name).await;

    BffError::OperationTimeout {
        operation: format!("{} ({})", kind, name),
        elapsed_ms,
    }
}

/// Delete the operation record on the agent. An un-deleted completed
/// operation is a resource leak, not a correctness problem, so failure
/// here is logged and swallowed.
async fn cleanup(client: &dyn AgentClient, name: &str) {
    if let Err(e) = client.delete_operation(name).await {
        tracing::warn!("Failed to delete operation {}: {}", name, e);
    }
}
