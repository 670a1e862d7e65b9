// src/engine/throttle.rs

use std::time::Duration;

use tokio::time::sleep;
use tracing::info;

use crate::dag::JobKey;
use crate::errors::{BatchdagError, Result};
use crate::queue::QueueBackend;

/// Block until the queue holds fewer than `ceiling` of our jobs, so that
/// `key` can be submitted.
///
/// Returns the depth that allowed the submission. A failed depth query is
/// fatal for the run.
pub async fn wait_for_slot<Q: QueueBackend + ?Sized>(
    queue: &mut Q,
    key: &JobKey,
    ceiling: usize,
    interval: Duration,
) -> Result<usize> {
    loop {
        let depth = queue
            .depth()
            .await
            .map_err(|e| BatchdagError::QueueQueryError {
                job: key.to_string(),
                reason: e.to_string(),
            })?;

        if depth < ceiling {
            return Ok(depth);
        }

        info!(
            job = %key,
            depth,
            ceiling,
            wait = ?interval,
            "queue at submission ceiling; waiting"
        );
        sleep(interval).await;
    }
}
