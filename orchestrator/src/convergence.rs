use crate::clients::ClusterApi;
use crate::error::{self, Result};
use k3s_model::ClusterNode;
use log::{debug, info};
use snafu::ResultExt;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Polls the cluster until a freshly joined node becomes visible.
///
/// Only "not found" is retried. Any other error is returned at once, so that an unreachable API
/// server is never mistaken for a slow join.
pub struct ConvergenceWaiter<'a, C: ClusterApi> {
    cluster: &'a C,
    delay: Duration,
    cancel: CancellationToken,
}

impl<'a, C: ClusterApi> ConvergenceWaiter<'a, C> {
    pub fn new(cluster: &'a C, delay: Duration, cancel: CancellationToken) -> Self {
        Self {
            cluster,
            delay,
            cancel,
        }
    }

    /// Returns the matching node, or an empty list if it was still missing after `max_attempts`
    /// queries. Sleeps `delay` between attempts but not after the last one.
    pub async fn wait_for_node(&self, name: &str, max_attempts: usize) -> Result<Vec<ClusterNode>> {
        for attempt in 1..=max_attempts {
            match self.cluster.get_node(name).await {
                Ok(node) => {
                    info!("Node {} is visible after {} attempt(s)", name, attempt);
                    return Ok(vec![node]);
                }
                Err(e) if e.is_not_found() => {
                    debug!(
                        "Node {} not found (attempt {}/{})",
                        name, attempt, max_attempts
                    );
                }
                Err(e) => {
                    return Err(e).context(error::ClusterSnafu {
                        action: format!("get node {}", name),
                    })
                }
            }
            if attempt < max_attempts {
                self.sleep(name).await?;
            }
        }
        Ok(Vec::new())
    }

    async fn sleep(&self, name: &str) -> Result<()> {
        tokio::select! {
            _ = self.cancel.cancelled() => error::CancelledSnafu {
                step: format!("waiting for node {}", name),
            }
            .fail(),
            _ = tokio::time::sleep(self.delay) => Ok(()),
        }
    }
}
