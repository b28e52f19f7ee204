use crate::Services;
use anyhow::{Context, Result};
use clap::Parser;
use k3s_orchestrator::Removal;

/// Uninstall k3s from a remotely added node and delete it from the cluster.
#[derive(Debug, Parser)]
pub(crate) struct ClusterRemove {
    /// The name of the node to remove.
    node: String,
}

impl ClusterRemove {
    pub(crate) async fn run(self, services: &Services) -> Result<()> {
        Removal::new(services.context())
            .run(&self.node)
            .await
            .context(format!("Unable to remove '{}' from the cluster", self.node))?;

        println!("Removed '{}' from the cluster", self.node);
        Ok(())
    }
}
