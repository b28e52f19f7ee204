use crate::Services;
use anyhow::{Context, Result};
use clap::Parser;
use k3s_model::OutputFormat;
use k3s_orchestrator::list_nodes;

/// List every node in the cluster.
#[derive(Debug, Parser)]
pub(crate) struct ClusterList {
    /// The output format [stdout|json].
    #[clap(long = "format", default_value = "stdout")]
    format: OutputFormat,
}

impl ClusterList {
    pub(crate) async fn run(self, services: &Services) -> Result<()> {
        let report = list_nodes(&services.context())
            .await
            .context("Unable to list cluster nodes")?;
        println!(
            "{}",
            report
                .render(self.format)
                .context("Unable to render node report")?
        );
        Ok(())
    }
}
