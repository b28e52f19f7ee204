use crate::Services;
use anyhow::{Context, Result};
use clap::Parser;
use k3s_orchestrator::read_kubeconfig;

/// Print the kubeconfig k3s generated for this cluster.
#[derive(Debug, Parser)]
pub(crate) struct ShowKubeconfig {}

impl ShowKubeconfig {
    pub(crate) async fn run(self, services: &Services) -> Result<()> {
        let kubeconfig = read_kubeconfig(&services.context())
            .await
            .context("Unable to show kubeconfig")?;
        print!("{}", kubeconfig);
        Ok(())
    }
}
