use crate::Services;
use anyhow::{Context, Result};
use clap::Parser;
use k3s_orchestrator::uninstall_local;

/// The uninstall subcommand removes k3s from this host. Remote nodes are left alone; remove them
/// with `cluster-remove` first.
#[derive(Debug, Parser)]
pub(crate) struct Uninstall {}

impl Uninstall {
    pub(crate) async fn run(self, services: &Services) -> Result<()> {
        uninstall_local(&services.context())
            .await
            .context("Unable to uninstall k3s (Some artifacts may be left behind)")?;

        println!("k3s was successfully uninstalled.");
        Ok(())
    }
}
