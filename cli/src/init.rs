use crate::Services;
use anyhow::{Context, Result};
use clap::Parser;
use k3s_orchestrator::{Bootstrap, BootstrapOptions};

/// The init subcommand installs k3s on this host and makes it the first server of a new cluster.
#[derive(Debug, Parser)]
pub(crate) struct Init {
    /// Only schedule critical add-ons on this server.
    #[clap(long = "taint-scheduling")]
    taint_scheduling: bool,
}

impl Init {
    pub(crate) async fn run(self, services: &Services) -> Result<()> {
        let options = BootstrapOptions {
            taint_scheduling: self.taint_scheduling,
        };
        let identity = Bootstrap::new(services.context(), &services.downloader, options)
            .run()
            .await
            .context("Unable to initialize k3s cluster")?;

        println!("Initialized k3s cluster with server '{}'", identity.name);
        Ok(())
    }
}
