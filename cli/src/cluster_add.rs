use crate::Services;
use anyhow::{Context, Result};
use clap::Parser;
use k3s_orchestrator::{Join, JoinRequest};

/// Install k3s on a remote host over ssh and join it to the cluster.
#[derive(Debug, Parser)]
pub(crate) struct ClusterAdd {
    /// The role of the new node [server|worker].
    #[clap(long = "role", default_value = "worker")]
    role: String,

    /// Accept the remote host's key even if it is not in the known hosts.
    #[clap(long = "insecure-allow-unknown-hosts")]
    allow_unknown_hosts: bool,

    /// Only schedule critical add-ons on the new server.
    #[clap(long = "taint-scheduling")]
    taint_scheduling: bool,

    /// The ssh destination of the new node, e.g. `ssh://root@10.0.0.7`.
    remote_host: String,
}

impl ClusterAdd {
    pub(crate) async fn run(self, services: &Services) -> Result<()> {
        let request = JoinRequest {
            role: self.role,
            remote_host: self.remote_host.clone(),
            allow_unknown_hosts: self.allow_unknown_hosts,
            taint_scheduling: self.taint_scheduling,
        };
        let identity = Join::new(services.context(), request)
            .run()
            .await
            .context(format!("Unable to add '{}' to the cluster", self.remote_host))?;

        println!("Added {} '{}' to the cluster", identity.role, identity.name);
        Ok(())
    }
}
