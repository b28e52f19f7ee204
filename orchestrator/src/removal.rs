use crate::clients::ClusterApi;
use crate::error::{self, Result};
use crate::executor::{CommandExecutor, ExecCommand, RemoteOptions};
use crate::reconcile::removal_origin;
use crate::steps::{checkpoint, run_checked};
use crate::Context;
use k3s_model::ClusterNode;
use log::info;
use snafu::{ensure, ResultExt};
use std::fmt::{Display, Formatter};

/// The steps of a removal, in the order they run.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum RemovalStep {
    InspectNode,
    UninstallRuntime,
    DeleteNode,
}

impl RemovalStep {
    pub const ALL: [RemovalStep; 3] = [
        RemovalStep::InspectNode,
        RemovalStep::UninstallRuntime,
        RemovalStep::DeleteNode,
    ];
}

impl Display for RemovalStep {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let description = match self {
            RemovalStep::InspectNode => "Getting node remote connection information",
            RemovalStep::UninstallRuntime => "Uninstalling k3s on remote host",
            RemovalStep::DeleteNode => "Deleting node from k3s cluster",
        };
        f.write_str(description)
    }
}

/// Uninstalls the runtime from a remotely joined node, then deletes its node object.
///
/// The uninstall always comes first. If it fails the node object is left alone; if it succeeds
/// and the delete then fails, the result is `OrphanedNodeRecord`.
pub struct Removal<'a, E: CommandExecutor, C: ClusterApi> {
    ctx: Context<'a, E, C>,
}

impl<'a, E: CommandExecutor, C: ClusterApi> Removal<'a, E, C> {
    pub fn new(ctx: Context<'a, E, C>) -> Self {
        Self { ctx }
    }

    pub async fn run(self, node_name: &str) -> Result<()> {
        ensure!(
            self.ctx.is_installed(),
            error::NotInitializedSnafu {
                action: "remove node"
            }
        );
        info!("Removing {} from k3s cluster", node_name);

        checkpoint(&self.ctx.cancel, &RemovalStep::InspectNode.to_string())?;
        let node = self.inspect(node_name).await?;
        let origin = removal_origin(&node)?;

        checkpoint(&self.ctx.cancel, &RemovalStep::UninstallRuntime.to_string())?;
        let uninstall = ExecCommand::new(self.ctx.settings.remote_uninstall_script.as_str())
            .remote(Some(RemoteOptions {
                host: origin.to_string(),
                allow_unknown_hosts: true,
            }))
            .sudo()
            .stream();
        run_checked(self.ctx.executor, uninstall, "k3s uninstall over ssh").await?;

        // The runtime is gone from the host, so an interrupt must not leave the node object behind.
        info!("{}", RemovalStep::DeleteNode);
        self.ctx
            .cluster
            .delete_node(node_name)
            .await
            .context(error::OrphanedNodeRecordSnafu { node: node_name })?;
        info!("Done");
        Ok(())
    }

    async fn inspect(&self, node_name: &str) -> Result<ClusterNode> {
        match self.ctx.cluster.get_node(node_name).await {
            Ok(node) => Ok(node),
            Err(e) if e.is_not_found() => error::NodeNotFoundSnafu { node: node_name }.fail(),
            Err(e) => Err(e).context(error::ClusterSnafu {
                action: format!("get node {}", node_name),
            }),
        }
    }
}
