use crate::clients::ClusterApi;
use crate::error::{self, Result};
use crate::executor::{CommandExecutor, ExecCommand};
use crate::steps::run_checked;
use crate::Context;
use k3s_model::NodeReport;
use log::info;
use snafu::{ensure, ResultExt};

/// Every node in the cluster, sorted by name.
pub async fn list_nodes<E: CommandExecutor, C: ClusterApi>(
    ctx: &Context<'_, E, C>,
) -> Result<NodeReport> {
    ensure!(
        ctx.is_installed(),
        error::NotInitializedSnafu {
            action: "list cluster nodes"
        }
    );
    let nodes = ctx.cluster.list_nodes().await.context(error::ClusterSnafu {
        action: "list nodes",
    })?;
    Ok(NodeReport::new(nodes))
}

/// Removes the runtime from the local host.
pub async fn uninstall_local<E: CommandExecutor, C: ClusterApi>(
    ctx: &Context<'_, E, C>,
) -> Result<()> {
    ensure!(
        ctx.is_installed(),
        error::NotInitializedSnafu {
            action: "uninstall"
        }
    );
    info!("Uninstalling k3s");
    let command =
        ExecCommand::new(ctx.settings.uninstall_script.display().to_string()).stream();
    run_checked(ctx.executor, command, "k3s uninstall").await?;
    info!("Done");
    Ok(())
}

/// The kubeconfig the runtime generated for this cluster.
pub async fn read_kubeconfig<E: CommandExecutor, C: ClusterApi>(
    ctx: &Context<'_, E, C>,
) -> Result<String> {
    let path = &ctx.settings.kubeconfig;
    ensure!(
        path.exists(),
        error::NotInitializedSnafu {
            action: "show kubeconfig"
        }
    );
    tokio::fs::read_to_string(path)
        .await
        .context(error::IoSnafu {
            action: format!("read {}", path.display()),
        })
}
