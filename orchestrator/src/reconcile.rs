use crate::clients::ClusterApi;
use crate::error::{self, Result};
use crate::executor::{CommandExecutor, ExecCommand, RemoteOptions};
use crate::steps::{checkpoint, run_checked};
use crate::{Context, Settings};
use k3s_model::constants::ANNOTATION_REMOTE_HOST;
use k3s_model::{ClusterNode, NodeIdentity};
use log::info;
use snafu::{OptionExt, ResultExt};
use std::path::Path;
use tokio_util::sync::CancellationToken;

/// Brings a joined node's cluster-visible state in line with its identity: role labels, registry
/// credentials on the host and the origin annotation consulted later by removal.
pub struct MembershipReconciler<'a, E: CommandExecutor, C: ClusterApi> {
    executor: &'a E,
    cluster: &'a C,
    settings: &'a Settings,
    cancel: CancellationToken,
}

impl<'a, E: CommandExecutor, C: ClusterApi> MembershipReconciler<'a, E, C> {
    pub fn new(ctx: &Context<'a, E, C>) -> Self {
        Self {
            executor: ctx.executor,
            cluster: ctx.cluster,
            settings: ctx.settings,
            cancel: ctx.cancel.clone(),
        }
    }

    /// Labels the node for its role, copies the local registry configuration to its origin host and
    /// records the origin host on the node. Every part is safe to repeat.
    pub async fn reconcile(
        &self,
        identity: &NodeIdentity,
        allow_unknown_hosts: bool,
    ) -> Result<()> {
        for (key, value) in identity.role.membership_labels() {
            checkpoint(&self.cancel, &format!("Labeling node {}={}", key, value))?;
            self.cluster
                .label_node(&identity.name, &key, &value)
                .await
                .context(error::ClusterSnafu {
                    action: format!("label node {}", identity.name),
                })?;
        }

        let origin = match &identity.origin_host {
            Some(origin) => origin,
            None => return Ok(()),
        };
        let remote = RemoteOptions {
            host: origin.destination().to_string(),
            allow_unknown_hosts,
        };

        checkpoint(&self.cancel, "Copying registry configuration to remote host")?;
        self.copy_registry_config(remote).await?;

        checkpoint(&self.cancel, "Annotating node with connection information")?;
        self.cluster
            .annotate_node(&identity.name, ANNOTATION_REMOTE_HOST, origin.destination())
            .await
            .context(error::ClusterSnafu {
                action: format!("annotate node {}", identity.name),
            })?;
        Ok(())
    }

    /// Overwrites the remote registry configuration with the local one.
    async fn copy_registry_config(&self, remote: RemoteOptions) -> Result<()> {
        let local = &self.settings.registry_config;
        let contents = tokio::fs::read(local).await.context(error::IoSnafu {
            action: format!("read {}", local.display()),
        })?;
        let target = self.settings.remote_registry_config.as_str();
        let target_dir = Path::new(target)
            .parent()
            .map(|dir| dir.display().to_string())
            .unwrap_or_else(|| "/".to_string());

        let mkdir = ExecCommand::new("mkdir")
            .args(["-p", target_dir.as_str()])
            .remote(Some(remote.clone()))
            .sudo();
        run_checked(self.executor, mkdir, "mkdir over ssh").await?;

        // Neither streamed nor captured, so tee's echo of the credentials goes to /dev/null.
        let tee = ExecCommand::new("tee")
            .arg(target)
            .remote(Some(remote))
            .sudo()
            .stdin(contents);
        run_checked(self.executor, tee, "tee over ssh").await?;
        info!("Copied {} to {}", local.display(), target);
        Ok(())
    }
}

/// The host a node was joined from, or `NotRemoteManaged` if it was not joined remotely. Only
/// nodes with an origin host may be uninstalled over ssh.
pub fn removal_origin(node: &ClusterNode) -> Result<&str> {
    node.origin_host().context(error::NotRemoteManagedSnafu {
        node: node.name.as_str(),
    })
}

#[cfg(test)]
mod test {
    use super::*;
    use std::collections::BTreeSet;

    fn node(remote_host: Option<&str>) -> ClusterNode {
        ClusterNode {
            name: "ip-10-0-0-7-a1b2c3d4e5".to_string(),
            ready: true,
            roles: BTreeSet::new(),
            version: "v1.28.5+k3s1".to_string(),
            remote_host: remote_host.map(str::to_string),
        }
    }

    #[test]
    fn annotated_node_is_eligible() {
        let node = node(Some("ssh://root@10.0.0.7"));
        assert_eq!(removal_origin(&node).unwrap(), "ssh://root@10.0.0.7");
    }

    #[test]
    fn missing_or_empty_origin_is_not_eligible() {
        for remote_host in [None, Some("")] {
            let error = removal_origin(&node(remote_host)).unwrap_err();
            assert_eq!(error.kind(), crate::ErrorKind::NotRemoteManaged);
        }
    }
}
