use crate::allocator::allocate_identity;
use crate::clients::ClusterApi;
use crate::error::{self, Result};
use crate::executor::{CommandExecutor, ExecCommand, RemoteOptions};
use crate::network::resolve_ipv4;
use crate::reconcile::MembershipReconciler;
use crate::steps::{checkpoint, install_dependencies, run_checked};
use crate::Context;
use k3s_model::constants::{API_SERVER_PORT, CRITICAL_ADDONS_TAINT, INSTALLER_VERSION_ENV};
use k3s_model::{ClusterToken, NodeIdentity, NodeRole, RemoteHost};
use log::{debug, info};
use snafu::{ensure, OptionExt, ResultExt};
use std::fmt::{Display, Formatter};
use std::net::Ipv4Addr;

/// The steps of a join, in the order they run.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum JoinStep {
    QueryVersion,
    InstallDependencies,
    DownloadInstaller,
    AllocateIdentity,
    RunInstaller,
    AwaitNode,
    Reconcile,
}

impl JoinStep {
    pub const ALL: [JoinStep; 7] = [
        JoinStep::QueryVersion,
        JoinStep::InstallDependencies,
        JoinStep::DownloadInstaller,
        JoinStep::AllocateIdentity,
        JoinStep::RunInstaller,
        JoinStep::AwaitNode,
        JoinStep::Reconcile,
    ];
}

impl Display for JoinStep {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let description = match self {
            JoinStep::QueryVersion => "Reading local k3s version",
            JoinStep::InstallDependencies => "Installing k3s dependencies",
            JoinStep::DownloadInstaller => "Downloading k3s installer",
            JoinStep::AllocateIdentity => "Allocating node name",
            JoinStep::RunInstaller => "Running k3s installer",
            JoinStep::AwaitNode => "Waiting for node to exist",
            JoinStep::Reconcile => "Reconciling node membership",
        };
        f.write_str(description)
    }
}

/// Unvalidated join inputs as an operator supplies them.
#[derive(Debug, Clone, Default, Eq, PartialEq)]
pub struct JoinRequest {
    /// `server` or `worker`.
    pub role: String,
    /// The ssh destination of the new node.
    pub remote_host: String,
    pub allow_unknown_hosts: bool,
    /// Reserve the node for critical add-ons only. Servers only.
    pub taint_scheduling: bool,
}

/// Adds a server or worker on a remote host to the cluster this host controls.
pub struct Join<'a, E: CommandExecutor, C: ClusterApi> {
    ctx: Context<'a, E, C>,
    request: JoinRequest,
}

/// Validated inputs.
struct Plan {
    role: NodeRole,
    token: ClusterToken,
    remote_host: RemoteHost,
    server_ip: Ipv4Addr,
}

#[derive(Default)]
struct State {
    version: Option<String>,
    identity: Option<NodeIdentity>,
}

impl<'a, E: CommandExecutor, C: ClusterApi> Join<'a, E, C> {
    pub fn new(ctx: Context<'a, E, C>, request: JoinRequest) -> Self {
        Self { ctx, request }
    }

    /// Checks the preconditions, then runs every step in order and returns the identity of the
    /// joined node. Nothing is started on the remote host until every precondition holds.
    pub async fn run(self) -> Result<NodeIdentity> {
        let plan = self.plan().await?;
        info!("Joining {} to k3s cluster as {}", plan.remote_host, plan.role);
        let mut state = State::default();
        for step in JoinStep::ALL {
            checkpoint(&self.ctx.cancel, &step.to_string())?;
            self.run_step(step, &plan, &mut state).await?;
        }
        info!("Done");
        state.identity.context(error::StepOrderSnafu {
            step: "finish",
            requires: JoinStep::AllocateIdentity.to_string(),
        })
    }

    async fn plan(&self) -> Result<Plan> {
        ensure!(
            self.ctx.is_installed(),
            error::NotInitializedSnafu {
                action: "join cluster"
            }
        );
        let role: NodeRole = self
            .request
            .role
            .parse()
            .context(error::InvalidRoleSnafu {
                role: self.request.role.as_str(),
            })?;
        let token = self
            .ctx
            .properties
            .token()
            .context(error::ConfigSnafu {
                action: "read k3s token",
            })?
            .context(error::MissingTokenSnafu)?;
        ensure!(
            !(self.request.taint_scheduling && role == NodeRole::Worker),
            error::InvalidCombinationSnafu {
                message: "Taint scheduling can only be used on the server role"
            }
        );
        let remote_host = RemoteHost::parse(self.request.remote_host.as_str())
            .context(error::InvalidRemoteHostSnafu)?;
        let interface = self
            .ctx
            .properties
            .network_interface()
            .context(error::ConfigSnafu {
                action: "read network-interface",
            })?;
        let server_ip = resolve_ipv4(self.ctx.executor, &interface).await?;
        Ok(Plan {
            role,
            token,
            remote_host,
            server_ip,
        })
    }

    fn remote(&self, plan: &Plan) -> Option<RemoteOptions> {
        Some(RemoteOptions {
            host: plan.remote_host.destination().to_string(),
            allow_unknown_hosts: self.request.allow_unknown_hosts,
        })
    }

    async fn run_step(&self, step: JoinStep, plan: &Plan, state: &mut State) -> Result<()> {
        let missing = |requires: JoinStep| error::StepOrderSnafu {
            step: step.to_string(),
            requires: requires.to_string(),
        };
        match step {
            JoinStep::QueryVersion => {
                let command = ExecCommand::new(self.ctx.settings.k3s_binary.display().to_string())
                    .arg("--version")
                    .capture();
                let output = run_checked(self.ctx.executor, command, "k3s --version").await?;
                let version = parse_version(&output.stdout)?;
                debug!("k3s version: {}", version);
                state.version = Some(version);
                Ok(())
            }
            JoinStep::InstallDependencies => {
                install_dependencies(self.ctx.executor, self.remote(plan)).await
            }
            JoinStep::DownloadInstaller => {
                let installer = self.ctx.settings.remote_installer.as_str();
                let curl = ExecCommand::new("curl")
                    .args(["-sfL", "-o", installer, self.ctx.settings.installer_url.as_str()])
                    .remote(self.remote(plan))
                    .stream();
                run_checked(self.ctx.executor, curl, "curl over ssh").await?;
                // curl -f does not catch an empty 200 response.
                let non_empty = ExecCommand::new("test")
                    .args(["-s", installer])
                    .remote(self.remote(plan));
                run_checked(self.ctx.executor, non_empty, "k3s installer filesize check").await?;
                let chmod = ExecCommand::new("chmod")
                    .args(["0755", installer])
                    .remote(self.remote(plan))
                    .stream();
                run_checked(self.ctx.executor, chmod, "chmod over ssh").await?;
                Ok(())
            }
            JoinStep::AllocateIdentity => {
                let identity = allocate_identity(
                    plan.remote_host.hostname(),
                    plan.role,
                    Some(plan.remote_host.clone()),
                );
                debug!("Node name: {}", identity.name);
                state.identity = Some(identity);
                Ok(())
            }
            JoinStep::RunInstaller => {
                let identity = state
                    .identity
                    .as_ref()
                    .context(missing(JoinStep::AllocateIdentity))?;
                let version = state
                    .version
                    .as_deref()
                    .context(missing(JoinStep::QueryVersion))?;
                info!("Adding {} to k3s cluster", identity.name);
                let command = ExecCommand::new(self.ctx.settings.remote_installer.as_str())
                    .args(join_args(
                        plan.role,
                        &identity.name,
                        plan.server_ip,
                        &plan.token,
                        self.request.taint_scheduling,
                    ))
                    .env(INSTALLER_VERSION_ENV, version)
                    .remote(self.remote(plan))
                    .sudo()
                    .stream();
                run_checked(self.ctx.executor, command, "k3s installer over ssh").await?;
                Ok(())
            }
            JoinStep::AwaitNode => {
                let identity = state
                    .identity
                    .as_ref()
                    .context(missing(JoinStep::AllocateIdentity))?;
                let attempts = self.ctx.settings.convergence_attempts;
                let nodes = self
                    .ctx
                    .convergence_waiter()
                    .wait_for_node(&identity.name, attempts)
                    .await?;
                ensure!(
                    !nodes.is_empty(),
                    error::JoinNotObservedSnafu {
                        node: identity.name.as_str(),
                        attempts,
                    }
                );
                Ok(())
            }
            JoinStep::Reconcile => {
                let identity = state
                    .identity
                    .as_ref()
                    .context(missing(JoinStep::AllocateIdentity))?;
                MembershipReconciler::new(&self.ctx)
                    .reconcile(identity, self.request.allow_unknown_hosts)
                    .await
            }
        }
    }
}

/// Installer flags for a node joining the cluster served from `server_ip`.
pub fn join_args(
    role: NodeRole,
    node_name: &str,
    server_ip: Ipv4Addr,
    token: &ClusterToken,
    taint_scheduling: bool,
) -> Vec<String> {
    let mut args = vec![
        "--disable".to_string(),
        "local-storage".to_string(),
        "--flannel-backend=wireguard-native".to_string(),
        "--node-name".to_string(),
        node_name.to_string(),
        "--server".to_string(),
        format!("https://{}:{}", server_ip, API_SERVER_PORT),
        "--token".to_string(),
        token.as_str().to_string(),
    ];
    let role_args: &[&str] = match role {
        NodeRole::Server => &[
            "--etcd-expose-metrics",
            "--kube-controller-manager-arg",
            "bind-address=0.0.0.0",
            "--kube-proxy-arg",
            "metrics-bind-address=0.0.0.0",
            "--kube-scheduler-arg",
            "bind-address=0.0.0.0",
            "--kube-controller-manager-arg",
            "terminated-pod-gc-threshold=10",
            "--write-kubeconfig-mode",
            "0644",
        ],
        NodeRole::Worker => &[
            "--disable-etcd",
            "--disable-apiserver",
            "--disable-controller-manager",
            "--disable-scheduler",
            "--kube-proxy-arg",
            "metrics-bind-address=0.0.0.0",
        ],
    };
    args.extend(role_args.iter().map(|arg| arg.to_string()));
    if role == NodeRole::Server {
        args.insert(0, "server".to_string());
    }
    if taint_scheduling {
        args.extend(["--node-taint".to_string(), CRITICAL_ADDONS_TAINT.to_string()]);
    }
    args
}

/// Extracts the version from the first line of `k3s --version`, which must have exactly four
/// space separated fields, e.g. `k3s version v1.28.5+k3s1 (5b2d1271)`.
pub fn parse_version(output: &str) -> Result<String> {
    let first_line = output.lines().next().unwrap_or_default();
    let fields: Vec<&str> = first_line.split(' ').collect();
    match fields.as_slice() {
        [_, _, version, _] if !version.is_empty() => Ok(version.to_string()),
        _ => error::VersionParseSnafu { output }.fail(),
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn token() -> ClusterToken {
        ClusterToken::new("0a1b2c3d4e").unwrap()
    }

    #[test]
    fn version_has_four_fields() {
        assert_eq!(
            parse_version("k3s version v1.28.5+k3s1 (5b2d1271)\ngo version go1.20.12\n").unwrap(),
            "v1.28.5+k3s1"
        );
        for bad in ["", "k3s version v1.28.5+k3s1", "k3s  version v1.28.5+k3s1 (5b2d1271)"] {
            let error = parse_version(bad).unwrap_err();
            assert_eq!(error.kind(), crate::ErrorKind::PreconditionFailed);
        }
    }

    #[test]
    fn server_args_include_control_plane_flags() {
        let args = join_args(
            NodeRole::Server,
            "ip-10-0-0-7-aa",
            Ipv4Addr::new(10, 0, 0, 5),
            &token(),
            true,
        );
        assert_eq!(args[0], "server");
        let server = args.iter().position(|a| a == "--server").unwrap();
        assert_eq!(args[server + 1], "https://10.0.0.5:6443");
        assert!(args.iter().any(|a| a == "--etcd-expose-metrics"));
        assert!(!args.iter().any(|a| a == "--disable-etcd"));
        assert_eq!(args[args.len() - 1], CRITICAL_ADDONS_TAINT);
    }

    #[test]
    fn worker_args_disable_control_plane() {
        let args = join_args(
            NodeRole::Worker,
            "ip-10-0-0-8-bb",
            Ipv4Addr::new(10, 0, 0, 5),
            &token(),
            false,
        );
        assert_eq!(args[0], "--disable");
        let server = args.iter().position(|a| a == "--server").unwrap();
        assert_eq!(args[server + 1], "https://10.0.0.5:6443");
        for flag in [
            "--disable-etcd",
            "--disable-apiserver",
            "--disable-controller-manager",
            "--disable-scheduler",
        ] {
            assert!(args.iter().any(|a| a == flag), "missing {}", flag);
        }
        assert!(!args.iter().any(|a| a == "--etcd-expose-metrics"));
        assert!(!args.iter().any(|a| a == "--node-taint"));
        let token_at = args.iter().position(|a| a == "--token").unwrap();
        assert_eq!(args[token_at + 1], "0a1b2c3d4e");
    }
}
