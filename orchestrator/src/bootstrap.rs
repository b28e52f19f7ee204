use crate::allocator::{allocate_identity, ensure_token};
use crate::clients::ClusterApi;
use crate::download::Downloader;
use crate::error::{self, Result};
use crate::executor::{CommandExecutor, ExecCommand};
use crate::network::resolve_ipv4;
use crate::reconcile::MembershipReconciler;
use crate::steps::{checkpoint, install_dependencies, run_checked};
use crate::Context;
use k3s_model::constants::{CRITICAL_ADDONS_TAINT, INGRESS_CONFIG_FILE};
use k3s_model::{ClusterToken, NodeIdentity, NodeRole, HELM_CHARTS, KUBERNETES_MANIFESTS};
use log::{debug, info};
use snafu::{ensure, OptionExt, ResultExt};
use std::fmt::{Display, Formatter};
use std::fs::{OpenOptions, Permissions};
use std::io::Write;
use std::net::Ipv4Addr;
use std::os::unix::fs::{OpenOptionsExt, PermissionsExt};
use tempfile::{NamedTempFile, TempPath};

const INGRESS_CONFIG: &str = include_str!("../templates/traefik-config.yaml");

/// The steps of a bootstrap, in the order they run.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum BootstrapStep {
    InstallDependencies,
    DownloadInstaller,
    PersistInstaller,
    EnsureToken,
    AllocateIdentity,
    RunInstaller,
    CreateRegistryConfig,
    ApplyManifests,
    LabelNode,
    WriteIngressConfig,
    InstallCharts,
}

impl BootstrapStep {
    pub const ALL: [BootstrapStep; 11] = [
        BootstrapStep::InstallDependencies,
        BootstrapStep::DownloadInstaller,
        BootstrapStep::PersistInstaller,
        BootstrapStep::EnsureToken,
        BootstrapStep::AllocateIdentity,
        BootstrapStep::RunInstaller,
        BootstrapStep::CreateRegistryConfig,
        BootstrapStep::ApplyManifests,
        BootstrapStep::LabelNode,
        BootstrapStep::WriteIngressConfig,
        BootstrapStep::InstallCharts,
    ];
}

impl Display for BootstrapStep {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let description = match self {
            BootstrapStep::InstallDependencies => "Installing k3s dependencies",
            BootstrapStep::DownloadInstaller => "Downloading k3s installer",
            BootstrapStep::PersistInstaller => "Writing k3s installer",
            BootstrapStep::EnsureToken => "Ensuring k3s token",
            BootstrapStep::AllocateIdentity => "Allocating node name",
            BootstrapStep::RunInstaller => "Running k3s installer",
            BootstrapStep::CreateRegistryConfig => "Creating registries.yaml",
            BootstrapStep::ApplyManifests => "Applying kubernetes manifests",
            BootstrapStep::LabelNode => "Labeling node",
            BootstrapStep::WriteIngressConfig => "Updating traefik config",
            BootstrapStep::InstallCharts => "Installing helm charts",
        };
        f.write_str(description)
    }
}

#[derive(Debug, Clone, Copy, Default, Eq, PartialEq)]
pub struct BootstrapOptions {
    /// Reserve the node for critical add-ons only.
    pub taint_scheduling: bool,
}

/// Initializes the first server of a new cluster on the local host.
pub struct Bootstrap<'a, E, C, D>
where
    E: CommandExecutor,
    C: ClusterApi,
    D: Downloader,
{
    ctx: Context<'a, E, C>,
    downloader: &'a D,
    options: BootstrapOptions,
}

/// What earlier steps hand to later ones. Dropping it removes the installer from disk.
struct State {
    server_ip: Ipv4Addr,
    installer_body: Option<Vec<u8>>,
    installer: Option<TempPath>,
    token: Option<ClusterToken>,
    identity: Option<NodeIdentity>,
}

impl<'a, E, C, D> Bootstrap<'a, E, C, D>
where
    E: CommandExecutor,
    C: ClusterApi,
    D: Downloader,
{
    pub fn new(ctx: Context<'a, E, C>, downloader: &'a D, options: BootstrapOptions) -> Self {
        Self {
            ctx,
            downloader,
            options,
        }
    }

    /// Runs every step in order and returns the identity of the new server. The first failure
    /// aborts the bootstrap; nothing already done is undone.
    pub async fn run(self) -> Result<NodeIdentity> {
        ensure!(!self.ctx.is_installed(), error::AlreadyInitializedSnafu);
        let interface = self
            .ctx
            .properties
            .network_interface()
            .context(error::ConfigSnafu {
                action: "read network-interface",
            })?;
        let server_ip = resolve_ipv4(self.ctx.executor, &interface).await?;

        info!("Initializing k3s");
        let mut state = State {
            server_ip,
            installer_body: None,
            installer: None,
            token: None,
            identity: None,
        };
        for step in BootstrapStep::ALL {
            checkpoint(&self.ctx.cancel, &step.to_string())?;
            self.run_step(step, &mut state).await?;
        }
        info!("Done");
        state.identity.context(error::StepOrderSnafu {
            step: "finish",
            requires: BootstrapStep::AllocateIdentity.to_string(),
        })
    }

    async fn run_step(&self, step: BootstrapStep, state: &mut State) -> Result<()> {
        match step {
            BootstrapStep::InstallDependencies => {
                install_dependencies(self.ctx.executor, None).await
            }
            BootstrapStep::DownloadInstaller => {
                state.installer_body = Some(self.download_installer().await?);
                Ok(())
            }
            BootstrapStep::PersistInstaller => {
                let body = state.installer_body.take().context(error::StepOrderSnafu {
                    step: step.to_string(),
                    requires: BootstrapStep::DownloadInstaller.to_string(),
                })?;
                state.installer = Some(persist_installer(&body)?);
                Ok(())
            }
            BootstrapStep::EnsureToken => {
                state.token = Some(ensure_token(self.ctx.properties)?);
                Ok(())
            }
            BootstrapStep::AllocateIdentity => {
                let identity =
                    allocate_identity(&state.server_ip.to_string(), NodeRole::Server, None);
                debug!("Node name: {}", identity.name);
                state.identity = Some(identity);
                Ok(())
            }
            BootstrapStep::RunInstaller => self.run_installer(step, state).await,
            BootstrapStep::CreateRegistryConfig => self.create_registry_config().await,
            BootstrapStep::ApplyManifests => self.apply_manifests().await,
            BootstrapStep::LabelNode => {
                let identity = state.identity.as_ref().context(error::StepOrderSnafu {
                    step: step.to_string(),
                    requires: BootstrapStep::AllocateIdentity.to_string(),
                })?;
                self.label_node(identity).await
            }
            BootstrapStep::WriteIngressConfig => self.write_ingress_config(),
            BootstrapStep::InstallCharts => self.install_charts().await,
        }
    }

    async fn download_installer(&self) -> Result<Vec<u8>> {
        let url = self.ctx.settings.installer_url.as_str();
        let download = self
            .downloader
            .download(url)
            .await
            .context(error::DownloadSnafu { url })?;
        ensure!(
            download.status == 200,
            error::InstallerStatusSnafu {
                status: download.status
            }
        );
        ensure!(!download.body.is_empty(), error::EmptyInstallerSnafu);
        Ok(download.body)
    }

    async fn run_installer(&self, step: BootstrapStep, state: &State) -> Result<()> {
        let missing = |requires: BootstrapStep| error::StepOrderSnafu {
            step: step.to_string(),
            requires: requires.to_string(),
        };
        let installer = state
            .installer
            .as_ref()
            .context(missing(BootstrapStep::PersistInstaller))?;
        let token = state
            .token
            .as_ref()
            .context(missing(BootstrapStep::EnsureToken))?;
        let identity = state
            .identity
            .as_ref()
            .context(missing(BootstrapStep::AllocateIdentity))?;

        let command = ExecCommand::new(installer.display().to_string())
            .args(server_init_args(
                &identity.name,
                token,
                self.options.taint_scheduling,
            ))
            .stream();
        run_checked(self.ctx.executor, command, "k3s installer").await?;
        Ok(())
    }

    async fn create_registry_config(&self) -> Result<()> {
        let path = &self.ctx.settings.registry_config;
        if !path.exists() {
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent).context(error::IoSnafu {
                    action: format!("create {}", parent.display()),
                })?;
            }
            OpenOptions::new()
                .create(true)
                .append(true)
                .mode(0o644)
                .open(path)
                .context(error::IoSnafu {
                    action: "create initial registries.yaml file",
                })?;
        }

        let command = ExecCommand::new("setfacl")
            .args([
                "-m".to_string(),
                format!("user:{}:rwx", self.ctx.settings.service_account),
                path.display().to_string(),
            ])
            .stream();
        run_checked(self.ctx.executor, command, "setfacl").await?;
        Ok(())
    }

    async fn apply_manifests(&self) -> Result<()> {
        for manifest in KUBERNETES_MANIFESTS {
            info!("Installing {}@{}", manifest.name, manifest.version);
            self.ctx
                .cluster
                .apply_manifest(manifest.url)
                .await
                .context(error::ClusterSnafu {
                    action: format!("apply kubernetes manifest {}", manifest.name),
                })?;
        }
        Ok(())
    }

    async fn label_node(&self, identity: &NodeIdentity) -> Result<()> {
        let attempts = self.ctx.settings.convergence_attempts;
        let nodes = self
            .ctx
            .convergence_waiter()
            .wait_for_node(&identity.name, attempts)
            .await?;
        ensure!(
            !nodes.is_empty(),
            error::BootstrapNotObservedSnafu {
                node: identity.name.as_str(),
                attempts,
            }
        );
        MembershipReconciler::new(&self.ctx)
            .reconcile(identity, false)
            .await
    }

    fn write_ingress_config(&self) -> Result<()> {
        let dir = &self.ctx.settings.manifests_dir;
        std::fs::create_dir_all(dir).context(error::IoSnafu {
            action: format!("create {}", dir.display()),
        })?;
        let path = dir.join(INGRESS_CONFIG_FILE);
        let mut file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .mode(0o600)
            .open(&path)
            .context(error::IoSnafu {
                action: "write traefik config",
            })?;
        file.write_all(INGRESS_CONFIG.as_bytes())
            .context(error::IoSnafu {
                action: "write traefik config",
            })?;
        // An existing file keeps its old mode when opened, so set it explicitly.
        file.set_permissions(Permissions::from_mode(0o600))
            .context(error::IoSnafu {
                action: "set traefik config permissions",
            })?;
        Ok(())
    }

    async fn install_charts(&self) -> Result<()> {
        let kubeconfig = self.ctx.settings.kubeconfig.display().to_string();
        for chart in HELM_CHARTS {
            checkpoint(
                &self.ctx.cancel,
                &format!("Installing {}@{}", chart.release_name, chart.version),
            )?;
            let mut command = ExecCommand::new(self.ctx.settings.helm.as_str())
                .args([
                    "upgrade",
                    "--install",
                    chart.release_name,
                    chart.chart,
                    "--repo",
                    chart.repo_url,
                    "--version",
                    chart.version,
                    "--namespace",
                    chart.namespace,
                    "--create-namespace",
                    "--kubeconfig",
                    kubeconfig.as_str(),
                ])
                .stream();
            for (key, value) in chart.values {
                command = command.args(["--set".to_string(), format!("{}={}", key, value)]);
            }
            run_checked(self.ctx.executor, command, "helm upgrade").await?;
        }
        Ok(())
    }
}

/// Writes the installer to a private temporary file that only the owner can run. The file is
/// deleted when the returned path is dropped.
fn persist_installer(body: &[u8]) -> Result<TempPath> {
    let mut file = NamedTempFile::new().context(error::IoSnafu {
        action: "create temporary file for k3s installer",
    })?;
    file.write_all(body).context(error::IoSnafu {
        action: "write k3s installer to file",
    })?;
    file.as_file()
        .set_permissions(Permissions::from_mode(0o700))
        .context(error::IoSnafu {
            action: "set k3s installer permissions",
        })?;
    let size = file
        .as_file()
        .metadata()
        .context(error::IoSnafu {
            action: "get k3s installer file size",
        })?
        .len();
    ensure!(size > 0, error::EmptyInstallerSnafu);
    // Closing the handle before running the script avoids "text file busy".
    Ok(file.into_temp_path())
}

/// Installer flags for the server that initializes the cluster.
pub fn server_init_args(
    node_name: &str,
    token: &ClusterToken,
    taint_scheduling: bool,
) -> Vec<String> {
    let mut args: Vec<String> = [
        "--cluster-init",
        "--disable",
        "local-storage",
        "--etcd-expose-metrics",
        "--flannel-backend=wireguard-native",
        "--kube-controller-manager-arg",
        "bind-address=0.0.0.0",
        "--kube-proxy-arg",
        "metrics-bind-address=0.0.0.0",
        "--kube-scheduler-arg",
        "bind-address=0.0.0.0",
        "--kube-controller-manager-arg",
        "terminated-pod-gc-threshold=10",
        "--node-name",
        node_name,
        "--write-kubeconfig-mode",
        "0644",
        "--token",
        token.as_str(),
    ]
    .iter()
    .map(|arg| arg.to_string())
    .collect();
    if taint_scheduling {
        args.extend(["--node-taint".to_string(), CRITICAL_ADDONS_TAINT.to_string()]);
    }
    args
}
