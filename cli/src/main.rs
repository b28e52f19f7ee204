/*!

This is the command line interface for creating a k3s cluster on this host and adding remote
servers and workers to it.

!*/

mod cluster_add;
mod cluster_list;
mod cluster_remove;
mod init;
mod report;
mod set;
mod show_kubeconfig;
mod signals;
mod uninstall;

use anyhow::Result;
use clap::Parser;
use env_logger::Builder;
use k3s_model::constants::PROPERTIES_PATH;
use k3s_model::PropertyStore;
use k3s_orchestrator::{Context, DefaultExecutor, HttpDownloader, KubeClusterApi, Settings};
use log::LevelFilter;
use std::path::PathBuf;
use tokio_util::sync::CancellationToken;

/// The command line interface for managing a k3s cluster and its remote nodes.
#[derive(Debug, Parser)]
#[clap(author, version, about)]
struct Args {
    /// Set logging verbosity [trace|debug|info|warn|error]. If the environment variable `RUST_LOG`
    /// is present, it overrides the default logging behavior. See https://docs.rs/env_logger/latest
    #[clap(long = "log-level", default_value = "info")]
    log_level: LevelFilter,
    /// Path to the file holding the scheduler properties.
    #[clap(
        long = "properties-file",
        env = "K3SCTL_PROPERTIES_FILE",
        default_value = PROPERTIES_PATH
    )]
    properties_file: PathBuf,
    #[clap(subcommand)]
    command: Command,
}

#[derive(Debug, Parser)]
enum Command {
    /// Initialize a new cluster with this host as its first server.
    Init(init::Init),
    /// Add a remote server or worker to the cluster.
    ClusterAdd(cluster_add::ClusterAdd),
    /// List the nodes of the cluster.
    ClusterList(cluster_list::ClusterList),
    /// Uninstall k3s from a remote node and remove it from the cluster.
    ClusterRemove(cluster_remove::ClusterRemove),
    /// Set or clear a scheduler property.
    Set(set::Set),
    /// Show scheduler properties.
    Report(report::Report),
    /// Print the kubeconfig for the cluster.
    ShowKubeconfig(show_kubeconfig::ShowKubeconfig),
    /// Uninstall k3s from this host.
    Uninstall(uninstall::Uninstall),
}

/// The collaborators every subcommand draws from. Nothing here talks to the network until a
/// subcommand uses it.
pub(crate) struct Services {
    executor: DefaultExecutor,
    cluster: KubeClusterApi,
    downloader: HttpDownloader,
    properties: PropertyStore,
    settings: Settings,
    cancel: CancellationToken,
}

impl Services {
    fn new(properties_file: PathBuf) -> Self {
        let settings = Settings::default();
        Self {
            executor: DefaultExecutor::new(),
            cluster: KubeClusterApi::new(settings.kubeconfig.clone()),
            downloader: HttpDownloader::new(),
            properties: PropertyStore::new(properties_file),
            settings,
            cancel: CancellationToken::new(),
        }
    }

    pub(crate) fn context(&self) -> Context<'_, DefaultExecutor, KubeClusterApi> {
        Context::new(
            &self.executor,
            &self.cluster,
            &self.properties,
            &self.settings,
            self.cancel.clone(),
        )
    }
}

#[tokio::main]
async fn main() {
    let args = Args::parse();
    init_logger(args.log_level);
    if let Err(e) = run(args).await {
        // Library errors carry their own causes in their messages.
        match e.chain().nth(1) {
            Some(cause) => eprintln!("{}: {}", e, cause),
            None => eprintln!("{}", e),
        }
        std::process::exit(1);
    }
}

async fn run(args: Args) -> Result<()> {
    let services = Services::new(args.properties_file);
    signals::cancel_on_signal(services.cancel.clone())?;
    match args.command {
        Command::Init(init) => init.run(&services).await,
        Command::ClusterAdd(cluster_add) => cluster_add.run(&services).await,
        Command::ClusterList(cluster_list) => cluster_list.run(&services).await,
        Command::ClusterRemove(cluster_remove) => cluster_remove.run(&services).await,
        Command::Set(set) => set.run(&services).await,
        Command::Report(report) => report.run(&services).await,
        Command::ShowKubeconfig(show_kubeconfig) => show_kubeconfig.run(&services).await,
        Command::Uninstall(uninstall) => uninstall.run(&services).await,
    }
}

/// Initialize the logger with the value passed by `--log-level` (or its default) when the
/// `RUST_LOG` environment variable is not present. If present, the `RUST_LOG` environment variable
/// overrides `--log-level`/`level`.
fn init_logger(level: LevelFilter) {
    match std::env::var(env_logger::DEFAULT_FILTER_ENV).ok() {
        Some(_) => {
            // RUST_LOG exists; env_logger will use it.
            Builder::from_default_env().init();
        }
        None => {
            // RUST_LOG does not exist; use default log level for the k3sctl crates.
            Builder::new()
                .filter(Some(env!("CARGO_CRATE_NAME")), level)
                .filter(Some("k3s_orchestrator"), level)
                .filter(Some("k3s_model"), level)
                .init();
        }
    }
}
