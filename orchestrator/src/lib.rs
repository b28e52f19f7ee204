/*!

`k3s-orchestrator` turns a sequence of fallible external operations (package installation, remote
script execution, Kubernetes API calls) into reliable cluster-membership transitions:

- [`Bootstrap`] initializes the first server of a new cluster on the local host.
- [`Join`] adds a server or worker on a remote host to the existing cluster.
- [`Removal`] uninstalls the runtime from a remotely joined node and deletes its node object.

Each orchestrator is an ordered list of steps. Cancellation is checked between steps, never in
the middle of one, and the first failing step aborts the whole operation. Nothing is rolled back;
every step is safe to repeat, so the remedy for a failure is to fix the cause and run the operation
again.

The external collaborators are traits so that mock implementations can be injected for testing:
[`CommandExecutor`], [`ClusterApi`] and [`Downloader`]. In practice you will use the
[`DefaultExecutor`], [`KubeClusterApi`] and [`HttpDownloader`].

!*/

#![deny(
    clippy::expect_used,
    clippy::get_unwrap,
    clippy::panic,
    clippy::panic_in_result_fn,
    clippy::panicking_unwrap,
    clippy::unwrap_in_result,
    clippy::unwrap_used
)]

pub use allocator::{allocate_identity, allocate_node_name, ensure_token, generate_token};
pub use bootstrap::{server_init_args, Bootstrap, BootstrapOptions, BootstrapStep};
pub use clients::{ClientError, ClientResult, ClusterApi, KubeClusterApi};
pub use convergence::ConvergenceWaiter;
pub use download::{Download, DownloadError, Downloader, HttpDownloader};
pub use error::{Error, ErrorKind, Result};
pub use executor::{
    CommandExecutor, DefaultExecutor, ExecCommand, ExecError, ExecOutput, ExecResult,
    RemoteOptions,
};
pub use join::{join_args, parse_version, Join, JoinRequest, JoinStep};
pub use maintenance::{list_nodes, read_kubeconfig, uninstall_local};
pub use reconcile::{removal_origin, MembershipReconciler};
pub use removal::{Removal, RemovalStep};
pub use settings::Settings;

mod allocator;
mod bootstrap;
pub mod clients;
mod convergence;
mod download;
mod error;
pub mod executor;
mod join;
mod maintenance;
mod network;
mod reconcile;
mod removal;
mod settings;
mod steps;

use k3s_model::PropertyStore;
use tokio_util::sync::CancellationToken;

/// Everything an orchestrator needs from the outside world. The property store, settings and
/// collaborators are borrowed; the cancellation token is shared with whoever listens for
/// interrupts.
pub struct Context<'a, E, C>
where
    E: CommandExecutor,
    C: ClusterApi,
{
    pub executor: &'a E,
    pub cluster: &'a C,
    pub properties: &'a PropertyStore,
    pub settings: &'a Settings,
    pub cancel: CancellationToken,
}

impl<'a, E, C> Context<'a, E, C>
where
    E: CommandExecutor,
    C: ClusterApi,
{
    pub fn new(
        executor: &'a E,
        cluster: &'a C,
        properties: &'a PropertyStore,
        settings: &'a Settings,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            executor,
            cluster,
            properties,
            settings,
            cancel,
        }
    }

    /// Whether the runtime is installed on the local host.
    pub fn is_installed(&self) -> bool {
        self.settings.k3s_binary.exists()
    }

    pub(crate) fn convergence_waiter(&self) -> ConvergenceWaiter<'a, C> {
        ConvergenceWaiter::new(
            self.cluster,
            self.settings.convergence_delay,
            self.cancel.clone(),
        )
    }
}
