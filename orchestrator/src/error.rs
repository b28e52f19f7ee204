use crate::clients::ClientError;
use crate::download::DownloadError;
use crate::executor::ExecError;
use snafu::Snafu;

pub type Result<T> = std::result::Result<T, Error>;

/// The error type for all orchestrator operations.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum Error {
    #[snafu(display("k3s already installed, cannot re-initialize k3s"))]
    AlreadyInitialized,

    #[snafu(display("Node {} did not appear in the cluster after {} attempts", node, attempts))]
    BootstrapNotObserved { node: String, attempts: usize },

    #[snafu(display("Cancelled before {}", step))]
    Cancelled { step: String },

    #[snafu(display("Unable to {}: {}", action, source))]
    Cluster { action: String, source: ClientError },

    #[snafu(display("Unable to {}: {}", action, source))]
    Config {
        action: String,
        source: k3s_model::Error,
    },

    #[snafu(display("Unable to download k3s installer from '{}': {}", url, source))]
    Download { url: String, source: DownloadError },

    #[snafu(display("Invalid k3s installer filesize"))]
    EmptyInstaller,

    #[snafu(display("Invalid exit code from {} command: {}", action, code))]
    ExitCode { action: String, code: i32 },

    #[snafu(display("Invalid status code for k3s installer script: {}", status))]
    InstallerStatus { status: u16 },

    #[snafu(display("{}", message))]
    InvalidCombination { message: String },

    #[snafu(display("Invalid remote host: {}", source))]
    InvalidRemoteHost { source: k3s_model::Error },

    #[snafu(display("Invalid server-type: {}", role))]
    InvalidRole {
        role: String,
        source: k3s_model::ParseError,
    },

    #[snafu(display("Unable to {}: {}", action, source))]
    Io {
        action: String,
        source: std::io::Error,
    },

    #[snafu(display(
        "Unable to find node {} after joining cluster ({} attempts), node will not be \
        annotated/labeled appropriately access registry secrets",
        node,
        attempts
    ))]
    JoinNotObserved { node: String, attempts: usize },

    #[snafu(display("Missing k3s token"))]
    MissingToken,

    #[snafu(display(
        "Unable to determine server ip address from network-interface {}: {}",
        interface,
        reason
    ))]
    NetworkConfig { interface: String, reason: String },

    #[snafu(display("Node {} was not found in the cluster", node))]
    NodeNotFound { node: String },

    #[snafu(display("k3s not installed, cannot {}", action))]
    NotInitialized { action: String },

    #[snafu(display("Node {} is not a remote node managed by Dokku", node))]
    NotRemoteManaged { node: String },

    #[snafu(display(
        "Node {} was removed from its host but is still present in the API: {}",
        node,
        source
    ))]
    OrphanedNodeRecord { node: String, source: ClientError },

    #[snafu(display("Step '{}' needs the output of '{}', which has not run", step, requires))]
    StepOrder { step: String, requires: String },

    #[snafu(display("Unable to persist the k3s token"))]
    TokenPersist,

    #[snafu(display("Unable to call {} command: {}", action, source))]
    Transport { action: String, source: ExecError },

    #[snafu(display("Unable to get k3s version from k3s --version: {}", output))]
    VersionParse { output: String },
}

/// Groups errors by what the operator has to do about them.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum ErrorKind {
    /// Fix the inputs or host state and run the whole operation again.
    PreconditionFailed,
    /// No usable address on the configured network interface.
    NetworkConfig,
    /// A command could not be run or exited non-zero.
    Transport,
    /// The runtime reported success but the node never showed up in the API.
    ConvergenceTimeout,
    /// The node was not provisioned by a remote join.
    NotRemoteManaged,
    /// The runtime was removed from the host but the node object remains.
    OrphanedNodeRecord,
    /// The property store or a local configuration file could not be read or written.
    Config,
    /// A control-plane API call failed.
    ClusterApi,
    /// An interrupt arrived before the next step started.
    Cancelled,
}

impl Error {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::AlreadyInitialized
            | Error::InvalidCombination { .. }
            | Error::InvalidRemoteHost { .. }
            | Error::InvalidRole { .. }
            | Error::MissingToken
            | Error::NodeNotFound { .. }
            | Error::NotInitialized { .. }
            | Error::StepOrder { .. }
            | Error::VersionParse { .. } => ErrorKind::PreconditionFailed,
            Error::NetworkConfig { .. } => ErrorKind::NetworkConfig,
            Error::Download { .. }
            | Error::EmptyInstaller
            | Error::ExitCode { .. }
            | Error::InstallerStatus { .. }
            | Error::Transport { .. } => ErrorKind::Transport,
            Error::BootstrapNotObserved { .. } | Error::JoinNotObserved { .. } => {
                ErrorKind::ConvergenceTimeout
            }
            Error::NotRemoteManaged { .. } => ErrorKind::NotRemoteManaged,
            Error::OrphanedNodeRecord { .. } => ErrorKind::OrphanedNodeRecord,
            Error::Config { .. } | Error::Io { .. } | Error::TokenPersist => ErrorKind::Config,
            Error::Cluster { .. } => ErrorKind::ClusterApi,
            Error::Cancelled { .. } => ErrorKind::Cancelled,
        }
    }

    /// The exit code of the failing command, when a command ran and failed.
    pub fn exit_code(&self) -> Option<i32> {
        match self {
            Error::ExitCode { code, .. } => Some(*code),
            _ => None,
        }
    }
}
