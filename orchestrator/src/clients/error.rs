use snafu::Snafu;
use std::path::PathBuf;

pub type Result<T> = std::result::Result<T, Error>;

/// Errors returned by a [`ClusterApi`](super::ClusterApi) implementation.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum Error {
    #[snafu(display("Unable to create client: {}", source))]
    ClientCreate { source: kube::Error },

    #[snafu(display("Unable to {}: {}", action, source))]
    Kube { action: String, source: kube::Error },

    #[snafu(display("Unable to load kubeconfig '{}': {}", path.display(), source))]
    Kubeconfig {
        path: PathBuf,
        source: kube::config::KubeconfigError,
    },

    #[snafu(display("Manifest document is missing '{}'", field))]
    ManifestField { field: String },

    #[snafu(display("Unable to fetch manifest '{}': {}", url, source))]
    ManifestFetch { url: String, source: reqwest::Error },

    #[snafu(display("Unable to parse manifest '{}': {}", manifest, source))]
    ManifestParse {
        manifest: String,
        source: serde_yaml::Error,
    },

    #[snafu(display("Unable to read manifest '{}': {}", path.display(), source))]
    ManifestRead {
        path: PathBuf,
        source: std::io::Error,
    },

    #[snafu(display("Fetching manifest '{}' returned status {}", url, status))]
    ManifestStatus { url: String, status: u16 },

    #[snafu(display("{} was not found", what))]
    NotFound { what: String },

    #[snafu(display("Unable to resolve kind '{}': {}", kind, source))]
    UnknownKind { kind: String, source: kube::Error },
}

impl Error {
    /// Whether the requested object does not exist.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::NotFound { .. })
    }
}
