use snafu::Snafu;
use std::path::PathBuf;

#[derive(Debug, Snafu)]
pub struct Error(OpaqueError);
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub(crate) enum OpaqueError {
    #[snafu(display("Invalid app name '{}': {}", name, reason))]
    AppName { name: String, reason: String },

    #[snafu(display("Unable to create property directory '{}': {}", path.display(), source))]
    PropertiesDir {
        path: PathBuf,
        source: std::io::Error,
    },

    #[snafu(display("Unable to deserialize properties file '{}': {}", path.display(), source))]
    PropertiesDeserialize {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[snafu(display("Unable to persist properties to '{}': {}", path.display(), source))]
    PropertiesPersist {
        path: PathBuf,
        source: tempfile::PersistError,
    },

    #[snafu(display("Unable to read properties file '{}': {}", path.display(), source))]
    PropertiesRead {
        path: PathBuf,
        source: std::io::Error,
    },

    #[snafu(display("Unable to serialize properties: {}", source))]
    PropertiesSerialize { source: serde_json::Error },

    #[snafu(display("Unable to write properties to '{}': {}", path.display(), source))]
    PropertiesWrite {
        path: PathBuf,
        source: std::io::Error,
    },

    #[snafu(display("Property '{}' cannot be set {}", property, scope))]
    PropertyScope { property: String, scope: String },

    #[snafu(display("Invalid remote host '{}': {}", host, reason))]
    RemoteHost { host: String, reason: String },

    #[snafu(display("Unable to serialize report: {}", source))]
    ReportSerialize { source: serde_json::Error },
}
