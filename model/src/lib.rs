/*!

This library provides the data types shared by the k3s node lifecycle tooling: node roles and
identities, the read model of a cluster node and its report rendering, the fixed add-on catalog,
and the file-backed property store that holds the cluster token and other options.

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

pub use addons::{HelmChart, Manifest, HELM_CHARTS, KUBERNETES_MANIFESTS};
pub use error::{Error, Result};
pub use node::{ClusterNode, ClusterToken, NodeIdentity, NodeRole, RemoteHost};
pub use parse_error::ParseError;
pub use properties::{Property, PropertyStore, Scope};
pub use report::{NodeReport, OutputFormat, PropertyReport};

mod addons;
pub mod constants;
mod error;
mod node;
mod parse_error;
mod properties;
mod report;
