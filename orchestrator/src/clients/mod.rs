/*!

The `clients` module holds the seam between the orchestrators and the Kubernetes API.

!*/

mod error;
mod http_status_code;
mod kube_client;

pub use error::{Error as ClientError, Result as ClientResult};
pub use http_status_code::{HttpStatusCode, StatusCode};
pub use kube_client::{cluster_node_from, KubeClusterApi};

use k3s_model::ClusterNode;

/// The control-plane operations the orchestrators need.
///
/// This is provided as a trait so that mock implementations can be injected for testing purposes.
/// In practice you will use the [`KubeClusterApi`].
#[async_trait::async_trait]
pub trait ClusterApi: Send + Sync {
    /// All nodes currently registered in the cluster.
    async fn list_nodes(&self) -> ClientResult<Vec<ClusterNode>>;

    /// A single node. A node that does not exist yields an error for which
    /// [`ClientError::is_not_found`] is `true`.
    async fn get_node(&self, name: &str) -> ClientResult<ClusterNode>;

    /// Delete a node object. Deleting a node that is already gone succeeds.
    async fn delete_node(&self, name: &str) -> ClientResult<()>;

    /// Set a single label on the node. Setting a label to its current value is a no-op.
    async fn label_node(&self, name: &str, key: &str, value: &str) -> ClientResult<()>;

    /// Set a single annotation on the node.
    async fn annotate_node(&self, name: &str, key: &str, value: &str) -> ClientResult<()>;

    /// Apply every document of the manifest at `source`, an `http(s)://` URL or a local path.
    async fn apply_manifest(&self, source: &str) -> ClientResult<()>;
}
