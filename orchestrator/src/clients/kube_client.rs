use super::error::{
    ClientCreateSnafu, KubeSnafu, KubeconfigSnafu, ManifestFetchSnafu, ManifestFieldSnafu,
    ManifestParseSnafu, ManifestReadSnafu, ManifestStatusSnafu, NotFoundSnafu, Result,
    UnknownKindSnafu,
};
use super::{ClusterApi, HttpStatusCode};
use k3s_model::constants::{ANNOTATION_REMOTE_HOST, FIELD_MANAGER, LABEL_NODE_ROLE_PREFIX};
use k3s_model::ClusterNode;
use k8s_openapi::api::core::v1::Node;
use kube::api::{
    Api, DeleteParams, DynamicObject, GroupVersionKind, ListParams, Patch, PatchParams,
};
use kube::config::{KubeConfigOptions, Kubeconfig};
use kube::discovery::{self, Scope};
use kube::{Client, Config, ResourceExt};
use log::{debug, info};
use serde::Deserialize;
use serde_json::json;
use snafu::{ensure, OptionExt, ResultExt};
use std::collections::BTreeSet;
use std::convert::TryFrom;
use std::path::{Path, PathBuf};
use tokio::sync::OnceCell;

/// A [`ClusterApi`] backed by the Kubernetes API server named in a kubeconfig file. The client is
/// created on first use, so constructing a `KubeClusterApi` before the runtime has written its
/// kubeconfig is fine.
pub struct KubeClusterApi {
    kubeconfig: PathBuf,
    client: OnceCell<Client>,
}

impl KubeClusterApi {
    pub fn new<P: Into<PathBuf>>(kubeconfig: P) -> Self {
        Self {
            kubeconfig: kubeconfig.into(),
            client: OnceCell::new(),
        }
    }

    async fn client(&self) -> Result<&Client> {
        self.client
            .get_or_try_init(|| async {
                debug!("Creating client from '{}'", self.kubeconfig.display());
                let kubeconfig =
                    Kubeconfig::read_from(&self.kubeconfig).context(KubeconfigSnafu {
                        path: &self.kubeconfig,
                    })?;
                let config =
                    Config::from_custom_kubeconfig(kubeconfig, &KubeConfigOptions::default())
                        .await
                        .context(KubeconfigSnafu {
                            path: &self.kubeconfig,
                        })?;
                Client::try_from(config).context(ClientCreateSnafu)
            })
            .await
    }

    async fn nodes(&self) -> Result<Api<Node>> {
        Ok(Api::<Node>::all(self.client().await?.clone()))
    }

    async fn read_manifest(&self, source: &str) -> Result<String> {
        if source.starts_with("http://") || source.starts_with("https://") {
            let response = reqwest::get(source)
                .await
                .context(ManifestFetchSnafu { url: source })?;
            let status = response.status();
            ensure!(
                status.is_success(),
                ManifestStatusSnafu {
                    url: source,
                    status: status.as_u16()
                }
            );
            response
                .text()
                .await
                .context(ManifestFetchSnafu { url: source })
        } else {
            let path = Path::new(source);
            tokio::fs::read_to_string(path)
                .await
                .context(ManifestReadSnafu { path })
        }
    }

    async fn apply_object(&self, object: DynamicObject) -> Result<()> {
        let client = self.client().await?;
        let types = object.types.as_ref().context(ManifestFieldSnafu {
            field: "apiVersion",
        })?;
        let (group, version) = types
            .api_version
            .split_once('/')
            .map(|(group, version)| (group.to_string(), version.to_string()))
            .unwrap_or_else(|| (String::new(), types.api_version.clone()));
        let gvk = GroupVersionKind::gvk(&group, &version, &types.kind);
        let (resource, capabilities) = discovery::pinned_kind(client, &gvk)
            .await
            .context(UnknownKindSnafu {
                kind: types.kind.clone(),
            })?;

        let name = object.name_any();
        ensure!(
            !name.is_empty(),
            ManifestFieldSnafu {
                field: "metadata.name"
            }
        );
        let api: Api<DynamicObject> = match capabilities.scope {
            Scope::Namespaced => Api::namespaced_with(
                client.clone(),
                object.namespace().as_deref().unwrap_or("default"),
                &resource,
            ),
            Scope::Cluster => Api::all_with(client.clone(), &resource),
        };
        api.patch(
            &name,
            &PatchParams::apply(FIELD_MANAGER).force(),
            &Patch::Apply(&object),
        )
        .await
        .context(KubeSnafu {
            action: format!("apply {} '{}'", types.kind, name),
        })?;
        debug!("Applied {} '{}'", types.kind, name);
        Ok(())
    }
}

#[async_trait::async_trait]
impl ClusterApi for KubeClusterApi {
    async fn list_nodes(&self) -> Result<Vec<ClusterNode>> {
        let nodes = self
            .nodes()
            .await?
            .list(&ListParams::default())
            .await
            .context(KubeSnafu {
                action: "list nodes",
            })?;
        Ok(nodes.into_iter().map(cluster_node_from).collect())
    }

    async fn get_node(&self, name: &str) -> Result<ClusterNode> {
        let result = self.nodes().await?.get(name).await;
        if result.is_not_found() {
            return NotFoundSnafu {
                what: format!("node '{}'", name),
            }
            .fail();
        }
        Ok(cluster_node_from(result.context(KubeSnafu {
            action: format!("get node '{}'", name),
        })?))
    }

    async fn delete_node(&self, name: &str) -> Result<()> {
        let result = self
            .nodes()
            .await?
            .delete(name, &DeleteParams::default())
            .await;
        if result.is_not_found() {
            debug!("Node '{}' was already deleted", name);
            return Ok(());
        }
        result.context(KubeSnafu {
            action: format!("delete node '{}'", name),
        })?;
        Ok(())
    }

    async fn label_node(&self, name: &str, key: &str, value: &str) -> Result<()> {
        let patch = json!({ "metadata": { "labels": { key: value } } });
        self.nodes()
            .await?
            .patch(name, &PatchParams::default(), &Patch::Merge(&patch))
            .await
            .context(KubeSnafu {
                action: format!("label node '{}'", name),
            })?;
        Ok(())
    }

    async fn annotate_node(&self, name: &str, key: &str, value: &str) -> Result<()> {
        let patch = json!({ "metadata": { "annotations": { key: value } } });
        self.nodes()
            .await?
            .patch(name, &PatchParams::default(), &Patch::Merge(&patch))
            .await
            .context(KubeSnafu {
                action: format!("annotate node '{}'", name),
            })?;
        Ok(())
    }

    async fn apply_manifest(&self, source: &str) -> Result<()> {
        info!("Applying manifest '{}'", source);
        let manifest = self.read_manifest(source).await?;
        // The YAML deserializer is not `Send`, so documents are parsed to values before any
        // `.await`; errors are still reported in document order.
        let documents: Vec<_> = serde_yaml::Deserializer::from_str(&manifest)
            .map(serde_yaml::Value::deserialize)
            .collect();
        for document in documents {
            let value = document.context(ManifestParseSnafu { manifest: source })?;
            if value.is_null() {
                continue;
            }
            let object: DynamicObject =
                serde_yaml::from_value(value).context(ManifestParseSnafu { manifest: source })?;
            self.apply_object(object).await?;
        }
        Ok(())
    }
}

/// Converts a node object into the read model. Roles come from `node-role.kubernetes.io/*`
/// labels; for `node-role.kubernetes.io/role` the label value is the role.
pub fn cluster_node_from(node: Node) -> ClusterNode {
    let ready = node
        .status
        .as_ref()
        .and_then(|status| status.conditions.as_ref())
        .and_then(|conditions| {
            conditions
                .iter()
                .find(|condition| condition.type_ == "Ready")
        })
        .map(|condition| condition.status == "True")
        .unwrap_or_default();
    let version = node
        .status
        .as_ref()
        .and_then(|status| status.node_info.as_ref())
        .map(|info| info.kubelet_version.clone())
        .unwrap_or_default();
    let roles: BTreeSet<String> = node
        .labels()
        .iter()
        .filter_map(|(key, value)| {
            key.strip_prefix(LABEL_NODE_ROLE_PREFIX).map(|suffix| {
                if suffix == "role" {
                    value.clone()
                } else {
                    suffix.to_string()
                }
            })
        })
        .filter(|role| !role.is_empty())
        .collect();
    let remote_host = node.annotations().get(ANNOTATION_REMOTE_HOST).cloned();
    ClusterNode {
        name: node.name_any(),
        ready,
        roles,
        version,
        remote_host,
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn node() -> Node {
        serde_json::from_value(json!({
            "apiVersion": "v1",
            "kind": "Node",
            "metadata": {
                "name": "ip-10-0-0-7-a1b2c3d4e5",
                "labels": {
                    "kubernetes.io/hostname": "ip-10-0-0-7-a1b2c3d4e5",
                    "node-role.kubernetes.io/role": "worker",
                },
                "annotations": {
                    "dokku.com/remote-host": "ssh://root@10.0.0.7",
                },
            },
            "status": {
                "conditions": [
                    { "type": "MemoryPressure", "status": "False" },
                    { "type": "Ready", "status": "True" },
                ],
                "nodeInfo": {
                    "architecture": "amd64",
                    "bootID": "",
                    "containerRuntimeVersion": "containerd://1.7.11-k3s2",
                    "kernelVersion": "6.1.0",
                    "kubeProxyVersion": "v1.28.5+k3s1",
                    "kubeletVersion": "v1.28.5+k3s1",
                    "machineID": "",
                    "operatingSystem": "linux",
                    "osImage": "Debian GNU/Linux 12",
                    "systemUUID": "",
                },
            },
        }))
        .unwrap()
    }

    #[test]
    fn worker_node_is_converted() {
        let node = cluster_node_from(node());
        assert_eq!(node.name, "ip-10-0-0-7-a1b2c3d4e5");
        assert!(node.ready);
        assert_eq!(node.version, "v1.28.5+k3s1");
        assert_eq!(node.roles.iter().collect::<Vec<_>>(), vec!["worker"]);
        assert_eq!(node.remote_host.as_deref(), Some("ssh://root@10.0.0.7"));
    }

    #[test]
    fn server_roles_come_from_label_suffixes() {
        let mut node = node();
        node.metadata.labels = Some(
            vec![
                ("node-role.kubernetes.io/control-plane", "true"),
                ("node-role.kubernetes.io/etcd", "true"),
                ("svccontroller.k3s.cattle.io/enablelb", "true"),
            ]
            .into_iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect(),
        );
        node.metadata.annotations = None;
        node.status = None;
        let node = cluster_node_from(node);
        assert!(!node.ready);
        assert_eq!(
            node.roles.iter().collect::<Vec<_>>(),
            vec!["control-plane", "etcd"]
        );
        assert_eq!(node.remote_host, None);
    }
}
