use crate::constants::{LABEL_ENABLE_LB, LABEL_NODE_ROLE};
use crate::error::{self, Result};
use crate::parse_error::impl_from_str_with_parse_error;
use maplit::btreemap;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt::{Display, Formatter};
use url::Url;

/// The role a node plays in the cluster.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeRole {
    Server,
    Worker,
}

impl_from_str_with_parse_error!(NodeRole);

impl NodeRole {
    /// The labels every node of this role receives once it has joined. These are applied exactly
    /// once per successful join and never removed automatically.
    pub fn membership_labels(&self) -> BTreeMap<String, String> {
        match self {
            NodeRole::Server => btreemap! {
                LABEL_ENABLE_LB.to_string() => "true".to_string(),
            },
            NodeRole::Worker => btreemap! {
                LABEL_NODE_ROLE.to_string() => "worker".to_string(),
            },
        }
    }
}

impl Display for NodeRole {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            NodeRole::Server => write!(f, "server"),
            NodeRole::Worker => write!(f, "worker"),
        }
    }
}

/// The shared secret every node presents when joining the cluster.
#[derive(Clone, Eq, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ClusterToken(String);

impl ClusterToken {
    /// Wrap a persisted token value. Returns `None` for the empty string, which means "no token".
    pub fn new<S: Into<String>>(token: S) -> Option<Self> {
        let token = token.into();
        if token.is_empty() {
            None
        } else {
            Some(Self(token))
        }
    }

    /// A new token from freshly generated random bytes, encoded as lower-case hex.
    pub fn from_random_bytes(bytes: &[u8; 5]) -> Self {
        Self(bytes.iter().map(|b| format!("{:02x}", b)).collect())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

// Tokens end up in logs via `Debug` of surrounding structs, keep them out.
impl std::fmt::Debug for ClusterToken {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str("ClusterToken(***)")
    }
}

/// A node's name, role and, for remotely joined nodes, the host it was provisioned on.
#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeIdentity {
    pub name: String,
    pub role: NodeRole,
    /// Set only for remotely joined nodes. A node without an origin host is never eligible for
    /// remote removal.
    pub origin_host: Option<RemoteHost>,
}

/// An ssh destination such as `ssh://root@10.0.0.7` or `worker1.example.com`.
#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct RemoteHost {
    destination: String,
    hostname: String,
}

impl RemoteHost {
    /// Parses an ssh destination. A `[user@]host:port` destination is rewritten as
    /// `ssh://[user@]host:port`, the only form in which ssh accepts a port.
    pub fn parse<S: Into<String>>(destination: S) -> Result<Self> {
        let mut destination = destination.into();
        if !destination.contains("://") && destination.contains(':') {
            destination = format!("ssh://{}", destination);
        }
        let hostname = if destination.contains("://") {
            let url = Url::parse(&destination).map_err(|e| {
                error::RemoteHostSnafu {
                    host: destination.clone(),
                    reason: e.to_string(),
                }
                .build()
            })?;
            url.host_str().unwrap_or_default().to_string()
        } else {
            destination
                .rsplit_once('@')
                .map(|(_, host)| host)
                .unwrap_or(&destination)
                .to_string()
        };
        if hostname.is_empty() {
            return Err(error::RemoteHostSnafu {
                host: destination,
                reason: "no hostname found",
            }
            .build()
            .into());
        }
        Ok(Self {
            destination,
            hostname,
        })
    }

    /// The destination used to open ssh sessions.
    pub fn destination(&self) -> &str {
        &self.destination
    }

    /// Only the host part of the destination.
    pub fn hostname(&self) -> &str {
        &self.hostname
    }
}

impl Display for RemoteHost {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.destination)
    }
}

impl TryFrom<String> for RemoteHost {
    type Error = crate::Error;

    fn try_from(value: String) -> Result<Self> {
        Self::parse(value)
    }
}

impl From<RemoteHost> for String {
    fn from(host: RemoteHost) -> Self {
        host.destination
    }
}

/// The read model of a node object as reported by the control plane. Never cached beyond the
/// lifetime of a single operation.
#[derive(Debug, Clone, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClusterNode {
    pub name: String,
    pub ready: bool,
    pub roles: BTreeSet<String>,
    pub version: String,
    /// The value of the remote-host annotation, if the node carries one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remote_host: Option<String>,
}

impl ClusterNode {
    /// The origin annotation, treating an empty value the same as a missing one.
    pub fn origin_host(&self) -> Option<&str> {
        self.remote_host.as_deref().filter(|host| !host.is_empty())
    }
}
