use crate::error::{self, Result};
use k3s_model::{ClusterToken, NodeIdentity, NodeRole, Property, PropertyStore, RemoteHost, Scope};
use log::info;
use rand::{Rng, RngCore};
use snafu::{OptionExt, ResultExt};

/// Number of random bytes in a generated token and in a node name suffix.
const RANDOM_BYTES: usize = 5;
/// Longest valid DNS label.
const MAX_NAME_LEN: usize = 63;

/// A new random token: 5 random bytes as lower-case hex.
pub fn generate_token<R: RngCore + ?Sized>(rng: &mut R) -> ClusterToken {
    let mut bytes = [0u8; RANDOM_BYTES];
    rng.fill_bytes(&mut bytes);
    ClusterToken::from_random_bytes(&bytes)
}

/// Returns the persisted token, generating and persisting a new one when none is set. The token
/// is read back after writing so the caller always holds what is actually stored.
pub fn ensure_token(properties: &PropertyStore) -> Result<ClusterToken> {
    if let Some(token) = properties.token().context(error::ConfigSnafu {
        action: "read k3s token",
    })? {
        return Ok(token);
    }

    info!("Generating k3s token");
    let token = generate_token(&mut rand::thread_rng());
    properties
        .set(&Scope::Global, Property::Token, token.as_str())
        .context(error::ConfigSnafu {
            action: "persist k3s token",
        })?;
    properties
        .token()
        .context(error::ConfigSnafu {
            action: "read k3s token",
        })?
        .context(error::TokenPersistSnafu)
}

/// A unique DNS-label-safe name derived from `seed` (an IP address or hostname) and a random
/// suffix, e.g. `ip-10-0-0-5-0a1b2c3d4e`.
pub fn allocate_node_name<R: Rng + ?Sized>(seed: &str, rng: &mut R) -> String {
    let mut suffix = [0u8; RANDOM_BYTES];
    rng.fill_bytes(&mut suffix);
    let suffix = hex::encode(suffix);

    let mut prefix: String = seed
        .to_lowercase()
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '-' })
        .collect();
    // Room for "ip-", the separating dash and the suffix.
    prefix.truncate(MAX_NAME_LEN - 4 - suffix.len());
    let prefix = prefix.trim_matches('-');

    if prefix.is_empty() {
        format!("ip-{}", suffix)
    } else {
        format!("ip-{}-{}", prefix, suffix)
    }
}

/// Allocates the identity of a node about to be installed.
pub fn allocate_identity(seed: &str, role: NodeRole, origin: Option<RemoteHost>) -> NodeIdentity {
    NodeIdentity {
        name: allocate_node_name(seed, &mut rand::thread_rng()),
        role,
        origin_host: origin,
    }
}
