use crate::constants::DEFAULT_NETWORK_INTERFACE;
use crate::error::{self, Result};
use crate::node::ClusterToken;
use crate::parse_error::impl_from_str_with_parse_error;
use log::debug;
use serde::{Deserialize, Serialize};
use snafu::ResultExt;
use std::collections::BTreeMap;
use std::fmt::{Display, Formatter};
use std::io::Write;
use std::path::{Path, PathBuf};

/// The options recognized by the property store.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Property {
    DeployTimeout,
    ImagePullSecrets,
    LetsencryptEmailProd,
    LetsencryptEmailStag,
    LetsencryptServer,
    Namespace,
    NetworkInterface,
    RollbackOnFailure,
    Token,
}

impl_from_str_with_parse_error!(Property);

impl Property {
    pub const ALL: [Property; 9] = [
        Property::DeployTimeout,
        Property::ImagePullSecrets,
        Property::LetsencryptEmailProd,
        Property::LetsencryptEmailStag,
        Property::LetsencryptServer,
        Property::Namespace,
        Property::NetworkInterface,
        Property::RollbackOnFailure,
        Property::Token,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Property::DeployTimeout => "deploy-timeout",
            Property::ImagePullSecrets => "image-pull-secrets",
            Property::LetsencryptEmailProd => "letsencrypt-email-prod",
            Property::LetsencryptEmailStag => "letsencrypt-email-stag",
            Property::LetsencryptServer => "letsencrypt-server",
            Property::Namespace => "namespace",
            Property::NetworkInterface => "network-interface",
            Property::RollbackOnFailure => "rollback-on-failure",
            Property::Token => "token",
        }
    }

    /// Whether the property may be set with `--global`.
    pub fn allowed_globally(&self) -> bool {
        !matches!(self, Property::LetsencryptServer)
    }

    /// Whether the property may be set for a single app.
    pub fn allowed_per_app(&self) -> bool {
        matches!(
            self,
            Property::DeployTimeout
                | Property::ImagePullSecrets
                | Property::LetsencryptServer
                | Property::Namespace
                | Property::RollbackOnFailure
        )
    }

    /// The value read when the property has never been set.
    pub fn default_value(&self) -> &'static str {
        match self {
            Property::NetworkInterface => DEFAULT_NETWORK_INTERFACE,
            _ => "",
        }
    }

    fn allowed_in(&self, scope: &Scope) -> bool {
        match scope {
            Scope::Global => self.allowed_globally(),
            Scope::App(_) => self.allowed_per_app(),
        }
    }
}

impl Display for Property {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Where a property value lives.
#[derive(Debug, Clone, Eq, PartialEq)]
pub enum Scope {
    Global,
    App(String),
}

impl Display for Scope {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Scope::Global => write!(f, "globally"),
            Scope::App(app) => write!(f, "for app '{}'", app),
        }
    }
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct Document {
    #[serde(default)]
    global: BTreeMap<Property, String>,
    #[serde(default)]
    apps: BTreeMap<String, BTreeMap<Property, String>>,
}

/// A file-backed key/value store of options, either global or scoped to a single app.
///
/// Every call reads the document from disk and every write replaces it atomically, so the store
/// can be shared by reference without any in-memory caching. Reading an unset option yields its
/// declared default.
#[derive(Debug, Clone)]
pub struct PropertyStore {
    path: PathBuf,
}

impl PropertyStore {
    pub fn new<P: Into<PathBuf>>(path: P) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The value stored for `property` in `scope`, or the property's default.
    pub fn get(&self, scope: &Scope, property: Property) -> Result<String> {
        let document = self.read()?;
        let stored = match scope {
            Scope::Global => document.global.get(&property),
            Scope::App(app) => document.apps.get(app).and_then(|app| app.get(&property)),
        };
        Ok(stored
            .cloned()
            .unwrap_or_else(|| property.default_value().to_string()))
    }

    /// The effective value for an app: the app's own value, then the global value, then the
    /// default.
    pub fn computed(&self, app: &str, property: Property) -> Result<String> {
        let document = self.read()?;
        let value = document
            .apps
            .get(app)
            .and_then(|values| values.get(&property))
            .or_else(|| document.global.get(&property))
            .cloned()
            .unwrap_or_else(|| property.default_value().to_string());
        Ok(value)
    }

    /// Store `value` for `property` in `scope`. An empty value clears the property.
    pub fn set(&self, scope: &Scope, property: Property, value: &str) -> Result<()> {
        if !property.allowed_in(scope) {
            return Err(error::PropertyScopeSnafu {
                property: property.name(),
                scope: scope.to_string(),
            }
            .build()
            .into());
        }
        if let Scope::App(app) = scope {
            validate_app_name(app)?;
        }

        let mut document = self.read()?;
        let values = match scope {
            Scope::Global => &mut document.global,
            Scope::App(app) => document.apps.entry(app.clone()).or_default(),
        };
        if value.is_empty() {
            debug!("Clearing property '{}' {}", property, scope);
            values.remove(&property);
        } else {
            debug!("Setting property '{}' {}", property, scope);
            values.insert(property, value.to_string());
        }
        document.apps.retain(|_, values| !values.is_empty());
        self.write(&document)
    }

    /// All properties for a scope with defaults filled in. App scopes report computed values.
    pub fn values(&self, scope: &Scope) -> Result<BTreeMap<Property, String>> {
        let mut values = BTreeMap::new();
        for property in Property::ALL {
            let value = match scope {
                Scope::Global if property.allowed_globally() => self.get(scope, property)?,
                Scope::App(app) if property.allowed_per_app() => self.computed(app, property)?,
                _ => continue,
            };
            values.insert(property, value);
        }
        Ok(values)
    }

    /// The persisted cluster token, if one has been generated.
    pub fn token(&self) -> Result<Option<ClusterToken>> {
        Ok(ClusterToken::new(
            self.get(&Scope::Global, Property::Token)?,
        ))
    }

    /// The network interface used to find the address other nodes reach this one on.
    pub fn network_interface(&self) -> Result<String> {
        let value = self.get(&Scope::Global, Property::NetworkInterface)?;
        if value.is_empty() {
            Ok(DEFAULT_NETWORK_INTERFACE.to_string())
        } else {
            Ok(value)
        }
    }

    fn read(&self) -> Result<Document> {
        if !self.path.exists() {
            return Ok(Document::default());
        }
        let contents = std::fs::read_to_string(&self.path).context(error::PropertiesReadSnafu {
            path: self.path.clone(),
        })?;
        if contents.trim().is_empty() {
            return Ok(Document::default());
        }
        Ok(
            serde_json::from_str(&contents).context(error::PropertiesDeserializeSnafu {
                path: self.path.clone(),
            })?,
        )
    }

    fn write(&self, document: &Document) -> Result<()> {
        let dir = match self.path.parent() {
            Some(dir) if !dir.as_os_str().is_empty() => dir.to_path_buf(),
            _ => PathBuf::from("."),
        };
        std::fs::create_dir_all(&dir).context(error::PropertiesDirSnafu { path: dir.clone() })?;
        let contents =
            serde_json::to_string_pretty(document).context(error::PropertiesSerializeSnafu)?;

        // Write next to the destination so the rename cannot cross filesystems.
        let mut file = tempfile::NamedTempFile::new_in(&dir)
            .context(error::PropertiesWriteSnafu { path: dir.clone() })?;
        file.write_all(contents.as_bytes())
            .context(error::PropertiesWriteSnafu {
                path: file.path().to_path_buf(),
            })?;
        file.persist(&self.path)
            .context(error::PropertiesPersistSnafu {
                path: self.path.clone(),
            })?;
        Ok(())
    }
}

fn validate_app_name(app: &str) -> Result<()> {
    let reason = if app.is_empty() {
        Some("app name is empty")
    } else if !app
        .chars()
        .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-' || c == '.')
    {
        Some("only lower-case letters, digits, '-' and '.' are allowed")
    } else {
        None
    };
    match reason {
        Some(reason) => Err(error::AppNameSnafu {
            name: app,
            reason,
        }
        .build()
        .into()),
        None => Ok(()),
    }
}
