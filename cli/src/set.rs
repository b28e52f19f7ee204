use crate::Services;
use anyhow::{Context, Result};
use clap::{ArgGroup, Parser};
use k3s_model::{Property, Scope};

/// Set a scheduler property globally or for a single app. Omitting the value clears it.
#[derive(Debug, Parser)]
#[clap(group(ArgGroup::new("scope").required(true).args(&["global", "app"])))]
pub(crate) struct Set {
    /// Set the property for every app.
    #[clap(long = "global")]
    global: bool,

    /// Set the property for this app only.
    #[clap(long = "app")]
    app: Option<String>,

    /// The property to set.
    property: Property,

    /// The new value. The property is cleared if this is empty or missing.
    value: Option<String>,
}

impl Set {
    pub(crate) async fn run(self, services: &Services) -> Result<()> {
        let scope = match self.app {
            Some(app) => Scope::App(app),
            None => Scope::Global,
        };
        let value = self.value.unwrap_or_default();
        services
            .properties
            .set(&scope, self.property, &value)
            .context(format!("Unable to set '{}'", self.property))?;

        if value.is_empty() {
            println!("Cleared '{}' {}", self.property, scope);
        } else {
            println!("Set '{}' {}", self.property, scope);
        }
        Ok(())
    }
}
