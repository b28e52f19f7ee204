use crate::Services;
use anyhow::{Context, Result};
use clap::Parser;
use k3s_model::{OutputFormat, Property, PropertyReport, Scope};

/// Show the scheduler properties, either the global values or the values an app will use.
#[derive(Debug, Parser)]
pub(crate) struct Report {
    /// Show the computed values for this app.
    #[clap(long = "app")]
    app: Option<String>,

    /// The output format [stdout|json].
    #[clap(long = "format", default_value = "stdout")]
    format: OutputFormat,

    /// Print only the value of this property.
    #[clap(long = "property")]
    property: Option<Property>,
}

impl Report {
    pub(crate) async fn run(self, services: &Services) -> Result<()> {
        let scope = match self.app {
            Some(app) => Scope::App(app),
            None => Scope::Global,
        };
        let values = services
            .properties
            .values(&scope)
            .context("Unable to read properties")?;
        let report = PropertyReport::new(scope.clone(), values);

        match self.property {
            Some(property) => {
                let value = report
                    .value(property)
                    .context(format!("Property '{}' is not reported {}", property, scope))?;
                println!("{}", value);
            }
            None => println!(
                "{}",
                report
                    .render(self.format)
                    .context("Unable to render property report")?
            ),
        }
        Ok(())
    }
}
