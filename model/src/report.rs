use crate::error::{self, Result};
use crate::node::ClusterNode;
use crate::parse_error::impl_from_str_with_parse_error;
use crate::properties::{Property, Scope};
use serde::{Deserialize, Serialize};
use snafu::ResultExt;
use std::collections::BTreeMap;
use tabled::{object::Segment, Alignment, Modify, Style, Table, Tabled};

/// How a report is written to the terminal.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// A human readable table.
    Stdout,
    /// A single JSON document.
    Json,
}

impl_from_str_with_parse_error!(OutputFormat);

impl Default for OutputFormat {
    fn default() -> Self {
        Self::Stdout
    }
}

/// `NodeReport` lists the members of a cluster. `NodeReport::render` creates either a table or a
/// JSON array of `{name, ready, roles, version}` objects.
#[derive(Debug, Clone, Default)]
pub struct NodeReport {
    nodes: Vec<ClusterNode>,
}

#[derive(Serialize)]
struct NodeEntry<'a> {
    name: &'a str,
    ready: bool,
    roles: Vec<&'a str>,
    version: &'a str,
}

#[derive(Tabled)]
struct NodeRow {
    name: String,
    ready: String,
    roles: String,
    version: String,
}

impl NodeReport {
    pub fn new(mut nodes: Vec<ClusterNode>) -> Self {
        nodes.sort_by(|a, b| a.name.cmp(&b.name));
        Self { nodes }
    }

    pub fn nodes(&self) -> &[ClusterNode] {
        &self.nodes
    }

    pub fn render(&self, format: OutputFormat) -> Result<String> {
        match format {
            OutputFormat::Stdout => Ok(self.table()),
            OutputFormat::Json => self.json(),
        }
    }

    fn json(&self) -> Result<String> {
        let entries: Vec<NodeEntry<'_>> = self
            .nodes
            .iter()
            .map(|node| NodeEntry {
                name: &node.name,
                ready: node.ready,
                roles: node.roles.iter().map(String::as_str).collect(),
                version: &node.version,
            })
            .collect();
        Ok(serde_json::to_string(&entries).context(error::ReportSerializeSnafu)?)
    }

    fn table(&self) -> String {
        let rows = self.nodes.iter().map(|node| NodeRow {
            name: node.name.clone(),
            ready: node.ready.to_string(),
            roles: node
                .roles
                .iter()
                .map(String::as_str)
                .collect::<Vec<_>>()
                .join(","),
            version: node.version.clone(),
        });
        Table::new(rows)
            .with(Style::blank())
            .with(Modify::new(Segment::all()).with(Alignment::left()))
            .to_string()
    }
}

/// The property values of one scope, as shown by `report`.
#[derive(Debug, Clone)]
pub struct PropertyReport {
    scope: Scope,
    values: BTreeMap<Property, String>,
}

#[derive(Tabled)]
struct PropertyRow {
    property: String,
    value: String,
}

impl PropertyReport {
    pub fn new(scope: Scope, values: BTreeMap<Property, String>) -> Self {
        Self { scope, values }
    }

    /// The value of a single property, or `None` if it does not belong to this report's scope.
    pub fn value(&self, property: Property) -> Option<&str> {
        self.values.get(&property).map(String::as_str)
    }

    pub fn render(&self, format: OutputFormat) -> Result<String> {
        match format {
            OutputFormat::Json => {
                let values: BTreeMap<&str, &str> = self
                    .values
                    .iter()
                    .map(|(property, value)| (property.name(), value.as_str()))
                    .collect();
                Ok(serde_json::to_string(&values).context(error::ReportSerializeSnafu)?)
            }
            OutputFormat::Stdout => {
                let rows = self.values.iter().map(|(property, value)| PropertyRow {
                    property: property.to_string(),
                    value: value.clone(),
                });
                let table = Table::new(rows)
                    .with(Style::blank())
                    .with(Modify::new(Segment::all()).with(Alignment::left()))
                    .to_string();
                Ok(format!("=====> scheduler-k3s {}\n{}", self.scope, table))
            }
        }
    }
}
