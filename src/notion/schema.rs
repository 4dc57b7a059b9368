// ABOUTME: Checks that the Notion database has the properties the sync writes
// ABOUTME: Reports missing properties and type mismatches before any page is touched

use std::fmt;

use super::client::NotionClient;
use super::models::DatabaseObject;
use crate::config::PropertyMapping;
use crate::error::{Result, SyncError};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeMismatch {
    pub property: String,
    pub expected: &'static str,
    pub actual: String,
}

/// Outcome of comparing the database schema against the property mapping.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SchemaReport {
    pub database_title: String,
    pub missing: Vec<String>,
    pub mismatched: Vec<TypeMismatch>,
}

impl SchemaReport {
    pub fn is_valid(&self) -> bool {
        self.missing.is_empty() && self.mismatched.is_empty()
    }

    /// Turn an invalid report into a configuration error.
    pub fn into_result(self) -> Result<Self> {
        if self.is_valid() {
            Ok(self)
        } else {
            Err(SyncError::Config(format!(
                "Notion database does not match the property mapping: {}. \
                 Add the properties to the database or adjust [properties] in the config file",
                self
            )))
        }
    }
}

impl fmt::Display for SchemaReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut parts = Vec::new();
        if !self.missing.is_empty() {
            parts.push(format!("missing properties [{}]", self.missing.join(", ")));
        }
        for m in &self.mismatched {
            parts.push(format!(
                "'{}' is {} (expected {})",
                m.property, m.actual, m.expected
            ));
        }
        if parts.is_empty() {
            write!(f, "ok")
        } else {
            write!(f, "{}", parts.join("; "))
        }
    }
}

/// Compare a database schema with the mapping.
pub fn check_schema(database: &DatabaseObject, mapping: &PropertyMapping) -> SchemaReport {
    let mut report = SchemaReport {
        database_title: database.title_text(),
        ..SchemaReport::default()
    };

    for (name, expected) in mapping.expected_types() {
        match database.property_type(name) {
            None => report.missing.push(name.to_string()),
            Some(actual) if actual != expected => report.mismatched.push(TypeMismatch {
                property: name.to_string(),
                expected,
                actual: actual.to_string(),
            }),
            Some(_) => {}
        }
    }

    report
}

/// Fetch the database schema and check it against the client's mapping.
pub async fn validate_database(client: &NotionClient) -> Result<SchemaReport> {
    let database = client.retrieve_database().await?;
    let report = check_schema(&database, client.properties());

    for name in &report.missing {
        tracing::warn!("Database is missing property '{}'", name);
    }
    for m in &report.mismatched {
        tracing::warn!(
            "Property '{}' type mismatch: database has {}, expected {}",
            m.property,
            m.actual,
            m.expected
        );
    }
    if report.is_valid() {
        tracing::info!("Database structure validated: {}", report.database_title);
    }

    Ok(report)
}
