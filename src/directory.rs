//! Directory lookup: which endpoints belong to the PBX, and their names.
//!
//! The PBX admin API answers a GraphQL query listing extensions and ring
//! groups. Only the payload is handled here; fetching it is left to the
//! caller.

use std::collections::{HashMap, HashSet};

use serde_json::Value;
use tracing::debug;

use crate::builder::AnalysisContext;
use crate::error::{CdrError, CdrResult};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Directory {
    /// Extension and ring-group numbers
    pub internal: HashSet<String>,
    /// Extension number to user name, ring-group number to description
    pub names: HashMap<String, String>,
}

impl Directory {
    /// Build from a `fetchAllExtensions` / `fetchAllRingGroups` response,
    /// with or without the outer `data` envelope.
    pub fn from_graphql(payload: &Value) -> CdrResult<Self> {
        let data = payload
            .get("data")
            .unwrap_or(payload);

        let extensions = data
            .pointer("/fetchAllExtensions/extension")
            .and_then(Value::as_array)
            .ok_or_else(|| CdrError::invalid_directory("missing fetchAllExtensions.extension"))?;
        let ringgroups = data
            .pointer("/fetchAllRingGroups/ringgroups")
            .and_then(Value::as_array)
            .ok_or_else(|| CdrError::invalid_directory("missing fetchAllRingGroups.ringgroups"))?;

        let mut directory = Directory::default();
        for extension in extensions {
            let Some(number) = extension
                .get("extensionId")
                .and_then(scalar_text)
            else {
                continue;
            };
            if let Some(name) = extension
                .pointer("/user/name")
                .and_then(Value::as_str)
            {
                directory
                    .names
                    .insert(number.clone(), name.to_string());
            }
            directory
                .internal
                .insert(number);
        }
        for group in ringgroups {
            let Some(number) = group
                .get("groupNumber")
                .and_then(scalar_text)
            else {
                continue;
            };
            if let Some(description) = group
                .get("description")
                .and_then(Value::as_str)
            {
                directory
                    .names
                    .insert(number.clone(), description.to_string());
            }
            directory
                .internal
                .insert(number);
        }

        debug!(
            "Directory: {} internal endpoints, {} names",
            directory
                .internal
                .len(),
            directory
                .names
                .len()
        );
        Ok(directory)
    }

    pub fn from_json_str(input: &str) -> CdrResult<Self> {
        let payload: Value = serde_json::from_str(input)?;
        Self::from_graphql(&payload)
    }

    pub fn is_internal(&self, endpoint: &str) -> bool {
        self.internal
            .contains(endpoint)
    }

    /// Name to show for an endpoint, the endpoint itself when unknown.
    pub fn display_name<'a>(&'a self, endpoint: &'a str) -> &'a str {
        self.names
            .get(endpoint)
            .map(String::as_str)
            .unwrap_or(endpoint)
    }

    /// Analysis context over this directory's internal endpoints.
    pub fn context<I, S>(&self, reference_numbers: I) -> AnalysisContext
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        AnalysisContext::new(
            self.internal
                .iter()
                .cloned(),
            reference_numbers,
        )
    }
}

/// Identifiers arrive as strings or integers depending on the PBX version.
fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}
