//! Stream definition and builder

use super::partition::Partition;
use crate::error::{Error, Result};
use crate::schema::{Property, Schema};
use crate::types::ReplicationMethod;

/// Separator between parent and child in flattened field names
pub const FLATTEN_SEPARATOR: &str = "__";

/// Copies a nested value to a flat top-level field (`account.number` to
/// `account__number`)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlattenRule {
    source: Vec<String>,
    target: String,
}

impl FlattenRule {
    /// Rule from a dotted source path to a target field
    pub fn new(source: &str, target: impl Into<String>) -> Self {
        Self {
            source: source.split('.').map(str::to_string).collect(),
            target: target.into(),
        }
    }

    /// Rule implied by a flattened key name, if it has a separator
    pub fn from_flat_name(name: &str) -> Option<Self> {
        if !name.contains(FLATTEN_SEPARATOR) {
            return None;
        }
        let source: Vec<String> = name
            .split(FLATTEN_SEPARATOR)
            .map(str::to_string)
            .collect();
        if source.iter().any(String::is_empty) {
            return None;
        }
        Some(Self {
            source,
            target: name.to_string(),
        })
    }

    /// Path segments of the nested source
    pub fn source(&self) -> &[String] {
        &self.source
    }

    /// Dotted form of the source path
    pub fn source_path(&self) -> String {
        self.source.join(".")
    }

    /// Name of the flat field
    pub fn target(&self) -> &str {
        &self.target
    }
}

/// Static descriptor of one stream
#[derive(Debug, Clone)]
pub struct StreamDefinition {
    name: String,
    path: String,
    primary_keys: Vec<String>,
    replication_key: Option<String>,
    partitions: Vec<Partition>,
    params: Vec<(String, String)>,
    flatten_rules: Vec<FlattenRule>,
    schema: Schema,
}

impl StreamDefinition {
    /// Start building a stream
    pub fn builder(name: impl Into<String>, path: impl Into<String>) -> StreamDefinitionBuilder {
        StreamDefinitionBuilder::new(name, path)
    }

    /// Stream name (also the Singer `tap_stream_id`)
    pub fn name(&self) -> &str {
        &self.name
    }

    /// API path relative to the base URL
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Ordered primary key fields, as they appear in processed records
    pub fn primary_keys(&self) -> &[String] {
        &self.primary_keys
    }

    /// Field driving incremental replication
    pub fn replication_key(&self) -> Option<&str> {
        self.replication_key.as_deref()
    }

    /// Replication method implied by the replication key
    pub fn replication_method(&self) -> ReplicationMethod {
        if self.replication_key.is_some() {
            ReplicationMethod::Incremental
        } else {
            ReplicationMethod::FullTable
        }
    }

    /// Declared partitions (empty when unpartitioned)
    pub fn partitions(&self) -> &[Partition] {
        &self.partitions
    }

    /// Partitions to run; an unpartitioned stream runs one empty partition
    pub fn effective_partitions(&self) -> Vec<Partition> {
        if self.partitions.is_empty() {
            vec![Partition::new()]
        } else {
            self.partitions.clone()
        }
    }

    /// Fixed query parameters for every request of this stream
    pub fn params(&self) -> &[(String, String)] {
        &self.params
    }

    /// Flatten rules applied after fetch
    pub fn flatten_rules(&self) -> &[FlattenRule] {
        &self.flatten_rules
    }

    /// Record schema, including flattened fields
    pub fn schema(&self) -> &Schema {
        &self.schema
    }
}

/// Builder for `StreamDefinition`
#[derive(Debug, Clone)]
pub struct StreamDefinitionBuilder {
    name: String,
    path: String,
    primary_keys: Vec<String>,
    replication_key: Option<String>,
    partitions: Vec<Partition>,
    params: Vec<(String, String)>,
    flatten_rules: Vec<FlattenRule>,
    schema: Schema,
}

impl StreamDefinitionBuilder {
    fn new(name: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            path: path.into(),
            primary_keys: Vec::new(),
            replication_key: None,
            partitions: Vec::new(),
            params: Vec::new(),
            flatten_rules: Vec::new(),
            schema: Schema::new(),
        }
    }

    /// Set the primary key fields
    #[must_use]
    pub fn primary_keys<I, S>(mut self, keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.primary_keys = keys.into_iter().map(Into::into).collect();
        self
    }

    /// Set the replication key
    #[must_use]
    pub fn replication_key(mut self, key: impl Into<String>) -> Self {
        self.replication_key = Some(key.into());
        self
    }

    /// Set the static partition list
    #[must_use]
    pub fn partitions(mut self, partitions: Vec<Partition>) -> Self {
        self.partitions = partitions;
        self
    }

    /// Add a fixed query parameter
    #[must_use]
    pub fn param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.params.push((key.into(), value.into()));
        self
    }

    /// Add an explicit flatten rule (`"account.number"`, `"account__number"`)
    #[must_use]
    pub fn flatten(mut self, source: &str, target: impl Into<String>) -> Self {
        self.flatten_rules.push(FlattenRule::new(source, target));
        self
    }

    /// Set the record schema
    #[must_use]
    pub fn schema(mut self, schema: Schema) -> Self {
        self.schema = schema;
        self
    }

    /// Validate and build.
    ///
    /// Primary keys with a `__` separator that are not declared top-level
    /// fields get an implicit flatten rule. Every primary key must end up
    /// pointing at a scalar field.
    pub fn build(self) -> Result<StreamDefinition> {
        let Self {
            name,
            path,
            primary_keys,
            replication_key,
            partitions,
            params,
            mut flatten_rules,
            mut schema,
        } = self;

        if name.trim().is_empty() {
            return Err(Error::config("Stream name must not be empty"));
        }
        if !path.starts_with('/') {
            return Err(Error::config(format!(
                "Stream '{name}': path '{path}' must start with '/'"
            )));
        }
        if primary_keys.is_empty() {
            return Err(Error::config(format!(
                "Stream '{name}': at least one primary key is required"
            )));
        }

        for key in &primary_keys {
            let declared = schema.get(key).is_some();
            let has_rule = flatten_rules.iter().any(|r| r.target() == key);
            if !declared && !has_rule {
                if let Some(rule) = FlattenRule::from_flat_name(key) {
                    flatten_rules.push(rule);
                }
            }
        }

        for rule in &flatten_rules {
            let segments: Vec<&str> = rule.source().iter().map(String::as_str).collect();
            let source = schema.resolve(&segments).ok_or_else(|| {
                Error::config(format!(
                    "Stream '{name}': flatten source '{}' is not in the schema",
                    rule.source_path()
                ))
            })?;
            let flat = Property::new(rule.target(), source.field_type.clone());
            schema = schema.with(flat);
        }

        for key in &primary_keys {
            let property = schema.get(key).ok_or_else(|| {
                Error::config(format!("Stream '{name}': primary key '{key}' is not in the schema"))
            })?;
            if !property.field_type.is_scalar() {
                return Err(Error::config(format!(
                    "Stream '{name}': primary key '{key}' is not a scalar field"
                )));
            }
        }

        if let Some(key) = &replication_key {
            if schema.get(key).is_none() {
                return Err(Error::config(format!(
                    "Stream '{name}': replication key '{key}' is not in the schema"
                )));
            }
        }

        Ok(StreamDefinition {
            name,
            path,
            primary_keys,
            replication_key,
            partitions,
            params,
            flatten_rules,
            schema,
        })
    }
}
