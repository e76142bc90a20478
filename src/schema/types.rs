//! Schema types

use crate::types::{parse_timestamp, JsonObject};
use serde_json::{json, Map, Value};

/// Declared type of a field
#[derive(Debug, Clone, PartialEq)]
pub enum FieldType {
    /// JSON string
    String,
    /// Whole number
    Integer,
    /// Any JSON number
    Number,
    /// JSON boolean
    Boolean,
    /// String holding a timestamp
    DateTime,
    /// Nested object with its own properties
    Object(Vec<Property>),
    /// Homogeneous array
    Array(Box<FieldType>),
}

impl FieldType {
    /// Shorthand for an object type
    pub fn object(properties: impl IntoIterator<Item = Property>) -> Self {
        FieldType::Object(properties.into_iter().collect())
    }

    /// Shorthand for an array type
    pub fn array(items: FieldType) -> Self {
        FieldType::Array(Box::new(items))
    }

    /// Name of the JSON Schema type
    pub fn json_type(&self) -> &'static str {
        match self {
            FieldType::String | FieldType::DateTime => "string",
            FieldType::Integer => "integer",
            FieldType::Number => "number",
            FieldType::Boolean => "boolean",
            FieldType::Object(_) => "object",
            FieldType::Array(_) => "array",
        }
    }

    /// Whether values of this type are scalars
    pub fn is_scalar(&self) -> bool {
        !matches!(self, FieldType::Object(_) | FieldType::Array(_))
    }

    /// Check the JSON type of a (non-null) value; nested fields are not visited
    fn check(&self, value: &Value, name: &str) -> Result<(), String> {
        let ok = match (self, value) {
            (FieldType::String, Value::String(_))
            | (FieldType::Boolean, Value::Bool(_))
            | (FieldType::Number, Value::Number(_))
            | (FieldType::Object(_), Value::Object(_))
            | (FieldType::Array(_), Value::Array(_)) => true,
            (FieldType::DateTime, Value::String(s)) => parse_timestamp(s).is_some(),
            (FieldType::Integer, Value::Number(n)) => {
                n.is_i64() || n.is_u64() || n.as_f64().is_some_and(|f| f.fract() == 0.0)
            }
            _ => false,
        };

        if ok {
            Ok(())
        } else {
            Err(format!("field '{name}' expected {}, got {value}", self.json_type()))
        }
    }

    fn to_json_schema(&self, nullable: bool) -> Value {
        let type_value = if nullable {
            json!([self.json_type(), "null"])
        } else {
            json!(self.json_type())
        };
        let mut schema = Map::new();
        schema.insert("type".to_string(), type_value);
        match self {
            FieldType::DateTime => {
                schema.insert("format".to_string(), json!("date-time"));
            }
            FieldType::Object(properties) => {
                schema.insert("properties".to_string(), properties_schema(properties));
            }
            FieldType::Array(items) => {
                schema.insert("items".to_string(), items.to_json_schema(true));
            }
            _ => {}
        }
        Value::Object(schema)
    }
}

/// A named field
#[derive(Debug, Clone, PartialEq)]
pub struct Property {
    /// Field name in the flattened record
    pub name: String,
    /// Declared type
    pub field_type: FieldType,
    /// Whether `null` is accepted
    pub nullable: bool,
}

impl Property {
    /// A nullable property
    pub fn new(name: impl Into<String>, field_type: FieldType) -> Self {
        Self {
            name: name.into(),
            field_type,
            nullable: true,
        }
    }

    /// A property that must not be null when present
    pub fn required(name: impl Into<String>, field_type: FieldType) -> Self {
        Self {
            nullable: false,
            ..Self::new(name, field_type)
        }
    }
}

/// Schema of a stream's records
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Schema {
    properties: Vec<Property>,
}

impl Schema {
    /// Create an empty schema
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a nullable property
    #[must_use]
    pub fn property(self, name: impl Into<String>, field_type: FieldType) -> Self {
        self.with(Property::new(name, field_type))
    }

    /// Add a property; a property with the same name is replaced
    #[must_use]
    pub fn with(mut self, property: Property) -> Self {
        match self.properties.iter_mut().find(|p| p.name == property.name) {
            Some(existing) => *existing = property,
            None => self.properties.push(property),
        }
        self
    }

    /// Top-level properties in declaration order
    pub fn properties(&self) -> &[Property] {
        &self.properties
    }

    /// Look up a top-level property
    pub fn get(&self, name: &str) -> Option<&Property> {
        self.properties.iter().find(|p| p.name == name)
    }

    /// Resolve a nested property through object fields
    pub fn resolve(&self, path: &[&str]) -> Option<&Property> {
        let (first, rest) = path.split_first()?;
        let mut current = self.get(first)?;
        for segment in rest {
            let FieldType::Object(children) = &current.field_type else {
                return None;
            };
            current = children.iter().find(|p| p.name == *segment)?;
        }
        Some(current)
    }

    /// Render as a JSON Schema object
    pub fn to_json_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": properties_schema(&self.properties),
        })
    }

    /// Check a record's declared top-level fields against their types.
    ///
    /// Undeclared fields are ignored; absent fields are allowed. Object and
    /// array fields are checked for their JSON type only.
    pub fn check_record(&self, record: &JsonObject) -> Result<(), String> {
        for property in &self.properties {
            let Some(value) = record.get(&property.name) else {
                continue;
            };
            if value.is_null() {
                if property.nullable {
                    continue;
                }
                return Err(format!("field '{}' must not be null", property.name));
            }
            property.field_type.check(value, &property.name)?;
        }
        Ok(())
    }
}

fn properties_schema(properties: &[Property]) -> Value {
    let map: Map<String, Value> = properties
        .iter()
        .map(|p| (p.name.clone(), p.field_type.to_json_schema(p.nullable)))
        .collect();
    Value::Object(map)
}
