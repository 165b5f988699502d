//!
//! # Schema Registry
//!
//! A static catalogue of JSON Schemas, one per logical message shape, looked up
//! by name. Definitions may embed other definitions with `{"$ref": "<Name>"}`;
//! references are resolved once, when the registry is built, by inlining the
//! referenced schema. Keywords written next to a `$ref` override the keywords
//! of the referenced schema, which is how request shapes derive from types.
//!
//! Building the registry fails on dangling references, duplicate names and
//! circular references, so a running server only ever holds fully resolved,
//! compiled schemas.

pub mod catalog;
mod coerce;

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use jsonschema::Validator;
use serde::Serialize;
use serde_json::{Map, Value};

/// Errors raised while building or querying the registry.
#[derive(Debug, thiserror::Error)]
pub enum SchemaError {
    /// No schema is registered under the given name.
    #[error("schema not found: {0}")]
    SchemaNotFound(String),

    /// The definitions reference each other in a loop.
    #[error("circular schema reference: {0}")]
    SchemaCycle(String),

    /// The same name was defined twice.
    #[error("schema defined more than once: {0}")]
    DuplicateSchema(String),

    /// The resolved definition was rejected by the JSON Schema compiler.
    #[error("failed to compile schema {name}: {message}")]
    CompileFailed { name: String, message: String },

    /// An instance did not satisfy the named schema.
    #[error("instance does not match schema {name}: {}", join_errors(.errors))]
    ValidationFailed {
        name: String,
        errors: Vec<FieldError>,
    },
}

fn join_errors(errors: &[FieldError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// One field-level validation error.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    /// JSON pointer into the validated value; empty for the value itself.
    pub path: String,
    /// Human-readable description of the violated constraint.
    pub message: String,
}

impl fmt::Display for FieldError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.path.is_empty() {
            write!(f, "{}", self.message)
        } else {
            write!(f, "{}: {}", self.path, self.message)
        }
    }
}

/// A named, fully resolved and compiled schema.
pub struct Schema {
    name: String,
    definition: Value,
    validator: Validator,
}

impl Schema {
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The resolved definition, with every reference inlined.
    pub fn definition(&self) -> &Value {
        &self.definition
    }

    /// Validates `instance`, collecting every violation rather than stopping
    /// at the first one.
    pub fn validate(&self, instance: &Value) -> Result<(), Vec<FieldError>> {
        let errors: Vec<FieldError> = self
            .validator
            .iter_errors(instance)
            .map(|error| FieldError {
                path: error.instance_path.to_string(),
                message: error.to_string(),
            })
            .collect();

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }

    /// Rewrites string values into the `integer`, `number` or `boolean` the
    /// schema declares for them. Values that do not parse are left alone for
    /// `validate` to report.
    pub fn coerce(&self, instance: &mut Value) {
        coerce::coerce(&self.definition, instance);
    }
}

impl fmt::Debug for Schema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Schema")
            .field("name", &self.name)
            .field("definition", &self.definition)
            .finish_non_exhaustive()
    }
}

/// Name-keyed catalogue of compiled schemas.
#[derive(Debug, Default)]
pub struct SchemaRegistry {
    schemas: HashMap<String, Arc<Schema>>,
}

impl SchemaRegistry {
    pub fn builder() -> SchemaRegistryBuilder {
        SchemaRegistryBuilder::default()
    }

    /// Looks up a schema by name.
    pub fn get(&self, name: &str) -> Result<Arc<Schema>, SchemaError> {
        self.schemas
            .get(name)
            .cloned()
            .ok_or_else(|| SchemaError::SchemaNotFound(name.to_owned()))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.schemas.contains_key(name)
    }

    /// Registered names, sorted.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.schemas.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Validates `instance` against the named schema.
    pub fn validate(&self, name: &str, instance: &Value) -> Result<(), SchemaError> {
        self.get(name)?
            .validate(instance)
            .map_err(|errors| SchemaError::ValidationFailed {
                name: name.to_owned(),
                errors,
            })
    }
}

/// Collects raw definitions and resolves them into a [`SchemaRegistry`].
#[derive(Debug, Default)]
pub struct SchemaRegistryBuilder {
    definitions: Vec<(String, Value)>,
}

impl SchemaRegistryBuilder {
    /// Queues a definition. Resolution is deferred to [`build`](Self::build),
    /// so definitions may be queued in any order.
    pub fn define(mut self, name: impl Into<String>, definition: Value) -> Self {
        self.definitions.push((name.into(), definition));
        self
    }

    pub fn build(self) -> Result<SchemaRegistry, SchemaError> {
        let mut raw: HashMap<String, Value> = HashMap::with_capacity(self.definitions.len());
        for (name, definition) in self.definitions {
            if raw.contains_key(&name) {
                return Err(SchemaError::DuplicateSchema(name));
            }
            raw.insert(name, definition);
        }

        let mut names: Vec<&String> = raw.keys().collect();
        names.sort_unstable();

        let mut resolver = Resolver {
            raw: &raw,
            resolved: HashMap::with_capacity(raw.len()),
            stack: Vec::new(),
        };
        for name in names {
            resolver.resolve(name)?;
        }

        let mut schemas = HashMap::with_capacity(resolver.resolved.len());
        for (name, definition) in resolver.resolved {
            let validator = jsonschema::options()
                .should_validate_formats(true)
                .build(&definition)
                .map_err(|err| SchemaError::CompileFailed {
                    name: name.clone(),
                    message: err.to_string(),
                })?;
            log::debug!("registered schema {name}");
            schemas.insert(
                name.clone(),
                Arc::new(Schema {
                    name,
                    definition,
                    validator,
                }),
            );
        }

        Ok(SchemaRegistry { schemas })
    }
}

struct Resolver<'a> {
    raw: &'a HashMap<String, Value>,
    resolved: HashMap<String, Value>,
    stack: Vec<String>,
}

impl Resolver<'_> {
    fn resolve(&mut self, name: &str) -> Result<Value, SchemaError> {
        if let Some(done) = self.resolved.get(name) {
            return Ok(done.clone());
        }

        if let Some(start) = self.stack.iter().position(|pending| pending == name) {
            let mut cycle = self.stack[start..].to_vec();
            cycle.push(name.to_owned());
            return Err(SchemaError::SchemaCycle(cycle.join(" -> ")));
        }

        let mut expanded = self
            .raw
            .get(name)
            .cloned()
            .ok_or_else(|| SchemaError::SchemaNotFound(name.to_owned()))?;

        self.stack.push(name.to_owned());
        self.inline_refs(&mut expanded)?;
        self.stack.pop();

        self.resolved.insert(name.to_owned(), expanded.clone());
        Ok(expanded)
    }

    fn inline_refs(&mut self, value: &mut Value) -> Result<(), SchemaError> {
        match value {
            Value::Object(map) => {
                if let Some(reference) = map.remove("$ref") {
                    let target = reference
                        .as_str()
                        .ok_or_else(|| SchemaError::SchemaNotFound(reference.to_string()))?;
                    let Value::Object(mut merged) = self.resolve(target)? else {
                        return Err(SchemaError::CompileFailed {
                            name: target.to_owned(),
                            message: "referenced schema is not an object".into(),
                        });
                    };
                    for (keyword, mut local) in std::mem::take(map) {
                        self.inline_refs(&mut local)?;
                        merged.insert(keyword, local);
                    }
                    *map = merged;
                } else {
                    for keyword in map.values_mut() {
                        self.inline_refs(keyword)?;
                    }
                }
            }
            Value::Array(items) => {
                for item in items {
                    self.inline_refs(item)?;
                }
            }
            _ => {}
        }
        Ok(())
    }
}

/// Shorthand for a by-name reference inside a definition.
pub fn schema_ref(name: &str) -> Value {
    let mut reference = Map::new();
    reference.insert("$ref".into(), Value::String(name.to_owned()));
    Value::Object(reference)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn car() -> Value {
        json!({
            "type": "object",
            "required": ["model"],
            "properties": { "model": { "type": "string", "minLength": 2 } }
        })
    }

    #[test]
    fn composite_embeds_base_schema() {
        let registry = SchemaRegistry::builder()
            .define("CarArray", json!({ "type": "array", "items": { "$ref": "Car" } }))
            .define("Car", car())
            .build()
            .unwrap();

        let car_array = registry.get("CarArray").unwrap();
        assert_eq!(car_array.definition()["items"], car());
        assert!(car_array.validate(&json!([{ "model": "Octavia" }])).is_ok());

        let errors = car_array.validate(&json!([{ "model": "X" }, {}])).unwrap_err();
        assert_eq!(errors.len(), 2);
        assert_eq!(errors[0].path, "/0/model");
    }

    #[test]
    fn local_keywords_override_referenced_ones() {
        let registry = SchemaRegistry::builder()
            .define("Car", car())
            .define("PartialCar", json!({ "$ref": "Car", "required": [] }))
            .build()
            .unwrap();

        assert!(registry.validate("PartialCar", &json!({})).is_ok());
        assert!(registry.validate("Car", &json!({})).is_err());
    }

    #[test]
    fn unknown_reference_is_rejected() {
        let result = SchemaRegistry::builder()
            .define("CarArray", json!({ "type": "array", "items": schema_ref("Car") }))
            .build();
        assert!(matches!(result, Err(SchemaError::SchemaNotFound(name)) if name == "Car"));
    }

    #[test]
    fn circular_reference_is_rejected() {
        let result = SchemaRegistry::builder()
            .define("A", json!({ "type": "object", "properties": { "b": schema_ref("B") } }))
            .define("B", json!({ "type": "array", "items": schema_ref("A") }))
            .build();
        match result {
            Err(SchemaError::SchemaCycle(path)) => assert_eq!(path, "A -> B -> A"),
            other => panic!("expected a cycle error, got {other:?}"),
        }
    }

    #[test]
    fn self_reference_is_rejected() {
        let result = SchemaRegistry::builder()
            .define("Node", json!({ "type": "array", "items": schema_ref("Node") }))
            .build();
        assert!(matches!(result, Err(SchemaError::SchemaCycle(_))));
    }

    #[test]
    fn duplicate_name_is_rejected() {
        let result = SchemaRegistry::builder()
            .define("Car", car())
            .define("Car", car())
            .build();
        assert!(matches!(result, Err(SchemaError::DuplicateSchema(name)) if name == "Car"));
    }

    #[test]
    fn invalid_definition_fails_compile() {
        let result = SchemaRegistry::builder()
            .define("Broken", json!({ "type": "definitely-not-a-type" }))
            .build();
        assert!(matches!(result, Err(SchemaError::CompileFailed { .. })));
    }

    #[test]
    fn lookup_of_unregistered_name_fails() {
        let registry = SchemaRegistry::builder().define("Car", car()).build().unwrap();
        assert!(matches!(registry.get("Boat"), Err(SchemaError::SchemaNotFound(_))));
        assert_eq!(registry.names(), vec!["Car"]);
    }

    #[test]
    fn formats_are_enforced() {
        let registry = SchemaRegistry::builder()
            .define("Email", json!({ "type": "string", "format": "email" }))
            .build()
            .unwrap();
        assert!(registry.validate("Email", &json!("a@b.com")).is_ok());
        assert!(registry.validate("Email", &json!("bademail")).is_err());
    }

    #[test]
    fn validation_is_repeatable() {
        let registry = SchemaRegistry::builder().define("Car", car()).build().unwrap();
        let schema = registry.get("Car").unwrap();
        let instance = json!({ "model": 7 });
        assert_eq!(schema.validate(&instance), schema.validate(&instance));
    }
}
