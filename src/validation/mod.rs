//!
//! # Request Validation
//!
//! A [`ValidationGate`] checks the configured parts of a request (body, path
//! parameters, query string) against schemas from the registry. Every part is
//! checked, and all failures are merged into one [`ValidationFailure`], so a
//! client sees the complete picture in a single round trip.
//!
//! Schema-declared coercions (numeric strings to numbers and so on) are
//! applied to a copy of the parts and only handed on when every part passes.
//! The actix-web middleware wrapping a gate lives in [`middleware`].

pub mod middleware;

pub use middleware::{Validate, ValidatedParts};

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use serde_json::Value;

use crate::schema::{FieldError, Schema, SchemaError, SchemaRegistry};

/// The parts of a request a schema can be attached to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum RequestPart {
    Body,
    Params,
    Query,
}

impl RequestPart {
    pub fn as_str(self) -> &'static str {
        match self {
            RequestPart::Body => "body",
            RequestPart::Params => "params",
            RequestPart::Query => "query",
        }
    }
}

impl fmt::Display for RequestPart {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which schema, by name, each request part is validated against.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationConfig {
    schemas: BTreeMap<RequestPart, String>,
}

impl ValidationConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn part(mut self, part: RequestPart, schema: impl Into<String>) -> Self {
        self.schemas.insert(part, schema.into());
        self
    }

    pub fn body(self, schema: impl Into<String>) -> Self {
        self.part(RequestPart::Body, schema)
    }

    pub fn params(self, schema: impl Into<String>) -> Self {
        self.part(RequestPart::Params, schema)
    }

    pub fn query(self, schema: impl Into<String>) -> Self {
        self.part(RequestPart::Query, schema)
    }
}

/// JSON views of the validatable parts of one request.
///
/// A part the transport could not decode (malformed JSON, a broken query
/// string) is recorded as unreadable and reported as a field error at the
/// root of that part when the part is validated.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RequestParts {
    pub body: Value,
    pub params: Value,
    pub query: Value,
    unreadable: BTreeMap<RequestPart, String>,
}

impl RequestParts {
    pub fn get(&self, part: RequestPart) -> &Value {
        match part {
            RequestPart::Body => &self.body,
            RequestPart::Params => &self.params,
            RequestPart::Query => &self.query,
        }
    }

    pub fn get_mut(&mut self, part: RequestPart) -> &mut Value {
        match part {
            RequestPart::Body => &mut self.body,
            RequestPart::Params => &mut self.params,
            RequestPart::Query => &mut self.query,
        }
    }

    pub fn mark_unreadable(&mut self, part: RequestPart, reason: impl Into<String>) {
        self.unreadable.insert(part, reason.into());
    }
}

/// Raised when one or more request parts fail their schema.
#[derive(Debug, Clone, Default, PartialEq, Eq, thiserror::Error)]
#[error("request validation failed: {}", describe(.errors))]
pub struct ValidationFailure {
    errors: BTreeMap<RequestPart, Vec<FieldError>>,
}

fn describe(errors: &BTreeMap<RequestPart, Vec<FieldError>>) -> String {
    errors
        .iter()
        .map(|(part, field_errors)| format!("{part}: [{}]", join(field_errors)))
        .collect::<Vec<_>>()
        .join("; ")
}

fn join(errors: &[FieldError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

impl ValidationFailure {
    pub fn new(part: RequestPart, errors: Vec<FieldError>) -> Self {
        let mut failure = Self::default();
        failure.insert(part, errors);
        failure
    }

    pub fn insert(&mut self, part: RequestPart, errors: Vec<FieldError>) {
        if !errors.is_empty() {
            self.errors.entry(part).or_default().extend(errors);
        }
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn errors(&self) -> &BTreeMap<RequestPart, Vec<FieldError>> {
        &self.errors
    }

    pub fn part(&self, part: RequestPart) -> Option<&[FieldError]> {
        self.errors.get(&part).map(Vec::as_slice)
    }

    /// One comma-joined message per failing part.
    pub fn summary(&self) -> BTreeMap<RequestPart, String> {
        self.errors
            .iter()
            .map(|(part, errors)| (*part, join(errors)))
            .collect()
    }

    /// Every `path: message` line per failing part.
    pub fn details(&self) -> BTreeMap<RequestPart, Vec<String>> {
        self.errors
            .iter()
            .map(|(part, errors)| (*part, errors.iter().map(ToString::to_string).collect()))
            .collect()
    }
}

/// The configured schemas of one route, resolved against the registry.
#[derive(Debug, Clone, Default)]
pub struct ValidationGate {
    schemas: Vec<(RequestPart, Arc<Schema>)>,
}

impl ValidationGate {
    /// Resolves every schema named in `config`. Fails with
    /// `SchemaError::SchemaNotFound` for a name the registry does not hold.
    pub fn new(registry: &SchemaRegistry, config: &ValidationConfig) -> Result<Self, SchemaError> {
        let schemas = config
            .schemas
            .iter()
            .map(|(part, name)| Ok((*part, registry.get(name)?)))
            .collect::<Result<Vec<_>, SchemaError>>()?;
        Ok(Self { schemas })
    }

    pub fn is_empty(&self) -> bool {
        self.schemas.is_empty()
    }

    pub fn validates(&self, part: RequestPart) -> bool {
        self.schemas.iter().any(|(configured, _)| *configured == part)
    }

    /// Checks every configured part. Returns the coerced parts when all of
    /// them pass; otherwise one failure holding the errors of every failing
    /// part, and `parts` is left as it was.
    pub fn check(&self, parts: &RequestParts) -> Result<RequestParts, ValidationFailure> {
        let mut coerced = parts.clone();
        let mut failure = ValidationFailure::default();

        for (part, schema) in &self.schemas {
            if let Some(reason) = parts.unreadable.get(part) {
                failure.insert(
                    *part,
                    vec![FieldError {
                        path: String::new(),
                        message: reason.clone(),
                    }],
                );
                continue;
            }

            let value = coerced.get_mut(*part);
            schema.coerce(value);
            if let Err(errors) = schema.validate(value) {
                failure.insert(*part, errors);
            }
        }

        if failure.is_empty() {
            Ok(coerced)
        } else {
            Err(failure)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    use crate::schema::catalog::{self, PAGINATION, PARAMS_ID, USER};

    fn registry() -> SchemaRegistry {
        catalog::registry().unwrap()
    }

    fn parts(body: Value, params: Value, query: Value) -> RequestParts {
        RequestParts {
            body,
            params,
            query,
            ..RequestParts::default()
        }
    }

    const CAR_ID: &str = "67e55044-10b1-426f-9247-bb680e5fe0c8";

    #[test]
    fn empty_configuration_always_passes() {
        let gate = ValidationGate::new(&registry(), &ValidationConfig::new()).unwrap();
        let input = parts(json!("anything"), Value::Null, json!({ "x": "y" }));
        assert_eq!(gate.check(&input).unwrap(), input);
    }

    #[test]
    fn unknown_schema_name_fails_gate_creation() {
        let result = ValidationGate::new(&registry(), &ValidationConfig::new().body("Boat"));
        assert!(matches!(result, Err(SchemaError::SchemaNotFound(_))));
    }

    #[test]
    fn all_parts_valid_returns_coerced_parts() {
        let config = ValidationConfig::new()
            .body(USER)
            .params(PARAMS_ID)
            .query(PAGINATION);
        let gate = ValidationGate::new(&registry(), &config).unwrap();
        let input = parts(
            json!({ "email": "a@b.com", "password": "testpass" }),
            json!({ "id": CAR_ID }),
            json!({ "page": "2", "perPage": "10" }),
        );

        let validated = gate.check(&input).unwrap();
        assert_eq!(validated.query, json!({ "page": 2, "perPage": 10 }));
        assert_eq!(validated.body, input.body);
    }

    #[test]
    fn single_failing_part_reports_one_key_and_coerces_nothing() {
        let config = ValidationConfig::new().params(PARAMS_ID).query(PAGINATION);
        let gate = ValidationGate::new(&registry(), &config).unwrap();
        let input = parts(Value::Null, json!({ "id": "not-a-uuid" }), json!({ "page": "3" }));

        let failure = gate.check(&input).unwrap_err();
        assert_eq!(failure.errors().len(), 1);
        assert!(failure.part(RequestPart::Params).is_some());
        // The caller keeps the untouched parts; the coerced copy is discarded.
        assert_eq!(input.query, json!({ "page": "3" }));
    }

    #[test]
    fn every_failing_part_is_reported() {
        let config = ValidationConfig::new()
            .body(USER)
            .params(PARAMS_ID)
            .query(PAGINATION);
        let gate = ValidationGate::new(&registry(), &config).unwrap();
        let input = parts(
            json!({ "email": "bademail" }),
            json!({ "id": "42" }),
            json!({ "page": "0" }),
        );

        let failure = gate.check(&input).unwrap_err();
        let keys: Vec<RequestPart> = failure.errors().keys().copied().collect();
        assert_eq!(
            keys,
            vec![RequestPart::Body, RequestPart::Params, RequestPart::Query]
        );
        assert!(failure.errors().values().all(|errors| !errors.is_empty()));
        // Missing password and malformed email are both reported.
        assert!(failure.part(RequestPart::Body).unwrap().len() >= 2);
    }

    #[test]
    fn missing_required_part_is_a_field_error() {
        let gate = ValidationGate::new(&registry(), &ValidationConfig::new().body(USER)).unwrap();
        let failure = gate.check(&RequestParts::default()).unwrap_err();
        let errors = failure.part(RequestPart::Body).unwrap();
        assert_eq!(errors[0].path, "");
    }

    #[test]
    fn unreadable_part_is_reported_under_its_name() {
        let gate = ValidationGate::new(&registry(), &ValidationConfig::new().body(USER)).unwrap();
        let mut input = RequestParts::default();
        input.mark_unreadable(RequestPart::Body, "invalid JSON: expected value");

        let failure = gate.check(&input).unwrap_err();
        assert_eq!(
            failure.summary().get(&RequestPart::Body).map(String::as_str),
            Some("invalid JSON: expected value")
        );
    }

    #[test]
    fn unreadable_part_outside_configuration_is_ignored() {
        let gate =
            ValidationGate::new(&registry(), &ValidationConfig::new().query(PAGINATION)).unwrap();
        let mut input = parts(Value::Null, json!({}), json!({}));
        input.mark_unreadable(RequestPart::Body, "invalid JSON");
        assert!(gate.check(&input).is_ok());
    }

    #[test]
    fn repeated_validation_yields_the_same_errors() {
        let gate = ValidationGate::new(&registry(), &ValidationConfig::new().body(USER)).unwrap();
        let input = parts(json!({ "email": "bademail", "password": "x" }), json!({}), json!({}));
        assert_eq!(gate.check(&input).unwrap_err(), gate.check(&input).unwrap_err());
    }

    #[test]
    fn register_scenario_mentions_the_email_field() {
        let gate = ValidationGate::new(&registry(), &ValidationConfig::new().body(USER)).unwrap();
        let failure = gate
            .check(&parts(
                json!({ "email": "bademail", "password": "testpass" }),
                json!({}),
                json!({}),
            ))
            .unwrap_err();
        let summary = failure.summary();
        assert!(summary[&RequestPart::Body].contains("email"));
        assert_eq!(summary.len(), 1);
    }
}
