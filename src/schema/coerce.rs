use serde_json::{Map, Number, Value};

/// Walks `instance` alongside a resolved `schema`, replacing strings with the
/// scalar type the schema declares at that position.
pub(crate) fn coerce(schema: &Value, instance: &mut Value) {
    let Value::Object(keywords) = schema else {
        return;
    };

    if let Some(replacement) = instance
        .as_str()
        .and_then(|text| coerce_scalar(keywords, text))
    {
        *instance = replacement;
        return;
    }

    match instance {
        Value::Object(fields) => {
            if let Some(Value::Object(properties)) = keywords.get("properties") {
                for (name, field) in fields.iter_mut() {
                    if let Some(field_schema) = properties.get(name) {
                        coerce(field_schema, field);
                    }
                }
            }
        }
        Value::Array(items) => {
            if let Some(item_schema) = keywords.get("items") {
                for item in items {
                    coerce(item_schema, item);
                }
            }
        }
        _ => {}
    }
}

fn declared_types(keywords: &Map<String, Value>) -> Vec<&str> {
    match keywords.get("type") {
        Some(Value::String(kind)) => vec![kind.as_str()],
        Some(Value::Array(kinds)) => kinds.iter().filter_map(Value::as_str).collect(),
        _ => Vec::new(),
    }
}

fn coerce_scalar(keywords: &Map<String, Value>, text: &str) -> Option<Value> {
    let types = declared_types(keywords);
    if types.contains(&"string") {
        return None;
    }

    let text = text.trim();
    types.into_iter().find_map(|kind| match kind {
        "integer" => text.parse::<i64>().ok().map(Value::from),
        "number" => text
            .parse::<f64>()
            .ok()
            .and_then(Number::from_f64)
            .map(Value::Number),
        "boolean" => match text {
            "true" => Some(Value::Bool(true)),
            "false" => Some(Value::Bool(false)),
            _ => None,
        },
        _ => None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn numeric_strings_become_numbers() {
        let schema = json!({
            "type": "object",
            "properties": {
                "page": { "type": "integer" },
                "ratio": { "type": "number" },
                "active": { "type": "boolean" },
                "name": { "type": "string" }
            }
        });
        let mut instance = json!({ "page": "2", "ratio": "0.5", "active": "true", "name": "42" });
        coerce(&schema, &mut instance);
        assert_eq!(
            instance,
            json!({ "page": 2, "ratio": 0.5, "active": true, "name": "42" })
        );
    }

    #[test]
    fn unparseable_values_are_left_for_validation() {
        let schema = json!({ "type": "object", "properties": { "page": { "type": "integer" } } });
        let mut instance = json!({ "page": "two" });
        coerce(&schema, &mut instance);
        assert_eq!(instance, json!({ "page": "two" }));
    }

    #[test]
    fn array_items_are_coerced() {
        let schema = json!({ "type": "array", "items": { "type": "integer" } });
        let mut instance = json!(["1", "2", 3]);
        coerce(&schema, &mut instance);
        assert_eq!(instance, json!([1, 2, 3]));
    }

    #[test]
    fn string_in_type_union_wins() {
        let schema = json!({ "type": ["string", "integer"] });
        let mut instance = json!("7");
        coerce(&schema, &mut instance);
        assert_eq!(instance, json!("7"));
    }
}
