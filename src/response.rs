use serde::Serialize;
use serde_json::{Map, Value};

use crate::error::{AppError, UnclassifiedError};
use crate::models::Page;

/// Success envelope: `{success, message, ...extra}`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BasicResponse {
    pub success: bool,
    pub message: String,
    #[serde(flatten)]
    extra: Map<String, Value>,
}

impl BasicResponse {
    pub fn ok(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
            extra: Map::new(),
        }
    }

    /// Adds `key` next to `success` and `message`.
    pub fn with(mut self, key: &str, value: impl Serialize) -> Result<Self, AppError> {
        let value = serde_json::to_value(value)
            .map_err(|e| UnclassifiedError::from_error("SerializationError", &e))?;
        self.extra.insert(key.to_owned(), value);
        Ok(self)
    }

    /// Adds the page items under `key` plus `page`, `perPage` and `total`.
    pub fn with_page<T: Serialize>(self, key: &str, page: Page<T>) -> Result<Self, AppError> {
        self.with(key, page.items)?
            .with("page", page.page)?
            .with("perPage", page.per_page)?
            .with("total", page.total)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn test_extra_fields_are_flattened() {
        let response = BasicResponse::ok("Authentication success. Token generated")
            .with("token", "abc")
            .unwrap();
        assert_eq!(
            serde_json::to_value(response).unwrap(),
            json!({
                "success": true,
                "message": "Authentication success. Token generated",
                "token": "abc"
            })
        );
    }

    #[test]
    fn test_page_fields() {
        let page = Page {
            items: vec![1, 2],
            page: 1,
            per_page: 2,
            total: 7,
        };
        let json = serde_json::to_value(BasicResponse::ok("").with_page("cars", page).unwrap()).unwrap();
        assert_eq!(json["cars"], json!([1, 2]));
        assert_eq!(json["perPage"], 2);
        assert_eq!(json["total"], 7);
    }
}
