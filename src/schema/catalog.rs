//! The application's message shapes.
//!
//! Type schemas describe the stored documents, request schemas the accepted
//! inputs and response schemas what clients may rely on. Request and response
//! shapes are composed from the type schemas by name.

use serde_json::json;

use super::{schema_ref, SchemaError, SchemaRegistry};

pub const ID: &str = "ID";
pub const SERVICE: &str = "Service";
pub const SERVICE_ARRAY: &str = "ServiceArray";
pub const CAR: &str = "Car";
pub const CAR_ARRAY: &str = "CarArray";
pub const USER: &str = "User";
pub const VENDOR: &str = "Vendor";

pub const AUTHENTICATE: &str = "Authenticate";
pub const NEW_CAR: &str = "NewCar";
pub const PATCH_CAR: &str = "PatchCar";
pub const NEW_SERVICE: &str = "NewService";
pub const SEARCH: &str = "Search";
pub const PARAMS_ID: &str = "ParamsID";
pub const PAGINATION: &str = "Pagination";

pub const BASIC_RESPONSE: &str = "BasicResponse";
pub const USER_RESPONSE: &str = "UserResponse";
pub const CAR_PAGE: &str = "CarPage";
pub const SERVICE_PAGE: &str = "ServicePage";

/// Largest page a client may request.
pub const MAX_PER_PAGE: u64 = 100;

/// Builds the registry holding every schema the API uses.
pub fn registry() -> Result<SchemaRegistry, SchemaError> {
    SchemaRegistry::builder()
        // Types
        .define(ID, json!({ "type": "string", "format": "uuid" }))
        .define(
            SERVICE,
            json!({
                "type": "object",
                "required": ["date", "cost", "description", "receipt", "vendorID"],
                "properties": {
                    "id": schema_ref(ID),
                    "date": { "type": "string", "format": "date-time" },
                    "cost": { "type": "string", "minLength": 1, "maxLength": 30 },
                    "description": { "type": "string", "minLength": 1, "maxLength": 300 },
                    "vendorID": { "type": "string" },
                    "receipt": {
                        "type": "object",
                        "required": ["data", "contentType"],
                        "properties": {
                            "data": {},
                            "contentType": { "type": "string" }
                        }
                    }
                }
            }),
        )
        .define(
            SERVICE_ARRAY,
            json!({ "type": "array", "uniqueItems": true, "items": schema_ref(SERVICE) }),
        )
        .define(
            CAR,
            json!({
                "type": "object",
                "required": ["model", "year", "SPZ"],
                "properties": {
                    "id": schema_ref(ID),
                    "model": { "type": "string", "minLength": 5, "maxLength": 30 },
                    "SPZ": { "type": "string", "minLength": 7, "maxLength": 7 },
                    "year": { "type": "string", "minLength": 4, "maxLength": 4 },
                    "serviceBook": schema_ref(SERVICE_ARRAY)
                }
            }),
        )
        .define(
            CAR_ARRAY,
            json!({ "type": "array", "uniqueItems": true, "items": schema_ref(CAR) }),
        )
        .define(
            USER,
            json!({
                "type": "object",
                "required": ["email", "password"],
                "properties": {
                    "email": { "type": "string", "format": "email", "minLength": 5, "maxLength": 30 },
                    "password": { "type": "string", "minLength": 5, "maxLength": 60 },
                    "name": { "type": "string", "minLength": 5, "maxLength": 30 },
                    "telephone": { "type": "string", "minLength": 9, "maxLength": 13 },
                    "cars": schema_ref(CAR_ARRAY)
                }
            }),
        )
        .define(
            VENDOR,
            json!({
                "type": "object",
                "required": ["email", "name", "password"],
                "properties": {
                    "email": { "type": "string", "format": "email", "minLength": 5, "maxLength": 30 },
                    "password": { "type": "string", "minLength": 5, "maxLength": 60 },
                    "name": { "type": "string", "minLength": 5, "maxLength": 50 },
                    "telephone": { "type": "string", "minLength": 9, "maxLength": 13 },
                    "address": { "type": "string", "minLength": 9, "maxLength": 80 }
                }
            }),
        )
        // Requests
        .define(
            AUTHENTICATE,
            json!({
                "type": "object",
                "required": ["email", "password"],
                "properties": {
                    "email": { "type": "string", "format": "email", "minLength": 5, "maxLength": 30 },
                    "password": { "type": "string", "minLength": 5, "maxLength": 60 }
                }
            }),
        )
        .define(NEW_CAR, schema_ref(CAR))
        .define(
            PATCH_CAR,
            json!({
                "type": "object",
                "additionalProperties": false,
                "minProperties": 1,
                "properties": {
                    "model": { "type": "string", "minLength": 5, "maxLength": 30 },
                    "year": { "type": "string", "minLength": 4, "maxLength": 4 },
                    "SPZ": { "type": "string", "minLength": 7, "maxLength": 7 }
                }
            }),
        )
        // The vendor id comes from the vendor's token, not from the body.
        .define(
            NEW_SERVICE,
            json!({
                "$ref": SERVICE,
                "required": ["date", "cost", "description", "receipt"]
            }),
        )
        .define(
            SEARCH,
            json!({
                "type": "object",
                "additionalProperties": false,
                "required": ["query"],
                "properties": {
                    "type": { "type": "string", "enum": ["spz", "ownerid", "carid"] },
                    "query": { "type": "string", "minLength": 1 }
                }
            }),
        )
        .define(
            PARAMS_ID,
            json!({
                "type": "object",
                "required": ["id"],
                "properties": { "id": schema_ref(ID) }
            }),
        )
        .define(
            PAGINATION,
            json!({
                "type": "object",
                "properties": {
                    "page": { "type": "integer", "minimum": 1 },
                    "perPage": { "type": "integer", "minimum": 1, "maximum": MAX_PER_PAGE }
                }
            }),
        )
        // Responses
        .define(
            BASIC_RESPONSE,
            json!({
                "type": "object",
                "required": ["success"],
                "properties": {
                    "success": { "type": "boolean" },
                    "message": { "type": "string" }
                }
            }),
        )
        .define(
            USER_RESPONSE,
            json!({
                "type": "object",
                "required": ["id", "email"],
                "properties": {
                    "id": schema_ref(ID),
                    "email": { "type": "string", "format": "email", "minLength": 5, "maxLength": 30 },
                    "password": false,
                    "name": { "type": "string", "minLength": 5, "maxLength": 30 },
                    "telephone": { "type": "string", "minLength": 9, "maxLength": 13 },
                    "cars": schema_ref(CAR_ARRAY)
                }
            }),
        )
        .define(
            CAR_PAGE,
            json!({
                "$ref": BASIC_RESPONSE,
                "required": ["success", "cars", "page", "perPage", "total"],
                "properties": {
                    "success": { "type": "boolean" },
                    "message": { "type": "string" },
                    "cars": schema_ref(CAR_ARRAY),
                    "page": { "type": "integer", "minimum": 1 },
                    "perPage": { "type": "integer", "minimum": 1 },
                    "total": { "type": "integer", "minimum": 0 }
                }
            }),
        )
        .define(
            SERVICE_PAGE,
            json!({
                "$ref": BASIC_RESPONSE,
                "required": ["success", "serviceBook", "page", "perPage", "total"],
                "properties": {
                    "success": { "type": "boolean" },
                    "message": { "type": "string" },
                    "serviceBook": schema_ref(SERVICE_ARRAY),
                    "page": { "type": "integer", "minimum": 1 },
                    "perPage": { "type": "integer", "minimum": 1 },
                    "total": { "type": "integer", "minimum": 0 }
                }
            }),
        )
        .build()
}
