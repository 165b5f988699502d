//! `/api/vendor`: registration, authentication, car lookup and service entries.

use actix_web::{web, HttpResponse};
use serde::Deserialize;

use super::user::CarId;
use crate::auth::{hash_password, verify_password, AuthenticatedUser, Role};
use crate::error::{AppError, DomainError};
use crate::models::{Credentials, NewAccount, NewService, Vendor};
use crate::response::BasicResponse;
use crate::state::AppState;
use crate::validation::ValidatedParts;

/// `{query}` path segment, checked by the `Search` schema.
#[derive(Debug, Deserialize)]
pub struct SearchParams {
    pub query: String,
}

pub async fn register(
    state: web::Data<AppState>,
    parts: ValidatedParts,
) -> Result<HttpResponse, AppError> {
    let account: NewAccount = parts.body()?;
    let password_hash = hash_password(&account.password, state.bcrypt_cost)?;
    let vendor = state
        .store
        .create_vendor(Vendor::new(account, password_hash))
        .await?;

    log::info!("Registered vendor {}", vendor.id);
    Ok(HttpResponse::Created()
        .json(BasicResponse::ok("Vendor register successful").with("vendor", &vendor)?))
}

pub async fn authenticate(
    state: web::Data<AppState>,
    parts: ValidatedParts,
) -> Result<HttpResponse, AppError> {
    let credentials: Credentials = parts.body()?;
    let vendor = state
        .store
        .find_vendor_by_email(&credentials.email)
        .await?
        .ok_or_else(DomainError::user_not_found)?;

    if !verify_password(&credentials.password, &vendor.password_hash)? {
        return Err(DomainError::bad_password().into());
    }

    let token = state.tokens.issue(vendor.id, Role::Vendor)?;
    Ok(HttpResponse::Ok()
        .json(BasicResponse::ok("Authentication success. Token generated").with("token", token)?))
}

/// Looks a car up by its registration plate.
pub async fn search_car(
    state: web::Data<AppState>,
    parts: ValidatedParts,
) -> Result<HttpResponse, AppError> {
    let SearchParams { query } = parts.params()?;

    let car = state
        .store
        .find_car_owner_by_spz(&query)
        .await?
        .and_then(|owner| owner.cars.into_iter().find(|car| car.spz == query))
        .ok_or_else(|| DomainError::not_found("Car not found").with_metadata("SPZ", query))?;

    Ok(HttpResponse::Ok().json(BasicResponse::ok("Car found").with("car", &car)?))
}

/// Appends an entry, signed by the calling vendor, to a car's service book.
pub async fn add_service(
    state: web::Data<AppState>,
    caller: AuthenticatedUser,
    parts: ValidatedParts,
) -> Result<HttpResponse, AppError> {
    let CarId { id } = parts.params()?;
    let service = parts.body::<NewService>()?.into_service(caller.id);

    let service = state.store.push_service(id, service).await?;

    log::info!("Vendor {} added service {} to car {}", caller.id, service.id, id);
    Ok(HttpResponse::Created().json(BasicResponse::ok("Service added").with("service", &service)?))
}
