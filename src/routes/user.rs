//! `/api/user`: registration, authentication and the owner's garage.

use actix_web::{web, HttpResponse};
use serde::Deserialize;
use uuid::Uuid;

use crate::auth::{hash_password, verify_password, AuthenticatedUser, Role};
use crate::error::{AppError, DomainError};
use crate::models::{CarPatch, Credentials, NewAccount, NewCar, Page, Pagination, User};
use crate::response::BasicResponse;
use crate::state::AppState;
use crate::store::car_not_found;
use crate::validation::ValidatedParts;

/// `{id}` path segment, checked by the `ParamsID` schema.
#[derive(Debug, Deserialize)]
pub struct CarId {
    pub id: Uuid,
}

pub async fn register(
    state: web::Data<AppState>,
    parts: ValidatedParts,
) -> Result<HttpResponse, AppError> {
    let account: NewAccount = parts.body()?;
    let password_hash = hash_password(&account.password, state.bcrypt_cost)?;
    let user = state
        .store
        .create_user(User::new(account, password_hash))
        .await?;

    log::info!("Registered user {}", user.id);
    Ok(HttpResponse::Created().json(BasicResponse::ok("User register successful").with("user", &user)?))
}

pub async fn authenticate(
    state: web::Data<AppState>,
    parts: ValidatedParts,
) -> Result<HttpResponse, AppError> {
    let credentials: Credentials = parts.body()?;
    let user = state
        .store
        .find_user_by_email(&credentials.email)
        .await?
        .ok_or_else(DomainError::user_not_found)?;

    if !verify_password(&credentials.password, &user.password_hash)? {
        return Err(DomainError::bad_password().into());
    }

    let token = state.tokens.issue(user.id, Role::User)?;
    Ok(HttpResponse::Ok()
        .json(BasicResponse::ok("Authentication success. Token generated").with("token", token)?))
}

pub async fn profile(
    state: web::Data<AppState>,
    caller: AuthenticatedUser,
) -> Result<HttpResponse, AppError> {
    let user = state.store.find_user(caller.id).await?;
    Ok(HttpResponse::Ok().json(BasicResponse::ok("User found").with("user", &user)?))
}

pub async fn list_cars(
    state: web::Data<AppState>,
    caller: AuthenticatedUser,
    parts: ValidatedParts,
) -> Result<HttpResponse, AppError> {
    let pagination: Pagination = parts.query()?;
    let user = state.store.find_user(caller.id).await?;
    let page = Page::slice(&user.cars, pagination);
    Ok(HttpResponse::Ok().json(BasicResponse::ok("").with_page("cars", page)?))
}

pub async fn add_car(
    state: web::Data<AppState>,
    caller: AuthenticatedUser,
    parts: ValidatedParts,
) -> Result<HttpResponse, AppError> {
    let car = parts.body::<NewCar>()?.into_car();
    let car = state.store.push_car(caller.id, car).await?;

    Ok(HttpResponse::Created().json(BasicResponse::ok("Car added").with("car", &car)?))
}

pub async fn update_car(
    state: web::Data<AppState>,
    caller: AuthenticatedUser,
    parts: ValidatedParts,
) -> Result<HttpResponse, AppError> {
    let CarId { id } = parts.params()?;
    let patch: CarPatch = parts.body()?;

    let updated = state.store.update_car(caller.id, id, patch).await?;

    Ok(HttpResponse::Ok().json(BasicResponse::ok("Car updated").with("updatedCar", &updated)?))
}

pub async fn delete_car(
    state: web::Data<AppState>,
    caller: AuthenticatedUser,
    parts: ValidatedParts,
) -> Result<HttpResponse, AppError> {
    let CarId { id } = parts.params()?;
    state.store.remove_car(caller.id, id).await?;

    Ok(HttpResponse::NoContent().finish())
}

pub async fn list_services(
    state: web::Data<AppState>,
    caller: AuthenticatedUser,
    parts: ValidatedParts,
) -> Result<HttpResponse, AppError> {
    let CarId { id } = parts.params()?;
    let pagination: Pagination = parts.query()?;

    let user = state.store.find_user(caller.id).await?;
    let car = user.car(id).ok_or_else(|| car_not_found(id))?;
    let page = Page::slice(&car.service_book, pagination);
    Ok(HttpResponse::Ok().json(BasicResponse::ok("").with_page("serviceBook", page)?))
}
