use std::collections::HashMap;

use tokio::sync::RwLock;
use uuid::Uuid;

use crate::error::{AppError, DomainError};
use super::CarsOf;
use crate::models::{Car, User, Vendor};

/// Process-local store used for tests and for running without a database.
#[derive(Debug, Default)]
pub struct MemoryStore {
    users: RwLock<HashMap<Uuid, User>>,
    vendors: RwLock<HashMap<Uuid, Vendor>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn create_user(&self, user: User) -> Result<User, AppError> {
        let mut users = self.users.write().await;
        if users.values().any(|existing| existing.email == user.email) {
            return Err(duplicate_email(&user.email));
        }
        users.insert(user.id, user.clone());
        Ok(user)
    }

    pub async fn create_vendor(&self, vendor: Vendor) -> Result<Vendor, AppError> {
        let mut vendors = self.vendors.write().await;
        if vendors.values().any(|existing| existing.email == vendor.email) {
            return Err(duplicate_email(&vendor.email));
        }
        vendors.insert(vendor.id, vendor.clone());
        Ok(vendor)
    }

    pub async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, AppError> {
        let users = self.users.read().await;
        Ok(users.values().find(|user| user.email == email).cloned())
    }

    pub async fn find_vendor_by_email(&self, email: &str) -> Result<Option<Vendor>, AppError> {
        let vendors = self.vendors.read().await;
        Ok(vendors.values().find(|vendor| vendor.email == email).cloned())
    }

    pub async fn find_user(&self, id: Uuid) -> Result<User, AppError> {
        let users = self.users.read().await;
        users
            .get(&id)
            .cloned()
            .ok_or_else(|| DomainError::user_not_found().into())
    }

    /// Applies `change` to the car list selected by `target` while holding the
    /// write lock. The list is only replaced when `change` succeeds.
    pub async fn modify_cars<T>(
        &self,
        target: CarsOf,
        change: impl FnOnce(&mut Vec<Car>) -> Result<T, AppError>,
    ) -> Result<Option<T>, AppError> {
        let mut users = self.users.write().await;
        let user = match target {
            CarsOf::User(id) => users.get_mut(&id),
            CarsOf::OwnerOfCar(car_id) => users.values_mut().find(|user| user.car(car_id).is_some()),
        };
        let Some(user) = user else {
            return Ok(None);
        };

        let mut cars = user.cars.clone();
        let value = change(&mut cars)?;
        user.cars = cars;
        user.updated_at = chrono::Utc::now();
        Ok(Some(value))
    }

    pub async fn find_car_owner_by_spz(&self, spz: &str) -> Result<Option<User>, AppError> {
        let users = self.users.read().await;
        Ok(users
            .values()
            .find(|user| user.cars.iter().any(|car| car.spz == spz))
            .cloned())
    }
}

pub(super) fn duplicate_email(email: &str) -> AppError {
    DomainError::duplicate("Email is already registered")
        .with_metadata("email", email)
        .into()
}
