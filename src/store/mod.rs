//! Persistence for users, vendors and the cars they own.
//!
//! Handlers talk to a [`Store`], which is either the in-memory store or the
//! Postgres store. Errors are returned unchanged for the error classifier.
//!
//! Changes to a user's cars go through [`Store::modify_cars`], which reads,
//! changes and writes the car list as one atomic step on both backends, so
//! concurrent requests touching the same user never overwrite each other.

pub mod memory;
pub mod postgres;

pub use memory::MemoryStore;
pub use postgres::PgStore;

use uuid::Uuid;

use crate::error::{AppError, DomainError};
use crate::models::{Car, CarPatch, Service, User, Vendor};

/// Selects the user whose car list a change applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CarsOf {
    User(Uuid),
    /// Whoever owns the car with this id.
    OwnerOfCar(Uuid),
}

#[derive(Debug)]
pub enum Store {
    Memory(MemoryStore),
    Postgres(PgStore),
}

impl Store {
    pub fn memory() -> Self {
        Store::Memory(MemoryStore::new())
    }

    /// Connects to `database_url` and creates the schema if it is missing.
    pub async fn postgres(database_url: &str) -> Result<Self, AppError> {
        let store = PgStore::connect(database_url).await?;
        store.migrate().await?;
        Ok(Store::Postgres(store))
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Store::Memory(_) => "memory",
            Store::Postgres(_) => "postgres",
        }
    }

    pub async fn create_user(&self, user: User) -> Result<User, AppError> {
        match self {
            Store::Memory(store) => store.create_user(user).await,
            Store::Postgres(store) => store.create_user(user).await,
        }
    }

    pub async fn create_vendor(&self, vendor: Vendor) -> Result<Vendor, AppError> {
        match self {
            Store::Memory(store) => store.create_vendor(vendor).await,
            Store::Postgres(store) => store.create_vendor(vendor).await,
        }
    }

    pub async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, AppError> {
        match self {
            Store::Memory(store) => store.find_user_by_email(email).await,
            Store::Postgres(store) => store.find_user_by_email(email).await,
        }
    }

    pub async fn find_vendor_by_email(&self, email: &str) -> Result<Option<Vendor>, AppError> {
        match self {
            Store::Memory(store) => store.find_vendor_by_email(email).await,
            Store::Postgres(store) => store.find_vendor_by_email(email).await,
        }
    }

    /// Fails with `UserNotFound` when no user has `id`.
    pub async fn find_user(&self, id: Uuid) -> Result<User, AppError> {
        match self {
            Store::Memory(store) => store.find_user(id).await,
            Store::Postgres(store) => store.find_user(id).await,
        }
    }

    /// Atomically applies `change` to the car list selected by `target`.
    /// Returns `None` when no user matches.
    pub async fn modify_cars<T>(
        &self,
        target: CarsOf,
        change: impl FnOnce(&mut Vec<Car>) -> Result<T, AppError>,
    ) -> Result<Option<T>, AppError> {
        match self {
            Store::Memory(store) => store.modify_cars(target, change).await,
            Store::Postgres(store) => store.modify_cars(target, change).await,
        }
    }

    pub async fn push_car(&self, user_id: Uuid, car: Car) -> Result<Car, AppError> {
        self.modify_cars(CarsOf::User(user_id), |cars| {
            cars.push(car.clone());
            Ok(car)
        })
        .await?
        .ok_or_else(|| DomainError::user_not_found().into())
    }

    /// Applies `patch` to one of the user's cars and returns the result.
    pub async fn update_car(
        &self,
        user_id: Uuid,
        car_id: Uuid,
        patch: CarPatch,
    ) -> Result<Car, AppError> {
        self.modify_cars(CarsOf::User(user_id), |cars| {
            let car = cars
                .iter_mut()
                .find(|car| car.id == car_id)
                .ok_or_else(|| car_not_found(car_id))?;
            patch.apply(car);
            Ok(car.clone())
        })
        .await?
        .ok_or_else(|| DomainError::user_not_found().into())
    }

    pub async fn remove_car(&self, user_id: Uuid, car_id: Uuid) -> Result<(), AppError> {
        self.modify_cars(CarsOf::User(user_id), |cars| {
            let before = cars.len();
            cars.retain(|car| car.id != car_id);
            if cars.len() == before {
                return Err(car_not_found(car_id));
            }
            Ok(())
        })
        .await?
        .ok_or_else(|| DomainError::user_not_found().into())
    }

    /// Appends `service` to the service book of car `car_id`, whoever owns it.
    pub async fn push_service(&self, car_id: Uuid, service: Service) -> Result<Service, AppError> {
        self.modify_cars(CarsOf::OwnerOfCar(car_id), |cars| {
            let car = cars
                .iter_mut()
                .find(|car| car.id == car_id)
                .ok_or_else(|| car_not_found(car_id))?;
            car.service_book.push(service.clone());
            Ok(service)
        })
        .await?
        .ok_or_else(|| {
            DomainError::not_found("Car not found")
                .with_metadata("carId", car_id.to_string())
                .into()
        })
    }

    pub async fn find_car_owner_by_spz(&self, spz: &str) -> Result<Option<User>, AppError> {
        match self {
            Store::Memory(store) => store.find_car_owner_by_spz(spz).await,
            Store::Postgres(store) => store.find_car_owner_by_spz(spz).await,
        }
    }
}

pub fn car_not_found(id: Uuid) -> AppError {
    DomainError::not_found("No Car matches the ID")
        .with_metadata("carId", id.to_string())
        .into()
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::http::StatusCode;
    use futures::future::join_all;
    use serde_json::json;

    use crate::models::{NewAccount, NewCar, NewService};

    fn car(spz: &str) -> Car {
        serde_json::from_value::<NewCar>(json!({ "model": "Skoda Fabia", "year": "2008", "SPZ": spz }))
            .unwrap()
            .into_car()
    }

    fn service(description: &str) -> Service {
        serde_json::from_value::<NewService>(json!({
            "date": "2024-05-01T10:00:00Z",
            "cost": "120 EUR",
            "description": description,
            "receipt": { "data": "aGVsbG8=", "contentType": "image/png" }
        }))
        .unwrap()
        .into_service(Uuid::new_v4())
    }

    async fn owner(store: &Store) -> User {
        let account: NewAccount =
            serde_json::from_value(json!({ "email": "a@b.com", "password": "testpass" })).unwrap();
        store.create_user(User::new(account, "hash".into())).await.unwrap()
    }

    #[actix_rt::test]
    async fn test_overlapping_car_and_service_changes_are_all_kept() {
        let store = Store::memory();
        let owner = owner(&store).await;
        let fabia = store.push_car(owner.id, car("1AB2345")).await.unwrap();

        let cars = join_all((0..8).map(|i| store.push_car(owner.id, car(&format!("2AB{i:04}")))));
        let services =
            join_all((0..8).map(|i| store.push_service(fabia.id, service(&format!("visit {i}")))));
        let (cars, services) = futures::join!(cars, services);
        assert!(cars.iter().all(Result::is_ok));
        assert!(services.iter().all(Result::is_ok));

        let user = store.find_user(owner.id).await.unwrap();
        assert_eq!(user.cars.len(), 9);
        assert_eq!(user.car(fabia.id).unwrap().service_book.len(), 8);
    }

    #[actix_rt::test]
    async fn test_car_mutations() {
        let store = Store::memory();
        let owner = owner(&store).await;
        let fabia = store.push_car(owner.id, car("1AB2345")).await.unwrap();

        let patch: CarPatch = serde_json::from_value(json!({ "year": "2009" })).unwrap();
        let updated = store.update_car(owner.id, fabia.id, patch).await.unwrap();
        assert_eq!(updated.year, "2009");
        assert_eq!(updated.model, "Skoda Fabia");

        store.remove_car(owner.id, fabia.id).await.unwrap();
        let err = store.remove_car(owner.id, fabia.id).await.unwrap_err();
        assert_eq!(err.status(), StatusCode::NOT_FOUND);
        assert!(store.find_user(owner.id).await.unwrap().cars.is_empty());
    }

    #[actix_rt::test]
    async fn test_missing_targets_are_not_found() {
        let store = Store::memory();
        let owner = owner(&store).await;

        let err = store.push_car(Uuid::new_v4(), car("1AB2345")).await.unwrap_err();
        assert_eq!(err.name(), "UserNotFound");

        let err = store
            .push_service(Uuid::new_v4(), service("Oil change"))
            .await
            .unwrap_err();
        assert_eq!(err.status(), StatusCode::NOT_FOUND);

        let patch = CarPatch::default();
        let err = store.update_car(owner.id, Uuid::new_v4(), patch).await.unwrap_err();
        assert_eq!(err.status(), StatusCode::NOT_FOUND);
    }
}
