use chrono::{DateTime, Utc};
use serde_json::json;
use sqlx::{postgres::PgPoolOptions, types::Json, FromRow, PgPool};
use uuid::Uuid;

use super::memory::duplicate_email;
use super::CarsOf;
use crate::error::{AppError, DomainError};
use crate::models::{Car, User, Vendor};

const USER_COLUMNS: &str =
    "id, email, password_hash, name, telephone, cars, created_at, updated_at";
const VENDOR_COLUMNS: &str =
    "id, email, password_hash, name, telephone, address, created_at, updated_at";

/// Postgres-backed store. Cars and their service books are kept as a JSONB
/// document on the owning user row.
#[derive(Debug, Clone)]
pub struct PgStore {
    pool: PgPool,
}

#[derive(FromRow)]
struct UserRow {
    id: Uuid,
    email: String,
    password_hash: String,
    name: Option<String>,
    telephone: Option<String>,
    cars: Json<Vec<Car>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<UserRow> for User {
    fn from(row: UserRow) -> Self {
        User {
            id: row.id,
            email: row.email,
            password_hash: row.password_hash,
            name: row.name,
            telephone: row.telephone,
            cars: row.cars.0,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[derive(FromRow)]
struct VendorRow {
    id: Uuid,
    email: String,
    password_hash: String,
    name: String,
    telephone: Option<String>,
    address: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<VendorRow> for Vendor {
    fn from(row: VendorRow) -> Self {
        Vendor {
            id: row.id,
            email: row.email,
            password_hash: row.password_hash,
            name: row.name,
            telephone: row.telephone,
            address: row.address,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

impl PgStore {
    pub async fn connect(database_url: &str) -> Result<Self, AppError> {
        let pool = PgPoolOptions::new()
            .max_connections(5)
            .connect(database_url)
            .await?;
        Ok(Self { pool })
    }

    /// Creates the tables when they do not exist yet.
    pub async fn migrate(&self) -> Result<(), AppError> {
        sqlx::query(
            "CREATE TABLE IF NOT EXISTS users (
                id UUID PRIMARY KEY,
                email TEXT NOT NULL UNIQUE,
                password_hash TEXT NOT NULL,
                name TEXT,
                telephone TEXT,
                cars JSONB NOT NULL DEFAULT '[]'::jsonb,
                created_at TIMESTAMPTZ NOT NULL,
                updated_at TIMESTAMPTZ NOT NULL
            )",
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            "CREATE TABLE IF NOT EXISTS vendors (
                id UUID PRIMARY KEY,
                email TEXT NOT NULL UNIQUE,
                password_hash TEXT NOT NULL,
                name TEXT NOT NULL,
                telephone TEXT,
                address TEXT,
                created_at TIMESTAMPTZ NOT NULL,
                updated_at TIMESTAMPTZ NOT NULL
            )",
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    pub async fn create_user(&self, user: User) -> Result<User, AppError> {
        let result = sqlx::query(
            "INSERT INTO users (id, email, password_hash, name, telephone, cars, created_at, updated_at)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8)",
        )
        .bind(user.id)
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(&user.name)
        .bind(&user.telephone)
        .bind(Json(&user.cars))
        .bind(user.created_at)
        .bind(user.updated_at)
        .execute(&self.pool)
        .await;

        match result {
            Ok(_) => Ok(user),
            Err(sqlx::Error::Database(db)) if db.is_unique_violation() => {
                Err(duplicate_email(&user.email))
            }
            Err(e) => Err(e.into()),
        }
    }

    pub async fn create_vendor(&self, vendor: Vendor) -> Result<Vendor, AppError> {
        let result = sqlx::query(
            "INSERT INTO vendors (id, email, password_hash, name, telephone, address, created_at, updated_at)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8)",
        )
        .bind(vendor.id)
        .bind(&vendor.email)
        .bind(&vendor.password_hash)
        .bind(&vendor.name)
        .bind(&vendor.telephone)
        .bind(&vendor.address)
        .bind(vendor.created_at)
        .bind(vendor.updated_at)
        .execute(&self.pool)
        .await;

        match result {
            Ok(_) => Ok(vendor),
            Err(sqlx::Error::Database(db)) if db.is_unique_violation() => {
                Err(duplicate_email(&vendor.email))
            }
            Err(e) => Err(e.into()),
        }
    }

    pub async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, AppError> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE email = $1");
        let row = sqlx::query_as::<_, UserRow>(&sql)
            .bind(email)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(User::from))
    }

    pub async fn find_vendor_by_email(&self, email: &str) -> Result<Option<Vendor>, AppError> {
        let sql = format!("SELECT {VENDOR_COLUMNS} FROM vendors WHERE email = $1");
        let row = sqlx::query_as::<_, VendorRow>(&sql)
            .bind(email)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(Vendor::from))
    }

    pub async fn find_user(&self, id: Uuid) -> Result<User, AppError> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1");
        sqlx::query_as::<_, UserRow>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .map(User::from)
            .ok_or_else(|| DomainError::user_not_found().into())
    }

    /// Applies `change` inside one transaction, holding a row lock on the
    /// selected user until the new car list is written.
    pub async fn modify_cars<T>(
        &self,
        target: CarsOf,
        change: impl FnOnce(&mut Vec<Car>) -> Result<T, AppError>,
    ) -> Result<Option<T>, AppError> {
        let mut tx = self.pool.begin().await?;

        let row: Option<(Uuid, Json<Vec<Car>>)> = match target {
            CarsOf::User(id) => {
                sqlx::query_as("SELECT id, cars FROM users WHERE id = $1 FOR UPDATE")
                    .bind(id)
                    .fetch_optional(&mut *tx)
                    .await?
            }
            CarsOf::OwnerOfCar(car_id) => {
                sqlx::query_as("SELECT id, cars FROM users WHERE cars @> $1 LIMIT 1 FOR UPDATE")
                    .bind(Json(json!([{ "id": car_id }])))
                    .fetch_optional(&mut *tx)
                    .await?
            }
        };
        let Some((user_id, Json(mut cars))) = row else {
            return Ok(None);
        };

        // An error here drops `tx`, which rolls the transaction back.
        let value = change(&mut cars)?;
        sqlx::query("UPDATE users SET cars = $2, updated_at = NOW() WHERE id = $1")
            .bind(user_id)
            .bind(Json(&cars))
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;

        Ok(Some(value))
    }

    pub async fn find_car_owner_by_spz(&self, spz: &str) -> Result<Option<User>, AppError> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE cars @> $1 LIMIT 1");
        let row = sqlx::query_as::<_, UserRow>(&sql)
            .bind(Json(json!([{ "SPZ": spz }])))
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(User::from))
    }
}
