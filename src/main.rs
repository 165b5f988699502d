use std::io;

use actix_cors::Cors;
use actix_web::middleware::{Condition, Logger};
use actix_web::{web, App, HttpServer};
use dotenv::dotenv;

use servicebook::auth::TokenIssuer;
use servicebook::schema::catalog;
use servicebook::store::Store;
use servicebook::{Api, AppState, Config, ErrorClassifier};

fn startup_error(error: impl std::error::Error + Send + Sync + 'static) -> io::Error {
    io::Error::new(io::ErrorKind::Other, error)
}

#[actix_web::main]
async fn main() -> io::Result<()> {
    dotenv().ok();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = Config::from_env().map_err(startup_error)?;
    let registry = catalog::registry().map_err(startup_error)?;
    log::debug!("Schemas: {}", registry.names().join(", "));
    let api = Api::new(&registry).map_err(startup_error)?;

    let store = match &config.database_url {
        Some(url) => Store::postgres(url).await.map_err(startup_error)?,
        None => {
            log::warn!("DATABASE_URL is not set, keeping data in memory");
            Store::memory()
        }
    };

    let state = web::Data::new(AppState::new(
        store,
        TokenIssuer::new(&config.jwt_secret, config.token_ttl_hours),
        config.bcrypt_cost,
    ));
    let mode = config.mode;

    log::info!(
        "Starting servicebook server at {} ({} mode, {} store)",
        config.server_url(),
        mode,
        state.store.kind()
    );

    HttpServer::new(move || {
        let cors = Cors::default()
            .allow_any_origin()
            .allow_any_method()
            .allow_any_header()
            .max_age(3600);

        App::new()
            .app_data(state.clone())
            .wrap(Condition::new(!mode.is_production(), Logger::default()))
            .wrap(cors)
            .wrap(ErrorClassifier::new(mode))
            .configure(|cfg| api.config(cfg))
    })
    .bind((config.server_host.as_str(), config.server_port))?
    .run()
    .await
}
