pub mod health;
pub mod user;
pub mod vendor;

use actix_web::{guard, web};

use crate::auth::{AuthMiddleware, Role};
use crate::schema::catalog::{
    AUTHENTICATE, NEW_CAR, NEW_SERVICE, PAGINATION, PARAMS_ID, PATCH_CAR, SEARCH, USER, VENDOR,
};
use crate::schema::{SchemaError, SchemaRegistry};
use crate::validation::{Validate, ValidationConfig};

/// The HTTP surface, with one validation gate per route resolved up front so
/// a gate naming an unknown schema fails before the server starts.
#[derive(Debug, Clone)]
pub struct Api {
    user_register: Validate,
    user_authenticate: Validate,
    list_cars: Validate,
    add_car: Validate,
    update_car: Validate,
    delete_car: Validate,
    list_services: Validate,
    vendor_register: Validate,
    vendor_authenticate: Validate,
    search_car: Validate,
    add_service: Validate,
}

impl Api {
    pub fn new(registry: &SchemaRegistry) -> Result<Self, SchemaError> {
        let gate = |config: ValidationConfig| Validate::new(registry, config);

        Ok(Self {
            user_register: gate(ValidationConfig::new().body(USER))?,
            user_authenticate: gate(ValidationConfig::new().body(AUTHENTICATE))?,
            list_cars: gate(ValidationConfig::new().query(PAGINATION))?,
            add_car: gate(ValidationConfig::new().body(NEW_CAR))?,
            update_car: gate(ValidationConfig::new().params(PARAMS_ID).body(PATCH_CAR))?,
            delete_car: gate(ValidationConfig::new().params(PARAMS_ID))?,
            list_services: gate(ValidationConfig::new().params(PARAMS_ID).query(PAGINATION))?,
            vendor_register: gate(ValidationConfig::new().body(VENDOR))?,
            vendor_authenticate: gate(ValidationConfig::new().body(AUTHENTICATE))?,
            search_car: gate(ValidationConfig::new().params(SEARCH))?,
            add_service: gate(ValidationConfig::new().params(PARAMS_ID).body(NEW_SERVICE))?,
        })
    }

    pub fn config(&self, cfg: &mut web::ServiceConfig) {
        cfg.service(health::health)
            .service(
                web::scope("/api/user")
                    .service(
                        web::resource("/register")
                            .wrap(self.user_register.clone())
                            .route(web::post().to(user::register)),
                    )
                    .service(
                        web::resource("/authenticate")
                            .wrap(self.user_authenticate.clone())
                            .route(web::post().to(user::authenticate)),
                    )
                    .service(
                        web::scope("")
                            .wrap(AuthMiddleware::new(Role::User))
                            .route("", web::get().to(user::profile))
                            .service(
                                web::resource("/cars")
                                    .guard(guard::Get())
                                    .wrap(self.list_cars.clone())
                                    .route(web::get().to(user::list_cars)),
                            )
                            .service(
                                web::resource("/cars")
                                    .guard(guard::Post())
                                    .wrap(self.add_car.clone())
                                    .route(web::post().to(user::add_car)),
                            )
                            .service(
                                web::resource("/cars/{id}")
                                    .guard(guard::Patch())
                                    .wrap(self.update_car.clone())
                                    .route(web::patch().to(user::update_car)),
                            )
                            .service(
                                web::resource("/cars/{id}")
                                    .guard(guard::Delete())
                                    .wrap(self.delete_car.clone())
                                    .route(web::delete().to(user::delete_car)),
                            )
                            .service(
                                web::resource("/cars/{id}/services")
                                    .wrap(self.list_services.clone())
                                    .route(web::get().to(user::list_services)),
                            ),
                    ),
            )
            .service(
                web::scope("/api/vendor")
                    .service(
                        web::resource("/register")
                            .wrap(self.vendor_register.clone())
                            .route(web::post().to(vendor::register)),
                    )
                    .service(
                        web::resource("/authenticate")
                            .wrap(self.vendor_authenticate.clone())
                            .route(web::post().to(vendor::authenticate)),
                    )
                    .service(
                        web::scope("")
                            .wrap(AuthMiddleware::new(Role::Vendor))
                            .service(
                                web::resource("/cars/search/{query}")
                                    .wrap(self.search_car.clone())
                                    .route(web::get().to(vendor::search_car)),
                            )
                            .service(
                                web::resource("/cars/{id}/services")
                                    .wrap(self.add_service.clone())
                                    .route(web::post().to(vendor::add_service)),
                            ),
                    ),
            );
    }
}
