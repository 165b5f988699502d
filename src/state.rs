use crate::auth::TokenIssuer;
use crate::store::Store;

/// Shared per-application state, registered as `web::Data<AppState>`.
#[derive(Debug)]
pub struct AppState {
    pub store: Store,
    pub tokens: TokenIssuer,
    pub bcrypt_cost: u32,
}

impl AppState {
    pub fn new(store: Store, tokens: TokenIssuer, bcrypt_cost: u32) -> Self {
        Self {
            store,
            tokens,
            bcrypt_cost,
        }
    }
}
