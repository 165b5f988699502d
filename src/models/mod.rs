pub mod car;
pub mod page;
pub mod user;

pub use car::{Car, CarPatch, NewCar, NewService, Receipt, Service};
pub use page::{Page, Pagination};
pub use user::{Credentials, NewAccount, User, Vendor};
