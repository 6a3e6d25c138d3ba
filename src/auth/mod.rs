//! Authentication Module
//! Mission: Secure account endpoints with bcrypt-hashed passwords and JWT bearer tokens

pub mod api;
pub mod extract;
pub mod jwt;
pub mod middleware;
pub mod models;
pub mod password;
pub mod user_store;

pub use api::AccountsState;
pub use jwt::TokenService;
pub use middleware::{require_admin, require_auth};
pub use password::PasswordHasher;
pub use user_store::{AccountStore, SqliteAccountStore};
