mod auth;
mod session;

pub use auth::{
    hash_password, verify_password, Authenticator, ConfiguredAuthenticator, ConfiguredUser,
    Credentials,
};
pub use session::{Session, UserId, UserRole};
