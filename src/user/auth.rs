use super::session::{Session, UserId, UserRole};
use crate::error::{Error, Result};
use anyhow::anyhow;
use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use tracing::{debug, warn};

#[derive(Debug, Clone)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

/// Turns credentials into a [`Session`].
pub trait Authenticator: Send + Sync {
    fn authenticate(&self, credentials: &Credentials) -> Result<Session>;
}

/// Hashes a password with a fresh random salt, in PHC string format.
pub fn hash_password(plain: &str) -> anyhow::Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
        .hash_password(plain.as_bytes(), &salt)
        .map_err(|err| anyhow!("{}", err))?
        .to_string();
    Ok(hash)
}

pub fn verify_password(plain: &str, target_hash: &str) -> anyhow::Result<bool> {
    let password_hash = PasswordHash::new(target_hash).map_err(|err| anyhow!("{}", err))?;
    Ok(Argon2::default()
        .verify_password(plain.as_bytes(), &password_hash)
        .is_ok())
}

/// One account from the configuration file.
#[derive(Debug, Clone)]
pub struct ConfiguredUser {
    pub email: String,
    pub password_hash: String,
    pub role: Option<UserRole>,
}

/// Authenticates against accounts listed in the configuration.
///
/// A user without an explicit role is an admin when their email matches the
/// configured admin address, and a regular user otherwise.
pub struct ConfiguredAuthenticator {
    users: Vec<ConfiguredUser>,
    admin_email: Option<String>,
}

impl ConfiguredAuthenticator {
    pub fn new(users: Vec<ConfiguredUser>, admin_email: Option<String>) -> Self {
        Self { users, admin_email }
    }

    fn role_for(&self, user: &ConfiguredUser) -> UserRole {
        if let Some(role) = user.role {
            return role;
        }
        match &self.admin_email {
            Some(admin) if admin.eq_ignore_ascii_case(&user.email) => UserRole::Admin,
            _ => UserRole::Regular,
        }
    }
}

impl Authenticator for ConfiguredAuthenticator {
    fn authenticate(&self, credentials: &Credentials) -> Result<Session> {
        let email = credentials.email.trim();
        let Some(user) = self
            .users
            .iter()
            .find(|u| u.email.eq_ignore_ascii_case(email))
        else {
            warn!(email, "Login attempt for unknown user");
            return Err(Error::InvalidCredentials);
        };

        let valid = verify_password(&credentials.password, &user.password_hash).map_err(|e| {
            warn!(email, "Stored password hash is unreadable: {}", e);
            Error::InvalidCredentials
        })?;
        if !valid {
            warn!(email, "Wrong password");
            return Err(Error::InvalidCredentials);
        }

        let role = self.role_for(user);
        debug!(email, role = role.as_str(), "Authenticated");
        Ok(Session {
            user_id: UserId::from(user.email.to_lowercase()),
            email: user.email.clone(),
            role,
        })
    }
}
