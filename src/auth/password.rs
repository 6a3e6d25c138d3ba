//! Password hashing
//! Mission: One-way bcrypt hashing off the async runtime

use anyhow::{Context, Result};

/// Default bcrypt work factor for stored passwords
pub const DEFAULT_BCRYPT_COST: u32 = 10;

/// bcrypt hasher with a fixed work factor
#[derive(Debug, Clone, Copy)]
pub struct PasswordHasher {
    cost: u32,
}

impl PasswordHasher {
    pub fn new(cost: u32) -> Self {
        Self { cost }
    }

    pub async fn hash(&self, password: &str) -> Result<String> {
        let password = password.to_owned();
        let cost = self.cost;

        tokio::task::spawn_blocking(move || bcrypt::hash(password, cost))
            .await
            .context("Password hashing task panicked")?
            .context("Failed to hash password")
    }

    /// Compare a plaintext password with a stored hash
    pub async fn verify(&self, password: &str, hash: &str) -> Result<bool> {
        let password = password.to_owned();
        let hash = hash.to_owned();

        tokio::task::spawn_blocking(move || bcrypt::verify(password, &hash))
            .await
            .context("Password verification task panicked")?
            .context("Failed to verify password")
    }
}
