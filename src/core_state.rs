//! Shared server state.
//!
//! `CoreState` is created once at startup, wrapped in `Arc`, and handed
//! to the axum router. It owns the connection pool and the token signer;
//! nothing else in the process is shared between requests.

use chrono::Duration;

use crate::config::ServerConfig;
use crate::crypto::{self, TokenSigner};
use crate::db::{self, ConnectionPool, DatabaseError, PooledConnection};
use crate::models::{User, UserRole};

pub struct CoreState {
    pool: ConnectionPool,
    signer: TokenSigner,
    config: ServerConfig,
}

impl CoreState {
    /// Open (and migrate) the database named by `config` and build the
    /// token signer from its secret.
    pub fn open(config: ServerConfig) -> Result<Self, CoreError> {
        if let Some(parent) = config.database_path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let pool = ConnectionPool::open(&config.database_path, config.pool_size)?;
        let signer = TokenSigner::new(
            config.jwt_secret.as_bytes(),
            Duration::hours(config.token_ttl_hours),
        );

        Ok(Self {
            pool,
            signer,
            config,
        })
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    pub fn signer(&self) -> &TokenSigner {
        &self.signer
    }

    pub fn pool(&self) -> &ConnectionPool {
        &self.pool
    }

    /// Check out a pooled connection. Released when the guard drops.
    pub fn open_db(&self) -> Result<PooledConnection<'_>, CoreError> {
        Ok(self.pool.acquire()?)
    }

    /// Create the configured admin account if it does not exist yet.
    ///
    /// Returns the new user, or `None` when no admin is configured or the
    /// username is already taken.
    pub fn bootstrap_admin(&self) -> Result<Option<User>, CoreError> {
        let Some(admin) = &self.config.admin else {
            return Ok(None);
        };

        let conn = self.open_db()?;
        if db::get_user_by_username(&conn, &admin.username)?.is_some() {
            tracing::debug!(username = %admin.username, "Admin account already present");
            return Ok(None);
        }

        let hash = crypto::hash_password(&admin.password);
        let user = db::insert_user(
            &conn,
            &admin.username,
            &hash,
            UserRole::Admin,
            &admin.full_name,
        )?;
        tracing::info!(user_id = user.id, username = %user.username, "Admin account created");
        Ok(Some(user))
    }
}

/// Errors from CoreState operations.
#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),
    #[error("Cannot prepare data directory: {0}")]
    Io(#[from] std::io::Error),
}
