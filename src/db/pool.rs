//! Fixed-capacity SQLite connection pool.
//!
//! Connections are opened lazily up to `capacity`. A checked-out
//! connection is returned to the pool when its guard drops, whichever
//! statement failed in between. A connection that comes back with an open
//! transaction is discarded instead of being reused.

use std::ops::{Deref, DerefMut};
use std::path::{Path, PathBuf};
use std::sync::{Condvar, Mutex};
use std::time::{Duration, Instant};

use rusqlite::Connection;

use super::sqlite::{open_connection, open_database};
use super::DatabaseError;

pub const DEFAULT_ACQUIRE_TIMEOUT: Duration = Duration::from_secs(5);

struct PoolState {
    idle: Vec<Connection>,
    open: usize,
}

pub struct ConnectionPool {
    path: PathBuf,
    capacity: usize,
    acquire_timeout: Duration,
    state: Mutex<PoolState>,
    available: Condvar,
}

impl ConnectionPool {
    /// Open the database at `path`, run migrations once, and keep that
    /// first connection as the pool's initial idle member.
    pub fn open(path: &Path, capacity: usize) -> Result<Self, DatabaseError> {
        let first = open_database(path)?;
        tracing::info!(path = %path.display(), capacity, "Database pool ready");
        Ok(Self {
            path: path.to_path_buf(),
            capacity: capacity.max(1),
            acquire_timeout: DEFAULT_ACQUIRE_TIMEOUT,
            state: Mutex::new(PoolState {
                idle: vec![first],
                open: 1,
            }),
            available: Condvar::new(),
        })
    }

    pub fn with_acquire_timeout(mut self, timeout: Duration) -> Self {
        self.acquire_timeout = timeout;
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of connections currently parked in the pool.
    pub fn idle_count(&self) -> usize {
        self.state.lock().map(|s| s.idle.len()).unwrap_or(0)
    }

    /// Check out a connection, opening a new one if under capacity or
    /// waiting up to the acquire timeout for one to be released.
    pub fn acquire(&self) -> Result<PooledConnection<'_>, DatabaseError> {
        let deadline = Instant::now() + self.acquire_timeout;
        let mut state = self.state.lock().map_err(|_| DatabaseError::LockPoisoned)?;
        loop {
            if let Some(conn) = state.idle.pop() {
                return Ok(PooledConnection {
                    pool: self,
                    conn: Some(conn),
                });
            }

            if state.open < self.capacity {
                state.open += 1;
                drop(state);
                return match open_connection(&self.path) {
                    Ok(conn) => Ok(PooledConnection {
                        pool: self,
                        conn: Some(conn),
                    }),
                    Err(e) => {
                        self.forget_one();
                        Err(e)
                    }
                };
            }

            let now = Instant::now();
            if now >= deadline {
                return Err(DatabaseError::PoolExhausted(self.acquire_timeout));
            }
            let (guard, _) = self
                .available
                .wait_timeout(state, deadline - now)
                .map_err(|_| DatabaseError::LockPoisoned)?;
            state = guard;
        }
    }

    fn release(&self, conn: Connection) {
        let Ok(mut state) = self.state.lock() else {
            return;
        };
        if conn.is_autocommit() {
            state.idle.push(conn);
        } else {
            tracing::warn!("Discarding pooled connection left inside a transaction");
            state.open = state.open.saturating_sub(1);
            drop(conn);
        }
        self.available.notify_one();
    }

    fn forget_one(&self) {
        if let Ok(mut state) = self.state.lock() {
            state.open = state.open.saturating_sub(1);
        }
        self.available.notify_one();
    }
}

/// Checked-out connection. Returns to the pool on drop.
pub struct PooledConnection<'a> {
    pool: &'a ConnectionPool,
    conn: Option<Connection>,
}

impl Deref for PooledConnection<'_> {
    type Target = Connection;

    fn deref(&self) -> &Connection {
        self.conn.as_ref().expect("pooled connection used after release")
    }
}

impl DerefMut for PooledConnection<'_> {
    fn deref_mut(&mut self) -> &mut Connection {
        self.conn.as_mut().expect("pooled connection used after release")
    }
}

impl Drop for PooledConnection<'_> {
    fn drop(&mut self) {
        if let Some(conn) = self.conn.take() {
            self.pool.release(conn);
        }
    }
}
