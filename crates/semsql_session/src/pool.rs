use semsql_core::{Connection, ConnectionProfile, CoreConfig, CoreError, DbConfig, DbDriver, DbKind};
use std::collections::HashMap;
use std::sync::{Arc, Condvar, Mutex};
use std::time::{Duration, Instant};

/// Identity a pool entry is keyed on: `(dialect, host, port, database, user)`
/// per `spec.md` §3. SQLite has no host/port/user, so those fields collapse
/// to fixed placeholders and `database` carries the file path.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PoolKey {
    pub dialect: DbKind,
    pub host: String,
    pub port: u16,
    pub database: String,
    pub user: String,
}

impl PoolKey {
    pub fn from_profile(profile: &ConnectionProfile) -> Self {
        match &profile.config {
            DbConfig::Postgres {
                host,
                port,
                user,
                database,
                ..
            } => Self {
                dialect: profile.kind(),
                host: host.clone(),
                port: *port,
                database: database.clone(),
                user: user.clone(),
            },
            DbConfig::MySQL {
                host,
                port,
                user,
                database,
                ..
            } => Self {
                dialect: profile.kind(),
                host: host.clone(),
                port: *port,
                database: database.clone().unwrap_or_default(),
                user: user.clone(),
            },
            DbConfig::Oracle {
                host,
                port,
                user,
                service_name,
            } => Self {
                dialect: profile.kind(),
                host: host.clone(),
                port: *port,
                database: service_name.clone(),
                user: user.clone(),
            },
            DbConfig::SQLite { path } => Self {
                dialect: DbKind::SQLite,
                host: String::new(),
                port: 0,
                database: path.display().to_string(),
                user: String::new(),
            },
        }
    }
}

struct IdleConnection {
    conn: Box<dyn Connection>,
    last_used: Instant,
}

#[derive(Default)]
struct PoolEntry {
    idle: Vec<IdleConnection>,
    live_count: u32,
}

impl PoolEntry {
    /// Closes and drops idle connections that have sat unused past `timeout`.
    fn evict_expired(&mut self, timeout: Duration) {
        let now = Instant::now();
        let mut kept = Vec::with_capacity(self.idle.len());
        for mut idle in self.idle.drain(..) {
            if now.duration_since(idle.last_used) >= timeout {
                if let Err(e) = idle.conn.close() {
                    log::warn!("error closing idle pooled connection: {e}");
                }
                self.live_count = self.live_count.saturating_sub(1);
            } else {
                kept.push(idle);
            }
        }
        self.idle = kept;
    }
}

struct PoolShared {
    drivers: HashMap<DbKind, Arc<dyn DbDriver>>,
    config: CoreConfig,
    entries: Mutex<HashMap<PoolKey, PoolEntry>>,
    condvar: Condvar,
}

/// Thread-safe connection pool keyed by connection identity (`PoolKey`).
///
/// Acquisitions follow a scoped pattern: `acquire()` returns a `PooledConnection`
/// guard that returns the connection to the pool on drop. A saturated key
/// blocks the caller up to `CoreConfig::pool_acquire_wait` before failing with
/// `CoreError::PoolExhausted`.
#[derive(Clone)]
pub struct ConnectionPool {
    shared: Arc<PoolShared>,
}

impl ConnectionPool {
    pub fn new(drivers: HashMap<DbKind, Arc<dyn DbDriver>>, config: CoreConfig) -> Self {
        Self {
            shared: Arc::new(PoolShared {
                drivers,
                config,
                entries: Mutex::new(HashMap::new()),
                condvar: Condvar::new(),
            }),
        }
    }

    pub fn acquire(
        &self,
        profile: &ConnectionProfile,
        password: Option<&str>,
    ) -> Result<PooledConnection, CoreError> {
        let key = PoolKey::from_profile(profile);
        let deadline = Instant::now() + self.shared.config.pool_acquire_wait();
        let idle_timeout = self.shared.config.pool_idle_timeout();
        let max = self.shared.config.pool_max.max(1);

        let mut guard = self.shared.entries.lock().expect("pool mutex poisoned");

        loop {
            let entry = guard.entry(key.clone()).or_default();
            entry.evict_expired(idle_timeout);

            if let Some(idle) = entry.idle.pop() {
                return Ok(PooledConnection {
                    pool: self.clone(),
                    key,
                    conn: Some(idle.conn),
                });
            }

            if entry.live_count < max {
                entry.live_count += 1;
                drop(guard);

                let driver = self
                    .shared
                    .drivers
                    .get(&key.dialect)
                    .ok_or_else(|| CoreError::UnsupportedDialect(key.dialect.display_name().to_string()))?;

                return match driver.connect_with_password(profile, password) {
                    Ok(conn) => Ok(PooledConnection {
                        pool: self.clone(),
                        key,
                        conn: Some(conn),
                    }),
                    Err(e) => {
                        let mut guard = self.shared.entries.lock().expect("pool mutex poisoned");
                        if let Some(entry) = guard.get_mut(&key) {
                            entry.live_count = entry.live_count.saturating_sub(1);
                        }
                        Err(CoreError::from(e))
                    }
                };
            }

            let now = Instant::now();
            if now >= deadline {
                return Err(CoreError::PoolExhausted);
            }

            let (g, timeout_result) = self
                .shared
                .condvar
                .wait_timeout(guard, deadline - now)
                .expect("pool mutex poisoned");
            guard = g;
            if timeout_result.timed_out() && Instant::now() >= deadline {
                return Err(CoreError::PoolExhausted);
            }
        }
    }

    /// Closes and evicts idle connections past `idle_timeout` across every
    /// key. Intended to be called periodically by the host surface.
    pub fn sweep_idle(&self) {
        let idle_timeout = self.shared.config.pool_idle_timeout();
        let mut guard = self.shared.entries.lock().expect("pool mutex poisoned");
        for entry in guard.values_mut() {
            entry.evict_expired(idle_timeout);
        }
    }

    /// Number of live (idle + checked-out) connections for `key`.
    pub fn live_count(&self, key: &PoolKey) -> u32 {
        let guard = self.shared.entries.lock().expect("pool mutex poisoned");
        guard.get(key).map(|e| e.live_count).unwrap_or(0)
    }

    fn release(&self, key: PoolKey, conn: Box<dyn Connection>) {
        let mut guard = self.shared.entries.lock().expect("pool mutex poisoned");
        let entry = guard.entry(key).or_default();
        entry.idle.push(IdleConnection {
            conn,
            last_used: Instant::now(),
        });
        drop(guard);
        self.shared.condvar.notify_one();
    }

    /// Closes every idle and checked-out-but-forgotten connection. Called
    /// during `ShutdownPhase::ClosingConnections`.
    pub fn close_all(&self) {
        let mut guard = self.shared.entries.lock().expect("pool mutex poisoned");
        for entry in guard.values_mut() {
            for mut idle in entry.idle.drain(..) {
                if let Err(e) = idle.conn.close() {
                    log::warn!("error closing pooled connection during shutdown: {e}");
                }
            }
            entry.live_count = 0;
        }
    }
}

/// RAII guard borrowed from a `ConnectionPool`. Returns the connection to the
/// pool's idle list on drop; never holds the pool lock while borrowed.
pub struct PooledConnection {
    pool: ConnectionPool,
    key: PoolKey,
    conn: Option<Box<dyn Connection>>,
}

impl PooledConnection {
    pub fn as_connection(&self) -> &dyn Connection {
        self.conn.as_deref().expect("connection taken before drop")
    }
}

impl std::ops::Deref for PooledConnection {
    type Target = dyn Connection;

    fn deref(&self) -> &Self::Target {
        self.as_connection()
    }
}

impl Drop for PooledConnection {
    fn drop(&mut self) {
        if let Some(conn) = self.conn.take() {
            self.pool.release(self.key.clone(), conn);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use semsql_test_support::FakeDriver;

    fn drivers() -> HashMap<DbKind, Arc<dyn DbDriver>> {
        let mut map: HashMap<DbKind, Arc<dyn DbDriver>> = HashMap::new();
        map.insert(DbKind::Postgres, Arc::new(FakeDriver::new(DbKind::Postgres)));
        map
    }

    fn profile() -> ConnectionProfile {
        ConnectionProfile::new("test", DbConfig::default_postgres())
    }

    #[test]
    fn acquire_and_release_reuses_connection() {
        let mut config = CoreConfig::default();
        config.pool_max = 2;
        let pool = ConnectionPool::new(drivers(), config);
        let profile = profile();
        let key = PoolKey::from_profile(&profile);

        {
            let _conn = pool.acquire(&profile, None).unwrap();
            assert_eq!(pool.live_count(&key), 1);
        }
        assert_eq!(pool.live_count(&key), 1);

        let _conn2 = pool.acquire(&profile, None).unwrap();
        assert_eq!(pool.live_count(&key), 1);
    }

    #[test]
    fn saturated_pool_fails_with_pool_exhausted() {
        let mut config = CoreConfig::default();
        config.pool_max = 1;
        config.pool_acquire_wait_ms = 20;
        let pool = ConnectionPool::new(drivers(), config);
        let profile = profile();

        let _held = pool.acquire(&profile, None).unwrap();
        let second = pool.acquire(&profile, None);
        assert!(matches!(second, Err(CoreError::PoolExhausted)));
    }

    #[test]
    fn live_count_never_exceeds_max_per_key() {
        let mut config = CoreConfig::default();
        config.pool_max = 3;
        let pool = ConnectionPool::new(drivers(), config);
        let profile = profile();
        let key = PoolKey::from_profile(&profile);

        let conns: Vec<_> = (0..3).map(|_| pool.acquire(&profile, None).unwrap()).collect();
        assert_eq!(pool.live_count(&key), 3);
        drop(conns);
        assert_eq!(pool.live_count(&key), 3);
    }
}
