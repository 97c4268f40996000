use semsql_core::{ConnectionProfile, CoreConfig, CoreError, DbConfig};
use std::collections::HashMap;
use std::sync::RwLock;
use std::time::{Duration, Instant};
use uuid::Uuid;

/// Redacts a `DbConfig` into a form safe to log or persist. No passwords are
/// ever stored on `ConnectionProfile` (they live in a `SecretStore`), so this
/// only needs to drop nothing further than what's already there.
fn redact_connection_params(config: &DbConfig) -> String {
    match config {
        DbConfig::Postgres {
            host,
            port,
            user,
            database,
            ..
        } => format!("postgresql://{user}@{host}:{port}/{database}"),
        DbConfig::MySQL {
            host,
            port,
            user,
            database,
            ..
        } => format!(
            "mysql://{user}@{host}:{port}/{}",
            database.as_deref().unwrap_or("")
        ),
        DbConfig::Oracle {
            host,
            port,
            user,
            service_name,
        } => format!("oracle://{user}@{host}:{port}/{service_name}"),
        DbConfig::SQLite { path } => format!("sqlite://{}", path.display()),
    }
}

/// One active `ask`/`connect` session. Owns no connection between operations
/// — it borrows one from the `ConnectionPool` for the duration of a single
/// request (`spec.md` §3).
#[derive(Debug, Clone)]
pub struct Session {
    pub session_id: Uuid,
    pub profile: ConnectionProfile,
    pub connection_params_redacted: String,
    pub last_accessed: Instant,
    pub selected_tables: Option<Vec<String>>,
}

impl Session {
    fn new(profile: ConnectionProfile) -> Self {
        let connection_params_redacted = redact_connection_params(&profile.config);
        Self {
            session_id: Uuid::new_v4(),
            profile,
            connection_params_redacted,
            last_accessed: Instant::now(),
            selected_tables: None,
        }
    }
}

/// Issues opaque session identifiers and evicts sessions past an idle
/// timeout. `SessionExpired` (the session existed but aged out) is a
/// distinct signal from `SessionNotFound` (the id was never valid, or was
/// already evicted and swept).
pub struct SessionManager {
    sessions: RwLock<HashMap<Uuid, Session>>,
    idle_timeout: Duration,
}

impl SessionManager {
    pub fn new(config: &CoreConfig) -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
            idle_timeout: config.session_idle_timeout(),
        }
    }

    pub fn create(&self, profile: ConnectionProfile) -> Uuid {
        let session = Session::new(profile);
        let id = session.session_id;
        self.sessions
            .write()
            .expect("session map poisoned")
            .insert(id, session);
        id
    }

    /// Looks up a session and refreshes `last_accessed`, failing distinctly
    /// for an unknown id versus one that aged out.
    pub fn touch(&self, id: Uuid) -> Result<Session, CoreError> {
        let mut sessions = self.sessions.write().expect("session map poisoned");
        let Some(session) = sessions.get_mut(&id) else {
            return Err(CoreError::SessionNotFound);
        };

        if session.last_accessed.elapsed() >= self.idle_timeout {
            sessions.remove(&id);
            return Err(CoreError::SessionExpired);
        }

        session.last_accessed = Instant::now();
        Ok(session.clone())
    }

    /// Non-mutating lookup; does not refresh `last_accessed` or evict.
    pub fn get(&self, id: Uuid) -> Option<Session> {
        self.sessions.read().expect("session map poisoned").get(&id).cloned()
    }

    pub fn select_tables(&self, id: Uuid, tables: Vec<String>) -> Result<(), CoreError> {
        let mut sessions = self.sessions.write().expect("session map poisoned");
        let session = sessions.get_mut(&id).ok_or(CoreError::SessionNotFound)?;
        session.selected_tables = Some(tables);
        Ok(())
    }

    pub fn remove(&self, id: Uuid) -> Option<Session> {
        self.sessions.write().expect("session map poisoned").remove(&id)
    }

    /// Sweeps sessions past the idle timeout. Returns the evicted ids.
    pub fn evict_expired(&self) -> Vec<Uuid> {
        let mut sessions = self.sessions.write().expect("session map poisoned");
        let expired: Vec<Uuid> = sessions
            .iter()
            .filter(|(_, s)| s.last_accessed.elapsed() >= self.idle_timeout)
            .map(|(id, _)| *id)
            .collect();

        for id in &expired {
            sessions.remove(id);
        }
        expired
    }

    pub fn len(&self) -> usize {
        self.sessions.read().expect("session map poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn manager_with_timeout(millis: u64) -> SessionManager {
        let mut config = CoreConfig::default();
        config.session_idle_timeout_secs = 0;
        let manager = SessionManager::new(&config);
        manager.idle_timeout_override_for_test(millis)
    }

    impl SessionManager {
        fn idle_timeout_override_for_test(self, millis: u64) -> Self {
            Self {
                sessions: self.sessions,
                idle_timeout: Duration::from_millis(millis),
            }
        }
    }

    #[test]
    fn create_and_touch_roundtrip() {
        let config = CoreConfig::default();
        let manager = SessionManager::new(&config);
        let profile = ConnectionProfile::new("x", DbConfig::default_postgres());
        let id = manager.create(profile);

        let session = manager.touch(id).unwrap();
        assert_eq!(session.session_id, id);
        assert!(session.connection_params_redacted.starts_with("postgresql://"));
    }

    #[test]
    fn unknown_session_is_not_found() {
        let config = CoreConfig::default();
        let manager = SessionManager::new(&config);
        let err = manager.touch(Uuid::new_v4()).unwrap_err();
        assert!(matches!(err, CoreError::SessionNotFound));
    }

    #[test]
    fn expired_session_is_distinct_from_not_found() {
        let manager = manager_with_timeout(1);
        let profile = ConnectionProfile::new("x", DbConfig::default_postgres());
        let id = manager.create(profile);

        std::thread::sleep(Duration::from_millis(15));
        let err = manager.touch(id).unwrap_err();
        assert!(matches!(err, CoreError::SessionExpired));

        // Once evicted, a second lookup reports not-found rather than expired.
        let err = manager.touch(id).unwrap_err();
        assert!(matches!(err, CoreError::SessionNotFound));
    }

    #[test]
    fn redacted_params_never_contain_password_field() {
        let redacted = redact_connection_params(&DbConfig::Postgres {
            host: "db.internal".into(),
            port: 5432,
            user: "alice".into(),
            database: "app".into(),
            ssl_mode: Default::default(),
        });
        assert!(!redacted.contains("password"));
    }
}
