//! Connection Pool & Session Manager (C2) and Schema Snapshot Store (C3).

pub mod pool;
pub mod session;
pub mod snapshot;

pub use pool::{ConnectionPool, PoolKey, PooledConnection};
pub use session::{Session, SessionManager};
pub use snapshot::{SnapshotKey, SnapshotStore, content_hash};
