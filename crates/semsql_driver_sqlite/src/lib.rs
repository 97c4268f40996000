mod driver;

pub use driver::{METADATA, SqliteConnection, SqliteDriver};
