mod driver;

pub use driver::{METADATA, OracleConnection, OracleDriver};
