mod driver;

pub use driver::{MARIADB_METADATA, MYSQL_METADATA, MysqlConnection, MysqlDriver};
