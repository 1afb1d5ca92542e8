pub mod configs;
pub mod connection;
pub mod match_results;
pub mod metrics;
pub mod models;
pub mod protection;
pub mod seed_stats;
pub mod setup;

pub use connection::{DbConn, DbPool, create_pool, create_pool_with_size, get_connection};
pub use models::*;

#[cfg(test)]
pub(crate) mod test_support {
    use std::path::PathBuf;

    use super::connection::{DbConn, DbPool, create_pool, get_connection};
    use super::setup::initialize_database;

    pub fn test_db_path(name: &str) -> PathBuf {
        let path = std::env::temp_dir().join(format!(
            "placement_ranking_{}_{}.db",
            name,
            std::process::id()
        ));
        let _ = std::fs::remove_file(&path);
        path
    }

    pub fn open_test_pool(name: &str) -> DbPool {
        let path = test_db_path(name);
        let pool = create_pool(&path.to_string_lossy()).unwrap();
        let conn = get_connection(&pool).unwrap();
        initialize_database(&conn).unwrap();
        pool
    }

    pub fn open_test_db(name: &str) -> DbConn {
        let pool = open_test_pool(name);
        get_connection(&pool).unwrap()
    }
}
