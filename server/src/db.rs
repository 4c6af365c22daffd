use diesel::PgConnection;
use diesel::r2d2::{ConnectionManager, Pool, PoolError, PooledConnection};
use diesel_migrations::{EmbeddedMigrations, MigrationHarness, embed_migrations};
use tracing::info;

pub type ConnectionPool = Pool<ConnectionManager<PgConnection>>;
pub type Connection = PooledConnection<ConnectionManager<PgConnection>>;
pub type MigrationError = Box<dyn std::error::Error + Send + Sync>;

/// Creates a connection pool with one connection per runtime worker. Connections
/// are established lazily, so this doesn't fail if the database is unreachable.
pub fn create_connection_pool(database_url: String) -> ConnectionPool {
    let num_threads = tokio::runtime::Handle::try_current()
        .map(|handle| handle.metrics().num_workers())
        .unwrap_or(1);
    let manager = ConnectionManager::new(database_url);
    Pool::builder()
        .max_size(num_threads as u32)
        .max_lifetime(None)
        .idle_timeout(None)
        .test_on_check_out(true)
        .build_unchecked(manager)
}

/// Returns a connection to the database from `pool`.
pub fn get_connection(pool: &ConnectionPool) -> Result<Connection, PoolError> {
    pool.get()
}

/// Runs embedded migrations on the database. Used to update database for end-users who don't build server themselves.
pub fn run_migrations(conn: &mut PgConnection) -> Result<(), MigrationError> {
    let applied = conn.run_pending_migrations(MIGRATIONS)?;
    for version in applied {
        info!("Applied migration {version}");
    }
    Ok(())
}

const MIGRATIONS: EmbeddedMigrations = embed_migrations!();
