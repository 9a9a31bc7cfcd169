/// PostgreSQL access
///
/// - `pool`: pool construction, lazy pools for router tests, `SELECT 1` health check
/// - `migrations`: applies `migrations/*.sql`, embedded at compile time
///
/// Query functions live on the structs in [`crate::models`].
///
/// ```no_run
/// use babycontrol_shared::db::{migrations::run_migrations, pool::{create_pool, DatabaseConfig}};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let pool = create_pool(DatabaseConfig {
///     url: "postgres://localhost/babycontrol".to_string(),
///     ..Default::default()
/// })
/// .await?;
/// run_migrations(&pool).await?;
/// # Ok(())
/// # }
/// ```

pub mod migrations;
pub mod pool;
