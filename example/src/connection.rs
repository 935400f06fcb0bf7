use std::env::var;
use pgline::{Config, Connection, Result};

pub async fn main() -> Result<()> {
    let conn = Connection::connect_env().await?;
    conn.query("SELECT 1").await?;
    tracing::info!(
        "server_version = {:?}",
        conn.parameter("server_version").as_deref(),
    );
    conn.close().await?;

    if let Ok(url) = var("DATABASE_URL") {
        let conn = Connection::connect(&url).await?;
        conn.query("SELECT 1").await?;
        conn.close().await?;
    }

    let mut config = Config::from_env();
    config.settings_mut().statement_cache = 0;
    let mut conn = Connection::connect_with(config).await?;
    conn.execute("SELECT $1::int4", &[420.into()]).await?;
    conn.close().await?;

    Ok(())
}
