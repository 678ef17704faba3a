use sqlx::mysql::{MySqlConnectOptions, MySqlConnection};
use sqlx::Connection;
use tracing::{error, info};

use crate::config::DatabaseConfig;
use crate::error::{EtlError, EtlResult};

pub async fn connect(options: &MySqlConnectOptions) -> EtlResult<MySqlConnection> {
    MySqlConnection::connect_with(options)
        .await
        .map_err(EtlError::Connection)
}

/// `SELECT 1` against the server. Callers abort the run when this fails.
pub async fn check_connection(config: &DatabaseConfig) -> EtlResult<()> {
    info!("--- Testing Database Connection ({}) ---", config.display_target());

    let result = async {
        let mut conn = connect(&config.server_options()).await?;
        sqlx::query("SELECT 1")
            .execute(&mut conn)
            .await
            .map_err(EtlError::Connection)?;
        conn.close().await?;
        Ok::<(), EtlError>(())
    }
    .await;

    match &result {
        Ok(()) => info!("   -> Connection SUCCESS!"),
        Err(e) => error!("   -> Connection FAILED: {}", e),
    }
    result
}

/// Session-scoped, so it only holds for the connection it runs on.
pub async fn set_foreign_key_checks(conn: &mut MySqlConnection, enabled: bool) -> EtlResult<()> {
    let statement = if enabled {
        "SET FOREIGN_KEY_CHECKS = 1"
    } else {
        "SET FOREIGN_KEY_CHECKS = 0"
    };
    sqlx::raw_sql(statement).execute(&mut *conn).await?;
    Ok(())
}

/// Backtick-quote a MySQL identifier.
pub fn quote_identifier(name: &str) -> String {
    format!("`{}`", name.replace('`', "``"))
}
