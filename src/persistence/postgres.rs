//! PostgreSQL board access check and pool setup.

use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;

use crate::config::DatabaseConfig;
use crate::domain::{BoardId, UserId};
use crate::error::HubError;
use crate::hub::BoardAccess;

/// Opens the connection pool described by `config`.
///
/// # Errors
///
/// Returns a [`HubError::Persistence`] if no connection can be made within
/// the configured timeout.
pub async fn connect(config: &DatabaseConfig) -> Result<PgPool, HubError> {
    let pool = PgPoolOptions::new()
        .max_connections(config.max_connections)
        .acquire_timeout(config.connect_timeout)
        .connect(&config.url)
        .await?;
    Ok(pool)
}

/// Membership check against the `user_boards` join table.
#[derive(Debug, Clone)]
pub struct PostgresBoardAccess {
    pool: PgPool,
}

impl PostgresBoardAccess {
    /// Creates an access check backed by the given connection pool.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

impl BoardAccess for PostgresBoardAccess {
    async fn has_board_access(&self, user: UserId, board: BoardId) -> Result<bool, HubError> {
        let member = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM user_boards WHERE user_id = $1 AND board_id = $2)",
        )
        .bind(to_key(user.get())?)
        .bind(to_key(board.get())?)
        .fetch_one(&self.pool)
        .await?;

        Ok(member)
    }
}

/// Postgres has no unsigned integers; keys are stored as `BIGINT`.
fn to_key(raw: u64) -> Result<i64, HubError> {
    i64::try_from(raw).map_err(|_| HubError::InvalidPayload(format!("key {raw} out of range")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keys_map_to_bigint() {
        assert!(matches!(to_key(42), Ok(42)));
        assert!(matches!(to_key(u64::MAX), Err(HubError::InvalidPayload(_))));
    }
}
