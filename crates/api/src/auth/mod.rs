//! Socket token authentication.
//!
//! [`AuthResolver`] is the seam between the socket protocol and whatever
//! stores API tokens. Production uses [`PgAuthResolver`]; tests plug in an
//! in-memory map.

use async_trait::async_trait;
use pointsub_core::error::CoreError;
use pointsub_core::types::DbId;
use pointsub_db::repositories::UserRepo;
use pointsub_db::DbPool;

/// Resolves socket API tokens to user ids.
#[async_trait]
pub trait AuthResolver: Send + Sync {
    /// Return the id of the user owning `token`, or `None` if nobody does.
    async fn get_id_from_token(&self, token: &str) -> Result<Option<DbId>, CoreError>;

    /// Whether the backing store is reachable. Reported by `/health`.
    async fn is_healthy(&self) -> bool {
        true
    }
}

/// [`AuthResolver`] backed by the `users.api_token` column.
pub struct PgAuthResolver {
    pool: DbPool,
}

impl PgAuthResolver {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AuthResolver for PgAuthResolver {
    async fn get_id_from_token(&self, token: &str) -> Result<Option<DbId>, CoreError> {
        UserRepo::find_id_by_api_token(&self.pool, token)
            .await
            .map_err(|e| CoreError::Internal(format!("token lookup failed: {e}")))
    }

    async fn is_healthy(&self) -> bool {
        pointsub_db::health_check(&self.pool).await.is_ok()
    }
}
