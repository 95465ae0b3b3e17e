//! Repository for the `users` table.

use pointsub_core::types::DbId;
use sqlx::PgPool;

use crate::models::user::User;

/// Column list shared across queries to avoid repetition.
const COLUMNS: &str = "id, display_name, profile_image, email, api_token, created_at, updated_at";

/// Read-only user lookups used by the relay.
pub struct UserRepo;

impl UserRepo {
    /// Find a user by id.
    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<User>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM users WHERE id = $1");
        sqlx::query_as::<_, User>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Resolve the id of the user owning `token`.
    ///
    /// Returns `None` when no user holds the token.
    pub async fn find_id_by_api_token(
        pool: &PgPool,
        token: &str,
    ) -> Result<Option<DbId>, sqlx::Error> {
        sqlx::query_scalar("SELECT id FROM users WHERE api_token = $1")
            .bind(token)
            .fetch_optional(pool)
            .await
    }
}
