//! User entity model.

use pointsub_core::types::{DbId, Timestamp};
use serde::Serialize;
use sqlx::FromRow;

/// Full user row from the `users` table.
///
/// Contains the socket API token -- NEVER serialize it to clients.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct User {
    pub id: DbId,
    pub display_name: String,
    pub profile_image: String,
    pub email: String,
    #[serde(skip_serializing)]
    pub api_token: Option<String>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}
