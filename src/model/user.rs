use serde::{Deserialize, Serialize};

/// A row of the `users` table. The password hash never leaves the service;
/// serialization skips it.
#[derive(Debug, Serialize, Deserialize, sqlx::FromRow)]
pub struct User {
    pub id: u64, // matches BIGINT UNSIGNED
    pub email: String,
    #[serde(skip_serializing)]
    pub password: String,
    pub name: String,
    pub surname: String,
    pub role_id: u8,
    pub department: String,
}
