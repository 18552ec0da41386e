use serde::{Deserialize, Serialize};

use crate::model::role::Role;

#[derive(Deserialize)]
pub struct RegisterReq {
    pub name: String,
    pub surname: String,
    pub email: String,
    pub password: String,
    pub role: Role,
    pub department: String,
}

#[derive(Deserialize)]
pub struct LoginReqDto {
    pub email: String,
    pub password: String,
}

/// The authenticated principal, minus the password, travels inside the
/// token claims. A page reload re-presents the token and restores the
/// session without re-authentication.
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub user_id: u64,
    pub sub: String, // email
    pub name: String,
    pub surname: String,
    pub role: u8, // role id
    pub department: String,
    pub exp: usize,
    pub jti: String,
    pub token_type: TokenType,
}

#[derive(Debug, Serialize, Deserialize, PartialEq)]
pub enum TokenType {
    Access,
    Refresh,
}
