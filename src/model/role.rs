use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumString};

/// Role ids as stored in `users.role_id` and carried inside JWT claims.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Role {
    Employee = 1,
    Manager = 2,
    Hr = 3,
}

impl Role {
    pub fn from_id(id: u8) -> Option<Self> {
        match id {
            1 => Some(Role::Employee),
            2 => Some(Role::Manager),
            3 => Some(Role::Hr),
            _ => None,
        }
    }

    pub fn id(self) -> u8 {
        self as u8
    }
}
