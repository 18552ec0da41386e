use actix_web::{FromRequest, HttpRequest, dev::Payload, error::ErrorUnauthorized, web::Data};
use futures::future::{Ready, ready};
use jsonwebtoken::decode;
use jsonwebtoken::{DecodingKey, Validation};

use crate::config::Config;
use crate::model::role::Role;
use crate::models::{Claims, TokenType};
use crate::visibility::Visibility;

/// The authenticated principal for one request, decoded from the bearer
/// token. Passed explicitly into every operation that needs an identity.
pub struct AuthUser {
    pub user_id: u64,
    pub email: String,
    pub name: String,
    pub surname: String,
    pub role: Role,
    pub department: String,
}

impl FromRequest for AuthUser {
    type Error = actix_web::Error;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut Payload) -> Self::Future {
        let token = match req
            .headers()
            .get("Authorization")
            .and_then(|h| h.to_str().ok())
            .and_then(|h| h.strip_prefix("Bearer "))
        {
            Some(t) => t,
            None => return ready(Err(ErrorUnauthorized("Missing token"))),
        };

        let config = match req.app_data::<Data<Config>>() {
            Some(c) => c,
            None => {
                return ready(Err(actix_web::error::ErrorInternalServerError(
                    "Config missing",
                )));
            }
        };

        let data = match decode::<Claims>(
            token,
            &DecodingKey::from_secret(config.jwt_secret.as_bytes()),
            &Validation::default(),
        ) {
            Ok(d) => d,
            Err(_) => return ready(Err(ErrorUnauthorized("Invalid token"))),
        };

        if data.claims.token_type != TokenType::Access {
            return ready(Err(ErrorUnauthorized("Invalid token")));
        }

        let role = match Role::from_id(data.claims.role) {
            Some(r) => r,
            None => return ready(Err(ErrorUnauthorized("Invalid role"))),
        };

        ready(Ok(AuthUser {
            user_id: data.claims.user_id,
            email: data.claims.sub,
            name: data.claims.name,
            surname: data.claims.surname,
            role,
            department: data.claims.department,
        }))
    }
}

impl AuthUser {
    /// Display name stamped onto records this principal creates.
    pub fn full_name(&self) -> String {
        format!("{} {}", self.name, self.surname)
    }

    /// The record scope this principal is allowed to see.
    pub fn visibility(&self) -> Visibility {
        Visibility::for_principal(self.user_id, self.role, &self.department)
    }

    pub fn require_manager(&self) -> actix_web::Result<()> {
        if self.role == Role::Manager {
            Ok(())
        } else {
            Err(actix_web::error::ErrorForbidden("Manager only"))
        }
    }

    pub fn require_hr(&self) -> actix_web::Result<()> {
        if self.role == Role::Hr {
            Ok(())
        } else {
            Err(actix_web::error::ErrorForbidden("HR only"))
        }
    }

    pub fn require_manager_or_hr(&self) -> actix_web::Result<()> {
        if matches!(self.role, Role::Manager | Role::Hr) {
            Ok(())
        } else {
            Err(actix_web::error::ErrorForbidden("Manager/HR only"))
        }
    }
}
