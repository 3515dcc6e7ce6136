use actix_session::{Session, SessionExt};
use actix_web::{dev, FromRequest, HttpRequest};
use serde::Serialize;
use std::future::{ready, Ready};

use crate::models::Role;

/// Identity extracted from the cookie session; present on every request
/// inside the guarded admin scope.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthenticatedUser {
    pub user_id: String,
    pub email: String,
    pub name: String,
    pub role: Role,
}

impl FromRequest for AuthenticatedUser {
    type Error = actix_web::Error;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut dev::Payload) -> Self::Future {
        let session = req.get_session();
        let user_id = session.get::<String>("user_id").unwrap_or(None);
        let email = session.get::<String>("email").unwrap_or(None);
        let name = session.get::<String>("name").unwrap_or(None);
        let role = session.get::<Role>("role").unwrap_or(None);

        if let (Some(user_id), Some(email), Some(name), Some(role)) = (user_id, email, name, role)
        {
            ready(Ok(AuthenticatedUser {
                user_id,
                email,
                name,
                role,
            }))
        } else {
            ready(Err(actix_web::error::ErrorUnauthorized("Not logged in.")))
        }
    }
}

pub fn admin_guard(session: &Session) -> bool {
    session.get::<Role>("role").unwrap_or(None) == Some(Role::Admin)
}

/// Writes the logged-in identity into the cookie session.
pub fn store_session_identity(session: &Session, user: &crate::models::User) {
    let _ = session.insert("user_id", &user.id);
    let _ = session.insert("email", &user.email);
    let _ = session.insert("name", &user.name);
    let _ = session.insert("role", user.role);
}
