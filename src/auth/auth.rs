use crate::auth::jwt::verify_token;
use crate::config::Config;
use crate::domain::Actor;
use crate::error::ApiError;
use crate::model::role::Role;
use actix_web::{FromRequest, HttpMessage, HttpRequest, dev::Payload, web::Data};
use futures::future::{Ready, ready};

#[derive(Debug, Clone)]
pub struct AuthUser {
    pub user_id: u64,
    pub username: String,
    pub role: Role,

    /// Present only if this user is linked to an employee record
    pub employee_id: Option<u64>,
}

impl FromRequest for AuthUser {
    type Error = ApiError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut Payload) -> Self::Future {
        // Set by auth_middleware on protected scopes.
        if let Some(user) = req.extensions().get::<AuthUser>() {
            return ready(Ok(user.clone()));
        }

        let token = match req
            .headers()
            .get("Authorization")
            .and_then(|h| h.to_str().ok())
            .and_then(|h| h.strip_prefix("Bearer "))
        {
            Some(t) => t,
            None => return ready(Err(ApiError::Unauthorized("Missing token".into()))),
        };

        let config = match req.app_data::<Data<Config>>() {
            Some(c) => c,
            None => {
                tracing::error!("Config missing from app data");
                return ready(Err(ApiError::Internal));
            }
        };

        let claims = match verify_token(token, &config.jwt_secret) {
            Ok(c) => c,
            Err(_) => return ready(Err(ApiError::Unauthorized("Invalid token".into()))),
        };

        let role = match Role::from_id(claims.role) {
            Some(r) => r,
            None => return ready(Err(ApiError::Unauthorized("Invalid role".into()))),
        };

        ready(Ok(AuthUser {
            user_id: claims.user_id,
            username: claims.sub,
            role,
            employee_id: claims.employee_id,
        }))
    }
}

impl AuthUser {
    pub fn require_admin(&self) -> Result<(), ApiError> {
        if self.role == Role::Admin {
            Ok(())
        } else {
            Err(ApiError::forbidden("Admin only"))
        }
    }

    pub fn require_hr_or_admin(&self) -> Result<(), ApiError> {
        if self.role.is_hr_or_admin() {
            Ok(())
        } else {
            Err(ApiError::forbidden("HR/Admin only"))
        }
    }

    /// The caller's employee id, for endpoints that act on "my" records.
    pub fn require_employee(&self) -> Result<u64, ApiError> {
        self.employee_id
            .ok_or_else(|| ApiError::forbidden("No employee profile"))
    }

    pub fn actor(&self) -> Actor {
        Actor {
            user_id: self.user_id,
            role: self.role,
            employee_id: self.employee_id,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::jwt::testing::access;
    use actix_web::test::TestRequest;

    fn user(role: Role, employee_id: Option<u64>) -> AuthUser {
        AuthUser {
            user_id: 1,
            username: "u@company.com".into(),
            role,
            employee_id,
        }
    }

    #[test]
    fn role_guards() {
        assert!(user(Role::Admin, None).require_admin().is_ok());
        assert!(user(Role::Hr, None).require_admin().is_err());
        assert!(user(Role::Hr, None).require_hr_or_admin().is_ok());
        assert!(user(Role::Manager, Some(3)).require_hr_or_admin().is_err());
        assert_eq!(user(Role::TeamMember, Some(3)).require_employee().unwrap(), 3);
        assert!(user(Role::Finance, None).require_employee().is_err());
    }

    #[actix_web::test]
    async fn extracts_from_bearer_header() {
        let req = TestRequest::default()
            .insert_header(("Authorization", format!("Bearer {}", access(8, 4, Some(21)))))
            .app_data(Data::new(Config::for_tests()))
            .to_http_request();

        let user = AuthUser::extract(&req).await.unwrap();
        assert_eq!(user.user_id, 8);
        assert_eq!(user.role, Role::Manager);
        assert_eq!(user.actor().employee_id, Some(21));
    }

    #[actix_web::test]
    async fn rejects_missing_or_unknown_role() {
        let req = TestRequest::default()
            .app_data(Data::new(Config::for_tests()))
            .to_http_request();
        assert!(matches!(
            AuthUser::extract(&req).await,
            Err(ApiError::Unauthorized(_))
        ));

        let req = TestRequest::default()
            .insert_header(("Authorization", format!("Bearer {}", access(8, 42, None))))
            .app_data(Data::new(Config::for_tests()))
            .to_http_request();
        assert!(matches!(
            AuthUser::extract(&req).await,
            Err(ApiError::Unauthorized(_))
        ));
    }
}
