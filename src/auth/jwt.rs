use crate::models::{Claims, TokenType};
use jsonwebtoken::{DecodingKey, Validation, decode};

/// Decodes an HS256 access token. Refresh tokens are refused here; they
/// are only good for the identity service's refresh endpoint.
pub fn verify_token(token: &str, secret: &str) -> Result<Claims, String> {
    let claims = decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .map(|data| data.claims)
    .map_err(|e| e.to_string())?;

    if claims.token_type != TokenType::Access {
        return Err("Access token required".to_string());
    }
    Ok(claims)
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use jsonwebtoken::{EncodingKey, Header, encode};
    use std::time::{SystemTime, UNIX_EPOCH};

    pub const SECRET: &str = "test-secret";

    pub fn token(
        user_id: u64,
        role: u8,
        employee_id: Option<u64>,
        token_type: TokenType,
        ttl_secs: i64,
    ) -> String {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap()
            .as_secs() as i64;
        let claims = Claims {
            user_id,
            sub: format!("user{user_id}@company.com"),
            role,
            exp: (now + ttl_secs) as usize,
            jti: uuid::Uuid::new_v4().to_string(),
            token_type,
            employee_id,
        };
        encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(SECRET.as_bytes()),
        )
        .unwrap()
    }

    pub fn access(user_id: u64, role: u8, employee_id: Option<u64>) -> String {
        token(user_id, role, employee_id, TokenType::Access, 900)
    }
}

#[cfg(test)]
mod tests {
    use super::testing::*;
    use super::*;

    #[test]
    fn accepts_valid_access_tokens() {
        let claims = verify_token(&access(5, 2, Some(9)), SECRET).unwrap();
        assert_eq!(claims.user_id, 5);
        assert_eq!(claims.role, 2);
        assert_eq!(claims.employee_id, Some(9));
    }

    #[test]
    fn rejects_refresh_expired_and_foreign_tokens() {
        let refresh = token(5, 2, None, TokenType::Refresh, 900);
        assert!(verify_token(&refresh, SECRET).is_err());

        let expired = token(5, 2, None, TokenType::Access, -3600);
        assert!(verify_token(&expired, SECRET).is_err());

        assert!(verify_token(&access(5, 2, None), "another-secret").is_err());
        assert!(verify_token("not-a-jwt", SECRET).is_err());
    }
}
