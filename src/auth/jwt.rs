use crate::models::{Claims, TokenType};
use jsonwebtoken::{DecodingKey, Validation, decode};

/// Validates signature and expiry, and only accepts access tokens.
pub fn verify_access_token(token: &str, secret: &str) -> Result<Claims, String> {
    let claims = decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .map(|data| data.claims)
    .map_err(|e| e.to_string())?;

    if claims.token_type != TokenType::Access {
        return Err("refresh tokens cannot be used for API access".to_string());
    }
    Ok(claims)
}

#[cfg(test)]
pub fn sign_access_token(
    user_id: u64,
    role: u8,
    employee_id: Option<u64>,
    secret: &str,
    token_type: TokenType,
) -> String {
    use jsonwebtoken::{EncodingKey, Header, encode};

    let claims = Claims {
        user_id,
        sub: format!("user{user_id}"),
        role,
        exp: (chrono::Utc::now().timestamp() + 900) as usize,
        jti: uuid::Uuid::new_v4().to_string(),
        token_type,
        employee_id,
    };
    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .unwrap()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_access_tokens_only() {
        let access = sign_access_token(1, 2, Some(5), "secret", TokenType::Access);
        let claims = verify_access_token(&access, "secret").unwrap();
        assert_eq!(claims.employee_id, Some(5));

        let refresh = sign_access_token(1, 2, Some(5), "secret", TokenType::Refresh);
        assert!(verify_access_token(&refresh, "secret").is_err());
        assert!(verify_access_token(&access, "other-secret").is_err());
    }
}
