use chrono::{Duration, Utc};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, TokenData, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserClaims {
    pub sub: String,
    pub exp: i64,
}

impl UserClaims {
    pub fn for_user(user_id: Uuid, lifetime_hours: i64) -> Self {
        Self {
            sub: user_id.to_string(),
            exp: (Utc::now() + Duration::hours(lifetime_hours)).timestamp(),
        }
    }

    pub fn user_id(&self) -> Option<Uuid> {
        self.sub.parse().ok()
    }
}

pub fn generate_token<K: AsRef<[u8]>>(
    claims: UserClaims,
    key: K,
) -> jsonwebtoken::errors::Result<String> {
    let header = Header::default();
    let key = EncodingKey::from_secret(key.as_ref());

    let token = jsonwebtoken::encode(&header, &claims, &key)?;
    Ok(token)
}

pub fn process_token<K: AsRef<[u8]>>(
    token: &str,
    key: K,
) -> jsonwebtoken::errors::Result<TokenData<UserClaims>> {
    let validation = Validation::default();
    let key = DecodingKey::from_secret(key.as_ref());

    let claims = jsonwebtoken::decode::<UserClaims>(token, &key, &validation)?;
    Ok(claims)
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn token_roundtrip_keeps_subject() {
        let id = Uuid::new_v4();
        let token = generate_token(UserClaims::for_user(id, 1), "key").unwrap();
        let data = process_token(&token, "key").unwrap();
        assert_eq!(data.claims.user_id(), Some(id));
    }

    #[test]
    fn wrong_key_is_rejected() {
        let token = generate_token(UserClaims::for_user(Uuid::new_v4(), 1), "key").unwrap();
        assert!(process_token(&token, "other").is_err());
    }

    #[test]
    fn expired_token_is_rejected() {
        let claims = UserClaims {
            sub: Uuid::new_v4().to_string(),
            exp: (Utc::now() - Duration::hours(2)).timestamp(),
        };
        let token = generate_token(claims, "key").unwrap();
        assert!(process_token(&token, "key").is_err());
    }
}
