use std::sync::Arc;

use actix_web::{web, HttpResponse};
use bcrypt::{hash, verify};
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use log::{info, warn};
use serde::{Deserialize, Serialize};

use crate::app_state::AppState;
use crate::error::ApiError;
use crate::models::{NewUser, PublicUser, User};
use crate::store::{StoreError, UserStore};

#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub iat: usize,
    pub exp: usize,
}

/// HS256 signing and verification keys derived from one shared secret.
#[derive(Clone)]
pub struct JwtKeys {
    encoding: EncodingKey,
    decoding: DecodingKey,
    ttl: Duration,
}

impl JwtKeys {
    pub fn new(secret: &str, ttl_hours: i64) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            ttl: Duration::hours(ttl_hours),
        }
    }

    // JWT Creation
    pub fn create_jwt(&self, user_id: &str) -> Result<String, jsonwebtoken::errors::Error> {
        let now = Utc::now();
        let claims = Claims {
            sub: user_id.to_string(),
            iat: now.timestamp() as usize,
            exp: (now + self.ttl).timestamp() as usize,
        };
        encode(&Header::default(), &claims, &self.encoding)
    }

    // JWT Validation
    pub fn validate_jwt(&self, token: &str) -> Result<Claims, jsonwebtoken::errors::Error> {
        let token_data = decode::<Claims>(token, &self.decoding, &Validation::default())?;
        Ok(token_data.claims)
    }
}

#[derive(Deserialize)]
pub struct RegisterInfo {
    pub name: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
    pub confirmpassword: Option<String>,
}

#[derive(Deserialize)]
pub struct LoginInfo {
    pub email: Option<String>,
    pub password: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub msg: String,
    pub token: String,
    pub user: PublicUser,
}

/// Treats blank strings the same as missing fields.
pub(crate) fn required(value: &Option<String>, message: &str) -> Result<String, ApiError> {
    match value.as_deref().map(str::trim) {
        Some(v) if !v.is_empty() => Ok(v.to_string()),
        _ => Err(ApiError::Validation(message.to_string())),
    }
}

/// Registration and login over a [`UserStore`].
#[derive(Clone)]
pub struct AuthService {
    users: Arc<dyn UserStore>,
    keys: JwtKeys,
    bcrypt_cost: u32,
}

impl AuthService {
    pub fn new(users: Arc<dyn UserStore>, keys: JwtKeys, bcrypt_cost: u32) -> Self {
        Self {
            users,
            keys,
            bcrypt_cost,
        }
    }

    pub fn keys(&self) -> &JwtKeys {
        &self.keys
    }

    pub async fn register(&self, info: &RegisterInfo) -> Result<User, ApiError> {
        let name = required(&info.name, "Name is required")?;
        let email = required(&info.email, "Email is required")?;
        // Passwords are taken verbatim; only emptiness is checked.
        let password = match info.password.as_deref() {
            Some(p) if !p.is_empty() => p,
            _ => return Err(ApiError::Validation("Password is required".to_string())),
        };
        if info.confirmpassword.as_deref() != Some(password) {
            return Err(ApiError::Validation("Passwords do not match".to_string()));
        }

        let password_hash = hash(password, self.bcrypt_cost)?;

        let user = self
            .users
            .insert_user(NewUser {
                name,
                email,
                password_hash,
            })
            .await
            .map_err(|e| match e {
                StoreError::Duplicate => {
                    ApiError::Conflict("Email is already registered".to_string())
                }
                other => other.into(),
            })?;

        info!("User registered: {}", user.id);
        Ok(user)
    }

    pub async fn login(&self, info: &LoginInfo) -> Result<(String, User), ApiError> {
        let email = required(&info.email, "Email is required")?;
        let password = match info.password.as_deref() {
            Some(p) if !p.is_empty() => p,
            _ => return Err(ApiError::Validation("Password is required".to_string())),
        };

        let user = self
            .users
            .find_user_by_email(&email)
            .await?
            .ok_or_else(|| ApiError::NotFound("User not found".to_string()))?;

        if !verify(password, &user.password_hash)? {
            warn!("Failed login attempt for user {}", user.id);
            return Err(ApiError::Validation("Invalid password".to_string()));
        }

        let token = self.keys.create_jwt(&user.id.to_hex())?;
        Ok((token, user))
    }
}

// Register Endpoint
pub async fn register(
    data: web::Data<AppState>,
    register_info: web::Json<RegisterInfo>,
) -> Result<HttpResponse, ApiError> {
    data.auth.register(&register_info).await?;
    Ok(HttpResponse::Created().json(serde_json::json!({ "msg": "User created successfully" })))
}

// Login Endpoint
pub async fn login(
    data: web::Data<AppState>,
    login_info: web::Json<LoginInfo>,
) -> Result<HttpResponse, ApiError> {
    let (token, user) = data.auth.login(&login_info).await?;
    Ok(HttpResponse::Ok().json(LoginResponse {
        msg: "Authentication successful".to_string(),
        token,
        user: PublicUser::from(&user),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::memory::MemoryStore;

    fn service() -> AuthService {
        AuthService::new(
            Arc::new(MemoryStore::default()),
            JwtKeys::new("test-secret", 1),
            4,
        )
    }

    fn registration(email: &str, password: &str) -> RegisterInfo {
        RegisterInfo {
            name: Some("Ana".to_string()),
            email: Some(email.to_string()),
            password: Some(password.to_string()),
            confirmpassword: Some(password.to_string()),
        }
    }

    fn credentials(email: &str, password: &str) -> LoginInfo {
        LoginInfo {
            email: Some(email.to_string()),
            password: Some(password.to_string()),
        }
    }

    #[actix_web::test]
    async fn second_registration_with_same_email_conflicts() {
        let auth = service();
        auth.register(&registration("ana@example.com", "first"))
            .await
            .unwrap();

        let err = auth
            .register(&registration("ana@example.com", "different"))
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::Conflict(_)));
    }

    #[actix_web::test]
    async fn registration_requires_every_field() {
        let auth = service();
        let mut info = registration("ana@example.com", "pw");
        info.name = Some("   ".to_string());
        assert!(matches!(
            auth.register(&info).await.unwrap_err(),
            ApiError::Validation(_)
        ));

        let mut info = registration("ana@example.com", "pw");
        info.email = None;
        assert!(matches!(
            auth.register(&info).await.unwrap_err(),
            ApiError::Validation(_)
        ));

        let mut info = registration("ana@example.com", "pw");
        info.password = None;
        assert!(matches!(
            auth.register(&info).await.unwrap_err(),
            ApiError::Validation(_)
        ));
    }

    #[actix_web::test]
    async fn mismatched_confirmation_is_rejected() {
        let auth = service();
        let mut info = registration("ana@example.com", "pw");
        info.confirmpassword = Some("other".to_string());

        let err = auth.register(&info).await.unwrap_err();
        assert_eq!(err.to_string(), "Passwords do not match");
    }

    #[actix_web::test]
    async fn stored_password_is_a_bcrypt_hash() {
        let auth = service();
        let user = auth
            .register(&registration("ana@example.com", "hunter2"))
            .await
            .unwrap();
        assert_ne!(user.password_hash, "hunter2");
        assert!(verify("hunter2", &user.password_hash).unwrap());
    }

    #[actix_web::test]
    async fn login_succeeds_only_with_the_registered_password() {
        let auth = service();
        let registered = auth
            .register(&registration("ana@example.com", "correct horse"))
            .await
            .unwrap();

        let (token, user) = auth
            .login(&credentials("ana@example.com", "correct horse"))
            .await
            .unwrap();
        assert_eq!(user.id, registered.id);
        let claims = auth.keys().validate_jwt(&token).unwrap();
        assert_eq!(claims.sub, registered.id.to_hex());
        assert!(claims.exp > claims.iat);

        let err = auth
            .login(&credentials("ana@example.com", "battery staple"))
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::Validation(_)));
    }

    #[actix_web::test]
    async fn login_for_unknown_email_is_not_found() {
        let err = service()
            .login(&credentials("nobody@example.com", "pw"))
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::NotFound(_)));
    }

    #[test]
    fn tokens_from_another_secret_are_rejected() {
        let ours = JwtKeys::new("ours", 1);
        let theirs = JwtKeys::new("theirs", 1);
        let token = theirs.create_jwt("65f000000000000000000001").unwrap();
        assert!(ours.validate_jwt(&token).is_err());
    }

    #[test]
    fn tampered_tokens_are_rejected() {
        let keys = JwtKeys::new("secret", 1);
        let mut token = keys.create_jwt("65f000000000000000000001").unwrap();
        token.push('x');
        assert!(keys.validate_jwt(&token).is_err());
    }
}
