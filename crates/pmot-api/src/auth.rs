use argon2::{Argon2, PasswordHash, PasswordHasher, PasswordVerifier, password_hash::SaltString};
use axum::{Extension, Form, Json, extract::State, http::StatusCode, response::IntoResponse};
use axum_extra::extract::WithRejection;
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use rand_core::OsRng;
use tracing::{info, warn};

use pmot_db::{Database, queries};
use pmot_types::api::{Claims, RegisterRequest, TokenRequest, TokenResponse};
use pmot_types::models::User;

use crate::convert::user_from_row;
use crate::middleware::Identity;
use crate::{ApiError, AppState, blocking};

const USERNAME_LEN: std::ops::RangeInclusive<usize> = 3..=32;
const PASSWORD_LEN: std::ops::RangeInclusive<usize> = 8..=40;
const EMAIL_MAX_LEN: usize = 255;

#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("email already registered")]
    DuplicateEmail,

    #[error("username already taken")]
    DuplicateUsername,

    #[error("{0}")]
    Invalid(String),

    #[error("incorrect username or password")]
    InvalidCredentials,

    #[error(transparent)]
    Storage(#[from] anyhow::Error),
}

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::DuplicateEmail | AuthError::DuplicateUsername => {
                ApiError::Conflict(err.to_string())
            }
            AuthError::Invalid(msg) => ApiError::BadRequest(msg),
            AuthError::InvalidCredentials => ApiError::InvalidCredentials,
            AuthError::Storage(e) => ApiError::Internal(e),
        }
    }
}

// -- Password hashing --

/// Hash a password with Argon2id and a fresh random salt.
pub fn hash_password(password: &str) -> anyhow::Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| anyhow::anyhow!("password hashing failed: {}", e))?;
    Ok(hash.to_string())
}

pub fn verify_password(password: &str, hash: &str) -> bool {
    match PasswordHash::new(hash) {
        Ok(parsed) => Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok(),
        Err(e) => {
            warn!("Stored password hash is unreadable: {}", e);
            false
        }
    }
}

// -- Bearer tokens --

/// HS256 signer/verifier for bearer tokens.
pub struct TokenKeys {
    encoding: EncodingKey,
    decoding: DecodingKey,
    ttl: chrono::Duration,
}

impl TokenKeys {
    pub fn new(secret: &str, ttl: chrono::Duration) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            ttl,
        }
    }

    pub fn issue(&self, username: &str) -> anyhow::Result<String> {
        let claims = Claims {
            sub: username.to_string(),
            exp: (chrono::Utc::now() + self.ttl).timestamp().max(0) as usize,
        };
        Ok(encode(&Header::default(), &claims, &self.encoding)?)
    }

    /// Decode a token, rejecting bad signatures and expired tokens.
    pub fn verify(&self, token: &str) -> Option<Claims> {
        decode::<Claims>(token, &self.decoding, &Validation::default())
            .map(|data| data.claims)
            .ok()
    }
}

// -- Registration & login --

fn validate_registration(req: &RegisterRequest) -> Result<(), AuthError> {
    let email_ok = req.email.len() <= EMAIL_MAX_LEN
        && match req.email.split_once('@') {
            Some((local, domain)) => !local.is_empty() && !domain.is_empty() && !domain.contains('@'),
            None => false,
        };
    if !email_ok {
        return Err(AuthError::Invalid("invalid email address".into()));
    }
    if !USERNAME_LEN.contains(&req.username.chars().count()) {
        return Err(AuthError::Invalid("username must be 3 to 32 characters".into()));
    }
    if !PASSWORD_LEN.contains(&req.password.chars().count()) {
        return Err(AuthError::Invalid("password must be 8 to 40 characters".into()));
    }
    Ok(())
}

/// Create a user. Email and username uniqueness are checked in the same
/// transaction as the insert.
pub fn register_user(db: &Database, req: &RegisterRequest) -> Result<User, AuthError> {
    validate_registration(req)?;
    let hashed = hash_password(&req.password)?;

    let row = db.with_tx(|tx| {
        if queries::email_exists(tx, &req.email)? {
            return Err(AuthError::DuplicateEmail);
        }
        if queries::username_exists(tx, &req.username)? {
            return Err(AuthError::DuplicateUsername);
        }
        let id = queries::insert_user(tx, &req.email, &req.username, &hashed)?;
        queries::user_by_id(tx, id)?
            .ok_or_else(|| AuthError::Storage(anyhow::anyhow!("user {} vanished after insert", id)))
    })?;

    Ok(user_from_row(row))
}

/// Check credentials and issue a bearer token. Unknown users and wrong
/// passwords fail the same way.
pub fn authenticate(db: &Database, keys: &TokenKeys, username: &str, password: &str) -> Result<String, AuthError> {
    let user = db
        .get_user_by_username(username)?
        .ok_or(AuthError::InvalidCredentials)?;

    if !verify_password(password, &user.hashed_password) {
        return Err(AuthError::InvalidCredentials);
    }

    Ok(keys.issue(&user.username)?)
}

// -- Handlers --

/// POST /users/
pub async fn register(
    State(state): State<AppState>,
    WithRejection(Json(req), _): WithRejection<Json<RegisterRequest>, ApiError>,
) -> Result<impl IntoResponse, ApiError> {
    let user = blocking(&state, move |s| register_user(&s.db, &req)).await?;
    info!("Registered user {} (id {})", user.username, user.id);
    Ok((StatusCode::CREATED, Json(user)))
}

/// POST /token: OAuth2 password flow.
pub async fn login(
    State(state): State<AppState>,
    WithRejection(Form(req), _): WithRejection<Form<TokenRequest>, ApiError>,
) -> Result<Json<TokenResponse>, ApiError> {
    let token = blocking(&state, move |s| {
        authenticate(&s.db, &s.tokens, &req.username, &req.password)
    })
    .await?;
    Ok(Json(TokenResponse::bearer(token)))
}

/// GET /users/me
pub async fn me(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
) -> Result<Json<User>, ApiError> {
    let row = blocking(&state, move |s| s.db.get_user_by_id(identity.id))
        .await?
        .ok_or(ApiError::Unauthorized)?;
    Ok(Json(user_from_row(row)))
}
