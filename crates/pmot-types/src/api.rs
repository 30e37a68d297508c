use serde::{Deserialize, Serialize};

// -- JWT Claims --

/// Bearer token payload. `sub` is the username the token was issued for.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub exp: usize,
}

// -- Auth --

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub email: String,
    pub username: String,
    pub password: String,
}

/// OAuth2 password-flow form posted to `/token`.
#[derive(Debug, Deserialize)]
pub struct TokenRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub token_type: String,
}

impl TokenResponse {
    pub fn bearer(access_token: String) -> Self {
        Self {
            access_token,
            token_type: "bearer".to_string(),
        }
    }
}

// -- Stories --

/// Body of both create and full-replace update.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoryRequest {
    pub title: String,
    pub takeoff: String,
    pub turbulence: String,
    pub touchdown: String,
    #[serde(default)]
    pub media_links: Vec<MediaLinkRequest>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MediaLinkRequest {
    pub media_type: String,
    pub url: String,
}

#[derive(Debug, Deserialize)]
pub struct StoryQuery {
    #[serde(default, alias = "offset")]
    pub skip: u32,
    #[serde(default = "default_limit")]
    pub limit: u32,
}

fn default_limit() -> u32 {
    100
}

impl Default for StoryQuery {
    fn default() -> Self {
        Self {
            skip: 0,
            limit: default_limit(),
        }
    }
}

// -- Premium --

#[derive(Debug, Serialize, Deserialize)]
pub struct VerifyPaymentRequest {
    pub payment_id: String,
    pub order_id: String,
    pub signature: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct VerifyPaymentResponse {
    pub status: String,
    pub is_premium: bool,
}

// -- Misc --

#[derive(Debug, Serialize, Deserialize)]
pub struct UploadResponse {
    pub url: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct MessageResponse {
    pub message: String,
}
