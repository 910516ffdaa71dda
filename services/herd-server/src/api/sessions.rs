//! Session token generation, hashing, and cookies.
//!
//! Token format: `hrd_st_<32 random bytes base64url>`.
//!
//! Tokens are handed to the client once and stored hashed (SHA-256).

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use chrono::{Duration, Utc};
use herd_id::UserId;
use rand::Rng;
use sha2::{Digest, Sha256};

use crate::api::error::{internal_db_error, ApiError};
use crate::api::request_context::RequestContext;
use crate::db::SessionRecord;
use crate::state::AppState;

pub const SESSION_TOKEN_PREFIX: &str = "hrd_st_";
pub const SESSION_COOKIE: &str = "herd_session";

/// Token bytes (32 bytes = 256 bits of entropy).
const TOKEN_BYTES: usize = 32;

/// Generate a new session token.
pub fn generate_session_token() -> String {
    let mut bytes = [0u8; TOKEN_BYTES];
    rand::rng().fill(&mut bytes);
    format!("{}{}", SESSION_TOKEN_PREFIX, URL_SAFE_NO_PAD.encode(bytes))
}

/// Hash a token for storage using SHA-256, hex encoded.
pub fn hash_token(token: &str) -> String {
    let digest = Sha256::digest(token.as_bytes());
    format!("{:x}", digest)
}

/// `Set-Cookie` value carrying a session token.
pub fn session_cookie(token: &str, max_age_seconds: i64, secure: bool) -> String {
    let mut cookie = format!(
        "{SESSION_COOKIE}={token}; Path=/; HttpOnly; SameSite=Lax; Max-Age={max_age_seconds}"
    );
    if secure {
        cookie.push_str("; Secure");
    }
    cookie
}

/// `Set-Cookie` value that clears the session cookie.
pub fn clear_session_cookie(secure: bool) -> String {
    session_cookie("", 0, secure)
}

/// A freshly issued session.
pub struct IssuedSession {
    pub token: String,
    pub session: SessionRecord,
    pub cookie: String,
}

/// Creates a session for `user_id` and returns the token to hand out.
pub async fn issue(
    state: &AppState,
    user_id: &UserId,
    ctx: &RequestContext,
) -> Result<IssuedSession, ApiError> {
    let ttl = Duration::days(state.auth().session_ttl_days);
    let token = generate_session_token();
    let expires_at = Utc::now() + ttl;

    let session = state
        .db()
        .session_store()
        .create(
            user_id,
            &hash_token(&token),
            expires_at,
            ctx.ip_address.as_deref(),
            ctx.user_agent.as_deref(),
        )
        .await
        .map_err(internal_db_error(&ctx.request_id, "Failed to create session"))?;

    tracing::info!(
        request_id = %ctx.request_id,
        user_id = %user_id,
        session_id = %session.id,
        "Session issued"
    );

    let cookie = session_cookie(&token, ttl.num_seconds(), state.auth().secure_cookies);
    Ok(IssuedSession {
        token,
        session,
        cookie,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_shape() {
        let token = generate_session_token();
        assert!(token.starts_with(SESSION_TOKEN_PREFIX));
        // 32 bytes -> 43 base64url chars without padding
        assert_eq!(token.len(), SESSION_TOKEN_PREFIX.len() + 43);
        assert_ne!(token, generate_session_token());
    }

    #[test]
    fn test_hash_is_stable_hex() {
        let hash = hash_token("hrd_st_example");
        assert_eq!(hash.len(), 64);
        assert_eq!(hash, hash_token("hrd_st_example"));
        assert!(hash.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_cookie_attributes() {
        let cookie = session_cookie("tok", 60, true);
        assert_eq!(
            cookie,
            "herd_session=tok; Path=/; HttpOnly; SameSite=Lax; Max-Age=60; Secure"
        );
        assert!(clear_session_cookie(false).contains("Max-Age=0"));
    }
}
