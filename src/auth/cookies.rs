//! `accessToken` / `refreshToken` cookies and bearer-header extraction.

use std::time::Duration;

use axum::http::{
    header::{AUTHORIZATION, COOKIE, SET_COOKIE},
    HeaderMap, HeaderValue,
};

use tracing::error;

use super::jwt::{JwtKeys, TokenPair};

pub const ACCESS_COOKIE: &str = "accessToken";
pub const REFRESH_COOKIE: &str = "refreshToken";

fn attributes(secure: bool) -> &'static str {
    // Browsers drop SameSite=None cookies that are not Secure.
    if secure {
        "Path=/; HttpOnly; SameSite=None; Secure"
    } else {
        "Path=/; HttpOnly; SameSite=Lax"
    }
}

fn cookie(name: &str, value: &str, max_age: Duration, secure: bool) -> Option<HeaderValue> {
    let raw = format!(
        "{name}={value}; {}; Max-Age={}",
        attributes(secure),
        max_age.as_secs()
    );
    match HeaderValue::from_str(&raw) {
        Ok(v) => Some(v),
        Err(e) => {
            error!(error = %e, cookie = name, "failed to build session cookie");
            None
        }
    }
}

/// `Set-Cookie` headers carrying both tokens of a session.
pub fn session_cookies(keys: &JwtKeys, tokens: &TokenPair, secure: bool) -> HeaderMap {
    let mut headers = HeaderMap::new();
    let pairs = [
        (ACCESS_COOKIE, tokens.access_token.as_str(), keys.access_ttl()),
        (REFRESH_COOKIE, tokens.refresh_token.as_str(), keys.refresh_ttl()),
    ];
    for (name, value, ttl) in pairs {
        if let Some(v) = cookie(name, value, ttl, secure) {
            headers.append(SET_COOKIE, v);
        }
    }
    headers
}

/// `Set-Cookie` headers expiring both session cookies.
pub fn cleared_cookies(secure: bool) -> HeaderMap {
    let mut headers = HeaderMap::new();
    for name in [ACCESS_COOKIE, REFRESH_COOKIE] {
        if let Some(v) = cookie(name, "", Duration::ZERO, secure) {
            headers.append(SET_COOKIE, v);
        }
    }
    headers
}

pub fn read_cookie(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|h| h.to_str().ok())
        .flat_map(|h| h.split(';'))
        .filter_map(|pair| {
            let (key, val) = pair.trim().split_once('=')?;
            (key.trim() == name).then(|| val.trim().to_string())
        })
        .find(|v| !v.is_empty())
}

pub fn bearer_token(headers: &HeaderMap) -> Option<String> {
    let value = headers.get(AUTHORIZATION)?.to_str().ok()?;
    let trimmed = value.trim();
    let token = trimmed
        .strip_prefix("Bearer ")
        .or_else(|| trimmed.strip_prefix("bearer "))?
        .trim();
    if token.is_empty() {
        None
    } else {
        Some(token.to_string())
    }
}

/// Access token from `Authorization: Bearer`, falling back to the `accessToken` cookie.
pub fn access_token(headers: &HeaderMap) -> Option<String> {
    bearer_token(headers).or_else(|| read_cookie(headers, ACCESS_COOKIE))
}
