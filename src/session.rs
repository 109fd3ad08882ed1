use axum::http::header::{HeaderMap, SET_COOKIE};
use axum::http::HeaderValue;
use axum::response::Response;

/// Cookie carrying the opaque session token. The token is just a key into
/// the `sessions` table; everything session-scoped (cart lines, the logged-in
/// user) lives server-side.
pub const SESSION_COOKIE: &str = "salone_session";

const SESSION_MAX_AGE_SECS: u64 = 7 * 24 * 60 * 60;

/// A session token for the current request, plus whether it was newly
/// minted (and therefore still has to be sent back via Set-Cookie).
pub struct SessionHandle {
    pub token: String,
    pub issued: bool,
}

pub fn token_from_headers(headers: &HeaderMap) -> Option<String> {
    let cookies = headers.get("cookie")?.to_str().ok()?;
    cookies.split(';').find_map(|pair| {
        let (name, value) = pair.trim().split_once('=')?;
        if name == SESSION_COOKIE && !value.is_empty() {
            Some(value.to_string())
        } else {
            None
        }
    })
}

/// Reuse the caller's token or mint a fresh one.
pub fn ensure(headers: &HeaderMap) -> SessionHandle {
    match token_from_headers(headers) {
        Some(token) => SessionHandle {
            token,
            issued: false,
        },
        None => SessionHandle {
            token: uuid::Uuid::new_v4().to_string(),
            issued: true,
        },
    }
}

/// Attach the Set-Cookie header when the token was issued on this request.
pub fn attach_cookie(mut response: Response, session: &SessionHandle) -> Response {
    if session.issued {
        let cookie = format!(
            "{SESSION_COOKIE}={}; Path=/; HttpOnly; SameSite=Lax; Max-Age={SESSION_MAX_AGE_SECS}",
            session.token
        );
        if let Ok(value) = HeaderValue::from_str(&cookie) {
            response.headers_mut().append(SET_COOKIE, value);
        }
    }
    response
}
