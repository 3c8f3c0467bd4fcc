use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use time::Duration;

/// Cookie carrying the session token.
pub const TOKEN_COOKIE: &str = "token";

/// Cookie Max-Age in seconds (1 hour).
pub const TOKEN_COOKIE_MAX_AGE: i64 = 3600;

pub fn set_token_cookie(jar: CookieJar, token: String, secure: bool) -> CookieJar {
    let cookie = Cookie::build((TOKEN_COOKIE, token))
        .path("/")
        .max_age(Duration::seconds(TOKEN_COOKIE_MAX_AGE))
        .http_only(true)
        .secure(secure)
        .same_site(SameSite::Lax)
        .build();
    jar.add(cookie)
}

pub fn clear_token_cookie(jar: CookieJar, secure: bool) -> CookieJar {
    let cookie = Cookie::build((TOKEN_COOKIE, ""))
        .path("/")
        .max_age(Duration::ZERO)
        .http_only(true)
        .secure(secure)
        .same_site(SameSite::Lax)
        .build();
    jar.add(cookie)
}
