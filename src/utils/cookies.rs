use axum_extra::extract::cookie::{Cookie, SameSite};
use chrono::{Duration, Utc};
use cookie::time::OffsetDateTime;

pub const REFRESH_COOKIE_NAME: &str = "refresh_token";

pub fn refresh_cookie(refresh_token: String, ttl_days: i64, secure: bool) -> Cookie<'static> {
    let expiration_time = Utc::now() + Duration::days(ttl_days);
    let expiration_time = OffsetDateTime::from_unix_timestamp(expiration_time.timestamp())
        .unwrap_or(OffsetDateTime::UNIX_EPOCH);

    Cookie::build((REFRESH_COOKIE_NAME, refresh_token))
        .path("/")
        .same_site(SameSite::Lax)
        .secure(secure)
        .http_only(true)
        .expires(expiration_time)
        .build()
}

pub fn clear_refresh_cookie(secure: bool) -> Cookie<'static> {
    Cookie::build((REFRESH_COOKIE_NAME, String::new()))
        .path("/")
        .same_site(SameSite::Lax)
        .secure(secure)
        .http_only(true)
        .expires(OffsetDateTime::UNIX_EPOCH)
        .build()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn refresh_cookie_is_http_only_and_scoped_to_root() {
        let cookie = refresh_cookie("token".into(), 30, true);
        assert_eq!(cookie.name(), REFRESH_COOKIE_NAME);
        assert_eq!(cookie.path(), Some("/"));
        assert_eq!(cookie.http_only(), Some(true));
        assert_eq!(cookie.secure(), Some(true));
    }

    #[test]
    fn clearing_expires_the_cookie_in_the_past() {
        let cookie = clear_refresh_cookie(false);
        assert_eq!(cookie.value(), "");
        assert_eq!(
            cookie.expires().and_then(|e| e.datetime()),
            Some(OffsetDateTime::UNIX_EPOCH)
        );
    }
}
