//! Signed session cookies
//!
//! The cookie value is `{student_id}.{expires_unix}.{signature}` where the
//! signature is the hex HMAC-SHA256 of `"{student_id}.{expires_unix}"`
//! keyed with the session secret. Nothing is stored server-side.

use axum::http::{header, HeaderMap};
use hmac::{Hmac, Mac};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

/// Session lifetime: 14 days
pub const SESSION_LIFETIME_SECS: i64 = 14 * 24 * 60 * 60;

/// Default cookie name
pub const DEFAULT_COOKIE_NAME: &str = "learning_platform_session";

/// `SameSite` cookie attribute
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SameSite {
    Lax,
    Strict,
    None,
}

impl SameSite {
    /// Parse a configured value; anything unrecognized is `Lax`
    pub fn parse(value: &str) -> Self {
        match value.trim().to_lowercase().as_str() {
            "strict" => SameSite::Strict,
            "none" => SameSite::None,
            _ => SameSite::Lax,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            SameSite::Lax => "Lax",
            SameSite::Strict => "Strict",
            SameSite::None => "None",
        }
    }
}

/// Cookie signing secret and attributes
#[derive(Clone)]
pub struct SessionConfig {
    secret: String,
    pub cookie_name: String,
    pub same_site: SameSite,
    pub secure: bool,
}

impl std::fmt::Debug for SessionConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionConfig")
            .field("cookie_name", &self.cookie_name)
            .field("same_site", &self.same_site)
            .field("secure", &self.secure)
            .finish_non_exhaustive()
    }
}

impl SessionConfig {
    pub fn new(secret: String, cookie_name: String, same_site: SameSite, secure: bool) -> Self {
        Self {
            secret,
            cookie_name,
            same_site,
            secure,
        }
    }

    /// MAC over the signed part of a token; HMAC accepts keys of any length
    fn mac(&self, student_id: i64, expires: i64) -> Option<HmacSha256> {
        let mut mac = HmacSha256::new_from_slice(self.secret.as_bytes()).ok()?;
        mac.update(format!("{}.{}", student_id, expires).as_bytes());
        Some(mac)
    }

    /// Token for `student_id` valid until `now + SESSION_LIFETIME_SECS`
    pub fn issue(&self, student_id: i64, now: i64) -> String {
        let expires = now + SESSION_LIFETIME_SECS;
        let signature = self
            .mac(student_id, expires)
            .map(|mac| hex::encode(mac.finalize().into_bytes()))
            .unwrap_or_default();
        format!("{}.{}.{}", student_id, expires, signature)
    }

    /// Student id carried by a valid, unexpired token
    pub fn verify(&self, token: &str, now: i64) -> Option<i64> {
        let mut parts = token.splitn(3, '.');
        let student_id: i64 = parts.next()?.parse().ok()?;
        let expires: i64 = parts.next()?.parse().ok()?;
        let signature = hex::decode(parts.next()?).ok()?;

        self.mac(student_id, expires)?.verify_slice(&signature).ok()?;
        if expires <= now {
            return None;
        }
        Some(student_id)
    }

    /// Session token from the request's `Cookie` headers
    pub fn read_token<'a>(&self, headers: &'a HeaderMap) -> Option<&'a str> {
        headers
            .get_all(header::COOKIE)
            .iter()
            .filter_map(|value| value.to_str().ok())
            .flat_map(|value| value.split(';'))
            .filter_map(|pair| pair.trim().split_once('='))
            .find(|(name, _)| *name == self.cookie_name)
            .map(|(_, value)| value)
    }

    fn attributes(&self) -> String {
        let mut attrs = format!("Path=/; HttpOnly; SameSite={}", self.same_site.as_str());
        if self.secure {
            attrs.push_str("; Secure");
        }
        attrs
    }

    /// `Set-Cookie` value starting a session
    pub fn login_cookie(&self, student_id: i64, now: i64) -> String {
        format!(
            "{}={}; Max-Age={}; {}",
            self.cookie_name,
            self.issue(student_id, now),
            SESSION_LIFETIME_SECS,
            self.attributes()
        )
    }

    /// `Set-Cookie` value ending a session
    pub fn logout_cookie(&self) -> String {
        format!("{}=; Max-Age=0; {}", self.cookie_name, self.attributes())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    const NOW: i64 = 1_700_000_000;

    fn config() -> SessionConfig {
        SessionConfig::new(
            "test-secret".to_string(),
            DEFAULT_COOKIE_NAME.to_string(),
            SameSite::Lax,
            false,
        )
    }

    #[test]
    fn test_issue_and_verify() {
        let cfg = config();
        let token = cfg.issue(42, NOW);
        assert_eq!(cfg.verify(&token, NOW), Some(42));
        assert_eq!(cfg.verify(&token, NOW + SESSION_LIFETIME_SECS - 1), Some(42));
    }

    #[test]
    fn test_expired_token_rejected() {
        let cfg = config();
        let token = cfg.issue(42, NOW);
        assert_eq!(cfg.verify(&token, NOW + SESSION_LIFETIME_SECS), None);
    }

    #[test]
    fn test_tampered_token_rejected() {
        let cfg = config();
        let token = cfg.issue(42, NOW);
        let forged = token.replacen("42.", "43.", 1);
        assert_eq!(cfg.verify(&forged, NOW), None);

        let other = SessionConfig::new(
            "other-secret".to_string(),
            DEFAULT_COOKIE_NAME.to_string(),
            SameSite::Lax,
            false,
        );
        assert_eq!(other.verify(&token, NOW), None);
    }

    #[test]
    fn test_signature_is_hmac_of_id_and_expiry() {
        let cfg = config();
        let token = cfg.issue(42, NOW);
        let expires = NOW + SESSION_LIFETIME_SECS;

        let mut mac = HmacSha256::new_from_slice(b"test-secret").unwrap();
        mac.update(format!("42.{}", expires).as_bytes());
        let expected = hex::encode(mac.finalize().into_bytes());
        assert_eq!(token, format!("42.{}.{}", expires, expected));

        // Plain digest of message and secret is not accepted
        use sha2::Digest;
        let digest = Sha256::digest(format!("42.{}.test-secret", expires).as_bytes());
        let plain = format!("42.{}.{}", expires, hex::encode(digest));
        assert_eq!(cfg.verify(&plain, NOW), None);
    }

    #[test]
    fn test_malformed_tokens_rejected() {
        let cfg = config();
        for token in ["", "42", "42.abc.def", "x.1.sig", "42.99999999999", "42.99999999999.zz"] {
            assert_eq!(cfg.verify(token, NOW), None, "token {:?}", token);
        }
    }

    #[test]
    fn test_read_token_among_other_cookies() {
        let cfg = config();
        let mut headers = HeaderMap::new();
        headers.insert(
            header::COOKIE,
            HeaderValue::from_static("theme=dark; learning_platform_session=1.2.abc; lang=pl"),
        );
        assert_eq!(cfg.read_token(&headers), Some("1.2.abc"));

        let empty = HeaderMap::new();
        assert_eq!(cfg.read_token(&empty), None);
    }

    #[test]
    fn test_cookie_attributes() {
        let mut cfg = config();
        let cookie = cfg.login_cookie(7, NOW);
        assert!(cookie.starts_with("learning_platform_session=7."));
        assert!(cookie.contains("HttpOnly"));
        assert!(cookie.contains("SameSite=Lax"));
        assert!(!cookie.contains("Secure"));

        cfg.secure = true;
        cfg.same_site = SameSite::parse("STRICT");
        let cookie = cfg.logout_cookie();
        assert!(cookie.contains("Max-Age=0"));
        assert!(cookie.contains("SameSite=Strict"));
        assert!(cookie.ends_with("; Secure"));
    }

    #[test]
    fn test_same_site_parse() {
        assert_eq!(SameSite::parse("none"), SameSite::None);
        assert_eq!(SameSite::parse("bogus"), SameSite::Lax);
    }
}
