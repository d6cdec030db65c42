//! Cookie options, `Set-Cookie` serialization and value signing.

use crate::compare::constant_time_eq;
use crate::error::{CsrfError, Result};
use base64::{engine::general_purpose::STANDARD_NO_PAD, Engine};
use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use percent_encoding::{percent_decode_str, utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use serde::{Deserialize, Serialize};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

/// Characters left as-is by JavaScript's `encodeURIComponent`.
const COMPONENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'!')
    .remove(b'~')
    .remove(b'*')
    .remove(b'\'')
    .remove(b'(')
    .remove(b')');

/// Default name of the cookie that carries the secret.
pub const DEFAULT_COOKIE_NAME: &str = "_csrf";

/// Default cookie path.
pub const DEFAULT_COOKIE_PATH: &str = "/";

/// Prefix marking a signed cookie value.
pub const SIGNED_PREFIX: &str = "s:";

/// Cookie SameSite attribute
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SameSite {
    Strict,
    Lax,
    None,
}

impl SameSite {
    pub fn as_str(&self) -> &'static str {
        match self {
            SameSite::Strict => "Strict",
            SameSite::Lax => "Lax",
            SameSite::None => "None",
        }
    }
}

/// Options for the cookie that stores the CSRF secret.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CookieOptions {
    /// Cookie name
    pub key: String,

    /// Cookie path
    pub path: Option<String>,

    /// Cookie domain
    pub domain: Option<String>,

    /// Max-Age in seconds
    pub max_age: Option<i64>,

    /// Absolute expiry
    pub expires: Option<DateTime<Utc>>,

    /// Cookie HttpOnly flag
    pub http_only: bool,

    /// Cookie secure flag (HTTPS only)
    pub secure: bool,

    /// Cookie SameSite policy
    pub same_site: Option<SameSite>,

    /// Cookie Partitioned flag
    pub partitioned: bool,

    /// Sign the value with the request's cookie signing secret
    pub signed: bool,
}

impl Default for CookieOptions {
    fn default() -> Self {
        Self {
            key: DEFAULT_COOKIE_NAME.to_string(),
            path: Some(DEFAULT_COOKIE_PATH.to_string()),
            domain: None,
            max_age: None,
            expires: None,
            http_only: false,
            secure: false,
            same_site: None,
            partitioned: false,
            signed: false,
        }
    }
}

/// Partial cookie options. Set fields replace the defaults, unset fields inherit.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CookieOverrides {
    pub key: Option<String>,
    pub path: Option<String>,
    pub domain: Option<String>,
    pub max_age: Option<i64>,
    pub expires: Option<DateTime<Utc>>,
    pub http_only: Option<bool>,
    pub secure: Option<bool>,
    pub same_site: Option<SameSite>,
    pub partitioned: Option<bool>,
    pub signed: Option<bool>,
}

impl CookieOptions {
    /// Overlay the set fields of `overrides` onto these options.
    pub fn merged(&self, overrides: &CookieOverrides) -> Self {
        let mut opts = self.clone();

        if let Some(ref key) = overrides.key {
            opts.key = key.clone();
        }
        if let Some(ref path) = overrides.path {
            opts.path = Some(path.clone());
        }
        if let Some(ref domain) = overrides.domain {
            opts.domain = Some(domain.clone());
        }
        if overrides.max_age.is_some() {
            opts.max_age = overrides.max_age;
        }
        if overrides.expires.is_some() {
            opts.expires = overrides.expires;
        }
        if let Some(http_only) = overrides.http_only {
            opts.http_only = http_only;
        }
        if let Some(secure) = overrides.secure {
            opts.secure = secure;
        }
        if overrides.same_site.is_some() {
            opts.same_site = overrides.same_site;
        }
        if let Some(partitioned) = overrides.partitioned {
            opts.partitioned = partitioned;
        }
        if let Some(signed) = overrides.signed {
            opts.signed = signed;
        }

        opts
    }

    /// Set cookie name
    pub fn with_key(mut self, key: impl Into<String>) -> Self {
        self.key = key.into();
        self
    }

    /// Set cookie path
    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.path = Some(path.into());
        self
    }

    /// Set cookie domain
    pub fn with_domain(mut self, domain: impl Into<String>) -> Self {
        self.domain = Some(domain.into());
        self
    }

    /// Set cookie Max-Age
    pub fn with_max_age(mut self, seconds: i64) -> Self {
        self.max_age = Some(seconds);
        self
    }

    /// Set cookie expiry
    pub fn with_expires(mut self, expires: DateTime<Utc>) -> Self {
        self.expires = Some(expires);
        self
    }

    /// Set cookie HttpOnly flag
    pub fn with_http_only(mut self, http_only: bool) -> Self {
        self.http_only = http_only;
        self
    }

    /// Set cookie secure flag
    pub fn with_secure(mut self, secure: bool) -> Self {
        self.secure = secure;
        self
    }

    /// Set cookie SameSite policy
    pub fn with_same_site(mut self, same_site: SameSite) -> Self {
        self.same_site = Some(same_site);
        self
    }

    /// Set cookie Partitioned flag
    pub fn with_partitioned(mut self, partitioned: bool) -> Self {
        self.partitioned = partitioned;
        self
    }

    /// Store the value signed
    pub fn with_signed(mut self, signed: bool) -> Self {
        self.signed = signed;
        self
    }
}

/// Serialize a `Set-Cookie` header value.
pub fn serialize(name: &str, value: &str, options: &CookieOptions) -> Result<String> {
    if name.is_empty() || !name.bytes().all(is_token_byte) {
        return Err(CsrfError::InvalidOption(format!(
            "invalid cookie name: {:?}",
            name
        )));
    }

    let mut cookie = format!("{}={}", name, encode_value(value));

    if let Some(max_age) = options.max_age {
        cookie.push_str(&format!("; Max-Age={}", max_age));
    }

    if let Some(ref domain) = options.domain {
        check_attribute("domain", domain)?;
        cookie.push_str(&format!("; Domain={}", domain));
    }

    if let Some(ref path) = options.path {
        check_attribute("path", path)?;
        cookie.push_str(&format!("; Path={}", path));
    }

    if let Some(expires) = options.expires {
        cookie.push_str(&format!(
            "; Expires={}",
            expires.format("%a, %d %b %Y %H:%M:%S GMT")
        ));
    }

    if options.http_only {
        cookie.push_str("; HttpOnly");
    }

    if options.secure {
        cookie.push_str("; Secure");
    }

    if options.partitioned {
        cookie.push_str("; Partitioned");
    }

    if let Some(same_site) = options.same_site {
        cookie.push_str(&format!("; SameSite={}", same_site.as_str()));
    }

    Ok(cookie)
}

/// Sign `value` as `value.signature` (HMAC-SHA256, base64 without padding).
pub fn sign(value: &str, secret: &str) -> String {
    format!("{}.{}", value, signature(value, secret))
}

/// Reverse of [`sign`]. Returns `None` when the signature does not match.
pub fn unsign(signed: &str, secret: &str) -> Option<String> {
    let (value, _) = signed.rsplit_once('.')?;
    let expected = sign(value, secret);

    constant_time_eq(expected.as_bytes(), signed.as_bytes()).then(|| value.to_string())
}

/// Build the stored form of a signed cookie value: `s:` + [`sign`].
pub fn sign_cookie_value(value: &str, secret: &str) -> String {
    format!("{}{}", SIGNED_PREFIX, sign(value, secret))
}

/// Unwrap a stored signed cookie value. Values without the `s:` prefix are rejected.
pub fn unsign_cookie_value(raw: &str, secret: &str) -> Option<String> {
    raw.strip_prefix(SIGNED_PREFIX)
        .and_then(|signed| unsign(signed, secret))
}

/// Extract `(name, value)` from a `Set-Cookie` header value, percent-decoding the value.
pub fn parse_set_cookie(header: &str) -> Option<(String, String)> {
    let pair = header.split(';').next()?;
    let (name, value) = pair.split_once('=')?;
    let name = name.trim();

    if name.is_empty() {
        return None;
    }

    Some((name.to_string(), decode_value(value.trim())))
}

fn signature(value: &str, secret: &str) -> String {
    let mut mac = match HmacSha256::new_from_slice(secret.as_bytes()) {
        Ok(mac) => mac,
        Err(_) => return String::new(),
    };
    mac.update(value.as_bytes());
    STANDARD_NO_PAD.encode(mac.finalize().into_bytes())
}

/// RFC 7230 token characters
fn is_token_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b"!#$%&'*+-.^_`|~".contains(&b)
}

fn encode_value(value: &str) -> String {
    utf8_percent_encode(value, COMPONENT).to_string()
}

/// Invalid escapes stay as literal text.
fn decode_value(value: &str) -> String {
    percent_decode_str(value).decode_utf8_lossy().into_owned()
}

/// Path and domain values must not break out of their attribute.
fn check_attribute(attribute: &str, value: &str) -> Result<()> {
    if value.chars().any(|c| c == ';' || (c.is_control() && c != '\t')) {
        return Err(CsrfError::InvalidOption(format!(
            "invalid cookie {}: {:?}",
            attribute, value
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_default_options() {
        let opts = CookieOptions::default();
        assert_eq!(opts.key, "_csrf");
        assert_eq!(opts.path.as_deref(), Some("/"));
        assert!(!opts.signed);
    }

    #[test]
    fn test_merged_overrides() {
        let overrides = CookieOverrides {
            key: Some("xsrf".to_string()),
            signed: Some(true),
            same_site: Some(SameSite::Lax),
            ..Default::default()
        };

        let opts = CookieOptions::default().merged(&overrides);
        assert_eq!(opts.key, "xsrf");
        assert_eq!(opts.path.as_deref(), Some("/"));
        assert!(opts.signed);
        assert_eq!(opts.same_site, Some(SameSite::Lax));
    }

    #[test]
    fn test_serialize_attributes() {
        let opts = CookieOptions::default()
            .with_domain("example.com")
            .with_max_age(3600)
            .with_expires(Utc.with_ymd_and_hms(2030, 1, 2, 3, 4, 5).unwrap())
            .with_http_only(true)
            .with_secure(true)
            .with_same_site(SameSite::Strict);

        let cookie = serialize("_csrf", "abc", &opts).unwrap();
        assert_eq!(
            cookie,
            "_csrf=abc; Max-Age=3600; Domain=example.com; Path=/; \
             Expires=Wed, 02 Jan 2030 03:04:05 GMT; HttpOnly; Secure; SameSite=Strict"
        );
    }

    #[test]
    fn test_serialize_encodes_value() {
        let cookie = serialize("_csrf", "s:a+b/c", &CookieOptions::default()).unwrap();
        assert_eq!(cookie, "_csrf=s%3Aa%2Bb%2Fc; Path=/");
    }

    #[test]
    fn test_serialize_rejects_bad_name() {
        assert!(serialize("bad name", "v", &CookieOptions::default()).is_err());
        assert!(serialize("", "v", &CookieOptions::default()).is_err());
    }

    #[test]
    fn test_sign_known_value() {
        assert_eq!(
            sign("hello", "keyboard cat"),
            "hello.xz6khi6+oL1pnNhBgjk3Nr1CX2sxTjJiO9pKXaHZ33E"
        );
    }

    #[test]
    fn test_unsign() {
        let signed = sign("value", "secret");
        assert_eq!(unsign(&signed, "secret").as_deref(), Some("value"));
        assert_eq!(unsign(&signed, "other"), None);
        assert_eq!(unsign("value", "secret"), None);
        assert_eq!(unsign(&format!("{}x", signed), "secret"), None);
    }

    #[test]
    fn test_signed_cookie_value() {
        let raw = sign_cookie_value("value", "secret");
        assert!(raw.starts_with("s:"));
        assert_eq!(unsign_cookie_value(&raw, "secret").as_deref(), Some("value"));
        assert_eq!(unsign_cookie_value("value.sig", "secret"), None);
    }

    #[test]
    fn test_parse_set_cookie() {
        let header = serialize("_csrf", "s:a+b", &CookieOptions::default()).unwrap();
        assert_eq!(
            parse_set_cookie(&header),
            Some(("_csrf".to_string(), "s:a+b".to_string()))
        );
        assert_eq!(parse_set_cookie("novalue"), None);
    }

    #[test]
    fn test_parse_set_cookie_invalid_escape_kept() {
        assert_eq!(
            parse_set_cookie("_csrf=%+1abc; Path=/"),
            Some(("_csrf".to_string(), "%+1abc".to_string()))
        );
        assert_eq!(
            parse_set_cookie("_csrf=abc%; Path=/"),
            Some(("_csrf".to_string(), "abc%".to_string()))
        );
    }

    #[test]
    fn test_parse_set_cookie_trailing_escape() {
        assert_eq!(
            parse_set_cookie("_csrf=a%2Fb%2F"),
            Some(("_csrf".to_string(), "a/b/".to_string()))
        );
    }

    #[test]
    fn test_serialize_rejects_unsafe_attributes() {
        let injected = [
            CookieOptions::default().with_path("/; Secure"),
            CookieOptions::default().with_path("/\r\nSet-Cookie: x=y"),
            CookieOptions::default().with_domain("example.com; HttpOnly"),
            CookieOptions::default().with_domain("example.com\n"),
        ];

        for opts in injected {
            assert!(matches!(
                serialize("_csrf", "v", &opts),
                Err(CsrfError::InvalidOption(_))
            ));
        }

        let cookie = serialize("_csrf", "v", &CookieOptions::default().with_path("/app")).unwrap();
        assert_eq!(cookie, "_csrf=v; Path=/app");
    }
}
