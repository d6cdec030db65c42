//! Where the per-client secret lives.
//!
//! The strategy is chosen once when a [`CsrfContext`](crate::CsrfContext) is
//! resolved. A cookie store never looks at the session and a session store
//! never looks at cookies.

use crate::cookie::{self, CookieOptions};
use crate::error::{CsrfError, Result};
use crate::request::{CsrfRequest, CsrfResponse, SessionData};
use std::collections::HashMap;

/// Default request key of the session object.
pub const DEFAULT_SESSION_KEY: &str = "session";

/// Session field holding the secret.
pub const SESSION_SECRET_FIELD: &str = "csrfSecret";

const SET_COOKIE: &str = "Set-Cookie";

/// Secret storage strategy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SecretStore {
    /// Secret stored in the server-side session found under `session_key`
    Session { session_key: String },
    /// Secret stored in a (possibly signed) cookie
    Cookie(CookieOptions),
}

impl SecretStore {
    /// Session-backed store reading the session under `session_key`
    pub fn session(session_key: impl Into<String>) -> Self {
        SecretStore::Session {
            session_key: session_key.into(),
        }
    }

    /// Cookie-backed store
    pub fn cookie(options: CookieOptions) -> Self {
        SecretStore::Cookie(options)
    }

    /// Whether the secret lives in a cookie
    pub fn is_cookie(&self) -> bool {
        matches!(self, SecretStore::Cookie(_))
    }

    /// Cookie options, `None` for session stores
    pub fn cookie_options(&self) -> Option<&CookieOptions> {
        match self {
            SecretStore::Cookie(options) => Some(options),
            SecretStore::Session { .. } => None,
        }
    }

    /// Check that the request carries the backing store this strategy needs.
    pub fn verify_configuration(&self, req: &dyn CsrfRequest) -> Result<()> {
        match self {
            SecretStore::Session { session_key } => {
                if req.session(session_key).is_none() {
                    return Err(CsrfError::NoSession(session_key.clone()));
                }
            }
            SecretStore::Cookie(options) => {
                cookie_jar(req, options)?;
                if options.signed && req.signing_secret().is_none() {
                    return Err(CsrfError::MissingSigningSecret);
                }
            }
        }
        Ok(())
    }

    /// Read the current secret. Empty values count as absent.
    pub fn read(&self, req: &dyn CsrfRequest) -> Result<Option<String>> {
        let secret = match self {
            SecretStore::Session { session_key } => req
                .session(session_key)
                .ok_or_else(|| CsrfError::NoSession(session_key.clone()))?
                .get(SESSION_SECRET_FIELD),
            SecretStore::Cookie(options) => cookie_jar(req, options)?.get(&options.key).cloned(),
        };

        Ok(secret.filter(|s| !s.is_empty()))
    }

    /// Persist `secret`.
    ///
    /// Session stores mutate the session in place. Cookie stores append a
    /// `Set-Cookie` header, keeping any cookies already set on the response.
    pub fn write(
        &self,
        req: &mut dyn CsrfRequest,
        res: &mut dyn CsrfResponse,
        secret: &str,
    ) -> Result<()> {
        match self {
            SecretStore::Session { session_key } => {
                let session = req
                    .session_mut(session_key)
                    .ok_or_else(|| CsrfError::NoSession(session_key.clone()))?;
                session.set(SESSION_SECRET_FIELD, secret.to_string());
            }
            SecretStore::Cookie(options) => {
                let value = if options.signed {
                    let signing_secret = req
                        .signing_secret()
                        .ok_or(CsrfError::MissingSigningSecret)?;
                    cookie::sign_cookie_value(secret, signing_secret)
                } else {
                    secret.to_string()
                };

                let header = cookie::serialize(&options.key, &value, options)?;
                res.append_header(SET_COOKIE, header);
            }
        }
        Ok(())
    }
}

impl Default for SecretStore {
    fn default() -> Self {
        SecretStore::session(DEFAULT_SESSION_KEY)
    }
}

fn cookie_jar<'a>(
    req: &'a dyn CsrfRequest,
    options: &CookieOptions,
) -> Result<&'a HashMap<String, String>> {
    let jar = if options.signed {
        req.signed_cookies()
    } else {
        req.cookies()
    };

    jar.ok_or(CsrfError::NoCookieJar)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::request::{MemoryRequest, MemoryResponse};

    #[test]
    fn test_session_read_write() {
        let store = SecretStore::default();
        let mut req = MemoryRequest::new("GET").with_session("session");
        let mut res = MemoryResponse::new();

        assert_eq!(store.read(&req).unwrap(), None);

        store.write(&mut req, &mut res, "s3cret").unwrap();
        assert_eq!(store.read(&req).unwrap().as_deref(), Some("s3cret"));
        assert_eq!(req.session_value("session", "csrfSecret"), Some("s3cret"));
        assert!(res.headers.is_empty());
    }

    #[test]
    fn test_custom_session_key() {
        let store = SecretStore::session("sess");
        let req = MemoryRequest::new("GET").with_session("session");

        assert!(matches!(store.read(&req), Err(CsrfError::NoSession(key)) if key == "sess"));
    }

    #[test]
    fn test_missing_session() {
        let store = SecretStore::default();
        let mut req = MemoryRequest::new("GET");
        let mut res = MemoryResponse::new();

        assert!(matches!(store.verify_configuration(&req), Err(CsrfError::NoSession(_))));
        assert!(matches!(store.read(&req), Err(CsrfError::NoSession(_))));
        assert!(matches!(
            store.write(&mut req, &mut res, "x"),
            Err(CsrfError::NoSession(_))
        ));
    }

    #[test]
    fn test_empty_session_value_is_absent() {
        let store = SecretStore::default();
        let mut data = HashMap::new();
        data.insert(SESSION_SECRET_FIELD.to_string(), String::new());
        let req = MemoryRequest::new("GET").with_session_data("session", data);

        assert_eq!(store.read(&req).unwrap(), None);
    }

    #[test]
    fn test_cookie_read_write() {
        let store = SecretStore::cookie(CookieOptions::default());
        let mut req = MemoryRequest::new("GET").with_cookie("_csrf", "from-cookie");
        let mut res = MemoryResponse::new();

        assert_eq!(store.read(&req).unwrap().as_deref(), Some("from-cookie"));

        store.write(&mut req, &mut res, "fresh").unwrap();
        assert_eq!(res.header_values("set-cookie"), vec!["_csrf=fresh; Path=/"]);
    }

    #[test]
    fn test_cookie_write_appends() {
        let store = SecretStore::cookie(CookieOptions::default().with_http_only(true));
        let mut req = MemoryRequest::new("GET").with_cookie_jar();
        let mut res = MemoryResponse::new();
        res.set_header("Set-Cookie", "sid=abc; Path=/".to_string());

        store.write(&mut req, &mut res, "fresh").unwrap();
        assert_eq!(
            res.header_values("Set-Cookie"),
            vec!["sid=abc; Path=/", "_csrf=fresh; Path=/; HttpOnly"]
        );
    }

    #[test]
    fn test_missing_cookie_jar() {
        let store = SecretStore::cookie(CookieOptions::default());
        let req = MemoryRequest::new("GET");

        assert!(matches!(store.verify_configuration(&req), Err(CsrfError::NoCookieJar)));
        assert!(matches!(store.read(&req), Err(CsrfError::NoCookieJar)));
    }

    #[test]
    fn test_cookie_store_ignores_session() {
        let store = SecretStore::cookie(CookieOptions::default());
        let mut data = HashMap::new();
        data.insert(SESSION_SECRET_FIELD.to_string(), "session-secret".to_string());

        let req = MemoryRequest::new("GET").with_session_data("session", data.clone());
        assert!(matches!(store.read(&req), Err(CsrfError::NoCookieJar)));

        let req = MemoryRequest::new("GET")
            .with_session_data("session", data)
            .with_cookie_jar();
        assert_eq!(store.read(&req).unwrap(), None);
    }

    #[test]
    fn test_signed_cookie_requires_signing_secret() {
        let store = SecretStore::cookie(CookieOptions::default().with_signed(true));
        let mut req = MemoryRequest::new("GET").with_cookie_jar();
        let mut res = MemoryResponse::new();

        assert!(matches!(
            store.verify_configuration(&req),
            Err(CsrfError::MissingSigningSecret)
        ));
        assert!(matches!(
            store.write(&mut req, &mut res, "x"),
            Err(CsrfError::MissingSigningSecret)
        ));
    }

    #[test]
    fn test_signed_cookie_round_trip() {
        let store = SecretStore::cookie(CookieOptions::default().with_signed(true));
        let mut req = MemoryRequest::new("GET")
            .with_cookie_jar()
            .with_signing_secret("keyboard cat");
        let mut res = MemoryResponse::new();

        store.write(&mut req, &mut res, "fresh").unwrap();
        let header = res.header("set-cookie").unwrap();
        assert!(header.starts_with("_csrf=s%3Afresh."));

        let next = MemoryRequest::new("POST")
            .with_signing_secret("keyboard cat")
            .with_cookies_from(&res);
        assert_eq!(store.read(&next).unwrap().as_deref(), Some("fresh"));
    }

    #[test]
    fn test_signed_cookie_reads_signed_jar_only() {
        let store = SecretStore::cookie(CookieOptions::default().with_signed(true));
        let req = MemoryRequest::new("GET")
            .with_cookie("_csrf", "unsigned")
            .with_signing_secret("k");

        assert_eq!(store.read(&req).unwrap(), None);
    }
}
