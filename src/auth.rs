//! Request authentication.
//!
//! A session authenticates in exactly one way, fixed when the provider is
//! configured:
//!
//! - **Token**: `Authorization: Bearer <token>` on every request. The token
//!   is either supplied directly or obtained once by logging in.
//! - **Signed**: every request carries `Date` and `Accept` headers plus an
//!   HTTP Signature (`hmac-sha256`) over `(request-target)` and `date`,
//!   keyed by the access/secret key pair.

use std::fmt;

use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use reqwest::{header, Method, RequestBuilder};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use tracing::{debug, instrument};

use crate::error::{ProviderError, Result};
use crate::transport::HttpTransport;

type HmacSha256 = Hmac<Sha256>;

/// Authentication endpoint for token login.
pub const AUTH_PATH: &str = "/api/v1/authentication/auth/";

/// The headers covered by a request signature, in signing order.
pub const SIGNED_HEADERS: &str = "(request-target) date";

/// RFC 1123 date in GMT, as required by the `Date` header.
const HTTP_DATE_FORMAT: &str = "%a, %d %b %Y %H:%M:%S GMT";

/// Which credential mode a session uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthMode {
    /// Bearer token.
    Token,
    /// HMAC-signed requests.
    Signed,
}

/// Per-session authentication, chosen once at configure time.
#[derive(Clone)]
pub enum Auth {
    /// Send a bearer token.
    Token(String),
    /// Sign each request.
    Signed(HttpSigner),
}

impl fmt::Debug for Auth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Token(_) => f.write_str("Token(<redacted>)"),
            Self::Signed(signer) => f.debug_tuple("Signed").field(signer).finish(),
        }
    }
}

impl Auth {
    /// The mode this session authenticates with.
    pub fn mode(&self) -> AuthMode {
        match self {
            Self::Token(_) => AuthMode::Token,
            Self::Signed(_) => AuthMode::Signed,
        }
    }

    /// Exchange username and password for a session token.
    #[instrument(skip(transport, password), fields(base_url = transport.base_url()))]
    pub async fn login(transport: &HttpTransport, username: &str, password: &str) -> Result<Self> {
        #[derive(Serialize)]
        struct Credentials<'a> {
            username: &'a str,
            password: &'a str,
        }

        #[derive(Deserialize)]
        struct TokenResponse {
            token: Option<String>,
        }

        let request = transport
            .request(Method::POST, AUTH_PATH)
            .json(&Credentials { username, password });
        let response = transport
            .execute(&Method::POST, AUTH_PATH, request)
            .await
            .map_err(|e| ProviderError::Auth(format!("token request failed: {}", e.message())))?;

        if !response.status.is_success() {
            return Err(ProviderError::Auth(format!(
                "token request to {} returned HTTP {}",
                AUTH_PATH, response.status
            )));
        }

        let body: TokenResponse = serde_json::from_str(&response.body)
            .map_err(|e| ProviderError::Auth(format!("unreadable token response: {}", e)))?;

        match body.token {
            Some(token) if !token.is_empty() => {
                debug!("obtained session token");
                Ok(Self::Token(token))
            },
            _ => Err(ProviderError::Auth(format!(
                "unable to fetch token from {}",
                AUTH_PATH
            ))),
        }
    }

    /// Attach credentials to an outgoing request.
    ///
    /// `request_target` is the path (and query) the request is sent to.
    pub fn authorize(
        &self,
        builder: RequestBuilder,
        method: &Method,
        request_target: &str,
    ) -> Result<RequestBuilder> {
        match self {
            Self::Token(token) => Ok(builder.bearer_auth(token)),
            Self::Signed(signer) => {
                let date = http_date(Utc::now());
                let authorization = signer.authorization(method, request_target, &date)?;
                Ok(builder
                    .header(header::DATE, date)
                    .header(header::ACCEPT, "application/json")
                    .header(header::AUTHORIZATION, authorization))
            },
        }
    }
}

/// Signs requests with an access/secret key pair (HTTP Signatures, `hmac-sha256`).
#[derive(Clone)]
pub struct HttpSigner {
    access_key: String,
    secret_key: String,
}

impl fmt::Debug for HttpSigner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HttpSigner")
            .field("access_key", &self.access_key)
            .field("secret_key", &"<redacted>")
            .finish()
    }
}

impl HttpSigner {
    /// Create a signer, rejecting keys that cannot form a valid signature header.
    pub fn new(access_key: impl Into<String>, secret_key: impl Into<String>) -> Result<Self> {
        let access_key = access_key.into();
        let secret_key = secret_key.into();

        if access_key.is_empty() || secret_key.is_empty() {
            return Err(ProviderError::Auth(
                "access key and secret key must both be non-empty".to_string(),
            ));
        }
        // keyId is emitted as a quoted string
        if access_key.contains('"') || access_key.chars().any(char::is_control) {
            return Err(ProviderError::Auth(
                "access key contains characters not allowed in a signature header".to_string(),
            ));
        }

        Ok(Self {
            access_key,
            secret_key,
        })
    }

    /// The access key id.
    pub fn access_key(&self) -> &str {
        &self.access_key
    }

    /// The canonical string covered by the signature.
    pub fn signing_string(method: &Method, request_target: &str, date: &str) -> String {
        format!(
            "(request-target): {} {}\ndate: {}",
            method.as_str().to_lowercase(),
            request_target,
            date
        )
    }

    /// Base64 HMAC-SHA256 of the signing string.
    pub fn signature(&self, method: &Method, request_target: &str, date: &str) -> Result<String> {
        let mut mac = HmacSha256::new_from_slice(self.secret_key.as_bytes())
            .map_err(|e| ProviderError::Auth(format!("invalid secret key: {}", e)))?;
        mac.update(Self::signing_string(method, request_target, date).as_bytes());
        Ok(BASE64.encode(mac.finalize().into_bytes()))
    }

    /// The full `Authorization` header value.
    pub fn authorization(&self, method: &Method, request_target: &str, date: &str) -> Result<String> {
        let signature = self.signature(method, request_target, date)?;
        Ok(format!(
            "Signature keyId=\"{}\",algorithm=\"hmac-sha256\",headers=\"{}\",signature=\"{}\"",
            self.access_key, SIGNED_HEADERS, signature
        ))
    }
}

/// Format a timestamp for the `Date` header.
pub fn http_date(at: DateTime<Utc>) -> String {
    at.format(HTTP_DATE_FORMAT).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_http_date_format() {
        let at = Utc.with_ymd_and_hms(2024, 3, 5, 7, 8, 9).unwrap();
        assert_eq!(http_date(at), "Tue, 05 Mar 2024 07:08:09 GMT");
    }

    #[test]
    fn test_signing_string() {
        let s = HttpSigner::signing_string(
            &Method::GET,
            "/api/v1/users/users/?limit=1",
            "Tue, 05 Mar 2024 07:08:09 GMT",
        );
        assert_eq!(
            s,
            "(request-target): get /api/v1/users/users/?limit=1\ndate: Tue, 05 Mar 2024 07:08:09 GMT"
        );
    }

    #[test]
    fn test_signature_matches_independent_hmac() {
        let signer = HttpSigner::new("ak-1", "sk-1").unwrap();
        let date = "Tue, 05 Mar 2024 07:08:09 GMT";
        let target = "/api/v1/assets/hosts/";

        let mut mac = HmacSha256::new_from_slice(b"sk-1").unwrap();
        mac.update(format!("(request-target): post {}\ndate: {}", target, date).as_bytes());
        let expected = BASE64.encode(mac.finalize().into_bytes());

        assert_eq!(signer.signature(&Method::POST, target, date).unwrap(), expected);
    }

    #[test]
    fn test_signature_depends_on_inputs() {
        let signer = HttpSigner::new("ak", "sk").unwrap();
        let date = "Tue, 05 Mar 2024 07:08:09 GMT";
        let get = signer.signature(&Method::GET, "/a/", date).unwrap();
        let delete = signer.signature(&Method::DELETE, "/a/", date).unwrap();
        let other_path = signer.signature(&Method::GET, "/b/", date).unwrap();
        assert_ne!(get, delete);
        assert_ne!(get, other_path);
    }

    #[test]
    fn test_authorization_header_layout() {
        let signer = HttpSigner::new("ak-1", "sk-1").unwrap();
        let header = signer
            .authorization(&Method::GET, "/x/", "Tue, 05 Mar 2024 07:08:09 GMT")
            .unwrap();
        assert!(header.starts_with("Signature keyId=\"ak-1\",algorithm=\"hmac-sha256\","));
        assert!(header.contains("headers=\"(request-target) date\""));
        assert!(header.contains(",signature=\""));
    }

    #[test]
    fn test_malformed_keys_rejected() {
        assert!(matches!(HttpSigner::new("", "sk"), Err(ProviderError::Auth(_))));
        assert!(matches!(HttpSigner::new("ak", ""), Err(ProviderError::Auth(_))));
        assert!(matches!(HttpSigner::new("a\"k", "sk"), Err(ProviderError::Auth(_))));
    }

    #[test]
    fn test_debug_redacts() {
        let auth = Auth::Token("secret-token".to_string());
        assert_eq!(format!("{:?}", auth), "Token(<redacted>)");
        assert_eq!(auth.mode(), AuthMode::Token);

        let signed = Auth::Signed(HttpSigner::new("ak", "very-secret").unwrap());
        let rendered = format!("{:?}", signed);
        assert!(!rendered.contains("very-secret"));
        assert_eq!(signed.mode(), AuthMode::Signed);
    }
}
