//! The JumpServer session: transport plus authentication.

use reqwest::Method;
use serde::Serialize;
use tracing::info;

use crate::auth::{Auth, AuthMode, HttpSigner};
use crate::config::{CredentialSource, ProviderConfig};
use crate::error::Result;
use crate::transport::{ApiResponse, HttpTransport};

/// An authenticated JumpServer session.
///
/// Built once when the provider is configured and never mutated afterwards,
/// so it can be shared freely between concurrent operations.
#[derive(Debug, Clone)]
pub struct JumpServerClient {
    transport: HttpTransport,
    auth: Auth,
}

impl JumpServerClient {
    /// Build a session from provider configuration, logging in if needed.
    pub async fn connect(config: &ProviderConfig) -> Result<Self> {
        let transport = HttpTransport::new(config.base_url()?, config.skip_tls_verify())?;

        let auth = match config.credentials()? {
            CredentialSource::Token(token) => Auth::Token(token),
            CredentialSource::KeyPair {
                access_key,
                secret_key,
            } => Auth::Signed(HttpSigner::new(access_key, secret_key)?),
            CredentialSource::Login { username, password } => {
                Auth::login(&transport, &username, &password).await?
            },
        };

        info!(base_url = transport.base_url(), mode = ?auth.mode(), "JumpServer session ready");
        Ok(Self { transport, auth })
    }

    /// Assemble a session from parts.
    pub fn new(transport: HttpTransport, auth: Auth) -> Self {
        Self { transport, auth }
    }

    /// The active credential mode.
    pub fn auth_mode(&self) -> AuthMode {
        self.auth.mode()
    }

    /// The underlying transport.
    pub fn transport(&self) -> &HttpTransport {
        &self.transport
    }

    /// Send one authenticated request with an optional JSON body.
    pub async fn send<B>(&self, method: Method, path: &str, body: Option<&B>) -> Result<ApiResponse>
    where
        B: Serialize + ?Sized,
    {
        let mut request = self.transport.request(method.clone(), path);
        if let Some(body) = body {
            request = request.json(body);
        }
        let request = self
            .auth
            .authorize(request, &method, &self.transport.request_target(path))?;
        self.transport.execute(&method, path, request).await
    }

    /// `GET` a path.
    pub async fn get(&self, path: &str) -> Result<ApiResponse> {
        self.send::<()>(Method::GET, path, None).await
    }

    /// `POST` a JSON body.
    pub async fn post<B: Serialize + ?Sized>(&self, path: &str, body: &B) -> Result<ApiResponse> {
        self.send(Method::POST, path, Some(body)).await
    }

    /// `PUT` a JSON body.
    pub async fn put<B: Serialize + ?Sized>(&self, path: &str, body: &B) -> Result<ApiResponse> {
        self.send(Method::PUT, path, Some(body)).await
    }

    /// `DELETE` a path.
    pub async fn delete(&self, path: &str) -> Result<ApiResponse> {
        self.send::<()>(Method::DELETE, path, None).await
    }
}
