//! Sign-in, sign-out and token refresh
//!
//! These are the only calls that write to the [`TokenStore`]; everything
//! else only reads the access token.

use marknote_core::{JwtResponse, LoginRequest, RegisterRequest, Result};
use tracing::{info, warn};

use crate::api::ApiClient;
use crate::token_store::{mask_token, Credentials};
use crate::transport::ApiRequest;

/// Authentication endpoints
#[derive(Debug, Clone)]
pub struct AuthApi {
    api: ApiClient,
}

impl AuthApi {
    pub fn new(api: ApiClient) -> Self {
        Self { api }
    }

    /// Sign in and remember the returned credentials
    pub async fn login(&self, request: &LoginRequest) -> Result<JwtResponse> {
        let jwt: JwtResponse = self
            .api
            .fetch(ApiRequest::post("/auth/login").json(serde_json::to_value(request)?))
            .await?;
        self.remember(&jwt)?;
        info!("Logged in as {}", request.username);
        Ok(jwt)
    }

    /// Create an account and remember the returned credentials
    pub async fn register(&self, request: &RegisterRequest) -> Result<JwtResponse> {
        let jwt: JwtResponse = self
            .api
            .fetch(ApiRequest::post("/auth/register").json(serde_json::to_value(request)?))
            .await?;
        self.remember(&jwt)?;
        info!("Registered {}", request.username);
        Ok(jwt)
    }

    /// Sign out; local credentials are cleared even if the call fails
    pub async fn logout(&self) -> Result<()> {
        if self.api.tokens().is_authenticated() {
            if let Err(e) = self.api.execute(ApiRequest::post("/auth/logout")).await {
                warn!("Logout request failed: {}", e);
            }
        }
        self.api.tokens().clear()?;
        info!("Logged out");
        Ok(())
    }

    /// Exchange the refresh token for a new access token
    ///
    /// Signs out and returns `None` when there is no refresh token or the
    /// exchange fails.
    pub async fn refresh_access_token(&self) -> Result<Option<String>> {
        let Some(refresh_token) = self.api.tokens().refresh_token() else {
            warn!("No refresh token stored");
            self.logout().await?;
            return Ok(None);
        };

        let request = ApiRequest::post("/auth/refresh").query("refreshToken", refresh_token);
        match self.api.fetch::<JwtResponse>(request).await {
            Ok(jwt) => {
                info!("Refreshed access token {}", mask_token(&jwt.access_token));
                self.api.tokens().set_access_token(jwt.access_token.clone())?;
                Ok(Some(jwt.access_token))
            }
            Err(e) => {
                warn!("Token refresh failed: {}", e);
                self.logout().await?;
                Ok(None)
            }
        }
    }

    fn remember(&self, jwt: &JwtResponse) -> Result<()> {
        self.api.tokens().store(Credentials::from(jwt))
    }
}
