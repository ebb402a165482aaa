//! OAuth2 authorization-code exchange and refresh for calendar providers.
//!
//! Token *storage* is the `ConnectionRepository`'s job (encrypted at rest);
//! this module only talks to the provider's token endpoint.

use chronarc_core::ports::calendar_provider::TokenRefreshResult;
use chronarc_domain::{ChronarcError, Result};
use oauth2::basic::BasicClient;
use oauth2::{
    AuthorizationCode, ClientId, ClientSecret, RefreshToken, RedirectUrl, TokenResponse, TokenUrl,
};

/// Minimal OAuth2 client for a single provider's token endpoint.
///
/// Authorization-URL construction and the PKCE/loopback login dance are out
/// of scope here: this system stores and refreshes provider credentials, it
/// doesn't drive an interactive consent screen.
pub struct OAuthTokenClient {
    client: BasicClient,
    http: reqwest::Client,
}

impl OAuthTokenClient {
    /// # Errors
    /// Returns an error if `token_url` or `redirect_uri` is not a valid URL.
    pub fn new(
        client_id: String,
        client_secret: String,
        token_url: &str,
        redirect_uri: &str,
    ) -> Result<Self> {
        let token_url = TokenUrl::new(token_url.to_string())
            .map_err(|e| ChronarcError::invalid_request(format!("invalid token url: {e}")))?;
        let redirect_url = RedirectUrl::new(redirect_uri.to_string())
            .map_err(|e| ChronarcError::invalid_request(format!("invalid redirect uri: {e}")))?;

        let client = BasicClient::new(ClientId::new(client_id))
            .set_client_secret(ClientSecret::new(client_secret))
            .set_token_uri(token_url)
            .set_redirect_uri(redirect_url);

        Ok(Self { client, http: reqwest::Client::new() })
    }

    /// Exchange an authorization code for an access/refresh token pair.
    ///
    /// # Errors
    /// Returns an error if the exchange request fails or the provider
    /// rejects the code.
    pub async fn exchange_code(&self, code: &str) -> Result<(String, String, i64)> {
        let response = self
            .client
            .exchange_code(AuthorizationCode::new(code.to_string()))
            .request_async(&self.http)
            .await
            .map_err(|e| ChronarcError::ReauthRequired(format!("token exchange failed: {e}")))?;

        let access_token = response.access_token().secret().clone();
        let refresh_token = response
            .refresh_token()
            .map(|rt| rt.secret().clone())
            .ok_or_else(|| ChronarcError::ReauthRequired("provider did not return a refresh token".into()))?;
        let expires_in = response.expires_in().map(|d| d.as_secs() as i64).unwrap_or(3600);

        Ok((access_token, refresh_token, expires_in))
    }

    /// Use a refresh token to obtain a fresh access token.
    ///
    /// # Errors
    /// Returns [`ChronarcError::ReauthRequired`] if the refresh token itself
    /// has been revoked, otherwise a generic error for transport failures.
    pub async fn refresh(&self, refresh_token: &str) -> Result<TokenRefreshResult> {
        let response = self
            .client
            .exchange_refresh_token(&RefreshToken::new(refresh_token.to_string()))
            .request_async(&self.http)
            .await
            .map_err(|e| ChronarcError::ReauthRequired(format!("token refresh failed: {e}")))?;

        let access_token = response.access_token().secret().clone();
        let refresh_token =
            response.refresh_token().map(|rt| rt.secret().clone()).unwrap_or_else(|| refresh_token.to_string());
        let expires_in_secs = response.expires_in().map(|d| d.as_secs() as i64).unwrap_or(3600);

        Ok(TokenRefreshResult { access_token, refresh_token, expires_in_secs })
    }
}
