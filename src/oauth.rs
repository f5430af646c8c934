use oauth2::basic::{
    BasicErrorResponse, BasicRevocationErrorResponse, BasicTokenIntrospectionResponse,
    BasicTokenType,
};
use oauth2::reqwest::http_client;
use oauth2::{
    AuthType, AuthUrl, AuthorizationCode, Client, ClientId, ClientSecret, CsrfToken,
    ExtraTokenFields, RedirectUrl, RequestTokenError, Scope, StandardRevocableToken,
    StandardTokenResponse, TokenResponse, TokenUrl,
};
use serde::{Deserialize, Serialize};
use url::Url;

use crate::config::Config;
use crate::error::{Result, ToolError};
use crate::token::TokenRecord;

/// Non-standard fields QuickBooks returns alongside the token pair.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccountingTokenFields {
    /// Refresh token lifetime in seconds.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub x_refresh_token_expires_in: Option<u64>,
}

impl ExtraTokenFields for AccountingTokenFields {}

/// Token endpoint response including the provider's extra expiry field.
pub type AccountingTokenResponse = StandardTokenResponse<AccountingTokenFields, BasicTokenType>;

/// OAuth2 client wired for the accounting provider's endpoints.
pub type AccountingClient = Client<
    BasicErrorResponse,
    AccountingTokenResponse,
    BasicTokenType,
    BasicTokenIntrospectionResponse,
    StandardRevocableToken,
    BasicRevocationErrorResponse,
>;

/// Builds the protocol client from the configuration.
///
/// The provider expects the client secret in the POST body rather than in a
/// basic-auth header, hence [`AuthType::RequestBody`].
pub fn client(config: &Config) -> AccountingClient {
    AccountingClient::new(
        ClientId::new(config.client_id.clone()),
        Some(ClientSecret::new(config.client_secret.clone())),
        AuthUrl::from_url(config.auth_url.clone()),
        Some(TokenUrl::from_url(config.token_url.clone())),
    )
    .set_auth_type(AuthType::RequestBody)
    .set_redirect_uri(RedirectUrl::from_url(config.redirect_uri.clone()))
}

/// Builds the provider authorization URL together with a fresh CSRF state.
///
/// The caller must keep the returned [`CsrfToken`] as the pending session
/// state and check it against the callback's `state` parameter.
pub fn authorization_request(client: &AccountingClient, config: &Config) -> (Url, CsrfToken) {
    client
        .authorize_url(CsrfToken::new_random)
        .add_scope(Scope::new(config.scope.clone()))
        .url()
}

/// Exchanges an authorization code for a token pair and attaches the realm.
///
/// The exchange is a blocking server-to-server POST against the token
/// endpoint; nothing is persisted here.
pub fn exchange_code(
    client: &AccountingClient,
    code: String,
    realm_id: String,
) -> Result<TokenRecord> {
    let response = client
        .exchange_code(AuthorizationCode::new(code))
        .request(http_client)
        .map_err(|error| match &error {
            RequestTokenError::ServerResponse(response) => {
                ToolError::TokenExchange(response.to_string())
            }
            other => ToolError::TokenExchange(other.to_string()),
        })?;

    Ok(TokenRecord {
        access_token: response.access_token().secret().clone(),
        refresh_token: response
            .refresh_token()
            .map(|token| token.secret().clone())
            .unwrap_or_default(),
        realm_id,
        expires_in: response.expires_in().map(|duration| duration.as_secs()),
        x_refresh_token_expires_in: response.extra_fields().x_refresh_token_expires_in,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn authorization_request_carries_client_id_scope_and_state() {
        let config = Config::new("the-client", "the-secret");
        let client = client(&config);
        let (url, state) = authorization_request(&client, &config);

        let pairs: Vec<(String, String)> = url
            .query_pairs()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        assert!(pairs.contains(&("client_id".to_string(), "the-client".to_string())));
        assert!(pairs.contains(&("response_type".to_string(), "code".to_string())));
        assert!(pairs.contains(&(
            "scope".to_string(),
            "com.intuit.quickbooks.accounting".to_string()
        )));
        assert!(pairs.contains(&("state".to_string(), state.secret().clone())));
        assert!(url.as_str().starts_with(crate::config::DEFAULT_AUTH_URL));
    }

    #[test]
    fn fresh_states_are_unique() {
        let config = Config::new("id", "secret");
        let client = client(&config);
        let (_, first) = authorization_request(&client, &config);
        let (_, second) = authorization_request(&client, &config);
        assert_ne!(first.secret(), second.secret());
    }
}
