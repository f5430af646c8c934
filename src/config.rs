use std::env;

use url::Url;

use crate::error::{Result, ToolError};

/// Authorization endpoint the browser is redirected to.
pub const DEFAULT_AUTH_URL: &str = "https://appcenter.intuit.com/connect/oauth2";
/// Token endpoint used for the server-to-server code exchange.
pub const DEFAULT_TOKEN_URL: &str = "https://oauth.platform.intuit.com/oauth2/v1/tokens/bearer";
/// Base URL of the accounting API the Extractor reads from.
pub const DEFAULT_API_BASE_URL: &str = "https://quickbooks.api.intuit.com";
/// OAuth2 scope granting read access to the accounting data set.
pub const DEFAULT_SCOPE: &str = "com.intuit.quickbooks.accounting";
/// Redirect URI registered with the provider for local runs.
pub const DEFAULT_REDIRECT_URI: &str = "http://localhost:8000/callback";
/// Port the authorization listener binds when `PORT` is unset.
pub const DEFAULT_PORT: u16 = 8000;

/// Runtime configuration shared by the Authorizer and the Extractor.
///
/// Required fields are constructor parameters; endpoints default to the
/// QuickBooks production URLs and can be overridden via chaining, which keeps
/// tests independent of the environment:
///
/// ```rust,ignore
/// use qbo_tools::config::Config;
///
/// let config = Config::new("client-id", "client-secret")
///     .with_api_base_url("http://127.0.0.1:9090".parse()?);
/// ```
#[derive(Debug, Clone)]
pub struct Config {
    pub client_id: String,
    pub client_secret: String,
    pub redirect_uri: Url,
    pub port: u16,
    pub auth_url: Url,
    pub token_url: Url,
    pub api_base_url: Url,
    pub scope: String,
}

impl Config {
    /// Creates a configuration with the default provider endpoints.
    #[must_use]
    pub fn new(client_id: impl Into<String>, client_secret: impl Into<String>) -> Self {
        Self {
            client_id: client_id.into(),
            client_secret: client_secret.into(),
            redirect_uri: DEFAULT_REDIRECT_URI.parse().expect("valid default URL"),
            port: DEFAULT_PORT,
            auth_url: DEFAULT_AUTH_URL.parse().expect("valid default URL"),
            token_url: DEFAULT_TOKEN_URL.parse().expect("valid default URL"),
            api_base_url: DEFAULT_API_BASE_URL.parse().expect("valid default URL"),
            scope: DEFAULT_SCOPE.to_string(),
        }
    }

    /// Reads the configuration from the environment.
    ///
    /// `CLIENT_ID` and `CLIENT_SECRET` are required; `REDIRECT_URI` and
    /// `PORT` fall back to the localhost defaults when unset.
    pub fn from_env() -> Result<Self> {
        let mut config = Self::new(require("CLIENT_ID")?, require("CLIENT_SECRET")?);
        if let Ok(value) = env::var("REDIRECT_URI") {
            config.redirect_uri = Url::parse(&value)?;
        }
        if let Ok(value) = env::var("PORT") {
            config.port = value
                .parse()
                .map_err(|_| ToolError::InvalidConfig { name: "PORT", value })?;
        }
        Ok(config)
    }

    /// Overrides the redirect URI registered with the provider.
    #[must_use]
    pub fn with_redirect_uri(mut self, url: Url) -> Self {
        self.redirect_uri = url;
        self
    }

    /// Overrides the listener port.
    #[must_use]
    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    /// Overrides the authorization endpoint.
    #[must_use]
    pub fn with_auth_url(mut self, url: Url) -> Self {
        self.auth_url = url;
        self
    }

    /// Overrides the token exchange endpoint.
    #[must_use]
    pub fn with_token_url(mut self, url: Url) -> Self {
        self.token_url = url;
        self
    }

    /// Overrides the accounting API base URL.
    #[must_use]
    pub fn with_api_base_url(mut self, url: Url) -> Self {
        self.api_base_url = url;
        self
    }

    /// Overrides the requested OAuth2 scope.
    #[must_use]
    pub fn with_scope(mut self, scope: impl Into<String>) -> Self {
        self.scope = scope.into();
        self
    }
}

fn require(name: &'static str) -> Result<String> {
    env::var(name).map_err(|_| ToolError::MissingConfig(name))
}
