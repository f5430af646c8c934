use std::io::{Read, Write};
use std::net::{Shutdown, TcpListener, TcpStream};

use oauth2::CsrfToken;
use tracing::{debug, info, instrument, warn};
use url::Url;

use crate::config::Config;
use crate::error::{Result, ToolError};
use crate::oauth::{self, AccountingClient};
use crate::token::TokenStore;

const SUCCESS_HTML: &str =
    "<html><body><h1>Authorization successful</h1><p>You may close this tab.</p></body></html>";
const ERROR_HTML: &str = "<html><body><h1>Authorization failed</h1><p>Check the server log for details.</p></body></html>";
const NOT_FOUND_HTML: &str = "<html><body><h1>Not found</h1></body></html>";

/// Operator-driven HTTP listener completing the authorization-code flow.
///
/// Hosts `GET /` (redirect to the provider) and `GET /callback` (code
/// exchange plus token persistence). Connections are handled one at a time;
/// the single pending CSRF state lives in the accept loop, created on `/`
/// and consumed on `/callback`.
pub struct Authorizer {
    config: Config,
    client: AccountingClient,
    store: TokenStore,
}

/// Query parameters the provider attaches to the callback request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct CallbackQuery {
    code: Option<String>,
    state: Option<String>,
    realm_id: Option<String>,
    error: Option<String>,
    error_description: Option<String>,
}

impl CallbackQuery {
    fn from_url(url: &Url) -> Self {
        let mut query = Self::default();
        for (key, value) in url.query_pairs() {
            match key.as_ref() {
                "code" => query.code = Some(value.to_string()),
                "state" => query.state = Some(value.to_string()),
                "realmId" => query.realm_id = Some(value.to_string()),
                "error" => query.error = Some(value.to_string()),
                "error_description" => query.error_description = Some(value.to_string()),
                _ => {}
            }
        }
        query
    }
}

impl Authorizer {
    /// Creates the Authorizer over the given configuration and token store.
    pub fn new(config: Config, store: TokenStore) -> Self {
        let client = oauth::client(&config);
        Self {
            config,
            client,
            store,
        }
    }

    /// Binds the configured port and serves until the process is stopped.
    pub fn run(&self) -> Result<()> {
        let listener = TcpListener::bind(("0.0.0.0", self.config.port))?;
        info!(
            port = self.config.port,
            "authorization server listening; open http://localhost:{}/ to begin",
            self.config.port
        );
        self.serve(listener)
    }

    /// Serves the authorization flow on an already-bound listener.
    pub fn serve(&self, listener: TcpListener) -> Result<()> {
        let mut pending_state: Option<CsrfToken> = None;
        for stream in listener.incoming() {
            let mut stream = match stream {
                Ok(stream) => stream,
                Err(error) => {
                    warn!(%error, "failed to accept connection");
                    continue;
                }
            };
            if let Err(error) = self.handle_connection(&mut stream, &mut pending_state) {
                warn!(%error, "request handling failed");
            }
        }
        Ok(())
    }

    fn handle_connection(
        &self,
        stream: &mut TcpStream,
        pending_state: &mut Option<CsrfToken>,
    ) -> Result<()> {
        let target = read_request_target(stream)?;
        let url = Url::parse(&format!("http://localhost{target}"))?;
        match url.path() {
            "/" => self.begin(stream, pending_state),
            "/callback" => self.complete(stream, &url, pending_state),
            other => {
                debug!(path = other, "unknown path requested");
                respond(stream, "404 Not Found", NOT_FOUND_HTML)
            }
        }
    }

    /// Starts the flow: issues a fresh state and redirects to the provider.
    fn begin(&self, stream: &mut TcpStream, pending_state: &mut Option<CsrfToken>) -> Result<()> {
        let (authorize_url, state) = oauth::authorization_request(&self.client, &self.config);
        *pending_state = Some(state);
        info!("redirecting browser to the authorization endpoint");
        redirect(stream, &authorize_url)
    }

    /// Completes the flow: validates the callback and persists the token.
    #[instrument(level = "info", skip_all)]
    fn complete(
        &self,
        stream: &mut TcpStream,
        url: &Url,
        pending_state: &mut Option<CsrfToken>,
    ) -> Result<()> {
        let query = CallbackQuery::from_url(url);
        debug!(?query, "callback received");
        match self.finish_authorization(query, pending_state.take()) {
            Ok(realm_id) => {
                info!(%realm_id, path = %self.store.path().display(), "token saved");
                respond(stream, "200 OK", SUCCESS_HTML)
            }
            Err(error) => {
                warn!(%error, "authorization failed");
                respond(stream, "500 Internal Server Error", ERROR_HTML)
            }
        }
    }

    /// Validates the callback, exchanges the code, and saves the record.
    ///
    /// Every failure path returns before the store is touched; the file is
    /// only written after a fully successful exchange.
    fn finish_authorization(
        &self,
        query: CallbackQuery,
        pending_state: Option<CsrfToken>,
    ) -> Result<String> {
        if let Some(error) = query.error {
            let detail = query.error_description.unwrap_or_default();
            return Err(ToolError::TokenExchange(format!(
                "provider returned {error}: {detail}"
            )));
        }
        let code = query.code.ok_or(ToolError::MissingCallbackParam("code"))?;
        let state = query.state.ok_or(ToolError::MissingCallbackParam("state"))?;
        let realm_id = query
            .realm_id
            .ok_or(ToolError::MissingCallbackParam("realmId"))?;
        let expected = pending_state.ok_or(ToolError::StateMismatch)?;
        if state != *expected.secret() {
            return Err(ToolError::StateMismatch);
        }

        let record = oauth::exchange_code(&self.client, code, realm_id)?;
        self.store.save(&record)?;
        Ok(record.realm_id)
    }
}

/// Reads one request and returns the GET target (path plus query string).
fn read_request_target<R: Read>(stream: &mut R) -> Result<String> {
    let mut buffer = vec![0u8; 8192];
    let size = stream.read(&mut buffer)?;
    if size == 0 {
        return Err(ToolError::MalformedRequest("empty request".to_string()));
    }

    let request = String::from_utf8_lossy(&buffer[..size]);
    let first_line = request
        .lines()
        .next()
        .ok_or_else(|| ToolError::MalformedRequest("missing request line".to_string()))?;
    let mut parts = first_line.split_whitespace();
    let method = parts.next().unwrap_or_default();
    let target = parts.next().unwrap_or_default();
    if method != "GET" || target.is_empty() {
        return Err(ToolError::MalformedRequest(format!(
            "expected a GET request line, got '{first_line}'"
        )));
    }
    Ok(target.to_string())
}

fn respond(stream: &mut TcpStream, status: &str, body: &str) -> Result<()> {
    let response = format!(
        "HTTP/1.1 {status}\r\nContent-Type: text/html; charset=utf-8\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
        body.len()
    );
    stream.write_all(response.as_bytes())?;
    let _ = stream.shutdown(Shutdown::Both);
    Ok(())
}

fn redirect(stream: &mut TcpStream, location: &Url) -> Result<()> {
    let response = format!(
        "HTTP/1.1 302 Found\r\nLocation: {location}\r\nContent-Length: 0\r\nConnection: close\r\n\r\n"
    );
    stream.write_all(response.as_bytes())?;
    let _ = stream.shutdown(Shutdown::Both);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn authorizer(dir: &std::path::Path) -> Authorizer {
        let config = Config::new("id", "secret");
        let store = TokenStore::new(dir.join("token.json"));
        Authorizer::new(config, store)
    }

    #[test]
    fn read_request_target_extracts_path_and_query() {
        let mut request = "GET /callback?code=abc&state=xyz HTTP/1.1\r\nHost: localhost\r\n\r\n"
            .as_bytes();
        let target = read_request_target(&mut request).expect("target");
        assert_eq!(target, "/callback?code=abc&state=xyz");
    }

    #[test]
    fn read_request_target_rejects_non_get() {
        let mut request = "POST /callback HTTP/1.1\r\n\r\n".as_bytes();
        let error = read_request_target(&mut request).expect_err("should fail");
        assert!(matches!(error, ToolError::MalformedRequest(_)));
    }

    #[test]
    fn read_request_target_rejects_empty_request() {
        let mut request = "".as_bytes();
        assert!(read_request_target(&mut request).is_err());
    }

    #[test]
    fn callback_query_parses_provider_parameters() {
        let url = Url::parse("http://localhost/callback?code=abc&state=xyz&realmId=1234")
            .expect("url");
        let query = CallbackQuery::from_url(&url);
        assert_eq!(query.code.as_deref(), Some("abc"));
        assert_eq!(query.state.as_deref(), Some("xyz"));
        assert_eq!(query.realm_id.as_deref(), Some("1234"));
        assert!(query.error.is_none());
    }

    #[test]
    fn state_mismatch_fails_without_writing_a_token() {
        let dir = tempdir().expect("temporary directory");
        let authorizer = authorizer(dir.path());
        let query = CallbackQuery {
            code: Some("abc".to_string()),
            state: Some("returned".to_string()),
            realm_id: Some("1234".to_string()),
            ..CallbackQuery::default()
        };
        let pending = Some(CsrfToken::new("expected".to_string()));
        let error = authorizer
            .finish_authorization(query, pending)
            .expect_err("mismatch should fail");
        assert!(matches!(error, ToolError::StateMismatch));
        assert!(!authorizer.store.path().exists());
    }

    #[test]
    fn callback_without_pending_state_is_rejected() {
        let dir = tempdir().expect("temporary directory");
        let authorizer = authorizer(dir.path());
        let query = CallbackQuery {
            code: Some("abc".to_string()),
            state: Some("xyz".to_string()),
            realm_id: Some("1234".to_string()),
            ..CallbackQuery::default()
        };
        let error = authorizer
            .finish_authorization(query, None)
            .expect_err("should fail");
        assert!(matches!(error, ToolError::StateMismatch));
        assert!(!authorizer.store.path().exists());
    }

    #[test]
    fn missing_code_is_rejected_before_any_exchange() {
        let dir = tempdir().expect("temporary directory");
        let authorizer = authorizer(dir.path());
        let query = CallbackQuery {
            state: Some("xyz".to_string()),
            realm_id: Some("1234".to_string()),
            ..CallbackQuery::default()
        };
        let error = authorizer
            .finish_authorization(query, Some(CsrfToken::new("xyz".to_string())))
            .expect_err("should fail");
        assert!(matches!(error, ToolError::MissingCallbackParam("code")));
        assert!(!authorizer.store.path().exists());
    }

    #[test]
    fn provider_error_is_treated_as_failed_exchange() {
        let dir = tempdir().expect("temporary directory");
        let authorizer = authorizer(dir.path());
        let query = CallbackQuery {
            error: Some("access_denied".to_string()),
            error_description: Some("user declined".to_string()),
            ..CallbackQuery::default()
        };
        let error = authorizer
            .finish_authorization(query, None)
            .expect_err("should fail");
        assert!(matches!(error, ToolError::TokenExchange(_)));
        assert!(!authorizer.store.path().exists());
    }
}
