//! OAuth 2.0 for the Google Sheets API.
//!
//! `TokenProvider::initialize` runs the consent flow once: it prints the Google consent URL,
//! waits for the redirect on a local callback server, exchanges the code and stores the tokens
//! in `token.json`. Afterwards `TokenProvider::load` picks up the stored tokens and refreshes the
//! access token when it is about to expire. Only `initialize` ever needs a browser.

use crate::api::files::{File, SecretFile, TokenFile, REDIRECT};
use crate::api::OAUTH_SCOPES;
use crate::error::Res;
use crate::utils;
use anyhow::{bail, ensure, Context};
use chrono::Utc;
use hyper::body::Incoming;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Request, Response, StatusCode};
use hyper_util::rt::TokioIo;
use oauth2::basic::BasicClient;
use oauth2::{
    AuthUrl, AuthorizationCode, ClientId, ClientSecret, CsrfToken, EndpointNotSet, EndpointSet,
    PkceCodeChallenge, RedirectUrl, RefreshToken, Scope, TokenResponse, TokenUrl,
};
use std::convert::Infallible;
use std::path::PathBuf;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

const OAUTH_CALLBACK_PORT: u16 = 3030;
const CALLBACK_TIMEOUT: Duration = Duration::from_secs(300);
/// Used when Google does not tell us how long an access token lives.
const DEFAULT_TOKEN_LIFETIME: Duration = Duration::from_secs(3600);

/// A `BasicClient` with its authorization and token endpoints set.
type GoogleClient = BasicClient<EndpointSet, EndpointNotSet, EndpointNotSet, EndpointNotSet, EndpointSet>;

/// Provides a valid access token for the Sheets API, refreshing it and persisting the refreshed
/// token to `token.json` as needed.
#[derive(Debug, Clone)]
pub(crate) struct TokenProvider {
    secret: SecretFile,
    token: File<TokenFile>,
}

impl TokenProvider {
    /// Runs the interactive consent flow and saves the resulting tokens to `token_path`.
    pub(crate) async fn initialize(
        secret_path: impl Into<PathBuf>,
        token_path: impl Into<PathBuf>,
    ) -> Res<Self> {
        let secret = load_secret(secret_path.into()).await?;
        let redirect = format!("{REDIRECT}:{OAUTH_CALLBACK_PORT}");
        let client = oauth_client(&secret)?.set_redirect_uri(
            RedirectUrl::new(redirect.clone()).context("Invalid OAuth redirect URI")?,
        );

        let (pkce_challenge, pkce_verifier) = PkceCodeChallenge::new_random_sha256();
        let (auth_url, csrf_token) = client
            .authorize_url(CsrfToken::new_random)
            .add_scopes(OAUTH_SCOPES.iter().map(|s| Scope::new(s.to_string())))
            .add_extra_param("access_type", "offline")
            .add_extra_param("prompt", "consent")
            .set_pkce_challenge(pkce_challenge)
            .url();

        let listener = TcpListener::bind(("127.0.0.1", OAUTH_CALLBACK_PORT))
            .await
            .with_context(|| format!("Unable to listen on {redirect} for the OAuth callback"))?;
        info!("Open this URL in your browser to authorize the accountant:\n\n{auth_url}\n");
        info!("Waiting for the OAuth callback on {redirect}");

        let callback = tokio::time::timeout(CALLBACK_TIMEOUT, accept_callback(listener))
            .await
            .context("Timed out waiting for the OAuth callback")??;
        ensure!(
            callback.state == *csrf_token.secret(),
            "The OAuth callback state does not match, refusing to continue"
        );

        let response = client
            .exchange_code(AuthorizationCode::new(callback.code))
            .set_pkce_verifier(pkce_verifier)
            .request_async(&http_client()?)
            .await
            .context("Failed to exchange the authorization code for tokens")?;

        let refresh_token = response
            .refresh_token()
            .context("Google did not return a refresh token")?
            .secret()
            .to_string();
        let scopes = match response.scopes() {
            Some(scopes) => scopes.iter().map(|s| s.to_string()).collect(),
            None => OAUTH_SCOPES.iter().map(|s| s.to_string()).collect(),
        };
        let token = TokenFile::new(
            scopes,
            response.access_token().secret().to_string(),
            refresh_token,
            expires_at(response.expires_in()),
        );
        token.validate_scopes()?;
        let token = File::new(token_path, token);
        token.save().await?;
        info!("Authorization successful, tokens saved");
        Ok(Self { secret, token })
    }

    /// Loads existing tokens. Never opens a browser.
    pub(crate) async fn load(
        secret_path: impl Into<PathBuf>,
        token_path: impl Into<PathBuf>,
    ) -> Res<Self> {
        let secret = load_secret(secret_path.into()).await?;
        let token: File<TokenFile> = File::load(token_path)
            .await
            .context("Unable to load the OAuth token, run 'accountant auth' first")?;
        token.data().validate_scopes()?;
        Ok(Self { secret, token })
    }

    /// The current access token, which may be expired.
    pub(crate) fn token(&self) -> &str {
        self.token.data().access_token()
    }

    /// The current access token, refreshed first if it is expired or about to expire.
    pub(crate) async fn token_with_refresh(&mut self) -> Res<String> {
        if self.token.data().is_expired() {
            self.refresh().await?;
        }
        Ok(self.token().to_string())
    }

    /// Exchanges the refresh token for a new access token and saves it.
    pub(crate) async fn refresh(&mut self) -> Res<()> {
        debug!("Refreshing the OAuth access token");
        let refresh_token = RefreshToken::new(self.token.data().refresh_token().to_string());
        let response = oauth_client(&self.secret)?
            .exchange_refresh_token(&refresh_token)
            .request_async(&http_client()?)
            .await
            .context("Failed to refresh the OAuth access token")?;
        self.token.data_mut().update(
            response.access_token().secret().to_string(),
            expires_at(response.expires_in()),
            response.refresh_token().map(|t| t.secret().to_string()),
        );
        self.token.save().await
    }
}

async fn load_secret(path: PathBuf) -> Res<SecretFile> {
    utils::deserialize(&path)
        .await
        .context("Unable to read the OAuth client secret file")
}

fn oauth_client(secret: &SecretFile) -> Res<GoogleClient> {
    Ok(BasicClient::new(ClientId::new(secret.client_id().to_string()))
        .set_client_secret(ClientSecret::new(secret.client_secret().to_string()))
        .set_auth_uri(AuthUrl::new(secret.auth_uri().to_string()).context("Invalid auth_uri")?)
        .set_token_uri(
            TokenUrl::new(secret.token_uri().to_string()).context("Invalid token_uri")?,
        ))
}

/// The oauth2 crate recommends disabling redirects to prevent SSRF.
fn http_client() -> Res<reqwest::Client> {
    reqwest::ClientBuilder::new()
        .redirect(reqwest::redirect::Policy::none())
        .build()
        .context("Unable to build the HTTP client")
}

fn expires_at(expires_in: Option<Duration>) -> chrono::DateTime<Utc> {
    let lifetime = expires_in.unwrap_or(DEFAULT_TOKEN_LIFETIME);
    Utc::now() + chrono::Duration::from_std(lifetime).unwrap_or(chrono::Duration::zero())
}

/// The query parameters Google sends to the redirect URI.
#[derive(Debug, Clone, Eq, PartialEq)]
struct Callback {
    code: String,
    state: String,
}

impl Callback {
    fn from_query(query: &str) -> Res<Self> {
        let mut code = None;
        let mut state = None;
        for (key, value) in url::form_urlencoded::parse(query.as_bytes()) {
            match key.as_ref() {
                "code" => code = Some(value.into_owned()),
                "state" => state = Some(value.into_owned()),
                "error" => bail!("Google refused the authorization: {value}"),
                _ => {}
            }
        }
        Ok(Self {
            code: code.context("The OAuth callback has no code")?,
            state: state.context("The OAuth callback has no state")?,
        })
    }
}

/// Serves the callback URL until a request carrying the authorization code arrives.
async fn accept_callback(listener: TcpListener) -> Res<Callback> {
    let (tx, mut rx) = mpsc::channel::<Res<Callback>>(1);
    loop {
        tokio::select! {
            received = rx.recv() => {
                return received.context("The OAuth callback server stopped unexpectedly")?;
            }
            accepted = listener.accept() => {
                let (stream, _) = accepted.context("Unable to accept the OAuth callback")?;
                let tx = tx.clone();
                let service = service_fn(move |req: Request<Incoming>| {
                    let tx = tx.clone();
                    async move {
                        let query = req.uri().query().unwrap_or_default().to_string();
                        if req.uri().path() != "/" || query.is_empty() {
                            let mut response = Response::new(String::from("Not found"));
                            *response.status_mut() = StatusCode::NOT_FOUND;
                            return Ok::<_, Infallible>(response);
                        }
                        let callback = Callback::from_query(&query);
                        let body = match &callback {
                            Ok(_) => "Authorization complete. You can close this window.".to_string(),
                            Err(e) => format!("Authorization failed: {e}"),
                        };
                        let _ = tx.send(callback).await;
                        Ok(Response::new(body))
                    }
                });
                tokio::spawn(async move {
                    if let Err(e) = http1::Builder::new()
                        .serve_connection(TokioIo::new(stream), service)
                        .await
                    {
                        warn!("OAuth callback connection error: {e}");
                    }
                });
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_callback_from_query() {
        let callback = Callback::from_query("state=abc&code=4%2F0Adeu&scope=x").unwrap();
        assert_eq!(
            callback,
            Callback {
                code: "4/0Adeu".to_string(),
                state: "abc".to_string(),
            }
        );
    }

    #[test]
    fn test_callback_from_query_error() {
        let err = Callback::from_query("error=access_denied&state=abc").unwrap_err();
        assert!(err.to_string().contains("access_denied"));
        assert!(Callback::from_query("state=abc").is_err());
    }

    #[test]
    fn test_expires_at_defaults_to_an_hour() {
        let at = expires_at(None);
        let delta = at - Utc::now();
        assert!(delta > chrono::Duration::minutes(59));
        assert!(delta <= chrono::Duration::minutes(60));
    }
}
