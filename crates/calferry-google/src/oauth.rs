//! Browser-based sign-in for installed applications.
//!
//! Google only issues calendar tokens through the Authorization Code flow,
//! so the importer runs it the installed-app way: a PKCE challenge
//! (RFC 7636), a short-lived HTTP listener on localhost for the redirect,
//! and a `state` nonce checked against the redirect to reject forged
//! callbacks.

use std::io::{BufRead, BufReader, Write};
use std::net::{TcpListener, TcpStream};
use std::sync::mpsc;
use std::thread;
use std::time::Duration;

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use rand::Rng as _;
use sha2::{Digest, Sha256};
use tracing::{debug, info, warn};

use crate::credentials::{LoopbackConfig, OAuthCredentials};
use crate::error::{GcalError, GcalResult};
use crate::tokens::TokenInfo;

const GOOGLE_AUTH_URL: &str = "https://accounts.google.com/o/oauth2/v2/auth";
const GOOGLE_TOKEN_URL: &str = "https://oauth2.googleapis.com/token";

/// Entropy, in bytes, behind the PKCE verifier and the `state` nonce.
const VERIFIER_BYTES: usize = 32;
const STATE_BYTES: usize = 16;

const CONSENT_GRANTED_PAGE: &str = "HTTP/1.1 200 OK\r\nContent-Type: text/html\r\n\r\n\
    <html><body><h1>Signed in</h1>\
    <p>calferry has calendar access now. You can close this tab and return \
    to the terminal.</p></body></html>";

const CONSENT_FAILED_PAGE: &str = "HTTP/1.1 400 Bad Request\r\nContent-Type: text/html\r\n\r\n\
    <html><body><h1>Sign-in failed</h1>\
    <p>No authorization was granted. You can close this tab.</p></body></html>";

/// Client for Google's OAuth token endpoint.
#[derive(Debug)]
pub struct OAuthClient {
    credentials: OAuthCredentials,
    http_client: reqwest::Client,
}

impl OAuthClient {
    pub fn new(credentials: OAuthCredentials, timeout: Duration) -> Self {
        let http_client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .expect("failed to create HTTP client");

        Self {
            credentials,
            http_client,
        }
    }

    /// Walks the user through the browser consent flow and returns the
    /// resulting token set.
    pub async fn authorize(
        &self,
        scopes: &[String],
        loopback: &LoopbackConfig,
    ) -> GcalResult<TokenInfo> {
        let server = LoopbackServer::bind(loopback.port_range)?;
        let redirect_uri = server.redirect_uri();
        let consent = ConsentRequest::generate();
        let url = consent.consent_url(&self.credentials.client_id, &redirect_uri, scopes);

        info!(port = server.port, "opening browser for consent");
        if let Err(e) = open::that(&url) {
            warn!("could not open a browser: {}", e);
            eprintln!("\nOpen this URL to sign in:\n\n{}\n", url);
        }

        let code = server.await_authorization(&consent.state, loopback.consent_timeout)?;
        info!("authorization granted, requesting tokens");

        let grant = self
            .token_endpoint(
                "token exchange",
                &[
                    ("client_id", self.credentials.client_id.as_str()),
                    ("client_secret", self.credentials.client_secret.as_str()),
                    ("code", &code),
                    ("code_verifier", &consent.verifier),
                    ("grant_type", "authorization_code"),
                    ("redirect_uri", &redirect_uri),
                ],
            )
            .await?;

        Ok(TokenInfo::new(
            grant.access_token,
            grant.refresh_token,
            grant.expires_in,
            scopes.to_vec(),
        ))
    }

    /// Trades a refresh token for a new access token and its lifetime in
    /// seconds.
    pub async fn refresh_token(&self, refresh_token: &str) -> GcalResult<(String, Option<i64>)> {
        let grant = self
            .token_endpoint(
                "token refresh",
                &[
                    ("client_id", self.credentials.client_id.as_str()),
                    ("client_secret", self.credentials.client_secret.as_str()),
                    ("refresh_token", refresh_token),
                    ("grant_type", "refresh_token"),
                ],
            )
            .await?;

        debug!("access token refreshed");
        Ok((grant.access_token, grant.expires_in))
    }

    /// POSTs a form to the token endpoint and decodes the grant.
    ///
    /// `what` labels the request in error messages, since the exchange and
    /// refresh grants fail for different user-visible reasons.
    async fn token_endpoint(&self, what: &str, form: &[(&str, &str)]) -> GcalResult<TokenGrant> {
        let response = self
            .http_client
            .post(GOOGLE_TOKEN_URL)
            .form(form)
            .send()
            .await
            .map_err(|e| GcalError::network(format!("{} request failed: {}", what, e)))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| GcalError::network(format!("{} response unreadable: {}", what, e)))?;

        if !status.is_success() {
            return Err(GcalError::authentication(format!(
                "{} rejected ({}): {}",
                what, status, body
            )));
        }

        serde_json::from_str(&body)
            .map_err(|e| GcalError::invalid_response(format!("malformed {} response: {}", what, e)))
    }
}

/// One-shot HTTP listener for the OAuth redirect.
///
/// Bound to 127.0.0.1 only; the port becomes part of the registered
/// redirect URI, so Google will only send the code here.
struct LoopbackServer {
    listener: TcpListener,
    port: u16,
}

impl LoopbackServer {
    fn bind((low, high): (u16, u16)) -> GcalResult<Self> {
        for port in low..=high {
            if let Ok(listener) = TcpListener::bind(("127.0.0.1", port)) {
                debug!(port, "redirect listener bound");
                return Ok(Self { listener, port });
            }
        }
        Err(GcalError::configuration(format!(
            "no free loopback port between {} and {}",
            low, high
        )))
    }

    fn redirect_uri(&self) -> String {
        format!("http://127.0.0.1:{}/callback", self.port)
    }

    /// Blocks until the browser hits the redirect URI, then checks the
    /// `state` nonce and returns the authorization code.
    fn await_authorization(self, expected_state: &str, timeout: Duration) -> GcalResult<String> {
        self.listener
            .set_nonblocking(false)
            .map_err(|e| GcalError::internal(format!("listener setup failed: {}", e)))?;

        // accept() has no timeout of its own, so a helper thread feeds the
        // redirect through a channel we can wait on with a deadline.
        let (tx, rx) = mpsc::channel();
        thread::spawn(move || {
            for stream in self.listener.incoming().flatten() {
                if let Some(params) = Self::answer_request(stream) {
                    let _ = tx.send(params);
                    break;
                }
            }
        });

        let params = match rx.recv_timeout(timeout) {
            Ok(params) => params,
            Err(mpsc::RecvTimeoutError::Timeout) => {
                return Err(GcalError::authentication(
                    "timed out waiting for browser sign-in",
                ));
            }
            Err(mpsc::RecvTimeoutError::Disconnected) => {
                return Err(GcalError::internal("redirect listener stopped unexpectedly"));
            }
        };

        if let Some(denial) = params.error {
            return Err(GcalError::authentication(format!(
                "authorization denied: {}",
                denial
            )));
        }
        if params.state.as_deref() != Some(expected_state) {
            return Err(GcalError::authentication(
                "state mismatch in OAuth redirect - possible CSRF",
            ));
        }
        params
            .code
            .ok_or_else(|| GcalError::authentication("redirect carried no authorization code"))
    }

    /// Parses one HTTP request and sends the matching response page.
    ///
    /// Returns `None` for requests that are not the callback (favicon
    /// fetches and the like) so the accept loop keeps listening.
    fn answer_request(mut stream: TcpStream) -> Option<RedirectParams> {
        let mut reader = BufReader::new(&stream);
        let params = RedirectParams::from_request_line(&mut reader)?;

        let page = if params.code.is_some() && params.error.is_none() {
            CONSENT_GRANTED_PAGE
        } else {
            CONSENT_FAILED_PAGE
        };
        let _ = stream.write_all(page.as_bytes());
        let _ = stream.flush();

        Some(params)
    }
}

/// Query parameters Google appends to the redirect URI.
#[derive(Debug, Default, PartialEq)]
struct RedirectParams {
    code: Option<String>,
    state: Option<String>,
    error: Option<String>,
}

impl RedirectParams {
    /// Reads an HTTP request line like `GET /callback?code=..&state=.. HTTP/1.1`.
    fn from_request_line(reader: &mut impl BufRead) -> Option<Self> {
        let mut line = String::new();
        reader.read_line(&mut line).ok()?;

        let mut words = line.split_whitespace();
        if words.next() != Some("GET") {
            return None;
        }
        let path = words.next()?;
        let (route, query) = path.split_once('?').unwrap_or((path, ""));
        if route != "/callback" {
            return None;
        }
        Some(Self::from_query(query))
    }

    fn from_query(query: &str) -> Self {
        let mut params = Self::default();
        for pair in query.split('&') {
            let Some((key, value)) = pair.split_once('=') else {
                continue;
            };
            let value = urlencoding::decode(value).unwrap_or_default().into_owned();
            match key {
                "code" => params.code = Some(value),
                "state" => params.state = Some(value),
                "error" => params.error = Some(value),
                _ => {}
            }
        }
        params
    }
}

/// The random material behind one consent URL.
struct ConsentRequest {
    /// PKCE code verifier, held back until the token exchange.
    verifier: String,
    /// base64url(SHA-256(verifier)), sent with the consent URL.
    challenge: String,
    /// CSRF nonce echoed back in the redirect.
    state: String,
}

impl ConsentRequest {
    fn generate() -> Self {
        let verifier = random_urlsafe(VERIFIER_BYTES);
        let challenge = URL_SAFE_NO_PAD.encode(Sha256::digest(verifier.as_bytes()));
        Self {
            verifier,
            challenge,
            state: random_urlsafe(STATE_BYTES),
        }
    }

    /// Builds the consent-page URL.
    ///
    /// `access_type=offline` plus `prompt=consent` makes Google issue a
    /// refresh token even when the user has consented before.
    fn consent_url(&self, client_id: &str, redirect_uri: &str, scopes: &[String]) -> String {
        let scope = scopes.join(" ");
        let params = [
            ("client_id", client_id),
            ("redirect_uri", redirect_uri),
            ("response_type", "code"),
            ("scope", scope.as_str()),
            ("code_challenge", self.challenge.as_str()),
            ("code_challenge_method", "S256"),
            ("state", self.state.as_str()),
            ("access_type", "offline"),
            ("prompt", "consent"),
        ];

        let query: Vec<String> = params
            .iter()
            .map(|(key, value)| format!("{}={}", key, urlencoding::encode(value)))
            .collect();
        format!("{}?{}", GOOGLE_AUTH_URL, query.join("&"))
    }
}

fn random_urlsafe(bytes: usize) -> String {
    let mut buf = vec![0u8; bytes];
    rand::rng().fill(&mut buf[..]);
    URL_SAFE_NO_PAD.encode(&buf)
}

/// Body of a successful token-endpoint response.
#[derive(Debug, serde::Deserialize)]
struct TokenGrant {
    access_token: String,
    #[serde(default)]
    refresh_token: Option<String>,
    #[serde(default)]
    expires_in: Option<i64>,
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use super::*;

    #[test]
    fn verifier_has_rfc7636_entropy() {
        let consent = ConsentRequest::generate();
        // 32 random bytes encode to 43 base64url characters.
        assert_eq!(consent.verifier.len(), 43);
        assert_eq!(
            consent.challenge,
            URL_SAFE_NO_PAD.encode(Sha256::digest(consent.verifier.as_bytes()))
        );
    }

    #[test]
    fn consent_material_differs_per_request() {
        let a = ConsentRequest::generate();
        let b = ConsentRequest::generate();
        assert_ne!(a.verifier, b.verifier);
        assert_ne!(a.state, b.state);
    }

    #[test]
    fn consent_url_carries_pkce_and_offline_access() {
        let consent = ConsentRequest::generate();
        let url = consent.consent_url(
            "test-client.apps.googleusercontent.com",
            "http://127.0.0.1:8080/callback",
            &["https://www.googleapis.com/auth/calendar".to_string()],
        );

        assert!(url.starts_with(GOOGLE_AUTH_URL));
        for needle in [
            "client_id=",
            "redirect_uri=",
            "code_challenge=",
            "code_challenge_method=S256",
            "state=",
            "access_type=offline",
            "prompt=consent",
        ] {
            assert!(url.contains(needle), "missing {} in {}", needle, url);
        }
    }

    #[test]
    fn redirect_query_is_decoded() {
        let params = RedirectParams::from_query("code=4%2FabcDEF&state=xyz&scope=ignored");
        assert_eq!(params.code.as_deref(), Some("4/abcDEF"));
        assert_eq!(params.state.as_deref(), Some("xyz"));
        assert_eq!(params.error, None);
    }

    #[test]
    fn denial_redirect_is_captured() {
        let params = RedirectParams::from_query("error=access_denied&state=xyz");
        assert_eq!(params.error.as_deref(), Some("access_denied"));
        assert_eq!(params.code, None);
    }

    #[test]
    fn only_callback_requests_are_answered() {
        let mut favicon = Cursor::new(&b"GET /favicon.ico HTTP/1.1\r\n"[..]);
        assert_eq!(RedirectParams::from_request_line(&mut favicon), None);

        let mut post = Cursor::new(&b"POST /callback HTTP/1.1\r\n"[..]);
        assert_eq!(RedirectParams::from_request_line(&mut post), None);

        let mut callback = Cursor::new(&b"GET /callback?code=abc&state=s HTTP/1.1\r\n"[..]);
        let params = RedirectParams::from_request_line(&mut callback).unwrap();
        assert_eq!(params.code.as_deref(), Some("abc"));
    }

    #[test]
    fn loopback_server_reports_its_redirect_uri() {
        let server = LoopbackServer::bind((38080, 38099)).unwrap();
        let uri = server.redirect_uri();
        assert!(uri.starts_with("http://127.0.0.1:"));
        assert!(uri.ends_with("/callback"));
    }
}
