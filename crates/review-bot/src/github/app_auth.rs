//! GitHub App authentication.
//!
//! Every call mints a fresh RS256 JWT and, for installation access, redeems a
//! fresh installation token. Nothing is cached: review volume is one call per
//! pull request event, and GitHub rejects App JWTs older than ten minutes.

use std::fmt;
use std::io::ErrorKind;
use std::time::Duration;

use chrono::{DateTime, Utc};
use jsonwebtoken::{Algorithm, EncodingKey, Header};
use reqwest::Response;
use tracing::{debug, error, instrument};

use super::base_headers;
use super::client::InstallationClient;
use super::models::{AppClaims, Installation, InstallationToken};
use crate::config::GitHubAppConfig;
use crate::error::{AuthError, AuthOperation, ConfigError, SigningError};

/// Lifetime of an App JWT. GitHub caps this at ten minutes.
pub const JWT_LIFETIME_SECS: i64 = 600;

const INSTALLATIONS_PER_PAGE: usize = 100;

/// Credential minter for a single GitHub App installation.
///
/// Cheap to clone; the signing key and HTTP connection pool are shared
/// read-only between clones.
#[derive(Clone)]
pub struct AppAuth {
    app_id: u64,
    installation_id: u64,
    encoding_key: EncodingKey,
    client: reqwest::Client,
    api_url: String,
    timeout: Duration,
}

impl fmt::Debug for AppAuth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AppAuth")
            .field("app_id", &self.app_id)
            .field("installation_id", &self.installation_id)
            .field("api_url", &self.api_url)
            .finish_non_exhaustive()
    }
}

impl AppAuth {
    /// Validate the App configuration and load its signing key.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] if either ID is not a positive integer, the
    /// key file is missing or unreadable, or its contents are not an RSA
    /// private key in PEM form.
    pub fn new(config: &GitHubAppConfig) -> Result<Self, ConfigError> {
        debug!("Initializing GitHub App authentication");

        let app_id = parse_id("GITHUB_APP_ID", &config.app_id)?;
        let installation_id = parse_id("GITHUB_APP_INSTALLATION_ID", &config.installation_id)?;

        let path = &config.private_key_path;
        debug!(path = %path.display(), "Loading private key");
        let pem = match std::fs::read(path) {
            Ok(pem) => pem,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                error!(path = %path.display(), "Private key file not found");
                return Err(ConfigError::KeyNotFound(path.clone()));
            }
            Err(source) => {
                error!(path = %path.display(), error = %source, "Failed to read private key");
                return Err(ConfigError::KeyRead {
                    path: path.clone(),
                    source,
                });
            }
        };

        let encoding_key =
            EncodingKey::from_rsa_pem(&pem).map_err(|source| ConfigError::InvalidKey {
                path: path.clone(),
                source,
            })?;

        let client = reqwest::Client::builder()
            .default_headers(base_headers())
            .timeout(config.timeout)
            .build()?;

        debug!(app_id, installation_id, "GitHub App authentication initialized");

        Ok(Self {
            app_id,
            installation_id,
            encoding_key,
            client,
            api_url: config.api_url.trim_end_matches('/').to_string(),
            timeout: config.timeout,
        })
    }

    /// The App ID used as JWT issuer.
    #[must_use]
    pub fn app_id(&self) -> u64 {
        self.app_id
    }

    /// The installation this minter redeems tokens for.
    #[must_use]
    pub fn installation_id(&self) -> u64 {
        self.installation_id
    }

    /// Mint a JWT identifying the App, valid for ten minutes from now.
    ///
    /// # Errors
    ///
    /// Returns a [`SigningError`] if RSA signing fails.
    pub fn create_jwt(&self) -> Result<String, SigningError> {
        debug!("Creating JWT token for GitHub App");
        self.create_jwt_at(Utc::now())
    }

    pub(crate) fn create_jwt_at(&self, now: DateTime<Utc>) -> Result<String, SigningError> {
        let iat = now.timestamp();
        let claims = AppClaims {
            iat,
            exp: iat + JWT_LIFETIME_SECS,
            iss: self.app_id.to_string(),
        };

        // GitHub rejects App JWTs whose header does not name RS256
        let header = Header::new(Algorithm::RS256);

        Ok(jsonwebtoken::encode(&header, &claims, &self.encoding_key)?)
    }

    /// Redeem a fresh JWT for an installation token and return a client using it.
    ///
    /// # Errors
    ///
    /// Returns an [`AuthError`] if signing fails, the token endpoint cannot be
    /// reached, or it answers with a non-success status or unexpected body.
    #[instrument(skip(self), fields(installation_id = self.installation_id))]
    pub async fn installation_client(&self) -> Result<InstallationClient, AuthError> {
        debug!("Getting GitHub installation client");
        let operation = AuthOperation::CreateAccessToken {
            installation_id: self.installation_id,
        };

        let jwt = self
            .create_jwt()
            .map_err(|source| AuthError::Signing { operation, source })?;
        let url = format!(
            "{}/app/installations/{}/access_tokens",
            self.api_url, self.installation_id
        );

        debug!("Requesting installation token");
        let response = self
            .client
            .post(&url)
            .bearer_auth(&jwt)
            .send()
            .await
            .map_err(|source| AuthError::Request { operation, source })?;

        let token: InstallationToken = check_status(response, operation)
            .await?
            .json()
            .await
            .map_err(|source| AuthError::Decode { operation, source })?;

        let client =
            InstallationClient::new(self.installation_id, &token, &self.api_url, self.timeout)?;

        debug!(
            expires_at = ?token.expires_at,
            "GitHub installation client created successfully"
        );
        Ok(client)
    }

    /// List every installation of this App, following pagination.
    ///
    /// # Errors
    ///
    /// Returns an [`AuthError`] if signing fails or any page request fails.
    #[instrument(skip(self), fields(app_id = self.app_id))]
    pub async fn list_installations(&self) -> Result<Vec<Installation>, AuthError> {
        debug!("Listing GitHub App installations");
        let operation = AuthOperation::ListInstallations {
            app_id: self.app_id,
        };

        let jwt = self
            .create_jwt()
            .map_err(|source| AuthError::Signing { operation, source })?;
        let url = format!("{}/app/installations", self.api_url);
        let mut installations = Vec::new();

        for page in 1usize.. {
            let response = self
                .client
                .get(&url)
                .query(&[("per_page", INSTALLATIONS_PER_PAGE), ("page", page)])
                .bearer_auth(&jwt)
                .send()
                .await
                .map_err(|source| AuthError::Request { operation, source })?;

            let batch: Vec<Installation> = check_status(response, operation)
                .await?
                .json()
                .await
                .map_err(|source| AuthError::Decode { operation, source })?;

            let last_page = batch.len() < INSTALLATIONS_PER_PAGE;
            installations.extend(batch);
            if last_page {
                break;
            }
        }

        debug!(count = installations.len(), "Found GitHub App installations");
        Ok(installations)
    }
}

fn parse_id(field: &'static str, value: &str) -> Result<u64, ConfigError> {
    value
        .trim()
        .parse::<u64>()
        .ok()
        .filter(|id| *id > 0)
        .ok_or_else(|| ConfigError::InvalidId {
            field,
            value: value.to_string(),
        })
}

async fn check_status(
    response: Response,
    operation: AuthOperation,
) -> Result<Response, AuthError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(AuthError::Status {
        operation,
        status,
        body,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::github::GITHUB_JSON;
    use jsonwebtoken::{decode, decode_header, DecodingKey, Validation};
    use reqwest::Method;
    use std::io::Write;
    use std::path::PathBuf;
    use wiremock::matchers::{header, header_regex, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const PUBLIC_KEY: &str = include_str!("../../tests/fixtures/test-app-key.pub.pem");

    fn fixture_key_path() -> PathBuf {
        PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures/test-app-key.pem")
    }

    fn test_config(api_url: &str) -> GitHubAppConfig {
        GitHubAppConfig {
            app_id: "12345".to_string(),
            installation_id: "678".to_string(),
            private_key_path: fixture_key_path(),
            api_url: api_url.to_string(),
            timeout: Duration::from_secs(5),
        }
    }

    fn decode_claims(token: &str) -> AppClaims {
        let key = DecodingKey::from_rsa_pem(PUBLIC_KEY.as_bytes()).unwrap();
        let mut validation = Validation::new(Algorithm::RS256);
        validation.validate_exp = false;
        decode::<AppClaims>(token, &key, &validation).unwrap().claims
    }

    #[test]
    fn test_jwt_claims_and_header() {
        let auth = AppAuth::new(&test_config("https://api.github.com")).unwrap();
        assert_eq!(auth.app_id(), 12345);
        assert_eq!(auth.installation_id(), 678);

        let token = auth.create_jwt().unwrap();

        let header = decode_header(&token).unwrap();
        assert_eq!(header.alg, Algorithm::RS256);

        let claims = decode_claims(&token);
        assert_eq!(claims.iss, "12345");
        assert_eq!(claims.exp - claims.iat, JWT_LIFETIME_SECS);
        assert!((Utc::now().timestamp() - claims.iat).abs() <= 5);
    }

    #[test]
    fn test_jwts_minted_in_different_seconds_are_distinct() {
        let auth = AppAuth::new(&test_config("https://api.github.com")).unwrap();
        let first_at = Utc::now();
        let second_at = first_at + chrono::Duration::seconds(1);

        let first = auth.create_jwt_at(first_at).unwrap();
        let second = auth.create_jwt_at(second_at).unwrap();
        assert_ne!(first, second);

        let first_claims = decode_claims(&first);
        let second_claims = decode_claims(&second);
        assert_eq!(first_claims.iat, first_at.timestamp());
        assert_eq!(second_claims.iat, second_at.timestamp());
        assert_eq!(first_claims.exp - first_claims.iat, 600);
        assert_eq!(second_claims.exp - second_claims.iat, 600);
    }

    #[test]
    fn test_non_numeric_app_id_is_rejected() {
        let mut config = test_config("https://api.github.com");
        config.app_id = "twelve".to_string();

        let err = AppAuth::new(&config).unwrap_err();
        assert!(matches!(
            err,
            ConfigError::InvalidId {
                field: "GITHUB_APP_ID",
                ..
            }
        ));
    }

    #[test]
    fn test_zero_and_negative_installation_ids_are_rejected() {
        for value in ["0", "-5", "", "99999999999999999999"] {
            let mut config = test_config("https://api.github.com");
            config.installation_id = value.to_string();

            let err = AppAuth::new(&config).unwrap_err();
            assert!(
                matches!(
                    err,
                    ConfigError::InvalidId {
                        field: "GITHUB_APP_INSTALLATION_ID",
                        ..
                    }
                ),
                "{value:?} should be rejected"
            );
        }
    }

    #[test]
    fn test_missing_key_file_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = test_config("https://api.github.com");
        config.private_key_path = dir.path().join("absent.pem");

        let err = AppAuth::new(&config).unwrap_err();
        assert!(matches!(err, ConfigError::KeyNotFound(p) if p.ends_with("absent.pem")));
    }

    #[test]
    fn test_invalid_key_contents_are_rejected() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "this is not a private key").unwrap();

        let mut config = test_config("https://api.github.com");
        config.private_key_path = file.path().to_path_buf();

        let err = AppAuth::new(&config).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidKey { .. }));
    }

    #[tokio::test]
    async fn test_installation_client_uses_redeemed_token() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/app/installations/678/access_tokens"))
            .and(header_regex("authorization", r"^Bearer [\w-]+\.[\w-]+\.[\w-]+$"))
            .and(header("accept", GITHUB_JSON))
            .respond_with(ResponseTemplate::new(201).set_body_json(serde_json::json!({
                "token": "tok-abc",
                "expires_at": "2030-01-01T00:00:00Z"
            })))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/installation/repositories"))
            .and(header(
                "authorization",
                "Basic eC1hY2Nlc3MtdG9rZW46dG9rLWFiYw==",
            ))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "total_count": 0,
                "repositories": []
            })))
            .expect(1)
            .mount(&server)
            .await;

        let auth = AppAuth::new(&test_config(&server.uri())).unwrap();
        let client = auth.installation_client().await.unwrap();
        assert!(client.expires_at().is_some());

        let response = client
            .request(Method::GET, "/installation/repositories")
            .send()
            .await
            .unwrap();
        assert!(response.status().is_success());
    }

    #[tokio::test]
    async fn test_installation_client_server_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/app/installations/678/access_tokens"))
            .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
            .mount(&server)
            .await;

        let auth = AppAuth::new(&test_config(&server.uri())).unwrap();
        let err = auth.installation_client().await.unwrap_err();
        match err {
            AuthError::Status {
                operation,
                status,
                body,
            } => {
                assert_eq!(
                    operation,
                    AuthOperation::CreateAccessToken {
                        installation_id: 678
                    }
                );
                assert_eq!(status.as_u16(), 500);
                assert_eq!(body, "boom");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn test_installation_client_malformed_body() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/app/installations/678/access_tokens"))
            .respond_with(ResponseTemplate::new(201).set_body_json(serde_json::json!({
                "expires_at": "2030-01-01T00:00:00Z"
            })))
            .mount(&server)
            .await;

        let auth = AppAuth::new(&test_config(&server.uri())).unwrap();
        let err = auth.installation_client().await.unwrap_err();
        assert!(matches!(err, AuthError::Decode { .. }));
        assert!(err.to_string().contains("installation 678"));
    }

    #[tokio::test]
    async fn test_list_installations_follows_pages() {
        let server = MockServer::start().await;
        let first_page: Vec<_> = (1..=100)
            .map(|id| serde_json::json!({ "id": id, "account": { "login": format!("org-{id}") } }))
            .collect();

        Mock::given(method("GET"))
            .and(path("/app/installations"))
            .and(query_param("page", "1"))
            .and(query_param("per_page", "100"))
            .and(header_regex("authorization", r"^Bearer "))
            .respond_with(ResponseTemplate::new(200).set_body_json(first_page))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/app/installations"))
            .and(query_param("page", "2"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([
                { "id": 101, "account": { "login": "octo" } }
            ])))
            .expect(1)
            .mount(&server)
            .await;

        let auth = AppAuth::new(&test_config(&server.uri())).unwrap();
        let installations = auth.list_installations().await.unwrap();

        assert_eq!(installations.len(), 101);
        assert_eq!(installations[0].account_login(), "org-1");
        assert_eq!(installations[100].id, 101);
        assert_eq!(installations[100].account_login(), "octo");
    }

    #[tokio::test]
    async fn test_list_installations_keeps_enterprise_accounts() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/app/installations"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([
                { "id": 1, "account": { "login": "octo" } },
                { "id": 2, "account": { "slug": "big-corp", "name": "Big Corp" } }
            ])))
            .expect(1)
            .mount(&server)
            .await;

        let auth = AppAuth::new(&test_config(&server.uri())).unwrap();
        let installations = auth.list_installations().await.unwrap();

        assert_eq!(installations.len(), 2);
        assert_eq!(installations[0].account_login(), "octo");
        assert_eq!(installations[1].id, 2);
        assert_eq!(installations[1].account_login(), "big-corp");
    }

    #[tokio::test]
    async fn test_list_installations_unauthorized() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/app/installations"))
            .respond_with(
                ResponseTemplate::new(401).set_body_string("A JSON web token could not be decoded"),
            )
            .mount(&server)
            .await;

        let auth = AppAuth::new(&test_config(&server.uri())).unwrap();
        let err = auth.list_installations().await.unwrap_err();
        assert!(matches!(
            err,
            AuthError::Status {
                operation: AuthOperation::ListInstallations { app_id: 12345 },
                ..
            }
        ));
    }
}
