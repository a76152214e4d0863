use std::sync::Arc;

use log::debug;
use reqwest::header::HeaderValue;
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use url::Url;

use crate::auth::Token;
use crate::error::{Result, TriggerError};

pub const DEFAULT_URL_PATH: &str = "/api/v4/projects";
const PRIVATE_TOKEN_HEADER: &str = "PRIVATE-TOKEN";
pub(super) const PAGE_SIZE: usize = 100;

/// HTTP client bound to one GitLab REST endpoint and one credential.
pub struct GitLabClient {
    client: Client,
    projects_url: Url,
    token: Option<Token>,
}

impl GitLabClient {
    /// Creates a client for `{host}{url_path}`.
    ///
    /// Hosts without a scheme are assumed to be served over HTTPS.
    pub fn new(host: &str, url_path: &str, token: Option<Token>, verify_ssl: bool) -> Result<Self> {
        let client = Client::builder()
            .user_agent(concat!("pipeline-trigger/", env!("CARGO_PKG_VERSION")))
            .danger_accept_invalid_certs(!verify_ssl)
            .build()
            .map_err(|e| TriggerError::Configuration(format!("Failed to create HTTP client: {e}")))?;

        let projects_url = endpoint_url(host, url_path)?;

        Ok(Self {
            client,
            projects_url,
            token,
        })
    }

    pub fn client(&self) -> &Client {
        &self.client
    }

    pub fn has_token(&self) -> bool {
        self.token.is_some()
    }

    /// Attaches the `PRIVATE-TOKEN` header when a credential is configured.
    pub fn auth_request(&self, request: RequestBuilder) -> RequestBuilder {
        match self
            .token
            .as_ref()
            .and_then(|token| HeaderValue::from_str(token.as_str()).ok())
        {
            Some(mut value) => {
                value.set_sensitive(true);
                request.header(PRIVATE_TOKEN_HEADER, value)
            }
            None => request,
        }
    }

    /// Construct project base URL
    pub fn project_url(&self, project_id: &str) -> Result<Url> {
        let mut url = self.projects_url.clone();
        url.path_segments_mut()
            .map_err(|()| {
                TriggerError::Configuration(format!("Invalid API URL: {}", self.projects_url))
            })?
            .pop_if_empty()
            .push(project_id);
        Ok(url)
    }
}

/// Normalized `{host}{url_path}` used both to build requests and as cache key.
pub fn endpoint_url(host: &str, url_path: &str) -> Result<Url> {
    let host = host.trim_end_matches('/');
    let base = if host.contains("://") {
        host.to_owned()
    } else {
        format!("https://{host}")
    };

    let mut url = Url::parse(&base)
        .map_err(|e| TriggerError::Configuration(format!("Invalid host '{host}': {e}")))?;
    url.path_segments_mut()
        .map_err(|()| TriggerError::Configuration(format!("Invalid host '{host}'")))?
        .pop_if_empty()
        .extend(url_path.split('/').filter(|segment| !segment.is_empty()));

    Ok(url)
}

/// Handle to one project on one GitLab instance.
///
/// Handles are created through [`HandleCache`](crate::providers::gitlab::HandleCache) and shared by
/// reference for the whole run.
pub struct GitLabProject {
    client: Arc<GitLabClient>,
    project_id: String,
    url: Url,
}

impl GitLabProject {
    pub fn new(client: Arc<GitLabClient>, project_id: &str) -> Result<Self> {
        let url = client.project_url(project_id)?;
        Ok(Self {
            client,
            project_id: project_id.to_owned(),
            url,
        })
    }

    pub fn project_id(&self) -> &str {
        &self.project_id
    }

    pub fn gitlab(&self) -> &GitLabClient {
        &self.client
    }

    /// Project URL extended with `segments`, each one percent-encoded.
    pub fn url(&self, segments: &[&str]) -> Result<Url> {
        let mut url = self.url.clone();
        url.path_segments_mut()
            .map_err(|()| TriggerError::Configuration(format!("Invalid project URL: {}", self.url)))?
            .extend(segments);
        Ok(url)
    }

    /// Authenticated GET that expects `200 OK`.
    ///
    /// Any other status is a lookup failure; the body is kept for diagnostics.
    pub(super) async fn get(&self, url: Url) -> Result<Response> {
        debug!("GET {url}");
        let response = self
            .client
            .auth_request(self.client.client().get(url.clone()))
            .send()
            .await?;

        expect_status(response, StatusCode::OK, &url).await
    }

    pub(super) async fn get_json<T>(&self, url: Url) -> Result<T>
    where
        T: serde::de::DeserializeOwned,
    {
        let response = self.get(url.clone()).await?;
        let body = response.text().await?;
        serde_json::from_str(&body)
            .map_err(|e| TriggerError::Lookup(format!("Malformed response from {url}: {e}")))
    }

    /// Authenticated POST without a body, expecting any 2xx status.
    ///
    /// `on_error` builds the failure from the status and response body.
    pub(super) async fn post_action<F>(&self, url: Url, on_error: F) -> Result<Response>
    where
        F: FnOnce(StatusCode, String) -> TriggerError,
    {
        debug!("POST {url}");
        let response = self
            .client
            .auth_request(self.client.client().post(url))
            .send()
            .await?;

        let status = response.status();
        if status.is_success() {
            Ok(response)
        } else {
            Err(on_error(status, error_text(response).await))
        }
    }
}

async fn expect_status(response: Response, expected: StatusCode, url: &Url) -> Result<Response> {
    let status = response.status();
    if status == expected {
        return Ok(response);
    }

    Err(TriggerError::Lookup(format!(
        "{url} returned status {status}: {}",
        error_text(response).await
    )))
}

pub(super) async fn error_text(response: Response) -> String {
    response
        .text()
        .await
        .unwrap_or_else(|_| "Unable to read error response".to_string())
}
