use std::collections::HashMap;
use std::sync::Arc;

use log::debug;

use crate::auth::Token;
use crate::error::Result;

use super::client::{endpoint_url, GitLabClient, GitLabProject};

/// Identity of a project handle: normalized endpoint, credential, project id.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct HandleKey {
    endpoint: String,
    credential: Option<Token>,
    project_id: String,
}

/// Lazily populated cache of GitLab client and project handles.
///
/// One run drives one pipeline and exits, so entries are never evicted.
/// Identical `(endpoint, credential, project id)` keys always yield the same
/// handle.
pub struct HandleCache {
    verify_ssl: bool,
    clients: HashMap<(String, Option<Token>), Arc<GitLabClient>>,
    projects: HashMap<HandleKey, Arc<GitLabProject>>,
}

impl HandleCache {
    pub fn new(verify_ssl: bool) -> Self {
        Self {
            verify_ssl,
            clients: HashMap::new(),
            projects: HashMap::new(),
        }
    }

    /// Client for `{host}{url_path}` authenticated with `credential`.
    pub fn client(
        &mut self,
        host: &str,
        url_path: &str,
        credential: Option<&Token>,
    ) -> Result<Arc<GitLabClient>> {
        let endpoint = endpoint_url(host, url_path)?.to_string();
        let key = (endpoint, credential.cloned());

        if let Some(client) = self.clients.get(&key) {
            debug!("Reusing client for {}", key.0);
            return Ok(Arc::clone(client));
        }

        let client = Arc::new(GitLabClient::new(
            host,
            url_path,
            credential.cloned(),
            self.verify_ssl,
        )?);
        debug!("Created client for {}", key.0);
        self.clients.insert(key, Arc::clone(&client));
        Ok(client)
    }

    /// Handle for `project_id`, sharing the underlying client per credential.
    pub fn project(
        &mut self,
        host: &str,
        url_path: &str,
        credential: Option<&Token>,
        project_id: &str,
    ) -> Result<Arc<GitLabProject>> {
        let key = HandleKey {
            endpoint: endpoint_url(host, url_path)?.to_string(),
            credential: credential.cloned(),
            project_id: project_id.to_owned(),
        };

        if let Some(project) = self.projects.get(&key) {
            return Ok(Arc::clone(project));
        }

        let client = self.client(host, url_path, credential)?;
        let project = Arc::new(GitLabProject::new(client, project_id)?);
        self.projects.insert(key, Arc::clone(&project));
        Ok(project)
    }
}
