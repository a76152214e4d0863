mod core;
mod jobs;
mod pipelines;

pub use self::core::{endpoint_url, GitLabClient, GitLabProject, DEFAULT_URL_PATH};
