mod cache;
mod client;
mod links;
mod provider;
pub mod types;

pub use cache::HandleCache;
pub use client::{GitLabProject, DEFAULT_URL_PATH};
pub use links::pipeline_url;
