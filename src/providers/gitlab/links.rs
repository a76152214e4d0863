use url::Url;

use super::types::PipelineId;

/// Placeholder printed instead of the real access token.
const TOKEN_PLACEHOLDER: &str = "$GITLAB_API_TOKEN";

/// Builds the pipeline page link from the project's web URL.
///
/// # Returns
///
/// Clickable URL to the pipeline (e.g., <https://gitlab.com/group/project/pipelines/123>)
pub fn pipeline_url(project_web_url: &str, pipeline_id: PipelineId) -> String {
    format!(
        "{}/pipelines/{pipeline_id}",
        project_web_url.trim_end_matches('/')
    )
}

/// A cURL command reproducing a status query, for manual verification.
pub fn curl_hint(url: &Url) -> String {
    format!("curl -s -H \"PRIVATE-TOKEN: {TOKEN_PLACEHOLDER}\" \"{url}\"")
}
