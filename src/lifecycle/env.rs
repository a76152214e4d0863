use indexmap::IndexMap;

use crate::auth::Token;

/// One pipeline creation request. Built per run, never stored.
#[derive(Debug, Clone)]
pub struct TriggerRequest {
    pub ref_: String,
    /// Form fields of the form `variables[KEY]`, in command-line order
    pub variables: IndexMap<String, String>,
    pub token: Token,
}

impl TriggerRequest {
    pub fn new(ref_: &str, env: &[String], token: Token) -> Self {
        Self {
            ref_: ref_.to_owned(),
            variables: parse_env(env),
            token,
        }
    }

    /// Form body of the trigger call: `token`, `ref`, then the variables.
    pub fn form_fields(&self) -> Vec<(String, String)> {
        let mut fields = Vec::with_capacity(self.variables.len() + 2);
        fields.push(("token".to_string(), self.token.as_str().to_string()));
        fields.push(("ref".to_string(), self.ref_.clone()));
        fields.extend(
            self.variables
                .iter()
                .map(|(key, value)| (key.clone(), value.clone())),
        );
        fields
    }
}

/// Maps `key=value` assignments to `variables[key] = value` form fields.
///
/// Only the first `=` separates key from value. A key given twice keeps its
/// first position and its last value. An entry without `=` maps to an empty
/// value; the command line rejects such entries before they get here.
pub fn parse_env(entries: &[String]) -> IndexMap<String, String> {
    entries
        .iter()
        .map(|entry| {
            let (key, value) = entry.split_once('=').unwrap_or((entry.as_str(), ""));
            (format!("variables[{key}]"), value.to_string())
        })
        .collect()
}

/// Command-line validator for a single `key=value` assignment.
pub fn parse_assignment(entry: &str) -> std::result::Result<String, String> {
    match entry.split_once('=') {
        Some((key, _)) if !key.is_empty() => Ok(entry.to_string()),
        _ => Err(format!("expected KEY=VALUE, got '{entry}'")),
    }
}
