use std::fmt;

/// A GitLab credential: either a personal/project access token used for
/// queries and job control, or a pipeline trigger token.
///
/// `Debug` never prints the secret.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct Token(String);

impl Token {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for Token {
    fn from(value: &str) -> Self {
        Self(value.to_owned())
    }
}

impl From<String> for Token {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl fmt::Debug for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Token(***)")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_debug_hides_secret() {
        let token = Token::from("glpat-secret");
        assert_eq!(format!("{token:?}"), "Token(***)");
        assert_eq!(token.as_str(), "glpat-secret");
    }
}
