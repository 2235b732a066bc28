/// Folder include-list applied at every directory boundary
///
/// Terms match as plain substrings of a directory's full repository path.
/// An empty list includes everything.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterConfig {
    terms: Vec<String>,
}

impl FilterConfig {
    pub fn new<I, S>(terms: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut kept: Vec<String> = Vec::new();
        for term in terms {
            let term: String = term.into();
            let term = term.trim().to_string();
            if !term.is_empty() && !kept.contains(&term) {
                kept.push(term);
            }
        }
        Self { terms: kept }
    }

    /// Parse a comma separated include list such as `"docs, api"`
    pub fn parse(list: &str) -> Self {
        Self::new(list.split(','))
    }

    pub fn terms(&self) -> &[String] {
        &self.terms
    }

    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }

    /// Whether a directory at `full_path` should be walked
    pub fn should_descend(&self, full_path: &str) -> bool {
        self.terms.is_empty() || self.terms.iter().any(|term| full_path.contains(term.as_str()))
    }
}
