/// Case-insensitive keyword matcher with OR semantics
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KeywordMatcher {
    /// Lower-cased, trimmed, non-empty keywords in configured order
    keywords: Vec<String>,
}

impl KeywordMatcher {
    pub fn new<S: AsRef<str>>(keywords: &[S]) -> Self {
        let keywords = keywords
            .iter()
            .map(|k| k.as_ref().trim().to_lowercase())
            .filter(|k| !k.is_empty())
            .collect();
        Self { keywords }
    }

    /// Returns true if no keyword is configured
    pub fn is_empty(&self) -> bool {
        self.keywords.is_empty()
    }

    /// Returns the first keyword found as a substring of `text` or `title`
    pub fn first_match(&self, text: &str, title: Option<&str>) -> Option<&str> {
        let text = text.to_lowercase();
        let title = title.map(str::to_lowercase).unwrap_or_default();

        self.keywords
            .iter()
            .find(|k| text.contains(k.as_str()) || title.contains(k.as_str()))
            .map(String::as_str)
    }
}
