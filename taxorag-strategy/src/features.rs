//! Query feature extraction ("length, presence of quoted
//! strings, digit ratio, language hint").

/// Raw numeric features extracted from a query string.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryFeatures {
    pub length: usize,
    pub has_quotes: bool,
    pub digit_ratio: f32,
    pub language_hint: Option<String>,
}

impl QueryFeatures {
    #[must_use]
    pub fn extract(query: &str) -> Self {
        let length = query.chars().count();
        let has_quotes = query.contains('"') || query.contains('\'');
        let digits = query.chars().filter(char::is_ascii_digit).count();
        #[allow(clippy::cast_precision_loss)]
        let digit_ratio = if length == 0 {
            0.0
        } else {
            digits as f32 / length as f32
        };
        let language_hint = detect_language_hint(query);

        Self {
            length,
            has_quotes,
            digit_ratio,
            language_hint,
        }
    }

    /// Discretize into a small context key for the per-context Q-table
    /// ("session/agent context"). A handful of buckets keeps
    /// the table small without function approximation.
    #[must_use]
    pub fn context_key(&self) -> String {
        let length_bucket = match self.length {
            0..=20 => "short",
            21..=100 => "medium",
            _ => "long",
        };
        let quote_bucket = if self.has_quotes { "quoted" } else { "plain" };
        let digit_bucket = if self.digit_ratio > 0.3 { "numeric" } else { "text" };
        let lang = self.language_hint.as_deref().unwrap_or("unknown");
        format!("{length_bucket}:{quote_bucket}:{digit_bucket}:{lang}")
    }
}

/// Crude heuristic: non-ASCII letters imply a non-English query. This is
/// a hint, not a classifier — one of several raw features, not the
/// basis of a language-detection subsystem.
fn detect_language_hint(query: &str) -> Option<String> {
    if query.is_empty() {
        return None;
    }
    if query.chars().any(|c| c.is_alphabetic() && !c.is_ascii()) {
        Some("non_ascii".to_string())
    } else {
        Some("ascii".to_string())
    }
}
