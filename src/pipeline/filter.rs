//! Recognized text cleanup
//!
//! Search queries are a limited resource, so OCR noise is reduced before a
//! fragment's text is sent anywhere.

use crate::config::FilterConfig;

/// Normalizes recognized text into a search query
#[derive(Debug, Clone, Default)]
pub struct TextFilter {
    denylist: Vec<String>,
}

impl TextFilter {
    pub fn new(denylist: Vec<String>) -> Self {
        let denylist = denylist.into_iter().filter(|s| !s.is_empty()).collect();
        Self { denylist }
    }

    pub fn from_config(config: &FilterConfig) -> Self {
        Self::new(config.denylist.clone())
    }

    /// Printable ASCII only, on one line, single-spaced, denylisted
    /// substrings removed. Empty output means there is nothing to look up.
    pub fn filter(&self, text: &str) -> String {
        let ascii: String = text
            .chars()
            .filter_map(|c| {
                if c.is_ascii_whitespace() {
                    Some(' ')
                } else if c.is_ascii_graphic() {
                    Some(c)
                } else {
                    None
                }
            })
            .collect();

        let mut cleaned = collapse_whitespace(&ascii);
        if self.denylist.is_empty() {
            return cleaned;
        }

        for pattern in &self.denylist {
            cleaned = cleaned.replace(pattern.as_str(), "");
        }
        collapse_whitespace(&cleaned)
    }
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}
