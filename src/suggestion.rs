use serde::{Deserialize, Serialize};

/// A single completion candidate
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct Suggestion {
    /// The actual value to insert
    pub value: String,

    /// Optional human-readable label (defaults to value if None)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,

    /// Optional description for tooltips
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl Suggestion {
    /// Create a simple suggestion with just a value
    pub fn simple(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            label: None,
            description: None,
        }
    }

    /// Create a suggestion with a description
    pub fn with_description(value: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            label: None,
            description: Some(description.into()),
        }
    }

    /// Add a custom label
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    pub fn label(&self) -> &str {
        self.label.as_deref().unwrap_or(&self.value)
    }
}

impl From<&str> for Suggestion {
    fn from(value: &str) -> Self {
        Suggestion::simple(value)
    }
}

impl From<String> for Suggestion {
    fn from(value: String) -> Self {
        Suggestion::simple(value)
    }
}

/// Keep suggestions whose value starts with `partial`, ignoring case
pub fn filter_suggestions(suggestions: Vec<Suggestion>, partial: &str) -> Vec<Suggestion> {
    let partial = partial.to_lowercase();
    suggestions
        .into_iter()
        .filter(|s| s.value.to_lowercase().starts_with(&partial))
        .collect()
}

/// Drop repeated values, keeping the first occurrence
pub fn dedup_suggestions(suggestions: Vec<Suggestion>) -> Vec<Suggestion> {
    let mut seen = std::collections::HashSet::new();
    suggestions
        .into_iter()
        .filter(|s| seen.insert(s.value.clone()))
        .collect()
}

/// Ordered suggestions for one request, plus the byte range of the raw input
/// that each suggestion replaces.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct Suggestions {
    pub input: String,
    pub start: usize,
    pub end: usize,
    pub list: Vec<Suggestion>,
}

impl Suggestions {
    pub fn empty(input: impl Into<String>, start: usize, end: usize) -> Self {
        Self {
            input: input.into(),
            start,
            end,
            list: Vec::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.list.is_empty()
    }

    pub fn len(&self) -> usize {
        self.list.len()
    }

    /// Suggestion values in order
    pub fn values(&self) -> Vec<String> {
        self.list.iter().map(|s| s.value.clone()).collect()
    }

    /// The text currently occupying the replaced range
    pub fn partial(&self) -> &str {
        &self.input[self.start..self.end]
    }

    /// Splice a suggestion into the raw input, replacing only the token under
    /// the cursor and keeping the text around it.
    pub fn full_line(&self, suggestion: &Suggestion) -> String {
        format!(
            "{}{}{}",
            &self.input[..self.start],
            suggestion.value,
            &self.input[self.end..]
        )
    }

    /// Every suggestion spliced into the full input line
    pub fn full_lines(&self) -> Vec<String> {
        self.list.iter().map(|s| self.full_line(s)).collect()
    }

    /// Longest prefix shared by all suggestions, when it extends the partial
    pub fn common_prefix(&self) -> Option<String> {
        let first = &self.list.first()?.value;
        let mut common_prefix = first.clone();

        for suggestion in &self.list[1..] {
            let mut prefix_len = 0;
            for (c1, c2) in common_prefix.chars().zip(suggestion.value.chars()) {
                if c1 == c2 {
                    prefix_len += c1.len_utf8();
                } else {
                    break;
                }
            }
            common_prefix.truncate(prefix_len);
        }

        if common_prefix.len() > self.partial().len() {
            Some(common_prefix)
        } else {
            None
        }
    }

    /// Decide how a host should react to a completion key press
    pub fn completion_result(self) -> CompletionResult {
        if self.list.len() > 1 {
            if let Some(prefix) = self.common_prefix() {
                let new_input = self.full_line(&Suggestion::simple(prefix));
                return CompletionResult::AutoFilledPrefix {
                    new_input,
                    suggestions: self.list,
                };
            }
        }
        CompletionResult::Suggestions(self.list)
    }
}

/// Result of triggering completion
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CompletionResult {
    /// Suggestions available - may be empty, single, or multiple
    Suggestions(Vec<Suggestion>),
    /// Common prefix was auto-filled, input should be updated to this value
    AutoFilledPrefix { new_input: String, suggestions: Vec<Suggestion> },
}
