use std::sync::Arc;

/// Cursor-tracked view over raw command input
///
/// The underlying string is a shared snapshot; cloning an input yields an
/// independent cursor over the same text, which is how suggestion replay and
/// alternative parsers avoid disturbing the real parse.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CommandInput {
    /// Original input string
    input: Arc<str>,

    /// Byte offset of the next unread character
    cursor: usize,
}

impl CommandInput {
    pub fn new(input: impl Into<String>) -> Self {
        let input: String = input.into();
        Self {
            input: Arc::from(input),
            cursor: 0,
        }
    }

    /// Get the original input string
    pub fn input(&self) -> &str {
        &self.input
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    /// Everything after the cursor
    pub fn remaining_input(&self) -> &str {
        &self.input[self.cursor..]
    }

    pub fn remaining_length(&self) -> usize {
        self.input.len() - self.cursor
    }

    /// True when no characters remain at all
    pub fn is_empty(&self) -> bool {
        self.cursor >= self.input.len()
    }

    /// True when only whitespace remains
    pub fn is_blank(&self) -> bool {
        self.remaining_input().trim_start().is_empty()
    }

    pub fn has_remaining_input(&self) -> bool {
        !self.is_blank()
    }

    pub fn peek(&self) -> Option<char> {
        self.remaining_input().chars().next()
    }

    pub fn read(&mut self) -> Option<char> {
        let ch = self.peek()?;
        self.cursor += ch.len_utf8();
        Some(ch)
    }

    pub fn skip_whitespace(&mut self) -> &mut Self {
        let rest = self.remaining_input();
        let skipped = rest.len() - rest.trim_start().len();
        self.cursor += skipped;
        self
    }

    /// Read the next token without moving the cursor
    pub fn peek_string(&self) -> String {
        self.clone().read_string()
    }

    /// Read the next token, honoring quotes.
    ///
    /// Leading whitespace is skipped. A token starting with `"` or `'` runs to
    /// the matching unescaped quote, or to the end of input when the quote is
    /// never closed.
    pub fn read_string(&mut self) -> String {
        self.skip_whitespace();
        match self.peek() {
            Some(quote @ ('"' | '\'')) => self.read_quoted(quote),
            Some(_) => {
                let rest = self.remaining_input();
                let len = rest.find(char::is_whitespace).unwrap_or(rest.len());
                let token = rest[..len].to_string();
                self.cursor += len;
                token
            }
            None => String::new(),
        }
    }

    fn read_quoted(&mut self, quote: char) -> String {
        let start = self.cursor + quote.len_utf8();
        let mut token = String::new();
        let mut end = self.input.len();
        let mut escaped = false;

        for (offset, ch) in self.input[start..].char_indices() {
            if escaped {
                token.push(ch);
                escaped = false;
            } else if ch == '\\' {
                escaped = true;
            } else if ch == quote {
                end = start + offset + ch.len_utf8();
                break;
            } else {
                token.push(ch);
            }
        }

        self.cursor = end;
        token
    }

    /// Consume the rest of the input, trimmed of surrounding whitespace
    pub fn read_input(&mut self) -> String {
        let rest = self.remaining_input().trim().to_string();
        self.cursor = self.input.len();
        rest
    }

    /// Number of tokens left, counting quoted segments as one
    pub fn remaining_tokens(&self) -> usize {
        self.tokenize().len()
    }

    /// Tokenize the remaining input without moving the cursor
    pub fn tokenize(&self) -> Vec<String> {
        let mut copy = self.clone();
        let mut tokens = Vec::new();
        while copy.has_remaining_input() {
            tokens.push(copy.read_string());
        }
        tokens
    }

    /// True when the remaining input holds at most one (possibly partial) token
    pub fn is_last_token(&self) -> bool {
        let mut copy = self.clone();
        copy.read_string();
        copy.is_empty()
    }

    /// Text consumed between `earlier` and this input, trimmed
    pub fn difference(&self, earlier: &CommandInput) -> &str {
        if earlier.cursor >= self.cursor {
            return "";
        }
        self.input[earlier.cursor..self.cursor].trim()
    }

    /// Byte range of the token that touches `cursor`, used for splicing
    /// suggestions back into the raw input.
    ///
    /// Tokens are found the way [`CommandInput::read_string`] finds them, so
    /// a quoted token under the cursor is returned whole, quote included.
    /// A cursor past the end or inside a character is moved back to the
    /// nearest char boundary.
    pub fn token_bounds(&self, cursor: usize) -> (usize, usize) {
        let cursor = floor_char_boundary(&self.input, cursor);
        let mut scan = CommandInput {
            input: Arc::clone(&self.input),
            cursor: 0,
        };
        loop {
            scan.skip_whitespace();
            let start = scan.cursor;
            if start > cursor || scan.is_empty() {
                return (cursor, cursor);
            }
            scan.read_string();
            if scan.cursor >= cursor {
                return (start, scan.cursor);
            }
        }
    }
}

/// Largest char boundary of `raw` not after `cursor`
pub(crate) fn floor_char_boundary(raw: &str, cursor: usize) -> usize {
    let mut cursor = cursor.min(raw.len());
    while !raw.is_char_boundary(cursor) {
        cursor -= 1;
    }
    cursor
}

impl From<&str> for CommandInput {
    fn from(value: &str) -> Self {
        CommandInput::new(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_simple_tokens() {
        let mut input = CommandInput::new("give 10  sword");
        assert_eq!(input.read_string(), "give");
        assert_eq!(input.peek_string(), "10");
        assert_eq!(input.read_string(), "10");
        assert_eq!(input.remaining_tokens(), 1);
        assert_eq!(input.read_string(), "sword");
        assert!(input.is_empty());
    }

    #[test]
    fn test_quoted_tokens() {
        let input = CommandInput::new(r#"msg "hello world" 'it\'s' bar"#);
        assert_eq!(input.tokenize(), vec!["msg", "hello world", "it's", "bar"]);
    }

    #[test]
    fn test_unterminated_quote_closes_at_end() {
        let mut input = CommandInput::new(r#"say "partial text"#);
        input.read_string();
        assert_eq!(input.read_string(), "partial text");
        assert!(input.is_empty());
    }

    #[test]
    fn test_blank_and_last_token() {
        let mut input = CommandInput::new("tp bob ");
        assert!(!input.is_last_token());
        input.read_string();
        assert!(!input.is_last_token());
        input.read_string();
        assert!(input.is_blank());
        assert!(!input.is_empty());
        assert!(input.is_last_token());
    }

    #[test]
    fn test_difference() {
        let start = CommandInput::new("give 10 sword");
        let mut input = start.clone();
        input.read_string();
        input.read_string();
        assert_eq!(input.difference(&start), "give 10");
        assert_eq!(start.cursor(), 0);
    }

    #[test]
    fn test_token_bounds() {
        let input = CommandInput::new("give 10 sw");
        assert_eq!(input.token_bounds(10), (8, 10));
        assert_eq!(input.token_bounds(6), (5, 7));
        assert_eq!(CommandInput::new("give ").token_bounds(5), (5, 5));
        assert_eq!(CommandInput::new("give  10").token_bounds(5), (5, 5));
        assert_eq!(input.token_bounds(99), (8, 10));
    }

    #[test]
    fn test_token_bounds_follow_quotes() {
        let input = CommandInput::new(r#"msg "hello wo"#);
        assert_eq!(input.token_bounds(13), (4, 13));
        assert_eq!(input.token_bounds(8), (4, 13));

        let mut reader = input.clone();
        reader.read_string();
        reader.skip_whitespace();
        assert_eq!(reader.cursor(), 4);
        assert_eq!(reader.read_string(), "hello wo");

        let closed = CommandInput::new(r#"msg "a b" c"#);
        assert_eq!(closed.token_bounds(11), (10, 11));
    }

    #[test]
    fn test_token_bounds_clamp_inside_char() {
        let input = CommandInput::new("tp bö");
        assert_eq!(input.token_bounds(5), (3, 6));
        assert_eq!(floor_char_boundary("tp bö", 5), 4);
    }
}
