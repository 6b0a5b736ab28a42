use std::fmt;

/// Category of a scanned span.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenKind {
    /// Free text, the only thing ever sent for translation.
    Text,
    /// Punctuation, brackets, embedded Latin runs and format markers.
    RawDelimiter,
    LeftParen,
    RightParen,
    LeftBracket,
    RightBracket,
    /// Argument text inside a script parameter list.
    Parameter,
    /// Control codes and conditional predicates such as `\C[14]` or `en`.
    ScriptFragment,
    /// `#{...}` interpolation block.
    RubyBlock,
    Number,
    /// Scan failure; the value holds the diagnostic instead of source text.
    Error,
    EndOfInput,
}

impl TokenKind {
    /// Kinds whose runes count towards the visible line width.
    pub fn is_visible(self) -> bool {
        matches!(
            self,
            TokenKind::Text | TokenKind::RawDelimiter | TokenKind::Number
        )
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, TokenKind::Error | TokenKind::EndOfInput)
    }
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TokenKind::Text => "Text",
            TokenKind::RawDelimiter => "RawDelimiter",
            TokenKind::LeftParen => "LeftParen",
            TokenKind::RightParen => "RightParen",
            TokenKind::LeftBracket => "LeftBracket",
            TokenKind::RightBracket => "RightBracket",
            TokenKind::Parameter => "Parameter",
            TokenKind::ScriptFragment => "ScriptFragment",
            TokenKind::RubyBlock => "RubyBlock",
            TokenKind::Number => "Number",
            TokenKind::Error => "Error",
            TokenKind::EndOfInput => "EndOfInput",
        };
        write!(f, "{}", name)
    }
}

/// One classified span of the input.
///
/// Concatenating the values of every token of a successful scan gives back the
/// original input. `position` is the byte offset of the span in that input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    pub value: String,
    pub position: usize,
}

impl Token {
    pub fn new(kind: TokenKind, value: impl Into<String>, position: usize) -> Self {
        Token {
            kind,
            value: value.into(),
            position,
        }
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            TokenKind::EndOfInput => write!(f, "EOF"),
            TokenKind::Error => write!(f, "{}", self.value),
            kind => write!(f, "{{{}: {:?}}}", kind, self.value),
        }
    }
}

/// Ordered token sequence of one scan.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TokenList(pub Vec<Token>);

impl TokenList {
    pub fn new() -> Self {
        TokenList(Vec::new())
    }

    pub fn push(&mut self, token: Token) {
        self.0.push(token);
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Token> {
        self.0.get(index)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Token> {
        self.0.iter()
    }

    /// Concatenation of every value up to the end of input.
    pub fn source(&self) -> String {
        self.0
            .iter()
            .filter(|token| !token.kind.is_terminal())
            .map(|token| token.value.as_str())
            .collect()
    }
}

impl IntoIterator for TokenList {
    type Item = Token;
    type IntoIter = std::vec::IntoIter<Self::Item>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl<'a> IntoIterator for &'a TokenList {
    type Item = &'a Token;
    type IntoIter = std::slice::Iter<'a, Token>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

impl<'a> IntoIterator for &'a mut TokenList {
    type Item = &'a mut Token;
    type IntoIter = std::slice::IterMut<'a, Token>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter_mut()
    }
}

impl FromIterator<Token> for TokenList {
    fn from_iter<I: IntoIterator<Item = Token>>(iter: I) -> Self {
        TokenList(iter.into_iter().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display() {
        assert_eq!(Token::new(TokenKind::Text, "あ", 0).to_string(), "{Text: \"あ\"}");
        assert_eq!(Token::new(TokenKind::EndOfInput, "", 3).to_string(), "EOF");
        assert_eq!(
            Token::new(TokenKind::Error, "unclosed action", 0).to_string(),
            "unclosed action"
        );
    }

    #[test]
    fn test_source_skips_terminal_tokens() {
        let tokens: TokenList = vec![
            Token::new(TokenKind::Text, "疾風", 0),
            Token::new(TokenKind::RawDelimiter, "(", 6),
            Token::new(TokenKind::EndOfInput, "", 7),
        ]
        .into_iter()
        .collect();
        assert_eq!(tokens.source(), "疾風(");
        assert_eq!(tokens.len(), 3);
    }

    #[test]
    fn test_visible_kinds() {
        assert!(TokenKind::Text.is_visible());
        assert!(TokenKind::Number.is_visible());
        assert!(!TokenKind::ScriptFragment.is_visible());
        assert!(!TokenKind::Parameter.is_visible());
    }
}
