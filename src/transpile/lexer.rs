//! Lightweight tokenizer for C-like firmware source.
//!
//! Tokens keep their exact text (whitespace and comments included) so a
//! token stream renders back to its input byte for byte.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    Ident,
    Number,
    /// String or character literal, quotes included
    Str,
    Punct,
    Space,
    Comment,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    pub text: String,
    /// Byte offset in the tokenized text
    pub start: usize,
}

impl Token {
    pub fn is_ident(&self, name: &str) -> bool {
        self.kind == TokenKind::Ident && self.text == name
    }

    pub fn is_punct(&self, punct: &str) -> bool {
        self.kind == TokenKind::Punct && self.text == punct
    }

    pub fn is_trivia(&self) -> bool {
        matches!(self.kind, TokenKind::Space | TokenKind::Comment)
    }
}

const TWO_CHAR_PUNCT: &[&str] = &[
    "==", "!=", "<=", ">=", "&&", "||", "++", "--", "+=", "-=", "*=", "/=", "<<", ">>", "->", "::",
];

pub fn tokenize(src: &str) -> Vec<Token> {
    let bytes = src.as_bytes();
    let len = bytes.len();
    let mut tokens = Vec::new();
    let mut pos = 0;

    while pos < len {
        let start = pos;
        let c = bytes[pos];

        let kind = if c.is_ascii_whitespace() {
            while pos < len && bytes[pos].is_ascii_whitespace() {
                pos += 1;
            }
            TokenKind::Space
        } else if c == b'/' && bytes.get(pos + 1) == Some(&b'/') {
            while pos < len && bytes[pos] != b'\n' {
                pos += 1;
            }
            TokenKind::Comment
        } else if c == b'/' && bytes.get(pos + 1) == Some(&b'*') {
            pos += 2;
            while pos < len && !(bytes[pos] == b'*' && bytes.get(pos + 1) == Some(&b'/')) {
                pos += 1;
            }
            pos = (pos + 2).min(len);
            TokenKind::Comment
        } else if c == b'"' || c == b'\'' {
            pos += 1;
            while pos < len && bytes[pos] != c && bytes[pos] != b'\n' {
                if bytes[pos] == b'\\' {
                    pos += 1;
                }
                pos += 1;
            }
            pos = (pos + 1).min(len);
            TokenKind::Str
        } else if c.is_ascii_alphabetic() || c == b'_' {
            while pos < len && (bytes[pos].is_ascii_alphanumeric() || bytes[pos] == b'_') {
                pos += 1;
            }
            TokenKind::Ident
        } else if c.is_ascii_digit()
            || (c == b'.' && bytes.get(pos + 1).is_some_and(|b| b.is_ascii_digit()))
        {
            while pos < len && (bytes[pos].is_ascii_alphanumeric() || bytes[pos] == b'.' || bytes[pos] == b'_') {
                pos += 1;
            }
            TokenKind::Number
        } else if !c.is_ascii() {
            // Keep multi-byte characters whole
            pos += 1;
            while pos < len && !src.is_char_boundary(pos) {
                pos += 1;
            }
            TokenKind::Punct
        } else {
            let two = src.get(pos..pos + 2).unwrap_or("");
            pos += if TWO_CHAR_PUNCT.contains(&two) { 2 } else { 1 };
            TokenKind::Punct
        };

        tokens.push(Token {
            kind,
            text: src[start..pos].to_string(),
            start,
        });
    }

    tokens
}

pub fn render(tokens: &[Token]) -> String {
    tokens.iter().map(|t| t.text.as_str()).collect()
}

/// Remove comments, keeping the line breaks of block comments
pub fn strip_comments(src: &str) -> String {
    tokenize(src)
        .into_iter()
        .map(|token| match token.kind {
            TokenKind::Comment => token.text.chars().filter(|c| *c == '\n').collect(),
            _ => token.text,
        })
        .collect()
}

/// Index of the first non-trivia token at or after `from`
pub fn next_significant(tokens: &[Token], from: usize) -> Option<usize> {
    (from..tokens.len()).find(|&i| !tokens[i].is_trivia())
}

/// Index of the last non-trivia token strictly before `before`
pub fn prev_significant(tokens: &[Token], before: usize) -> Option<usize> {
    (0..before.min(tokens.len())).rev().find(|&i| !tokens[i].is_trivia())
}

/// Index of the bracket closing the one at `open`
pub fn matching_close(tokens: &[Token], open: usize) -> Option<usize> {
    let (open_text, close_text) = match tokens.get(open)?.text.as_str() {
        "(" => ("(", ")"),
        "{" => ("{", "}"),
        "[" => ("[", "]"),
        _ => return None,
    };

    let mut depth = 0usize;
    for (i, token) in tokens.iter().enumerate().skip(open) {
        if token.is_punct(open_text) {
            depth += 1;
        } else if token.is_punct(close_text) {
            depth -= 1;
            if depth == 0 {
                return Some(i);
            }
        }
    }
    None
}

/// Split the tokens between a call's parentheses at top-level commas
pub fn split_args(inner: &[Token]) -> Vec<String> {
    if inner.iter().all(Token::is_trivia) {
        return Vec::new();
    }

    let mut args = Vec::new();
    let mut depth = 0usize;
    let mut current = String::new();
    for token in inner {
        match token.text.as_str() {
            "(" | "[" | "{" if token.kind == TokenKind::Punct => depth += 1,
            ")" | "]" | "}" if token.kind == TokenKind::Punct => depth = depth.saturating_sub(1),
            "," if token.kind == TokenKind::Punct && depth == 0 => {
                args.push(current.trim().to_string());
                current.clear();
                continue;
            }
            _ => {}
        }
        current.push_str(&token.text);
    }
    args.push(current.trim().to_string());
    args
}

/// True if `text` is a single identifier
pub fn is_identifier(text: &str) -> bool {
    let mut chars = text.chars();
    matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// Parse a decimal integer literal made of digits only
pub fn parse_int_literal(text: &str) -> Option<u32> {
    if text.is_empty() || !text.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    text.parse().ok()
}

/// Parse a numeric literal, ignoring C integer/float suffixes (`1000UL`, `2.5f`)
pub fn parse_numeric_literal(text: &str) -> Option<f64> {
    if text.starts_with("0x") || text.starts_with("0X") {
        let digits = text[2..].trim_end_matches(['u', 'U', 'l', 'L']);
        return i64::from_str_radix(digits, 16).ok().map(|v| v as f64);
    }
    text.trim_end_matches(['u', 'U', 'l', 'L', 'f', 'F']).parse().ok()
}
