//! Tokenizer for OWS source text.
//!
//! Tokens are produced lazily, one per call to [`Tokenizer::next_token`]
//! (or through the `Iterator` impl). Whitespace and comments come out as
//! [`TokenKind::Ignore`] tokens; the token cursor filters them before the
//! parser sees anything.

use std::fmt;

use crate::error::CoreError;
use crate::vocabulary::Vocabulary;

/// Kind of a token produced by the tokenizer.
///
/// Identifiers are only turned into keywords by the token cursor, so the
/// tokenizer itself never yields [`TokenKind::Keyword`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    Identifier,
    Keyword,
    Number,
    String,
    Operator,
    /// Whitespace or a `//` comment.
    Ignore,
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TokenKind::Identifier => "identifier",
            TokenKind::Keyword => "keyword",
            TokenKind::Number => "number",
            TokenKind::String => "string",
            TokenKind::Operator => "operator",
            TokenKind::Ignore => "whitespace",
        };
        f.write_str(name)
    }
}

/// Location of a token in the source. Line and column are 1-based.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Position {
    pub offset: usize,
    pub line: usize,
    pub column: usize,
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "line {} column {}", self.line, self.column)
    }
}

/// A single token.
///
/// For string literals `text` holds the contents without the quotes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    pub text: String,
    pub position: Position,
}

impl Token {
    pub fn is(&self, kind: TokenKind, text: &str) -> bool {
        self.kind == kind && self.text == text
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} '{}'", self.kind, self.text)
    }
}

pub struct Tokenizer<'src> {
    source: &'src str,
    vocabulary: &'src Vocabulary,
    index: usize,
    line: usize,
    column: usize,
}

impl<'src> Tokenizer<'src> {
    pub fn new(source: &'src str, vocabulary: &'src Vocabulary) -> Self {
        Tokenizer {
            source,
            vocabulary,
            index: 0,
            line: 1,
            column: 1,
        }
    }

    /// Rewinds to the start of the source.
    pub fn reset(&mut self) {
        self.index = 0;
        self.line = 1;
        self.column = 1;
    }

    pub fn source(&self) -> &'src str {
        self.source
    }

    /// Lexes the next token, or returns `None` at the end of the source.
    ///
    /// Categories are tried in a fixed order: identifier, number, string,
    /// whitespace/comment, operator. Anything else is a lex error, after
    /// which the tokenizer is exhausted.
    pub fn next_token(&mut self) -> Option<Result<Token, CoreError>> {
        let rest = &self.source[self.index..];
        let first = rest.chars().next()?;
        let position = self.current_position();

        let scanned = if is_ident_start(first) {
            Some((TokenKind::Identifier, scan_while(rest, is_ident_continue)))
        } else if first.is_ascii_digit() {
            Some((TokenKind::Number, scan_number(rest)))
        } else if first == '"' || first == '\'' {
            scan_string(rest, first).map(|len| (TokenKind::String, len))
        } else if is_line_break(first) {
            Some((TokenKind::Ignore, scan_while(rest, is_line_break)))
        } else if is_blank(first) {
            Some((TokenKind::Ignore, scan_while(rest, is_blank)))
        } else if rest.starts_with("//") {
            Some((TokenKind::Ignore, rest.find(is_line_break).unwrap_or(rest.len())))
        } else {
            self.vocabulary
                .match_operator(rest)
                .map(|operator| (TokenKind::Operator, operator.len()))
        };

        let Some((kind, len)) = scanned else {
            let fragment = first.to_string();
            self.index = self.source.len();
            return Some(Err(CoreError::Lex { position, fragment }));
        };

        let lexeme = &rest[..len];
        self.advance(lexeme);
        let text = match kind {
            TokenKind::String => lexeme[1..len - 1].to_string(),
            _ => lexeme.to_string(),
        };
        log::trace!("lexed {kind} {text:?} at {position}");
        Some(Ok(Token {
            kind,
            text,
            position,
        }))
    }

    fn current_position(&self) -> Position {
        Position {
            offset: self.index,
            line: self.line,
            column: self.column,
        }
    }

    fn advance(&mut self, lexeme: &str) {
        for ch in lexeme.chars() {
            if ch == '\n' {
                self.line += 1;
                self.column = 1;
            } else {
                self.column += 1;
            }
        }
        self.index += lexeme.len();
    }
}

impl Iterator for Tokenizer<'_> {
    type Item = Result<Token, CoreError>;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_token()
    }
}

fn scan_while(input: &str, accept: impl Fn(char) -> bool) -> usize {
    input
        .char_indices()
        .find(|&(_, ch)| !accept(ch))
        .map_or(input.len(), |(index, _)| index)
}

/// `digits [ '.' digits ]`; the dot is only taken when a digit follows it.
fn scan_number(input: &str) -> usize {
    let integer = scan_while(input, |ch| ch.is_ascii_digit());
    let rest = &input[integer..];
    if let Some(fraction) = rest.strip_prefix('.') {
        let digits = scan_while(fraction, |ch| ch.is_ascii_digit());
        if digits > 0 {
            return integer + 1 + digits;
        }
    }
    integer
}

/// Length of a quoted string including both quotes, or `None` when the
/// string is unterminated on its line.
fn scan_string(input: &str, quote: char) -> Option<usize> {
    let mut chars = input.char_indices().skip(1);
    while let Some((index, ch)) = chars.next() {
        match ch {
            '\\' => {
                if let Some((_, escaped)) = chars.next() {
                    if is_line_break(escaped) {
                        return None;
                    }
                }
            }
            ch if is_line_break(ch) => return None,
            ch if ch == quote => return Some(index + ch.len_utf8()),
            _ => {}
        }
    }
    None
}

fn is_line_break(ch: char) -> bool {
    matches!(ch, '\n' | '\r')
}

fn is_blank(ch: char) -> bool {
    matches!(ch, ' ' | '\t')
}

fn is_ident_start(ch: char) -> bool {
    ch.is_ascii_alphabetic() || ch == '_'
}

fn is_ident_continue(ch: char) -> bool {
    is_ident_start(ch) || ch.is_ascii_digit()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lex_all(source: &str) -> Vec<Token> {
        let vocabulary = Vocabulary::standard();
        Tokenizer::new(source, &vocabulary)
            .collect::<Result<Vec<_>, _>>()
            .expect("lex")
            .into_iter()
            .filter(|token| token.kind != TokenKind::Ignore)
            .collect()
    }

    #[test]
    fn classifies_basic_tokens() {
        let tokens = lex_all("var x = 3.25; // trailing comment\nrule");
        let kinds: Vec<_> = tokens.iter().map(|t| t.kind).collect();
        assert_eq!(
            kinds,
            vec![
                TokenKind::Identifier,
                TokenKind::Identifier,
                TokenKind::Operator,
                TokenKind::Number,
                TokenKind::Operator,
                TokenKind::Identifier,
            ]
        );
        assert_eq!(tokens[3].text, "3.25");
        assert_eq!(tokens[5].position.line, 2);
        assert_eq!(tokens[5].position.column, 1);
    }

    #[test]
    fn strips_quotes_from_strings() {
        let tokens = lex_all(r#""first" + 'second'"#);
        assert_eq!(tokens[0].kind, TokenKind::String);
        assert_eq!(tokens[0].text, "first");
        assert_eq!(tokens[2].text, "second");
    }

    #[test]
    fn keeps_escaped_quotes_inside_strings() {
        let tokens = lex_all(r#""say \"hi\"""#);
        assert_eq!(tokens.len(), 1);
        assert_eq!(tokens[0].text, r#"say \"hi\""#);
    }

    #[test]
    fn lexes_multi_character_operators_whole() {
        let tokens = lex_all("a <= b && c != d");
        let operators: Vec<_> = tokens
            .iter()
            .filter(|t| t.kind == TokenKind::Operator)
            .map(|t| t.text.as_str())
            .collect();
        assert_eq!(operators, vec!["<=", "&&", "!="]);
    }

    #[test]
    fn trailing_dot_is_not_part_of_number() {
        let tokens = lex_all("1.x");
        assert_eq!(tokens[0].text, "1");
        assert!(tokens[1].is(TokenKind::Operator, "."));
    }

    #[test]
    fn rejects_unknown_character() {
        let vocabulary = Vocabulary::standard();
        let mut tokenizer = Tokenizer::new("x @", &vocabulary);
        let results: Vec<_> = tokenizer.by_ref().collect();
        let err = results.last().expect("error result").as_ref().unwrap_err();
        match err {
            CoreError::Lex { position, fragment } => {
                assert_eq!(fragment, "@");
                assert_eq!(position.column, 3);
            }
            other => panic!("unexpected error {other:?}"),
        }
        assert!(tokenizer.next_token().is_none());
    }

    #[test]
    fn rejects_unterminated_string() {
        let vocabulary = Vocabulary::standard();
        let result: Result<Vec<_>, _> = Tokenizer::new("\"open\nclose\"", &vocabulary).collect();
        assert!(matches!(result, Err(CoreError::Lex { .. })));
    }

    #[test]
    fn reset_restarts_from_the_beginning() {
        let vocabulary = Vocabulary::standard();
        let mut tokenizer = Tokenizer::new("a b", &vocabulary);
        let first = tokenizer.next_token().expect("token").expect("ok");
        tokenizer.by_ref().for_each(drop);
        tokenizer.reset();
        let again = tokenizer.next_token().expect("token").expect("ok");
        assert_eq!(first, again);
    }
}
