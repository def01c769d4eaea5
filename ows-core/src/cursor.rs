//! One-token lookahead over the tokenizer.
//!
//! The cursor drops whitespace and comments, turns identifiers from the
//! keyword table into keywords and builds the syntax errors the parser
//! reports.

use crate::error::CoreError;
use crate::lexer::{Position, Token, TokenKind, Tokenizer};
use crate::vocabulary::Vocabulary;

pub struct TokenCursor<'src> {
    tokenizer: Tokenizer<'src>,
    vocabulary: &'src Vocabulary,
    peeked: Option<Token>,
}

impl<'src> TokenCursor<'src> {
    pub fn new(source: &'src str, vocabulary: &'src Vocabulary) -> Self {
        TokenCursor {
            tokenizer: Tokenizer::new(source, vocabulary),
            vocabulary,
            peeked: None,
        }
    }

    /// Returns the next significant token without consuming it.
    pub fn peek(&mut self) -> Result<Option<&Token>, CoreError> {
        if self.peeked.is_none() {
            self.peeked = self.pull()?;
        }
        Ok(self.peeked.as_ref())
    }

    /// Consumes the next significant token.
    pub fn next_token(&mut self) -> Result<Option<Token>, CoreError> {
        match self.peeked.take() {
            Some(token) => Ok(Some(token)),
            None => self.pull(),
        }
    }

    /// Consumes the next token, failing with `expected` in the message when
    /// the input has ended.
    pub fn advance(&mut self, expected: &str) -> Result<Token, CoreError> {
        self.next_token()?.ok_or_else(|| CoreError::UnexpectedEof {
            expected: expected.to_string(),
        })
    }

    pub fn eof(&mut self) -> Result<bool, CoreError> {
        Ok(self.peek()?.is_none())
    }

    /// True when the next token has `kind` and one of `accepted` as text.
    pub fn peek_is(&mut self, kind: TokenKind, accepted: &[&str]) -> Result<bool, CoreError> {
        Ok(self
            .peek()?
            .is_some_and(|token| token.kind == kind && accepted.contains(&token.text.as_str())))
    }

    pub fn peek_kind(&mut self, kind: TokenKind) -> Result<bool, CoreError> {
        Ok(self.peek()?.is_some_and(|token| token.kind == kind))
    }

    /// Consumes the next token if it matches, or fails with an
    /// expected-vs-actual syntax error.
    pub fn expect(&mut self, kind: TokenKind, accepted: &[&str]) -> Result<Token, CoreError> {
        let expected = describe_expected(accepted);
        let token = self.advance(&expected)?;
        if token.kind == kind && accepted.contains(&token.text.as_str()) {
            Ok(token)
        } else {
            Err(syntax_error(&token, format!("expected {expected} but got {token}")))
        }
    }

    pub fn expect_operator(&mut self, operator: &str) -> Result<Token, CoreError> {
        self.expect(TokenKind::Operator, &[operator])
    }

    pub fn expect_identifier(&mut self) -> Result<Token, CoreError> {
        let token = self.advance("an identifier")?;
        if token.kind == TokenKind::Identifier {
            Ok(token)
        } else {
            Err(syntax_error(
                &token,
                format!("expected an identifier but got {token}"),
            ))
        }
    }

    pub fn expect_semicolon(&mut self) -> Result<(), CoreError> {
        let token = self.advance("';'")?;
        if token.is(TokenKind::Operator, ";") {
            Ok(())
        } else {
            Err(syntax_error(&token, "missing ;".to_string()))
        }
    }

    /// Parses `open element (separator element)* close`.
    ///
    /// An empty list and a separator directly before `close` are both
    /// accepted.
    pub fn delimited<T>(
        &mut self,
        open: &str,
        close: &str,
        separator: &str,
        mut element: impl FnMut(&mut Self) -> Result<T, CoreError>,
    ) -> Result<Vec<T>, CoreError> {
        self.expect_operator(open)?;
        let mut items = Vec::new();
        let mut first = true;
        while !self.eof()? {
            if self.peek_is(TokenKind::Operator, &[close])? {
                break;
            }
            if first {
                first = false;
            } else {
                self.expect_operator(separator)?;
            }
            if self.peek_is(TokenKind::Operator, &[close])? {
                break;
            }
            items.push(element(self)?);
        }
        self.expect_operator(close)?;
        Ok(items)
    }

    /// Position of the next token, or of the end of input.
    pub fn position(&mut self) -> Result<Position, CoreError> {
        let end = self.end_position();
        Ok(self.peek()?.map_or(end, |token| token.position))
    }

    fn end_position(&self) -> Position {
        let source = self.tokenizer.source();
        let line = source.matches('\n').count() + 1;
        let column = source.rsplit('\n').next().map_or(0, |last| last.chars().count()) + 1;
        Position {
            offset: source.len(),
            line,
            column,
        }
    }

    fn pull(&mut self) -> Result<Option<Token>, CoreError> {
        for token in self.tokenizer.by_ref() {
            let mut token = token?;
            match token.kind {
                TokenKind::Ignore => continue,
                TokenKind::Identifier if self.vocabulary.is_keyword(&token.text) => {
                    token.kind = TokenKind::Keyword;
                }
                _ => {}
            }
            return Ok(Some(token));
        }
        Ok(None)
    }
}

pub fn syntax_error(token: &Token, message: String) -> CoreError {
    CoreError::Syntax {
        position: token.position,
        found: token.to_string(),
        message,
    }
}

fn describe_expected(accepted: &[&str]) -> String {
    match accepted {
        [single] => format!("'{single}'"),
        many => {
            let quoted: Vec<String> = many.iter().map(|value| format!("'{value}'")).collect();
            format!("one of {}", quoted.join(","))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn peek_is_idempotent_and_skips_whitespace() {
        let vocabulary = Vocabulary::standard();
        let mut cursor = TokenCursor::new("  // note\n  foo bar", &vocabulary);
        let first = cursor.peek().expect("peek").cloned();
        let second = cursor.peek().expect("peek").cloned();
        assert_eq!(first, second);
        assert_eq!(first.expect("token").text, "foo");
        assert_eq!(cursor.next_token().expect("next").expect("token").text, "foo");
        assert_eq!(cursor.next_token().expect("next").expect("token").text, "bar");
        assert!(cursor.eof().expect("eof"));
    }

    #[test]
    fn reclassifies_keywords() {
        let vocabulary = Vocabulary::standard();
        let mut cursor = TokenCursor::new("rule ruler", &vocabulary);
        let rule = cursor.next_token().expect("next").expect("token");
        let ruler = cursor.next_token().expect("next").expect("token");
        assert_eq!(rule.kind, TokenKind::Keyword);
        assert_eq!(ruler.kind, TokenKind::Identifier);
    }

    #[test]
    fn expect_reports_expected_and_found() {
        let vocabulary = Vocabulary::standard();
        let mut cursor = TokenCursor::new(";", &vocabulary);
        let err = cursor
            .expect(TokenKind::Keyword, &["global", "player"])
            .unwrap_err();
        match err {
            CoreError::Syntax { found, message, .. } => {
                assert_eq!(found, "operator ';'");
                assert_eq!(message, "expected one of 'global','player' but got operator ';'");
            }
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn delimited_accepts_empty_and_trailing_separator() {
        let vocabulary = Vocabulary::standard();
        let mut cursor = TokenCursor::new("() (a, b,)", &vocabulary);
        let empty = cursor
            .delimited("(", ")", ",", |c| c.expect_identifier())
            .expect("empty list");
        assert!(empty.is_empty());
        let items = cursor
            .delimited("(", ")", ",", |c| c.expect_identifier())
            .expect("list");
        let names: Vec<_> = items.iter().map(|t| t.text.as_str()).collect();
        assert_eq!(names, vec!["a", "b"]);
    }

    #[test]
    fn delimited_requires_separator() {
        let vocabulary = Vocabulary::standard();
        let mut cursor = TokenCursor::new("(a b)", &vocabulary);
        let err = cursor
            .delimited("(", ")", ",", |c| c.expect_identifier())
            .unwrap_err();
        assert!(matches!(err, CoreError::Syntax { .. }));
    }

    #[test]
    fn missing_input_is_unexpected_eof() {
        let vocabulary = Vocabulary::standard();
        let mut cursor = TokenCursor::new("(a,", &vocabulary);
        let err = cursor
            .delimited("(", ")", ",", |c| c.expect_identifier())
            .unwrap_err();
        assert!(matches!(err, CoreError::UnexpectedEof { .. }));
    }
}
