//! Keyword and operator tables of the source language.
//!
//! The tokenizer builds its operator matcher from these tables and the
//! token cursor uses the keyword set to reclassify identifiers, so the
//! parser never decides on its own which words are reserved.

pub const KEYWORDS: &[&str] = &[
    "usevar", "global", "player", "var", "const", "rule", "if", "else", "in", "true", "false",
    "null",
];

pub const OPERATORS: &[&str] = &[
    "==", "!=", "!", "<", ">", ">=", "<=", "&&", "||", ":", "=", "+", "-", "*", "/", "%", "^",
    "+=", "-=", "*=", "/=", "^=", "(", ")", "[", "]", "{", "}", ".", ",", ";",
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Vocabulary {
    keywords: Vec<&'static str>,
    /// Longest first, so the first prefix match is the longest match.
    operators: Vec<&'static str>,
}

impl Vocabulary {
    pub fn new(keywords: &[&'static str], operators: &[&'static str]) -> Self {
        let mut operators = operators.to_vec();
        operators.sort_by(|a, b| b.len().cmp(&a.len()));
        operators.dedup();
        Vocabulary {
            keywords: keywords.to_vec(),
            operators,
        }
    }

    pub fn standard() -> Self {
        Vocabulary::new(KEYWORDS, OPERATORS)
    }

    pub fn is_keyword(&self, text: &str) -> bool {
        self.keywords.contains(&text)
    }

    /// Returns the longest operator that `input` starts with.
    pub fn match_operator(&self, input: &str) -> Option<&'static str> {
        self.operators
            .iter()
            .copied()
            .find(|operator| input.starts_with(operator))
    }
}

impl Default for Vocabulary {
    fn default() -> Self {
        Vocabulary::standard()
    }
}
