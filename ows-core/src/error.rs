use thiserror::Error;

use crate::lexer::Position;
use crate::scope::Bank;

/// Every way a compilation can fail. The first error aborts the run.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("lex error at {position}: unexpected input {fragment:?}")]
    Lex { position: Position, fragment: String },
    #[error("syntax error at {position}: {message}")]
    Syntax {
        position: Position,
        /// Kind and text of the offending token, e.g. `operator ';'`.
        found: String,
        message: String,
    },
    #[error("syntax error: unexpected end of input, expected {expected}")]
    UnexpectedEof { expected: String },
    #[error("semantic error: {0}")]
    Semantic(#[from] SemanticError),
    #[error("failed to serialize syntax tree: {0}")]
    Serialize(#[from] serde_json::Error),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SemanticError {
    #[error("variable '{0}' is not declared")]
    Undeclared(String),
    #[error("'{0}' is already declared")]
    Duplicate(String),
    #[error("cannot assign to constant '{0}'")]
    ConstantReassignment(String),
    #[error("cannot store a value of type '{ty}' in variable '{name}'")]
    EnumAssignment { name: String, ty: String },
    #[error("cannot declare variable '{name}' with type '{ty}'")]
    InvalidVariableType { name: String, ty: String },
    #[error(
        "'{method}' expects {expected} arguments but received {found} (argument {position})"
    )]
    ArgumentCount {
        method: String,
        expected: usize,
        found: usize,
        /// First missing or first surplus argument, 1-based.
        position: usize,
    },
    #[error("argument {position} of '{method}' expects type '{expected}' but got '{found}'")]
    ArgumentType {
        method: String,
        position: usize,
        expected: String,
        found: String,
    },
    #[error("argument {position} of '{method}' does not produce a value")]
    VoidArgument { method: String, position: usize },
    #[error("cannot convert '{from}' to '{to}' implicitly")]
    Conversion { from: String, to: String },
    #[error("unknown type '{0}'")]
    UnknownType(String),
    #[error("unknown enum '{0}'")]
    UnknownEnum(String),
    #[error("enum '{enum_name}' has no member '{member}'")]
    UnknownEnumMember { enum_name: String, member: String },
    #[error("unknown event target '{0}'")]
    UnknownEventTarget(String),
    #[error("'{0}' cannot be used as a rule condition, expected a comparison")]
    InvalidCondition(String),
    #[error("operator '{operator}' cannot be applied to '{left}' and '{right}'")]
    InvalidOperands {
        operator: String,
        left: String,
        right: String,
    },
    #[error("cannot negate a value of type '{0}'")]
    InvalidNegation(String),
    #[error("{0} does not produce a value")]
    NotAValue(String),
    #[error("'{0}' is not a known action")]
    UnknownAction(String),
    #[error("'{0}' is not a known value")]
    UnknownValue(String),
    #[error("the callee of a call must be a plain identifier, got {0}")]
    InvalidCallee(String),
    #[error("'{0}' cannot be called on a receiver")]
    UnexpectedReceiver(String),
    #[error("'{method}' cannot be called on a value of type '{found}'")]
    InvalidReceiver { method: String, found: String },
    #[error("member '{member}' requires a player receiver, got '{found}'")]
    InvalidMemberReceiver { member: String, found: String },
    #[error("an if expression used as a value needs an else branch")]
    MissingElse,
    #[error("{construct} is not allowed {context}")]
    Unsupported {
        construct: String,
        context: &'static str,
    },
    #[error("bank {0} has no free slots left")]
    BankOverflow(Bank),
}
