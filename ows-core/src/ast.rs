//! Syntax tree produced by the parser.
//!
//! The tree serializes to JSON for the debug artifact written by the CLI;
//! every node carries its variant name in a `type` field.

use serde::{Serialize, Serializer};

use crate::scope::Bank;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum Node {
    Block {
        statements: Vec<Node>,
    },
    Const {
        name: String,
        value: Box<Node>,
    },
    Declare(Declaration),
    UseVar {
        domain: Domain,
        bank: Bank,
    },
    Rule(Rule),
    Assign {
        target: String,
        scope: Option<Box<Node>>,
        value: Box<Node>,
    },
    Call {
        callee: Box<Node>,
        scope: Option<Box<Node>>,
        args: Vec<Node>,
    },
    EnumRef {
        enum_name: String,
        member: String,
    },
    Not {
        operand: Box<Node>,
    },
    Binary {
        operator: BinaryOp,
        left: Box<Node>,
        right: Box<Node>,
    },
    If {
        condition: Box<Node>,
        then_branch: Box<Node>,
        else_branch: Option<Box<Node>>,
    },
    Number {
        value: String,
    },
    String {
        value: String,
    },
    Boolean {
        value: bool,
    },
    Player,
    Identifier {
        name: String,
        scope: Option<Box<Node>>,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Declaration {
    /// `var` or the name of a concrete type.
    pub var_type: String,
    pub name: String,
    /// Declared as `TYPE player.NAME`.
    pub actor_scoped: bool,
    pub init: Option<Box<Node>>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Rule {
    pub name: String,
    pub event_target: String,
    pub conditions: Option<Vec<Node>>,
    pub actions: Vec<Node>,
}

/// Storage domain selected by `usevar`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Domain {
    Global,
    Player,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Or,
    And,
    Lt,
    Gt,
    Le,
    Ge,
    Eq,
    Ne,
    Add,
    Sub,
    Mul,
    Div,
    Rem,
}

impl BinaryOp {
    pub fn from_symbol(symbol: &str) -> Option<Self> {
        let op = match symbol {
            "||" => BinaryOp::Or,
            "&&" => BinaryOp::And,
            "<" => BinaryOp::Lt,
            ">" => BinaryOp::Gt,
            "<=" => BinaryOp::Le,
            ">=" => BinaryOp::Ge,
            "==" => BinaryOp::Eq,
            "!=" => BinaryOp::Ne,
            "+" => BinaryOp::Add,
            "-" => BinaryOp::Sub,
            "*" => BinaryOp::Mul,
            "/" => BinaryOp::Div,
            "%" => BinaryOp::Rem,
            _ => return None,
        };
        Some(op)
    }

    pub fn symbol(self) -> &'static str {
        match self {
            BinaryOp::Or => "||",
            BinaryOp::And => "&&",
            BinaryOp::Lt => "<",
            BinaryOp::Gt => ">",
            BinaryOp::Le => "<=",
            BinaryOp::Ge => ">=",
            BinaryOp::Eq => "==",
            BinaryOp::Ne => "!=",
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Mul => "*",
            BinaryOp::Div => "/",
            BinaryOp::Rem => "%",
        }
    }

    /// Binding strength used by precedence climbing; higher binds tighter.
    pub fn precedence(self) -> u8 {
        match self {
            BinaryOp::Or => 2,
            BinaryOp::And => 3,
            BinaryOp::Lt
            | BinaryOp::Gt
            | BinaryOp::Le
            | BinaryOp::Ge
            | BinaryOp::Eq
            | BinaryOp::Ne => 4,
            BinaryOp::Add | BinaryOp::Sub => 5,
            BinaryOp::Mul | BinaryOp::Div | BinaryOp::Rem => 6,
        }
    }

    pub fn is_comparison(self) -> bool {
        self.precedence() == 4
    }
}

impl Serialize for BinaryOp {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.symbol())
    }
}

impl Node {
    pub fn identifier(name: impl Into<String>) -> Self {
        Node::Identifier {
            name: name.into(),
            scope: None,
        }
    }

    /// Short description used in diagnostics.
    pub fn describe(&self) -> String {
        match self {
            Node::Block { .. } => "a block".to_string(),
            Node::Const { name, .. } => format!("constant '{name}'"),
            Node::Declare(decl) => format!("declaration of '{}'", decl.name),
            Node::UseVar { .. } => "usevar".to_string(),
            Node::Rule(rule) => format!("rule \"{}\"", rule.name),
            Node::Assign { target, .. } => format!("assignment to '{target}'"),
            Node::Call { callee, .. } => format!("call to {}", callee.describe()),
            Node::EnumRef { enum_name, member } => format!("'{enum_name}.{member}'"),
            Node::Not { .. } => "a negation".to_string(),
            Node::Binary { operator, .. } => format!("operator '{}'", operator.symbol()),
            Node::If { .. } => "an if expression".to_string(),
            Node::Number { value } => format!("number {value}"),
            Node::String { value } => format!("string \"{value}\""),
            Node::Boolean { value } => format!("boolean {value}"),
            Node::Player => "'player'".to_string(),
            Node::Identifier { name, .. } => format!("'{name}'"),
        }
    }
}
