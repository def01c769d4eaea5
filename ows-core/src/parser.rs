use crate::ast::{BinaryOp, Declaration, Domain, Node, Rule};
use crate::builtins::EVENT_ENUM;
use crate::cursor::{TokenCursor, syntax_error};
use crate::error::CoreError;
use crate::lexer::{Token, TokenKind};
use crate::scope::Bank;
use crate::vocabulary::Vocabulary;

/// Parses a whole program with the standard vocabulary.
pub fn parse(source: &str) -> Result<Node, CoreError> {
    parse_with(source, &Vocabulary::standard())
}

pub fn parse_with(source: &str, vocabulary: &Vocabulary) -> Result<Node, CoreError> {
    let mut cursor = TokenCursor::new(source, vocabulary);
    parse_top_level(&mut cursor)
}

/// Expressions separated by `;`. The last one may omit its terminator.
fn parse_top_level(cursor: &mut TokenCursor) -> Result<Node, CoreError> {
    let mut statements = Vec::new();
    while !cursor.eof()? {
        statements.push(parse_expression(cursor)?);
        if !cursor.eof()? {
            cursor.expect_semicolon()?;
        }
    }
    Ok(Node::Block { statements })
}

fn parse_expression(cursor: &mut TokenCursor) -> Result<Node, CoreError> {
    let atom = parse_atom(cursor)?;
    let expr = parse_binary(cursor, atom, 0)?;
    parse_call_chain(cursor, expr)
}

fn parse_atom(cursor: &mut TokenCursor) -> Result<Node, CoreError> {
    let atom = parse_atom_inner(cursor)?;
    parse_call_chain(cursor, atom)
}

fn parse_atom_inner(cursor: &mut TokenCursor) -> Result<Node, CoreError> {
    let Some(token) = cursor.peek()?.cloned() else {
        return Err(CoreError::UnexpectedEof {
            expected: "an expression".to_string(),
        });
    };
    match (token.kind, token.text.as_str()) {
        (TokenKind::Operator, "(") => {
            cursor.advance("'('")?;
            let inner = parse_expression(cursor)?;
            cursor.expect_operator(")")?;
            Ok(inner)
        }
        (TokenKind::Operator, "{") => parse_block(cursor),
        (TokenKind::Keyword, "if") => parse_if(cursor),
        (TokenKind::Keyword, "const") => parse_const(cursor),
        (TokenKind::Keyword, "rule") => parse_rule(cursor),
        (TokenKind::Keyword, "true" | "false") => parse_boolean(cursor),
        (TokenKind::Operator, "!") => parse_negation(cursor),
        (TokenKind::Keyword, "usevar") => {
            cursor.advance("usevar")?;
            parse_usevar(cursor)
        }
        (TokenKind::Identifier, _) | (TokenKind::Keyword, "player" | "var") => {
            let leading = cursor.advance("an identifier")?;
            if cursor.peek_kind(TokenKind::Identifier)?
                || cursor.peek_is(TokenKind::Keyword, &["player"])?
            {
                parse_declaration(cursor, leading)
            } else {
                parse_identifier(cursor, leading)
            }
        }
        (TokenKind::Number, _) => {
            cursor.advance("a number")?;
            Ok(Node::Number { value: token.text })
        }
        (TokenKind::String, _) => {
            cursor.advance("a string")?;
            Ok(Node::String { value: token.text })
        }
        _ => {
            cursor.advance("an expression")?;
            Err(syntax_error(&token, format!("unexpected {token}")))
        }
    }
}

/// Precedence climbing: an operator is taken only when it binds tighter
/// than `min_precedence`.
fn parse_binary(
    cursor: &mut TokenCursor,
    left: Node,
    min_precedence: u8,
) -> Result<Node, CoreError> {
    let operator = cursor
        .peek()?
        .filter(|token| token.kind == TokenKind::Operator)
        .and_then(|token| BinaryOp::from_symbol(&token.text));
    let Some(operator) = operator else {
        return Ok(left);
    };
    if operator.precedence() <= min_precedence {
        return Ok(left);
    }
    cursor.advance(operator.symbol())?;
    let atom = parse_atom(cursor)?;
    let right = parse_binary(cursor, atom, operator.precedence())?;
    let binary = Node::Binary {
        operator,
        left: Box::new(left),
        right: Box::new(right),
    };
    parse_binary(cursor, binary, min_precedence)
}

/// Turns `expr(args)` into a call. A `.` after the call makes the call the
/// innermost receiver of the chain that follows, and that chain is returned.
fn parse_call_chain(cursor: &mut TokenCursor, expr: Node) -> Result<Node, CoreError> {
    if !cursor.peek_is(TokenKind::Operator, &["("])? {
        return Ok(expr);
    }
    let args = cursor.delimited("(", ")", ",", parse_expression)?;
    let call = Node::Call {
        callee: Box::new(expr),
        scope: None,
        args,
    };
    if !cursor.peek_is(TokenKind::Operator, &["."])? {
        return Ok(call);
    }
    let dot = cursor.advance("'.'")?;
    let mut chain = parse_atom(cursor)?;
    attach_scope(&mut chain, call, &dot)?;
    Ok(chain)
}

/// Sets `receiver` as the scope of the deepest unscoped node of `target`.
fn attach_scope(target: &mut Node, receiver: Node, dot: &Token) -> Result<(), CoreError> {
    match target {
        Node::Identifier { scope, .. } | Node::Call { scope, .. } | Node::Assign { scope, .. } => {
            if let Some(inner) = scope {
                return attach_scope(inner, receiver, dot);
            }
            *scope = Some(Box::new(receiver));
            Ok(())
        }
        other => Err(syntax_error(
            dot,
            format!("{} cannot be accessed through '.'", other.describe()),
        )),
    }
}

fn parse_identifier(cursor: &mut TokenCursor, token: Token) -> Result<Node, CoreError> {
    if cursor.peek_is(TokenKind::Operator, &["="])? {
        return parse_assign(cursor, token);
    }
    let node = match token.kind {
        TokenKind::Identifier => Node::identifier(token.text.as_str()),
        TokenKind::Keyword if token.text == "player" => Node::Player,
        _ => {
            return Err(syntax_error(
                &token,
                format!("expected an identifier but got {token}"),
            ));
        }
    };
    if !cursor.peek_is(TokenKind::Operator, &["."])? {
        return Ok(node);
    }
    let dot = cursor.advance("'.'")?;

    // `Enum.member` where the member is spelled like a keyword.
    if let Node::Identifier { name, .. } = &node {
        let keyword_member = cursor
            .peek()?
            .filter(|next| next.kind == TokenKind::Keyword && next.text != "player")
            .map(|next| next.text.clone());
        if let Some(member) = keyword_member {
            cursor.advance("an enum member")?;
            return Ok(Node::EnumRef {
                enum_name: name.clone(),
                member,
            });
        }
    }

    let mut member = parse_atom(cursor)?;
    attach_scope(&mut member, node, &dot)?;
    Ok(member)
}

fn parse_assign(cursor: &mut TokenCursor, target: Token) -> Result<Node, CoreError> {
    cursor.expect_operator("=")?;
    if target.kind != TokenKind::Identifier {
        return Err(syntax_error(
            &target,
            format!("expected an identifier but got {target}"),
        ));
    }
    let atom = parse_atom(cursor)?;
    let value = parse_binary(cursor, atom, 0)?;
    Ok(Node::Assign {
        target: target.text,
        scope: None,
        value: Box::new(value),
    })
}

/// `TYPE [player.] NAME [= expr]`, with `TYPE` already consumed.
fn parse_declaration(cursor: &mut TokenCursor, var_type: Token) -> Result<Node, CoreError> {
    let mut actor_scoped = false;
    if cursor.peek_is(TokenKind::Keyword, &["player"])? {
        cursor.advance("player")?;
        cursor.expect_operator(".")?;
        actor_scoped = true;
    }
    let name = cursor.expect_identifier()?;
    let init = if cursor.peek_is(TokenKind::Operator, &["="])? {
        cursor.advance("'='")?;
        let atom = parse_atom(cursor)?;
        Some(Box::new(parse_binary(cursor, atom, 0)?))
    } else {
        None
    };
    Ok(Node::Declare(Declaration {
        var_type: var_type.text,
        name: name.text,
        actor_scoped,
        init,
    }))
}

fn parse_if(cursor: &mut TokenCursor) -> Result<Node, CoreError> {
    cursor.expect(TokenKind::Keyword, &["if"])?;
    let condition = parse_expression(cursor)?;
    let then_branch = parse_expression(cursor)?;
    let else_branch = if cursor.peek_is(TokenKind::Keyword, &["else"])? {
        cursor.advance("else")?;
        Some(Box::new(parse_expression(cursor)?))
    } else {
        None
    };
    Ok(Node::If {
        condition: Box::new(condition),
        then_branch: Box::new(then_branch),
        else_branch,
    })
}

fn parse_block(cursor: &mut TokenCursor) -> Result<Node, CoreError> {
    let statements = cursor.delimited("{", "}", ";", parse_expression)?;
    Ok(Node::Block { statements })
}

fn parse_const(cursor: &mut TokenCursor) -> Result<Node, CoreError> {
    cursor.expect(TokenKind::Keyword, &["const"])?;
    let name = cursor.expect_identifier()?;
    cursor.expect_operator("=")?;
    let atom = parse_atom(cursor)?;
    let value = parse_binary(cursor, atom, 0)?;
    Ok(Node::Const {
        name: name.text,
        value: Box::new(value),
    })
}

/// `rule "name": Event.target(...) [if (cond; ...)] { action; ... }`
fn parse_rule(cursor: &mut TokenCursor) -> Result<Node, CoreError> {
    cursor.expect(TokenKind::Keyword, &["rule"])?;
    let name = cursor.advance("a rule name")?;
    if name.kind != TokenKind::String {
        return Err(syntax_error(
            &name,
            format!("expected a string but got {name}"),
        ));
    }
    cursor.expect_operator(":")?;
    cursor.expect(TokenKind::Identifier, &[EVENT_ENUM])?;
    cursor.expect_operator(".")?;
    let target = cursor.advance("an event target")?;
    if !matches!(target.kind, TokenKind::Identifier | TokenKind::Keyword) {
        return Err(syntax_error(
            &target,
            format!("expected an identifier but got {target}"),
        ));
    }
    // Event arguments are accepted for forward compatibility and ignored.
    cursor.delimited("(", ")", ",", |c| c.advance("an event argument"))?;

    let conditions = if cursor.peek_is(TokenKind::Keyword, &["if"])? {
        cursor.advance("if")?;
        let conditions = cursor.delimited("(", ")", ";", parse_expression)?;
        Some(conditions.into_iter().map(normalize_condition).collect())
    } else {
        None
    };
    let actions = cursor.delimited("{", "}", ";", parse_expression)?;

    Ok(Node::Rule(Rule {
        name: name.text,
        event_target: target.text,
        conditions,
        actions,
    }))
}

/// A condition that is not a binary expression is compared with `true`.
pub fn normalize_condition(condition: Node) -> Node {
    match condition {
        binary @ Node::Binary { .. } => binary,
        other => Node::Binary {
            operator: BinaryOp::Eq,
            left: Box::new(other),
            right: Box::new(Node::Boolean { value: true }),
        },
    }
}

fn parse_boolean(cursor: &mut TokenCursor) -> Result<Node, CoreError> {
    let token = cursor.expect(TokenKind::Keyword, &["true", "false"])?;
    Ok(Node::Boolean {
        value: token.text == "true",
    })
}

fn parse_negation(cursor: &mut TokenCursor) -> Result<Node, CoreError> {
    cursor.expect_operator("!")?;
    let operand = parse_expression(cursor)?;
    Ok(Node::Not {
        operand: Box::new(operand),
    })
}

/// `global|player LETTER`, with `usevar` already consumed.
fn parse_usevar(cursor: &mut TokenCursor) -> Result<Node, CoreError> {
    let domain = cursor.expect(TokenKind::Keyword, &["global", "player"])?;
    let domain = if domain.text == "global" {
        Domain::Global
    } else {
        Domain::Player
    };
    let letter = cursor.advance("a bank letter")?;
    let bank = match letter.text.chars().collect::<Vec<_>>().as_slice() {
        [single] if letter.kind == TokenKind::Identifier => Bank::from_letter(*single),
        _ => None,
    };
    let Some(bank) = bank else {
        return Err(syntax_error(
            &letter,
            format!("expected one of ABCDEFGHIJKLMNOPQRSTUVWXYZ but got {letter}"),
        ));
    };
    Ok(Node::UseVar { domain, bank })
}
