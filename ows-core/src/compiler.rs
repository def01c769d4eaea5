use std::collections::HashMap;

use crate::ast::{BinaryOp, Declaration, Domain, Node, Rule};
use crate::builtins::{BuiltinDescriptor, Catalog, EVENT_ENUM, GLOBAL_EVENT};
use crate::codegen::{self, EVENT_PLAYER, Line, RuleLayout, statement};
use crate::error::{CoreError, SemanticError};
use crate::parser::parse;
use crate::scope::{ActorDomain, Bank, ScopeStack, Variable};
use crate::types::{self, BOOLEAN, CompiledNode, DYNAMIC, NUMBER, PLAYER, STRING, Type, VECTOR};

/// Declared type of variables whose type is inferred from their first value.
const VAR_TYPE: &str = "var";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CompileOptions {
    /// Strip all whitespace and lowercase the output.
    pub minify: bool,
}

pub fn compile(source: &str) -> Result<String, CoreError> {
    compile_with(source, &CompileOptions::default())
}

pub fn compile_with(source: &str, options: &CompileOptions) -> Result<String, CoreError> {
    let ast = parse(source)?;
    compile_ast(&ast, options)
}

pub fn compile_ast(ast: &Node, options: &CompileOptions) -> Result<String, CoreError> {
    let mut compiler = Compiler::new(Catalog::standard());
    let output = compiler.compile_program(ast)?;
    if options.minify {
        Ok(codegen::minify(&output))
    } else {
        Ok(output)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CallKind {
    Action,
    Value,
}

/// Semantic pass and code generation over one program.
///
/// Global variables live in the [`ScopeStack`] threaded through every
/// method; constants and per-player variables are program-wide and owned
/// by the compiler.
pub struct Compiler<'c> {
    catalog: &'c Catalog,
    constants: HashMap<String, CompiledNode<'c>>,
    actors: ActorDomain<'c>,
}

impl<'c> Compiler<'c> {
    pub fn new(catalog: &'c Catalog) -> Self {
        Compiler {
            catalog,
            constants: HashMap::new(),
            actors: ActorDomain::new(),
        }
    }

    /// Compiles every rule of `ast`, separated by a blank line.
    pub fn compile_program(&mut self, ast: &Node) -> Result<String, CoreError> {
        let mut scopes = ScopeStack::new();
        let rules = self.dispatch(ast, &mut scopes)?;
        Ok(rules.join("\n\n"))
    }

    fn ty(&self, name: &str) -> Result<&'c Type, SemanticError> {
        self.catalog.types().get(name)
    }

    fn dispatch(
        &mut self,
        node: &Node,
        scopes: &mut ScopeStack<'c>,
    ) -> Result<Vec<String>, SemanticError> {
        match node {
            Node::Block { statements } => {
                let mut rules = Vec::new();
                for item in statements {
                    rules.extend(self.dispatch(item, scopes)?);
                }
                Ok(rules)
            }
            Node::Const { name, value } => {
                self.define_constant(name, value, scopes)?;
                Ok(Vec::new())
            }
            Node::Declare(declaration) => {
                self.declare(declaration, scopes)?;
                Ok(Vec::new())
            }
            Node::Rule(rule) => Ok(vec![self.compile_rule(rule, scopes)?]),
            Node::UseVar { domain, bank } => {
                self.use_bank(*domain, *bank, scopes);
                Ok(Vec::new())
            }
            other => Err(unsupported(other, "at the top level")),
        }
    }

    fn compile_action(
        &mut self,
        node: &Node,
        scopes: &mut ScopeStack<'c>,
    ) -> Result<Vec<Line>, SemanticError> {
        match node {
            Node::Assign {
                target,
                scope,
                value,
            } => {
                let text = self.compile_assign(target, scope.as_deref(), value, scopes)?;
                Ok(vec![statement(text)])
            }
            Node::Block { statements } => {
                scopes.scoped(|scopes| -> Result<Vec<Line>, SemanticError> {
                    let mut lines = Vec::new();
                    for item in statements {
                        lines.extend(self.compile_action(item, scopes)?);
                    }
                    Ok(lines)
                })
            }
            Node::Call {
                callee,
                scope,
                args,
            } => {
                let call =
                    self.compile_call(callee, scope.as_deref(), args, CallKind::Action, scopes)?;
                Ok(vec![statement(call.value)])
            }
            Node::Declare(declaration) => Ok(self
                .declare(declaration, scopes)?
                .map(statement)
                .into_iter()
                .collect()),
            Node::UseVar { domain, bank } => {
                self.use_bank(*domain, *bank, scopes);
                Ok(Vec::new())
            }
            Node::If {
                condition,
                then_branch,
                else_branch,
            } => {
                let condition = self.compile_boolean(condition, scopes)?;
                let mut lines = vec![statement(format!("If({condition})")), Line::Indent];
                lines.extend(self.compile_action(then_branch, scopes)?);
                lines.push(Line::Dedent);
                if let Some(otherwise) = else_branch {
                    lines.extend([statement("Else"), Line::Indent]);
                    lines.extend(self.compile_action(otherwise, scopes)?);
                    lines.push(Line::Dedent);
                }
                lines.push(statement("End"));
                Ok(lines)
            }
            other => Err(unsupported(other, "as an action")),
        }
    }

    fn compile_value(
        &mut self,
        node: &Node,
        scopes: &mut ScopeStack<'c>,
    ) -> Result<CompiledNode<'c>, SemanticError> {
        match node {
            Node::Block { statements } => match statements.as_slice() {
                [single] => self.compile_value(single, scopes),
                _ => Err(unsupported(
                    node,
                    "as a value unless it holds exactly one expression",
                )),
            },
            Node::Call {
                callee,
                scope,
                args,
            } => self.compile_call(callee, scope.as_deref(), args, CallKind::Value, scopes),
            Node::EnumRef { enum_name, member } => self.enum_member(enum_name, member),
            Node::Not { operand } => {
                let operand = self.compile_value(operand, scopes)?;
                let boolean = self.ty(BOOLEAN)?;
                if !boolean.can_resolve(operand.ty) {
                    return Err(SemanticError::InvalidNegation(operand.ty.name().to_string()));
                }
                let inner = boolean.resolve(&operand)?;
                Ok(CompiledNode::new(boolean, format!("Not({inner})")))
            }
            Node::Binary {
                operator,
                left,
                right,
            } => self.compile_binary(*operator, left, right, scopes),
            Node::If {
                condition,
                then_branch,
                else_branch,
            } => {
                let Some(else_branch) = else_branch else {
                    return Err(SemanticError::MissingElse);
                };
                let condition = self.compile_boolean(condition, scopes)?;
                let then_value = self.compile_value(then_branch, scopes)?;
                let else_value = self.compile_value(else_branch, scopes)?;
                // The branch type that accepts the other one types the result.
                let ty = if then_value.ty.is_dynamic()
                    || (!then_value.ty.can_resolve(else_value.ty)
                        && else_value.ty.can_resolve(then_value.ty))
                {
                    else_value.ty
                } else {
                    then_value.ty
                };
                let then_text = ty.resolve(&then_value)?;
                let else_text = ty.resolve(&else_value)?;
                Ok(CompiledNode::new(
                    ty,
                    format!("If-Then-Else({condition}, {then_text}, {else_text})"),
                ))
            }
            Node::Number { value } => Ok(CompiledNode::new(self.ty(NUMBER)?, value.as_str())),
            Node::String { value } => Ok(CompiledNode::new(
                self.ty(STRING)?,
                codegen::custom_string(value),
            )),
            Node::Boolean { value } => Ok(CompiledNode::new(
                self.ty(BOOLEAN)?,
                codegen::boolean(*value),
            )),
            Node::Player => Ok(CompiledNode::new(self.ty(PLAYER)?, EVENT_PLAYER)),
            Node::Identifier { name, scope } => {
                self.compile_identifier(name, scope.as_deref(), scopes)
            }
            other => Err(SemanticError::NotAValue(other.describe())),
        }
    }

    fn compile_boolean(
        &mut self,
        node: &Node,
        scopes: &mut ScopeStack<'c>,
    ) -> Result<String, SemanticError> {
        let value = self.compile_value(node, scopes)?;
        self.ty(BOOLEAN)?.resolve(&value)
    }

    fn lookup_builtin(
        &self,
        name: &str,
        kind: CallKind,
    ) -> Result<&'static BuiltinDescriptor, SemanticError> {
        match kind {
            CallKind::Action => self.catalog.action(name).ok_or_else(|| {
                if self.catalog.value(name).is_some() {
                    SemanticError::Unsupported {
                        construct: format!("value '{name}'"),
                        context: "as an action",
                    }
                } else {
                    SemanticError::UnknownAction(name.to_string())
                }
            }),
            CallKind::Value => self.catalog.value(name).ok_or_else(|| {
                if self.catalog.action(name).is_some() {
                    SemanticError::NotAValue(format!("action '{name}'"))
                } else {
                    SemanticError::UnknownValue(name.to_string())
                }
            }),
        }
    }

    /// Checks and renders a call to a builtin. A receiver becomes the first
    /// argument.
    fn compile_call(
        &mut self,
        callee: &Node,
        receiver: Option<&Node>,
        args: &[Node],
        kind: CallKind,
        scopes: &mut ScopeStack<'c>,
    ) -> Result<CompiledNode<'c>, SemanticError> {
        let Node::Identifier { name, scope: None } = callee else {
            return Err(SemanticError::InvalidCallee(callee.describe()));
        };
        let descriptor = self.lookup_builtin(name, kind)?;

        let mut compiled = Vec::with_capacity(args.len() + 1);
        if let Some(receiver) = receiver {
            if descriptor.scopes.is_empty() {
                return Err(SemanticError::UnexpectedReceiver(name.clone()));
            }
            let receiver = self.compile_value(receiver, scopes)?;
            let mut accepted = false;
            for scope in descriptor.scopes {
                accepted |= self.ty(scope)?.can_resolve(receiver.ty);
            }
            if !accepted {
                return Err(SemanticError::InvalidReceiver {
                    method: name.clone(),
                    found: receiver.ty.name().to_string(),
                });
            }
            compiled.push(receiver);
        }
        for arg in args {
            let value = self.compile_value(arg, scopes)?;
            if value.ty.is_void() {
                return Err(SemanticError::VoidArgument {
                    method: name.clone(),
                    position: compiled.len() + 1,
                });
            }
            compiled.push(value);
        }

        if compiled.len() != descriptor.params.len() {
            return Err(SemanticError::ArgumentCount {
                method: name.clone(),
                expected: descriptor.params.len(),
                found: compiled.len(),
                position: compiled.len().min(descriptor.params.len()) + 1,
            });
        }

        let mut rendered = Vec::with_capacity(compiled.len());
        for (index, (arg, param)) in compiled.iter().zip(descriptor.params).enumerate() {
            let expected = self.ty(param)?;
            if !expected.can_resolve(arg.ty) {
                return Err(SemanticError::ArgumentType {
                    method: name.clone(),
                    position: index + 1,
                    expected: param.to_string(),
                    found: arg.ty.name().to_string(),
                });
            }
            rendered.push(expected.resolve(arg)?);
        }

        let returns = self.ty(descriptor.returns)?;
        Ok(CompiledNode::new(returns, (descriptor.render)(&rendered)))
    }

    fn compile_identifier(
        &mut self,
        name: &str,
        receiver: Option<&Node>,
        scopes: &mut ScopeStack<'c>,
    ) -> Result<CompiledNode<'c>, SemanticError> {
        if let Some(receiver) = receiver {
            if let Node::Identifier {
                name: enum_name,
                scope: None,
            } = receiver
            {
                if self.catalog.enumeration(enum_name).is_some() {
                    return self.enum_member(enum_name, name);
                }
            }
            let actor = self.compile_actor(name, receiver, scopes)?;
            let variable = *self
                .actors
                .resolve(name)
                .ok_or_else(|| SemanticError::Undeclared(name.to_string()))?;
            return Ok(CompiledNode::new(
                variable.ty,
                codegen::actor_read(&actor, variable.slot),
            ));
        }

        if let Some(constant) = self.constants.get(name) {
            return Ok(constant.clone());
        }
        let variable = scopes
            .resolve(name)
            .ok_or_else(|| SemanticError::Undeclared(name.to_string()))?;
        Ok(CompiledNode::new(
            variable.ty,
            codegen::global_read(variable.slot),
        ))
    }

    /// Renders the player whose variable `member` is accessed.
    fn compile_actor(
        &mut self,
        member: &str,
        receiver: &Node,
        scopes: &mut ScopeStack<'c>,
    ) -> Result<String, SemanticError> {
        let actor = self.compile_value(receiver, scopes)?;
        if actor.ty.name() != PLAYER && !actor.ty.is_dynamic() {
            return Err(SemanticError::InvalidMemberReceiver {
                member: member.to_string(),
                found: actor.ty.name().to_string(),
            });
        }
        Ok(actor.value)
    }

    fn compile_assign(
        &mut self,
        target: &str,
        receiver: Option<&Node>,
        value: &Node,
        scopes: &mut ScopeStack<'c>,
    ) -> Result<String, SemanticError> {
        if receiver.is_none() && self.constants.contains_key(target) {
            return Err(SemanticError::ConstantReassignment(target.to_string()));
        }
        let value = self.compile_value(value, scopes)?;
        match receiver {
            Some(receiver) => {
                let actor = self.compile_actor(target, receiver, scopes)?;
                let variable = self
                    .actors
                    .resolve_mut(target)
                    .ok_or_else(|| SemanticError::Undeclared(target.to_string()))?;
                let rendered = store(target, variable, &value)?;
                Ok(codegen::actor_write(&actor, variable.slot, &rendered))
            }
            None => {
                let variable = scopes
                    .resolve_mut(target)
                    .ok_or_else(|| SemanticError::Undeclared(target.to_string()))?;
                let rendered = store(target, variable, &value)?;
                Ok(codegen::global_write(variable.slot, &rendered))
            }
        }
    }

    /// Fails when `name` is a builtin, a constant or a visible variable of
    /// the same domain.
    fn check_available(
        &self,
        name: &str,
        actor_scoped: bool,
        scopes: &ScopeStack<'c>,
    ) -> Result<(), SemanticError> {
        let taken = self.catalog.is_reserved(name)
            || self.constants.contains_key(name)
            || if actor_scoped {
                self.actors.has(name)
            } else {
                scopes.lookup(name).is_some()
            };
        if taken {
            return Err(SemanticError::Duplicate(name.to_string()));
        }
        Ok(())
    }

    /// Allocates a slot for the declared variable and returns the store of
    /// its initial value, if any.
    fn declare(
        &mut self,
        declaration: &Declaration,
        scopes: &mut ScopeStack<'c>,
    ) -> Result<Option<String>, SemanticError> {
        let Declaration {
            var_type,
            name,
            actor_scoped,
            init,
        } = declaration;
        self.check_available(name, *actor_scoped, scopes)?;

        let declared = if var_type == VAR_TYPE {
            self.ty(DYNAMIC)?
        } else {
            self.ty(var_type)?
        };
        if declared.is_enum() || declared.is_void() {
            return Err(SemanticError::InvalidVariableType {
                name: name.clone(),
                ty: var_type.clone(),
            });
        }

        // Compiled before the name exists, so `var x = x` is rejected.
        let initial = match init {
            Some(expr) => Some(self.compile_value(expr, scopes)?),
            None => None,
        };

        let undeclared = || SemanticError::Undeclared(name.clone());
        let (slot, store_initial) = if *actor_scoped {
            let slot = self.actors.declare(name, declared)?;
            let rendered = match &initial {
                Some(value) => {
                    let variable = self.actors.resolve_mut(name).ok_or_else(undeclared)?;
                    let rendered = store(name, variable, value)?;
                    Some(codegen::actor_write(EVENT_PLAYER, slot, &rendered))
                }
                None => None,
            };
            (slot, rendered)
        } else {
            let slot = scopes.declare(name, declared)?;
            let rendered = match &initial {
                Some(value) => {
                    let variable = scopes.resolve_mut(name).ok_or_else(undeclared)?;
                    let rendered = store(name, variable, value)?;
                    Some(codegen::global_write(slot, &rendered))
                }
                None => None,
            };
            (slot, rendered)
        };

        let domain = if *actor_scoped { "player" } else { "global" };
        log::info!("declared {domain} variable '{name}' ({var_type}) at slot {slot}");
        Ok(store_initial)
    }

    fn define_constant(
        &mut self,
        name: &str,
        value: &Node,
        scopes: &mut ScopeStack<'c>,
    ) -> Result<(), SemanticError> {
        self.check_available(name, false, scopes)?;
        let value = self.compile_value(value, scopes)?;
        log::debug!("constant '{name}' = {} ({})", value.value, value.ty);
        self.constants.insert(name.to_string(), value);
        Ok(())
    }

    fn compile_rule(
        &mut self,
        rule: &Rule,
        scopes: &mut ScopeStack<'c>,
    ) -> Result<String, SemanticError> {
        let event = self
            .catalog
            .enumeration(EVENT_ENUM)
            .and_then(|events| events.member(&rule.event_target))
            .ok_or_else(|| SemanticError::UnknownEventTarget(rule.event_target.clone()))?;
        log::debug!("compiling rule {:?} on {}", rule.name, rule.event_target);

        let layout = scopes.scoped(|scopes| -> Result<RuleLayout, SemanticError> {
            let conditions = match &rule.conditions {
                Some(conditions) => {
                    let mut compiled = Vec::with_capacity(conditions.len());
                    for condition in conditions {
                        compiled.push(self.compile_condition(condition, scopes)?);
                    }
                    Some(compiled)
                }
                None => None,
            };
            let mut actions = Vec::new();
            for action in &rule.actions {
                actions.extend(self.compile_action(action, scopes)?);
            }
            Ok(RuleLayout {
                name: rule.name.clone(),
                event: event.to_string(),
                broadcast: rule.event_target != GLOBAL_EVENT,
                conditions,
                actions,
            })
        })?;
        Ok(layout.render())
    }

    /// A rule condition: a single comparison rendered as `left op right`.
    fn compile_condition(
        &mut self,
        node: &Node,
        scopes: &mut ScopeStack<'c>,
    ) -> Result<String, SemanticError> {
        let Node::Binary {
            operator,
            left,
            right,
        } = node
        else {
            return Err(SemanticError::InvalidCondition(node.describe()));
        };
        if !operator.is_comparison() {
            return Err(SemanticError::InvalidCondition(node.describe()));
        }
        let left = self.compile_value(left, scopes)?;
        let right = self.compile_value(right, scopes)?;
        let (left, right) = comparable(*operator, &left, &right)?;
        Ok(format!("{left} {} {right}", operator.symbol()))
    }

    fn compile_binary(
        &mut self,
        operator: BinaryOp,
        left: &Node,
        right: &Node,
        scopes: &mut ScopeStack<'c>,
    ) -> Result<CompiledNode<'c>, SemanticError> {
        let left = self.compile_value(left, scopes)?;
        let right = self.compile_value(right, scopes)?;
        let boolean = self.ty(BOOLEAN)?;
        let number = self.ty(NUMBER)?;
        let vector = self.ty(VECTOR)?;

        let typed = match operator {
            BinaryOp::Lt
            | BinaryOp::Gt
            | BinaryOp::Le
            | BinaryOp::Ge
            | BinaryOp::Eq
            | BinaryOp::Ne => {
                let (left, right) = comparable(operator, &left, &right)?;
                let rendered = format!("Compare({left}, {}, {right})", operator.symbol());
                return Ok(CompiledNode::new(boolean, rendered));
            }
            BinaryOp::And | BinaryOp::Or => operands(boolean, boolean, boolean, &left, &right),
            BinaryOp::Add | BinaryOp::Sub => operands(number, number, number, &left, &right)
                .or_else(|| operands(vector, vector, vector, &left, &right)),
            BinaryOp::Mul => operands(number, number, number, &left, &right)
                .or_else(|| operands(vector, number, vector, &left, &right))
                .or_else(|| operands(number, vector, vector, &left, &right)),
            BinaryOp::Div => operands(number, number, number, &left, &right)
                .or_else(|| operands(vector, number, vector, &left, &right)),
            BinaryOp::Rem => operands(number, number, number, &left, &right),
        };
        let Some((ty, left_text, right_text)) = typed else {
            return Err(SemanticError::InvalidOperands {
                operator: operator.symbol().to_string(),
                left: left.ty.name().to_string(),
                right: right.ty.name().to_string(),
            });
        };
        Ok(CompiledNode::new(
            ty,
            format!("{}({left_text}, {right_text})", function_name(operator)),
        ))
    }

    fn enum_member(
        &self,
        enum_name: &str,
        member: &str,
    ) -> Result<CompiledNode<'c>, SemanticError> {
        let descriptor = self
            .catalog
            .enumeration(enum_name)
            .ok_or_else(|| SemanticError::UnknownEnum(enum_name.to_string()))?;
        let rendered =
            descriptor
                .member(member)
                .ok_or_else(|| SemanticError::UnknownEnumMember {
                    enum_name: enum_name.to_string(),
                    member: member.to_string(),
                })?;
        let ty = self.ty(&types::enum_type_name(enum_name))?;
        Ok(CompiledNode::new(ty, rendered))
    }

    fn use_bank(&mut self, domain: Domain, bank: Bank, scopes: &mut ScopeStack<'c>) {
        match domain {
            Domain::Global => scopes.set_using(bank),
            Domain::Player => self.actors.set_using(bank),
        }
        log::debug!("using bank {bank} for {domain:?} variables");
    }
}

/// Renders `value` for storage in `variable`. The first value stored in a
/// `var` fixes its type.
fn store<'c>(
    name: &str,
    variable: &mut Variable<'c>,
    value: &CompiledNode<'c>,
) -> Result<String, SemanticError> {
    if value.ty.is_enum() || value.ty.is_void() {
        return Err(SemanticError::EnumAssignment {
            name: name.to_string(),
            ty: value.ty.name().to_string(),
        });
    }
    if variable.ty.is_dynamic() {
        if !value.ty.is_dynamic() {
            log::debug!("'{name}' inferred as {}", value.ty);
            variable.ty = value.ty;
        }
        return Ok(value.value.clone());
    }
    variable.ty.resolve(value)
}

/// Renders both sides of a comparison, converting one side to the other's
/// type when needed.
fn comparable(
    operator: BinaryOp,
    left: &CompiledNode,
    right: &CompiledNode,
) -> Result<(String, String), SemanticError> {
    if left.ty.can_resolve(right.ty) {
        Ok((left.value.clone(), left.ty.resolve(right)?))
    } else if right.ty.can_resolve(left.ty) {
        Ok((right.ty.resolve(left)?, right.value.clone()))
    } else {
        Err(SemanticError::InvalidOperands {
            operator: operator.symbol().to_string(),
            left: left.ty.name().to_string(),
            right: right.ty.name().to_string(),
        })
    }
}

/// Result type and rendered operands when `left` and `right` fit the
/// expected operand types.
fn operands<'c>(
    left_ty: &'c Type,
    right_ty: &'c Type,
    result: &'c Type,
    left: &CompiledNode,
    right: &CompiledNode,
) -> Option<(&'c Type, String, String)> {
    if !left_ty.can_resolve(left.ty) || !right_ty.can_resolve(right.ty) {
        return None;
    }
    let left = left_ty.resolve(left).ok()?;
    let right = right_ty.resolve(right).ok()?;
    Some((result, left, right))
}

fn function_name(operator: BinaryOp) -> &'static str {
    match operator {
        BinaryOp::Or => "Or",
        BinaryOp::And => "And",
        BinaryOp::Add => "Add",
        BinaryOp::Sub => "Subtract",
        BinaryOp::Mul => "Multiply",
        BinaryOp::Div => "Divide",
        BinaryOp::Rem => "Modulo",
        BinaryOp::Lt
        | BinaryOp::Gt
        | BinaryOp::Le
        | BinaryOp::Ge
        | BinaryOp::Eq
        | BinaryOp::Ne => "Compare",
    }
}

fn unsupported(node: &Node, context: &'static str) -> SemanticError {
    SemanticError::Unsupported {
        construct: node.describe(),
        context,
    }
}
