//! Nominal value types and their implicit conversions.

use std::collections::HashMap;
use std::fmt;

use crate::error::SemanticError;

pub const DYNAMIC: &str = "dynamic";
pub const VOID: &str = "void";
pub const PLAYER: &str = "player";
pub const NUMBER: &str = "number";
pub const VECTOR: &str = "vector";
pub const BOOLEAN: &str = "boolean";
pub const STRING: &str = "string";

const ENUM_PREFIX: &str = "enum-";

/// Rewrites rendered text of the source type into the target type.
pub type Conversion = fn(&str) -> String;

#[derive(Clone)]
pub struct Type {
    name: String,
    is_enum: bool,
    is_dynamic: bool,
    /// Source types accepted as-is.
    accepts: Vec<String>,
    conversions: Vec<(String, Conversion)>,
}

impl Type {
    /// A plain type. It accepts `dynamic` values unchanged.
    pub fn new(name: impl Into<String>) -> Self {
        Type {
            name: name.into(),
            is_enum: false,
            is_dynamic: false,
            accepts: vec![DYNAMIC.to_string()],
            conversions: Vec::new(),
        }
    }

    pub fn dynamic() -> Self {
        Type {
            is_dynamic: true,
            ..Type::new(DYNAMIC)
        }
    }

    /// The pseudo-type `enum-<name>` of the members of enum `name`.
    pub fn enumeration(enum_name: &str) -> Self {
        Type {
            name: enum_type_name(enum_name),
            is_enum: true,
            is_dynamic: false,
            accepts: Vec::new(),
            conversions: Vec::new(),
        }
    }

    pub fn with_conversion(mut self, from: &str, convert: Conversion) -> Self {
        self.conversions.push((from.to_string(), convert));
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_enum(&self) -> bool {
        self.is_enum
    }

    pub fn is_dynamic(&self) -> bool {
        self.is_dynamic
    }

    pub fn is_void(&self) -> bool {
        self.name == VOID
    }

    /// Whether a value of type `source` can be used where `self` is expected.
    pub fn can_resolve(&self, source: &Type) -> bool {
        self.is_dynamic
            || self.name == source.name
            || self.accepts.iter().any(|name| *name == source.name)
            || self.conversion_from(&source.name).is_some()
    }

    /// Renders `value` as this type, applying a conversion when one is
    /// declared for the value's type.
    pub fn resolve(&self, value: &CompiledNode) -> Result<String, SemanticError> {
        if !self.can_resolve(value.ty) {
            return Err(SemanticError::Conversion {
                from: value.ty.name.clone(),
                to: self.name.clone(),
            });
        }
        if value.ty.name == self.name || value.ty.is_dynamic {
            return Ok(value.value.clone());
        }
        Ok(match self.conversion_from(&value.ty.name) {
            Some(convert) => convert(&value.value),
            None => value.value.clone(),
        })
    }

    fn conversion_from(&self, source: &str) -> Option<Conversion> {
        self.conversions
            .iter()
            .find(|(from, _)| from == source)
            .map(|(_, convert)| *convert)
    }
}

impl PartialEq for Type {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
    }
}

impl Eq for Type {}

impl fmt::Debug for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Type")
            .field("name", &self.name)
            .field("is_enum", &self.is_enum)
            .field("is_dynamic", &self.is_dynamic)
            .finish_non_exhaustive()
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

pub fn enum_type_name(enum_name: &str) -> String {
    format!("{ENUM_PREFIX}{enum_name}")
}

/// Result of compiling an expression: its static type and rendered text.
#[derive(Debug, Clone, PartialEq)]
pub struct CompiledNode<'t> {
    pub ty: &'t Type,
    pub value: String,
}

impl<'t> CompiledNode<'t> {
    pub fn new(ty: &'t Type, value: impl Into<String>) -> Self {
        CompiledNode {
            ty,
            value: value.into(),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct TypeRegistry {
    types: HashMap<String, Type>,
}

impl TypeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// `dynamic, void, player, number, vector, boolean, string`.
    pub fn primitives() -> Self {
        let mut registry = TypeRegistry::new();
        registry.insert(Type::dynamic());
        registry.insert(Type::new(VOID));
        registry.insert(Type::new(PLAYER));
        registry.insert(Type::new(NUMBER));
        registry.insert(Type::new(VECTOR).with_conversion(PLAYER, position_of));
        registry.insert(Type::new(BOOLEAN));
        registry.insert(Type::new(STRING));
        registry
    }

    pub fn insert(&mut self, ty: Type) {
        self.types.insert(ty.name.clone(), ty);
    }

    pub fn get(&self, name: &str) -> Result<&Type, SemanticError> {
        self.types
            .get(name)
            .ok_or_else(|| SemanticError::UnknownType(name.to_string()))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.types.contains_key(name)
    }
}

fn position_of(player: &str) -> String {
    format!("Position Of({player})")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn player_converts_to_vector() {
        let registry = TypeRegistry::primitives();
        let vector = registry.get(VECTOR).expect("vector");
        let player = registry.get(PLAYER).expect("player");
        assert!(vector.can_resolve(player));
        assert!(!player.can_resolve(vector));
        let value = CompiledNode::new(player, "Event Player");
        assert_eq!(
            vector.resolve(&value).expect("resolve"),
            "Position Of(Event Player)"
        );
    }

    #[test]
    fn dynamic_flows_both_ways() {
        let registry = TypeRegistry::primitives();
        let dynamic = registry.get(DYNAMIC).expect("dynamic");
        let number = registry.get(NUMBER).expect("number");
        assert!(dynamic.can_resolve(number));
        assert!(number.can_resolve(dynamic));
        let value = CompiledNode::new(dynamic, "Value In Array(Global Variable(A), 0)");
        assert_eq!(number.resolve(&value).expect("resolve"), value.value);
    }

    #[test]
    fn rejects_unrelated_types() {
        let registry = TypeRegistry::primitives();
        let number = registry.get(NUMBER).expect("number");
        let boolean = registry.get(BOOLEAN).expect("boolean");
        let err = number
            .resolve(&CompiledNode::new(boolean, "True"))
            .unwrap_err();
        assert_eq!(
            err,
            SemanticError::Conversion {
                from: BOOLEAN.to_string(),
                to: NUMBER.to_string(),
            }
        );
    }

    #[test]
    fn enum_types_accept_only_themselves() {
        let button = Type::enumeration("Button");
        let dynamic = Type::dynamic();
        assert_eq!(button.name(), "enum-Button");
        assert!(button.is_enum());
        assert!(button.can_resolve(&Type::enumeration("Button")));
        assert!(!button.can_resolve(&dynamic));
        assert!(!button.can_resolve(&Type::enumeration("Event")));
    }

    #[test]
    fn unknown_type_is_an_error() {
        let registry = TypeRegistry::primitives();
        assert_eq!(
            registry.get("matrix").unwrap_err(),
            SemanticError::UnknownType("matrix".to_string())
        );
    }
}
