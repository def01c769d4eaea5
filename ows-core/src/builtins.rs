//! Built-in actions, values and enums visible to OWS programs.
//!
//! Each callable is described by a [`BuiltinDescriptor`]: its parameter
//! types, its return type and a render function producing the target text
//! from the already rendered arguments. When a call has a receiver
//! (`player.kill()`), the receiver is passed as the first argument.
//!
//! The tables are plain constants; [`Catalog::standard`] indexes them once
//! for lookup by name.

use std::collections::HashMap;
use std::sync::LazyLock;

use crate::types::{BOOLEAN, NUMBER, PLAYER, STRING, Type, TypeRegistry, VECTOR, VOID};

/// Enum naming the event targets a rule can be attached to.
pub const EVENT_ENUM: &str = "Event";

/// The event target that runs once for the whole match instead of per player.
pub const GLOBAL_EVENT: &str = "global";

const TRUE: &str = "True";

pub type Render = fn(&[String]) -> String;

/// Metadata about a single builtin callable.
#[derive(Debug, Clone, Copy)]
pub struct BuiltinDescriptor {
    /// Name at the OWS level, e.g. `applyImpulse`.
    pub name: &'static str,

    /// Types a receiver may have. Empty when the builtin cannot be called
    /// through `.`.
    pub scopes: &'static [&'static str],

    /// Parameter types, receiver included.
    pub params: &'static [&'static str],

    pub returns: &'static str,

    pub render: Render,
}

#[derive(Debug, Clone, Copy)]
pub struct EnumDescriptor {
    pub name: &'static str,
    /// Member name and its rendered text.
    pub members: &'static [(&'static str, &'static str)],
}

impl EnumDescriptor {
    pub fn member(&self, name: &str) -> Option<&'static str> {
        self.members
            .iter()
            .find(|(member, _)| *member == name)
            .map(|(_, rendered)| *rendered)
    }
}

const RECEIVER_PLAYER: &[&str] = &[PLAYER];
const RECEIVER_VECTOR: &[&str] = &[VECTOR];
const NO_RECEIVER: &[&str] = &[];

pub const ACTIONS: &[BuiltinDescriptor] = &[
    BuiltinDescriptor {
        name: "applyImpulse",
        scopes: RECEIVER_PLAYER,
        params: &[PLAYER, VECTOR, NUMBER, BOOLEAN, BOOLEAN],
        returns: VOID,
        render: render_apply_impulse,
    },
    BuiltinDescriptor {
        name: "wait",
        scopes: NO_RECEIVER,
        params: &[NUMBER],
        returns: VOID,
        render: |args| format!("Wait({}, Ignore Condition)", args.join(", ")),
    },
    BuiltinDescriptor {
        name: "kill",
        scopes: RECEIVER_PLAYER,
        params: &[PLAYER],
        returns: VOID,
        render: |args| format!("Kill({}, Null)", args.join(", ")),
    },
    BuiltinDescriptor {
        name: "heal",
        scopes: RECEIVER_PLAYER,
        params: &[PLAYER, NUMBER],
        returns: VOID,
        render: |args| format!("Heal({}, Null, {})", args[0], args[1]),
    },
    BuiltinDescriptor {
        name: "damage",
        scopes: RECEIVER_PLAYER,
        params: &[PLAYER, NUMBER],
        returns: VOID,
        render: |args| format!("Damage({}, Null, {})", args[0], args[1]),
    },
    BuiltinDescriptor {
        name: "teleport",
        scopes: RECEIVER_PLAYER,
        params: &[PLAYER, VECTOR],
        returns: VOID,
        render: |args| call("Teleport", args),
    },
    BuiltinDescriptor {
        name: "setGravity",
        scopes: RECEIVER_PLAYER,
        params: &[PLAYER, NUMBER],
        returns: VOID,
        render: |args| call("Set Gravity", args),
    },
    BuiltinDescriptor {
        name: "smallMessage",
        scopes: RECEIVER_PLAYER,
        params: &[PLAYER, STRING],
        returns: VOID,
        render: |args| call("Small Message", args),
    },
];

pub const VALUES: &[BuiltinDescriptor] = &[
    BuiltinDescriptor {
        name: "Vector",
        scopes: NO_RECEIVER,
        params: &[NUMBER, NUMBER, NUMBER],
        returns: VECTOR,
        render: |args| call("Vector", args),
    },
    BuiltinDescriptor {
        name: "getAltitude",
        scopes: RECEIVER_PLAYER,
        params: &[PLAYER],
        returns: NUMBER,
        render: |args| call("Altitude Of", args),
    },
    BuiltinDescriptor {
        name: "isButtonHeld",
        scopes: RECEIVER_PLAYER,
        params: &[PLAYER, "enum-Button"],
        returns: BOOLEAN,
        render: |args| call("Is Button Held", args),
    },
    BuiltinDescriptor {
        name: "isOnGround",
        scopes: RECEIVER_PLAYER,
        params: &[PLAYER],
        returns: BOOLEAN,
        render: |args| call("Is On Ground", args),
    },
    BuiltinDescriptor {
        name: "isAlive",
        scopes: RECEIVER_PLAYER,
        params: &[PLAYER],
        returns: BOOLEAN,
        render: |args| call("Is Alive", args),
    },
    BuiltinDescriptor {
        name: "position",
        scopes: RECEIVER_PLAYER,
        params: &[PLAYER],
        returns: VECTOR,
        render: |args| call("Position Of", args),
    },
    BuiltinDescriptor {
        name: "distance",
        scopes: RECEIVER_VECTOR,
        params: &[VECTOR, VECTOR],
        returns: NUMBER,
        render: |args| call("Distance Between", args),
    },
    BuiltinDescriptor {
        name: "x",
        scopes: RECEIVER_VECTOR,
        params: &[VECTOR],
        returns: NUMBER,
        render: |args| call("X Component Of", args),
    },
    BuiltinDescriptor {
        name: "y",
        scopes: RECEIVER_VECTOR,
        params: &[VECTOR],
        returns: NUMBER,
        render: |args| call("Y Component Of", args),
    },
    BuiltinDescriptor {
        name: "z",
        scopes: RECEIVER_VECTOR,
        params: &[VECTOR],
        returns: NUMBER,
        render: |args| call("Z Component Of", args),
    },
];

pub const ENUMS: &[EnumDescriptor] = &[
    EnumDescriptor {
        name: EVENT_ENUM,
        members: &[
            (GLOBAL_EVENT, "Ongoing - Global"),
            ("player", "Ongoing - Each Player"),
        ],
    },
    EnumDescriptor {
        name: "Button",
        members: &[
            ("interact", "Interact"),
            ("jump", "Jump"),
            ("crouch", "Crouch"),
            ("primaryFire", "Primary Fire"),
            ("secondaryFire", "Secondary Fire"),
            ("ability1", "Ability 1"),
            ("ability2", "Ability 2"),
            ("ultimate", "Ultimate"),
        ],
    },
];

fn call(function: &str, args: &[String]) -> String {
    format!("{function}({})", args.join(", "))
}

fn render_apply_impulse(args: &[String]) -> String {
    let relative = if args[3] == TRUE {
        "To Player"
    } else {
        "To World"
    };
    let motion = if args[4] == TRUE {
        "Incorporate Contrary Motion"
    } else {
        "Cancel Contrary Motion"
    };
    format!("Apply Impulse({}, {relative}, {motion})", args[..3].join(", "))
}

/// Lookup tables over the builtin descriptors and the types they mention.
#[derive(Debug)]
pub struct Catalog {
    types: TypeRegistry,
    actions: HashMap<&'static str, &'static BuiltinDescriptor>,
    values: HashMap<&'static str, &'static BuiltinDescriptor>,
    enums: HashMap<&'static str, &'static EnumDescriptor>,
}

static STANDARD: LazyLock<Catalog> = LazyLock::new(|| Catalog::new(ACTIONS, VALUES, ENUMS));

impl Catalog {
    pub fn new(
        actions: &'static [BuiltinDescriptor],
        values: &'static [BuiltinDescriptor],
        enums: &'static [EnumDescriptor],
    ) -> Self {
        let mut types = TypeRegistry::primitives();
        for descriptor in enums {
            types.insert(Type::enumeration(descriptor.name));
        }
        Catalog {
            types,
            actions: actions.iter().map(|d| (d.name, d)).collect(),
            values: values.iter().map(|d| (d.name, d)).collect(),
            enums: enums.iter().map(|d| (d.name, d)).collect(),
        }
    }

    /// The catalog of all builtins, built on first use.
    pub fn standard() -> &'static Catalog {
        &STANDARD
    }

    pub fn types(&self) -> &TypeRegistry {
        &self.types
    }

    pub fn action(&self, name: &str) -> Option<&'static BuiltinDescriptor> {
        self.actions.get(name).copied()
    }

    pub fn value(&self, name: &str) -> Option<&'static BuiltinDescriptor> {
        self.values.get(name).copied()
    }

    pub fn enumeration(&self, name: &str) -> Option<&'static EnumDescriptor> {
        self.enums.get(name).copied()
    }

    /// Names a program may not declare as variables or constants: enums and
    /// builtins callable without a receiver. Members reached only through
    /// `.` (`v.x()`) never clash with variable names.
    pub fn is_reserved(&self, name: &str) -> bool {
        let free = |descriptor: &&BuiltinDescriptor| descriptor.scopes.is_empty();
        self.actions.get(name).is_some_and(free)
            || self.values.get(name).is_some_and(free)
            || self.enums.contains_key(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strings(values: &[&str]) -> Vec<String> {
        values.iter().map(|value| value.to_string()).collect()
    }

    #[test]
    fn every_parameter_type_is_registered() {
        let catalog = Catalog::standard();
        for descriptor in ACTIONS.iter().chain(VALUES) {
            for param in descriptor.params.iter().chain(descriptor.scopes) {
                assert!(
                    catalog.types().contains(param),
                    "{} uses unknown type {param}",
                    descriptor.name
                );
            }
            assert!(catalog.types().contains(descriptor.returns));
        }
    }

    #[test]
    fn receivers_match_first_parameter() {
        for descriptor in ACTIONS.iter().chain(VALUES) {
            if !descriptor.scopes.is_empty() {
                assert!(descriptor.scopes.contains(&descriptor.params[0]));
            }
        }
    }

    #[test]
    fn renders_apply_impulse_flags() {
        let action = Catalog::standard().action("applyImpulse").expect("action");
        let rendered = (action.render)(&strings(&[
            "Event Player",
            "Vector(0, 1, 0)",
            "10",
            "True",
            "False",
        ]));
        assert_eq!(
            rendered,
            "Apply Impulse(Event Player, Vector(0, 1, 0), 10, To Player, Cancel Contrary Motion)"
        );
    }

    #[test]
    fn renders_values() {
        let catalog = Catalog::standard();
        let vector = catalog.value("Vector").expect("value");
        assert_eq!((vector.render)(&strings(&["1", "2", "3"])), "Vector(1, 2, 3)");
        let x = catalog.value("x").expect("value");
        assert_eq!((x.render)(&strings(&["Vector(1, 2, 3)"])), "X Component Of(Vector(1, 2, 3))");
    }

    #[test]
    fn looks_up_enum_members() {
        let catalog = Catalog::standard();
        let event = catalog.enumeration(EVENT_ENUM).expect("enum");
        assert_eq!(event.member(GLOBAL_EVENT), Some("Ongoing - Global"));
        assert_eq!(event.member("player"), Some("Ongoing - Each Player"));
        assert_eq!(event.member("team"), None);
        assert!(catalog.types().contains("enum-Button"));
    }

    #[test]
    fn reserves_builtin_names() {
        let catalog = Catalog::standard();
        assert!(catalog.is_reserved("wait"));
        assert!(catalog.is_reserved("Vector"));
        assert!(catalog.is_reserved("Button"));
        assert!(!catalog.is_reserved("score"));
        assert!(!catalog.is_reserved("x"));
        assert!(!catalog.is_reserved("position"));
        assert!(!catalog.is_reserved("kill"));
    }
}
