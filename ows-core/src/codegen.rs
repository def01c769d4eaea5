//! Text backend: layout of rules and rendering of variable accesses.
//!
//! The compiler produces a list of [`Line`]s per rule; indentation is kept
//! as markers between text lines and only resolved by [`write_lines`].

use crate::scope::Slot;

/// Player reference of the event a rule runs for.
pub const EVENT_PLAYER: &str = "Event Player";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Line {
    Text(String),
    /// Following lines are indented one more level.
    Indent,
    Dedent,
    /// Forces an empty line.
    Blank,
}

impl Line {
    pub fn text(text: impl Into<String>) -> Self {
        Line::Text(text.into())
    }
}

/// A statement line, terminated with `;`.
pub fn statement(text: impl AsRef<str>) -> Line {
    Line::Text(format!("{};", text.as_ref()))
}

/// Joins `lines` with newlines, indenting text with tabs.
pub fn write_lines(lines: &[Line], indent: usize) -> String {
    let mut output = String::new();
    let mut level = indent;
    let mut first = true;
    for line in lines {
        match line {
            Line::Indent => level += 1,
            Line::Dedent => level = level.saturating_sub(1),
            Line::Text(text) => {
                if !first {
                    output.push('\n');
                }
                first = false;
                output.extend(std::iter::repeat_n('\t', level));
                output.push_str(text);
            }
            Line::Blank => output.push('\n'),
        }
    }
    output
}

/// `name { lines }` with the body indented.
pub fn section(name: &str, body: Vec<Line>) -> Vec<Line> {
    let mut lines = vec![Line::text(name), Line::text("{"), Line::Indent];
    lines.extend(body);
    lines.extend([Line::Dedent, Line::text("}")]);
    lines
}

/// Layout of one compiled rule.
pub struct RuleLayout {
    pub name: String,
    /// Rendered event target, e.g. `Ongoing - Global`.
    pub event: String,
    /// Per-player events also name the team and hero they apply to.
    pub broadcast: bool,
    pub conditions: Option<Vec<String>>,
    pub actions: Vec<Line>,
}

impl RuleLayout {
    pub fn lines(self) -> Vec<Line> {
        let mut event = vec![statement(&self.event)];
        if self.broadcast {
            event.extend([statement("All"), statement("All")]);
        }

        let mut body = section("event", event);
        if let Some(conditions) = self.conditions {
            body.push(Line::Blank);
            body.extend(section(
                "conditions",
                conditions.into_iter().map(statement).collect(),
            ));
        }
        body.push(Line::Blank);
        body.extend(section("actions", self.actions));

        let mut lines = vec![Line::text(format!("rule(\"{}\")", self.name)), Line::text("{")];
        lines.push(Line::Indent);
        lines.extend(body);
        lines.extend([Line::Dedent, Line::text("}")]);
        lines
    }

    pub fn render(self) -> String {
        write_lines(&self.lines(), 0)
    }
}

pub fn global_read(slot: Slot) -> String {
    format!(
        "Value In Array(Global Variable({}), {})",
        slot.bank, slot.index
    )
}

pub fn global_write(slot: Slot, value: &str) -> String {
    format!(
        "Set Global Variable At Index({}, {}, {value})",
        slot.bank, slot.index
    )
}

pub fn actor_read(actor: &str, slot: Slot) -> String {
    format!(
        "Value In Array(Player Variable({actor}, {}), {})",
        slot.bank, slot.index
    )
}

pub fn actor_write(actor: &str, slot: Slot, value: &str) -> String {
    format!(
        "Set Player Variable At Index({actor}, {}, {}, {value})",
        slot.bank, slot.index
    )
}

pub fn boolean(value: bool) -> &'static str {
    if value { "True" } else { "False" }
}

/// Wraps string literal text, which keeps its source escapes, in a custom
/// string. Bare double quotes (from single-quoted literals) get escaped.
pub fn custom_string(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    let mut chars = text.chars();
    while let Some(ch) = chars.next() {
        match ch {
            '\\' => {
                escaped.push(ch);
                if let Some(next) = chars.next() {
                    escaped.push(next);
                }
            }
            '"' => escaped.push_str("\\\""),
            _ => escaped.push(ch),
        }
    }
    format!("Custom String(\"{escaped}\")")
}

/// Drops all whitespace and lowercases the rest.
pub fn minify(output: &str) -> String {
    output
        .chars()
        .filter(|ch| !ch.is_whitespace())
        .flat_map(char::to_lowercase)
        .collect()
}
