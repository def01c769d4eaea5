//! Variable slots, banks and the scope chain.
//!
//! Storage is split into two domains, global and per-player, each with
//! its own [`SlotAllocator`]. A slot is a `(bank, index)` pair; banks are
//! the letters `A` to `Z` and every bank hands out indices in increasing
//! order without ever reusing one.

use std::collections::HashMap;
use std::fmt;

use serde::Serialize;

use crate::error::SemanticError;
use crate::types::Type;

/// Highest number of slots a single bank can hand out.
pub const MAX_SLOTS_PER_BANK: u32 = 1000;

/// One of the 26 lettered banks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(into = "char")]
pub struct Bank(u8);

impl Bank {
    pub const COUNT: usize = 26;
    pub const A: Bank = Bank(0);

    pub fn from_letter(letter: char) -> Option<Bank> {
        letter
            .is_ascii_uppercase()
            .then(|| Bank(letter as u8 - b'A'))
    }

    pub fn letter(self) -> char {
        (b'A' + self.0) as char
    }

    pub fn index(self) -> usize {
        usize::from(self.0)
    }
}

impl Default for Bank {
    fn default() -> Self {
        Bank::A
    }
}

impl fmt::Display for Bank {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.letter())
    }
}

impl From<Bank> for char {
    fn from(bank: Bank) -> char {
        bank.letter()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Slot {
    pub bank: Bank,
    pub index: u32,
}

impl fmt::Display for Slot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}[{}]", self.bank, self.index)
    }
}

/// Per-bank counters of one storage domain.
#[derive(Debug, Clone, Default)]
pub struct SlotAllocator {
    next: [u32; Bank::COUNT],
}

impl SlotAllocator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn allocate(&mut self, bank: Bank) -> Result<Slot, SemanticError> {
        let counter = &mut self.next[bank.index()];
        if *counter >= MAX_SLOTS_PER_BANK {
            return Err(SemanticError::BankOverflow(bank));
        }
        let slot = Slot {
            bank,
            index: *counter,
        };
        *counter += 1;
        Ok(slot)
    }

    /// Number of slots handed out from `bank` so far.
    pub fn allocated(&self, bank: Bank) -> u32 {
        self.next[bank.index()]
    }
}

#[derive(Debug, Clone, Copy)]
pub struct Variable<'t> {
    pub slot: Slot,
    /// `dynamic` until a `var` declaration receives its first value.
    pub ty: &'t Type,
}

/// Identifiers declared in one scope, plus the bank new declarations use.
#[derive(Debug, Clone, Default)]
pub struct VariableTable<'t> {
    links: HashMap<String, Variable<'t>>,
    using: Bank,
}

impl<'t> VariableTable<'t> {
    pub fn new(using: Bank) -> Self {
        VariableTable {
            links: HashMap::new(),
            using,
        }
    }

    /// Records `name` in the current bank. A name that is already present
    /// keeps its slot.
    pub fn declare(
        &mut self,
        name: &str,
        ty: &'t Type,
        allocator: &mut SlotAllocator,
    ) -> Result<Slot, SemanticError> {
        if let Some(existing) = self.links.get(name) {
            return Ok(existing.slot);
        }
        let slot = allocator.allocate(self.using)?;
        self.links.insert(name.to_string(), Variable { slot, ty });
        Ok(slot)
    }

    pub fn has(&self, name: &str) -> bool {
        self.links.contains_key(name)
    }

    pub fn get(&self, name: &str) -> Option<&Variable<'t>> {
        self.links.get(name)
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut Variable<'t>> {
        self.links.get_mut(name)
    }

    pub fn using(&self) -> Bank {
        self.using
    }

    pub fn set_using(&mut self, bank: Bank) {
        self.using = bank;
    }
}

/// Nested scopes of the global domain.
///
/// The first frame is the program scope; every rule pushes a child that is
/// dropped again when the rule is done. A child starts out with its
/// parent's bank selection.
#[derive(Debug)]
pub struct ScopeStack<'t> {
    frames: Vec<VariableTable<'t>>,
    allocator: SlotAllocator,
}

impl<'t> ScopeStack<'t> {
    pub fn new() -> Self {
        ScopeStack {
            frames: vec![VariableTable::new(Bank::A)],
            allocator: SlotAllocator::new(),
        }
    }

    pub fn enter(&mut self) {
        let using = self.current().using();
        self.frames.push(VariableTable::new(using));
    }

    /// Drops the innermost scope. The program scope is never dropped.
    pub fn leave(&mut self) {
        if self.frames.len() > 1 {
            self.frames.pop();
        }
    }

    /// Runs `f` inside a fresh child scope.
    pub fn scoped<R>(&mut self, f: impl FnOnce(&mut Self) -> R) -> R {
        self.enter();
        let result = f(self);
        self.leave();
        result
    }

    pub fn depth(&self) -> usize {
        self.frames.len()
    }

    pub fn current(&self) -> &VariableTable<'t> {
        &self.frames[self.frames.len() - 1]
    }

    /// Innermost scope that declares `name`.
    pub fn lookup(&self, name: &str) -> Option<&VariableTable<'t>> {
        self.frames.iter().rev().find(|table| table.has(name))
    }

    pub fn resolve(&self, name: &str) -> Option<&Variable<'t>> {
        self.lookup(name).and_then(|table| table.get(name))
    }

    pub fn resolve_mut(&mut self, name: &str) -> Option<&mut Variable<'t>> {
        self.frames
            .iter_mut()
            .rev()
            .find_map(|table| table.get_mut(name))
    }

    pub fn declare(&mut self, name: &str, ty: &'t Type) -> Result<Slot, SemanticError> {
        let last = self.frames.len() - 1;
        self.frames[last].declare(name, ty, &mut self.allocator)
    }

    pub fn set_using(&mut self, bank: Bank) {
        let last = self.frames.len() - 1;
        self.frames[last].set_using(bank);
    }
}

impl Default for ScopeStack<'_> {
    fn default() -> Self {
        Self::new()
    }
}

/// Per-player variables. This domain has a single flat namespace shared by
/// every rule.
#[derive(Debug, Default)]
pub struct ActorDomain<'t> {
    table: VariableTable<'t>,
    allocator: SlotAllocator,
}

impl<'t> ActorDomain<'t> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn declare(&mut self, name: &str, ty: &'t Type) -> Result<Slot, SemanticError> {
        self.table.declare(name, ty, &mut self.allocator)
    }

    pub fn has(&self, name: &str) -> bool {
        self.table.has(name)
    }

    pub fn resolve(&self, name: &str) -> Option<&Variable<'t>> {
        self.table.get(name)
    }

    pub fn resolve_mut(&mut self, name: &str) -> Option<&mut Variable<'t>> {
        self.table.get_mut(name)
    }

    pub fn set_using(&mut self, bank: Bank) {
        self.table.set_using(bank);
    }
}
