//! Interned target and variable names.
//!
//! Target names are compared, hashed, and copied constantly during
//! emission, so they are interned once into a process-global table and
//! handled as [`Symbol`] values afterwards. Equality and hashing act on
//! the handle; ordering compares the interned text so that ordered maps
//! keyed by `Symbol` iterate lexicographically.

use std::cmp::Ordering;
use std::collections::HashMap;
use std::fmt;
use std::sync::{LazyLock, Mutex, PoisonError};

static TABLE: LazyLock<Mutex<SymbolTable>> = LazyLock::new(|| Mutex::new(SymbolTable::new()));

struct SymbolTable {
    strings: Vec<&'static str>,
    ids: HashMap<&'static str, usize>,
}

impl SymbolTable {
    fn new() -> Self {
        let mut table = Self {
            strings: Vec::new(),
            ids: HashMap::new(),
        };
        // Index 0 is reserved for the empty sentinel.
        table.intern("");
        table
    }

    fn intern(&mut self, s: &str) -> usize {
        if let Some(&id) = self.ids.get(s) {
            return id;
        }
        let leaked: &'static str = Box::leak(s.to_owned().into_boxed_str());
        let id = self.strings.len();
        self.strings.push(leaked);
        self.ids.insert(leaked, id);
        id
    }
}

/// Intern `s`, returning its stable handle.
pub fn intern(s: &str) -> Symbol {
    let mut table = TABLE.lock().unwrap_or_else(PoisonError::into_inner);
    Symbol(table.intern(s))
}

/// Handle to an interned string.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Symbol(usize);

impl Symbol {
    /// The sentinel for the interned empty string.
    #[must_use]
    pub const fn empty() -> Self {
        Self(0)
    }

    /// Whether this is the empty sentinel.
    #[must_use]
    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// The interned text.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        let table = TABLE.lock().unwrap_or_else(PoisonError::into_inner);
        table.strings[self.0]
    }
}

impl PartialOrd for Symbol {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Symbol {
    fn cmp(&self, other: &Self) -> Ordering {
        self.as_str().cmp(other.as_str())
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Debug for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Symbol({:?})", self.as_str())
    }
}
