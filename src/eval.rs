//! Seams to the external evaluator and makefile cache.
//!
//! The generator never touches makefiles or variables itself; everything
//! it needs from the evaluation phase arrives through [`Evaluator`], and
//! the regeneration rule lists its makefile inputs through
//! [`MakefileCache`].

use camino::Utf8PathBuf;

use crate::command::Command;
use crate::dep::{DepGraph, NodeId};
use crate::symbol::Symbol;

/// The rule-to-command oracle and variable store produced by evaluation.
pub trait Evaluator {
    /// Evaluate the recipe of `node` into concrete commands.
    fn evaluate(&mut self, graph: &DepGraph, node: NodeId) -> Vec<Command>;

    /// Look up a variable, returning the empty string when unset.
    fn eval_var(&mut self, name: Symbol) -> String;

    /// The `export`/`unexport` directives seen during evaluation, in
    /// declaration order.
    fn exports(&self) -> Vec<(Symbol, bool)>;

    /// The environment variables consumed during evaluation.
    fn used_env_vars(&self) -> Vec<Symbol>;

    /// Forbid (or re-allow) side-effectful I/O inside the evaluator.
    fn set_avoid_io(&mut self, avoid: bool);
}

/// The makefiles that were read to produce the graph.
pub trait MakefileCache {
    /// Every makefile consulted, for the regeneration rule's input list.
    fn all_filenames(&self) -> Vec<Utf8PathBuf>;
}

/// Scoped `avoid_io` acquisition: set on construction, cleared on every
/// exit path when the scope drops.
pub(crate) struct AvoidIoScope<'a> {
    ev: &'a mut dyn Evaluator,
}

impl<'a> AvoidIoScope<'a> {
    pub(crate) fn new(ev: &'a mut dyn Evaluator) -> Self {
        ev.set_avoid_io(true);
        Self { ev }
    }
}

impl<'a> std::ops::Deref for AvoidIoScope<'a> {
    type Target = dyn Evaluator + 'a;

    fn deref(&self) -> &Self::Target {
        self.ev
    }
}

impl<'a> std::ops::DerefMut for AvoidIoScope<'a> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        self.ev
    }
}

impl Drop for AvoidIoScope<'_> {
    fn drop(&mut self) {
        self.ev.set_avoid_io(false);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Recorder {
        avoid_io: bool,
        saw_avoid_io: bool,
    }

    impl Evaluator for Recorder {
        fn evaluate(&mut self, _graph: &DepGraph, _node: NodeId) -> Vec<Command> {
            Vec::new()
        }

        fn eval_var(&mut self, _name: Symbol) -> String {
            String::new()
        }

        fn exports(&self) -> Vec<(Symbol, bool)> {
            Vec::new()
        }

        fn used_env_vars(&self) -> Vec<Symbol> {
            Vec::new()
        }

        fn set_avoid_io(&mut self, avoid: bool) {
            self.avoid_io = avoid;
            self.saw_avoid_io |= avoid;
        }
    }

    #[test]
    fn avoid_io_scope_resets_on_drop() {
        let mut recorder = Recorder {
            avoid_io: false,
            saw_avoid_io: false,
        };
        drop(AvoidIoScope::new(&mut recorder));
        assert!(recorder.saw_avoid_io);
        assert!(!recorder.avoid_io);
    }
}
