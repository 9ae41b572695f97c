//! Shared stubs for maki integration tests.
//!
//! `StubEvaluator` stands in for the external evaluation phase: it turns
//! the recipe text stored on graph nodes into [`Command`] values the way
//! Make would, serves a small variable table, and records how `avoid_io`
//! was toggled around it.

use camino::Utf8PathBuf;
use indexmap::IndexMap;

use maki::command::Command;
use maki::dep::{DepGraph, DepNode, NodeId};
use maki::eval::{Evaluator, MakefileCache};
use maki::symbol::{intern, Symbol};

/// Interpret the `@` and `-` recipe prefixes the way Make does.
#[must_use]
pub fn parse_recipe_line(line: &str) -> Command {
    let mut rest = line;
    let mut echo = true;
    let mut ignore_error = false;
    loop {
        if let Some(stripped) = rest.strip_prefix('@') {
            echo = false;
            rest = stripped;
        } else if let Some(stripped) = rest.strip_prefix('-') {
            ignore_error = true;
            rest = stripped;
        } else {
            break;
        }
    }
    Command {
        cmd: rest.to_owned(),
        echo,
        ignore_error,
    }
}

/// An in-memory evaluator backed by the recipe text on the graph nodes.
#[derive(Default)]
pub struct StubEvaluator {
    vars: IndexMap<Symbol, String>,
    exports: Vec<(Symbol, bool)>,
    used_env: Vec<Symbol>,
    /// Current `avoid_io` state, as last set by the generator.
    pub avoid_io: bool,
    /// Whether any `evaluate` call ran with `avoid_io` set.
    pub evaluated_with_avoid_io: bool,
}

impl StubEvaluator {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a variable, e.g. `SHELL`.
    pub fn set_var(&mut self, name: &str, value: &str) {
        self.vars.insert(intern(name), value.to_owned());
    }

    /// Record an `export` (or `unexport`, with `include` false).
    pub fn export(&mut self, name: &str, include: bool) {
        self.exports.push((intern(name), include));
    }

    /// Mark `name` as a consumed environment variable with `value`.
    pub fn use_env(&mut self, name: &str, value: &str) {
        let symbol = intern(name);
        self.used_env.push(symbol);
        self.vars.insert(symbol, value.to_owned());
    }
}

impl Evaluator for StubEvaluator {
    fn evaluate(&mut self, graph: &DepGraph, node: NodeId) -> Vec<Command> {
        self.evaluated_with_avoid_io |= self.avoid_io;
        graph
            .node(node)
            .cmds
            .iter()
            .map(|line| parse_recipe_line(line))
            .collect()
    }

    fn eval_var(&mut self, name: Symbol) -> String {
        self.vars.get(&name).cloned().unwrap_or_default()
    }

    fn exports(&self) -> Vec<(Symbol, bool)> {
        self.exports.clone()
    }

    fn used_env_vars(&self) -> Vec<Symbol> {
        self.used_env.clone()
    }

    fn set_avoid_io(&mut self, avoid: bool) {
        self.avoid_io = avoid;
    }
}

/// A makefile cache with a fixed file list.
#[derive(Default)]
pub struct StubMakefileCache(pub Vec<Utf8PathBuf>);

impl StubMakefileCache {
    #[must_use]
    pub fn with_files(files: &[&str]) -> Self {
        Self(files.iter().map(Utf8PathBuf::from).collect())
    }
}

impl MakefileCache for StubMakefileCache {
    fn all_filenames(&self) -> Vec<Utf8PathBuf> {
        self.0.clone()
    }
}

/// Add a root target with the given recipe lines.
pub fn add_target(graph: &mut DepGraph, output: &str, cmds: &[&str]) -> NodeId {
    let id = add_node(graph, output, cmds);
    graph.add_root(id);
    id
}

/// Add a non-root node with the given recipe lines.
pub fn add_node(graph: &mut DepGraph, output: &str, cmds: &[&str]) -> NodeId {
    let mut node = DepNode::new(intern(output));
    node.cmds = cmds.iter().map(|&line| line.to_owned()).collect();
    graph.add_node(node)
}

/// Add a phony root with no recipe, e.g. `all`.
pub fn add_phony_target(graph: &mut DepGraph, output: &str) -> NodeId {
    let mut node = DepNode::new(intern(output));
    node.is_phony = true;
    let id = graph.add_node(node);
    graph.add_root(id);
    id
}
