//! Ninja build-file generation.
//!
//! Walks the evaluated dependency graph depth-first and emits three
//! artefacts: the Ninja build file reproducing the Make semantics, the
//! shell wrapper that invokes Ninja with the right environment, and the
//! environment snapshot that retriggers generation when a consumed
//! variable changes. Emission is pure string assembly; [`NinjaOutput::write`]
//! performs all file I/O afterwards.

mod depfile;
mod escape;
mod gomacc;
mod script;
mod translate;

use std::collections::{BTreeMap, HashSet};
use std::fmt::{self, Write as _};
use std::io::Write as _;
use std::mem;

use anyhow::{Context, Result};
use camino::Utf8Path;
use cap_std::ambient_authority;
use cap_std::fs::Dir;
use itertools::Itertools;
use thiserror::Error;
use tracing::info;

use crate::config::GeneratorConfig;
use crate::dep::{DepGraph, DepNode, NodeId};
use crate::eval::{AvoidIoScope, Evaluator, MakefileCache};
use crate::symbol::{intern, Symbol};

use escape::{escape_build_target, escape_shell};
use script::{compose, Script, ScriptOptions};

/// Composed commands longer than this go through a response file; Linux
/// tolerates argument lists of ~130kB and macOS of ~250kB.
const RSPFILE_THRESHOLD: usize = 100 * 1000;

/// Errors raised while assembling the output text.
#[derive(Debug, Error)]
pub enum NinjaGenError {
    /// No roots were supplied without an explicit build-all request, so
    /// no `default` statement can be emitted.
    #[error("no targets to emit a default statement for")]
    NoDefaultTarget,
    /// Formatting into the output buffer failed.
    #[error("failed to format Ninja output")]
    Format(#[from] fmt::Error),
}

/// The generated artefacts, ready to be written to disk.
#[derive(Debug)]
pub struct NinjaOutput {
    /// The Ninja build file.
    pub ninja: String,
    /// The wrapper script that execs Ninja.
    pub shell: String,
    /// `KEY=VALUE` lines for the consumed environment variables; absent
    /// when evaluation consumed none.
    pub envlist: Option<String>,
}

impl NinjaOutput {
    /// Write the artefacts into the configured output directory: the
    /// envlist first so the Ninja file never references a missing
    /// snapshot, then the Ninja file, then the wrapper, which is made
    /// executable.
    ///
    /// # Errors
    ///
    /// Returns an error when the directory cannot be opened or any file
    /// cannot be created, written, or made executable.
    pub fn write(&self, config: &GeneratorConfig) -> Result<()> {
        let dir = Dir::open_ambient_dir(config.ninja_dir.as_std_path(), ambient_authority())
            .with_context(|| format!("open output directory {}", config.ninja_dir))?;
        if let Some(envlist) = &self.envlist {
            write_file(&dir, &config.envlist_file_name(), envlist)?;
        }
        write_file(&dir, &config.ninja_file_name(), &self.ninja)?;
        write_file(&dir, &config.shell_script_file_name(), &self.shell)?;
        mark_executable(&config.shell_script_file())?;
        info!("generated {}", config.ninja_file());
        Ok(())
    }
}

fn write_file(dir: &Dir, name: &str, content: &str) -> Result<()> {
    let mut file = dir
        .create(name)
        .with_context(|| format!("create {name}"))?;
    file.write_all(content.as_bytes())
        .with_context(|| format!("write {name}"))?;
    file.flush().with_context(|| format!("flush {name}"))?;
    file.sync_all().with_context(|| format!("sync {name}"))?;
    Ok(())
}

#[cfg(unix)]
fn mark_executable(path: &Utf8Path) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;
    let mut perms = std::fs::metadata(path.as_std_path())
        .with_context(|| format!("stat {path}"))?
        .permissions();
    perms.set_mode(0o755);
    std::fs::set_permissions(path.as_std_path(), perms)
        .with_context(|| format!("set permissions on {path}"))
}

#[cfg(not(unix))]
fn mark_executable(_path: &Utf8Path) -> Result<()> {
    Ok(())
}

/// Generate all artefacts for `graph` and write them out.
///
/// `orig_args` is the invocation to bake into the regeneration rule;
/// `build_all_targets` suppresses the `default` statement.
///
/// # Errors
///
/// Returns an error on the fatal conditions of [`NinjaGenerator::generate`]
/// and [`NinjaOutput::write`].
pub fn generate_ninja(
    graph: &DepGraph,
    ev: &mut dyn Evaluator,
    cache: &dyn MakefileCache,
    config: &GeneratorConfig,
    build_all_targets: bool,
    orig_args: &str,
) -> Result<()> {
    let generator = NinjaGenerator::new(graph, ev, cache, config);
    let output = generator.generate(build_all_targets, orig_args)?;
    output.write(config)
}

/// One translation run over a dependency graph.
pub struct NinjaGenerator<'a> {
    graph: &'a DepGraph,
    ev: AvoidIoScope<'a>,
    cache: &'a dyn MakefileCache,
    config: &'a GeneratorConfig,
    /// The evaluator's `SHELL`, used verbatim in rule commands.
    shell: String,
    /// Wrapper token ending in a space, empty without `goma_dir`.
    gomacc: String,
    /// Outputs already emitted; revisits of shared subgraphs return early.
    done: HashSet<Symbol>,
    /// Basename shortcuts; the empty symbol marks a collision.
    short_names: BTreeMap<Symbol, Symbol>,
    rule_id: u32,
    /// Consumed environment variables with their evaluated values.
    used_envs: BTreeMap<String, String>,
    out: String,
}

impl<'a> NinjaGenerator<'a> {
    /// Snapshot the evaluator state needed for emission. The evaluator
    /// has `avoid_io` set for as long as the generator lives.
    pub fn new(
        graph: &'a DepGraph,
        ev: &'a mut dyn Evaluator,
        cache: &'a dyn MakefileCache,
        config: &'a GeneratorConfig,
    ) -> Self {
        let mut ev = AvoidIoScope::new(ev);
        let shell = ev.eval_var(intern("SHELL"));
        let gomacc = config
            .goma_dir
            .as_ref()
            .map(|dir| format!("{dir}/gomacc "))
            .unwrap_or_default();
        let mut used_envs = BTreeMap::new();
        for name in ev.used_env_vars() {
            let value = ev.eval_var(name);
            used_envs.insert(name.as_str().to_owned(), value);
        }
        Self {
            graph,
            ev,
            cache,
            config,
            shell,
            gomacc,
            done: HashSet::new(),
            short_names: BTreeMap::new(),
            rule_id: 0,
            used_envs,
            out: String::new(),
        }
    }

    /// Produce the three artefacts: envlist, Ninja file, shell wrapper.
    ///
    /// # Errors
    ///
    /// Returns [`NinjaGenError::NoDefaultTarget`] when the graph has no
    /// roots and `build_all_targets` is false, and
    /// [`NinjaGenError::Format`] when output assembly fails.
    pub fn generate(
        mut self,
        build_all_targets: bool,
        orig_args: &str,
    ) -> Result<NinjaOutput, NinjaGenError> {
        let envlist = self.generate_envlist()?;
        let ninja = self.generate_ninja(build_all_targets, orig_args)?;
        let shell = self.generate_shell()?;
        Ok(NinjaOutput {
            ninja,
            shell,
            envlist,
        })
    }

    fn generate_envlist(&mut self) -> Result<Option<String>, fmt::Error> {
        if self.used_envs.is_empty() {
            return Ok(None);
        }
        let mut out = String::new();
        for (name, value) in &self.used_envs {
            writeln!(out, "{name}={value}")?;
        }
        Ok(Some(out))
    }

    fn generate_ninja(
        &mut self,
        build_all_targets: bool,
        orig_args: &str,
    ) -> Result<String, NinjaGenError> {
        let graph = self.graph;
        if !build_all_targets && graph.roots().is_empty() {
            return Err(NinjaGenError::NoDefaultTarget);
        }

        writeln!(self.out, "# Generated by maki {}", env!("CARGO_PKG_VERSION"))?;
        writeln!(self.out)?;

        if !self.used_envs.is_empty() {
            writeln!(self.out, "# Environment variables used:")?;
            for (name, value) in &self.used_envs {
                writeln!(self.out, "# {name}={value}")?;
            }
            writeln!(self.out)?;
        }

        if self.config.goma_dir.is_some() {
            writeln!(self.out, "pool local_pool")?;
            writeln!(self.out, " depth = {}", self.config.num_jobs)?;
            writeln!(self.out)?;
        }

        self.emit_regen_rules(orig_args)?;

        for &root in graph.roots() {
            self.emit_node(root)?;
        }

        writeln!(self.out)?;
        writeln!(self.out, "# shortcuts:")?;
        for (base, output) in &self.short_names {
            if !output.is_empty() && !self.done.contains(base) {
                writeln!(self.out, "build {base}: phony {output}")?;
            }
        }

        if !build_all_targets {
            let first = graph.node(graph.roots()[0]).output;
            writeln!(self.out, "\ndefault {first}")?;
        }

        Ok(mem::take(&mut self.out))
    }

    fn gen_rule_name(&mut self) -> String {
        let name = format!("rule{}", self.rule_id);
        self.rule_id += 1;
        name
    }

    fn emit_node(&mut self, id: NodeId) -> fmt::Result {
        let graph = self.graph;
        let node = graph.node(id);
        if !self.done.insert(node.output) {
            return Ok(());
        }
        if node.cmds.is_empty() && node.deps.is_empty() && node.order_onlys.is_empty()
            && !node.is_phony
        {
            return Ok(());
        }

        let output = node.output.as_str();
        let base = basename(output);
        if base != output {
            // Shortcuts exist only for unique basenames.
            self.short_names
                .entry(intern(base))
                .and_modify(|existing| *existing = Symbol::empty())
                .or_insert(node.output);
        }

        let commands = self.ev.evaluate(graph, id);

        let mut rule_name = String::from("phony");
        let mut use_local_pool = false;
        if !commands.is_empty() {
            rule_name = self.gen_rule_name();
            writeln!(self.out, "rule {rule_name}")?;

            let opts = ScriptOptions {
                detect_echo: self.config.detect_android_echo,
                gomacc: self
                    .config
                    .goma_dir
                    .is_some()
                    .then_some(self.gomacc.as_str()),
            };
            let Script {
                mut command,
                description,
                needs_local_pool,
            } = compose(&commands, &opts);
            use_local_pool = needs_local_pool;

            writeln!(
                self.out,
                " description = {}",
                description.as_deref().unwrap_or("build $out")
            )?;
            self.emit_depfile(&mut command)?;

            if command.len() > RSPFILE_THRESHOLD {
                writeln!(self.out, " rspfile = $out.rsp")?;
                writeln!(self.out, " rspfile_content = {command}")?;
                writeln!(self.out, " command = {} $out.rsp", self.shell)?;
            } else {
                writeln!(
                    self.out,
                    " command = {} -c \"{}\"",
                    self.shell,
                    escape_shell(&command)
                )?;
            }
        }

        self.emit_build(node, &rule_name)?;
        if use_local_pool {
            writeln!(self.out, " pool = local_pool")?;
        }

        for &dep in &node.deps {
            self.emit_node(dep)?;
        }
        for &dep in &node.order_onlys {
            self.emit_node(dep)?;
        }
        Ok(())
    }

    fn emit_depfile(&mut self, command: &mut String) -> fmt::Result {
        // A trailing space simplifies flag matching; drop it afterwards.
        command.push(' ');
        let depfile = depfile::get_depfile_from_command(command);
        command.pop();
        if let Some(depfile) = depfile {
            writeln!(self.out, " depfile = {depfile}")?;
            writeln!(self.out, " deps = gcc")?;
        }
        Ok(())
    }

    fn emit_build(&mut self, node: &DepNode, rule_name: &str) -> fmt::Result {
        let graph = self.graph;
        write!(
            self.out,
            "build {}: {rule_name}",
            escape_build_target(node.output.as_str())
        )?;
        if !node.deps.is_empty() {
            let deps = node
                .deps
                .iter()
                .map(|&dep| escape_build_target(graph.node(dep).output.as_str()))
                .join(" ");
            write!(self.out, " {deps}")?;
        }
        if !node.order_onlys.is_empty() {
            let order_onlys = node
                .order_onlys
                .iter()
                .map(|&dep| escape_build_target(graph.node(dep).output.as_str()))
                .join(" ");
            write!(self.out, " || {order_onlys}")?;
        }
        writeln!(self.out)
    }

    fn emit_regen_rules(&mut self, orig_args: &str) -> fmt::Result {
        if !self.config.gen_regen_rule {
            return Ok(());
        }

        writeln!(self.out, "rule regen_ninja")?;
        writeln!(self.out, " command = {orig_args}")?;
        writeln!(self.out, " generator = 1")?;
        writeln!(self.out, " description = Regenerate ninja files due to dependency")?;
        write!(self.out, "build {}: regen_ninja", self.config.ninja_file())?;
        let mut makefiles = self.cache.all_filenames();
        makefiles.sort();
        for makefile in &makefiles {
            write!(self.out, " {makefile}")?;
        }
        if !self.used_envs.is_empty() {
            write!(self.out, " {}", self.config.envlist_file())?;
        }
        writeln!(self.out, "\n")?;

        if self.used_envs.is_empty() {
            return Ok(());
        }

        writeln!(self.out, "build .always_build: phony")?;
        writeln!(self.out, "rule regen_envlist")?;
        write!(self.out, " command = rm -f $out.tmp")?;
        for name in self.used_envs.keys() {
            write!(self.out, " && echo {name}=$${name} >> $out.tmp")?;
        }
        if self.config.error_on_env_change {
            writeln!(
                self.out,
                " && (diff $out.tmp $out || (echo Environment variable changes are detected && false))"
            )?;
        } else {
            writeln!(self.out, " && (diff $out.tmp $out || mv $out.tmp $out)")?;
        }
        writeln!(self.out, " restat = 1")?;
        writeln!(self.out, " generator = 1")?;
        writeln!(self.out, " description = Check $out")?;
        writeln!(
            self.out,
            "build {}: regen_envlist .always_build",
            self.config.envlist_file()
        )?;
        writeln!(self.out)
    }

    fn generate_shell(&mut self) -> Result<String, NinjaGenError> {
        let mut out = String::new();
        let shebang = if self.shell.is_empty() {
            "/bin/sh"
        } else {
            self.shell.as_str()
        };
        writeln!(out, "#!{shebang}")?;
        writeln!(out, "# Generated by maki {}", env!("CARGO_PKG_VERSION"))?;
        writeln!(out)?;

        if self.config.runs_in_place() {
            writeln!(out, "cd $(dirname \"$0\")")?;
        }
        if !self.config.ninja_suffix.is_empty() {
            for sidecar in [self.config.envlist_file(), self.config.lunch_file()] {
                writeln!(out, "if [ -f {sidecar} ]; then\n export $(cat {sidecar})\nfi")?;
            }
        }

        for (name, include) in self.ev.exports() {
            if include {
                let value = self.ev.eval_var(name);
                writeln!(out, "export {name}={value}")?;
            } else {
                writeln!(out, "unset {name}")?;
            }
        }

        write!(out, "exec ninja -f {} ", self.config.ninja_file())?;
        if self.config.goma_dir.is_some() {
            write!(out, "-j500 ")?;
        }
        writeln!(out, "\"$@\"")?;
        Ok(out)
    }
}

/// The final path component of `path`.
pub(crate) fn basename(path: &str) -> &str {
    path.rfind('/').map_or(path, |slash| &path[slash + 1..])
}

/// `path` with its final extension removed.
pub(crate) fn strip_ext(path: &str) -> &str {
    path.rfind('.').map_or(path, |dot| &path[..dot])
}
