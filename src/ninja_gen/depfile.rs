//! Depfile inference from composed shell commands.
//!
//! Compiler invocations that ask for dependency output (`-MD`/`-MMD`)
//! get a `depfile =` line in their rule. The command text itself may be
//! rewritten along the way, so the platform quirks below operate on the
//! caller's buffer in place.

use tracing::error;

use super::{basename, strip_ext};

/// Find `name` in `cmd`, rejecting a match at offset 0: the flag must be
/// preceded by other command text.
fn find_flag(cmd: &str, name: &str) -> Option<usize> {
    cmd.find(name).filter(|&pos| pos != 0)
}

/// The whitespace-delimited argument of `name`.
///
/// Repeated flags resolve to the last occurrence, matching what the shell
/// command would actually do with e.g. a doubled `-MF`.
fn find_flag_arg<'a>(cmd: &'a str, name: &str) -> Option<&'a str> {
    let pos = find_flag(cmd, name)?;
    let mut val = cmd[pos + name.len()..].trim_start_matches([' ', '\t']);
    while let Some(next) = val.find(name) {
        val = val[next + name.len()..].trim_start_matches([' ', '\t']);
    }
    let end = val.find([' ', '\t']).unwrap_or(val.len());
    Some(&val[..end])
}

/// Infer the depfile path from the dependency-output flags alone.
fn depfile_from_flags(cmd: &str) -> Option<String> {
    if find_flag(cmd, " -MD").is_none() && find_flag(cmd, " -MMD").is_none() {
        return None;
    }
    find_flag(cmd, " -c")?;

    if let Some(mf) = find_flag_arg(cmd, " -MF") {
        if !mf.is_empty() {
            return Some(mf.to_owned());
        }
    }

    match find_flag_arg(cmd, " -o") {
        Some(o) if !o.is_empty() => Some(format!("{}.d", strip_ext(o))),
        _ => {
            error!("cannot find the depfile in {cmd}");
            None
        }
    }
}

/// Infer the depfile for a composed command, applying the platform quirks.
///
/// `cmd` may be rewritten in place: the `.P` cleanup removal and the
/// trailing `cp <depfile> <depfile>.tmp` are spliced into it.
pub(crate) fn get_depfile_from_command(cmd: &mut String) -> Option<String> {
    let mut depfile = depfile_from_flags(cmd)?;

    // llvm-rs-cc does not emit a dep file even when asked for one.
    if cmd.contains("bin/llvm-rs-cc ") {
        return None;
    }

    // Recipes that post-process the .d into a .P remove the .d afterwards;
    // keep the .P and drop the removal so a file is left for Ninja.
    let p = format!("{}.P", strip_ext(&depfile));
    if cmd.contains(&p) {
        let rm_f = format!("; rm -f {depfile}");
        if let Some(found) = cmd.find(&rm_f) {
            cmd.replace_range(found..found + rm_f.len(), "");
        } else {
            error!("cannot find removal of .d file: {cmd}");
        }
        return Some(p);
    }

    // For .s files the C preprocessor never runs, so -MF is ignored.
    let assembler_input = format!("/{}.s", strip_ext(basename(&depfile)));
    if cmd.contains(&assembler_input) {
        return None;
    }

    cmd.push_str("&& cp ");
    cmd.push_str(&depfile);
    cmd.push(' ');
    cmd.push_str(&depfile);
    cmd.push_str(".tmp ");
    depfile.push_str(".tmp");
    Some(depfile)
}
