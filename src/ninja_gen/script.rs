//! Composition of a recipe list into a single shell line.

use crate::command::Command;

use super::gomacc::gomacc_offset;
use super::translate::translate_command;

/// Per-run switches the composer needs from the configuration.
pub(crate) struct ScriptOptions<'a> {
    /// Capture rule descriptions from silent `echo` prefixes.
    pub(crate) detect_echo: bool,
    /// Wrapper token (ending in a space) spliced into recognized compile
    /// commands, when distributed builds are configured.
    pub(crate) gomacc: Option<&'a str>,
}

/// The composed shell line and what the emitter must do with it.
pub(crate) struct Script {
    pub(crate) command: String,
    pub(crate) description: Option<String>,
    /// True when a wrapper is configured but this command did not receive
    /// it; such commands must not saturate the widened job limit.
    pub(crate) needs_local_pool: bool,
}

/// Join translated recipes into one shell line.
///
/// Recipes chain with `&&`, or `;` after a recipe whose errors are
/// ignored. Multi-recipe scripts run each recipe in a subshell unless the
/// recipe already starts with `(`. A recipe that translates to nothing
/// becomes `true`.
pub(crate) fn compose(commands: &[Command], opts: &ScriptOptions) -> Script {
    let mut buf = String::new();
    let mut description = None;
    let mut use_gomacc = false;
    let mut prev_ignore_error = false;

    for (index, command) in commands.iter().enumerate() {
        if !buf.is_empty() {
            buf.push_str(if prev_ignore_error { " ; " } else { " && " });
        }
        prev_ignore_error = command.ignore_error;

        let line = command
            .cmd
            .trim_start_matches(|c: char| c.is_ascii_whitespace());
        let needs_subshell = commands.len() > 1 && !line.starts_with('(');
        if needs_subshell {
            buf.push('(');
        }

        let start = buf.len();
        translate_command(line, &mut buf);
        if opts.detect_echo && description.is_none() && !command.echo {
            if let Some(captured) = echo_description(&buf[start..]) {
                description = Some(captured);
                buf.truncate(start);
            }
        }
        if buf.len() == start {
            buf.push_str("true");
        } else if let Some(gomacc) = opts.gomacc {
            if let Some(pos) = gomacc_offset(&buf[start..]) {
                buf.insert_str(start + pos, gomacc);
                use_gomacc = true;
            }
        }

        if index + 1 == commands.len() && command.ignore_error {
            buf.push_str(" ; true");
        }
        if needs_subshell {
            buf.push(')');
        }
    }

    Script {
        command: buf,
        description,
        needs_local_pool: opts.gomacc.is_some() && !use_gomacc,
    }
}

/// Extract a rule description from a lone `echo` command.
///
/// Returns the echo body with its outer quotes stripped and backslash
/// escapes preserved. Redirections, pipes, and command separators outside
/// quotes disqualify the line.
fn echo_description(cmd: &str) -> Option<String> {
    let body = cmd.strip_prefix("echo ")?;
    let mut out = String::new();
    let mut prev_backslash = false;
    let mut quote: Option<char> = None;
    for c in body.chars() {
        if prev_backslash {
            prev_backslash = false;
            out.push(c);
        } else if c == '\\' {
            prev_backslash = true;
            out.push(c);
        } else if let Some(q) = quote {
            if c == q {
                quote = None;
            } else {
                out.push(c);
            }
        } else {
            match c {
                '\'' | '"' | '`' => quote = Some(c),
                '<' | '>' | '&' | '|' | ';' => return None,
                _ => out.push(c),
            }
        }
    }
    Some(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    const PLAIN: ScriptOptions<'static> = ScriptOptions {
        detect_echo: false,
        gomacc: None,
    };

    fn cmd(text: &str) -> Command {
        Command::new(text)
    }

    fn ignoring(text: &str) -> Command {
        Command {
            ignore_error: true,
            ..Command::new(text)
        }
    }

    fn silent(text: &str) -> Command {
        Command {
            echo: false,
            ..Command::new(text)
        }
    }

    #[test]
    fn single_recipe_stays_bare() {
        let script = compose(&[cmd("gcc -c foo.c")], &PLAIN);
        assert_eq!(script.command, "gcc -c foo.c");
        assert_eq!(script.description, None);
        assert!(!script.needs_local_pool);
    }

    #[test]
    fn recipes_chain_in_subshells() {
        let script = compose(&[cmd("mkdir -p out"), cmd("gcc -c foo.c")], &PLAIN);
        assert_eq!(script.command, "(mkdir -p out) && (gcc -c foo.c)");
    }

    #[test]
    fn ignored_errors_switch_the_separator() {
        let script = compose(&[ignoring("rm -f out"), cmd("gcc -c foo.c")], &PLAIN);
        assert_eq!(script.command, "(rm -f out) ; (gcc -c foo.c)");
    }

    #[test]
    fn trailing_ignored_recipe_ends_in_true() {
        let script = compose(&[cmd("gcc -c foo.c"), ignoring("rm -f tmp")], &PLAIN);
        assert_eq!(script.command, "(gcc -c foo.c) && (rm -f tmp ; true)");
    }

    #[test]
    fn existing_subshell_is_not_rewrapped() {
        let script = compose(&[cmd("(cd sub && make)"), cmd("touch stamp")], &PLAIN);
        assert_eq!(script.command, "(cd sub && make) && (touch stamp)");
    }

    #[rstest]
    #[case::empty("")]
    #[case::whitespace("   ")]
    #[case::comment_only("# removed")]
    fn empty_translation_becomes_true(#[case] text: &str) {
        let script = compose(&[cmd(text)], &PLAIN);
        assert_eq!(script.command, "true");
    }

    #[test]
    fn silent_echo_becomes_the_description() {
        let opts = ScriptOptions {
            detect_echo: true,
            gomacc: None,
        };
        let script = compose(
            &[silent(r#"echo "  CC   foo.o""#), cmd("gcc -c foo.c -o foo.o")],
            &opts,
        );
        assert_eq!(script.description.as_deref(), Some("  CC   foo.o"));
        assert_eq!(script.command, "(true) && (gcc -c foo.c -o foo.o)");
    }

    #[test]
    fn echoed_echo_is_not_captured() {
        let opts = ScriptOptions {
            detect_echo: true,
            gomacc: None,
        };
        let script = compose(&[cmd(r#"echo "visible""#)], &opts);
        assert_eq!(script.description, None);
        assert_eq!(script.command, r#"echo "visible""#);
    }

    #[rstest]
    #[case::redirect("echo hi > log")]
    #[case::pipe("echo hi | tee log")]
    #[case::sequence("echo hi; echo there")]
    fn compound_echo_is_not_captured(#[case] text: &str) {
        let opts = ScriptOptions {
            detect_echo: true,
            gomacc: None,
        };
        let script = compose(&[silent(text)], &opts);
        assert_eq!(script.description, None);
    }

    #[test]
    fn wrapper_is_spliced_before_the_compiler() {
        let opts = ScriptOptions {
            detect_echo: false,
            gomacc: Some("/goma/gomacc "),
        };
        let script = compose(
            &[cmd("prebuilts/clang/host/clang -c foo.c -o foo.o")],
            &opts,
        );
        assert_eq!(
            script.command,
            "/goma/gomacc prebuilts/clang/host/clang -c foo.c -o foo.o"
        );
        assert!(!script.needs_local_pool);
    }

    #[test]
    fn unwrapped_commands_request_the_local_pool() {
        let opts = ScriptOptions {
            detect_echo: false,
            gomacc: Some("/goma/gomacc "),
        };
        let script = compose(&[cmd("cp a b")], &PLAIN);
        assert!(!script.needs_local_pool);
        let script = compose(&[cmd("cp a b")], &opts);
        assert!(script.needs_local_pool);
    }
}
