//! Byte-level escaping for build-target names and shell-quoted commands.

use std::borrow::Cow;

/// Escape `$`, `:`, and space in a Ninja build-target name.
pub(crate) fn escape_build_target(name: &str) -> Cow<'_, str> {
    if !name.contains(['$', ':', ' ']) {
        return Cow::Borrowed(name);
    }
    let mut out = String::with_capacity(name.len() + 4);
    for c in name.chars() {
        if matches!(c, '$' | ':' | ' ') {
            out.push('$');
        }
        out.push(c);
    }
    Cow::Owned(out)
}

/// Escape a composed command for embedding in double quotes after
/// `<shell> -c`.
///
/// A `$` directly following an escaped `$` stays bare, so the `$$` pairs
/// produced by recipe translation come out as `\$$` rather than `\$\$`.
pub(crate) fn escape_shell(s: &str) -> Cow<'_, str> {
    if !s.contains(['$', '`', '!', '\\', '"']) {
        return Cow::Borrowed(s);
    }
    let mut out = String::with_capacity(s.len() + 8);
    let mut last_dollar = false;
    for c in s.chars() {
        match c {
            '$' => {
                if last_dollar {
                    out.push(c);
                    last_dollar = false;
                } else {
                    out.push('\\');
                    out.push(c);
                    last_dollar = true;
                }
            }
            '`' | '"' | '!' | '\\' => {
                out.push('\\');
                out.push(c);
                last_dollar = false;
            }
            _ => {
                out.push(c);
                last_dollar = false;
            }
        }
    }
    Cow::Owned(out)
}
