//! Evaluated recipe lines.

/// One recipe line after variable expansion, together with the Make
/// modifiers that survive evaluation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Command {
    /// The shell command text.
    pub cmd: String,
    /// False when the line was prefixed with `@` in the makefile.
    pub echo: bool,
    /// True when the line was prefixed with `-` in the makefile.
    pub ignore_error: bool,
}

impl Command {
    /// A plain command with default modifiers.
    #[must_use]
    pub fn new(cmd: impl Into<String>) -> Self {
        Self {
            cmd: cmd.into(),
            echo: true,
            ignore_error: false,
        }
    }
}
