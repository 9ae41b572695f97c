//! Recognition of compile commands eligible for the distributed-build
//! wrapper.

/// Return the byte offset at which the wrapper token belongs, or `None`
/// when the command is not a recognized compiler invocation.
///
/// A leading `ccache` is skipped and the consumed prefix added to the
/// returned offset, so the wrapper lands directly in front of the
/// compiler itself.
pub(crate) fn gomacc_offset(cmdline: &str) -> Option<usize> {
    let space = cmdline.find(' ')?;
    let cmd = &cmdline[..space];
    if cmd.ends_with("ccache") {
        let rest = space + 1;
        return gomacc_offset(&cmdline[rest..]).map(|pos| pos + rest);
    }
    let tool = cmd.strip_prefix("prebuilts/")?;
    let tool = tool
        .strip_prefix("gcc/")
        .or_else(|| tool.strip_prefix("clang/"))?;
    if !["gcc", "g++", "clang", "clang++"]
        .iter()
        .any(|compiler| tool.ends_with(compiler))
    {
        return None;
    }
    cmdline[space..].contains(" -c ").then_some(0)
}
