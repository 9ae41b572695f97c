//! Translation of single recipe lines into Ninja-safe shell fragments.

/// Append the Ninja-safe translation of one recipe line to `buf`.
///
/// Callers record `buf.len()` before the call and read the result back as
/// a range of `buf`; the trailing trim below never reaches into earlier
/// content.
pub(crate) fn translate_command(input: &str, buf: &mut String) {
    let start = buf.len();
    let mut prev_backslash = false;
    // Seeded with a space so a leading `#` registers as a comment.
    let mut prev_char = ' ';
    let mut quote: Option<char> = None;

    for c in input.chars() {
        match c {
            '#' if quote.is_none() && prev_char.is_ascii_whitespace() => break,
            '\'' | '"' | '`' => {
                match quote {
                    Some(q) if q == c => quote = None,
                    Some(_) => {}
                    None if !prev_backslash => quote = Some(c),
                    None => {}
                }
                buf.push(c);
            }
            '$' => buf.push_str("$$"),
            '\n' => {
                if prev_backslash {
                    // Splice the continuation: drop the backslash.
                    buf.pop();
                } else {
                    buf.push(' ');
                }
            }
            _ => buf.push(c),
        }

        prev_backslash = c == '\\' && !prev_backslash;
        prev_char = c;
    }

    let kept = buf[start..]
        .trim_end_matches(|c: char| c.is_ascii_whitespace() || c == ';')
        .len();
    buf.truncate(start + kept);
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn translate(input: &str) -> String {
        let mut buf = String::new();
        translate_command(input, &mut buf);
        buf
    }

    #[rstest]
    #[case::passthrough("gcc -c foo.c", "gcc -c foo.c")]
    #[case::dollar_doubled("echo $FOO", "echo $$FOO")]
    #[case::comment_stripped("gcc -c foo.c # builds foo", "gcc -c foo.c")]
    #[case::hash_mid_token_kept("echo a#b", "echo a#b")]
    #[case::hash_in_quotes_kept(r##"echo "# kept""##, r##"echo "# kept""##)]
    #[case::hash_in_single_quotes_kept("echo '# kept'", "echo '# kept'")]
    #[case::leading_comment("# nothing here", "")]
    #[case::continuation_spliced("gcc \\\n -c foo.c", "gcc  -c foo.c")]
    #[case::bare_newline_becomes_space("echo a\necho b", "echo a echo b")]
    #[case::trailing_semicolon_trimmed("run.sh ;  ", "run.sh")]
    #[case::quoted_semicolon_kept("echo 'a;'", "echo 'a;'")]
    #[case::escaped_quote_does_not_open(r#"echo \" # gone"#, r#"echo \""#)]
    #[case::whitespace_only("   \t ", "")]
    fn translates_recipe_lines(#[case] input: &str, #[case] expected: &str) {
        assert_eq!(translate(input), expected);
    }

    #[test]
    fn appends_after_existing_content() {
        let mut buf = String::from("(");
        translate_command("echo hi ; ", &mut buf);
        assert_eq!(buf, "(echo hi");
    }

    #[test]
    fn trailing_trim_stops_at_the_start_offset() {
        let mut buf = String::from("a && ");
        translate_command("  ;; ", &mut buf);
        assert_eq!(buf, "a && ");
    }
}
