// Arguments files are split into words the same way a POSIX shell would split them.
// Before splitting, `#` comments are removed: a `#` that starts a word and is not
// inside quotes comments out the rest of its line.

pub fn strip_comments(text: &str) -> String {
    text.lines()
        .map(strip_line_comment)
        .collect::<Vec<_>>()
        .join("\n")
}

fn strip_line_comment(line: &str) -> &str {
    let mut in_single = false;
    let mut in_double = false;
    let mut escaped = false;
    let mut word_start = true;

    for (idx, c) in line.char_indices() {
        if escaped {
            escaped = false;
            word_start = false;
            continue;
        }

        match c {
            '\\' if !in_single => escaped = true,
            '\'' if !in_double => in_single = !in_single,
            '"' if !in_single => in_double = !in_double,
            '#' if word_start && !in_single && !in_double => return &line[..idx],
            _ => (),
        }

        word_start = c.is_whitespace() && !in_single && !in_double;
    }

    line
}

/// Split the contents of an arguments file into individual arguments.
pub fn split_args(text: &str) -> eyre::Result<Vec<String>> {
    let args = shell_words::split(&strip_comments(text))?;
    Ok(args)
}
