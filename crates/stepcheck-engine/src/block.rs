//! Indentation-based block extraction for command output.

/// Columns counted for a literal tab when measuring indentation.
pub const TAB_WIDTH: usize = 4;

fn indent_width(line: &str) -> usize {
    let mut width = 0;
    for c in line.chars() {
        match c {
            ' ' => width += 1,
            '\t' => width += TAB_WIDTH,
            _ => break,
        }
    }
    width
}

/// Return the block that starts at the first line whose left-trimmed text
/// begins with `query`.
///
/// The block runs until the next non-blank line indented no deeper than the
/// matched line. Blank lines inside the block are kept. No match yields an
/// empty string; a blank query returns `input` unchanged.
pub fn extract_block(input: &str, query: &str) -> String {
    let query = query.trim();
    if query.is_empty() {
        return input.to_string();
    }

    let mut lines = input.split('\n');
    let Some(start) = lines.find(|line| line.trim_start_matches([' ', '\t']).starts_with(query))
    else {
        return String::new();
    };
    let base = indent_width(start);

    let mut block = vec![start];
    for line in lines {
        if !line.trim().is_empty() && indent_width(line) <= base {
            break;
        }
        block.push(line);
    }

    block
        .join("\n")
        .trim_end_matches([' ', '\n', '\t', '\r'])
        .to_string()
}
