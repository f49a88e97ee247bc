/// Normalizes extracted text so prompt size tracks content, not layout noise.
///
/// - CRLF and lone CR become LF
/// - control characters and whitespace runs inside a line become one space
/// - each line is trimmed
/// - consecutive blank lines collapse to one; leading and trailing blank lines are dropped
pub fn normalize_whitespace(raw: &str) -> String {
    let unified = raw.replace("\r\n", "\n").replace('\r', "\n");

    let mut lines: Vec<String> = Vec::new();
    for line in unified.split('\n') {
        let line = collapse_inline(line);
        let previous_blank = lines.last().map_or(true, |l| l.is_empty());
        if line.is_empty() && previous_blank {
            continue;
        }
        lines.push(line);
    }

    while lines.last().is_some_and(|l| l.is_empty()) {
        lines.pop();
    }

    lines.join("\n")
}

fn collapse_inline(line: &str) -> String {
    line.split(|c: char| c.is_whitespace() || c.is_control())
        .filter(|word| !word.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}
