//! Pulls the human-relevant part out of a TeX run's output.

/// Errors beyond this many are dropped; the first one is almost always the cause.
const MAX_ERRORS: usize = 5;
/// Context lines kept after each `!` line while looking for its `l.<n>` locator.
const MAX_CONTEXT_LINES: usize = 4;
/// Lines of console output used when the log has no `!` lines.
const FALLBACK_TAIL_LINES: usize = 20;

/// Builds the diagnostic text for a failed compilation.
///
/// Prefers the `!`-prefixed error blocks of the `.log` file, each with the
/// following lines up to and including its `l.<n>` source locator. Falls back
/// to the tail of the console output when the log is missing or has no errors.
pub fn summarize(log: Option<&str>, console: &str) -> String {
    if let Some(errors) = log.and_then(error_blocks) {
        return errors;
    }

    let lines: Vec<&str> = console.lines().filter(|l| !l.trim().is_empty()).collect();
    let tail = &lines[lines.len().saturating_sub(FALLBACK_TAIL_LINES)..];
    if tail.is_empty() {
        "the compiler failed without producing any output".to_string()
    } else {
        tail.join("\n")
    }
}

fn error_blocks(log: &str) -> Option<String> {
    let lines: Vec<&str> = log.lines().collect();
    let mut blocks = Vec::new();

    let mut i = 0;
    while i < lines.len() && blocks.len() < MAX_ERRORS {
        if !lines[i].starts_with('!') {
            i += 1;
            continue;
        }

        let mut block = vec![lines[i].trim_end()];
        let mut j = i + 1;
        while j < lines.len() && j <= i + MAX_CONTEXT_LINES && !lines[j].starts_with('!') {
            block.push(lines[j].trim_end());
            if lines[j].starts_with("l.") {
                break;
            }
            j += 1;
        }

        blocks.push(block.join("\n").trim_end().to_string());
        // Resume after the locator, or at the line that ended the block
        i = if lines.get(j).is_some_and(|l| l.starts_with("l.")) {
            j + 1
        } else {
            j
        };
    }

    if blocks.is_empty() {
        None
    } else {
        Some(blocks.join("\n\n"))
    }
}
