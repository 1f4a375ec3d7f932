/// Default number of lines shown for each result.
pub const DEFAULT_PREVIEW_LINES: usize = 6;

/// Maximum number of characters in a preview before truncation.
pub const DEFAULT_PREVIEW_MAX_CHARS: usize = 400;

/// The opening of `text` for display under a search result.
///
/// Leading blank lines are dropped, at most `max_lines` lines are kept, and
/// the result is cut to `max_chars` characters (never inside a character).
/// An ellipsis marks any truncation. Empty or blank text yields `None`.
pub fn preview(text: &str, max_lines: usize, max_chars: usize) -> Option<String> {
    let lines: Vec<&str> = text
        .lines()
        .skip_while(|line| line.trim().is_empty())
        .collect();
    if lines.is_empty() {
        return None;
    }

    let shown = max_lines.min(lines.len());
    let mut snippet = lines[..shown].join("\n");
    let mut truncated = shown < lines.len();

    if let Some((cut, _)) = snippet.char_indices().nth(max_chars) {
        snippet.truncate(cut);
        truncated = true;
    }

    if truncated {
        snippet.push_str("...");
    }
    Some(snippet)
}

/// Indent every line of `text` by `width` spaces.
pub fn indent(text: &str, width: usize) -> String {
    let pad = " ".repeat(width);
    text.lines()
        .map(|line| format!("{pad}{line}"))
        .collect::<Vec<_>>()
        .join("\n")
}
