//! Text helpers shared by checks and filters.

/// Returns the display width of the first `to_idx` characters of `line`,
/// expanding each tab to the next multiple of `tab_width`.
///
/// # Example
///
/// ```ignore
/// assert_eq!(length_expanded_tabs("\tx", 2, 4), 5);
/// ```
#[must_use]
pub fn length_expanded_tabs(line: &str, to_idx: usize, tab_width: usize) -> usize {
    let mut len = 0;
    for c in line.chars().take(to_idx) {
        if c == '\t' && tab_width > 0 {
            len = (len / tab_width + 1) * tab_width;
        } else {
            len += 1;
        }
    }
    len
}

/// Returns true if the line holds only whitespace.
#[must_use]
pub fn is_blank(line: &str) -> bool {
    line.chars().all(char::is_whitespace)
}

/// Splits text into lines on `\n`, `\r\n` and lone `\r`.
#[must_use]
pub fn split_lines(text: &str) -> Vec<String> {
    let mut lines = Vec::new();
    let mut current = String::new();
    let mut chars = text.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '\n' => lines.push(std::mem::take(&mut current)),
            '\r' => {
                if chars.peek() == Some(&'\n') {
                    chars.next();
                }
                lines.push(std::mem::take(&mut current));
            }
            c => current.push(c),
        }
    }
    if !current.is_empty() {
        lines.push(current);
    }
    lines
}
