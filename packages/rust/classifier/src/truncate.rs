//! Bounding an excerpt in both dimensions before it is posted.

/// Marker appended wherever text was cut.
pub const ELLIPSIS: &str = "...";

/// Width and height limits for an excerpt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TruncateBounds {
    /// Maximum characters per line, ellipsis included.
    pub max_width: usize,
    /// Maximum number of lines kept; `None` means unbounded.
    pub max_lines: Option<usize>,
}

impl TruncateBounds {
    pub fn new(max_width: usize, max_lines: Option<usize>) -> Self {
        Self {
            max_width,
            max_lines,
        }
    }
}

impl Default for TruncateBounds {
    fn default() -> Self {
        Self {
            max_width: 160,
            max_lines: Some(2000),
        }
    }
}

/// Cut every line to `max_width` chars, then keep at most `max_lines` lines.
///
/// Lines come from a plain split on `'\n'`, so a terminal newline survives as
/// a trailing empty line. A cut line keeps `max_width - 3` chars (never fewer
/// than zero) followed by `...`; dropped lines are replaced by one `...` line.
/// Widths count `char`s, not bytes.
pub fn truncate(text: &str, bounds: TruncateBounds) -> String {
    let mut lines: Vec<&str> = text.split('\n').collect();
    let mut dropped_lines = false;
    if let Some(max_lines) = bounds.max_lines {
        if lines.len() > max_lines {
            lines.truncate(max_lines);
            dropped_lines = true;
        }
    }

    let mut result = String::with_capacity(text.len());
    for (idx, line) in lines.iter().enumerate() {
        if idx > 0 {
            result.push('\n');
        }
        push_line(&mut result, line, bounds.max_width);
    }

    if dropped_lines {
        if !lines.is_empty() {
            result.push('\n');
        }
        result.push_str(ELLIPSIS);
    }
    result
}

fn push_line(out: &mut String, line: &str, max_width: usize) {
    // Byte length is an upper bound on char count; skip the scan for short lines.
    if line.len() <= max_width || line.chars().count() <= max_width {
        out.push_str(line);
        return;
    }

    let keep = max_width.saturating_sub(ELLIPSIS.len());
    let cut = line
        .char_indices()
        .nth(keep)
        .map_or(line.len(), |(byte_idx, _)| byte_idx);
    out.push_str(&line[..cut]);
    out.push_str(ELLIPSIS);
}
