//! Text Formatter — keeps model output narrow enough to read in a terminal.
//!
//! Each input line is a paragraph. Paragraphs are greedy-packed word by word and
//! never merged, so blank lines and list items in the model's answer survive.

use crate::errors::IntakeError;

/// Column budget used when nothing else is configured.
pub const DEFAULT_WRAP_WIDTH: usize = 80;

/// Reflows `text` so no rendered line exceeds `width` columns.
///
/// - Splits on `'\n'` and wraps every line independently.
/// - Words are packed greedily and never split. A word wider than `width`
///   occupies its own line untruncated.
/// - Leading indentation survives on the first line of each paragraph.
/// - Empty and whitespace-only lines come back as empty lines.
pub fn wrap_text(text: &str, width: usize) -> Result<String, IntakeError> {
    if width == 0 {
        return Err(IntakeError::InvalidWidth(width));
    }

    Ok(text
        .split('\n')
        .map(|line| fill_line(line, width))
        .collect::<Vec<_>>()
        .join("\n"))
}

/// Greedy word-packing of a single line. Columns are counted in `char`s.
///
/// Leading indentation (tabs expanded) is kept on the first output line and
/// counts toward `width`; continuation lines start flush left.
fn fill_line(line: &str, width: usize) -> String {
    let body = line.trim_start();
    if body.is_empty() {
        return String::new();
    }

    let mut lines: Vec<String> = Vec::new();
    let mut current = expand_tabs(&line[..line.len() - body.len()]);
    let mut current_width = current.chars().count();
    let mut has_word = false;

    for word in body.split_whitespace() {
        let word_w = word.chars().count();

        if has_word && current_width + 1 + word_w > width {
            // Current line is full — start a new one with this word.
            lines.push(std::mem::take(&mut current));
            current_width = 0;
            has_word = false;
        }

        if has_word {
            current.push(' ');
            current_width += 1;
        }
        current.push_str(word);
        current_width += word_w;
        has_word = true;
    }

    lines.push(current);
    lines.join("\n")
}

const TAB_SIZE: usize = 8;

/// Replaces tabs with spaces up to the next multiple of `TAB_SIZE` columns.
fn expand_tabs(indent: &str) -> String {
    let mut out = String::with_capacity(indent.len());
    let mut col = 0usize;
    for ch in indent.chars() {
        if ch == '\t' {
            let pad = TAB_SIZE - col % TAB_SIZE;
            out.extend(std::iter::repeat(' ').take(pad));
            col += pad;
        } else {
            out.push(ch);
            col += 1;
        }
    }
    out
}
