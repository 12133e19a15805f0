//! Char-indexed line utilities.
//!
//! Columns throughout the workspace are char indices, not byte offsets, so
//! every slice of a line goes through these helpers to stay on char
//! boundaries. Word and blank classification matches classic vi word
//! motions: ASCII alphanumerics plus underscore form words, space and tab
//! are blanks, everything else is punctuation.

/// Number of chars in `line`.
pub fn char_len(line: &str) -> usize {
    line.chars().count()
}

/// Byte offset of char column `col`, saturating to the end of the line.
pub fn byte_at(line: &str, col: usize) -> usize {
    line.char_indices()
        .nth(col)
        .map_or(line.len(), |(idx, _)| idx)
}

/// Slice of the half-open char-column range `[start, end)`.
pub fn slice(line: &str, start: usize, end: usize) -> &str {
    if end <= start {
        return "";
    }
    &line[byte_at(line, start)..byte_at(line, end)]
}

/// Char at column `col`, if the line is long enough.
pub fn char_at(line: &str, col: usize) -> Option<char> {
    line.chars().nth(col)
}

/// Column of the first non-blank char (0 for an all-blank or empty line).
pub fn first_non_blank(line: &str) -> usize {
    line.chars().take_while(|&c| is_blank(c)).count()
}

/// Leading whitespace prefix of the line.
pub fn leading_whitespace(line: &str) -> &str {
    let end = first_non_blank(line);
    slice(line, 0, end)
}

pub fn is_word_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

pub fn is_blank(c: char) -> bool {
    c == ' ' || c == '\t'
}
