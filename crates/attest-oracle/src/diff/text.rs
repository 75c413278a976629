//! Edit distance over opaque text, used to rank non-JSON bodies and
//! unknown URL paths.

use similar::{DiffTag, TextDiff};

/// Number of character edits separating two strings.
///
/// Each non-equal diff opcode contributes the longer of its two ranges, the
/// same measure `difflib`-style sequence matching yields.
pub fn edit_count(expected: &str, actual: &str) -> usize {
    let diff = TextDiff::from_chars(expected, actual);
    diff.ops()
        .iter()
        .map(|op| match op.tag() {
            DiffTag::Equal => 0,
            _ => op.old_range().len().max(op.new_range().len()),
        })
        .sum()
}
