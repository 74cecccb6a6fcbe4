//! Line helpers shared by every verbose renderer.
//!
//! Verbose output nests: a chain renders traces which render frames. Each
//! layer splits its inner rendering into lines, indents the continuation
//! lines with [`SUB_ITEM`], and joins them back together.

/// Prefix marking continuation lines of a nested rendering.
pub const SUB_ITEM: &str = "··";

/// Split `text` on `\n`. A trailing newline yields a trailing empty line.
pub fn lines(text: &str) -> Vec<String> {
    text.split('\n').map(str::to_owned).collect()
}

/// Prepend `prefix` to every line after the first `skip` lines.
pub fn indent(mut lines: Vec<String>, prefix: &str, skip: usize) -> Vec<String> {
    for line in lines.iter_mut().skip(skip) {
        line.insert_str(0, prefix);
    }
    lines
}

/// Drop trailing lines that are empty once every char in `cutset` is
/// trimmed from both ends.
pub fn trim_trailing(mut lines: Vec<String>, cutset: &str) -> Vec<String> {
    let keep = lines
        .iter()
        .rposition(|line| !line.trim_matches(|c| cutset.contains(c)).is_empty())
        .map_or(0, |last| last + 1);
    lines.truncate(keep);
    lines
}
