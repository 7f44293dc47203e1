use std::borrow::Cow;

use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

/// Display width of a string in terminal columns.
///
/// Plant names are mostly CJK, so byte or char counts are useless for
/// column alignment: each CJK character occupies two columns.
pub fn display_width(s: &str) -> usize {
    UnicodeWidthStr::width(s)
}

const ELLIPSIS: &str = "...";
const ELLIPSIS_WIDTH: usize = 3;

/// Truncate `s` so it occupies at most `max_width` columns.
///
/// Appends `...` when text is cut and there is room for at least one
/// character before it. Returns the input borrowed when it already fits.
///
/// ```
/// use duorou::util::truncate_to_width;
///
/// assert_eq!(truncate_to_width("Echeveria", 20), "Echeveria");
/// assert_eq!(truncate_to_width("Echeveria elegans", 10), "Echever...");
/// assert_eq!(truncate_to_width("玉露锦", 5), "玉...");
/// ```
pub fn truncate_to_width(s: &str, max_width: usize) -> Cow<'_, str> {
    if display_width(s) <= max_width {
        return Cow::Borrowed(s);
    }

    // Too narrow for "char + ellipsis": keep what fits, no marker.
    let budget = if max_width <= ELLIPSIS_WIDTH {
        max_width
    } else {
        max_width - ELLIPSIS_WIDTH
    };

    let mut used = 0;
    let mut cut = 0;
    for (idx, c) in s.char_indices() {
        let w = UnicodeWidthChar::width(c).unwrap_or(0);
        if used + w > budget {
            break;
        }
        used += w;
        cut = idx + c.len_utf8();
    }

    if max_width <= ELLIPSIS_WIDTH {
        Cow::Owned(s[..cut].to_string())
    } else {
        Cow::Owned(format!("{}{}", &s[..cut], ELLIPSIS))
    }
}

/// Truncate then right-pad with spaces to exactly `width` columns.
pub fn pad_to_width(s: &str, width: usize) -> String {
    let truncated = truncate_to_width(s, width);
    let pad = width.saturating_sub(display_width(&truncated));
    format!("{}{}", truncated, " ".repeat(pad))
}

/// Drop control characters (including ESC) from remote text before it
/// reaches the terminal. Tab and newline survive.
pub fn strip_control_chars(s: &str) -> Cow<'_, str> {
    let dirty = |c: char| c.is_control() && c != '\t' && c != '\n';
    if !s.chars().any(dirty) {
        return Cow::Borrowed(s);
    }
    Cow::Owned(s.chars().filter(|c| !dirty(*c)).collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn width_counts_cjk_as_two() {
        assert_eq!(display_width("Hello"), 5);
        assert_eq!(display_width("熊童子"), 6);
    }

    #[test]
    fn truncate_fits_is_borrowed() {
        assert!(matches!(truncate_to_width("short", 10), Cow::Borrowed(_)));
    }

    #[test]
    fn truncate_adds_ellipsis() {
        assert_eq!(truncate_to_width("Hello World", 8), "Hello...");
    }

    #[test]
    fn truncate_never_splits_wide_char() {
        // 3 wide chars = 6 columns; budget 7 - 3 = 4 columns -> 2 chars
        assert_eq!(truncate_to_width("熊童子锦", 7), "熊童...");
    }

    #[test]
    fn truncate_narrow_widths() {
        assert_eq!(truncate_to_width("Test", 0), "");
        assert_eq!(truncate_to_width("Test", 2), "Te");
        assert_eq!(truncate_to_width("Test", 3), "Tes");
    }

    #[test]
    fn pad_reaches_exact_width() {
        let padded = pad_to_width("玉露", 8);
        assert_eq!(display_width(&padded), 8);
        assert_eq!(padded, "玉露    ");
    }

    #[test]
    fn strip_removes_escape_sequences_bytes() {
        assert_eq!(strip_control_chars("a\x1b[31mb"), "a[31mb");
        assert_eq!(strip_control_chars("line\nnext\tcol"), "line\nnext\tcol");
        assert!(matches!(strip_control_chars("clean"), Cow::Borrowed(_)));
    }
}
