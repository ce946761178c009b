//! Display synchronization: what each cell shows for a given value.
//!
//! Everything here is pure. The widget applies the returned
//! [`Reconciliation`] to its cell elements, fires callbacks, and arms the
//! reveal timer when asked to.

/// Result of reconciling a value against `cells` cells.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reconciliation {
    /// Text per cell, `None` for an empty cell.
    pub cells: Vec<Option<char>>,
    /// Index reported to the input callback, `None` for an empty value.
    pub input_index: Option<usize>,
    /// The value fills every cell.
    pub complete: bool,
    /// Secure mode: all cells should be masked after the reveal delay.
    pub schedule_mask: bool,
}

/// Reconcile `value` for display.
///
/// `active_index` is the cell being edited, when the caller knows it; `caret`
/// is the input's selection start. With `mask` set (secure mode) only the last
/// character is shown in clear and the rest as the mask glyph.
pub fn reconcile(
    value: &str,
    active_index: Option<usize>,
    caret: usize,
    cells: usize,
    mask: Option<char>,
) -> Reconciliation {
    let chars: Vec<char> = value.chars().collect();
    let len = chars.len();

    let (display, input_index) = match mask {
        None => {
            let display = (0..cells).map(|i| chars.get(i).copied()).collect();
            (display, active_index.or(len.checked_sub(1)))
        }
        Some(glyph) => {
            let display = (0..cells)
                .map(|i| match chars.get(i) {
                    Some(&c) if i + 1 == len => Some(c),
                    Some(_) => Some(glyph),
                    None => None,
                })
                .collect();
            (display, active_index.or(Some(caret)))
        }
    };

    Reconciliation {
        cells: display,
        input_index: if len == 0 { None } else { input_index },
        complete: len == cells,
        schedule_mask: mask.is_some() && len > 0,
    }
}

/// Every populated cell as `glyph`.
pub fn masked(value: &str, cells: usize, glyph: char) -> Vec<Option<char>> {
    let len = value.chars().count();
    (0..cells).map(|i| (i < len).then_some(glyph)).collect()
}

/// Keep only ASCII digits.
pub fn digits_only(text: &str) -> String {
    text.chars().filter(char::is_ascii_digit).collect()
}

/// First `max` characters of `text`.
pub fn truncate_chars(text: &str, max: usize) -> &str {
    match text.char_indices().nth(max) {
        Some((at, _)) => &text[..at],
        None => text,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn shown(r: &Reconciliation) -> String {
        r.cells.iter().map(|c| c.unwrap_or('_')).collect()
    }

    #[test]
    fn plain_cells_mirror_value() {
        let r = reconcile("123", Some(3), 3, 6, None);
        assert_eq!(shown(&r), "123___");
        assert_eq!(r.input_index, Some(3));
        assert!(!r.complete);
        assert!(!r.schedule_mask);
    }

    #[test]
    fn plain_index_defaults_to_last_char() {
        let r = reconcile("1234", None, 0, 6, None);
        assert_eq!(r.input_index, Some(3));
    }

    #[test]
    fn complete_when_full() {
        let r = reconcile("123456", None, 6, 6, None);
        assert!(r.complete);
        assert_eq!(shown(&r), "123456");
    }

    #[test]
    fn empty_value() {
        for mask in [None, Some('•')] {
            let r = reconcile("", Some(0), 0, 4, mask);
            assert_eq!(shown(&r), "____");
            assert_eq!(r.input_index, None);
            assert!(!r.complete);
            assert!(!r.schedule_mask);
        }
    }

    #[test]
    fn secure_reveals_only_last() {
        let r = reconcile("1234", None, 4, 6, Some('•'));
        assert_eq!(shown(&r), "•••4__");
        assert_eq!(r.input_index, Some(4));
        assert!(r.schedule_mask);
    }

    #[test]
    fn secure_prefers_given_index() {
        let r = reconcile("12", Some(1), 2, 4, Some('*'));
        assert_eq!(r.input_index, Some(1));
        assert_eq!(shown(&r), "*2__");
    }

    #[test]
    fn secure_complete_is_independent_of_timer() {
        let r = reconcile("1234", None, 4, 4, Some('•'));
        assert!(r.complete);
        assert!(r.schedule_mask);
    }

    #[test]
    fn masked_hides_everything() {
        let cells: String = masked("123", 5, '•')
            .into_iter()
            .map(|c| c.unwrap_or('_'))
            .collect();
        assert_eq!(cells, "•••__");
    }

    #[test]
    fn filters() {
        assert_eq!(digits_only("12-34-56"), "123456");
        assert_eq!(digits_only("12a3bc45"), "12345");
        assert_eq!(truncate_chars("1234567", 6), "123456");
        assert_eq!(truncate_chars("12", 6), "12");
        assert_eq!(truncate_chars("é1", 1), "é");
    }

    #[test]
    fn at_most_one_clear_character_in_secure_mode() {
        for value in ["", "1", "12", "123456"] {
            let r = reconcile(value, None, value.len(), 6, Some('•'));
            let clear = r.cells.iter().flatten().filter(|&&c| c != '•').count();
            assert!(clear <= 1, "{value:?} shows {clear} clear cells");
        }
    }
}
