//! Selection policy for `read(limit)`.

/// How many records a read returns, decoded from the raw integer limit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Limit {
    /// Every record (`limit == 0`, or a clamped negative limit).
    All,
    /// At most this many records, taken from the front.
    First(usize),
    /// No records (`limit < 0` without clamping).
    Nothing,
}

impl Limit {
    /// Decode a raw limit.
    ///
    /// `0` means no limit. A negative limit selects nothing unless
    /// `clamp_negative` is set, in which case it also means no limit.
    pub fn from_raw(raw: i64, clamp_negative: bool) -> Self {
        match raw {
            0 => Limit::All,
            n if n < 0 && clamp_negative => Limit::All,
            n if n < 0 => Limit::Nothing,
            n => Limit::First(usize::try_from(n).unwrap_or(usize::MAX)),
        }
    }

    /// Apply the selection to a collection, preserving order.
    pub fn apply<T>(self, mut records: Vec<T>) -> Vec<T> {
        match self {
            Limit::All => records,
            Limit::First(n) => {
                records.truncate(n);
                records
            }
            Limit::Nothing => Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_raw() {
        assert_eq!(Limit::from_raw(0, false), Limit::All);
        assert_eq!(Limit::from_raw(3, false), Limit::First(3));
        assert_eq!(Limit::from_raw(-1, false), Limit::Nothing);
        assert_eq!(Limit::from_raw(-1, true), Limit::All);
        assert_eq!(Limit::from_raw(i64::MIN, false), Limit::Nothing);
    }

    #[test]
    fn test_apply_selection_for_every_limit() {
        let records = vec!["a", "b", "c"];
        let len = records.len() as i64;

        for raw in -3..=6 {
            let selected = Limit::from_raw(raw, false).apply(records.clone());
            let expected: Vec<&str> = if raw == 0 || raw > len {
                records.clone()
            } else if raw < 0 {
                Vec::new()
            } else {
                records[..raw as usize].to_vec()
            };
            assert_eq!(selected, expected, "limit {}", raw);
        }
    }

    #[test]
    fn test_apply_on_empty_collection() {
        let empty: Vec<u8> = Vec::new();
        assert!(Limit::First(5).apply(empty.clone()).is_empty());
        assert!(Limit::All.apply(empty).is_empty());
    }
}
