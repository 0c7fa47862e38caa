//! Optimistic concurrency expectations for conditional writes.

/// What a conditional write expects to find before it overwrites a value.
///
/// Stores compare the current persisted value against the expectation and refuse
/// the write on mismatch, so a caller acting on a stale read never clobbers a
/// concurrent change.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Expected<T> {
    /// Skip the check (unconditional write).
    Any,
    /// Require the current value to equal this one.
    Exact(T),
}

impl<T: PartialEq> Expected<T> {
    pub fn matches(&self, actual: &T) -> bool {
        match self {
            Expected::Any => true,
            Expected::Exact(v) => v == actual,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn any_matches_everything() {
        assert!(Expected::<i64>::Any.matches(&0));
        assert!(Expected::<i64>::Any.matches(&-5));
    }

    #[test]
    fn exact_matches_only_its_value() {
        let expected = Expected::Exact(10_i64);
        assert!(expected.matches(&10));
        assert!(!expected.matches(&9));
    }
}
