use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};

use parking_lot::Mutex;

use crate::error::FetchError;

use super::ValueSource;

/// Replays a fixed sequence of outcomes.
///
/// `None` entries produce a fetch failure. Once the script is exhausted the
/// `fallback` value is returned forever.
pub struct ScriptedSource {
    script: Mutex<VecDeque<Option<i64>>>,
    fallback: Option<i64>,
    fetches: AtomicUsize,
}

impl ScriptedSource {
    pub fn new(script: impl IntoIterator<Item = Option<i64>>, fallback: Option<i64>) -> Self {
        Self {
            script: Mutex::new(script.into_iter().collect()),
            fallback,
            fetches: AtomicUsize::new(0),
        }
    }

    /// Always returns `value`
    pub fn constant(value: i64) -> Self {
        Self::new(Vec::new(), Some(value))
    }

    /// Always fails
    pub fn failing() -> Self {
        Self::new(Vec::new(), None)
    }

    /// Append outcomes to the end of the script
    pub fn push(&self, outcome: Option<i64>) {
        self.script.lock().push_back(outcome);
    }

    /// Number of fetch attempts so far
    pub fn fetch_count(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }
}

impl ValueSource for ScriptedSource {
    fn fetch(&self) -> Result<i64, FetchError> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        let next = self.script.lock().pop_front().unwrap_or(self.fallback);
        next.ok_or_else(|| FetchError::Other("scripted failure".to_string()))
    }

    fn name(&self) -> &'static str {
        "scripted"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_script_then_fallback() {
        let source = ScriptedSource::new(vec![Some(1), None, Some(3)], Some(9));
        assert_eq!(source.fetch().unwrap(), 1);
        assert!(source.fetch().is_err());
        assert_eq!(source.fetch().unwrap(), 3);
        assert_eq!(source.fetch().unwrap(), 9);
        assert_eq!(source.fetch().unwrap(), 9);
        assert_eq!(source.fetch_count(), 5);
    }

    #[test]
    fn test_failing_source() {
        let source = ScriptedSource::failing();
        assert!(source.fetch().is_err());
        source.push(Some(4));
        assert_eq!(source.fetch().unwrap(), 4);
        assert!(source.fetch().is_err());
    }
}
