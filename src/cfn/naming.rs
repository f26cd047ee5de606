//! Change-set name generation.
//!
//! Names take the form `{stackName}-{unixTimestamp}`. The generator is
//! injected into the deployer so tests can pin the suffix.

use std::sync::atomic::{AtomicI64, Ordering};

use chrono::Utc;

/// Produces unique change-set names.
#[cfg_attr(test, mockall::automock)]
pub trait NameGenerator: Send + Sync {
    /// Returns a fresh change-set name for the stack.
    fn change_set_name(&self, stack_name: &str) -> String;
}

/// Clock-backed generator that never repeats a suffix within the process.
///
/// Two calls inside the same second get consecutive suffixes instead of
/// colliding.
pub struct TimestampNames {
    /// Source of unix seconds.
    clock: Box<dyn Fn() -> i64 + Send + Sync>,
    /// Last suffix handed out.
    last: AtomicI64,
}

impl std::fmt::Debug for TimestampNames {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TimestampNames")
            .field("last", &self.last.load(Ordering::Relaxed))
            .finish_non_exhaustive()
    }
}

impl Default for TimestampNames {
    fn default() -> Self {
        Self::new()
    }
}

impl TimestampNames {
    /// Creates a generator reading the system clock.
    #[must_use]
    pub fn new() -> Self {
        Self::with_clock(|| Utc::now().timestamp())
    }

    /// Creates a generator with a custom clock.
    #[must_use]
    pub fn with_clock(clock: impl Fn() -> i64 + Send + Sync + 'static) -> Self {
        Self {
            clock: Box::new(clock),
            last: AtomicI64::new(i64::MIN),
        }
    }

    fn next_suffix(&self) -> i64 {
        let now = (self.clock)();
        let previous = self
            .last
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |last| {
                Some(now.max(last.saturating_add(1)))
            })
            .unwrap_or(now);
        now.max(previous.saturating_add(1))
    }
}

impl NameGenerator for TimestampNames {
    fn change_set_name(&self, stack_name: &str) -> String {
        format!("{stack_name}-{}", self.next_suffix())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn suffix(name: &str, stack: &str) -> i64 {
        name.strip_prefix(&format!("{stack}-"))
            .expect("name should start with the stack name")
            .parse()
            .expect("suffix should be an integer")
    }

    #[test]
    fn test_name_has_stack_prefix_and_integer_suffix() {
        let names = TimestampNames::with_clock(|| 1_700_000_000);
        let name = names.change_set_name("my-app");
        assert_eq!(name, "my-app-1700000000");
    }

    #[test]
    fn test_different_seconds_give_different_names() {
        let now = Arc::new(AtomicI64::new(1_700_000_000));
        let clock = Arc::clone(&now);
        let names = TimestampNames::with_clock(move || clock.load(Ordering::SeqCst));

        let first = names.change_set_name("app");
        now.store(1_700_000_005, Ordering::SeqCst);
        let second = names.change_set_name("app");

        assert_ne!(first, second);
        assert_eq!(suffix(&second, "app"), 1_700_000_005);
    }

    #[test]
    fn test_same_second_does_not_collide() {
        let names = TimestampNames::with_clock(|| 42);
        let first = names.change_set_name("app");
        let second = names.change_set_name("app");
        assert_eq!(suffix(&first, "app"), 42);
        assert_eq!(suffix(&second, "app"), 43);
    }

    #[test]
    fn test_system_clock_suffix_is_recent() {
        let names = TimestampNames::new();
        let before = Utc::now().timestamp();
        let name = names.change_set_name("stack");
        assert!(suffix(&name, "stack") >= before);
    }
}
