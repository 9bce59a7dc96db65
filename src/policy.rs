//! Sink admission policy
//!
//! A policy decides whether a sink accepts a given call. Level checks are
//! disjunctive (an explicit level re-enables what the threshold suppresses),
//! scope checks are conjunctive.

use serde::{Deserialize, Serialize};

use crate::level::Level;
use crate::probe::CallContext;

/// Filter attached to a sink
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Policy {
    /// Minimum level admitted
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub threshold: Option<Level>,

    /// Levels admitted regardless of the threshold
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub explicit_levels: Option<Vec<Level>>,

    /// Only admit calls made from this thread
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thread: Option<String>,

    /// Only admit calls made from this class
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub class: Option<String>,

    /// Only admit calls made from this package
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub package: Option<String>,

    /// Directory name used by sinks that write files
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub catalog: Option<String>,
}

impl Policy {
    /// Create an empty policy that admits everything
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_threshold(mut self, level: Level) -> Self {
        self.threshold = Some(level);
        self
    }

    pub fn with_explicit_levels(mut self, levels: impl IntoIterator<Item = Level>) -> Self {
        self.explicit_levels = Some(levels.into_iter().collect());
        self
    }

    pub fn with_thread(mut self, thread: impl Into<String>) -> Self {
        self.thread = Some(thread.into());
        self
    }

    pub fn with_class(mut self, class: impl Into<String>) -> Self {
        self.class = Some(class.into());
        self
    }

    pub fn with_package(mut self, package: impl Into<String>) -> Self {
        self.package = Some(package.into());
        self
    }

    pub fn with_catalog(mut self, catalog: impl Into<String>) -> Self {
        self.catalog = Some(catalog.into());
        self
    }

    /// Level-only part of the admission check
    pub fn admits_level(&self, level: Level) -> bool {
        if self
            .explicit_levels
            .as_ref()
            .is_some_and(|levels| levels.contains(&level))
        {
            return true;
        }

        match self.threshold {
            Some(threshold) => level >= threshold,
            None => true,
        }
    }

    /// Decide whether a call at `level` from `context` is loggable
    pub fn is_admitted(&self, level: Level, context: &CallContext) -> bool {
        if !self.admits_level(level) {
            return false;
        }

        if self.thread.as_ref().is_some_and(|t| *t != context.thread) {
            return false;
        }

        if self
            .class
            .as_ref()
            .is_some_and(|c| *c != context.caller_class)
        {
            return false;
        }

        !self
            .package
            .as_ref()
            .is_some_and(|p| *p != context.package_name)
    }

    /// Message levels this policy lets through, in order
    pub fn enabled_levels(&self) -> Vec<Level> {
        Level::MESSAGE_LEVELS
            .into_iter()
            .filter(|level| self.admits_level(*level))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn context() -> CallContext {
        CallContext::for_test("main", "Checkout", "submit", "shop::cart")
    }

    #[test]
    fn test_empty_policy_admits_everything() {
        let policy = Policy::new();
        for level in Level::MESSAGE_LEVELS {
            assert!(policy.is_admitted(level, &context()));
        }
    }

    #[test]
    fn test_threshold_rejects_lower_levels() {
        let policy = Policy::new().with_threshold(Level::Info);
        assert!(!policy.is_admitted(Level::Debug, &context()));
        assert!(policy.is_admitted(Level::Info, &context()));
        assert!(policy.is_admitted(Level::Assert, &context()));
    }

    #[test]
    fn test_explicit_levels_reenable_below_threshold() {
        let policy = Policy::new()
            .with_threshold(Level::Error)
            .with_explicit_levels([Level::Debug]);
        assert!(policy.is_admitted(Level::Debug, &context()));
        assert!(!policy.is_admitted(Level::Info, &context()));
        assert!(!policy.is_admitted(Level::Warn, &context()));
        // Explicit entries never disable what the threshold enables
        assert!(policy.is_admitted(Level::Error, &context()));
    }

    #[test]
    fn test_scopes_are_conjunctive() {
        let policy = Policy::new()
            .with_thread("main")
            .with_class("Checkout")
            .with_package("shop::cart");
        assert!(policy.is_admitted(Level::Info, &context()));

        let other_thread = CallContext::for_test("worker", "Checkout", "submit", "shop::cart");
        assert!(!policy.is_admitted(Level::Info, &other_thread));

        let other_class = CallContext::for_test("main", "Basket", "submit", "shop::cart");
        assert!(!policy.is_admitted(Level::Info, &other_class));

        let other_package = CallContext::for_test("main", "Checkout", "submit", "shop::billing");
        assert!(!policy.is_admitted(Level::Info, &other_package));
    }

    #[test]
    fn test_explicit_level_does_not_bypass_scope() {
        let policy = Policy::new()
            .with_threshold(Level::Silent)
            .with_explicit_levels([Level::Warn])
            .with_class("Basket");
        assert!(!policy.is_admitted(Level::Warn, &context()));
    }

    #[test]
    fn test_admission_matches_rule_for_all_combinations() {
        let ctx = context();
        let thresholds = [None, Some(Level::Debug), Some(Level::Warn), Some(Level::Silent)];
        let explicit = [None, Some(vec![Level::Verbose]), Some(vec![Level::Info, Level::Assert])];
        let classes = [None, Some("Checkout"), Some("Basket")];

        for threshold in thresholds {
            for levels in &explicit {
                for class in classes {
                    let policy = Policy {
                        threshold,
                        explicit_levels: levels.clone(),
                        class: class.map(str::to_string),
                        ..Policy::default()
                    };
                    for level in Level::MESSAGE_LEVELS {
                        let listed = levels.as_ref().is_some_and(|l| l.contains(&level));
                        let above = threshold.map_or(true, |t| level >= t);
                        let scoped = class.map_or(true, |c| c == ctx.caller_class);
                        assert_eq!(
                            policy.is_admitted(level, &ctx),
                            (listed || above) && scoped,
                            "{:?} {:?} {:?} {:?}",
                            threshold,
                            levels,
                            class,
                            level
                        );
                    }
                }
            }
        }
    }

    #[test]
    fn test_enabled_levels() {
        let policy = Policy::new()
            .with_threshold(Level::Silent)
            .with_explicit_levels([Level::Warn]);
        assert_eq!(policy.enabled_levels(), vec![Level::Warn]);

        let policy = Policy::new().with_threshold(Level::Error);
        assert_eq!(policy.enabled_levels(), vec![Level::Error, Level::Assert]);
    }

    #[test]
    fn test_policy_from_toml() {
        let policy: Policy = toml::from_str(
            r#"
            threshold = "INFO"
            explicit_levels = ["D", "verbose"]
            class = "Checkout"
            "#,
        )
        .unwrap();
        assert_eq!(policy.threshold, Some(Level::Info));
        assert_eq!(
            policy.explicit_levels,
            Some(vec![Level::Debug, Level::Verbose])
        );
        assert_eq!(policy.class.as_deref(), Some("Checkout"));
        assert!(policy.thread.is_none());
    }
}
