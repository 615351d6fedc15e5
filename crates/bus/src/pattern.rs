//! Key matching seam
//!
//! Pattern compilation is deliberately kept behind a trait: the bus only
//! needs a `matches(text) -> bool` capability. The default implementation
//! compiles patterns as regular expressions, which is also the pattern
//! language of `keys()`.

use ember_core::{Error, Result};

/// A compiled key matcher.
pub trait KeyMatcher: Send + Sync {
    /// Whether `text` matches this pattern.
    fn matches(&self, text: &str) -> bool;
}

/// Regex-backed matcher, the default pattern language.
///
/// Matching is unanchored: `first` matches `"my first hash"`. Anchor with
/// `^`/`$` for exact keys.
#[derive(Debug)]
pub struct RegexMatcher {
    inner: regex::Regex,
}

impl RegexMatcher {
    /// Compile a pattern, reporting compiler diagnostics as [`Error::Pattern`].
    pub fn compile(pattern: &str) -> Result<Self> {
        let inner = regex::Regex::new(pattern).map_err(|e| Error::Pattern {
            pattern: pattern.to_string(),
            reason: e.to_string(),
        })?;
        Ok(RegexMatcher { inner })
    }
}

impl KeyMatcher for RegexMatcher {
    fn matches(&self, text: &str) -> bool {
        self.inner.is_match(text)
    }
}

/// An ordered set of compiled matchers belonging to one subscription.
pub struct PatternSet {
    matchers: Vec<Box<dyn KeyMatcher>>,
}

impl PatternSet {
    /// Compile every pattern with the default regex matcher.
    pub fn compile(patterns: &[&str]) -> Result<Self> {
        let mut matchers: Vec<Box<dyn KeyMatcher>> = Vec::with_capacity(patterns.len());
        for pattern in patterns {
            matchers.push(Box::new(RegexMatcher::compile(pattern)?));
        }
        Ok(PatternSet { matchers })
    }

    /// Build a set from already-compiled matchers.
    pub fn from_matchers(matchers: Vec<Box<dyn KeyMatcher>>) -> Self {
        PatternSet { matchers }
    }

    /// Whether any pattern in the set matches `key`.
    ///
    /// This is an any-match test: overlapping patterns still yield a single
    /// positive answer, which is what keeps delivery at once per event.
    pub fn matches(&self, key: &str) -> bool {
        self.matchers.iter().any(|m| m.matches(key))
    }

    /// Number of patterns in the set.
    pub fn len(&self) -> usize {
        self.matchers.len()
    }

    /// Whether the set is empty (and so matches nothing).
    pub fn is_empty(&self) -> bool {
        self.matchers.is_empty()
    }
}
