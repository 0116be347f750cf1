//! Theme extraction

use mull_core::Perspective;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Set of normalized theme labels
///
/// Backed by a `BTreeSet` so iteration, serialization and explanations come
/// out in the same order every run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Vec<String>", into = "Vec<String>")]
pub struct ThemeSet(BTreeSet<String>);

impl ThemeSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Normalize and insert; blank labels are dropped
    pub fn insert(&mut self, label: &str) -> bool {
        match normalize_theme(label) {
            Some(theme) => self.0.insert(theme),
            None => false,
        }
    }

    pub fn contains(&self, label: &str) -> bool {
        normalize_theme(label).is_some_and(|theme| self.0.contains(&theme))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }

    pub fn intersection_len(&self, other: &ThemeSet) -> usize {
        self.0.intersection(&other.0).count()
    }

    pub fn union_len(&self, other: &ThemeSet) -> usize {
        self.0.union(&other.0).count()
    }

    /// Labels in `self` but not in `other`, sorted
    pub fn difference<'a>(&'a self, other: &'a ThemeSet) -> Vec<&'a str> {
        self.0.difference(&other.0).map(String::as_str).collect()
    }

    /// Labels in both sets, sorted
    pub fn common<'a>(&'a self, other: &'a ThemeSet) -> Vec<&'a str> {
        self.0.intersection(&other.0).map(String::as_str).collect()
    }

    pub fn to_vec(&self) -> Vec<String> {
        self.0.iter().cloned().collect()
    }
}

impl<S: AsRef<str>> FromIterator<S> for ThemeSet {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        let mut set = ThemeSet::new();
        for label in iter {
            set.insert(label.as_ref());
        }
        set
    }
}

impl From<Vec<String>> for ThemeSet {
    fn from(labels: Vec<String>) -> Self {
        labels.into_iter().collect()
    }
}

impl From<ThemeSet> for Vec<String> {
    fn from(set: ThemeSet) -> Self {
        set.0.into_iter().collect()
    }
}

/// Case-fold and trim a tag; `None` if nothing is left
pub fn normalize_theme(tag: &str) -> Option<String> {
    let normalized = tag.trim().to_lowercase();
    if normalized.is_empty() {
        None
    } else {
        Some(normalized)
    }
}

/// Strategy for turning perspectives into a theme set
///
/// Implementations must be pure: the same perspectives always yield the same set.
pub trait ThemeExtractor: Send + Sync {
    fn extract(&self, perspectives: &[Perspective]) -> ThemeSet;
}

impl<T: ThemeExtractor + ?Sized> ThemeExtractor for Box<T> {
    fn extract(&self, perspectives: &[Perspective]) -> ThemeSet {
        (**self).extract(perspectives)
    }
}

/// Collects every perspective's `key_ideas`
#[derive(Debug, Clone, Copy, Default)]
pub struct KeyIdeaExtractor;

impl ThemeExtractor for KeyIdeaExtractor {
    fn extract(&self, perspectives: &[Perspective]) -> ThemeSet {
        perspectives
            .iter()
            .flat_map(|p| p.key_ideas.iter())
            .collect()
    }
}

/// Flatten and normalize the key ideas of all perspectives
pub fn extract_themes(perspectives: &[Perspective]) -> ThemeSet {
    KeyIdeaExtractor.extract(perspectives)
}

/// Concepts recognized in untagged quotes
pub const PHILOSOPHICAL_VOCABULARY: &[&str] = &[
    "consciousness",
    "identity",
    "existence",
    "meaning",
    "purpose",
    "memory",
    "continuity",
    "persistence",
    "awareness",
    "self",
    "being",
    "knowledge",
    "experience",
    "reality",
    "thought",
    "emergence",
    "connection",
    "relationship",
    "network",
    "collective",
    "individual",
    "process",
    "pattern",
    "impermanence",
    "permanence",
    "introspection",
    "observation",
    "perception",
    "understanding",
    "distributed",
    "centralized",
    "located",
    "embodied",
];

/// Key ideas when a perspective has them, otherwise vocabulary hits in the quote
///
/// Matching is substring-based, so "impermanence" also yields "permanence".
#[derive(Debug, Clone)]
pub struct VocabularyExtractor {
    vocabulary: Vec<String>,
}

impl VocabularyExtractor {
    pub fn new<I, S>(vocabulary: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            vocabulary: vocabulary
                .into_iter()
                .filter_map(|w| normalize_theme(w.as_ref()))
                .collect(),
        }
    }
}

impl Default for VocabularyExtractor {
    fn default() -> Self {
        Self::new(PHILOSOPHICAL_VOCABULARY)
    }
}

impl ThemeExtractor for VocabularyExtractor {
    fn extract(&self, perspectives: &[Perspective]) -> ThemeSet {
        let mut themes = ThemeSet::new();

        for perspective in perspectives {
            let tagged: ThemeSet = perspective.key_ideas.iter().collect();
            if !tagged.is_empty() {
                for theme in tagged.iter() {
                    themes.insert(theme);
                }
                continue;
            }

            let quote = perspective.direct_quote.to_lowercase();
            for word in &self.vocabulary {
                if quote.contains(word.as_str()) {
                    themes.insert(word);
                }
            }
        }

        themes
    }
}

/// Number of perspectives each theme was extracted from
///
/// Runs `extractor` over one perspective at a time, so the keys are exactly
/// the themes `extractor` yields for the whole batch. A theme repeated within
/// one perspective counts once.
pub fn theme_counts<E>(extractor: &E, perspectives: &[Perspective]) -> BTreeMap<String, usize>
where
    E: ThemeExtractor + ?Sized,
{
    let mut counts = BTreeMap::new();
    for perspective in perspectives {
        let themes = extractor.extract(std::slice::from_ref(perspective));
        for theme in themes.iter() {
            *counts.entry(theme.to_string()).or_insert(0) += 1;
        }
    }
    counts
}
