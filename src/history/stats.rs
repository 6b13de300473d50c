//! Profile statistics derived from search history.
//!
//! Pure functions over the full record list; recomputed after every
//! mutation rather than cached.

use super::SearchRecord;
use crate::session::{Language, Persona};

/// Statistics shown on a profile view.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProfileStats {
    /// Total number of stored searches.
    pub total_searches: usize,
    /// Most frequent persona; `Outings` for an empty history.
    pub favorite_persona: Persona,
    /// Most frequent language; `En` for an empty history.
    pub preferred_language: Language,
}

impl Default for ProfileStats {
    fn default() -> Self {
        Self {
            total_searches: 0,
            favorite_persona: Persona::Outings,
            preferred_language: Language::En,
        }
    }
}

/// Aggregate a user's full history into profile statistics.
///
/// Frequency ties resolve to the value encountered first in iteration
/// order, so with newest-first input the most recent of the tied values
/// wins.
#[must_use]
pub fn aggregate(records: &[SearchRecord]) -> ProfileStats {
    ProfileStats {
        total_searches: records.len(),
        favorite_persona: most_frequent(records.iter().map(|r| r.persona)).unwrap_or_default(),
        preferred_language: most_frequent(records.iter().map(|r| r.language)).unwrap_or_default(),
    }
}

/// Most frequent value, ties broken by first encounter.
fn most_frequent<T: Copy + PartialEq>(values: impl Iterator<Item = T>) -> Option<T> {
    let mut counts: Vec<(T, usize)> = Vec::new();
    for value in values {
        match counts.iter_mut().find(|(seen, _)| *seen == value) {
            Some((_, n)) => *n += 1,
            None => counts.push((value, 1)),
        }
    }

    let mut best: Option<(T, usize)> = None;
    for (value, n) in counts {
        // Strict > keeps the earlier value on ties.
        if best.map_or(true, |(_, best_n)| n > best_n) {
            best = Some((value, n));
        }
    }
    best.map(|(value, _)| value)
}
