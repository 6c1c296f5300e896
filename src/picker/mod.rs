mod fzf;

use async_trait::async_trait;
use fuzzy_matcher::skim::SkimMatcherV2;
use fuzzy_matcher::FuzzyMatcher;

use crate::error::Result;

pub use fzf::Fzf;

/// Chooses one candidate, interactively or by filtering.
#[async_trait]
pub trait Picker: Send + Sync {
    /// Ask the user to choose, starting from `query`. `None` means nothing
    /// was chosen (cancelled or no match).
    async fn pick(&self, candidates: &[String], query: &str) -> Result<Option<String>>;

    /// Non-interactive: candidates matching `query`, best first.
    fn filter(&self, candidates: &[String], query: &str) -> Vec<String> {
        filter_candidates(candidates, query)
    }
}

/// Rank `candidates` against `query`; ties keep input order. An empty query
/// matches everything.
pub fn filter_candidates(candidates: &[String], query: &str) -> Vec<String> {
    let query = query.trim();
    if query.is_empty() {
        return candidates.to_vec();
    }

    let matcher = SkimMatcherV2::default();
    let mut scored: Vec<(i64, usize)> = candidates
        .iter()
        .enumerate()
        .filter_map(|(i, c)| matcher.fuzzy_match(c, query).map(|score| (score, i)))
        .collect();
    scored.sort_by(|a, b| b.0.cmp(&a.0).then(a.1.cmp(&b.1)));
    scored.into_iter().map(|(_, i)| candidates[i].clone()).collect()
}
