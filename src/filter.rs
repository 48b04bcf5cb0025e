use std::cmp::Ordering;

use crate::types::{FilterCriteria, Match};

/// Number of matches revealed per page
pub const PAGE_SIZE: usize = 20;

/// Order matches by magnitude, highest first. Ties keep their file order.
pub fn sort_by_magnitude(matches: &mut [Match]) {
    matches.sort_by(|a, b| {
        b.magnitude
            .partial_cmp(&a.magnitude)
            .unwrap_or(Ordering::Equal)
    });
}

/// `query` must already be trimmed and lowercased
fn passes(m: &Match, criteria: &FilterCriteria, query: &str) -> bool {
    if !criteria.reputes.contains(m.repute) || m.magnitude < criteria.min_magnitude {
        return false;
    }

    query.is_empty()
        || m.rsid().to_lowercase().contains(query)
        || m.gene.to_lowercase().contains(query)
        || m.summary.to_lowercase().contains(query)
}

/// The filtered view of `matches`, in their original order
pub fn derive_view<'a>(matches: &'a [Match], criteria: &FilterCriteria) -> Vec<&'a Match> {
    let query = criteria.query.trim().to_lowercase();
    matches
        .iter()
        .filter(|m| passes(m, criteria, &query))
        .collect()
}

/// Tracks how much of a filtered list has been revealed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RevealPager {
    page_size: usize,
    revealed: usize,
}

impl Default for RevealPager {
    fn default() -> Self {
        Self::new(PAGE_SIZE)
    }
}

impl RevealPager {
    pub fn new(page_size: usize) -> Self {
        let page_size = page_size.max(1);
        Self {
            page_size,
            revealed: page_size,
        }
    }

    pub fn page_size(&self) -> usize {
        self.page_size
    }

    /// Back to the first page
    pub fn reset(&mut self) {
        self.revealed = self.page_size;
    }

    /// Items visible out of a list of `len`
    pub fn visible_count(&self, len: usize) -> usize {
        self.revealed.min(len)
    }

    pub fn has_more(&self, len: usize) -> bool {
        self.revealed < len
    }

    /// Reveal one more page, capped at `len`. Returns the new visible count.
    pub fn reveal_more(&mut self, len: usize) -> usize {
        if self.has_more(len) {
            self.revealed = (self.revealed + self.page_size).min(len);
        }
        self.visible_count(len)
    }

    pub fn page<'a, T>(&self, items: &'a [T]) -> &'a [T] {
        &items[..self.visible_count(items.len())]
    }
}

/// Owns a match list and its criteria, and keeps the filtered view and page in sync
#[derive(Debug, Clone, Default)]
pub struct MatchBrowser {
    matches: Vec<Match>,
    criteria: FilterCriteria,
    filtered: Vec<usize>,
    pager: RevealPager,
}

impl MatchBrowser {
    pub fn new(matches: Vec<Match>, criteria: FilterCriteria, page_size: usize) -> Self {
        let mut browser = Self {
            matches,
            criteria,
            filtered: Vec::new(),
            pager: RevealPager::new(page_size),
        };
        browser.recompute();
        browser
    }

    pub fn set_matches(&mut self, matches: Vec<Match>) {
        self.matches = matches;
        self.recompute();
    }

    pub fn set_criteria(&mut self, criteria: FilterCriteria) {
        self.criteria = criteria;
        self.recompute();
    }

    pub fn criteria(&self) -> &FilterCriteria {
        &self.criteria
    }

    pub fn total(&self) -> usize {
        self.matches.len()
    }

    pub fn filtered_len(&self) -> usize {
        self.filtered.len()
    }

    /// All matches passing the criteria
    pub fn filtered(&self) -> impl Iterator<Item = &Match> + '_ {
        self.filtered.iter().map(|&i| &self.matches[i])
    }

    /// The revealed page of the filtered view
    pub fn visible(&self) -> impl Iterator<Item = &Match> + '_ {
        self.pager.page(&self.filtered).iter().map(|&i| &self.matches[i])
    }

    pub fn visible_count(&self) -> usize {
        self.pager.visible_count(self.filtered.len())
    }

    pub fn has_more(&self) -> bool {
        self.pager.has_more(self.filtered.len())
    }

    pub fn reveal_more(&mut self) -> usize {
        self.pager.reveal_more(self.filtered.len())
    }

    fn recompute(&mut self) {
        let query = self.criteria.query.trim().to_lowercase();
        self.filtered = self
            .matches
            .iter()
            .enumerate()
            .filter(|(_, m)| passes(m, &self.criteria, &query))
            .map(|(i, _)| i)
            .collect();
        self.pager.reset();
    }
}
