use std::collections::HashMap;
use crate::term::element::TermElement;

/// Bounded, insertion-ordered pool of term elements. When the pool is
/// full the entry with the smallest weight makes room for a heavier one.
#[derive(Debug)]
pub struct TermPool {
    max_term: usize,
    elements: Vec<TermElement>,
}

impl TermPool {
    pub fn new(max_term: usize) -> Self {
        TermPool { max_term, elements: Vec::new() }
    }

    pub fn len(&self) -> usize {
        self.elements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    pub fn insert_term(&mut self, element: TermElement) {
        if self.elements.len() < self.max_term {
            self.elements.push(element);
            return;
        }
        let min = self
            .elements
            .iter()
            .enumerate()
            .min_by(|a, b| a.1.twv.total_cmp(&b.1.twv))
            .map(|(i, e)| (i, e.twv));
        if let Some((index, twv)) = min {
            if element.twv > twv {
                self.elements.remove(index);
                self.elements.push(element);
            }
        }
    }

    pub fn set_df(&mut self, term: &str, df: u32) {
        for e in self.elements.iter_mut().filter(|e| e.string == term) {
            e.df = df;
        }
    }

    /// Drop entries whose normalized form came out empty
    pub fn validate_pool(&mut self) {
        self.elements.retain(|e| !e.string.is_empty());
    }

    pub fn iter(&self) -> std::slice::Iter<'_, TermElement> {
        self.elements.iter()
    }

    pub fn iter_mut(&mut self) -> std::slice::IterMut<'_, TermElement> {
        self.elements.iter_mut()
    }

    pub fn contains(&self, term: &str) -> bool {
        self.elements.iter().any(|e| e.string == term)
    }

    pub fn clear(&mut self) {
        self.elements.clear();
    }
}

/// Occurrence statistics of one term across the seed documents
#[derive(Debug, Default, Clone)]
pub struct TermStats {
    pub element: Option<TermElement>,
    /// (seed document id, in-document frequency)
    pub postings: Vec<(u32, u32)>,
}

impl TermStats {
    pub fn seed_frequency(&self) -> u32 {
        self.postings.iter().map(|&(_, tf)| tf).sum()
    }

    pub fn seed_documents(&self) -> usize {
        self.postings.len()
    }
}

/// Map of normalized term to its seed-document statistics, used for
/// weighting and pseudo-relevance expansion
#[derive(Debug, Default)]
pub struct TermMap {
    entries: HashMap<String, TermStats>,
}

impl TermMap {
    pub fn new() -> Self {
        TermMap::default()
    }

    pub fn insert(&mut self, element: TermElement, seed_id: u32) {
        let stats = self.entries.entry(element.string.clone()).or_default();
        if stats.element.is_none() {
            stats.element = Some(element);
        }
        match stats.postings.iter_mut().find(|(id, _)| *id == seed_id) {
            Some((_, tf)) => *tf += 1,
            None => stats.postings.push((seed_id, 1)),
        }
    }

    pub fn get(&self, term: &str) -> Option<&TermStats> {
        self.entries.get(term)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &TermStats)> {
        self.entries.iter()
    }
}
