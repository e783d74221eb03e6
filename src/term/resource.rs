use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use once_cell::sync::Lazy;
use parking_lot::Mutex;

const DEFAULT_STOPWORDS: [&str; 26] = [
    "a", "an", "and", "are", "as", "at", "be", "by", "for", "from", "in", "is", "it", "of",
    "on", "or", "that", "the", "this", "to", "was", "were", "will", "with", "not", "no",
];

/// Tuning profile of the term processor, selected by resource id
#[derive(Debug, Clone)]
pub struct TermResource {
    /// Upper bound of initial search terms
    pub max_term1: usize,
    /// Upper bound of expansion search terms
    pub max_term2: usize,
    /// Upper bound of expansion candidates pooled from seed documents
    pub max_candidate: usize,
    /// Weight scale applied to initial terms
    pub param_scale1: f64,
    /// Proximity of initial terms; the sign selects ordered or unordered
    pub param_proximity1: i32,
    /// Proximity of related terms
    pub param_proximity2: i32,
    pub stopwords: HashSet<String>,
}

impl Default for TermResource {
    fn default() -> Self {
        TermResource {
            max_term1: 50,
            max_term2: 10,
            max_candidate: 200,
            param_scale1: 1.0,
            param_proximity1: 0,
            param_proximity2: 0,
            stopwords: DEFAULT_STOPWORDS.iter().map(|s| s.to_string()).collect(),
        }
    }
}

impl TermResource {
    pub fn is_stopword(&self, term: &str) -> bool {
        self.stopwords.contains(term)
    }
}

static RESOURCES: Lazy<Mutex<HashMap<u32, Arc<TermResource>>>> =
    Lazy::new(|| Mutex::new(HashMap::new()));

/// Resource for an id; unknown ids fall back to the built-in profile
pub fn get(resource_id: u32) -> Arc<TermResource> {
    let mut map = RESOURCES.lock();
    map.entry(resource_id).or_insert_with(|| Arc::new(TermResource::default())).clone()
}

/// Install a profile for an id, replacing any previous one
pub fn register(resource_id: u32, resource: TermResource) {
    RESOURCES.lock().insert(resource_id, Arc::new(resource));
}
