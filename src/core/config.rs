use std::path::Path;
use serde::{Serialize, Deserialize};
use crate::core::error::{Error, ErrorKind, Result};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Maximum length of one LIKE segment between '%' separators
    pub query_max_len: usize,
    /// Number of compiled plans kept by the planner cache
    pub plan_cache_size: usize,
    /// Page size of the term directory file
    pub btree_page_size: usize,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            query_max_len: i32::MAX as usize,
            plan_cache_size: 64,
            btree_page_size: 4096,
        }
    }
}

impl Config {
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        serde_json::from_str(&text)
            .map_err(|e| Error::new(ErrorKind::WrongParameter, e.to_string()))
    }
}
