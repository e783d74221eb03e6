use serde::{Serialize, Deserialize};
use crate::btree::pagefile::{PageId, UNDEFINED_PAGE_ID};
use crate::core::error::{Error, ErrorKind, Result};

/// One key/value pair of a B-tree page. In a leaf the value is the id of
/// the posting-list page the term maps to; in a node it is the child page
/// id and the key is the smallest key of that subtree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entry {
    pub key: String,
    pub value: PageId,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BtreePage {
    pub id: PageId,
    pub prev: PageId,
    pub next: PageId,
    /// Distance from the root, 1-based
    pub step: u32,
    pub leaf: bool,
    /// Maintenance sequence number stamped at the last structural change
    pub seqno: u32,
    pub entries: Vec<Entry>,
}

impl BtreePage {
    pub fn new(id: PageId, prev: PageId, next: PageId, step: u32, leaf: bool) -> Self {
        BtreePage { id, prev, next, step, leaf, seqno: 0, entries: Vec::new() }
    }

    pub fn from_payload(payload: &[u8]) -> Result<BtreePage> {
        Ok(bincode::deserialize(payload)?)
    }

    pub fn to_payload(&self) -> Result<Vec<u8>> {
        Ok(bincode::serialize(self)?)
    }

    pub fn payload_size(&self) -> Result<usize> {
        Ok(bincode::serialized_size(self)? as usize)
    }

    pub fn count(&self) -> usize {
        self.entries.len()
    }

    /// Index of the greatest entry whose key is <= the argument
    pub fn locate(&self, key: &str) -> Option<usize> {
        match self.entries.binary_search_by(|e| e.key.as_str().cmp(key)) {
            Ok(i) => Some(i),
            Err(0) => None,
            Err(i) => Some(i - 1),
        }
    }

    /// Value of the greatest entry whose key is <= the argument
    pub fn search(&self, key: &str) -> Option<PageId> {
        self.locate(key).map(|i| self.entries[i].value)
    }

    /// Value of the entry matching the key exactly
    pub fn find(&self, key: &str) -> Option<PageId> {
        self.entries
            .binary_search_by(|e| e.key.as_str().cmp(key))
            .ok()
            .map(|i| self.entries[i].value)
    }

    pub fn insert(&mut self, key: &str, value: PageId) -> Result<()> {
        match self.entries.binary_search_by(|e| e.key.as_str().cmp(key)) {
            Ok(_) => Err(Error::new(
                ErrorKind::BadArgument,
                format!("duplicate key: {}", key),
            )),
            Err(i) => {
                self.entries.insert(i, Entry { key: key.to_string(), value });
                Ok(())
            }
        }
    }

    pub fn expunge(&mut self, key: &str) -> Option<Entry> {
        match self.entries.binary_search_by(|e| e.key.as_str().cmp(key)) {
            Ok(i) => Some(self.entries.remove(i)),
            Err(_) => None,
        }
    }

    /// Detach the upper half of the entries for a page split
    pub fn split_off(&mut self) -> Vec<Entry> {
        let mid = self.entries.len() / 2;
        self.entries.split_off(mid)
    }

    pub fn first_key(&self) -> Option<&str> {
        self.entries.first().map(|e| e.key.as_str())
    }

    pub fn last_key(&self) -> Option<&str> {
        self.entries.last().map(|e| e.key.as_str())
    }

    pub fn has_prev(&self) -> bool {
        self.prev != UNDEFINED_PAGE_ID
    }

    pub fn has_next(&self) -> bool {
        self.next != UNDEFINED_PAGE_ID
    }

    /// Keys must be strictly ascending within the page
    pub fn verify_order(&self) -> Result<()> {
        for pair in self.entries.windows(2) {
            if pair[0].key >= pair[1].key {
                return Err(Error::new(
                    ErrorKind::VerifyAborted,
                    format!("page {}: keys out of order at '{}'", self.id, pair[1].key),
                ));
            }
        }
        Ok(())
    }
}
