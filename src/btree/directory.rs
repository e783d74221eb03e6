use std::collections::HashSet;
use std::path::Path;
use crate::btree::page::BtreePage;
use crate::btree::pagefile::{PageFile, PageId, UNDEFINED_PAGE_ID};
use crate::core::error::{Error, ErrorKind, Result};

const HEADER_PAGE: PageId = 0;
const HEADER_SIZE: usize = 24;

/// Header of the directory, kept on page 0. The first 20 bytes are the
/// fixed on-disk layout root/left/right/count/depth; the maintenance
/// sequence number follows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Header {
    root: PageId,
    left_leaf: PageId,
    right_leaf: PageId,
    count: u32,
    depth: u32,
    seqno: u32,
}

impl Header {
    fn empty() -> Header {
        Header {
            root: UNDEFINED_PAGE_ID,
            left_leaf: UNDEFINED_PAGE_ID,
            right_leaf: UNDEFINED_PAGE_ID,
            count: 0,
            depth: 0,
            seqno: 0,
        }
    }

    fn from_payload(payload: &[u8]) -> Result<Header> {
        if payload.len() < HEADER_SIZE {
            return Err(Error::new(ErrorKind::VerifyAborted, "header page truncated"));
        }
        let word = |i: usize| u32::from_le_bytes(payload[i * 4..i * 4 + 4].try_into().unwrap());
        Ok(Header {
            root: word(0),
            left_leaf: word(1),
            right_leaf: word(2),
            count: word(3),
            depth: word(4),
            seqno: word(5),
        })
    }

    fn to_payload(self) -> Vec<u8> {
        let mut out = Vec::with_capacity(HEADER_SIZE);
        for v in [self.root, self.left_leaf, self.right_leaf, self.count, self.depth, self.seqno] {
            out.extend_from_slice(&v.to_le_bytes());
        }
        out
    }
}

/// Persistent map from normalized term to the page id of its posting
/// list. Writes are linearized through `&mut self`; a sequence of
/// mutations becomes durable at `flush_all_pages` and is discarded as a
/// whole by `recover_all_pages`.
pub struct BtreeDirectory {
    file: PageFile,
    header: Header,
}

impl BtreeDirectory {
    pub fn create(path: &Path, page_size: usize) -> Result<BtreeDirectory> {
        let mut file = PageFile::create(path, page_size)?;
        let id = file.allocate_page()?;
        debug_assert_eq!(id, HEADER_PAGE);
        let header = Header::empty();
        file.write_page(HEADER_PAGE, header.to_payload())?;
        file.flush_all_pages()?;
        Ok(BtreeDirectory { file, header })
    }

    pub fn open(path: &Path, page_size: usize) -> Result<BtreeDirectory> {
        let mut file = PageFile::open(path, page_size)?;
        let header = Header::from_payload(&file.read_page(HEADER_PAGE)?)?;
        Ok(BtreeDirectory { file, header })
    }

    pub fn entry_count(&self) -> u32 {
        self.header.count
    }

    pub fn flush_all_pages(&mut self) -> Result<()> {
        self.file.flush_all_pages()
    }

    pub fn recover_all_pages(&mut self) {
        self.file.recover_all_pages();
        self.header = self
            .file
            .read_page(HEADER_PAGE)
            .and_then(|p| Header::from_payload(&p))
            .unwrap_or_else(|_| Header::empty());
    }

    pub fn save_all_pages(&mut self) -> Result<()> {
        self.file.save_all_pages()
    }

    /// Drop every entry and reinitialize the header
    pub fn clear(&mut self) -> Result<()> {
        self.file.clear()?;
        let id = self.file.allocate_page()?;
        debug_assert_eq!(id, HEADER_PAGE);
        self.header = Header::empty();
        self.write_header()?;
        self.file.flush_all_pages()
    }

    pub fn move_to(&mut self, new_path: &Path) -> Result<()> {
        self.file.move_to(new_path)
    }

    fn write_header(&mut self) -> Result<()> {
        self.file.write_page(HEADER_PAGE, self.header.to_payload())
    }

    fn load_page(&mut self, id: PageId, step: u32) -> Result<BtreePage> {
        let mut page = BtreePage::from_payload(&self.file.read_page(id)?)?;
        // the step is a property of the traversal, not of the stored page
        page.step = step;
        Ok(page)
    }

    fn store_page(&mut self, page: &BtreePage) -> Result<()> {
        self.file.write_page(page.id, page.to_payload()?)
    }

    /// Leaf page id the key maps to, or None when the key sorts below
    /// every stored entry (or the tree is empty)
    pub fn search(&mut self, key: &str) -> Result<Option<PageId>> {
        if self.header.root == UNDEFINED_PAGE_ID {
            return Ok(None);
        }

        // rightmost-leaf fast path
        if self.header.right_leaf != UNDEFINED_PAGE_ID {
            let right = self.load_page(self.header.right_leaf, self.header.depth)?;
            if let Some(first) = right.first_key() {
                if key >= first {
                    return Ok(right.search(key));
                }
            }
        }

        let mut page = self.load_page(self.header.root, 1)?;
        loop {
            if page.leaf {
                return Ok(page.search(key));
            }
            let child = match page.search(key) {
                Some(c) => c,
                None => return Ok(None),
            };
            let step = page.step + 1;
            page = self.load_page(child, step)?;
        }
    }

    pub fn insert(&mut self, key: &str, value: PageId) -> Result<()> {
        match self.insert_inner(key, value) {
            Ok(()) => Ok(()),
            Err(e) => {
                self.recover_all_pages();
                Err(e)
            }
        }
    }

    pub fn expunge(&mut self, key: &str) -> Result<()> {
        match self.expunge_inner(key, false) {
            Ok(_) => Ok(()),
            Err(e) => {
                self.recover_all_pages();
                Err(e)
            }
        }
    }

    /// Replace one entry; the old key must exist
    pub fn update(
        &mut self,
        old_key: &str,
        _old_value: PageId,
        new_key: &str,
        new_value: PageId,
    ) -> Result<()> {
        let result = (|| {
            if !self.expunge_inner(old_key, true)? {
                return Err(Error::new(
                    ErrorKind::EntryNotFound,
                    format!("update of absent key: {}", old_key),
                ));
            }
            self.insert_inner(new_key, new_value)
        })();
        match result {
            Ok(()) => Ok(()),
            Err(e) => {
                self.recover_all_pages();
                Err(e)
            }
        }
    }

    fn insert_inner(&mut self, key: &str, value: PageId) -> Result<()> {
        if self.header.root == UNDEFINED_PAGE_ID {
            // the very first page is root, leftmost and rightmost at once
            let id = self.file.allocate_page()?;
            let mut page = BtreePage::new(id, UNDEFINED_PAGE_ID, UNDEFINED_PAGE_ID, 1, true);
            page.seqno = self.bump_seqno();
            page.insert(key, value)?;
            self.store_page(&page)?;
            self.header.root = id;
            self.header.left_leaf = id;
            self.header.right_leaf = id;
            self.header.count = 1;
            self.header.depth = 1;
            return self.write_header();
        }

        // descend, remembering the path for split propagation
        let mut path: Vec<BtreePage> = Vec::new();
        let mut page = self.load_page(self.header.root, 1)?;
        while !page.leaf {
            let (child, took_first) = match page.search(key) {
                Some(c) => (c, false),
                // smaller than every stored key: follow the leftmost
                // branch and lower the separator on the way down
                None => (page.entries[0].value, true),
            };
            if took_first {
                page.entries[0].key = key.to_string();
                self.store_page(&page)?;
            }
            let step = page.step + 1;
            path.push(page);
            page = self.load_page(child, step)?;
        }

        page.insert(key, value)?;
        self.header.count += 1;
        self.store_page(&page)?;

        // propagate splits upward
        while page.payload_size()? > self.file.capacity() {
            if page.count() < 2 {
                return Err(Error::new(ErrorKind::BadArgument, "entry too large for a page"));
            }
            let upper = page.split_off();
            let new_id = self.file.allocate_page()?;
            let seqno = self.bump_seqno();
            let mut sibling = BtreePage::new(new_id, page.id, page.next, page.step, page.leaf);
            sibling.seqno = seqno;
            sibling.entries = upper;
            page.seqno = seqno;

            if sibling.next != UNDEFINED_PAGE_ID {
                let mut after = self.load_page(sibling.next, sibling.step)?;
                after.prev = new_id;
                self.store_page(&after)?;
            } else if sibling.leaf {
                self.header.right_leaf = new_id;
            }
            page.next = new_id;
            self.store_page(&page)?;
            self.store_page(&sibling)?;

            let separator = sibling.first_key().unwrap().to_string();
            match path.pop() {
                Some(mut parent) => {
                    parent.insert(&separator, new_id)?;
                    self.store_page(&parent)?;
                    page = parent;
                }
                None => {
                    // the split page was the root
                    let root_id = self.file.allocate_page()?;
                    let mut root =
                        BtreePage::new(root_id, UNDEFINED_PAGE_ID, UNDEFINED_PAGE_ID, 1, false);
                    root.seqno = seqno;
                    root.insert(page.first_key().unwrap(), page.id)?;
                    root.insert(&separator, new_id)?;
                    self.store_page(&root)?;
                    self.header.root = root_id;
                    self.header.depth += 1;
                    break;
                }
            }
        }

        self.write_header()
    }

    /// Returns whether the key was present
    fn expunge_inner(&mut self, key: &str, strict: bool) -> Result<bool> {
        if self.header.root == UNDEFINED_PAGE_ID {
            return if strict {
                Err(Error::new(ErrorKind::EntryNotFound, key))
            } else {
                Ok(false)
            };
        }

        let mut path: Vec<BtreePage> = Vec::new();
        let mut page = self.load_page(self.header.root, 1)?;
        while !page.leaf {
            let child = match page.search(key) {
                Some(c) => c,
                None => {
                    return if strict {
                        Err(Error::new(ErrorKind::EntryNotFound, key))
                    } else {
                        Ok(false)
                    };
                }
            };
            let step = page.step + 1;
            path.push(page);
            page = self.load_page(child, step)?;
        }

        if page.expunge(key).is_none() {
            return if strict {
                Err(Error::new(ErrorKind::EntryNotFound, key))
            } else {
                Ok(false)
            };
        }
        self.header.count -= 1;
        self.store_page(&page)?;

        // unstitch emptied pages bottom-up
        while page.count() == 0 {
            let seqno = self.bump_seqno();
            if page.has_prev() {
                let mut prev = self.load_page(page.prev, page.step)?;
                prev.next = page.next;
                prev.seqno = seqno;
                self.store_page(&prev)?;
            }
            if page.has_next() {
                let mut next = self.load_page(page.next, page.step)?;
                next.prev = page.prev;
                next.seqno = seqno;
                self.store_page(&next)?;
            }
            if page.leaf {
                if self.header.left_leaf == page.id {
                    self.header.left_leaf = page.next;
                }
                if self.header.right_leaf == page.id {
                    self.header.right_leaf = page.prev;
                }
            }
            self.file.free_page(page.id);

            match path.pop() {
                Some(mut parent) => {
                    let pos = parent.entries.iter().position(|e| e.value == page.id);
                    if let Some(pos) = pos {
                        parent.entries.remove(pos);
                    }
                    self.store_page(&parent)?;
                    page = parent;
                }
                None => {
                    // the emptied page was the root
                    self.header.root = UNDEFINED_PAGE_ID;
                    self.header.left_leaf = UNDEFINED_PAGE_ID;
                    self.header.right_leaf = UNDEFINED_PAGE_ID;
                    self.header.depth = 0;
                    return self.write_header().map(|_| true);
                }
            }
        }

        // a root node holding a single child is collapsed into it
        while !page.leaf && page.count() == 1 && path.is_empty() && self.header.root == page.id {
            let child = page.entries[0].value;
            self.file.free_page(page.id);
            self.header.root = child;
            self.header.depth -= 1;
            self.bump_seqno();
            page = self.load_page(child, 1)?;
        }

        self.write_header().map(|_| true)
    }

    fn bump_seqno(&mut self) -> u32 {
        self.header.seqno += 1;
        self.header.seqno
    }

    /// Integrity check: page reachability, per-page key order, leaf chain
    /// consistency with the header
    pub fn verify(&mut self) -> Result<()> {
        let mut visited: HashSet<PageId> = HashSet::new();
        visited.insert(HEADER_PAGE);

        if self.header.root == UNDEFINED_PAGE_ID {
            if self.header.count != 0 {
                tracing::warn!(count = self.header.count, "empty tree with nonzero count");
                return Err(Error::new(ErrorKind::VerifyAborted, "empty tree with entries"));
            }
            return self.file.check_orphans(&visited);
        }

        self.verify_page(self.header.root, 1, &mut visited)?;

        // walk the leaf chain left to right
        let mut count = 0u32;
        let mut id = self.header.left_leaf;
        let mut last = UNDEFINED_PAGE_ID;
        while id != UNDEFINED_PAGE_ID {
            let page = self.load_page(id, self.header.depth)?;
            count += page.count() as u32;
            if id == self.header.left_leaf && page.has_prev() {
                tracing::warn!(page = id, "leftmost leaf has a previous link");
                return Err(Error::new(ErrorKind::VerifyAborted, "previous link of top page"));
            }
            if id == self.header.right_leaf && page.has_next() {
                tracing::warn!(page = id, "rightmost leaf has a next link");
                return Err(Error::new(ErrorKind::VerifyAborted, "next link of last page"));
            }
            last = id;
            id = page.next;
        }
        if last != self.header.right_leaf {
            tracing::warn!(last, "leaf chain does not end at the rightmost leaf");
            return Err(Error::new(ErrorKind::VerifyAborted, "broken leaf chain"));
        }
        if count != self.header.count {
            tracing::warn!(header = self.header.count, counted = count, "entry count mismatch");
            return Err(Error::new(
                ErrorKind::VerifyAborted,
                format!("illegal entry count: header {} counted {}", self.header.count, count),
            ));
        }

        self.file.check_orphans(&visited)
    }

    fn verify_page(&mut self, id: PageId, step: u32, visited: &mut HashSet<PageId>) -> Result<()> {
        let page = self.load_page(id, step)?;
        visited.insert(id);
        page.verify_order()?;
        if page.seqno > self.header.seqno {
            tracing::warn!(page = id, seqno = page.seqno, "page newer than header");
            return Err(Error::new(ErrorKind::VerifyAborted, "page seqno exceeds header"));
        }
        if page.leaf {
            if step != self.header.depth {
                return Err(Error::new(ErrorKind::VerifyAborted, "leaf at wrong depth"));
            }
            return Ok(());
        }
        for entry in &page.entries {
            let child = self.load_page(entry.value, step + 1)?;
            if let Some(first) = child.first_key() {
                if entry.key.as_str() > first {
                    return Err(Error::new(
                        ErrorKind::VerifyAborted,
                        format!("separator above child minimum on page {}", id),
                    ));
                }
            }
            self.verify_page(entry.value, step + 1, visited)?;
        }
        Ok(())
    }

    /// All entries in key order, by walking the leaf chain
    pub fn entries(&mut self) -> Result<Vec<(String, PageId)>> {
        let mut out = Vec::with_capacity(self.header.count as usize);
        let mut id = self.header.left_leaf;
        while id != UNDEFINED_PAGE_ID {
            let page = self.load_page(id, self.header.depth)?;
            for e in &page.entries {
                out.push((e.key.clone(), e.value));
            }
            id = page.next;
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_dir(page_size: usize) -> (tempfile::TempDir, BtreeDirectory) {
        let dir = tempfile::tempdir().unwrap();
        let d = BtreeDirectory::create(&dir.path().join("btree.db"), page_size).unwrap();
        (dir, d)
    }

    #[test]
    fn test_first_insert_is_root_and_both_leaves() {
        let (_g, mut d) = new_dir(4096);
        d.insert("term", 42).unwrap();
        assert_eq!(d.entry_count(), 1);
        assert_eq!(d.search("term").unwrap(), Some(42));
        assert_eq!(d.search("zzz").unwrap(), Some(42));
        assert_eq!(d.search("aaa").unwrap(), None);
        d.verify().unwrap();
    }

    #[test]
    fn test_recover_discards_uncommitted_inserts() {
        let (_g, mut d) = new_dir(4096);
        d.insert("ant", 1).unwrap();
        d.insert("bee", 2).unwrap();
        d.flush_all_pages().unwrap();

        d.insert("cat", 3).unwrap();
        d.insert("dog", 4).unwrap();
        d.recover_all_pages();

        assert_eq!(d.entry_count(), 2);
        let keys: Vec<String> = d.entries().unwrap().into_iter().map(|(k, _)| k).collect();
        assert_eq!(keys, ["ant", "bee"]);
        d.verify().unwrap();
    }

    #[test]
    fn test_save_then_recover_rolls_back() {
        let (_g, mut d) = new_dir(4096);
        d.insert("ant", 1).unwrap();
        d.flush_all_pages().unwrap();

        d.insert("bee", 2).unwrap();
        d.save_all_pages().unwrap();
        d.recover_all_pages();

        assert_eq!(d.entry_count(), 1);
        let keys: Vec<String> = d.entries().unwrap().into_iter().map(|(k, _)| k).collect();
        assert_eq!(keys, ["ant"]);
        d.verify().unwrap();
    }

    #[test]
    fn test_many_inserts_split_and_stay_ordered() {
        let (_g, mut d) = new_dir(512);
        let mut keys: Vec<String> = (0..300).map(|i| format!("key{:05}", i * 7 % 300)).collect();
        for (i, k) in keys.iter().enumerate() {
            d.insert(k, i as u32 + 100).unwrap();
        }
        d.flush_all_pages().unwrap();
        assert_eq!(d.entry_count(), 300);
        d.verify().unwrap();

        keys.sort();
        let stored: Vec<String> = d.entries().unwrap().into_iter().map(|(k, _)| k).collect();
        assert_eq!(stored, keys);

        for k in &keys {
            assert!(d.search(k).unwrap().is_some());
        }
    }

    #[test]
    fn test_descending_inserts_take_leftmost_branch() {
        let (_g, mut d) = new_dir(512);
        for i in (0..200).rev() {
            d.insert(&format!("k{:04}", i), i as u32).unwrap();
        }
        assert_eq!(d.entry_count(), 200);
        d.verify().unwrap();
        assert_eq!(d.search("k0000").unwrap(), Some(0));
        assert_eq!(d.search("k0199").unwrap(), Some(199));
    }

    #[test]
    fn test_expunge_down_to_empty() {
        let (_g, mut d) = new_dir(512);
        for i in 0..100 {
            d.insert(&format!("k{:04}", i), i as u32).unwrap();
        }
        for i in 0..100 {
            d.expunge(&format!("k{:04}", i)).unwrap();
        }
        assert_eq!(d.entry_count(), 0);
        d.verify().unwrap();
        assert_eq!(d.search("k0000").unwrap(), None);

        // expunge of an absent key is silent
        d.expunge("missing").unwrap();
    }

    #[test]
    fn test_update_absent_key_fails() {
        let (_g, mut d) = new_dir(4096);
        d.insert("alpha", 1).unwrap();
        d.flush_all_pages().unwrap();
        let err = d.update("beta", 9, "gamma", 2).unwrap_err();
        assert_eq!(err.kind, ErrorKind::EntryNotFound);
        // the failed update was rolled back
        assert_eq!(d.entry_count(), 1);

        d.update("alpha", 1, "omega", 7).unwrap();
        assert_eq!(d.search("omega").unwrap(), Some(7));
        d.verify().unwrap();
    }

    #[test]
    fn test_reopen_after_flush() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("btree.db");
        {
            let mut d = BtreeDirectory::create(&path, 512).unwrap();
            for i in 0..50 {
                d.insert(&format!("w{:03}", i), i as u32).unwrap();
            }
            d.flush_all_pages().unwrap();
        }
        let mut d = BtreeDirectory::open(&path, 512).unwrap();
        assert_eq!(d.entry_count(), 50);
        assert_eq!(d.search("w007").unwrap(), Some(7));
        d.verify().unwrap();
    }

    #[test]
    fn test_clear() {
        let (_g, mut d) = new_dir(4096);
        d.insert("a", 1).unwrap();
        d.flush_all_pages().unwrap();
        d.clear().unwrap();
        assert_eq!(d.entry_count(), 0);
        assert_eq!(d.search("a").unwrap(), None);
        d.verify().unwrap();
    }
}
