use std::collections::{HashMap, HashSet};
use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use crate::core::error::{Error, ErrorKind, Result};

pub type PageId = u32;

pub const UNDEFINED_PAGE_ID: PageId = 0xFFFF_FFFF;

const PAGE_OVERHEAD: usize = 12; // crc + flags + payload length
const FLAG_FREE: u32 = 1;

#[derive(Debug)]
struct CachedPage {
    data: Vec<u8>,
    dirty: bool,
}

/// Fixed-size page store with transactional modification.
///
/// Every change stays in the page cache until `flush_all_pages` persists
/// it; `recover_all_pages` drops the cache and rewinds allocation state to
/// the last flush, so a half-applied sequence is never visible on disk.
pub struct PageFile {
    path: PathBuf,
    file: File,
    page_size: usize,
    page_count: u32,
    free: Vec<PageId>,
    cache: HashMap<PageId, CachedPage>,
    committed_page_count: u32,
    committed_free: Vec<PageId>,
    /// Pre-transaction image of each page persisted by `save_all_pages`
    /// since the last flush; None when the page was not live back then.
    /// Lets `recover_all_pages` roll the disk back past a save.
    saved: HashMap<PageId, Option<Vec<u8>>>,
}

impl PageFile {
    pub fn create(path: &Path, page_size: usize) -> Result<PageFile> {
        if page_size <= PAGE_OVERHEAD || page_size % 512 != 0 {
            return Err(Error::new(ErrorKind::BadArgument, "bad page size"));
        }
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(true)
            .open(path)?;
        Ok(PageFile {
            path: path.to_path_buf(),
            file,
            page_size,
            page_count: 0,
            free: Vec::new(),
            cache: HashMap::new(),
            committed_page_count: 0,
            committed_free: Vec::new(),
            saved: HashMap::new(),
        })
    }

    pub fn open(path: &Path, page_size: usize) -> Result<PageFile> {
        let file = OpenOptions::new().read(true).write(true).open(path)?;
        let len = file.metadata()?.len();
        let page_count = (len / page_size as u64) as u32;
        let mut pf = PageFile {
            path: path.to_path_buf(),
            file,
            page_size,
            page_count,
            free: Vec::new(),
            cache: HashMap::new(),
            committed_page_count: page_count,
            committed_free: Vec::new(),
            saved: HashMap::new(),
        };
        // rebuild the free list from the on-disk flags
        for id in 0..page_count {
            if pf.read_flags(id)? & FLAG_FREE != 0 {
                pf.free.push(id);
            }
        }
        pf.committed_free = pf.free.clone();
        Ok(pf)
    }

    pub fn page_size(&self) -> usize {
        self.page_size
    }

    /// Usable payload bytes per page
    pub fn capacity(&self) -> usize {
        self.page_size - PAGE_OVERHEAD
    }

    pub fn page_count(&self) -> u32 {
        self.page_count
    }

    fn read_flags(&mut self, id: PageId) -> Result<u32> {
        let mut buf = [0u8; 8];
        self.file.seek(SeekFrom::Start(id as u64 * self.page_size as u64))?;
        self.file.read_exact(&mut buf)?;
        Ok(u32::from_le_bytes(buf[4..8].try_into().unwrap()))
    }

    fn read_raw(&mut self, id: PageId) -> Result<(u32, Vec<u8>)> {
        let mut buf = vec![0u8; self.page_size];
        self.file.seek(SeekFrom::Start(id as u64 * self.page_size as u64))?;
        self.file.read_exact(&mut buf)?;

        let stored_crc = u32::from_le_bytes(buf[0..4].try_into().unwrap());
        let flags = u32::from_le_bytes(buf[4..8].try_into().unwrap());
        let len = u32::from_le_bytes(buf[8..12].try_into().unwrap()) as usize;
        if len > self.capacity() {
            return Err(Error::new(
                ErrorKind::VerifyAborted,
                format!("page {} has corrupt length {}", id, len),
            ));
        }
        let payload = buf[PAGE_OVERHEAD..PAGE_OVERHEAD + len].to_vec();
        let mut hasher = crc32fast::Hasher::new();
        hasher.update(&buf[4..PAGE_OVERHEAD + len]);
        if hasher.finalize() != stored_crc {
            return Err(Error::new(
                ErrorKind::VerifyAborted,
                format!("page {} checksum mismatch", id),
            ));
        }
        Ok((flags, payload))
    }

    fn write_raw(&mut self, id: PageId, flags: u32, payload: &[u8]) -> Result<()> {
        let mut buf = vec![0u8; self.page_size];
        buf[4..8].copy_from_slice(&flags.to_le_bytes());
        buf[8..12].copy_from_slice(&(payload.len() as u32).to_le_bytes());
        buf[PAGE_OVERHEAD..PAGE_OVERHEAD + payload.len()].copy_from_slice(payload);
        let mut hasher = crc32fast::Hasher::new();
        hasher.update(&buf[4..PAGE_OVERHEAD + payload.len()]);
        buf[0..4].copy_from_slice(&hasher.finalize().to_le_bytes());
        self.file.seek(SeekFrom::Start(id as u64 * self.page_size as u64))?;
        self.file.write_all(&buf)?;
        Ok(())
    }

    /// Current payload of a page, from the cache or from disk
    pub fn read_page(&mut self, id: PageId) -> Result<Vec<u8>> {
        if let Some(p) = self.cache.get(&id) {
            return Ok(p.data.clone());
        }
        if id >= self.page_count {
            return Err(Error::new(ErrorKind::Unexpected, format!("page {} out of range", id)));
        }
        let (flags, payload) = self.read_raw(id)?;
        if flags & FLAG_FREE != 0 {
            return Err(Error::new(ErrorKind::Unexpected, format!("page {} is free", id)));
        }
        self.cache.insert(id, CachedPage { data: payload.clone(), dirty: false });
        Ok(payload)
    }

    /// Stage new payload for a page
    pub fn write_page(&mut self, id: PageId, payload: Vec<u8>) -> Result<()> {
        if payload.len() > self.capacity() {
            return Err(Error::new(ErrorKind::BadArgument, "payload exceeds page capacity"));
        }
        self.cache.insert(id, CachedPage { data: payload, dirty: true });
        Ok(())
    }

    pub fn allocate_page(&mut self) -> Result<PageId> {
        let id = match self.free.pop() {
            Some(id) => id,
            None => {
                let id = self.page_count;
                self.page_count += 1;
                id
            }
        };
        self.cache.insert(id, CachedPage { data: Vec::new(), dirty: true });
        Ok(id)
    }

    pub fn free_page(&mut self, id: PageId) {
        self.cache.remove(&id);
        self.free.push(id);
    }

    /// Persist every staged change and end the transaction
    pub fn flush_all_pages(&mut self) -> Result<()> {
        let dirty: Vec<PageId> =
            self.cache.iter().filter(|(_, p)| p.dirty).map(|(&id, _)| id).collect();
        for id in dirty {
            let data = self.cache.get(&id).unwrap().data.clone();
            self.write_raw(id, 0, &data)?;
            self.cache.get_mut(&id).unwrap().dirty = false;
        }
        // newly freed pages get their on-disk tombstone
        for &id in &self.free.clone() {
            if !self.committed_free.contains(&id) && id < self.page_count {
                self.write_raw(id, FLAG_FREE, &[])?;
            }
        }
        self.file.sync_all()?;
        self.committed_page_count = self.page_count;
        self.committed_free = self.free.clone();
        self.saved.clear();
        Ok(())
    }

    /// Drop every staged change, rewinding to the last flush. Pages a
    /// `save_all_pages` already persisted get their committed image
    /// written back.
    pub fn recover_all_pages(&mut self) {
        let saved = std::mem::take(&mut self.saved);
        for (id, prior) in saved {
            let result = match prior {
                Some(payload) => self.write_raw(id, 0, &payload),
                None => self.write_raw(id, FLAG_FREE, &[]),
            };
            if let Err(e) = result {
                tracing::warn!(page = id, error = %e, "could not roll back a saved page");
            }
        }
        self.cache.clear();
        self.page_count = self.committed_page_count;
        self.free = self.committed_free.clone();
    }

    /// Persist the staged pages without ending the transaction: the
    /// pages stay dirty and the commit watermark stays put, so a later
    /// recover still undoes them
    pub fn save_all_pages(&mut self) -> Result<()> {
        let dirty: Vec<PageId> =
            self.cache.iter().filter(|(_, p)| p.dirty).map(|(&id, _)| id).collect();
        for id in dirty {
            if !self.saved.contains_key(&id) {
                let prior = if id < self.committed_page_count
                    && !self.committed_free.contains(&id)
                {
                    Some(self.read_raw(id)?.1)
                } else {
                    None
                };
                self.saved.insert(id, prior);
            }
            let data = self.cache.get(&id).unwrap().data.clone();
            self.write_raw(id, 0, &data)?;
        }
        self.file.sync_all()?;
        Ok(())
    }

    /// Cross-check reachability: every live page must have been visited
    pub fn check_orphans(&mut self, visited: &HashSet<PageId>) -> Result<()> {
        for id in 0..self.page_count {
            if self.free.contains(&id) || visited.contains(&id) {
                continue;
            }
            tracing::warn!(page = id, "orphan page detected");
            return Err(Error::new(
                ErrorKind::VerifyAborted,
                format!("page {} is not reachable", id),
            ));
        }
        Ok(())
    }

    pub fn clear(&mut self) -> Result<()> {
        self.cache.clear();
        self.free.clear();
        self.saved.clear();
        self.page_count = 0;
        self.committed_page_count = 0;
        self.committed_free.clear();
        self.file.set_len(0)?;
        Ok(())
    }

    /// Move the backing file; any open transaction must be flushed first
    pub fn move_to(&mut self, new_path: &Path) -> Result<()> {
        self.flush_all_pages()?;
        std::fs::rename(&self.path, new_path)?;
        self.file = OpenOptions::new().read(true).write(true).open(new_path)?;
        self.path = new_path.to_path_buf();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flush_and_recover() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pages.db");
        let mut pf = PageFile::create(&path, 4096).unwrap();

        let a = pf.allocate_page().unwrap();
        pf.write_page(a, b"hello".to_vec()).unwrap();
        pf.flush_all_pages().unwrap();

        let b = pf.allocate_page().unwrap();
        pf.write_page(b, b"doomed".to_vec()).unwrap();
        pf.recover_all_pages();

        assert_eq!(pf.read_page(a).unwrap(), b"hello");
        assert_eq!(pf.page_count(), 1);

        // reopen from disk
        drop(pf);
        let mut pf = PageFile::open(&path, 4096).unwrap();
        assert_eq!(pf.read_page(a).unwrap(), b"hello");
    }

    #[test]
    fn test_save_keeps_transaction_open() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pages.db");
        let mut pf = PageFile::create(&path, 4096).unwrap();
        let a = pf.allocate_page().unwrap();
        pf.write_page(a, b"committed".to_vec()).unwrap();
        pf.flush_all_pages().unwrap();

        pf.write_page(a, b"changed".to_vec()).unwrap();
        let b = pf.allocate_page().unwrap();
        pf.write_page(b, b"fresh".to_vec()).unwrap();
        pf.save_all_pages().unwrap();

        // the save reached the disk but the transaction is still open
        pf.recover_all_pages();
        assert_eq!(pf.read_page(a).unwrap(), b"committed");
        assert_eq!(pf.page_count(), 1);

        // the rollback also reached the disk
        drop(pf);
        let mut pf = PageFile::open(&path, 4096).unwrap();
        assert_eq!(pf.read_page(a).unwrap(), b"committed");
        // the saved-then-recovered page is a reusable tombstone
        assert_eq!(pf.allocate_page().unwrap(), b);
    }

    #[test]
    fn test_flush_after_save_commits() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pages.db");
        let mut pf = PageFile::create(&path, 4096).unwrap();
        let a = pf.allocate_page().unwrap();
        pf.write_page(a, b"one".to_vec()).unwrap();
        pf.save_all_pages().unwrap();
        pf.write_page(a, b"two".to_vec()).unwrap();
        pf.flush_all_pages().unwrap();

        pf.recover_all_pages();
        assert_eq!(pf.read_page(a).unwrap(), b"two");
    }

    #[test]
    fn test_free_page_reused() {
        let dir = tempfile::tempdir().unwrap();
        let mut pf = PageFile::create(&dir.path().join("pages.db"), 4096).unwrap();
        let a = pf.allocate_page().unwrap();
        let b = pf.allocate_page().unwrap();
        pf.write_page(a, vec![1]).unwrap();
        pf.write_page(b, vec![2]).unwrap();
        pf.free_page(b);
        let c = pf.allocate_page().unwrap();
        assert_eq!(c, b);
    }

    #[test]
    fn test_corrupt_page_detected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pages.db");
        let mut pf = PageFile::create(&path, 4096).unwrap();
        let a = pf.allocate_page().unwrap();
        pf.write_page(a, b"payload".to_vec()).unwrap();
        pf.flush_all_pages().unwrap();
        drop(pf);

        // flip a payload byte behind the checksum's back
        let mut raw = std::fs::read(&path).unwrap();
        raw[14] ^= 0xff;
        std::fs::write(&path, &raw).unwrap();

        let mut pf = PageFile::open(&path, 4096).unwrap();
        assert!(pf.read_page(a).is_err());
    }
}
