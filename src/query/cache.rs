use std::num::NonZeroUsize;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use lru::LruCache;
use once_cell::sync::Lazy;
use parking_lot::Mutex;
use crate::query::open_option::OpenOption;

/// A compiled plan as handed to executors; the entry mutex marks the
/// plan as in use while an executor holds it.
pub type PlanEntry = Arc<Mutex<OpenOption>>;

/// Cache of compiled plans keyed by plan id. One lock guards the map;
/// eviction and explicit erasure skip plans that are currently in use.
pub struct Planner {
    plans: Mutex<LruCache<u64, PlanEntry>>,
    hit_count: AtomicUsize,
    miss_count: AtomicUsize,
}

impl Planner {
    pub fn new(capacity: usize) -> Self {
        let cap = NonZeroUsize::new(capacity.max(1)).unwrap();
        Planner {
            plans: Mutex::new(LruCache::new(cap)),
            hit_count: AtomicUsize::new(0),
            miss_count: AtomicUsize::new(0),
        }
    }

    pub fn keep(&self, id: u64, plan: OpenOption) {
        let mut plans = self.plans.lock();
        plans.put(id, Arc::new(Mutex::new(plan)));
    }

    pub fn get(&self, id: u64) -> Option<PlanEntry> {
        let mut plans = self.plans.lock();
        match plans.get(&id) {
            Some(entry) => {
                self.hit_count.fetch_add(1, Ordering::Relaxed);
                Some(entry.clone())
            }
            None => {
                self.miss_count.fetch_add(1, Ordering::Relaxed);
                None
            }
        }
    }

    /// Drop a plan unless an executor still holds it
    pub fn erase(&self, id: u64) -> bool {
        let mut plans = self.plans.lock();
        let unlocked = plans.peek(&id).map(|entry| entry.try_lock().is_some());
        match unlocked {
            Some(true) => {
                plans.pop(&id);
                true
            }
            Some(false) => {
                tracing::debug!(id, "plan in use, not erased");
                false
            }
            None => false,
        }
    }

    pub fn len(&self) -> usize {
        self.plans.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn hit_rate(&self) -> f64 {
        let hits = self.hit_count.load(Ordering::Relaxed);
        let total = hits + self.miss_count.load(Ordering::Relaxed);
        if total == 0 {
            0.0
        } else {
            hits as f64 / total as f64
        }
    }
}

static GLOBAL: Lazy<Planner> =
    Lazy::new(|| Planner::new(crate::core::config::Config::default().plan_cache_size));

/// Process-wide planner cache
pub fn global() -> &'static Planner {
    &GLOBAL
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keep_get_erase() {
        let planner = Planner::new(4);
        let mut plan = OpenOption::default();
        plan.term_count = 3;
        planner.keep(1, plan);

        let entry = planner.get(1).unwrap();
        assert_eq!(entry.lock().term_count, 3);
        assert!(planner.get(2).is_none());

        assert!(planner.erase(1));
        assert!(planner.get(1).is_none());
        assert!(!planner.erase(1));
    }

    #[test]
    fn test_erase_skips_plans_in_use() {
        let planner = Planner::new(4);
        planner.keep(7, OpenOption::default());

        let entry = planner.get(7).unwrap();
        let guard = entry.lock();
        assert!(!planner.erase(7));
        drop(guard);
        assert!(planner.erase(7));
    }

    #[test]
    fn test_capacity_evicts_oldest() {
        let planner = Planner::new(2);
        planner.keep(1, OpenOption::default());
        planner.keep(2, OpenOption::default());
        planner.keep(3, OpenOption::default());
        assert_eq!(planner.len(), 2);
        assert!(planner.get(1).is_none());
    }
}
