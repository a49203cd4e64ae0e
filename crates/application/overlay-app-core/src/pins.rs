use crate::ports::PinsRepo;
use crate::registry::ActionRegistry;
use anyhow::Result;
use overlay_core::ActionId;
use std::sync::Arc;
use tracing::{debug, warn};

/// Ordered, duplicate-free list of pinned action ids.
///
/// Every change is written through to the repo straight away. The mutating
/// calls return `Ok(false)` when nothing changed (and nothing was written),
/// and `Err` only when a change was applied in memory but could not be saved.
pub struct PinStore<P> {
    ids: Vec<ActionId>,
    repo: Arc<P>,
}

impl<P: PinsRepo> PinStore<P> {
    pub fn new(repo: Arc<P>) -> Self {
        Self {
            ids: Vec::new(),
            repo,
        }
    }

    /// Replaces the in-memory list with what the repo holds, dropping repeats.
    pub fn load(&mut self) -> Result<()> {
        let stored = self.repo.load()?;
        let mut ids: Vec<ActionId> = Vec::with_capacity(stored.len());
        for id in stored {
            if !ids.contains(&id) {
                ids.push(id);
            }
        }
        self.ids = ids;
        Ok(())
    }

    pub fn ids(&self) -> &[ActionId] {
        &self.ids
    }

    pub fn contains(&self, id: &str) -> bool {
        self.ids.iter().any(|p| p == id)
    }

    pub fn pin(&mut self, id: &str) -> Result<bool> {
        if self.contains(id) {
            return Ok(false);
        }
        self.ids.push(id.to_string());
        self.persist()?;
        Ok(true)
    }

    pub fn unpin(&mut self, id: &str) -> Result<bool> {
        let Some(pos) = self.ids.iter().position(|p| p == id) else {
            return Ok(false);
        };
        self.ids.remove(pos);
        self.persist()?;
        Ok(true)
    }

    /// Removes the entry at `from` and inserts it at `to`. Out-of-range
    /// indices leave the list untouched.
    pub fn move_pin(&mut self, from: usize, to: usize) -> Result<bool> {
        let len = self.ids.len();
        if from >= len || to >= len {
            debug!("Ignoring pin move {from} -> {to} with {len} pins");
            return Ok(false);
        }
        if from == to {
            return Ok(false);
        }
        let id = self.ids.remove(from);
        self.ids.insert(to, id);
        self.persist()?;
        Ok(true)
    }

    /// Drops pins whose action is no longer registered and returns them.
    pub fn revalidate(&mut self, registry: &ActionRegistry) -> Result<Vec<ActionId>> {
        let (kept, dropped): (Vec<ActionId>, Vec<ActionId>) = self
            .ids
            .drain(..)
            .partition(|id| registry.contains(id));
        self.ids = kept;
        if !dropped.is_empty() {
            warn!("Dropping pins with no matching action: {:?}", dropped);
            self.persist()?;
        }
        Ok(dropped)
    }

    fn persist(&self) -> Result<()> {
        self.repo.save(&self.ids)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use overlay_core::Action;
    use std::sync::Mutex;

    #[derive(Default)]
    struct MemoryPins {
        stored: Mutex<Vec<ActionId>>,
        saves: Mutex<usize>,
        fail: bool,
    }

    impl PinsRepo for MemoryPins {
        fn load(&self) -> Result<Vec<ActionId>> {
            Ok(self.stored.lock().unwrap().clone())
        }

        fn save(&self, pins: &[ActionId]) -> Result<()> {
            if self.fail {
                anyhow::bail!("disk full");
            }
            *self.stored.lock().unwrap() = pins.to_vec();
            *self.saves.lock().unwrap() += 1;
            Ok(())
        }
    }

    fn store(ids: &[&str]) -> (PinStore<MemoryPins>, Arc<MemoryPins>) {
        let repo = Arc::new(MemoryPins::default());
        *repo.stored.lock().unwrap() = ids.iter().map(|s| s.to_string()).collect();
        let mut store = PinStore::new(repo.clone());
        store.load().unwrap();
        (store, repo)
    }

    #[test]
    fn pin_is_idempotent() {
        let (mut pins, repo) = store(&[]);
        assert!(pins.pin("a").unwrap());
        assert!(!pins.pin("a").unwrap());
        assert_eq!(pins.ids(), ["a"]);
        assert_eq!(*repo.saves.lock().unwrap(), 1);
    }

    #[test]
    fn unpinning_an_unknown_id_is_a_noop() {
        let (mut pins, repo) = store(&["a"]);
        assert!(!pins.unpin("zzz").unwrap());
        assert_eq!(*repo.saves.lock().unwrap(), 0);
        assert!(pins.unpin("a").unwrap());
        assert!(repo.stored.lock().unwrap().is_empty());
    }

    #[test]
    fn move_reorders_and_persists() {
        let (mut pins, repo) = store(&["a", "b", "c"]);
        assert!(pins.move_pin(0, 2).unwrap());
        assert_eq!(pins.ids(), ["b", "c", "a"]);
        assert_eq!(*repo.stored.lock().unwrap(), vec!["b", "c", "a"]);
    }

    #[test]
    fn move_out_of_range_changes_nothing() {
        let (mut pins, repo) = store(&["a", "b"]);
        assert!(!pins.move_pin(0, 2).unwrap());
        assert!(!pins.move_pin(5, 0).unwrap());
        assert!(!pins.move_pin(1, 1).unwrap());
        assert_eq!(pins.ids(), ["a", "b"]);
        assert_eq!(*repo.saves.lock().unwrap(), 0);
    }

    #[test]
    fn load_drops_repeated_ids() {
        let (pins, _) = store(&["a", "b", "a"]);
        assert_eq!(pins.ids(), ["a", "b"]);
    }

    #[test]
    fn revalidate_keeps_order_of_surviving_pins() {
        let (mut pins, repo) = store(&["c", "gone", "a"]);
        let mut registry = ActionRegistry::new();
        registry.replace(
            ["a", "c"]
                .iter()
                .map(|id| Action {
                    id: id.to_string(),
                    label: id.to_string(),
                    command: "true".into(),
                    working_dir: None,
                })
                .collect(),
        );

        let dropped = pins.revalidate(&registry).unwrap();
        assert_eq!(dropped, vec!["gone"]);
        assert_eq!(pins.ids(), ["c", "a"]);
        assert_eq!(*repo.stored.lock().unwrap(), vec!["c", "a"]);

        // nothing dropped, nothing written
        pins.revalidate(&registry).unwrap();
        assert_eq!(*repo.saves.lock().unwrap(), 1);
    }

    #[test]
    fn save_failure_still_applies_the_change() {
        let repo = Arc::new(MemoryPins {
            fail: true,
            ..Default::default()
        });
        let mut pins = PinStore::new(repo);
        assert!(pins.pin("a").is_err());
        assert_eq!(pins.ids(), ["a"]);
    }
}
