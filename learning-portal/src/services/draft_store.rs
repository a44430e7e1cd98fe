use dashmap::{DashMap, DashSet};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::wizard::LessonWizard;

pub type SharedWizard = Arc<Mutex<LessonWizard>>;

struct DraftEntry {
    owner: String,
    wizard: SharedWizard,
    touched: Instant,
}

/// Open lesson-authoring dialogs, one wizard each.
///
/// Drafts belong to a single login: they go away on logout, on a guard
/// denial, after `ttl` without use, or when their owner opens more than
/// `max_per_owner` dialogs (oldest first).
///
/// Handlers lock a wizard only to read or mutate it; the lock is released
/// before any call to the LMS API.
pub struct DraftStore {
    drafts: DashMap<Uuid, DraftEntry>,
    ttl: Duration,
    max_per_owner: usize,
}

impl DraftStore {
    pub fn new(ttl: Duration, max_per_owner: usize) -> Self {
        Self {
            drafts: DashMap::new(),
            ttl,
            max_per_owner: max_per_owner.max(1),
        }
    }

    /// Open a new dialog for `owner` on `course_id`.
    pub fn open(&self, owner: &str, course_id: i64) -> Uuid {
        self.sweep();
        self.make_room(owner);

        let id = Uuid::new_v4();
        self.drafts.insert(
            id,
            DraftEntry {
                owner: owner.to_string(),
                wizard: Arc::new(Mutex::new(LessonWizard::new(course_id))),
                touched: Instant::now(),
            },
        );
        tracing::debug!(draft_id = %id, course_id, "Lesson draft opened");
        id
    }

    /// The wizard behind `id`, if it exists, belongs to `owner` and has not
    /// expired. Each hit keeps the draft alive.
    pub fn get(&self, id: Uuid, owner: &str) -> Option<SharedWizard> {
        let mut entry = self.drafts.get_mut(&id).filter(|entry| entry.owner == owner)?;

        if entry.touched.elapsed() >= self.ttl {
            drop(entry);
            self.drafts.remove(&id);
            tracing::debug!(draft_id = %id, "Lesson draft expired");
            return None;
        }

        entry.touched = Instant::now();
        Some(Arc::clone(&entry.wizard))
    }

    /// Destroy the dialog. Returns false when nothing was removed.
    pub fn close(&self, id: Uuid, owner: &str) -> bool {
        let removed = self
            .drafts
            .remove_if(&id, |_, entry| entry.owner == owner)
            .is_some();
        if removed {
            tracing::debug!(draft_id = %id, "Lesson draft closed");
        }
        removed
    }

    /// Destroy every dialog `owner` has open.
    pub fn close_all(&self, owner: &str) -> usize {
        let ids: Vec<Uuid> = self
            .drafts
            .iter()
            .filter(|entry| entry.owner == owner)
            .map(|entry| *entry.key())
            .collect();

        let closed = ids
            .into_iter()
            .filter(|id| self.close(*id, owner))
            .count();
        if closed > 0 {
            tracing::debug!(closed, "Lesson drafts discarded for login");
        }
        closed
    }

    /// Drop every draft idle for longer than the ttl.
    pub fn sweep(&self) -> usize {
        let expired: Vec<Uuid> = self
            .drafts
            .iter()
            .filter(|entry| entry.touched.elapsed() >= self.ttl)
            .map(|entry| *entry.key())
            .collect();

        expired
            .into_iter()
            .filter(|id| {
                self.drafts
                    .remove_if(id, |_, entry| entry.touched.elapsed() >= self.ttl)
                    .is_some()
            })
            .count()
    }

    /// Evict `owner`'s least recently used drafts until one more fits.
    fn make_room(&self, owner: &str) {
        let mut owned: Vec<(Uuid, Instant)> = self
            .drafts
            .iter()
            .filter(|entry| entry.owner == owner)
            .map(|entry| (*entry.key(), entry.touched))
            .collect();
        if owned.len() < self.max_per_owner {
            return;
        }

        owned.sort_by_key(|(_, touched)| *touched);
        let excess = owned.len() + 1 - self.max_per_owner;
        for (id, _) in owned.into_iter().take(excess) {
            self.drafts.remove(&id);
            tracing::debug!(draft_id = %id, "Lesson draft evicted");
        }
    }

    pub fn len(&self) -> usize {
        self.drafts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.drafts.is_empty()
    }
}

/// Per-owner "saving" latch for single-request forms such as the course
/// form: a second submission while one is in flight is refused.
#[derive(Default)]
pub struct SaveLatch {
    in_flight: Arc<DashSet<String>>,
}

/// Held while a save runs; dropping it releases the latch.
pub struct SaveGuard {
    in_flight: Arc<DashSet<String>>,
    key: String,
}

impl SaveLatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn try_begin(&self, key: &str) -> Option<SaveGuard> {
        self.in_flight.insert(key.to_string()).then(|| SaveGuard {
            in_flight: Arc::clone(&self.in_flight),
            key: key.to_string(),
        })
    }

    pub fn is_saving(&self, key: &str) -> bool {
        self.in_flight.contains(key)
    }
}

impl Drop for SaveGuard {
    fn drop(&mut self) {
        self.in_flight.remove(&self.key);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::wizard::DetailField;

    const HOUR: Duration = Duration::from_secs(3600);

    #[tokio::test]
    async fn dialogs_do_not_share_state() {
        let store = DraftStore::new(HOUR, 5);
        let first = store.open("ada@example.com", 1);
        let second = store.open("ada@example.com", 1);
        assert_ne!(first, second);

        store
            .get(first, "ada@example.com")
            .unwrap()
            .lock()
            .await
            .set_field(DetailField::Title, "Intro");

        let other = store.get(second, "ada@example.com").unwrap();
        assert_eq!(other.lock().await.draft().title, "");
    }

    #[test]
    fn drafts_are_bound_to_their_owner() {
        let store = DraftStore::new(HOUR, 5);
        let id = store.open("ada@example.com", 3);

        assert!(store.get(id, "eve@example.com").is_none());
        assert!(!store.close(id, "eve@example.com"));
        assert_eq!(store.len(), 1);

        assert!(store.close(id, "ada@example.com"));
        assert!(store.get(id, "ada@example.com").is_none());
        assert!(store.is_empty());
    }

    #[test]
    fn close_all_only_touches_one_login() {
        let store = DraftStore::new(HOUR, 5);
        let first = store.open("login-a", 1);
        store.open("login-a", 2);
        let kept = store.open("login-b", 1);

        assert_eq!(store.close_all("login-a"), 2);
        assert!(store.get(first, "login-a").is_none());
        assert!(store.get(kept, "login-b").is_some());
        assert_eq!(store.close_all("login-a"), 0);
    }

    #[test]
    fn idle_drafts_expire() {
        let store = DraftStore::new(Duration::ZERO, 5);
        let id = store.open("login-a", 1);
        assert!(store.get(id, "login-a").is_none());
        assert!(store.is_empty());

        let store = DraftStore::new(Duration::ZERO, 5);
        store.open("login-a", 1);
        store.open("login-b", 1);
        assert_eq!(store.sweep(), 2);
        assert!(store.is_empty());
    }

    #[test]
    fn opening_past_the_cap_evicts_the_oldest() {
        let store = DraftStore::new(HOUR, 3);
        let tick = || std::thread::sleep(Duration::from_millis(2));
        let ids: Vec<Uuid> = (0..3)
            .map(|course| {
                tick();
                store.open("login-a", course)
            })
            .collect();

        // touching the first makes the second the oldest
        tick();
        assert!(store.get(ids[0], "login-a").is_some());
        tick();
        let newest = store.open("login-a", 9);

        assert_eq!(store.len(), 3);
        assert!(store.get(ids[1], "login-a").is_none());
        assert!(store.get(ids[0], "login-a").is_some());
        assert!(store.get(newest, "login-a").is_some());

        // other logins have their own allowance
        store.open("login-b", 1);
        assert_eq!(store.len(), 4);
    }

    #[test]
    fn save_latch_refuses_reentry_until_released() {
        let latch = SaveLatch::new();
        let guard = latch.try_begin("ada@example.com");
        assert!(guard.is_some());
        assert!(latch.is_saving("ada@example.com"));
        assert!(latch.try_begin("ada@example.com").is_none());
        assert!(latch.try_begin("eve@example.com").is_some());

        drop(guard);
        assert!(!latch.is_saving("ada@example.com"));
        assert!(latch.try_begin("ada@example.com").is_some());
    }
}
