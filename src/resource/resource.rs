// ABOUTME: Binary mutual-exclusion resource shared by two adjacent agents.
// ABOUTME: Supports blocking and non-blocking claims with ownership-checked release.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

use parking_lot::Mutex;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};

use crate::error::ResourceError;

/// Identity of whoever claims a resource.
///
/// Agents use their ring index. The resource never needs to know more than
/// this, and only uses it to reject a release by someone other than the holder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct HolderId(pub usize);

impl std::fmt::Display for HolderId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "agent-{}", self.0)
    }
}

/// Information about a held resource.
#[derive(Debug, Clone)]
pub struct Claim {
    /// The claimed resource's ring index.
    pub resource_id: usize,
    /// Who holds it.
    pub holder: HolderId,
    /// When it was claimed.
    pub acquired_at: Instant,
}

struct Held {
    claim: Claim,
    // Dropping the permit is what frees the resource.
    _permit: OwnedSemaphorePermit,
}

/// A binary exclusion primitive with blocking and non-blocking acquisition.
///
/// # Claim Semantics
///
/// - **Exclusive:** at most one holder at any instant, enforced by a
///   single-permit semaphore.
/// - **Not re-entrant:** a holder that tries again without blocking gets
///   `false`; a blocking retry by the same holder waits forever.
/// - **Checked release:** `release()` fails unless the caller holds the claim.
/// - **FIFO wake-up:** a release hands the resource to at most one blocked
///   acquirer, the one that has waited longest.
pub struct Resource {
    id: usize,
    permit: Arc<Semaphore>,
    held: Mutex<Option<Held>>,
    acquisitions: AtomicU64,
    releases: AtomicU64,
}

impl Resource {
    /// Create a free resource occupying ring slot `id`.
    pub fn new(id: usize) -> Self {
        Self {
            id,
            permit: Arc::new(Semaphore::new(1)),
            held: Mutex::new(None),
            acquisitions: AtomicU64::new(0),
            releases: AtomicU64::new(0),
        }
    }

    /// The ring slot this resource occupies.
    pub fn id(&self) -> usize {
        self.id
    }

    /// Claim the resource for `holder`.
    ///
    /// With `blocking`, suspends until the resource is free and returns `true`
    /// once claimed. Without it, returns `false` immediately if the resource
    /// is held by anyone. A `false` is ordinary contention, not an error.
    pub async fn acquire(&self, holder: HolderId, blocking: bool) -> bool {
        let permit = if blocking {
            // The semaphore is never closed, so this only fails on a broken runtime.
            match Arc::clone(&self.permit).acquire_owned().await {
                Ok(permit) => permit,
                Err(_) => return false,
            }
        } else {
            match Arc::clone(&self.permit).try_acquire_owned() {
                Ok(permit) => permit,
                Err(_) => return false,
            }
        };

        *self.held.lock() = Some(Held {
            claim: Claim {
                resource_id: self.id,
                holder,
                acquired_at: Instant::now(),
            },
            _permit: permit,
        });
        self.acquisitions.fetch_add(1, Ordering::SeqCst);
        true
    }

    /// Release the resource held by `holder`.
    ///
    /// Returns `Err(ResourceError::NotHeld)` if nobody holds it and
    /// `Err(ResourceError::NotOwner)` if somebody else does. On success, at
    /// most one blocked acquirer is woken.
    pub fn release(&self, holder: HolderId) -> Result<(), ResourceError> {
        let released = {
            let mut held = self.held.lock();
            match held.as_ref() {
                None => {
                    return Err(ResourceError::NotHeld {
                        resource_id: self.id,
                        requester: holder,
                    });
                }
                Some(current) if current.claim.holder != holder => {
                    return Err(ResourceError::NotOwner {
                        resource_id: self.id,
                        owner: current.claim.holder,
                        requester: holder,
                    });
                }
                Some(_) => held.take(),
            }
        };

        self.releases.fetch_add(1, Ordering::SeqCst);
        // Permit goes back to the semaphore here, outside the slot lock.
        drop(released);
        Ok(())
    }

    /// Current holder, if any.
    pub fn holder(&self) -> Option<HolderId> {
        self.held.lock().as_ref().map(|held| held.claim.holder)
    }

    /// Current claim, if any.
    pub fn claim(&self) -> Option<Claim> {
        self.held.lock().as_ref().map(|held| held.claim.clone())
    }

    /// Returns true if somebody holds the resource.
    ///
    /// Agrees with `holder()`: both read the holder slot.
    pub fn is_held(&self) -> bool {
        self.held.lock().is_some()
    }

    /// Total successful claims since creation.
    pub fn acquisitions(&self) -> u64 {
        self.acquisitions.load(Ordering::SeqCst)
    }

    /// Total successful releases since creation.
    pub fn releases(&self) -> u64 {
        self.releases.load(Ordering::SeqCst)
    }
}

impl std::fmt::Debug for Resource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Resource")
            .field("id", &self.id)
            .field("holder", &self.holder())
            .field("acquisitions", &self.acquisitions())
            .finish()
    }
}
