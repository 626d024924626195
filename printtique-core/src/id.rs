//! # IDs
//! Layers (and anything else that needs a handle) are identified by [`StudioID<T>`], a process unique
//! numeric ID namespaced by the marker type `T`. IDs are never reused within a process.
//!
//! Unlike a plain counter, IDs survive a round trip through a saved design: deserializing an ID marks
//! it as taken, so IDs allocated afterwards never collide with restored ones.

// Map from namespace to the next ID that may be handed out.
static ID_SERVER: parking_lot::RwLock<
    std::collections::BTreeMap<std::any::TypeId, std::sync::atomic::AtomicU64>,
> = parking_lot::const_rwlock(std::collections::BTreeMap::new());

/// Largest ID accepted from outside. Anything above would leave too little room to keep allocating.
pub const MAX_RESTORED_ID: u64 = 1 << 53;

/// ID that is guaranteed unique within its namespace `T` for this execution of the program.
/// IDs with different namespaces may share a value but are never comparable.
pub struct StudioID<T: std::any::Any> {
    id: std::num::NonZeroU64,
    _phantom: std::marker::PhantomData<T>,
}
impl<T: std::any::Any> Clone for StudioID<T> {
    fn clone(&self) -> Self {
        *self
    }
}
impl<T: std::any::Any> Copy for StudioID<T> {}
impl<T: std::any::Any> PartialEq for StudioID<T> {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}
impl<T: std::any::Any> Eq for StudioID<T> {}
impl<T: std::any::Any> PartialOrd for StudioID<T> {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}
impl<T: std::any::Any> Ord for StudioID<T> {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.id.cmp(&other.id)
    }
}
// The ID never stores a T, so T's auto traits shouldn't leak onto it.
unsafe impl<T: std::any::Any> Send for StudioID<T> {}
unsafe impl<T: std::any::Any> Sync for StudioID<T> {}

impl<T: std::any::Any> std::hash::Hash for StudioID<T> {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl<T: std::any::Any> StudioID<T> {
    /// Get the raw numeric value of this ID.
    #[must_use]
    pub fn id(&self) -> u64 {
        self.id.get()
    }
    /// Reserve `count` consecutive values, returning the first.
    fn reserve(count: u64) -> u64 {
        let start = {
            let read = ID_SERVER.upgradable_read();
            let ty = std::any::TypeId::of::<T>();
            if let Some(next) = read.get(&ty) {
                next.fetch_add(count, std::sync::atomic::Ordering::Relaxed)
            } else {
                // First allocation in this namespace. IDs start at one.
                let mut write = parking_lot::RwLockUpgradableReadGuard::upgrade(read);
                write
                    .entry(ty)
                    .or_insert_with(|| std::sync::atomic::AtomicU64::new(1))
                    .fetch_add(count, std::sync::atomic::Ordering::Relaxed)
            }
        };
        if start.checked_add(count).is_none() {
            log::error!("{} ID space exhausted", std::any::type_name::<T>());
            panic!("{} ID space exhausted", std::any::type_name::<T>());
        }
        start
    }
    // `raw` is never zero: the counter starts at one and overflow is caught in `reserve`.
    fn from_raw(raw: u64) -> Self {
        Self {
            id: std::num::NonZeroU64::MIN.saturating_add(raw - 1),
            _phantom: std::marker::PhantomData,
        }
    }
    /// Allocate `count` fresh IDs at once. The order of the IDs is unspecified, only their uniqueness.
    ///
    /// Panics if the namespace is exhausted.
    pub fn many(count: usize) -> impl ExactSizeIterator<Item = Self> {
        let start = Self::reserve(count as u64);
        (0..count).map(move |idx| Self::from_raw(start + idx as u64))
    }
    /// Adopt an ID that was allocated elsewhere (i.e. read from a saved design), reserving it and every
    /// value below it so they are never handed out again.
    ///
    /// `None` if the ID is above [`MAX_RESTORED_ID`].
    #[must_use]
    pub fn observe(id: std::num::NonZeroU64) -> Option<Self> {
        if id.get() > MAX_RESTORED_ID {
            return None;
        }
        let floor = id.get().saturating_add(1);
        let read = ID_SERVER.upgradable_read();
        let ty = std::any::TypeId::of::<T>();
        if let Some(next) = read.get(&ty) {
            next.fetch_max(floor, std::sync::atomic::Ordering::Relaxed);
        } else {
            let mut write = parking_lot::RwLockUpgradableReadGuard::upgrade(read);
            write
                .entry(ty)
                .or_insert_with(|| std::sync::atomic::AtomicU64::new(1))
                .fetch_max(floor, std::sync::atomic::Ordering::Relaxed);
        }
        Some(Self {
            id,
            _phantom: std::marker::PhantomData,
        })
    }
}
impl<T: std::any::Any> Default for StudioID<T> {
    fn default() -> Self {
        Self::from_raw(Self::reserve(1))
    }
}
impl<T: std::any::Any> std::fmt::Display for StudioID<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = std::any::type_name::<T>();
        write!(f, "{}#{}", name.rsplit("::").next().unwrap_or(name), self.id)
    }
}
impl<T: std::any::Any> std::fmt::Debug for StudioID<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        <Self as std::fmt::Display>::fmt(self, f)
    }
}

// Plain integers on the wire.
impl<T: std::any::Any> serde::Serialize for StudioID<T> {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_u64(self.id.get())
    }
}
impl<'de, T: std::any::Any> serde::Deserialize<'de> for StudioID<T> {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let raw = <u64 as serde::Deserialize>::deserialize(deserializer)?;
        let id = std::num::NonZeroU64::new(raw)
            .ok_or_else(|| serde::de::Error::custom("ID must be non-zero"))?;
        Self::observe(id).ok_or_else(|| {
            serde::de::Error::custom(format!(
                "ID {raw} is out of range, at most {MAX_RESTORED_ID} is allowed"
            ))
        })
    }
}
