//! Register store: one category's courriers, persisted and kept in sync
//!
//! The storage partition is the source of truth. Each store keeps a cached
//! copy of it and refreshes that copy whenever the sync bus reports a change
//! to its category. Every write replaces the whole partition, so the last
//! writer wins.

use std::sync::Arc;

use log::{debug, error, info, warn};
use serde_json::Value;

use super::error::CourrierError;
use crate::bus::{CourriersUpdated, Notification, Subscription, SyncBus};
use crate::clock::{Clock, SystemClock};
use crate::models::{Category, Courrier, CourrierDraft, CourrierId, Patch, STATUS_FIELD};
use crate::storage::KeyValueStore;

/// Persisted, synchronized view of one register
pub struct CourrierStore {
    category: Category,
    storage: Arc<dyn KeyValueStore>,
    bus: SyncBus,
    clock: Arc<dyn Clock>,
    courriers: Vec<Courrier>,
    /// True until the first load completes
    loading: bool,
    subscription: Option<Subscription>,
}

impl CourrierStore {
    /// Create an inactive store. Nothing is read until [`activate`](Self::activate)
    /// or [`load`](Self::load).
    pub fn new(category: Category, storage: Arc<dyn KeyValueStore>, bus: SyncBus) -> Self {
        Self {
            category,
            storage,
            bus,
            clock: Arc::new(SystemClock),
            courriers: Vec::new(),
            loading: true,
            subscription: None,
        }
    }

    /// Replace the time source used for ids and timestamps
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Create a store, subscribe it to the bus and hydrate it
    pub fn open(category: Category, storage: Arc<dyn KeyValueStore>, bus: SyncBus) -> Self {
        let mut store = Self::new(category, storage, bus);
        store.activate();
        store
    }

    /// Subscribe to both notification channels and perform the initial load.
    /// Activating an active store does nothing.
    pub fn activate(&mut self) {
        if self.subscription.is_some() {
            return;
        }
        self.subscription = Some(self.bus.subscribe());
        info!("Register {} activated", self.category);
        self.load();
    }

    /// Drop the bus subscription. The cached collection is kept.
    pub fn deactivate(&mut self) {
        if self.subscription.take().is_some() {
            info!("Register {} deactivated", self.category);
        }
    }

    pub fn is_active(&self) -> bool {
        self.subscription.is_some()
    }

    pub fn category(&self) -> Category {
        self.category
    }

    /// Current cached collection, newest first
    pub fn courriers(&self) -> &[Courrier] {
        &self.courriers
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    /// Find a courrier in the cached collection
    pub fn get(&self, id: CourrierId) -> Option<&Courrier> {
        self.courriers.iter().find(|c| c.id == id)
    }

    pub fn len(&self) -> usize {
        self.courriers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.courriers.is_empty()
    }

    fn storage_key(&self) -> &'static str {
        self.category.storage_key()
    }

    /// Read the partition. Only text that is not a JSON list is corrupt;
    /// records of an unexpected shape are completed by
    /// [`Courrier::from_stored`] and non-objects are skipped.
    fn read_partition(&self) -> Result<Vec<Courrier>, CourrierError> {
        let key = self.storage_key();
        let Some(text) = self.storage.get(key)? else {
            return Ok(Vec::new());
        };
        if text.trim().is_empty() {
            return Ok(Vec::new());
        }
        let records: Vec<Value> =
            serde_json::from_str(&text).map_err(|source| CourrierError::Corrupt {
                key: key.to_string(),
                source,
            })?;

        let now = self.clock.now();
        let mut courriers = Vec::with_capacity(records.len());
        for (index, record) in records.into_iter().enumerate() {
            match Courrier::from_stored(record, self.category, now) {
                Some(courrier) => courriers.push(courrier),
                None => warn!("Skipping entry {} of {}: not a JSON object", index, key),
            }
        }
        Ok(courriers)
    }

    /// Reload from storage, reporting failures.
    ///
    /// On failure the cached collection is emptied, as with [`load`](Self::load).
    /// The loading flag is cleared either way.
    pub fn try_load(&mut self) -> Result<&[Courrier], CourrierError> {
        let result = self.read_partition();
        self.loading = false;
        match result {
            Ok(courriers) => {
                debug!("Loaded {} courriers for {}", courriers.len(), self.category);
                self.courriers = courriers;
                Ok(&self.courriers)
            }
            Err(e) => {
                self.courriers = Vec::new();
                Err(e)
            }
        }
    }

    /// Reload from storage. Missing or unreadable data yields an empty
    /// collection; errors are logged, not returned.
    pub fn load(&mut self) {
        let category = self.category;
        if let Err(e) = self.try_load() {
            error!("Failed to load courriers for {}: {}", category, e);
        }
    }

    /// Manual re-hydration, same as [`load`](Self::load)
    pub fn refresh(&mut self) {
        self.load();
    }

    /// Persist `courriers` as the whole partition, reporting failures.
    ///
    /// Only after a successful write is the cache replaced and the update
    /// published.
    pub fn try_save(&mut self, courriers: Vec<Courrier>) -> Result<(), CourrierError> {
        let text = serde_json::to_string(&courriers).map_err(CourrierError::Serialize)?;
        self.storage.set(self.storage_key(), &text)?;

        self.courriers = courriers;
        self.bus
            .publish_update(CourriersUpdated::new(self.category, self.courriers.clone()));
        Ok(())
    }

    /// Persist `courriers` as the whole partition. Failures are logged and
    /// the cached collection is left as it was.
    pub fn save(&mut self, courriers: Vec<Courrier>) {
        if let Err(e) = self.try_save(courriers) {
            error!("Failed to save courriers for {}: {}", self.category, e);
        }
    }

    fn prepended(&self, courrier: &Courrier) -> Vec<Courrier> {
        let mut next = Vec::with_capacity(self.courriers.len() + 1);
        next.push(courrier.clone());
        next.extend(self.courriers.iter().cloned());
        next
    }

    fn patched(&self, id: CourrierId, patch: &Patch) -> Vec<Courrier> {
        let now = self.clock.now();
        self.courriers
            .iter()
            .cloned()
            .map(|mut courrier| {
                if courrier.id == id {
                    courrier.apply_patch(patch, now);
                }
                courrier
            })
            .collect()
    }

    fn without(&self, id: CourrierId) -> Vec<Courrier> {
        self.courriers
            .iter()
            .filter(|c| c.id != id)
            .cloned()
            .collect()
    }

    /// Complete `draft`, prepend it and save.
    ///
    /// The completed courrier is returned even if the save failed.
    pub fn add(&mut self, draft: impl Into<CourrierDraft>) -> Courrier {
        let courrier = draft.into().into_courrier(self.category, self.clock.now());
        let next = self.prepended(&courrier);
        self.save(next);
        courrier
    }

    /// [`add`](Self::add), reporting a failed save
    pub fn try_add(&mut self, draft: impl Into<CourrierDraft>) -> Result<Courrier, CourrierError> {
        let courrier = draft.into().into_courrier(self.category, self.clock.now());
        let next = self.prepended(&courrier);
        self.try_save(next)?;
        Ok(courrier)
    }

    /// Merge `patch` into the courrier with `id` and save. Unknown ids leave
    /// the collection unchanged (it is still written back).
    pub fn update(&mut self, id: CourrierId, patch: &Patch) {
        let next = self.patched(id, patch);
        self.save(next);
    }

    /// [`update`](Self::update), reporting a failed save
    pub fn try_update(&mut self, id: CourrierId, patch: &Patch) -> Result<(), CourrierError> {
        let next = self.patched(id, patch);
        self.try_save(next)
    }

    /// Set the `statut` field of a courrier
    pub fn update_status(&mut self, id: CourrierId, status: impl Into<String>) {
        self.update(id, &status_patch(status));
    }

    pub fn try_update_status(
        &mut self,
        id: CourrierId,
        status: impl Into<String>,
    ) -> Result<(), CourrierError> {
        self.try_update(id, &status_patch(status))
    }

    /// Drop the courrier with `id` and save
    pub fn remove(&mut self, id: CourrierId) {
        let next = self.without(id);
        self.save(next);
    }

    /// [`remove`](Self::remove), reporting a failed save
    pub fn try_remove(&mut self, id: CourrierId) -> Result<(), CourrierError> {
        let next = self.without(id);
        self.try_save(next)
    }

    /// React to queued bus notifications.
    ///
    /// Reloads from storage once if any notification concerns this register:
    /// an update for its category, an uncategorized update, a storage-change
    /// signal, or lost notifications. Returns whether a reload happened.
    /// Inactive stores ignore the bus.
    pub fn process_notifications(&mut self) -> bool {
        let Some(subscription) = self.subscription.as_mut() else {
            return false;
        };

        let mut reload = false;
        for notification in subscription.drain() {
            match notification {
                Notification::Updated(event) => reload |= event.concerns(self.category),
                Notification::StorageChanged(_) => reload = true,
                Notification::Missed { skipped } => {
                    warn!(
                        "Register {} missed {} notifications, reloading",
                        self.category, skipped
                    );
                    reload = true;
                }
            }
        }

        if reload {
            debug!("Reloading register {} after notification", self.category);
            self.load();
        }
        reload
    }
}

fn status_patch(status: impl Into<String>) -> Patch {
    let mut patch = Patch::new();
    patch.insert(STATUS_FIELD.to_string(), Value::String(status.into()));
    patch
}
