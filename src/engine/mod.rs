mod error;
mod mutations;
mod queries;
mod store;

pub use error::{ErrorClass, ErrorKind, EngineError, UNEXPECTED_ERROR_MESSAGE};
pub use mutations::parse_pickup_time;
pub use store::AppointmentStore;

use std::sync::Arc;

use chrono::Utc;
use dashmap::DashMap;
use tokio::sync::{Mutex, OwnedMutexGuard};

use crate::catalog::BookAvailability;
use crate::config::Config;
use crate::model::*;
use crate::notify::NotifyHub;

/// Appointment lifecycle manager.
///
/// Owns the appointment store and drives availability changes on the book
/// catalog. Every create/decide/cancel runs under the book's lock, so the
/// check → catalog update → store replace sequence is serialized per book.
pub struct Engine {
    store: AppointmentStore,
    catalog: Arc<dyn BookAvailability>,
    pub notify: Arc<NotifyHub>,
    config: Config,
    book_locks: DashMap<String, Arc<Mutex<()>>>,
}

impl Engine {
    pub fn new(catalog: Arc<dyn BookAvailability>, config: Config) -> Self {
        let notify = Arc::new(NotifyHub::with_capacity(config.notify_capacity));
        Self::with_notify(catalog, config, notify)
    }

    pub fn with_notify(catalog: Arc<dyn BookAvailability>, config: Config, notify: Arc<NotifyHub>) -> Self {
        Self {
            store: AppointmentStore::new(),
            catalog,
            notify,
            config,
            book_locks: DashMap::new(),
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn appointment_count(&self) -> usize {
        self.store.len()
    }

    /// Acquire the per-book lock guarding availability and per-user counts.
    /// Callers only pass ids the catalog has already resolved.
    pub(super) async fn lock_book(&self, book_id: &str) -> OwnedMutexGuard<()> {
        let lock = self.book_locks.entry(book_id.to_string()).or_default().clone();
        lock.lock_owned().await
    }

    /// Store replace + notify in one call.
    pub(super) fn commit(&self, updated: Appointment, event: Event) -> Result<Arc<Appointment>, EngineError> {
        let stored = self.store.replace(updated)?;
        self.notify.send(&event);
        Ok(stored)
    }
}

pub(crate) fn now() -> Timestamp {
    Utc::now()
}
