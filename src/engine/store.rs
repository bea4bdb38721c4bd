use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use dashmap::DashMap;
use ulid::Ulid;

use crate::model::*;

use super::EngineError;

struct Slot {
    /// Insertion sequence; listing sorts by it.
    seq: u64,
    appointment: Arc<Appointment>,
}

/// In-memory appointment records. Values are immutable once stored:
/// updates swap in a new `Arc` under the same id.
pub struct AppointmentStore {
    records: DashMap<Ulid, Slot>,
    next_seq: AtomicU64,
}

impl Default for AppointmentStore {
    fn default() -> Self {
        Self::new()
    }
}

impl AppointmentStore {
    pub fn new() -> Self {
        Self {
            records: DashMap::new(),
            next_seq: AtomicU64::new(0),
        }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn insert(&self, appointment: Appointment) -> Arc<Appointment> {
        let seq = self.next_seq.fetch_add(1, Ordering::Relaxed);
        let appointment = Arc::new(appointment);
        self.records.insert(
            appointment.id,
            Slot {
                seq,
                appointment: appointment.clone(),
            },
        );
        appointment
    }

    pub fn get(&self, id: &Ulid) -> Result<Arc<Appointment>, EngineError> {
        self.records
            .get(id)
            .map(|slot| slot.appointment.clone())
            .ok_or(EngineError::AppointmentNotFound(*id))
    }

    /// Replace the stored value for `appointment.id`, keeping its listing position.
    pub fn replace(&self, appointment: Appointment) -> Result<Arc<Appointment>, EngineError> {
        let mut slot = self
            .records
            .get_mut(&appointment.id)
            .ok_or(EngineError::AppointmentNotFound(appointment.id))?;
        let appointment = Arc::new(appointment);
        slot.appointment = appointment.clone();
        Ok(appointment)
    }

    /// Every appointment in insertion order.
    pub fn all(&self) -> Vec<Arc<Appointment>> {
        self.filtered(|_| true)
    }

    /// Matching appointments in insertion order.
    pub fn filtered(&self, pred: impl Fn(&Appointment) -> bool) -> Vec<Arc<Appointment>> {
        let mut hits: Vec<(u64, Arc<Appointment>)> = self
            .records
            .iter()
            .filter(|e| pred(&e.value().appointment))
            .map(|e| (e.value().seq, e.value().appointment.clone()))
            .collect();
        hits.sort_by_key(|(seq, _)| *seq);
        hits.into_iter().map(|(_, a)| a).collect()
    }

    pub fn count_active(&self, user_id: &str, book_id: &str) -> usize {
        self.records
            .iter()
            .filter(|e| e.value().appointment.is_active_for(user_id, book_id))
            .count()
    }
}
