use chrono::{DateTime, NaiveDateTime, Utc};
use tracing::info;
use ulid::Ulid;

use crate::model::*;
use crate::observability::{self, record_error};

use super::{now, Engine, EngineError};

impl Engine {
    /// Create a pending appointment. Availability is not touched until approval.
    pub async fn create_appointment(
        &self,
        book_id: &str,
        user_id: &str,
        pickup_time: Timestamp,
    ) -> Result<AppointmentView, EngineError> {
        self.create_inner(book_id, user_id, pickup_time)
            .await
            .map_err(|e| record_error("create", e))
    }

    /// Create from a raw request DTO, parsing `pickupTime`.
    pub async fn create_from_request(&self, req: &CreateAppointment) -> Result<AppointmentView, EngineError> {
        let pickup_time = parse_pickup_time(&req.pickup_time).map_err(|e| record_error("create", e))?;
        self.create_appointment(&req.book_id, &req.user_id, pickup_time).await
    }

    async fn create_inner(
        &self,
        book_id: &str,
        user_id: &str,
        pickup_time: Timestamp,
    ) -> Result<AppointmentView, EngineError> {
        // Unknown books fail here, before a lock entry exists for them.
        self.catalog.get_book(book_id).await?;
        let _guard = self.lock_book(book_id).await;
        let book = self.catalog.get_book(book_id).await?;
        if !book.is_available() {
            return Err(EngineError::book_unavailable());
        }
        let active = self.store.count_active(user_id, book_id);
        if active >= self.config.max_active_per_book {
            return Err(EngineError::LimitExceeded(format!(
                "user {user_id} already has {active} active appointments for book {book_id}"
            )));
        }

        let appointment = Appointment::new(
            Ulid::new(),
            book_id.to_string(),
            user_id.to_string(),
            pickup_time,
            now(),
        );
        let stored = self.store.insert(appointment);

        metrics::counter!(observability::APPOINTMENTS_CREATED_TOTAL).increment(1);
        metrics::gauge!(observability::APPOINTMENTS_STORED).set(self.store.len() as f64);
        info!(appointment_id = %stored.id, book_id, user_id, "created appointment");
        self.notify.send(&Event::AppointmentCreated {
            id: stored.id,
            book_id: stored.book_id.clone(),
            user_id: stored.user_id.clone(),
        });

        Ok(AppointmentView::new((*stored).clone(), Some(book)))
    }

    /// Approve or reject a pending appointment. Approval takes one copy.
    pub async fn decide_appointment(&self, id: Ulid, is_approved: bool) -> Result<AppointmentView, EngineError> {
        self.decide_inner(id, is_approved)
            .await
            .map_err(|e| record_error("decide", e))
    }

    /// Decide from a raw `{ "isApproved": bool }` payload. Unknown ids and
    /// non-pending appointments are reported before a malformed payload.
    pub async fn decide_from_payload(
        &self,
        id: Ulid,
        payload: &serde_json::Value,
    ) -> Result<AppointmentView, EngineError> {
        let checked = self
            .store
            .get(&id)
            .and_then(|current| ensure_pending(&current))
            .and_then(|()| Decision::from_value(payload));
        let decision = checked.map_err(|e| record_error("decide", e))?;
        self.decide_appointment(id, decision.is_approved).await
    }

    async fn decide_inner(&self, id: Ulid, is_approved: bool) -> Result<AppointmentView, EngineError> {
        let book_id = self.store.get(&id)?.book_id.clone();
        let _guard = self.lock_book(&book_id).await;
        // Re-read under the lock: another decision may have landed first.
        let current = self.store.get(&id)?;
        ensure_pending(&current)?;

        if !is_approved {
            let event = Event::AppointmentRejected {
                id,
                book_id: book_id.clone(),
            };
            let stored = self.commit(current.rejected(now()), event)?;
            metrics::counter!(observability::DECISIONS_TOTAL, "outcome" => "rejected").increment(1);
            info!(appointment_id = %id, "rejected appointment");
            let book = self.lookup_book(&book_id).await;
            return Ok(AppointmentView::new((*stored).clone(), book));
        }

        let book = self.catalog.get_book(&book_id).await?;
        if self.config.guard_approvals && !book.is_available() {
            return Err(EngineError::book_unavailable());
        }
        let remaining = book.available_copies - 1;
        self.catalog.set_available_copies(&book_id, remaining).await?;

        let event = Event::AppointmentApproved {
            id,
            book_id: book_id.clone(),
            available_copies: remaining,
        };
        let stored = self.commit(current.approved(now()), event)?;
        metrics::counter!(observability::DECISIONS_TOTAL, "outcome" => "approved").increment(1);
        info!(appointment_id = %id, available_copies = remaining, "approved appointment");

        let book = Book {
            available_copies: remaining,
            ..book
        };
        Ok(AppointmentView::new((*stored).clone(), Some(book)))
    }

    /// Cancel an appointment. Cancelling an approved one gives its copy back.
    pub async fn cancel_appointment(&self, id: Ulid) -> Result<AppointmentView, EngineError> {
        self.cancel_inner(id)
            .await
            .map_err(|e| record_error("cancel", e))
    }

    async fn cancel_inner(&self, id: Ulid) -> Result<AppointmentView, EngineError> {
        let book_id = self.store.get(&id)?.book_id.clone();
        let _guard = self.lock_book(&book_id).await;
        let current = self.store.get(&id)?;
        let previous = current.status;
        if previous == AppointmentStatus::Cancelled {
            return Err(EngineError::InvalidState("appointment already cancelled".into()));
        }

        let book = if previous == AppointmentStatus::Approved {
            let book = self.catalog.get_book(&book_id).await?;
            let restored = book.available_copies + 1;
            self.catalog.set_available_copies(&book_id, restored).await?;
            Some(Book {
                available_copies: restored,
                ..book
            })
        } else {
            None
        };

        let event = Event::AppointmentCancelled {
            id,
            book_id: book_id.clone(),
            previous,
        };
        let stored = self.commit(current.cancelled(), event)?;
        metrics::counter!(observability::APPOINTMENTS_CANCELLED_TOTAL, "previous" => previous.as_str())
            .increment(1);
        info!(appointment_id = %id, %previous, "cancelled appointment");

        let book = match book {
            Some(book) => Some(book),
            None => self.lookup_book(&book_id).await,
        };
        Ok(AppointmentView::new((*stored).clone(), book))
    }
}

fn ensure_pending(current: &Appointment) -> Result<(), EngineError> {
    if current.status != AppointmentStatus::Pending {
        return Err(EngineError::wrong_status("decide", current.status));
    }
    Ok(())
}

/// Accepts RFC 3339, or a zone-less ISO-8601 date-time read as UTC.
pub fn parse_pickup_time(s: &str) -> Result<Timestamp, EngineError> {
    let s = s.trim();
    if let Ok(t) = DateTime::parse_from_rfc3339(s) {
        return Ok(t.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f")
        .map(|t| t.and_utc())
        .map_err(|_| EngineError::InvalidArgument(format!("pickupTime is not an ISO-8601 timestamp: {s:?}")))
}
