use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ulid::Ulid;

use crate::engine::EngineError;

/// UTC wall-clock timestamp used for every appointment time field.
pub type Timestamp = DateTime<Utc>;

/// Lifecycle status of an appointment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AppointmentStatus {
    Pending,
    Approved,
    Rejected,
    Cancelled,
    Completed,
}

impl AppointmentStatus {
    /// Pending and approved appointments count toward the per-user cap.
    pub fn is_active(self) -> bool {
        matches!(self, AppointmentStatus::Pending | AppointmentStatus::Approved)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            AppointmentStatus::Pending => "pending",
            AppointmentStatus::Approved => "approved",
            AppointmentStatus::Rejected => "rejected",
            AppointmentStatus::Cancelled => "cancelled",
            AppointmentStatus::Completed => "completed",
        }
    }
}

impl std::fmt::Display for AppointmentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A reservation linking a user to a book for a pickup time.
///
/// Records are never mutated in place: transitions build a new value via
/// [`Appointment::approved`], [`Appointment::rejected`] or
/// [`Appointment::cancelled`] and the store swaps it in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Appointment {
    pub id: Ulid,
    pub book_id: String,
    pub user_id: String,
    pub pickup_time: Timestamp,
    pub created_at: Timestamp,
    pub status: AppointmentStatus,
    pub approved_at: Option<Timestamp>,
    pub rejected_at: Option<Timestamp>,
}

impl Appointment {
    pub fn new(id: Ulid, book_id: String, user_id: String, pickup_time: Timestamp, created_at: Timestamp) -> Self {
        Self {
            id,
            book_id,
            user_id,
            pickup_time,
            created_at,
            status: AppointmentStatus::Pending,
            approved_at: None,
            rejected_at: None,
        }
    }

    pub fn approved(&self, at: Timestamp) -> Self {
        Self {
            status: AppointmentStatus::Approved,
            approved_at: Some(at),
            ..self.clone()
        }
    }

    pub fn rejected(&self, at: Timestamp) -> Self {
        Self {
            status: AppointmentStatus::Rejected,
            rejected_at: Some(at),
            ..self.clone()
        }
    }

    /// Timestamps from earlier transitions are kept.
    pub fn cancelled(&self) -> Self {
        Self {
            status: AppointmentStatus::Cancelled,
            ..self.clone()
        }
    }

    pub fn is_active_for(&self, user_id: &str, book_id: &str) -> bool {
        self.status.is_active() && self.user_id == user_id && self.book_id == book_id
    }
}

/// Catalog entry owned by the book collaborator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Book {
    pub id: String,
    pub title: String,
    pub author: String,
    #[serde(default = "default_edition")]
    pub edition_number: u32,
    #[serde(default)]
    pub genre: String,
    /// Signed: an unguarded approval may drive it below zero.
    pub available_copies: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cover_image_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub published_date: Option<String>,
}

fn default_edition() -> u32 {
    1
}

impl Book {
    pub fn new(id: impl Into<String>, title: impl Into<String>, author: impl Into<String>, available_copies: i64) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            author: author.into(),
            edition_number: 1,
            genre: String::new(),
            available_copies,
            cover_image_url: None,
            description: None,
            published_date: None,
        }
    }

    pub fn is_available(&self) -> bool {
        self.available_copies > 0
    }
}

// ── Change events ────────────────────────────────────────────────

/// Lifecycle events published on the notify hub, keyed by book id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum Event {
    AppointmentCreated {
        id: Ulid,
        book_id: String,
        user_id: String,
    },
    AppointmentApproved {
        id: Ulid,
        book_id: String,
        available_copies: i64,
    },
    AppointmentRejected {
        id: Ulid,
        book_id: String,
    },
    AppointmentCancelled {
        id: Ulid,
        book_id: String,
        previous: AppointmentStatus,
    },
}

impl Event {
    pub fn book_id(&self) -> &str {
        match self {
            Event::AppointmentCreated { book_id, .. }
            | Event::AppointmentApproved { book_id, .. }
            | Event::AppointmentRejected { book_id, .. }
            | Event::AppointmentCancelled { book_id, .. } => book_id,
        }
    }
}

// ── Query result types ───────────────────────────────────────────

/// An appointment joined with the current book snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AppointmentView {
    #[serde(flatten)]
    pub appointment: Appointment,
    pub book: Option<Book>,
}

impl AppointmentView {
    pub fn new(appointment: Appointment, book: Option<Book>) -> Self {
        Self { appointment, book }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BookAppointments {
    #[serde(flatten)]
    pub book: Book,
    pub appointments: Vec<Appointment>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserAppointments {
    pub user_id: String,
    pub appointments: Vec<AppointmentView>,
}

// ── Input DTOs ───────────────────────────────────────────────────

/// Creation payload as received from a transport layer.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateAppointment {
    pub book_id: String,
    pub user_id: String,
    /// ISO-8601 / RFC 3339.
    pub pickup_time: String,
}

/// Approval decision payload: `{ "isApproved": bool }`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Decision {
    pub is_approved: bool,
}

impl Decision {
    /// Anything but `{ "isApproved": <bool> }` is an invalid argument.
    pub fn from_value(payload: &serde_json::Value) -> Result<Self, EngineError> {
        Decision::deserialize(payload)
            .map_err(|e| EngineError::InvalidArgument(format!("isApproved must be a boolean: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ts(s: &str) -> Timestamp {
        DateTime::parse_from_rfc3339(s).unwrap().with_timezone(&Utc)
    }

    fn pending() -> Appointment {
        Appointment::new(
            Ulid::new(),
            "/works/OL1W".into(),
            "user1".into(),
            ts("2026-01-10T10:00:00Z"),
            ts("2026-01-01T09:00:00Z"),
        )
    }

    #[test]
    fn new_appointment_is_pending_without_stamps() {
        let a = pending();
        assert_eq!(a.status, AppointmentStatus::Pending);
        assert!(a.approved_at.is_none());
        assert!(a.rejected_at.is_none());
    }

    #[test]
    fn transitions_produce_new_values() {
        let a = pending();
        let at = ts("2026-01-02T12:00:00Z");
        let approved = a.approved(at);
        assert_eq!(approved.status, AppointmentStatus::Approved);
        assert_eq!(approved.approved_at, Some(at));
        assert_eq!(approved.created_at, a.created_at);
        // receiver untouched
        assert_eq!(a.status, AppointmentStatus::Pending);

        let cancelled = approved.cancelled();
        assert_eq!(cancelled.status, AppointmentStatus::Cancelled);
        assert_eq!(cancelled.approved_at, Some(at));
    }

    #[test]
    fn active_statuses() {
        assert!(AppointmentStatus::Pending.is_active());
        assert!(AppointmentStatus::Approved.is_active());
        assert!(!AppointmentStatus::Rejected.is_active());
        assert!(!AppointmentStatus::Cancelled.is_active());
        assert!(!AppointmentStatus::Completed.is_active());
    }

    #[test]
    fn is_active_for_matches_user_and_book() {
        let a = pending();
        assert!(a.is_active_for("user1", "/works/OL1W"));
        assert!(!a.is_active_for("user2", "/works/OL1W"));
        assert!(!a.is_active_for("user1", "/works/OL2W"));
        assert!(!a.rejected(ts("2026-01-02T12:00:00Z")).is_active_for("user1", "/works/OL1W"));
    }

    #[test]
    fn view_serializes_camel_case_with_null_book() {
        let view = AppointmentView::new(pending(), None);
        let json = serde_json::to_value(&view).unwrap();
        assert_eq!(json["status"], "pending");
        assert_eq!(json["bookId"], "/works/OL1W");
        assert!(json["approvedAt"].is_null());
        assert!(json["book"].is_null());
        assert!(json.get("appointment").is_none());
    }

    #[test]
    fn book_defaults_when_seeding() {
        let book: Book = serde_json::from_str(
            r#"{"id":"/works/OL1W","title":"Dune","author":"Frank Herbert","availableCopies":3}"#,
        )
        .unwrap();
        assert_eq!(book.edition_number, 1);
        assert_eq!(book.available_copies, 3);
        assert!(book.cover_image_url.is_none());
    }

    #[test]
    fn decision_requires_boolean() {
        let ok: Decision = serde_json::from_str(r#"{"isApproved":true}"#).unwrap();
        assert!(ok.is_approved);
        assert!(serde_json::from_str::<Decision>(r#"{"isApproved":"yes"}"#).is_err());
    }

    #[test]
    fn decision_from_value() {
        let ok = Decision::from_value(&serde_json::json!({"isApproved": false})).unwrap();
        assert!(!ok.is_approved);
        for bad in [
            serde_json::json!({"isApproved": "true"}),
            serde_json::json!({"isApproved": 1}),
            serde_json::json!({}),
            serde_json::json!(null),
        ] {
            assert!(matches!(
                Decision::from_value(&bad),
                Err(EngineError::InvalidArgument(_))
            ));
        }
    }

    #[test]
    fn event_book_id() {
        let e = Event::AppointmentRejected {
            id: Ulid::new(),
            book_id: "b1".into(),
        };
        assert_eq!(e.book_id(), "b1");
    }
}
