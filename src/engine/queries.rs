use std::collections::HashMap;
use std::sync::Arc;

use futures::future::join_all;
use tracing::warn;
use ulid::Ulid;

use crate::model::*;
use crate::observability;

use super::{Engine, EngineError};

impl Engine {
    /// Best-effort book join for read views: failures are logged, not raised.
    pub(super) async fn lookup_book(&self, book_id: &str) -> Option<Book> {
        match self.catalog.get_book(book_id).await {
            Ok(book) => Some(book),
            Err(e) => {
                metrics::counter!(observability::BOOK_LOOKUP_FAILURES_TOTAL).increment(1);
                warn!(book_id, error = %e, "book lookup failed, returning appointment without book");
                None
            }
        }
    }

    /// Join each appointment with its book, fetching every distinct book once.
    async fn join_books(&self, appointments: &[Arc<Appointment>]) -> Vec<AppointmentView> {
        let mut book_ids: Vec<&str> = appointments.iter().map(|a| a.book_id.as_str()).collect();
        book_ids.sort_unstable();
        book_ids.dedup();

        let books: HashMap<&str, Option<Book>> = join_all(
            book_ids
                .into_iter()
                .map(|id| async move { (id, self.lookup_book(id).await) }),
        )
        .await
        .into_iter()
        .collect();

        appointments
            .iter()
            .map(|a| {
                let book = books.get(a.book_id.as_str()).cloned().flatten();
                AppointmentView::new((**a).clone(), book)
            })
            .collect()
    }

    pub async fn get_appointment(&self, id: Ulid) -> Result<AppointmentView, EngineError> {
        let appointment = self.store.get(&id)?;
        let book = self.lookup_book(&appointment.book_id).await;
        Ok(AppointmentView::new((*appointment).clone(), book))
    }

    /// Every appointment in creation order. A missing book leaves `book` empty.
    pub async fn get_all_appointments(&self) -> Vec<AppointmentView> {
        let appointments = self.store.all();
        self.join_books(&appointments).await
    }

    /// The book with all its appointments. Catalog errors propagate.
    pub async fn get_book_appointments(&self, book_id: &str) -> Result<BookAppointments, EngineError> {
        let book = self.catalog.get_book(book_id).await?;
        let appointments = self
            .store
            .filtered(|a| a.book_id == book_id)
            .into_iter()
            .map(|a| (*a).clone())
            .collect();
        Ok(BookAppointments { book, appointments })
    }

    pub async fn get_user_appointments(&self, user_id: &str) -> UserAppointments {
        let appointments = self.store.filtered(|a| a.user_id == user_id);
        UserAppointments {
            user_id: user_id.to_string(),
            appointments: self.join_books(&appointments).await,
        }
    }
}
