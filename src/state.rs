//! Shared application state

use crate::email::EmailSender;
use crate::store::Datastore;

/// Application state: one store and one mailer, constructed at startup
/// and shared across every request.
pub struct AppState<D, E> {
    pub store: D,
    pub mailer: E,
}

impl<D: Datastore, E: EmailSender> AppState<D, E> {
    pub fn new(store: D, mailer: E) -> Self {
        Self { store, mailer }
    }
}
