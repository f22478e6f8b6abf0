//! Sitestock
//!
//! Inventory and procurement service for construction companies:
//! OTP-verified registration and login, inventory CRUD, purchase-order
//! lifecycle tracking with delivery-triggered inventory reconciliation,
//! and dashboard aggregates.

pub mod config;
pub mod crypto;
pub mod email;
pub mod error;
pub mod routes;
pub mod state;
pub mod store;

pub use config::Config;
pub use email::{ConsoleEmailSender, EmailSender, SmtpConfig, SmtpEmailSender};
pub use error::AppError;
pub use state::AppState;
pub use store::{Datastore, MemoryStore, SqliteStore};
