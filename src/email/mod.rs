//! Email sending abstractions

pub mod console;
pub mod smtp;

pub use console::ConsoleEmailSender;
pub use smtp::{SmtpConfig, SmtpEmailSender};

/// Trait for sending one-time passcodes
pub trait EmailSender: Send + Sync {
    /// Send a verification passcode to an email address
    fn send_otp(&self, email: &str, code: &str) -> Result<(), String>;
}

/// Allow using Box<dyn EmailSender> as an EmailSender
impl EmailSender for Box<dyn EmailSender> {
    fn send_otp(&self, email: &str, code: &str) -> Result<(), String> {
        (**self).send_otp(email, code)
    }
}
