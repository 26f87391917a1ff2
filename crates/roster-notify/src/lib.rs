//! Notification boundary for the membership registry.
//!
//! The API layer hands [`MemberEvent`]s to a [`Notifier`] after a write has
//! committed. A dispatcher task drains the queue, renders each event with
//! [`Templates`] and passes the result to a [`Mailer`]. Nothing on this side
//! of the queue can fail the write that produced the event.
//!
//! [`MemberEvent`]: roster_core::event::MemberEvent

pub mod error;
pub mod mailer;
pub mod queue;
pub mod template;

pub use error::{Error, Result};
pub use mailer::{LogMailer, MailMessage, Mailer, RecordingMailer};
pub use queue::{Notifier, dispatch, spawn_dispatcher};
pub use template::Templates;
