//! External collaborators consumed by the controller
//!
//! The host UI owns navigation, the notification surface and the
//! question-answering provider. The controller only sees these traits.

mod answer;
mod navigation;
mod notify;

pub use answer::{AnswerError, OfflineAnswerer, QuestionAnswerer};
pub use navigation::{Navigator, Screen};
pub use notify::{LogNotifier, Notification, Notifier, Severity};
