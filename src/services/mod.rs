mod extractor;
mod mailer;

pub use extractor::{ContentExtractor, HttpExtractor};
pub use mailer::{Notifier, SmtpMailer};
