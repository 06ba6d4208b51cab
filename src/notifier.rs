use crate::mailer::{Mailer, MessageId};
use crate::models::Offer;
use maud::{html, Markup};
use tracing::{info, warn};

pub const SUCCESS_SUBJECT: &str = "Neue Immobilien gefunden";
pub const ERROR_SUBJECT: &str = "Fehler beim Laden der Immobilien";

/// Renders new offers as one HTML table.
pub fn render_report(offers: &[Offer]) -> Markup {
    html! {
        p { "Neue Angebote:" }
        table border="1" {
            thead {
                tr {
                    th { "timestamp" }
                    th { "title" }
                    th { "url" }
                    th { "price" }
                }
            }
            tbody {
                @for offer in offers {
                    tr {
                        td { (offer.timestamp) }
                        td { (offer.title) }
                        td { a href=(offer.url) { (offer.url) } }
                        td { (offer.price) }
                    }
                }
            }
        }
    }
}

fn render_failure(error: &str) -> Markup {
    html! {
        p { "Beim Laden der Immobilien ist ein Fehler aufgetreten:" }
        pre { (error) }
    }
}

/// Sends pass results to a fixed recipient list.
pub struct Notifier<'a> {
    mailer: &'a dyn Mailer,
    sender: String,
    recipients: Vec<String>,
}

impl<'a> Notifier<'a> {
    pub fn new(mailer: &'a dyn Mailer, sender: impl Into<String>, recipients: Vec<String>) -> Self {
        Self {
            mailer,
            sender: sender.into(),
            recipients,
        }
    }

    /// Mails the new offers. Nothing is sent for an empty slice, and a failed
    /// dispatch is logged rather than returned.
    pub fn notify(&self, offers: &[Offer]) -> Option<MessageId> {
        if offers.is_empty() {
            return None;
        }
        self.dispatch(SUCCESS_SUBJECT, render_report(offers))
    }

    pub fn notify_failure(&self, error: &str) -> Option<MessageId> {
        self.dispatch(ERROR_SUBJECT, render_failure(error))
    }

    fn dispatch(&self, subject: &str, body: Markup) -> Option<MessageId> {
        if self.recipients.is_empty() {
            warn!(subject, "No recipients configured, not sending email");
            return None;
        }

        match self
            .mailer
            .send(&self.sender, &self.recipients, subject, &body.into_string())
        {
            Ok(id) => {
                info!(message_id = %id.0, "Email sent");
                Some(id)
            }
            Err(e) => {
                warn!(code = %e.code, error = %e.message, "Failed to send email");
                None
            }
        }
    }
}
