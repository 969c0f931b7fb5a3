use async_trait::async_trait;
use lettre::message::{Mailbox, MultiPart};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{Address, AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};

use crate::config::SmtpConfig;
use crate::error::Result;
use crate::models::Subscriber;

/// Boundary to notification delivery. A failed send is observable to the
/// caller but never retried here.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, subscriber: &Subscriber, hits: &[String], address: &str) -> Result<()>;
}

pub struct SmtpMailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    sender: Mailbox,
}

impl SmtpMailer {
    pub fn new(smtp: &SmtpConfig) -> Result<Self> {
        let sender: Mailbox = smtp.sender.parse()?;
        let transport = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&smtp.host)?
            .port(smtp.port)
            .credentials(Credentials::new(smtp.sender.clone(), smtp.password.clone()))
            .build();

        Ok(Self { transport, sender })
    }
}

#[async_trait]
impl Notifier for SmtpMailer {
    async fn notify(&self, subscriber: &Subscriber, hits: &[String], address: &str) -> Result<()> {
        let to = Mailbox::new(
            Some(subscriber.name.clone()),
            subscriber.email.parse::<Address>()?,
        );

        let message = Message::builder()
            .from(self.sender.clone())
            .to(to)
            .subject("Feed alert: your search terms matched a new item")
            .multipart(MultiPart::alternative_plain_html(
                render_text(subscriber, hits, address),
                render_html(subscriber, hits, address),
            ))?;

        self.transport.send(message).await?;
        tracing::debug!("alert sent to {}", subscriber.email);
        Ok(())
    }
}

fn render_text(subscriber: &Subscriber, hits: &[String], address: &str) -> String {
    format!(
        "Hello {},\n\nA new item matched your search terms:\n{}\n\nRead it here: {}\n",
        subscriber.name,
        hits.iter()
            .map(|hit| format!("  - {hit}"))
            .collect::<Vec<_>>()
            .join("\n"),
        address,
    )
}

fn render_html(subscriber: &Subscriber, hits: &[String], address: &str) -> String {
    format!(
        "<html><body>\
         <p>Hello {},</p>\
         <p>A new item matched your search terms:</p>\
         <ul>{}</ul>\
         <p><a href=\"{}\">Read the item</a></p>\
         </body></html>",
        subscriber.name,
        hits.iter()
            .map(|hit| format!("<li>{hit}</li>"))
            .collect::<Vec<_>>()
            .join(""),
        address,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bobby() -> Subscriber {
        Subscriber {
            name: "bobby b".to_string(),
            email: "b@x.com".to_string(),
        }
    }

    #[test]
    fn text_body_lists_hits_and_address() {
        let body = render_text(&bobby(), &["WINE".to_string()], "https://a.example/1");
        assert!(body.contains("Hello bobby b"));
        assert!(body.contains("  - WINE"));
        assert!(body.contains("https://a.example/1"));
    }

    #[test]
    fn html_body_links_the_item() {
        let body = render_html(
            &bobby(),
            &["WINE".to_string(), "WARHAMMERS".to_string()],
            "https://a.example/1",
        );
        assert!(body.contains("<li>WINE</li><li>WARHAMMERS</li>"));
        assert!(body.contains("href=\"https://a.example/1\""));
    }
}
