/// HTTP client for the transactional mail gateway.
///
/// Mail delivery is a side effect of auth flows; send failures are logged
/// and never fail the originating request, so handlers go through
/// [`send_in_background`].

use serde::Serialize;

#[derive(Debug, Clone, PartialEq)]
pub struct SenderEmail(String);

impl SenderEmail {
    pub fn parse(s: String) -> Result<SenderEmail, String> {
        if s.trim().is_empty() || !s.contains('@') {
            Err(format!("{} is not a valid sender email.", s))
        } else {
            Ok(Self(s))
        }
    }

    pub fn as_ref(&self) -> &str {
        &self.0
    }
}

#[derive(Clone)]
pub struct EmailClient {
    http_client: reqwest::Client,
    base_url: String,
    sender: SenderEmail,
}

impl EmailClient {
    pub fn new(base_url: String, sender: SenderEmail) -> Self {
        Self {
            http_client: reqwest::Client::new(),
            base_url,
            sender,
        }
    }

    pub async fn send_email(
        &self,
        recipient: &str,
        subject: &str,
        html_content: &str,
    ) -> Result<(), String> {
        let url = format!("{}/email", self.base_url);
        let request_body = SendEmailRequest {
            from: self.sender.as_ref(),
            to: recipient,
            subject,
            html_body: html_content,
        };
        self.http_client
            .post(&url)
            .json(&request_body)
            .send()
            .await
            .map_err(|e| e.to_string())?
            .error_for_status()
            .map_err(|e| e.to_string())?;
        Ok(())
    }
}

#[derive(Serialize)]
#[serde(rename_all = "PascalCase")]
struct SendEmailRequest<'a> {
    from: &'a str,
    to: &'a str,
    subject: &'a str,
    html_body: &'a str,
}

/// Fires the send on a detached task. Delivery failures are logged and
/// swallowed so the HTTP response is never blocked on the mail gateway.
pub fn send_in_background(
    client: &EmailClient,
    recipient: String,
    subject: String,
    html_content: String,
) {
    let client = client.clone();
    tokio::spawn(async move {
        if let Err(e) = client
            .send_email(&recipient, &subject, &html_content)
            .await
        {
            tracing::warn!(recipient = %recipient, error = %e, "failed to send email");
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sender_email_rejects_garbage() {
        assert!(SenderEmail::parse("".to_string()).is_err());
        assert!(SenderEmail::parse("   ".to_string()).is_err());
        assert!(SenderEmail::parse("no-at-sign".to_string()).is_err());
    }

    #[test]
    fn sender_email_accepts_plausible_addresses() {
        let sender = SenderEmail::parse("no-reply@auditpro.local".to_string()).unwrap();
        assert_eq!(sender.as_ref(), "no-reply@auditpro.local");
    }

    #[test]
    fn send_request_serializes_pascal_case() {
        let body = SendEmailRequest {
            from: "a@b.c",
            to: "d@e.f",
            subject: "Hi",
            html_body: "<p>Hi</p>",
        };
        let value = serde_json::to_value(&body).unwrap();
        assert_eq!(value["From"], "a@b.c");
        assert_eq!(value["To"], "d@e.f");
        assert_eq!(value["Subject"], "Hi");
        assert_eq!(value["HtmlBody"], "<p>Hi</p>");
    }
}
