//! REST message source
//!
//! Talks to the email-replies backend over HTTP. Uses synchronous HTTP
//! (ureq) so it does not tie callers to an executor.

use anyhow::{Context, Result};
use log::debug;
use serde::{Deserialize, Serialize};
use url::Url;

use super::{MessagePage, MessageSource, Pagination};
use crate::compose::OutgoingMessage;
use crate::filter::MessageFilter;
use crate::models::{Message, MessageId, ThreadId};

/// `GET /email-replies` and `GET /email-replies/thread/{id}` response body
#[derive(Debug, Deserialize)]
struct RepliesResponse {
    #[serde(default)]
    replies: Vec<Message>,
    #[serde(default)]
    pagination: Option<Pagination>,
}

/// `POST /emails/send` request body
#[derive(Debug, Serialize)]
struct SendRequest<'a> {
    to_email: &'a str,
    subject: &'a str,
    body: &'a str,
    sending_account_id: Option<&'a str>,
    save_to_sent: bool,
}

/// HTTP client for the messages backend
pub struct HttpMessageSource {
    base_url: String,
    auth_token: Option<String>,
}

impl HttpMessageSource {
    /// Create a client for `base_url` (e.g. `https://crm.example.com/api`)
    pub fn new(base_url: impl Into<String>, auth_token: Option<String>) -> Result<Self> {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Url::parse(&base_url).with_context(|| format!("Invalid API base URL: {}", base_url))?;
        Ok(Self {
            base_url,
            auth_token,
        })
    }

    fn endpoint(&self, path: &str) -> Result<Url> {
        let raw = format!("{}/{}", self.base_url, path.trim_start_matches('/'));
        Url::parse(&raw).with_context(|| format!("Invalid endpoint URL: {}", raw))
    }

    fn authorize<B>(&self, request: ureq::RequestBuilder<B>) -> ureq::RequestBuilder<B> {
        match &self.auth_token {
            Some(token) => request.header("Authorization", &format!("Bearer {}", token)),
            None => request,
        }
    }
}

impl MessageSource for HttpMessageSource {
    fn fetch_messages_page(
        &self,
        filter: &MessageFilter,
        page: u32,
        limit: u32,
    ) -> Result<MessagePage> {
        let mut url = self.endpoint("email-replies")?;
        url.query_pairs_mut()
            .extend_pairs(filter.query_pairs(page, limit));
        debug!("GET {}", url);

        let mut response = self
            .authorize(ureq::get(url.as_str()))
            .call()
            .context("Failed to send list replies request")?;

        let body: RepliesResponse = response
            .body_mut()
            .read_json()
            .context("Failed to parse list replies response")?;

        let pagination = body
            .pagination
            .unwrap_or_else(|| Pagination::new(page, limit, body.replies.len() as u64));

        Ok(MessagePage {
            messages: body.replies,
            pagination,
        })
    }

    fn fetch_thread(&self, thread_id: &ThreadId) -> Result<Vec<Message>> {
        let url = self.endpoint(&format!(
            "email-replies/thread/{}",
            urlencoding::encode(thread_id.as_str())
        ))?;
        debug!("GET {}", url);

        let response = self.authorize(ureq::get(url.as_str())).call();
        match response {
            Ok(mut response) => {
                let body: RepliesResponse = response
                    .body_mut()
                    .read_json()
                    .context("Failed to parse thread response")?;
                Ok(body.replies)
            }
            // Unknown thread: let the caller fall back to the loaded window
            Err(ureq::Error::StatusCode(404)) => Ok(Vec::new()),
            Err(e) => Err(anyhow::anyhow!("Failed to fetch thread {}: {}", thread_id, e)),
        }
    }

    fn mark_read(&self, id: MessageId) -> Result<()> {
        let url = self.endpoint(&format!("email-replies/{}/mark-read", id))?;
        self.authorize(ureq::post(url.as_str()))
            .send_empty()
            .with_context(|| format!("Failed to mark message {} as read", id))?;
        Ok(())
    }

    fn delete_message(&self, id: MessageId) -> Result<()> {
        let url = self.endpoint(&format!("email-replies/{}", id))?;
        self.authorize(ureq::delete(url.as_str()))
            .call()
            .with_context(|| format!("Failed to delete message {}", id))?;
        Ok(())
    }

    fn send_message(&self, message: &OutgoingMessage) -> Result<()> {
        let url = self.endpoint("emails/send")?;
        let request = SendRequest {
            to_email: &message.to_email,
            subject: &message.subject,
            body: &message.body,
            sending_account_id: message.sending_account_id.as_deref(),
            save_to_sent: true,
        };
        self.authorize(ureq::post(url.as_str()))
            .send_json(&request)
            .context("Failed to send message")?;
        Ok(())
    }
}
