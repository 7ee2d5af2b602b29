//! Outgoing message composition

use serde::{Deserialize, Serialize};

use crate::models::Message;

/// Reason an outgoing message cannot be sent
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ComposeError {
    #[error("Missing required field: {0}")]
    MissingField(&'static str),
    #[error("No sending account selected")]
    NoSendingAccount,
}

/// A message to hand to the send transport
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutgoingMessage {
    pub to_email: String,
    pub subject: String,
    pub body: String,
    pub sending_account_id: Option<String>,
}

impl OutgoingMessage {
    pub fn new(
        to_email: impl Into<String>,
        subject: impl Into<String>,
        body: impl Into<String>,
    ) -> Self {
        Self {
            to_email: to_email.into(),
            subject: subject.into(),
            body: body.into(),
            sending_account_id: None,
        }
    }

    /// Start a reply: addressed to the original sender, subject prefixed
    /// with `Re: `, empty body
    pub fn reply_to(original: &Message) -> Self {
        Self::new(
            original.from_email.clone(),
            format!("Re: {}", original.subject),
            String::new(),
        )
    }

    pub fn from_account(mut self, account_id: impl Into<String>) -> Self {
        self.sending_account_id = Some(account_id.into());
        self
    }

    pub fn with_body(mut self, body: impl Into<String>) -> Self {
        self.body = body.into();
        self
    }

    /// Check that the message can be handed to the transport
    pub fn validate(&self) -> Result<(), ComposeError> {
        let fields = [
            ("to", &self.to_email),
            ("subject", &self.subject),
            ("body", &self.body),
        ];
        for (name, value) in fields {
            if value.trim().is_empty() {
                return Err(ComposeError::MissingField(name));
            }
        }
        if self
            .sending_account_id
            .as_deref()
            .is_none_or(|id| id.trim().is_empty())
        {
            return Err(ComposeError::NoSendingAccount);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reply_to_original_sender() {
        let original = Message::builder(1)
            .from("lead@acme.com")
            .to("sales@us.com")
            .subject("Quote")
            .build();

        let reply = OutgoingMessage::reply_to(&original);
        assert_eq!(reply.to_email, "lead@acme.com");
        assert_eq!(reply.subject, "Re: Quote");
        assert!(reply.body.is_empty());
    }

    #[test]
    fn test_validate_missing_fields() {
        let msg = OutgoingMessage::new("a@x.com", "Hi", "").from_account("1");
        assert_eq!(msg.validate(), Err(ComposeError::MissingField("body")));

        let msg = OutgoingMessage::new("", "Hi", "Body").from_account("1");
        assert_eq!(msg.validate(), Err(ComposeError::MissingField("to")));
    }

    #[test]
    fn test_validate_requires_account() {
        let msg = OutgoingMessage::new("a@x.com", "Hi", "Body");
        assert_eq!(msg.validate(), Err(ComposeError::NoSendingAccount));
        assert!(msg.from_account("acct-1").validate().is_ok());
    }
}
