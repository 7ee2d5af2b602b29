//! Filters for the conversation list and for page fetches

use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::models::{Conversation, Message};

/// Read/archive/star status filter
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StatusFilter {
    /// Everything except archived
    #[default]
    All,
    Unread,
    Read,
    Archived,
    Starred,
}

impl StatusFilter {
    /// Value sent as the `filter` query parameter, `None` for `All`
    pub fn query_value(&self) -> Option<&'static str> {
        match self {
            StatusFilter::All => None,
            StatusFilter::Unread => Some("unread"),
            StatusFilter::Read => Some("read"),
            StatusFilter::Archived => Some("archived"),
            StatusFilter::Starred => Some("starred"),
        }
    }

    fn matches_flags(&self, unread: bool, archived: bool, starred: bool) -> bool {
        match self {
            StatusFilter::All => !archived,
            StatusFilter::Unread => unread,
            StatusFilter::Read => !unread,
            StatusFilter::Archived => archived,
            StatusFilter::Starred => starred,
        }
    }
}

impl FromStr for StatusFilter {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "all" => Ok(StatusFilter::All),
            "unread" => Ok(StatusFilter::Unread),
            "read" => Ok(StatusFilter::Read),
            "archived" => Ok(StatusFilter::Archived),
            "starred" => Ok(StatusFilter::Starred),
            other => Err(anyhow::anyhow!("Unknown status filter: {}", other)),
        }
    }
}

/// Filter applied to already-built conversations
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationFilter {
    pub status: StatusFilter,
    /// Only conversations whose last message belongs to this campaign
    pub campaign_id: Option<i64>,
    /// Case-insensitive text matched against subject, participants,
    /// last message body and tags
    pub search: Option<String>,
}

impl ConversationFilter {
    pub fn with_status(mut self, status: StatusFilter) -> Self {
        self.status = status;
        self
    }

    pub fn with_campaign(mut self, campaign_id: i64) -> Self {
        self.campaign_id = Some(campaign_id);
        self
    }

    pub fn with_search(mut self, search: impl Into<String>) -> Self {
        self.search = Some(search.into());
        self
    }

    pub fn matches(&self, conversation: &Conversation) -> bool {
        let last = conversation.last_message();

        if let Some(campaign_id) = self.campaign_id
            && last.and_then(|m| m.campaign_id) != Some(campaign_id)
        {
            return false;
        }

        if !self.status.matches_flags(
            conversation.has_unread(),
            conversation.is_archived(),
            conversation.is_starred(),
        ) {
            return false;
        }

        let Some(needle) = search_needle(self.search.as_deref()) else {
            return true;
        };

        contains_folded(conversation.subject(), &needle)
            || conversation
                .participants()
                .iter()
                .any(|p| contains_folded(p, &needle))
            || last.is_some_and(|m| contains_folded(&m.body, &needle))
            || conversation.tags().iter().any(|t| contains_folded(t, &needle))
    }
}

/// Filters forwarded to the message source when fetching a page
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageFilter {
    pub status: StatusFilter,
    pub search: Option<String>,
    pub campaign_id: Option<i64>,
}

impl MessageFilter {
    /// Check a single message, as a source without server-side filtering would
    pub fn matches(&self, message: &Message) -> bool {
        if let Some(campaign_id) = self.campaign_id
            && message.campaign_id != Some(campaign_id)
        {
            return false;
        }

        if !self
            .status
            .matches_flags(!message.is_read, message.is_archived, message.is_starred)
        {
            return false;
        }

        let Some(needle) = search_needle(self.search.as_deref()) else {
            return true;
        };

        [
            &message.subject,
            &message.body,
            &message.from_email,
            &message.to_email,
        ]
        .iter()
        .any(|field| contains_folded(field, &needle))
    }

    /// Query pairs for the `GET /email-replies` endpoint
    pub fn query_pairs(&self, page: u32, limit: u32) -> Vec<(&'static str, String)> {
        let mut pairs = vec![("page", page.to_string()), ("limit", limit.to_string())];
        if let Some(value) = self.status.query_value() {
            pairs.push(("filter", value.to_string()));
        }
        if let Some(search) = self.search.as_deref().filter(|s| !s.trim().is_empty()) {
            pairs.push(("search", search.to_string()));
        }
        if let Some(campaign_id) = self.campaign_id {
            pairs.push(("campaign_id", campaign_id.to_string()));
        }
        pairs
    }
}

impl From<&ConversationFilter> for MessageFilter {
    fn from(filter: &ConversationFilter) -> Self {
        Self {
            status: filter.status,
            search: filter.search.clone(),
            campaign_id: filter.campaign_id,
        }
    }
}

fn search_needle(search: Option<&str>) -> Option<String> {
    search
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_lowercase)
}

fn contains_folded(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(needle)
}
