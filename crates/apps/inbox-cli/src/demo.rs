//! Sample messages for `--demo`

use chrono::{Duration, Utc};
use inbox::{InMemoryMessageSource, Message};

pub fn source() -> InMemoryMessageSource {
    let now = Utc::now();
    let messages = vec![
        Message::builder(1)
            .from("sales@us.com")
            .to("lead@acme.com")
            .subject("Quote for Q3")
            .body("Please find the quote attached.")
            .created_at(now - Duration::hours(30))
            .read(true)
            .campaign(7, Some("Summer outreach".to_string()))
            .build(),
        Message::builder(2)
            .from("lead@acme.com")
            .to("sales@us.com")
            .subject("Re: Quote for Q3")
            .body("Thanks, can we talk pricing?")
            .created_at(now - Duration::hours(5))
            .campaign(7, Some("Summer outreach".to_string()))
            .build(),
        Message::builder(3)
            .from("ops@vendor.io")
            .to("sales@us.com")
            .subject("Onboarding")
            .body("Kickoff call scheduled.")
            .created_at(now - Duration::hours(12))
            .thread_id("thr9001")
            .starred(true)
            .build(),
        Message::builder(4)
            .from("sales@us.com")
            .to("ops@vendor.io")
            .subject("RE: Onboarding")
            .body("Confirmed, see you then.")
            .created_at(now - Duration::hours(2))
            .thread_id("thr9001")
            .read(true)
            .build(),
    ];
    InMemoryMessageSource::with_messages(messages)
}
