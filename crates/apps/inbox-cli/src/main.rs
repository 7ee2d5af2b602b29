//! inbox - command-line conversation viewer
//!
//! Usage:
//!   inbox [--demo] [--json] [all|unread|read|archived|starred] [--open N]
//!
//! Loads the first page of messages, prints the conversations built from
//! it, and optionally opens the N-th conversation (1-based).

use anyhow::{Context, Result};
use clap::Parser;
use log::{error, info};
use std::sync::Arc;

use inbox::{
    ActionHandler, Completeness, ConversationFilter, HttpMessageSource, Inbox, InboxConfig,
    MessageSource, StatusFilter, list_conversations,
};

mod demo;

#[derive(Parser, Debug)]
#[command(name = "inbox", version, about = "Conversation view over a paginated message feed")]
struct Cli {
    /// Use built-in sample messages instead of the backend
    #[arg(long)]
    demo: bool,

    /// Print conversations as JSON
    #[arg(long)]
    json: bool,

    /// Open the N-th listed conversation (1-based)
    #[arg(long, value_name = "N")]
    open: Option<usize>,

    /// all, unread, read, archived or starred
    #[arg(default_value = "all", value_parser = parse_status)]
    status: StatusFilter,
}

fn parse_status(s: &str) -> Result<StatusFilter, String> {
    s.parse().map_err(|e: anyhow::Error| e.to_string())
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .init();

    if let Err(e) = config::init() {
        error!("Failed to initialize config directory: {}", e);
    }

    if let Err(e) = run() {
        error!("{:#}", e);
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let args = Cli::parse();
    let settings = InboxConfig::load()?;

    let source: Arc<dyn MessageSource> = if args.demo {
        info!("Using built-in demo messages");
        Arc::new(demo::source())
    } else {
        info!("Using backend at {}", settings.api_base_url);
        Arc::new(HttpMessageSource::new(
            settings.api_base_url.clone(),
            settings.auth_token.clone(),
        )?)
    };

    let handler = ActionHandler::new(source, settings.page_size);
    let mut inbox = Inbox::new(settings.key_order);
    let filter = ConversationFilter::default().with_status(args.status);

    handler.refresh(&mut inbox, &filter, 1)?;
    let summaries = list_conversations(&inbox, &filter, usize::MAX, 0);

    if args.json {
        println!("{}", serde_json::to_string_pretty(&summaries)?);
    } else {
        for (i, s) in summaries.iter().enumerate() {
            println!(
                "{:>3}. {} {:<40} {:>2} msg {:>2} unread  {}  [{}]",
                i + 1,
                if s.is_starred { "*" } else { " " },
                s.subject,
                s.message_count,
                s.unread_count,
                s.last_message_at.format("%Y-%m-%d %H:%M"),
                s.participants.join(", ")
            );
        }
    }

    let Some(n) = args.open else {
        return Ok(());
    };
    let summary = summaries
        .get(n.wrapping_sub(1))
        .with_context(|| format!("No conversation #{}", n))?;

    let opened = handler.open(&mut inbox, &summary.key)?;
    println!();
    println!("== {} ==", opened.conversation.subject());
    if opened.completeness == Completeness::Windowed {
        println!("(showing messages from the loaded page only)");
    }
    for message in opened.conversation.messages() {
        println!(
            "[{}] {} -> {}\n  {}",
            message.created_at.format("%Y-%m-%d %H:%M"),
            message.from_email,
            message.to_email,
            message.body
        );
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let cli = Cli::try_parse_from(["inbox"]).unwrap();
        assert!(!cli.demo);
        assert!(!cli.json);
        assert_eq!(cli.status, StatusFilter::All);
        assert_eq!(cli.open, None);
    }

    #[test]
    fn test_flags_and_status() {
        let cli =
            Cli::try_parse_from(["inbox", "--demo", "--json", "unread", "--open", "2"]).unwrap();
        assert!(cli.demo);
        assert!(cli.json);
        assert_eq!(cli.status, StatusFilter::Unread);
        assert_eq!(cli.open, Some(2));
    }

    #[test]
    fn test_rejects_bad_input() {
        assert!(Cli::try_parse_from(["inbox", "pending"]).is_err());
        assert!(Cli::try_parse_from(["inbox", "--open", "two"]).is_err());
        assert!(Cli::try_parse_from(["inbox", "--verbose"]).is_err());
    }
}
