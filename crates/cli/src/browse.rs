//! `gif browse` — interactive session on stdin/stdout.
//!
//! A plain line is treated as typed search text (debounced like keystrokes);
//! lines starting with `:` are commands.

use std::sync::Arc;
use std::time::Duration;

use tokio::io::{AsyncBufReadExt, BufReader};

use gifscope_core::client::ProxyClient;
use gifscope_core::clipboard::SystemClipboard;
use gifscope_core::config::ClientConfig;
use gifscope_core::controls::rating_options;
use gifscope_core::presenter::Activation;
use gifscope_core::query::QueryStatus;
use gifscope_core::session::{BrowseEvent, BrowseSession, SessionSettings};
use gifscope_core::types::{QueryMode, Rating};

use crate::term_width;

const HELP: &str = "\
Type to search. Commands:
  :rating <g|pg|pg-13|r>   change the content rating
  :trending / :search      switch mode
  :more                    load the next page
  :copy <n> / :save <n>    copy or download result n
  :clear                   clear the search text
  :help                    show this help
  :quit                    exit";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Type(String),
    Clear,
    Rating(Rating),
    Mode(QueryMode),
    More,
    Copy(usize),
    Save(usize),
    Help,
    Quit,
    Invalid(String),
}

pub fn parse_command(line: &str) -> Command {
    let Some(rest) = line.trim().strip_prefix(':') else {
        return Command::Type(line.trim_end_matches(['\r', '\n']).to_string());
    };
    let mut parts = rest.split_whitespace();
    let name = parts.next().unwrap_or("");
    let arg = parts.next();

    let index = |arg: Option<&str>| arg.and_then(|a| a.parse::<usize>().ok());
    match (name, arg) {
        ("q" | "quit" | "exit", _) => Command::Quit,
        ("h" | "help", _) => Command::Help,
        ("clear", _) => Command::Clear,
        ("more", _) => Command::More,
        ("trending", _) => Command::Mode(QueryMode::Trending),
        ("search", _) => Command::Mode(QueryMode::Search),
        ("rating", Some(r)) => match r.parse() {
            Ok(rating) => Command::Rating(rating),
            Err(e) => Command::Invalid(e),
        },
        ("rating", None) => Command::Invalid("usage: :rating <g|pg|pg-13|r>".into()),
        ("copy", a) => index(a).map(Command::Copy).unwrap_or_else(|| Command::Invalid("usage: :copy <n>".into())),
        ("save", a) => index(a).map(Command::Save).unwrap_or_else(|| Command::Invalid("usage: :save <n>".into())),
        _ => Command::Invalid(format!("Unknown command ':{rest}' (try :help)")),
    }
}

impl Command {
    fn into_event(self) -> Option<BrowseEvent> {
        Some(match self {
            Command::Type(text) => BrowseEvent::Typed(text),
            Command::Clear => BrowseEvent::Cleared,
            Command::Rating(r) => BrowseEvent::RatingChanged(r),
            Command::Mode(m) => BrowseEvent::ModeChanged(m),
            Command::More => BrowseEvent::ScrolledToEnd,
            Command::Copy(index) => BrowseEvent::Activate { index, activation: Activation::Primary },
            Command::Save(index) => BrowseEvent::Activate { index, activation: Activation::Secondary },
            Command::Help | Command::Quit | Command::Invalid(_) => return None,
        })
    }
}

type Session = BrowseSession<ProxyClient, ProxyClient, SystemClipboard>;

fn header(session: &Session) -> String {
    let controls = session.controls();
    let rating = rating_options()
        .iter()
        .map(|(r, label)| if *r == controls.rating() { format!("[{label}]") } else { label.to_string() })
        .collect::<Vec<_>>()
        .join(" ");
    let what = match controls.mode() {
        QueryMode::Search if controls.committed_text().is_empty() => "search (type something)".to_string(),
        QueryMode::Search => format!("search \"{}\"", controls.committed_text()),
        QueryMode::Trending => "trending".to_string(),
    };
    let status = match session.controller().status() {
        QueryStatus::LoadingFirst => " loading…",
        QueryStatus::LoadingMore => " loading more…",
        _ => "",
    };
    format!("── {what} · {rating}{status}")
}

fn render(session: &Session) {
    println!("{}", header(session));
    print!("{}", session.view().render_text(term_width()));
}

pub async fn run(config: &ClientConfig, client: ProxyClient) -> std::io::Result<()> {
    let settings = SessionSettings {
        page_size: config.page_size,
        rating: config.rating,
        debounce: Duration::from_millis(config.debounce_ms),
        download_dir: config.download_dir.clone(),
    };
    let clipboard = SystemClipboard::open();
    if !clipboard.is_available() {
        eprintln!("Clipboard unavailable: :copy will fail");
    }
    let source = Arc::new(client);
    let (mut session, mut events) = BrowseSession::new(settings, Arc::clone(&source), source, clipboard);

    println!("{HELP}");
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut tick = tokio::time::interval(Duration::from_millis(250));
    let mut last_toast = None;

    loop {
        let changed = tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line? else { break };
                match parse_command(&line) {
                    Command::Quit => break,
                    Command::Help => {
                        println!("{HELP}");
                        false
                    }
                    Command::Invalid(msg) => {
                        eprintln!("{msg}");
                        false
                    }
                    cmd => cmd.into_event().is_some_and(|event| session.handle(event)),
                }
            }
            Some(event) = events.recv() => session.handle(event),
            _ = tick.tick() => session.handle(BrowseEvent::Tick),
        };

        if let Some(toast) = session.notifications().latest() {
            if last_toast != Some(toast.id) {
                last_toast = Some(toast.id);
                println!("» {}", toast.message);
            }
        }
        if changed {
            render(&session);
        }
    }
    Ok(())
}
