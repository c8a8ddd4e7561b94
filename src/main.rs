use hackhub_assistant::context::prompts_for;
use hackhub_assistant::{
    AssistantConfig, ChatSession, EventBus, HttpChatBackend, KeyValueStore, MemoryStore, PageView,
    Role, SessionEvent, SqliteStore, StoreLocation, Submission,
};
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::broadcast::{self, error::RecvError};
use tracing::{error, info, warn};

const HELP: &str = "\
Type a question and press Enter. Commands:
  /open, /close, /toggle   show or hide the chat
  /page <path> [count]     switch page, optionally with the number of visible cards
  /prompts [category]      list suggested questions for this page or a category
  /ask <n>                 send suggested question n
  /history                 print the conversation
  /clear                   forget the conversation
  /quit                    save and exit";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file
    let dotenv = dotenvy::dotenv();

    // Initialize logging with default filter if RUST_LOG is not set
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    if let Err(e) = dotenv {
        info!("No .env file found or failed to load: {}", e);
    }

    let config = AssistantConfig::from_env()?;

    let store: Arc<dyn KeyValueStore> = match &config.store {
        StoreLocation::Memory => {
            info!("Using in-memory chat history");
            Arc::new(MemoryStore::new())
        }
        StoreLocation::Sqlite(path) => {
            info!("Initializing store at {}", path.display());
            let store = SqliteStore::new(path).await?;
            store.init().await?;
            Arc::new(store)
        }
    };

    let backend = HttpChatBackend::new(&config.endpoint, config.http_timeout)?;
    info!("Chat endpoint: {}", backend.endpoint());

    let bus = Arc::new(EventBus::new());
    let renderer = tokio::spawn(render(bus.subscribe()));

    let session = Arc::new(
        ChatSession::load(
            Arc::new(backend),
            store,
            bus.clone(),
            config.limits,
            PageView::new(config.initial_page.clone()),
        )
        .await,
    );

    println!("HackHub assistant. /help lists commands.");
    session.open();
    if session.is_empty() {
        print_prompts(&session);
    } else {
        print_history(&session);
    }

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                info!("Received Ctrl+C, shutting down...");
                break;
            }
            line = lines.next_line() => {
                match line {
                    Ok(Some(line)) => {
                        if !handle_line(&session, line.trim()) {
                            break;
                        }
                    }
                    Ok(None) => break,
                    Err(e) => {
                        error!("Failed to read input: {}", e);
                        break;
                    }
                }
            }
        }
    }

    session.persist_snapshot().await;
    renderer.abort();

    Ok(())
}

/// Returns false when the user asked to quit.
fn handle_line(session: &Arc<ChatSession>, line: &str) -> bool {
    if line.is_empty() {
        return true;
    }

    let (command, args) = match line.strip_prefix('/') {
        Some(rest) => {
            let mut parts = rest.splitn(2, char::is_whitespace);
            (
                parts.next().unwrap_or_default(),
                parts.next().unwrap_or_default().trim(),
            )
        }
        None => {
            spawn_submit(session, line.to_string());
            return true;
        }
    };

    match command {
        "quit" | "exit" => return false,
        "help" => println!("{}", HELP),
        "open" => session.open(),
        "close" => session.close(),
        "toggle" => session.toggle(),
        "prompts" if args.is_empty() => print_prompts(session),
        "prompts" => {
            println!("Questions about {}:", args);
            print_numbered(prompts_for(args));
        }
        "history" => print_history(session),
        "page" => {
            let mut parts = args.split_whitespace();
            match parts.next() {
                Some(path) => {
                    let mut page = PageView::new(path);
                    if let Some(count) = parts.next().and_then(|c| c.parse().ok()) {
                        page = page.with_visible_count(count);
                    }
                    session.navigate(page);
                    println!("-- now on {} ({})", path, session.derive_context().category);
                }
                None => println!("usage: /page <path> [count]"),
            }
        }
        "ask" => {
            let prompts = session.suggested_prompts();
            match args.parse::<usize>() {
                Ok(n) if (1..=prompts.len()).contains(&n) => {
                    let session = session.clone();
                    let prompt = prompts[n - 1];
                    tokio::spawn(async move {
                        if session.ask(prompt, None).await == Submission::Dropped {
                            println!("-- still waiting on the last reply, not sent");
                        }
                    });
                }
                _ => println!("usage: /ask <1-{}>", prompts.len()),
            }
        }
        "clear" => {
            let session = session.clone();
            tokio::spawn(async move { session.clear_history().await });
        }
        other => println!("unknown command /{} (try /help)", other),
    }

    true
}

fn spawn_submit(session: &Arc<ChatSession>, text: String) {
    let session = session.clone();
    tokio::spawn(async move {
        if session.submit(&text).await == Submission::Dropped {
            println!("-- still waiting on the last reply, not sent");
        }
    });
}

fn print_prompts(session: &ChatSession) {
    println!("Try asking me:");
    print_numbered(session.suggested_prompts());
}

fn print_numbered(prompts: &[&str]) {
    for (i, prompt) in prompts.iter().enumerate() {
        println!("  {}. {}", i + 1, prompt);
    }
}

fn print_history(session: &ChatSession) {
    for msg in session.messages() {
        println!(
            "[{}] {}> {}",
            msg.timestamp.format("%H:%M"),
            msg.role,
            msg.content
        );
    }
}

/// Prints session events. While the chat is closed, assistant replies are
/// held back and counted, then shown on the next open.
async fn render(mut rx: broadcast::Receiver<SessionEvent>) {
    let mut open = false;
    let mut unread = Vec::new();

    loop {
        match rx.recv().await {
            Ok(SessionEvent::MessageAppended(msg)) => {
                if msg.role == Role::User {
                    continue;
                }
                if open {
                    println!("assistant> {}", msg.content);
                } else {
                    unread.push(msg);
                    println!("-- {} unread (/open to read)", unread.len());
                }
            }
            Ok(SessionEvent::AwaitingChanged(true)) => println!("-- assistant is typing..."),
            Ok(SessionEvent::AwaitingChanged(false)) => {}
            Ok(SessionEvent::VisibilityChanged(now_open)) => {
                open = now_open;
                if open {
                    for msg in unread.drain(..) {
                        println!("assistant> {}", msg.content);
                    }
                } else {
                    println!("-- chat closed");
                }
            }
            Ok(SessionEvent::HistoryRestored { count }) => {
                println!("-- restored {} message(s) from your last visit", count)
            }
            Ok(SessionEvent::HistoryCleared) => println!("-- conversation cleared"),
            Err(RecvError::Lagged(n)) => warn!("Renderer skipped {} event(s)", n),
            Err(RecvError::Closed) => break,
        }
    }
}
