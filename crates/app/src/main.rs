//! Terminal harness for the shop assistant.
//!
//! Runs the same core the embeddable widget uses: a chat loop against the
//! configured provider, `usage` and `clear-usage` subcommands over the
//! local ledger, and an `owner` subcommand for the admin unlock flow.
//! Admin configuration lives in the file store under `ai_agent_config`.

use std::io::{BufRead, Write};
use std::sync::Arc;

use agent_host::{GateState, OwnerGate, ShopAssistant, WELCOME_MESSAGE};
use anyhow::Result;
use shared::store::{FileStore, KvStore, MemoryStore};
use zeroize::Zeroizing;

fn print_usage_summary(store: Arc<dyn KvStore>, days: u32) {
    let ledger = agent_host::UsageLedger::new(store);
    let summary = ledger.summary(days);
    println!("Usage, last {days} day(s):");
    for entry in &summary.series {
        println!(
            "  {}  messages={} actions={} clicks={} errors={}",
            entry.key,
            entry.aggregate.messages,
            entry.aggregate.actions,
            entry.aggregate.clicks,
            entry.aggregate.errors
        );
    }
    println!(
        "Totals: messages={} actions={} clicks={} errors={}",
        summary.totals.messages,
        summary.totals.actions,
        summary.totals.clicks,
        summary.totals.errors
    );
    if !summary.by_action.is_empty() {
        println!("By action:");
        let mut names: Vec<_> = summary.by_action.iter().collect();
        names.sort_by(|a, b| b.1.cmp(a.1).then(a.0.cmp(b.0)));
        for (name, count) in names {
            println!("  {name}: {count}");
        }
    }
}

fn read_secret(prompt: &str) -> Result<Zeroizing<String>> {
    print!("{prompt}");
    std::io::stdout().flush()?;
    let mut line = String::new();
    std::io::stdin().read_line(&mut line)?;
    Ok(Zeroizing::new(line.trim_end_matches(['\r', '\n']).to_string()))
}

/// Interactive owner unlock. The session flag lives only for this process,
/// so every invocation starts logged out.
fn owner_flow(store: Arc<dyn KvStore>, origin: &str) -> Result<()> {
    let session: Arc<dyn KvStore> = Arc::new(MemoryStore::new());
    let mut gate = OwnerGate::new(store, session, origin, None);

    match gate.state().clone() {
        GateState::Blocked(reason) => println!("{reason}"),
        GateState::NeedsSetup => {
            println!("Owner onboarding: choose a PIN (at least 6 characters).");
            let pin = read_secret("PIN: ")?;
            let confirm = read_secret("Confirm PIN: ")?;
            match gate.setup(&pin, &confirm, vec![origin.to_string()], None) {
                Ok(()) => println!("Owner PIN configured. Admin unlocked for this session."),
                Err(err) => println!("{err}"),
            }
        }
        GateState::LoggedOut => {
            let pin = read_secret("Owner PIN: ")?;
            match gate.login(&pin) {
                Ok(()) => println!("Admin unlocked for this session."),
                Err(err) => println!("{err}"),
            }
        }
        GateState::Authed => println!("Already unlocked."),
    }
    Ok(())
}

async fn chat_loop(assistant: ShopAssistant) -> Result<()> {
    println!("{WELCOME_MESSAGE}");
    println!("(provider: {}, empty line or Ctrl-D to quit)", assistant.provider_name());

    let stdin = std::io::stdin();
    let mut lines = stdin.lock().lines();
    loop {
        print!("> ");
        std::io::stdout().flush()?;
        let Some(line) = lines.next() else { break };
        let line = line?;
        if line.trim().is_empty() {
            break;
        }

        print!("Assistant is typing…");
        std::io::stdout().flush()?;
        let messages = assistant.handle_message(&line).await;
        print!("\r                     \r");
        for message in messages {
            println!("{message}");
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt().with_env_filter("info").init();

    let store: Arc<dyn KvStore> = Arc::new(FileStore::default_location());
    let args: Vec<String> = std::env::args().skip(1).collect();

    match args.first().map(String::as_str) {
        Some("usage") => {
            let days = args
                .get(1)
                .and_then(|d| d.parse().ok())
                .unwrap_or(7);
            print_usage_summary(store, days);
        }
        Some("clear-usage") => {
            agent_host::UsageLedger::new(store).clear();
            println!("Usage data cleared.");
        }
        Some("owner") => {
            let origin = args
                .get(1)
                .cloned()
                .unwrap_or_else(|| "local".to_string());
            owner_flow(store, &origin)?;
        }
        Some(other) => {
            eprintln!("Unknown command: {other}");
            eprintln!("Usage: shop-assistant [usage [days] | clear-usage | owner [origin]]");
            std::process::exit(2);
        }
        None => {
            let assistant = ShopAssistant::new(store)?;
            chat_loop(assistant).await?;
        }
    }
    Ok(())
}
