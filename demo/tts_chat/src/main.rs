use koe_core::{ChatSession, ExchangeStatus, KoeConfig, SubmitOutcome, TranscriptSnapshot};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::signal;
use tracing::info;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Logging / tracing
    let filter =
        std::env::var("RUST_LOG").unwrap_or_else(|_| "info,koe_core=info,tts_chat=info".to_string());
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .init();

    // Load configuration (defaults + env + optional TOML overlay)
    let cfg = KoeConfig::load();
    info!(
        target = "tts_chat",
        endpoint = %cfg.tts.endpoint,
        "Starting TTS chat"
    );

    let session = ChatSession::new(cfg)?;

    println!("Type text to synthesize; Enter sends it. Ctrl+D or Ctrl+C exits.");

    let stdin = BufReader::new(tokio::io::stdin());
    let mut lines = stdin.lines();

    loop {
        tokio::select! {
            line = lines.next_line() => {
                match line? {
                    Some(line) => {
                        match session.submit(&line).await {
                            SubmitOutcome::Accepted { id } => {
                                render(&session.snapshot().await, &id);
                            }
                            SubmitOutcome::IgnoredEmpty => {}
                            SubmitOutcome::IgnoredBusy => {
                                println!("(still generating, input dropped)");
                            }
                        }
                    }
                    None => break,
                }
            }
            _ = signal::ctrl_c() => {
                info!(target = "tts_chat", "Shutting down...");
                break;
            }
        }
    }

    session.shutdown();
    Ok(())
}

fn render(snapshot: &TranscriptSnapshot, id: &str) {
    if let Some(err) = &snapshot.error {
        println!("error: {err}");
    }
    let Some(entry) = snapshot.entries.iter().find(|e| e.id == id) else {
        return;
    };
    match &entry.status {
        ExchangeStatus::Resolved { audio } => {
            println!("you: {}", entry.text);
            println!("  -> audio: {}", audio.path().display());
        }
        ExchangeStatus::Failed => {
            println!("you: {}", entry.text);
            println!("  -> synthesis failed");
        }
        ExchangeStatus::Pending => {
            println!("you: {}  (pending)", entry.text);
        }
    }
}
