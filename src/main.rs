mod assistant;
mod booking;
mod llm;
mod offers;
mod speech;
mod state;

use std::sync::Arc;

use anyhow::Result;
use chrono::Local;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tracing::{error, info, warn, Level};

use booking::{book_appointment, AgentType};
use llm::LlmClient;
use offers::OfferStore;
use speech::Transcript;
use state::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_max_level(Level::DEBUG)
        .init();

    // Load env
    let _ = dotenv::dotenv();

    // Init storage
    let data_dir = std::path::PathBuf::from(
        dotenv::var("OFFER_DATA_DIR").unwrap_or_else(|_| "./data/offers".to_string()),
    );
    let store = Arc::new(OfferStore::new(&data_dir).await?);
    info!("Offer store initialized at {:?}", data_dir);

    // `lotbot ingest <url> <category>` populates the store and exits; the
    // chat process itself never scrapes.
    let args: Vec<String> = std::env::args().collect();
    if args.get(1).map(String::as_str) == Some("ingest") {
        let (Some(url), Some(category)) = (args.get(2), args.get(3)) else {
            anyhow::bail!("usage: lotbot ingest <url> <category>");
        };
        let ids = offers::ingest::ingest_listing_page(&store, url, category).await?;
        println!("Ingested {} offer(s) from {}", ids.len(), url);
        for category in store.categories().await? {
            let count = store.list_by_category(&category).await?.len();
            println!("  {}: {} offer(s)", category, count);
        }
        return Ok(());
    }

    let secret = dotenv::var("SECRET_KEY").expect("SECRET_KEY required");

    if store.all().await?.is_empty() {
        let seeded = offers::ingest::seed_demo_offers(&store).await?;
        warn!(seeded, "offer store was empty; demo specials installed");
    }

    // Init LLM client
    let llm_client = Arc::new(LlmClient::from_env()?);
    info!("LLM client initialized");

    let app = AppState::new(store, llm_client, &secret);

    println!("Stevens Creek Chevrolet Voice Assistant");
    println!("Type a question, `:listen` to speak (needs STT_CMD), or `exit` to quit.");
    println!();
    println!("assistant> Hi! How can I help you today?");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        prompt("you> ").await?;
        let Some(line) = lines.next_line().await? else {
            break;
        };
        let input = line.trim().to_string();

        if input.is_empty() {
            continue;
        }
        if matches!(input.to_lowercase().as_str(), "exit" | "quit") {
            break;
        }

        let query = if input == ":listen" {
            match capture_voice(&app).await {
                Some(text) => text,
                None => continue,
            }
        } else {
            input
        };

        if let Some(agent_type) = assistant::booking_intent(&query) {
            if let Err(e) = run_booking_flow(&app, agent_type, &mut lines).await {
                error!("booking flow failed: {:#}", e);
                println!("assistant> {}", assistant::APOLOGY);
            }
            continue;
        }

        let reply = app.assistant.chat_reply(&query).await;
        println!("assistant> {}", reply);
        speak(&app, &reply).await;
    }

    info!("chat loop ended");
    Ok(())
}

/// Capture one utterance via the configured recognizer. Sentinel transcripts
/// short-circuit here with a fixed reply instead of being sent onward.
async fn capture_voice(app: &AppState) -> Option<String> {
    let Some(cmd) = &app.stt_cmd else {
        println!("assistant> Voice capture is not configured (set STT_CMD).");
        return None;
    };

    match speech::recognize_command(cmd).await {
        Ok(Transcript::Recognized(text)) => {
            println!("you (voice)> {}", text);
            Some(text)
        }
        Ok(Transcript::Unintelligible) => {
            println!("assistant> {}", speech::UNINTELLIGIBLE);
            None
        }
        Ok(Transcript::ServiceUnavailable) => {
            println!("assistant> {}", speech::SERVICE_UNAVAILABLE);
            None
        }
        Err(e) => {
            error!("recognizer failed: {:#}", e);
            println!("assistant> {}", speech::SERVICE_UNAVAILABLE);
            None
        }
    }
}

/// Interactive booking: ask for the agent, issue a session for this caller,
/// show that agent's openings, and book the first one with the issued token.
async fn run_booking_flow(
    app: &AppState,
    agent_type: AgentType,
    lines: &mut tokio::io::Lines<BufReader<tokio::io::Stdin>>,
) -> Result<()> {
    let roster = {
        let calendar = app.calendar.read().await;
        calendar.roster(agent_type)
    };
    println!(
        "assistant> Happy to set that up. Our {} team: {}",
        agent_type,
        roster.join(", ")
    );
    prompt("agent name> ").await?;

    let Some(line) = lines.next_line().await? else {
        return Ok(());
    };
    let agent_name = line.trim().to_string();
    if agent_name.is_empty() {
        println!("assistant> No agent name given, cancelling the booking.");
        return Ok(());
    }

    let now = Local::now().naive_local();
    let token = app.session_key.create_session(&agent_name, now);

    let slots = {
        let calendar = app.calendar.read().await;
        calendar.availability(agent_type, &agent_name, now)
    };
    if slots.is_empty() {
        println!(
            "assistant> No open slots for {} in the next few hours.",
            agent_name
        );
        return Ok(());
    }
    println!("assistant> Next openings for {}: {}", agent_name, slots.join(", "));

    let outcome = {
        let mut calendar = app.calendar.write().await;
        book_appointment(
            &app.session_key,
            &token,
            &mut calendar,
            agent_type,
            &agent_name,
            &slots[0],
            now,
        )
    };
    println!("assistant> {}", outcome);
    speak(app, &outcome.to_string()).await;
    Ok(())
}

async fn speak(app: &AppState, text: &str) {
    if let Some(cmd) = &app.tts_cmd {
        if let Err(e) = speech::speak_command(cmd, text).await {
            error!("speech synthesis failed: {:#}", e);
        }
    }
}

async fn prompt(label: &str) -> Result<()> {
    let mut stdout = tokio::io::stdout();
    stdout.write_all(label.as_bytes()).await?;
    stdout.flush().await?;
    Ok(())
}
