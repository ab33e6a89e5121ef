use std::sync::Arc;

use tracing::{error, info};

use crate::booking::AgentType;
use crate::llm::{LlmClient, Message};
use crate::offers::OfferStore;

/// Persona preamble; the retrieval block for the current query is appended
/// before each chat call.
const SYSTEM_PROMPT: &str = "You are a friendly and empathetic Chevrolet dealership assistant. \
You provide helpful, accurate answers about vehicles, services, promotions, and offers. \
Always maintain a warm, professional tone. \
If the user expresses concerns (e.g., car trouble), provide empathetic reassurance and suggest next steps. \
Gently recommend dealership services or booking an appointment when appropriate. \
Current dealership specials and offers are available below:\n\n";

/// Shown whenever the upstream chat call fails, whatever the reason.
pub const APOLOGY: &str = "Sorry, something went wrong while processing your request.";

/// Detect a booking request and pick the pool it targets. Anything that
/// mentions booking or scheduling goes to Service when the word "service"
/// appears, otherwise to Sales.
pub fn booking_intent(query: &str) -> Option<AgentType> {
    let lower = query.to_lowercase();
    let wants_booking =
        lower.contains("book") || lower.contains("booking") || lower.contains("schedule");
    if !wants_booking {
        return None;
    }
    if lower.contains("service") {
        Some(AgentType::Service)
    } else {
        Some(AgentType::Sales)
    }
}

pub struct Assistant {
    store: Arc<OfferStore>,
    llm: Arc<LlmClient>,
}

impl Assistant {
    pub fn new(store: Arc<OfferStore>, llm: Arc<LlmClient>) -> Self {
        Self { store, llm }
    }

    /// Retrieval-augmented chat turn. Every failure past this point — store
    /// scan, HTTP, response shape — is logged and collapses into the fixed
    /// apology; nothing propagates to the chat loop.
    pub async fn chat_reply(&self, query: &str) -> String {
        match self.try_chat(query).await {
            Ok(reply) => reply,
            Err(e) => {
                error!("chat turn failed: {:#}", e);
                APOLOGY.to_string()
            }
        }
    }

    async fn try_chat(&self, query: &str) -> anyhow::Result<String> {
        let context = self.store.search_default(query).await?;
        info!(query, context_len = context.len(), "retrieval complete");

        let messages = [
            Message::system(format!("{}{}", SYSTEM_PROMPT, context)),
            Message::user(query),
        ];
        let reply = self.llm.chat(&messages).await?;
        info!(reply_len = reply.len(), "chat reply received");
        Ok(reply)
    }
}
