use std::sync::Arc;
use tokio::sync::RwLock;

use crate::assistant::Assistant;
use crate::booking::session::SessionKey;
use crate::booking::Calendar;
use crate::llm::LlmClient;
use crate::offers::OfferStore;

pub struct AppState {
    pub assistant: Assistant,
    /// The only mutable state in the process. One interaction runs at a
    /// time, but booking still takes the write lock so the append stays
    /// exclusive if the loop is ever driven concurrently.
    pub calendar: RwLock<Calendar>,
    pub session_key: SessionKey,
    /// Synthesizer shell command; replies are spoken when set.
    pub tts_cmd: Option<String>,
    /// Recognizer shell command; `:listen` works when set.
    pub stt_cmd: Option<String>,
}

impl AppState {
    pub fn new(store: Arc<OfferStore>, llm: Arc<LlmClient>, secret: &str) -> Self {
        let assistant = Assistant::new(store, llm);
        Self {
            assistant,
            calendar: RwLock::new(Calendar::with_demo_roster()),
            session_key: SessionKey::from_secret(secret),
            tts_cmd: dotenv::var("TTS_CMD").ok().filter(|s| !s.is_empty()),
            stt_cmd: dotenv::var("STT_CMD").ok().filter(|s| !s.is_empty()),
        }
    }
}
