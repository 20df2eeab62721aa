// ReturnBot Engine — Shared State
// Canonical home for RelayState: config plus the long-lived clients and the
// conversation store, shared across request handlers behind an Arc.

use crate::engine::config::Config;
use crate::engine::conversations::ConversationStore;
use crate::engine::providers::GeminiClient;
use crate::engine::whatsapp::CloudApi;
use std::sync::atomic::AtomicI64;

pub struct RelayState {
    pub config: Config,
    pub gemini: GeminiClient,
    pub whatsapp: CloudApi,
    pub conversations: ConversationStore,
    /// Inbound customer messages handled since startup.
    pub message_count: AtomicI64,
}

impl RelayState {
    pub fn new(config: Config) -> Self {
        RelayState {
            gemini: GeminiClient::new(&config),
            whatsapp: CloudApi::new(&config),
            conversations: ConversationStore::new(),
            message_count: AtomicI64::new(0),
            config,
        }
    }
}
