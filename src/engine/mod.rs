// ReturnBot Engine — WhatsApp → Gemini relay runtime
// Webhook in, Cloud API out, one in-memory transcript per customer.

pub mod config;
pub mod conversations;
pub mod owners;
pub mod providers;
pub mod state;
pub mod triggers;
pub mod types;
pub mod whatsapp;
