// ReturnBot Engine — AI Providers
// One provider today: Google Gemini. The relay only ever needs a single
// text-in/text-out completion per inbound message.

pub mod gemini;

pub use gemini::GeminiClient;
