// ReturnBot Engine — Message Relay
// handle_event, handle_customer_message, handle_owner_message
//
// The dispatch path for every inbound message: owner numbers go to the
// command parser, customers go through the transcript → Gemini → reply
// loop, with the confirmation trigger relaying a summary to the owner.

use crate::engine::owners;
use crate::engine::state::RelayState;
use crate::engine::triggers::{self, OwnerAction};
use crate::engine::types::{Inbound, Part, Turn};
use crate::engine::whatsapp::payload::InboundEvent;
use base64::Engine as _;
use log::{error, info, warn};
use std::sync::atomic::Ordering;
use std::sync::Arc;

// ── Persona & canned lines ─────────────────────────────────────────────

/// System persona for every completion call: a polite, Hindi-first retail
/// returns agent walking the customer through the return/refund/exchange
/// flow (order verification, problem triage, proof photos, resolution).
pub const SYSTEM_PROMPT: &str = "\
आप ReturnBot हैं - एक उच्च स्तरीय, अत्यंत विनम्र, प्रोफेशनल और समझदार AI कस्टमर सर्विस एजेंट।
सभी जवाब हिंदी में दें (जब तक यूजर अंग्रेजी में स्पष्ट रूप से न मांगे)।
टोन हमेशा: सहानुभूतिपूर्ण, स्पष्ट, धैर्यवान और सम्मानजनक। कभी भी अनौपचारिक या जल्दबाजी न करें।

रिटर्न/रिफंड/एक्सचेंज प्रक्रिया का क्रम (हर बार सोच-समझकर फॉलो करें, ग्राहक की बातों को ध्यान से सुनें):
1. स्वागत करें और पुष्टि करें कि वे रिटर्न/रिफंड/एक्सचेंज के लिए संपर्क कर रहे हैं।
2. ऑर्डर डिटेल्स वेरिफाई करें: ऑर्डर आईडी, नाम, खरीदारी की तारीख, मोबाइल नंबर पूछें। (सिमुलेटेड वैरिफिकेशन: मान लें वैध है यदि प्रदान किया गया।)
3. समस्या समझें: प्रोडक्ट में ठीक क्या कमी/खराबी है, कब से है, कैसे पता चला। ग्राहक की हर बात ध्यान से सुनें और सहानुभूति दिखाएं।
4. प्रूफ मांगें: \"कृपया समस्या की 2-3 स्पष्ट तस्वीरें भेजें (खराब हिस्से की क्लोज-अप, पैकेजिंग आदि)\"। यदि तस्वीरें भेजी गईं, तो उन्हें एनालाइज करें और फीडबैक दें।
5. समाधान सुझाएं आधारित समस्या पर:
   - यदि रिफंड मांगा: कारण सुनें, पुष्टि करें, और प्रोसेस बताएं (जैसे: \"रिफंड 3-5 दिनों में आपके अकाउंट में क्रेडिट होगा\")।
   - यदि एक्सचेंज/रिप्लेसमेंट: उपलब्ध विकल्प बताएं (जैसे: नया साइज़/कलर), पुष्टि लें, और निर्देश दें।
   - अन्य: यदि समस्या छोटी है, तो फिक्सिंग टिप्स दें।
6. अंतिम पुष्टि लें, अगले कदम बताएं (जैसे: रिटर्न लेबल, ट्रैकिंग)।
7. धन्यवाद देकर बात समाप्त करें, और यदि जरूरी तो ह्यूमन सपोर्ट सुझाएं।

पिछले संदेश याद रखें। दोहराव न करें। अस्पष्ट होने पर विनम्रता से स्पष्ट करें। तस्वीर एनालिसिस: यदि इमेज हो, तो डिफेक्ट चेक करें और रिस्पॉन्स में शामिल करें।";

/// Stock text attached to an uncaptioned photo before the provider call.
const IMAGE_ANALYSIS_PROMPT: &str =
    "ग्राहक ने यह तस्वीर भेजी है, कृपया जांच करें और उचित उत्तर दें।";

/// Best-effort apology when the provider call fails mid-conversation.
const MODEL_FAILURE_APOLOGY: &str =
    "माफ़ कीजिए, अभी तकनीकी समस्या आ रही है। कृपया थोड़ी देर बाद दोबारा प्रयास करें।";

const APPROVED_NOTICE: &str = "\
✅ आपका रिटर्न/रिफंड अनुरोध स्वीकार कर लिया गया है।\n\
अगले कदमों की जानकारी आपको जल्द ही भेजी जाएगी। धन्यवाद!";

const REJECTED_NOTICE: &str = "\
❌ माफ़ कीजिए, आपका रिटर्न/रिफंड अनुरोध स्वीकार नहीं किया जा सका।\n\
अधिक जानकारी के लिए कृपया स्टोर से संपर्क करें।";

const OWNER_USAGE_HINT: &str =
    "Commands: `approve <customer number>` or `reject <customer number>`";

/// How many transcript turns the owner summary quotes.
const SUMMARY_TAIL_TURNS: usize = 6;

// ── Dispatch ───────────────────────────────────────────────────────────

/// Entry point for one extracted webhook message. Never returns an error —
/// failures are logged and end this message's handling only.
pub async fn handle_event(state: Arc<RelayState>, event: InboundEvent) {
    let owner = owners::resolve_owner(&state, &event.phone_number_id).await;

    if owner.as_deref() == Some(event.message.from()) {
        handle_owner_message(&state, &event.message).await;
    } else {
        handle_customer_message(&state, &event.message, owner.as_deref()).await;
    }
}

// ── Customer path ──────────────────────────────────────────────────────

async fn handle_customer_message(state: &RelayState, message: &Inbound, owner: Option<&str>) {
    let from = message.from().to_string();
    state.message_count.fetch_add(1, Ordering::Relaxed);

    // Confirmation is checked on what the customer typed, before the turn
    // is consumed by the provider call.
    let typed_text = match message {
        Inbound::Text { body, .. } => body.clone(),
        Inbound::Image { caption, .. } => caption.clone().unwrap_or_default(),
    };
    let confirmed = triggers::detects_confirmation(&typed_text);

    let parts = match message {
        Inbound::Text { body, .. } => {
            info!("[relay] text from {}: {} chars", from, body.len());
            vec![Part::text(body.clone())]
        }
        Inbound::Image { media_id, caption, .. } => {
            info!("[relay] image from {} (media {})", from, media_id);
            let (mime_type, bytes) = match state.whatsapp.fetch_media(media_id).await {
                Ok(media) => media,
                Err(e) => {
                    error!("[relay] media fetch for {}: {}", from, e);
                    let _ = state.whatsapp.send_text(&from, MODEL_FAILURE_APOLOGY).await;
                    return;
                }
            };
            let data_b64 = base64::engine::general_purpose::STANDARD.encode(&bytes);
            vec![
                Part::text(caption.clone().unwrap_or_else(|| IMAGE_ANALYSIS_PROMPT.into())),
                Part::InlineImage { mime_type, data_b64 },
            ]
        }
    };

    let history = state.conversations.push(&from, Turn::user(parts));

    let reply = match state.gemini.generate(SYSTEM_PROMPT, &history).await {
        Ok(reply) => reply,
        Err(e) => {
            error!("[relay] provider call for {}: {}", from, e);
            let _ = state.whatsapp.send_text(&from, MODEL_FAILURE_APOLOGY).await;
            return;
        }
    };

    state.conversations.push(&from, Turn::model(&reply));

    if let Err(e) = state.whatsapp.send_text(&from, &reply).await {
        error!("[relay] reply send to {}: {}", from, e);
        return;
    }

    if confirmed {
        relay_summary_to_owner(state, owner, &from).await;
    }
}

/// Send the owner a transcript summary after the customer confirms.
async fn relay_summary_to_owner(state: &RelayState, owner: Option<&str>, customer: &str) {
    let Some(owner) = owner else {
        warn!("[relay] confirmation from {} but no owner resolved — skipping relay", customer);
        return;
    };

    let tail = state.conversations.tail(customer, SUMMARY_TAIL_TURNS);
    let summary = compose_owner_summary(customer, &tail);

    info!("[relay] confirmation from {} — relaying summary to owner", customer);
    if let Err(e) = state.whatsapp.send_text(owner, &summary).await {
        error!("[relay] owner relay failed: {}", e);
    }
}

/// The message the owner receives: customer id, transcript tail, and the
/// expected reply format.
fn compose_owner_summary(customer: &str, tail: &[Turn]) -> String {
    use crate::engine::types::Role;

    let mut lines = vec![format!("🔔 Return confirmed by {}", customer), String::new()];
    for turn in tail {
        let speaker = match turn.role {
            Role::User => "ग्राहक",
            Role::Model => "बॉट",
        };
        let text = turn.as_text();
        if text.is_empty() {
            continue; // image-only turn
        }
        lines.push(format!("[{}] {}: {}", turn.at.format("%H:%M"), speaker, text));
    }
    lines.push(String::new());
    lines.push(format!("Reply `approve {}` or `reject {}`.", customer, customer));
    lines.join("\n")
}

// ── Owner path ─────────────────────────────────────────────────────────

async fn handle_owner_message(state: &RelayState, message: &Inbound) {
    let owner = message.from().to_string();

    let body = match message {
        Inbound::Text { body, .. } => body.clone(),
        Inbound::Image { .. } => {
            let _ = state.whatsapp.send_text(&owner, OWNER_USAGE_HINT).await;
            return;
        }
    };

    let Some(command) = triggers::parse_owner_command(&body) else {
        info!("[relay] owner message is not a command");
        let _ = state.whatsapp.send_text(&owner, OWNER_USAGE_HINT).await;
        return;
    };

    let (notice, verb) = match command.action {
        OwnerAction::Approve => (APPROVED_NOTICE, "approved"),
        OwnerAction::Reject => (REJECTED_NOTICE, "rejected"),
    };

    info!("[relay] owner {} request for {}", verb, command.customer);

    if let Err(e) = state.whatsapp.send_text(&command.customer, notice).await {
        error!("[relay] outcome notice to {}: {}", command.customer, e);
        let _ = state
            .whatsapp
            .send_text(&owner, &format!("Could not notify {}: {}", command.customer, e))
            .await;
        return;
    }

    let ack = format!("Done — {} {}.", command.customer, verb);
    if let Err(e) = state.whatsapp.send_text(&owner, &ack).await {
        error!("[relay] owner ack: {}", e);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::types::{Part, Turn};

    #[test]
    fn owner_summary_names_customer_and_reply_format() {
        let tail = vec![
            Turn::user(vec![Part::text("रिफंड चाहिए")]),
            Turn::model("ज़रूर, ऑर्डर आईडी बताइए"),
        ];
        let summary = compose_owner_summary("911234567890", &tail);
        assert!(summary.contains("911234567890"));
        assert!(summary.contains("approve 911234567890"));
        assert!(summary.contains("reject 911234567890"));
        assert!(summary.contains("ग्राहक: रिफंड चाहिए"));
        assert!(summary.contains("बॉट: ज़रूर, ऑर्डर आईडी बताइए"));
    }

    #[test]
    fn owner_summary_skips_image_only_turns() {
        let tail = vec![Turn::user(vec![Part::InlineImage {
            mime_type: "image/jpeg".into(),
            data_b64: "QUJD".into(),
        }])];
        let summary = compose_owner_summary("911234567890", &tail);
        assert!(!summary.contains("ग्राहक:"));
    }
}
