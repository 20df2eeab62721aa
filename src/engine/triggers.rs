// ReturnBot Engine — Keyword Triggers
// Confirmation detection (customer side) and the approve/reject command
// parser (owner side).

// ── Confirmation detection ─────────────────────────────────────────────

/// Words a customer uses to confirm a return/refund/exchange, in English
/// and Hindi. Matched as case-insensitive substrings of the message.
const CONFIRMATION_KEYWORDS: &[&str] = &[
    // English
    "confirm",
    "i agree",
    "yes, proceed",
    "go ahead",
    // Hindi
    "कन्फर्म",
    "पक्का कर",
    "हाँ, कर द",
    "आगे बढ़",
    "मंज़ूर",
];

/// Whether the customer's message contains a configured confirmation word.
pub fn detects_confirmation(text: &str) -> bool {
    let lower = text.to_lowercase();
    CONFIRMATION_KEYWORDS.iter().any(|kw| lower.contains(kw))
}

// ── Owner commands ─────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub enum OwnerAction {
    Approve,
    Reject,
}

/// A parsed owner command: the action plus the customer wa_id it targets.
#[derive(Debug, Clone, PartialEq)]
pub struct OwnerCommand {
    pub action: OwnerAction,
    pub customer: String,
}

/// Parse an owner message as a command.
///
/// Only a well-formed two-token message is a command: the verb `approve` or
/// `reject` (case-insensitive) followed by the customer wa_id. Anything
/// else returns None and the caller replies with a usage hint.
pub fn parse_owner_command(text: &str) -> Option<OwnerCommand> {
    let mut tokens = text.split_whitespace();
    let verb = tokens.next()?;
    let customer = tokens.next()?;
    if tokens.next().is_some() {
        return None;
    }

    let action = match verb.to_lowercase().as_str() {
        "approve" => OwnerAction::Approve,
        "reject" => OwnerAction::Reject,
        _ => return None,
    };

    Some(OwnerCommand { action, customer: customer.to_string() })
}
