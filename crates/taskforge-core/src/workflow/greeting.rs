//! Greeting short-circuit (spec §4.5, plan node step 1): a normalized task
//! description that is short and matches a language-neutral greeting
//! pattern terminates the task with a canned reply in zero iterations,
//! bypassing the LLM entirely.

const MAX_GREETING_LEN: usize = 20;

const ENGLISH_GREETING_TOKENS: &[&str] = &["hi", "hello", "hey", "yo", "sup"];
const ENGLISH_ACK_TOKENS: &[&str] = &["thanks", "thank", "thx", "ty", "ok", "okay", "cool", "great"];
const KOREAN_GREETING_TOKENS: &[&str] = &["안녕", "안녕하세요", "반가워", "반갑습니다"];
const KOREAN_ACK_TOKENS: &[&str] = &["고마워", "감사합니다", "감사해요", "넵", "네"];

pub const CANNED_GREETING_REPLY: &str = "Hello! How can I help you today?";

fn normalize(description: &str) -> String {
    description.trim().to_lowercase()
}

/// Whole-token match: a greeting embedded inside a longer sentence does
/// not count, only the description being *just* a greeting.
fn matches_whole_token(normalized: &str, tokens: &[&str]) -> bool {
    let stripped: String = normalized.chars().filter(|c| !c.is_ascii_punctuation()).collect();
    let trimmed = stripped.trim();
    tokens.iter().any(|t| trimmed == *t)
}

pub fn is_greeting(description: &str) -> bool {
    let normalized = normalize(description);
    if normalized.chars().count() > MAX_GREETING_LEN {
        return false;
    }
    if normalized.is_empty() {
        return false;
    }
    matches_whole_token(&normalized, ENGLISH_GREETING_TOKENS)
        || matches_whole_token(&normalized, ENGLISH_ACK_TOKENS)
        || KOREAN_GREETING_TOKENS.iter().any(|t| normalized.contains(t))
        || KOREAN_ACK_TOKENS.iter().any(|t| normalized.contains(t))
}
