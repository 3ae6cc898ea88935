
use fancy_regex::Regex;
use rand::Rng;
use rand::seq::IndexedRandom;
use std::sync::LazyLock;

static CHITCHAT_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(hi|hello|hey|yo|sup|good\s*morn(?:ing)?|good\s*even(?:ing)?|how\s*are\s*you)\b")
        .expect("valid regex")
});

/// Replies used when a message is recognised as smalltalk
pub const SMALLTALK_REPLIES: [&str; 4] = [
    "Hey! 👋 How can I help you today?",
    "Hello! 😊 What can I do for you?",
    "Hi there! Need ideas, steps, or a quick explanation?",
    "I’m here! Ask me anything — I’ll keep it tidy and structured.",
];

/// True when the text contains a greeting or similar small talk token
#[inline]
pub fn is_chitchat(text: &str) -> bool {
    CHITCHAT_REGEX.is_match(text).unwrap_or(false)
}

/// Pick one of the smalltalk replies uniformly at random
#[inline]
pub fn smalltalk_reply<R: Rng + ?Sized>(rng: &mut R) -> &'static str {
    SMALLTALK_REPLIES
        .choose(rng)
        .copied()
        .unwrap_or(SMALLTALK_REPLIES[0])
}
