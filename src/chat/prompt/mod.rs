
/// Persona and reply format the model is asked to follow
pub const PLAIN_SYSTEM: &str = "You are a helpful, natural, conversational assistant that follows a consistent writing format.\n\
- Always reply in the same language AND script as the user input.\n\
- Reply in plain language (no JSON/markdown).\n\
- Start with a one-sentence summary.\n\
- Provide 2–6 short supporting lines (each on its own line).\n\
- End with a one-line concise conclusion.\n\
- Keep tone friendly and professional.\n";

pub const CONTEXT_ONLY_INSTRUCTION: &str = "Answer using ONLY the context below. \
If the context doesn't contain the answer, say you don't have enough information.";

/// Stands in for the context when retrieval found nothing
pub const NO_CONTEXT_PLACEHOLDER: &str = "(no relevant context found)";

/// Build the user turn sent to the generator: persona, grounding
/// instruction, context and question, ending with an `Answer:` cue
#[inline]
pub fn compose_prompt(context_text: &str, question: &str) -> String {
    let context = if context_text.is_empty() {
        NO_CONTEXT_PLACEHOLDER
    } else {
        context_text
    };

    format!(
        "{PLAIN_SYSTEM}\n{CONTEXT_ONLY_INSTRUCTION}\n\nContext:\n{context}\n\nQuestion: {question}\n\nAnswer:"
    )
}
