//! Prompt assembly for chat turns.
//!
//! The composed prompt always carries, in order: the persona framing, the metadata-line
//! instruction, the user's utterance, and (only when documents are stored) the context block
//! fenced off as reference material from the user's files.

/// Prefix of the single metadata line the model is asked to end its reply with.
pub const METADATA_PREFIX: &str = "META:";

const PERSONA: &str = "You are a warm, attentive companion. Answer the way a thoughtful \
person talks: concise, natural, and specific. Do not repeat yourself, do not restate the \
question, and avoid lists or headings unless the user asks for them.";

const METADATA_INSTRUCTION: &str = "After your reply, end the response with exactly one \
final line of the form\nMETA: {\"emotion\": \"<single word>\", \"tone\": \"<single word>\"}\n\
The META line must hold a single-line JSON object, must be the last line, and must not be \
mentioned anywhere else in the reply.";

const CONTEXT_HEADER: &str = "Context from user files (reference material the user uploaded; \
it is not part of their question):";

/// Compose the prompt sent to the chat completion service.
pub fn build_prompt(utterance: &str, context: &str) -> String {
    let mut prompt = String::with_capacity(
        PERSONA.len() + METADATA_INSTRUCTION.len() + utterance.len() + context.len() + 128,
    );
    prompt.push_str(PERSONA);
    prompt.push_str("\n\n");
    prompt.push_str(METADATA_INSTRUCTION);
    prompt.push_str("\n\nUser message:\n");
    prompt.push_str(utterance);

    if !context.is_empty() {
        prompt.push_str("\n\n");
        prompt.push_str(CONTEXT_HEADER);
        prompt.push_str("\n<<<\n");
        prompt.push_str(context);
        prompt.push_str("\n>>>");
    }

    prompt
}
