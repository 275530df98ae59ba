//! Chat turn building blocks: prompt assembly, response parsing, and the completion adapter.

pub mod client;
pub mod prompt;
pub mod response;

pub use client::{ChatClient, OllamaChatClient, OpenAiChatClient, build_chat_client};
pub use prompt::{METADATA_PREFIX, build_prompt};
pub use response::{ChatReply, MetadataMapping, parse_response};
