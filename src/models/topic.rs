use serde::{Deserialize, Serialize};
use std::fmt;

/// Source discriminator for fan-out.
///
/// One physical channel per scope multiplexes several logical streams;
/// handler sets in the registry are keyed by this discriminator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Topic {
    /// Chat message rows.
    Messages,
    /// Conversation rows (folder contents included).
    Conversations,
    /// Folder document rows.
    Documents,
    /// Voice pipeline notifications.
    Voice,
    /// Generated image notifications.
    Images,
    /// Assistant activity notifications.
    Assistant,
    /// Anything we could not classify; kept for diagnostics.
    Unknown,
}

impl Topic {
    /// Map a provider source string onto the closed set.
    pub(crate) fn from_wire(source: &str) -> Self {
        match source {
            "messages" => Topic::Messages,
            "conversations" => Topic::Conversations,
            "folder_documents" | "documents" => Topic::Documents,
            "voice" => Topic::Voice,
            "images" => Topic::Images,
            "assistant" => Topic::Assistant,
            _ => Topic::Unknown,
        }
    }
}

impl fmt::Display for Topic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Topic::Messages => "messages",
            Topic::Conversations => "conversations",
            Topic::Documents => "documents",
            Topic::Voice => "voice",
            Topic::Images => "images",
            Topic::Assistant => "assistant",
            Topic::Unknown => "unknown",
        };
        write!(f, "{}", name)
    }
}
