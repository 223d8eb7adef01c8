use super::topic::Topic;
use serde::{Deserialize, Serialize};

/// Closed set of event types delivered by the broadcast layer.
///
/// Wire strings are kebab-case (`message-insert`, `voice-tts-ready`).
/// Folder channels additionally deliver bare row changes as
/// `INSERT`/`UPDATE`/`DELETE` plus a table discriminator; those are folded
/// into the same set during decode so downstream dispatch is a match over
/// a closed enum rather than string comparisons.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum EventKind {
    MessageInsert,
    MessageUpdate,
    ConversationInsert,
    ConversationUpdate,
    ConversationDelete,
    DocumentInsert,
    DocumentUpdate,
    DocumentDelete,
    VoiceTtsReady,
    VoiceThinking,
    AssistantThinking,
    ImageInsert,
    ImageUpdate,
    /// Unrecognized event type; payload retained for diagnostics.
    Unknown,
}

impl EventKind {
    /// Decode a provider event string, using `topic` to resolve the bare
    /// row-change forms.
    pub(crate) fn from_wire(event: &str, topic: Topic) -> Self {
        match event {
            "message-insert" => EventKind::MessageInsert,
            "message-update" => EventKind::MessageUpdate,
            "conversation-insert" => EventKind::ConversationInsert,
            "conversation-update" => EventKind::ConversationUpdate,
            "conversation-delete" => EventKind::ConversationDelete,
            "document-insert" => EventKind::DocumentInsert,
            "document-update" => EventKind::DocumentUpdate,
            "document-delete" => EventKind::DocumentDelete,
            "voice-tts-ready" => EventKind::VoiceTtsReady,
            "voice-thinking" => EventKind::VoiceThinking,
            "assistant-thinking" => EventKind::AssistantThinking,
            "image-insert" => EventKind::ImageInsert,
            "image-update" => EventKind::ImageUpdate,
            "INSERT" => match topic {
                Topic::Conversations => EventKind::ConversationInsert,
                Topic::Documents => EventKind::DocumentInsert,
                Topic::Messages => EventKind::MessageInsert,
                _ => EventKind::Unknown,
            },
            "UPDATE" => match topic {
                Topic::Conversations => EventKind::ConversationUpdate,
                Topic::Documents => EventKind::DocumentUpdate,
                Topic::Messages => EventKind::MessageUpdate,
                _ => EventKind::Unknown,
            },
            "DELETE" => match topic {
                Topic::Conversations => EventKind::ConversationDelete,
                Topic::Documents => EventKind::DocumentDelete,
                _ => EventKind::Unknown,
            },
            _ => EventKind::Unknown,
        }
    }

    /// The topic this kind belongs to.
    pub fn topic(&self) -> Topic {
        match self {
            EventKind::MessageInsert | EventKind::MessageUpdate => Topic::Messages,
            EventKind::ConversationInsert
            | EventKind::ConversationUpdate
            | EventKind::ConversationDelete => Topic::Conversations,
            EventKind::DocumentInsert
            | EventKind::DocumentUpdate
            | EventKind::DocumentDelete => Topic::Documents,
            EventKind::VoiceTtsReady | EventKind::VoiceThinking => Topic::Voice,
            EventKind::AssistantThinking => Topic::Assistant,
            EventKind::ImageInsert | EventKind::ImageUpdate => Topic::Images,
            EventKind::Unknown => Topic::Unknown,
        }
    }
}
