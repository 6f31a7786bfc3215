//! Small convenience constructors for common types.

use crate::{ConversationId, Message, TurnRequest};

pub fn system_message(content: impl Into<String>) -> Message {
    Message::system(content)
}

pub fn user_message(content: impl Into<String>) -> Message {
    Message::user(content)
}

pub fn assistant_message(content: impl Into<String>) -> Message {
    Message::assistant(content)
}

pub fn tool_message(tool_call_id: impl Into<String>, content: impl Into<String>) -> Message {
    Message::tool(tool_call_id, content)
}

pub fn turn(model: impl Into<String>, user_input: impl Into<String>) -> TurnRequest {
    TurnRequest::new(model, user_input)
}

pub fn linked_turn(
    model: impl Into<String>,
    user_input: impl Into<String>,
    conversation_id: impl Into<ConversationId>,
) -> TurnRequest {
    TurnRequest::new(model, user_input).with_conversation_id(conversation_id)
}

#[cfg(test)]
mod tests {
    use crate::Role;

    use super::{linked_turn, tool_message, turn, user_message};

    #[test]
    fn message_helpers_apply_expected_roles() {
        let message = user_message("hello");
        assert_eq!(message.role, Role::User);

        let tool = tool_message("call_1", "{\"codes\":[]}");
        assert_eq!(tool.role, Role::Tool);
        assert_eq!(tool.tool_call_id.as_deref(), Some("call_1"));
    }

    #[test]
    fn turn_helpers_set_linkage_only_when_asked() {
        let plain = turn("gpt-4o-mini", "hello");
        assert!(plain.conversation_id.is_none());

        let linked = linked_turn("gpt-4o-mini", "hello", "garage-1");
        assert_eq!(
            linked.conversation_id.map(|id| id.to_string()),
            Some("garage-1".to_string())
        );
    }
}
