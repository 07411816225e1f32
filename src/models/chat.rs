use serde::{ Serialize, Deserialize };

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
    System,
}

/// One turn of a conversation. The wire format is the OpenAI-style
/// `{"role": "...", "content": "..."}` pair used both on the relay's
/// public endpoint and on the provider request.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn user(content: impl Into<String>) -> Self {
        Self { role: Role::User, content: content.into() }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self { role: Role::Assistant, content: content.into() }
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self { role: Role::System, content: content.into() }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roles_serialize_lowercase() {
        let msg = ChatMessage::assistant("hi");
        let json = serde_json::to_string(&msg).unwrap();
        assert_eq!(json, r#"{"role":"assistant","content":"hi"}"#);
    }

    #[test]
    fn conversation_round_trips_as_array() {
        let body = r#"[{"role":"user","content":"hello"},{"role":"assistant","content":"hey"}]"#;
        let messages: Vec<ChatMessage> = serde_json::from_str(body).unwrap();
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].role, Role::User);
        assert_eq!(messages[1], ChatMessage::assistant("hey"));
    }

    #[test]
    fn object_body_is_not_a_conversation() {
        let body = r#"{"role":"user","content":"hello"}"#;
        assert!(serde_json::from_str::<Vec<ChatMessage>>(body).is_err());
    }

    #[test]
    fn unknown_role_is_rejected() {
        let body = r#"[{"role":"wizard","content":"abracadabra"}]"#;
        assert!(serde_json::from_str::<Vec<ChatMessage>>(body).is_err());
    }
}
