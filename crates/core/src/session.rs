use crate::models::SourceRef;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

/// One displayed turn. Held only for the session's lifetime; never
/// persisted and never fed back into the model as history.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationTurn {
    pub id: Uuid,
    pub role: Role,
    pub content: String,
    pub sources: Vec<SourceRef>,
}

/// Explicitly passed session state, created per user session and dropped
/// with it. A failed answer generation appends nothing here.
#[derive(Debug, Default)]
pub struct SessionContext {
    turns: Vec<ConversationTurn>,
}

impl SessionContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_user(&mut self, content: impl Into<String>) {
        self.turns.push(ConversationTurn {
            id: Uuid::new_v4(),
            role: Role::User,
            content: content.into(),
            sources: Vec::new(),
        });
    }

    pub fn push_assistant(&mut self, content: impl Into<String>, sources: Vec<SourceRef>) {
        self.turns.push(ConversationTurn {
            id: Uuid::new_v4(),
            role: Role::Assistant,
            content: content.into(),
            sources,
        });
    }

    pub fn turns(&self) -> &[ConversationTurn] {
        &self.turns
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::{Role, SessionContext};
    use crate::models::SourceRef;

    #[test]
    fn turns_accumulate_in_order() {
        let mut session = SessionContext::new();
        session.push_user("What is the refund policy?");
        session.push_assistant(
            "30 days",
            vec![SourceRef {
                document: "policy.pdf".to_string(),
                page: Some(2),
                excerpt: "refunds within 30 days".to_string(),
            }],
        );

        assert_eq!(session.len(), 2);
        assert_eq!(session.turns()[0].role, Role::User);
        assert_eq!(session.turns()[1].role, Role::Assistant);
        assert_eq!(session.turns()[1].sources.len(), 1);
    }
}
