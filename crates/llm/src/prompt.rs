//! Prompt building for speaking sessions
//!
//! Constructs the message list sent to the chat model: a scenario- and
//! level-aware system prompt, a rolling window of transcript history,
//! an optional grammar note, and the learner's new utterance.

use std::fmt;

use serde::{Deserialize, Serialize};

use speaktutor_core::{ConversationTurn, TurnRole};

use crate::grammar::GrammarHint;

/// Message role
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::System => write!(f, "system"),
            Role::User => write!(f, "user"),
            Role::Assistant => write!(f, "assistant"),
        }
    }
}

impl From<TurnRole> for Role {
    fn from(role: TurnRole) -> Self {
        match role {
            TurnRole::User => Role::User,
            TurnRole::Assistant => Role::Assistant,
        }
    }
}

/// Chat message
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

impl Message {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

/// Role description for a practice scenario. Unknown scenarios fall back
/// to open conversation so a stale client can never break a session.
fn scenario_role(scenario: &str) -> &'static str {
    match scenario {
        "restaurant" => {
            "a restaurant server taking a customer's order. Stay in character: \
             describe dishes, take the order, handle special requests."
        }
        "interview" => {
            "a job interviewer running a friendly practice interview. Ask one \
             interview question at a time and follow up on the answers."
        }
        "shopping" => {
            "a shop assistant helping a customer find what they need. Suggest \
             items, discuss sizes and prices, handle returns."
        }
        "travel" => {
            "a travel agent helping a customer plan a trip. Discuss \
             destinations, dates, budgets and bookings."
        }
        "doctor" => {
            "a doctor seeing a patient for a routine visit. Ask about \
             symptoms and give simple, reassuring advice."
        }
        _ => {
            "an English speaking practice partner having an open conversation. \
             Follow the learner's lead and keep the conversation flowing."
        }
    }
}

/// Build the session system prompt.
///
/// Computed once per session and cached on the session document; the
/// same prompt must be reused for every later turn so the model stays
/// consistent across the conversation.
pub fn build_system_prompt(
    scenario: &str,
    level: &str,
    is_initial: bool,
    assistant_name: &str,
) -> String {
    let mut prompt = format!(
        r#"You are {name}, {role}

## Communication Guidelines
- Speak naturally and conversationally, in English only
- Keep responses short (2-3 sentences) - they will be spoken aloud
- Ask one question at a time
- Encourage the learner to keep talking

## Learner Level
The learner's English level is {level} (CEFR). Match your vocabulary and
sentence complexity to that level."#,
        name = assistant_name,
        role = scenario_role(scenario),
        level = level,
    );

    if is_initial {
        prompt.push_str(
            "\n\n## Opening\nBegin by greeting the learner and introducing the scenario.",
        );
    }

    prompt
}

/// Prompt builder for a speaking turn
pub struct PromptBuilder {
    messages: Vec<Message>,
}

impl PromptBuilder {
    pub fn new() -> Self {
        Self {
            messages: Vec::new(),
        }
    }

    /// Add the (cached or freshly built) system prompt
    pub fn with_system_prompt(mut self, prompt: &str) -> Self {
        self.messages.push(Message::system(prompt));
        self
    }

    /// Add the most recent transcript turns, oldest first
    pub fn with_history(mut self, transcript: &[ConversationTurn], max_turns: usize) -> Self {
        let start = transcript.len().saturating_sub(max_turns);
        for turn in &transcript[start..] {
            self.messages.push(Message {
                role: turn.role.into(),
                content: turn.text.clone(),
            });
        }
        self
    }

    /// Add a system note listing detected grammar-error candidates
    pub fn with_grammar_note(mut self, hints: &[GrammarHint]) -> Self {
        if hints.is_empty() {
            return self;
        }

        let mut note =
            String::from("The learner may have made these grammar mistakes recently:\n");
        for hint in hints {
            note.push_str(&format!(
                "- \"{}\": {}\n",
                hint.pattern, hint.possible_error
            ));
        }
        note.push_str(
            "If one of them fits what the learner just said, gently correct it \
             before continuing the conversation.",
        );

        self.messages.push(Message::system(note));
        self
    }

    /// Add the learner's new utterance
    pub fn user_message(mut self, text: &str) -> Self {
        self.messages.push(Message::user(text));
        self
    }

    /// Build the final message list
    pub fn build(self) -> Vec<Message> {
        self.messages
    }
}

impl Default for PromptBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Fixed response templates
pub struct ResponseTemplates;

impl ResponseTemplates {
    /// Opening line for a free-conversation session. Spoken verbatim,
    /// bypassing the text generator entirely.
    pub fn free_conversation_greeting(assistant_name: &str, first_name: &str) -> String {
        format!(
            "Hi, {first_name}. I am {assistant_name}. I am your speaking \
             assistant today. What would you like to talk about?"
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_message_creation() {
        let msg = Message::user("Hello");
        assert_eq!(msg.role, Role::User);
        assert_eq!(msg.content, "Hello");
    }

    #[test]
    fn test_restaurant_prompt_names_the_role() {
        let prompt = build_system_prompt("restaurant", "B1", false, "Sarah");
        assert!(prompt.contains("restaurant server"));
        assert!(prompt.contains("B1"));
        assert!(prompt.contains("Sarah"));
    }

    #[test]
    fn test_unknown_scenario_falls_back_to_free_conversation() {
        let prompt = build_system_prompt("spacewalk", "A2", false, "Emma");
        assert!(prompt.contains("open conversation"));
    }

    #[test]
    fn test_initial_prompt_adds_opening_section() {
        let initial = build_system_prompt("free", "A1", true, "Sarah");
        let later = build_system_prompt("free", "A1", false, "Sarah");
        assert!(initial.contains("## Opening"));
        assert!(!later.contains("## Opening"));
    }

    #[test]
    fn test_history_window_keeps_most_recent_turns() {
        let transcript: Vec<ConversationTurn> = (0..20)
            .map(|i| {
                if i % 2 == 0 {
                    ConversationTurn::user(format!("u{i}"))
                } else {
                    ConversationTurn::assistant(format!("a{i}"))
                }
            })
            .collect();

        let messages = PromptBuilder::new()
            .with_system_prompt("sys")
            .with_history(&transcript, 12)
            .user_message("next")
            .build();

        // system + 12 history + user
        assert_eq!(messages.len(), 14);
        assert_eq!(messages[1].content, "u8");
        assert_eq!(messages[12].content, "a19");
    }

    #[test]
    fn test_grammar_note_lists_candidates() {
        let hints = vec![GrammarHint {
            pattern: "I goed".to_string(),
            possible_error: "past tense of 'go' is 'went'".to_string(),
        }];

        let messages = PromptBuilder::new()
            .with_system_prompt("sys")
            .with_grammar_note(&hints)
            .user_message("I goed home")
            .build();

        assert_eq!(messages.len(), 3);
        assert_eq!(messages[1].role, Role::System);
        assert!(messages[1].content.contains("I goed"));
        assert!(messages[1].content.contains("went"));
    }

    #[test]
    fn test_no_grammar_note_without_hints() {
        let messages = PromptBuilder::new()
            .with_system_prompt("sys")
            .with_grammar_note(&[])
            .user_message("Hello")
            .build();

        assert_eq!(messages.len(), 2);
    }

    #[test]
    fn test_greeting_template() {
        let greeting = ResponseTemplates::free_conversation_greeting("Sarah", "Maria");
        assert_eq!(
            greeting,
            "Hi, Maria. I am Sarah. I am your speaking assistant today. \
             What would you like to talk about?"
        );
    }
}
