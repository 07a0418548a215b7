//! Prompt assembly under a character budget
//!
//! Sections appear in a fixed order: system instruction, recent
//! conversation, retrieved passages, question. When the prompt is too
//! long the least relevant passage goes first, then the oldest turn.

use crate::config::PromptConfig;
use crate::error::{Error, Result};
use crate::history::ConversationTurn;
use crate::retrieve::RetrievedChunk;
use tracing::debug;

/// Notice used in place of passages when the document offered no support
pub const NO_CONTEXT_NOTICE: &str = "No supporting text was found in the document for this \
question. Answer from general knowledge and say that you did so, or decline if you cannot answer.";

/// A prompt ready for the model, plus what went into it
#[derive(Debug, Clone)]
pub struct ComposedPrompt {
    pub text: String,
    /// Passages included, most relevant first
    pub included: Vec<RetrievedChunk>,
    pub turns_included: usize,
}

impl ComposedPrompt {
    /// Whether any document text made it into the prompt
    pub fn is_grounded(&self) -> bool {
        !self.included.is_empty()
    }

    pub fn char_len(&self) -> usize {
        self.text.chars().count()
    }
}

#[derive(Debug, Clone)]
pub struct PromptComposer {
    system_instruction: String,
    max_history_turns: usize,
}

impl PromptComposer {
    pub fn new(system_instruction: impl Into<String>, max_history_turns: usize) -> Self {
        Self {
            system_instruction: system_instruction.into(),
            max_history_turns,
        }
    }

    pub fn from_config(config: &PromptConfig) -> Self {
        Self::new(config.system_instruction.clone(), config.max_history_turns)
    }

    /// Build a prompt no longer than `budget_chars` characters
    pub fn compose(
        &self,
        question: &str,
        retrieved: &[RetrievedChunk],
        recent_turns: &[ConversationTurn],
        budget_chars: usize,
    ) -> Result<ComposedPrompt> {
        let mut passages = retrieved.to_vec();
        passages.sort_by(|a, b| b.score.total_cmp(&a.score));

        let skip = recent_turns.len().saturating_sub(self.max_history_turns);
        let mut turns: Vec<&ConversationTurn> = recent_turns[skip..].iter().collect();

        loop {
            let text = self.render(question, &passages, &turns);
            let length = text.chars().count();

            if length <= budget_chars {
                debug!(
                    "Composed prompt: {} chars, {} passages, {} turns",
                    length,
                    passages.len(),
                    turns.len()
                );
                return Ok(ComposedPrompt {
                    text,
                    turns_included: turns.len(),
                    included: passages,
                });
            }

            if passages.pop().is_some() {
                continue;
            }
            if !turns.is_empty() {
                turns.remove(0);
                continue;
            }

            return Err(Error::ContextWindowExceeded {
                required: length,
                budget: budget_chars,
            });
        }
    }

    fn render(
        &self,
        question: &str,
        passages: &[RetrievedChunk],
        turns: &[&ConversationTurn],
    ) -> String {
        let mut out = String::new();
        out.push_str(self.system_instruction.trim());
        out.push_str("\n\n");

        if !turns.is_empty() {
            out.push_str("Conversation so far:\n");
            for turn in turns {
                out.push_str(&format!(
                    "Q: {}\nA: {}\n",
                    turn.query.text.trim(),
                    turn.answer.text.trim()
                ));
            }
            out.push('\n');
        }

        if passages.is_empty() {
            out.push_str(NO_CONTEXT_NOTICE);
            out.push_str("\n\n");
        } else {
            out.push_str("Context from the document:\n");
            for (i, passage) in passages.iter().enumerate() {
                out.push_str(&format!("[{}] {}\n", i + 1, passage.chunk.text));
            }
            out.push('\n');
        }

        out.push_str(&format!("Question: {}\n\nAnswer:", question.trim()));
        out
    }
}
