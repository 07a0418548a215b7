//! Registry of the language models the engine can route questions to.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Approximate characters per token used for prompt budgeting
pub const CHARS_PER_TOKEN: usize = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Capability {
    /// General-purpose chat and question answering.
    General,
    /// Small model tuned for low latency.
    Fast,
    /// Model specialised for source code.
    Code,
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tag = match self {
            Capability::General => "general",
            Capability::Fast => "fast",
            Capability::Code => "code",
        };
        f.pad(tag)
    }
}

/// Closed set of supported local models
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModelProfile {
    Llama2,
    Phi,
    CodeLlama,
    Mistral,
}

const ALL_PROFILES: [ModelProfile; 4] = [
    ModelProfile::Llama2,
    ModelProfile::Phi,
    ModelProfile::CodeLlama,
    ModelProfile::Mistral,
];

impl ModelProfile {
    /// Resolve a model name, accepting `name` and `name:tag`
    pub fn from_name(name: &str) -> Result<Self> {
        let base = name
            .trim()
            .split(':')
            .next()
            .unwrap_or_default()
            .to_lowercase();
        ALL_PROFILES
            .iter()
            .copied()
            .find(|p| p.name() == base)
            .ok_or_else(|| Error::UnknownModel(name.to_string()))
    }

    /// Canonical runtime name for `name`: the profile name plus any `:tag`.
    ///
    /// `"Phi"` becomes `"phi"` and `"LLaMA2:13b"` becomes `"llama2:13b"`.
    pub fn runtime_name(name: &str) -> Result<String> {
        let profile = Self::from_name(name)?;
        let tag = name
            .trim()
            .split_once(':')
            .map(|(_, tag)| tag.trim())
            .filter(|tag| !tag.is_empty());
        Ok(match tag {
            Some(tag) => format!("{}:{}", profile.name(), tag),
            None => profile.name().to_string(),
        })
    }

    pub fn all() -> &'static [ModelProfile] {
        &ALL_PROFILES
    }

    /// Name as known to the local runtime
    pub fn name(&self) -> &'static str {
        match self {
            ModelProfile::Llama2 => "llama2",
            ModelProfile::Phi => "phi",
            ModelProfile::CodeLlama => "codellama",
            ModelProfile::Mistral => "mistral",
        }
    }

    pub fn capability(&self) -> Capability {
        match self {
            ModelProfile::Llama2 | ModelProfile::Mistral => Capability::General,
            ModelProfile::Phi => Capability::Fast,
            ModelProfile::CodeLlama => Capability::Code,
        }
    }

    /// Context window in tokens
    pub fn context_window(&self) -> usize {
        match self {
            ModelProfile::Llama2 => 4096,
            ModelProfile::Phi => 2048,
            ModelProfile::CodeLlama => 16384,
            ModelProfile::Mistral => 8192,
        }
    }

    /// Prompt budget in characters after reserving `reserve_tokens` for the answer
    pub fn budget_chars(&self, reserve_tokens: usize) -> usize {
        self.context_window()
            .saturating_sub(reserve_tokens)
            .saturating_mul(CHARS_PER_TOKEN)
    }
}

impl fmt::Display for ModelProfile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.name())
    }
}
