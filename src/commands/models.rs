//! Models command implementation

use crate::llm::ModelRouter;
use crate::models::{Capability, ModelProfile};
use serde::Serialize;
use tracing::warn;

/// A supported model and whether the runtime has it installed
#[derive(Debug, Clone, Serialize)]
pub struct ModelInfo {
    pub name: String,
    pub capability: Capability,
    pub context_window: usize,
    /// `None` when the runtime could not be reached
    pub installed: Option<bool>,
}

/// List supported models, checking availability against the runtime
pub async fn cmd_models(router: &ModelRouter) -> Vec<ModelInfo> {
    let installed = match router.installed().await {
        Ok(names) => Some(names),
        Err(e) => {
            warn!("Could not reach the model runtime: {}", e);
            None
        }
    };

    ModelProfile::all()
        .iter()
        .map(|profile| ModelInfo {
            name: profile.name().to_string(),
            capability: profile.capability(),
            context_window: profile.context_window(),
            installed: installed.as_ref().map(|names| {
                names
                    .iter()
                    .any(|n| ModelProfile::from_name(n).ok() == Some(*profile))
            }),
        })
        .collect()
}

/// Print the model table to console
pub fn print_models(models: &[ModelInfo], default_model: &str) {
    println!("\n🤖 Supported Models\n");
    for model in models {
        let marker = if model.name == default_model { "*" } else { " " };
        let status = match model.installed {
            Some(true) => "✓ installed",
            Some(false) => "✗ not installed",
            None => "? runtime unreachable",
        };
        println!(
            "{} {:<10} {:<8} {:>6} tokens  {}",
            marker, model.name, model.capability, model.context_window, status
        );
    }
    println!("\n* default model");
}
