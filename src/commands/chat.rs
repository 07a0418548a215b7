//! Interactive chat over a loaded PDF

use crate::commands::{print_answer, print_document_info, print_status};
use crate::engine::{DocumentProcessor, QaEngine};
use crate::error::{Error, Result};
use crate::history::{Answer, ConversationTurn};
use crate::models::ModelProfile;
use std::io::Write;
use std::path::Path;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{info, warn};

/// A line typed at the chat prompt
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChatCommand {
    Ask(String),
    Model(Option<String>),
    History,
    Info,
    Status,
    Clear,
    Help,
    Quit,
    Unknown(String),
    Empty,
}

/// Parse one line of chat input
pub fn parse_chat_line(line: &str) -> ChatCommand {
    let line = line.trim();
    if line.is_empty() {
        return ChatCommand::Empty;
    }
    let Some(command) = line.strip_prefix('/') else {
        return ChatCommand::Ask(line.to_string());
    };

    let mut parts = command.splitn(2, char::is_whitespace);
    let name = parts.next().unwrap_or_default().to_lowercase();
    let arg = parts
        .next()
        .map(str::trim)
        .filter(|a| !a.is_empty())
        .map(str::to_string);

    match name.as_str() {
        "model" => ChatCommand::Model(arg),
        "history" => ChatCommand::History,
        "info" => ChatCommand::Info,
        "status" => ChatCommand::Status,
        "clear" => ChatCommand::Clear,
        "help" | "?" => ChatCommand::Help,
        "quit" | "exit" | "q" => ChatCommand::Quit,
        _ => ChatCommand::Unknown(name),
    }
}

/// Load `pdf`, then answer questions read from stdin until `/quit` or EOF
pub async fn cmd_chat(engine: &QaEngine, pdf: &Path, model: &str) -> Result<()> {
    let document = engine.process_pdf(pdf).await?;
    let mut model = ModelProfile::runtime_name(model)?;

    println!(
        "Loaded {} ({} pages, {} chunks). Ask a question, or /help for commands.",
        document.file_name, document.page_count, document.chunk_count
    );

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        print!("[{}]> ", model);
        let _ = std::io::stdout().flush();

        let Some(line) = lines.next_line().await? else {
            println!();
            break;
        };

        match parse_chat_line(&line) {
            ChatCommand::Empty => {}
            ChatCommand::Quit => break,
            ChatCommand::Help => print_chat_help(),
            ChatCommand::Model(None) => println!("Current model: {}", model),
            ChatCommand::Model(Some(name)) => match select_model(&name) {
                Ok((profile, runtime_name)) => {
                    model = runtime_name;
                    println!("Switched to {} ({})", model, profile.capability());
                }
                Err(e) => println!("{}. Known models: {}", e, known_models()),
            },
            ChatCommand::History => print_history(&engine.history().get_history()),
            ChatCommand::Info => match engine.get_document_info() {
                Some(info) => print_document_info(&info),
                None => println!("No document loaded."),
            },
            ChatCommand::Status => print_status(&engine.status()),
            ChatCommand::Clear => {
                engine.history().clear();
                println!("History cleared.");
            }
            ChatCommand::Unknown(name) => println!("Unknown command '/{}'. Try /help.", name),
            ChatCommand::Ask(question) => {
                println!();
                let result = engine
                    .ask_question_streaming(&question, &model, |fragment| {
                        print!("{}", fragment);
                        let _ = std::io::stdout().flush();
                    })
                    .await;
                println!();

                match result {
                    Ok(answer) => print_answer_footer(&answer),
                    Err(e) if e.is_recoverable() => warn!("{}", e),
                    Err(e @ Error::ContextWindowExceeded { .. }) => warn!("{}", e),
                    Err(e) => return Err(e),
                }
            }
        }
    }

    info!("Chat ended after {} turn(s)", engine.history().len());
    Ok(())
}

/// Resolve a `/model` argument, keeping any `:tag`
fn select_model(name: &str) -> Result<(ModelProfile, String)> {
    Ok((ModelProfile::from_name(name)?, ModelProfile::runtime_name(name)?))
}

fn print_answer_footer(answer: &Answer) {
    if answer.grounded {
        let cited: Vec<String> = answer
            .citations
            .iter()
            .map(|c| c.ordinal.to_string())
            .collect();
        println!("  ↳ chunks {} · {} ms", cited.join(", "), answer.latency_ms);
    } else {
        println!("  ↳ not grounded in the document · {} ms", answer.latency_ms);
    }
}

fn known_models() -> String {
    ModelProfile::all()
        .iter()
        .map(|p| p.name())
        .collect::<Vec<_>>()
        .join(", ")
}

fn print_chat_help() {
    println!("Commands:");
    println!("  /model [name]  show or switch the model ({})", known_models());
    println!("  /history       show this conversation");
    println!("  /info          show document details");
    println!("  /status        show engine status");
    println!("  /clear         forget the conversation");
    println!("  /quit          leave");
}

/// Print conversation turns, oldest first
pub fn print_history(turns: &[ConversationTurn]) {
    if turns.is_empty() {
        println!("No questions asked yet.");
        return;
    }
    for turn in turns {
        println!(
            "#{} [{}] {}",
            turn.sequence,
            turn.answer.model,
            turn.query.text
        );
        print_answer(&turn.answer);
        println!();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_text_is_question() {
        assert_eq!(
            parse_chat_line("  What is this about? "),
            ChatCommand::Ask("What is this about?".to_string())
        );
        assert_eq!(parse_chat_line("   "), ChatCommand::Empty);
    }

    #[test]
    fn test_commands() {
        assert_eq!(
            parse_chat_line("/model phi"),
            ChatCommand::Model(Some("phi".to_string()))
        );
        assert_eq!(parse_chat_line("/model"), ChatCommand::Model(None));
        assert_eq!(parse_chat_line("/HISTORY"), ChatCommand::History);
        assert_eq!(parse_chat_line("/info"), ChatCommand::Info);
        assert_eq!(parse_chat_line("/clear"), ChatCommand::Clear);
        assert_eq!(parse_chat_line("/exit"), ChatCommand::Quit);
        assert_eq!(
            parse_chat_line("/bogus"),
            ChatCommand::Unknown("bogus".to_string())
        );
    }

    #[test]
    fn test_select_model_keeps_tag() {
        let (profile, name) = select_model("LLaMA2:13b").unwrap();
        assert_eq!(profile, ModelProfile::Llama2);
        assert_eq!(name, "llama2:13b");
        assert!(matches!(select_model("gpt-4"), Err(Error::UnknownModel(_))));
    }

    #[test]
    fn test_known_models_listed() {
        let listed = known_models();
        for profile in ModelProfile::all() {
            assert!(listed.contains(profile.name()));
        }
    }
}
