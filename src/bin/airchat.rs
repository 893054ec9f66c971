//! Interactive chat against an OpenAI-compatible completion service.
//!
//! # Usage
//!
//! ```bash
//! # Basic usage; the key comes from AIR_API_KEY
//! airchat
//!
//! # Pick a model and start in streaming mode
//! airchat --model meta-llama/Llama-4-Maverick-17B-128E-Instruct --stream
//!
//! # Read settings from a file and keep a transcript
//! airchat --config airchat.yaml --transcript chat.json
//! ```
//!
//! # Commands
//!
//! Typed on their own at the prompt:
//! - `help` - Show available commands
//! - `clear` / `reset` - Clear the conversation
//! - `new` - Start a completely new conversation
//! - `stream on` / `stream off` - Switch reply mode
//! - `quit` / `exit` - Exit the application

use std::path::PathBuf;
use std::sync::Arc;

use arrrg::CommandLine;
use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;
use tokio_util::sync::CancellationToken;

use airchat::chat::{
    ChatArgs, ChatCommand, ChatConfig, ChatSession, PlainTextRenderer, Renderer, help_text,
    parse_command,
};
use airchat::{ClientLogger, ExchangeMode, JsonlLogger, Refinery};

/// Main entry point for the airchat application.
#[tokio::main]
async fn main() {
    let (args, _) = ChatArgs::from_command_line_relaxed("airchat [OPTIONS]");
    let config = match ChatConfig::load(&args) {
        Ok(config) => config,
        Err(err) => fatal(&err),
    };
    let mut renderer = PlainTextRenderer::with_color(config.use_color);

    let mut session = match build_session(config) {
        Ok(session) => session,
        Err(err) => fatal(&err),
    };
    let mut rl = match DefaultEditor::new() {
        Ok(rl) => rl,
        Err(err) => fatal(&err),
    };

    // Cancelled by Ctrl+C while a reply is pending.
    let interrupt = CancellationToken::new();
    let handler_token = interrupt.clone();
    if let Err(err) = ctrlc::set_handler(move || handler_token.cancel()) {
        fatal(&err);
    }

    renderer.print_banner(
        "AIRefinery Chatbot",
        &format!("Model: {}", session.service().model()),
    );
    renderer.print_info("Type 'help' for available commands or start chatting!\n");

    loop {
        let readline = rl.readline("You: ");
        if interrupt.is_cancelled() {
            println!("\nExiting.");
            break;
        }

        match readline {
            Ok(line) => {
                let line = line.trim();
                if line.is_empty() {
                    continue;
                }

                let _ = rl.add_history_entry(line);

                if let Some(cmd) = parse_command(line) {
                    if !dispatch(cmd, &mut session, &mut renderer) {
                        break;
                    }
                    continue;
                }

                let outcome = tokio::select! {
                    outcome = session.send(line, &mut renderer) => outcome,
                    _ = interrupt.cancelled() => {
                        println!("\nExiting.");
                        break;
                    }
                };
                match outcome {
                    Ok(Some(reply)) => {
                        if reply.mode == ExchangeMode::Buffered {
                            renderer.start_reply();
                            renderer.print_text(&reply.content);
                            renderer.finish_response();
                        }
                    }
                    Ok(None) => {}
                    Err(failure) => {
                        renderer.print_error(&format!("Request failed: {failure}"));
                        renderer.print_warning("Message removed. Please try again.");
                    }
                }
            }
            Err(ReadlineError::Interrupted) | Err(ReadlineError::Eof) => {
                println!("\nExiting.");
                break;
            }
            Err(err) => {
                renderer.print_error(&format!("Input error: {err}"));
                break;
            }
        }
    }
}

fn build_session(config: ChatConfig) -> airchat::Result<ChatSession<Refinery>> {
    let mut client = Refinery::with_options(
        config.api_key.clone(),
        config.base_url.clone(),
        Some(config.model.clone()),
        Some(config.timeout),
    )?;
    let logger: Option<Arc<dyn ClientLogger>> = match &config.log_path {
        Some(path) => Some(Arc::new(JsonlLogger::open(path)?)),
        None => None,
    };
    if let Some(logger) = &logger {
        client = client.with_logger(Arc::clone(logger));
    }
    let mut session = ChatSession::new(client, config);
    if let Some(logger) = logger {
        session = session.with_logger(logger);
    }
    Ok(session)
}

/// Applies a command.  Returns false when the loop should end.
fn dispatch(
    cmd: ChatCommand,
    session: &mut ChatSession<Refinery>,
    renderer: &mut PlainTextRenderer,
) -> bool {
    match cmd {
        ChatCommand::Quit => {
            renderer.print_info("Goodbye!");
            return false;
        }
        ChatCommand::Clear => {
            session.clear();
            renderer.print_warning("Conversation cleared. Starting fresh!");
        }
        ChatCommand::New => {
            session.start_new();
            renderer.print_warning("Completely new conversation started!");
        }
        ChatCommand::Stream(setting) => {
            let enabled = match setting {
                Some(enabled) => {
                    session.set_streaming(enabled);
                    enabled
                }
                None => session.toggle_streaming(),
            };
            if enabled {
                renderer.print_warning("Streaming enabled!");
            } else {
                renderer.print_warning("Streaming disabled!");
            }
        }
        ChatCommand::Help => {
            for line in help_text().lines() {
                println!("    {line}");
            }
        }
        ChatCommand::Stats => print_stats(session),
        ChatCommand::Save(path) => match session.save_transcript_to(PathBuf::from(&path)) {
            Ok(()) => renderer.print_info(&format!("Transcript saved to {path}")),
            Err(err) => renderer.print_error(&format!("Failed to save transcript: {err}")),
        },
        ChatCommand::Load(path) => match session.load_transcript_from(PathBuf::from(&path)) {
            Ok(()) => renderer.print_info(&format!(
                "Transcript loaded from {path} ({} messages)",
                session.message_count()
            )),
            Err(err) => renderer.print_error(&format!("Failed to load transcript: {err}")),
        },
        ChatCommand::Invalid(message) => renderer.print_error(&message),
    }
    true
}

fn print_stats(session: &ChatSession<Refinery>) {
    let stats = session.stats();
    println!("    Session Statistics:");
    println!("      Model: {}", stats.model);
    println!("      Endpoint: {}", session.service().endpoint());
    println!("      Messages: {}", stats.message_count);
    println!(
        "      Streaming: {}",
        if stats.streaming { "on" } else { "off" }
    );
    println!("      Timeout: {}s", stats.timeout.as_secs());
    println!("      System prompt: {}", stats.system_prompt);
    println!(
        "      Exchanges: {} committed / {} failed",
        stats.exchanges_committed, stats.exchanges_failed
    );
    println!("      Empty replies: {}", stats.placeholder_replies);
    println!("      Streamed fragments: {}", stats.fragments_received);
    match stats.transcript_path {
        Some(ref path) => println!("      Transcript file: {}", path.display()),
        None => println!("      Transcript file: (disabled)"),
    }
}

fn fatal(err: &dyn std::fmt::Display) -> ! {
    eprintln!("Fatal error: {err}");
    std::process::exit(1);
}
