//! Interactive chat application for conversing with Medicare AI.
//!
//! This binary provides a REPL interface that sends each line to the
//! Medicare backend, retrying transient failures and showing retry status
//! inline.
//!
//! # Usage
//!
//! ```bash
//! # Basic usage with default settings
//! medicare-chat
//!
//! # Point at a different backend
//! medicare-chat --api-url https://medicare.example.com/api/
//!
//! # Use the multilingual analyze endpoint
//! medicare-chat --endpoint analyze --lang es
//!
//! # Disable colors (useful for piping output)
//! medicare-chat --no-color
//! ```
//!
//! # Commands
//!
//! While chatting, you can use slash commands:
//! - `/help` - Show available commands
//! - `/clear` - Clear conversation history
//! - `/lang <code>` - Switch to the analyze endpoint in another language
//! - `/stats` - Show session statistics
//! - `/quit` - Exit the application
//! - `//text` - Send `/text` as a regular message

use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use arrrg::CommandLine;
use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;

use medicare_chat::chat::{
    ChatArgs, ChatCommand, ChatConfig, ChatSession, PlainTextRenderer, Renderer, help_text,
    parse_command, wait_for_interrupt,
};
use medicare_chat::{DispatchOutcome, Endpoint, MedicareClient};

/// Main entry point for the medicare-chat application.
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let (args, _) = ChatArgs::from_command_line_relaxed("medicare-chat [OPTIONS]");
    let config = ChatConfig::try_from(args)?;
    let use_color = config.use_color;

    let mut session = ChatSession::from_config(&config)?;
    let mut rl = DefaultEditor::new()?;

    // Flag for interrupt handling while a request is in flight
    let interrupted = Arc::new(AtomicBool::new(false));

    // Set up Ctrl+C handler
    let interrupted_clone = interrupted.clone();
    ctrlc::set_handler(move || {
        interrupted_clone.store(true, Ordering::Relaxed);
    })?;

    let mut renderer = PlainTextRenderer::with_color(use_color);

    println!(
        "Medicare AI (backend: {}, endpoint: {})",
        session.backend().base_url(),
        session.backend().endpoint()
    );
    println!("Type /help for commands, /quit to exit\n");
    for message in session.history() {
        renderer.print_message(message);
    }

    loop {
        // Reset interrupt flag before each input
        interrupted.store(false, Ordering::Relaxed);

        let readline = rl.readline("You: ");

        match readline {
            Ok(line) => {
                let line = line.trim();
                if line.is_empty() {
                    continue;
                }

                let _ = rl.add_history_entry(line);

                // Check for slash commands
                let message = match parse_command(line) {
                    None => line.to_string(),
                    Some(ChatCommand::Message(text)) => text,
                    Some(ChatCommand::Quit) => {
                        println!("Goodbye!");
                        break;
                    }
                    Some(cmd) => {
                        run_command(cmd, &mut session, &mut renderer);
                        continue;
                    }
                };

                // Regular message - send to the backend
                let outcome = tokio::select! {
                    outcome = session.submit(&message, &mut renderer) => Some(outcome),
                    _ = wait_for_interrupt(&interrupted) => None,
                };
                match outcome {
                    Some(Ok(DispatchOutcome::Completed { messages, .. })) if messages.is_empty() => {
                        renderer.print_info("(the backend returned no answer)");
                    }
                    Some(Ok(_)) => {}
                    Some(Err(e)) => renderer.print_error(&e.to_string()),
                    None => {
                        session.abandon();
                        renderer.print_interrupted();
                    }
                }
            }
            Err(ReadlineError::Interrupted) => {
                // Ctrl+C at prompt - soft interrupt
                println!();
                continue;
            }
            Err(ReadlineError::Eof) => {
                // Ctrl+D - exit
                println!("\nGoodbye!");
                break;
            }
            Err(err) => {
                renderer.print_error(&format!("Input error: {}", err));
                break;
            }
        }
    }

    Ok(())
}

/// Applies a slash command that does not send anything to the backend.
fn run_command(
    cmd: ChatCommand,
    session: &mut ChatSession<MedicareClient>,
    renderer: &mut PlainTextRenderer,
) {
    match cmd {
        ChatCommand::Clear => {
            session.clear();
            renderer.print_info("Conversation cleared.");
        }
        ChatCommand::History => {
            for message in session.history() {
                renderer.print_message(message);
            }
        }
        ChatCommand::Help => {
            for line in help_text().lines() {
                println!("    {}", line);
            }
        }
        ChatCommand::Lang(lang) => {
            session.backend_mut().set_endpoint(Endpoint::analyze(lang.clone()));
            renderer.print_info(&format!("Using analyze-ml (lang: {lang})"));
        }
        ChatCommand::Chat => {
            session.backend_mut().set_endpoint(Endpoint::ChatCombined);
            renderer.print_info("Using chat-combined");
        }
        ChatCommand::Disclaimer(policy) => {
            session.set_disclaimer_policy(policy);
            renderer.print_info(&format!("Disclaimer policy set to {policy}"));
        }
        ChatCommand::TranscriptPath(path) => {
            session.set_transcript_path(Some(PathBuf::from(&path)));
            renderer.print_info(&format!("Transcript auto-save set to {}", path));
        }
        ChatCommand::ClearTranscriptPath => {
            session.set_transcript_path(None);
            renderer.print_info("Transcript auto-save disabled.");
        }
        ChatCommand::SaveTranscript(path) => match session.save_transcript_to(&path) {
            Ok(_) => renderer.print_info(&format!("Transcript saved to {}", path)),
            Err(err) => renderer.print_error(&format!("Failed to save transcript: {}", err)),
        },
        ChatCommand::LoadTranscript(path) => match session.load_transcript_from(&path) {
            Ok(_) => renderer.print_info(&format!("Transcript loaded from {}", path)),
            Err(err) => renderer.print_error(&format!("Failed to load transcript: {}", err)),
        },
        ChatCommand::Stats => print_stats(session),
        ChatCommand::Invalid(message) => renderer.print_error(&message),
        // Handled by the REPL loop.
        ChatCommand::Quit | ChatCommand::Message(_) => {}
    }
}

fn print_stats(session: &ChatSession<MedicareClient>) {
    let stats = session.stats();
    println!("    Session Statistics:");
    println!("      Backend: {}", session.backend().base_url());
    println!("      Endpoint: {}", session.backend().endpoint());
    println!("      Messages: {}", stats.message_count);
    println!(
        "      Submissions: {} ({} answered, {} failed)",
        stats.submissions, stats.completed, stats.failed
    );
    println!("      Retries: {}", stats.total_retries);
    println!("      Disclaimer: {}", stats.disclaimer);
    match stats.transcript_path {
        Some(ref path) => println!("      Transcript file: {}", path.display()),
        None => println!("      Transcript file: (disabled)"),
    }
}
