//! Slash command parsing for the chat application.
//!
//! This module handles parsing of special commands that start with `/`,
//! allowing users to control the chat session without sending messages
//! to the backend.

use crate::dispatcher::DisclaimerPolicy;

/// A parsed chat command.
///
/// These commands control the chat session and, apart from
/// [`ChatCommand::Message`], are not sent to the backend.
#[derive(Debug, Clone, PartialEq)]
pub enum ChatCommand {
    /// Clear the conversation history.
    Clear,

    /// Print the whole conversation history.
    History,

    /// Switch to the analyze endpoint with the given language code.
    Lang(String),

    /// Switch back to the chat-combined endpoint.
    Chat,

    /// Change the disclaimer policy.
    Disclaimer(DisclaimerPolicy),

    /// Set the auto-save transcript path.
    TranscriptPath(String),

    /// Clear the auto-save transcript path.
    ClearTranscriptPath,

    /// Save the transcript to a specific file immediately.
    SaveTranscript(String),

    /// Load conversation history from a file.
    LoadTranscript(String),

    /// Display help information.
    Help,

    /// Exit the chat application.
    Quit,

    /// Display session statistics.
    Stats,

    /// Send text that starts with `/` as a regular message (`//` escape).
    Message(String),

    /// Report a parsing error back to the caller.
    Invalid(String),
}

/// Parses user input for slash commands.
///
/// Returns `Some(ChatCommand)` if the input is a valid command,
/// or `None` if it should be treated as a regular message.  A line starting
/// with `//` yields [`ChatCommand::Message`] with one slash removed.
///
/// # Examples
///
/// ```
/// # use medicare_chat::chat::parse_command;
/// assert!(parse_command("/quit").is_some());
/// assert!(parse_command("/lang es").is_some());
/// assert!(parse_command("I have a headache").is_none());
/// ```
pub fn parse_command(input: &str) -> Option<ChatCommand> {
    let input = input.trim();
    let rest = input.strip_prefix('/')?;
    if rest.starts_with('/') {
        return Some(ChatCommand::Message(rest.to_string()));
    }

    let mut parts = rest.splitn(2, ' ');
    let command = parts.next()?.to_lowercase();
    let argument = parts.next().map(|s| s.trim()).filter(|s| !s.is_empty());

    let result = match command.as_str() {
        "clear" => ChatCommand::Clear,
        "history" => ChatCommand::History,
        "help" | "?" => ChatCommand::Help,
        "quit" | "exit" | "q" => ChatCommand::Quit,
        "stats" | "status" => ChatCommand::Stats,
        "chat" => ChatCommand::Chat,
        "lang" => match argument {
            Some(lang) if is_language_code(lang) => ChatCommand::Lang(lang.to_lowercase()),
            Some(lang) => ChatCommand::Invalid(format!("/lang: {lang:?} is not a language code")),
            None => ChatCommand::Invalid("/lang requires a language code".to_string()),
        },
        "disclaimer" => match argument.map(|arg| arg.to_lowercase().parse::<DisclaimerPolicy>()) {
            Some(Ok(policy)) => ChatCommand::Disclaimer(policy),
            Some(Err(_)) | None => {
                ChatCommand::Invalid("/disclaimer expects 'never', 'first' or 'every'".to_string())
            }
        },
        "transcript" => match argument {
            Some(arg) if arg.eq_ignore_ascii_case("clear") => ChatCommand::ClearTranscriptPath,
            Some(arg) => ChatCommand::TranscriptPath(arg.to_string()),
            None => ChatCommand::Invalid("/transcript requires a file path".to_string()),
        },
        "save" => match argument {
            Some(arg) => ChatCommand::SaveTranscript(arg.to_string()),
            None => ChatCommand::Invalid("/save requires a file path".to_string()),
        },
        "load" => match argument {
            Some(arg) => ChatCommand::LoadTranscript(arg.to_string()),
            None => ChatCommand::Invalid("/load requires a file path".to_string()),
        },
        _ => ChatCommand::Invalid(format!("Unknown command: /{}", command)),
    };

    Some(result)
}

fn is_language_code(s: &str) -> bool {
    (2..=8).contains(&s.len()) && s.chars().all(|c| c.is_ascii_alphabetic() || c == '-')
}

/// Returns help text describing available commands.
pub fn help_text() -> &'static str {
    "\
Available commands:
  /help, /?              Show this help message
  /clear                 Clear conversation history
  /history               Print the conversation so far
  /lang <code>           Use the multilingual analyze endpoint (e.g. /lang es)
  /chat                  Use the chat-combined endpoint
  /disclaimer <policy>   Disclaimer after answers: never, first or every
  /transcript <path>     Auto-save the transcript after every message
  /transcript clear      Stop auto-saving
  /save <path>           Save the transcript now
  /load <path>           Replace the conversation with a saved transcript
  /stats                 Show session statistics
  /quit, /exit, /q       Exit the chat
  //<text>               Send <text> starting with a single /

Anything else is sent to Medicare AI. Answers are not medical advice."
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_basic_commands() {
        assert_eq!(parse_command("/clear"), Some(ChatCommand::Clear));
        assert_eq!(parse_command("/history"), Some(ChatCommand::History));
        assert_eq!(parse_command("/help"), Some(ChatCommand::Help));
        assert_eq!(parse_command("/?"), Some(ChatCommand::Help));
        assert_eq!(parse_command("/quit"), Some(ChatCommand::Quit));
        assert_eq!(parse_command("/exit"), Some(ChatCommand::Quit));
        assert_eq!(parse_command("/q"), Some(ChatCommand::Quit));
        assert_eq!(parse_command("/stats"), Some(ChatCommand::Stats));
        assert_eq!(parse_command("/chat"), Some(ChatCommand::Chat));
    }

    #[test]
    fn parse_case_insensitive() {
        assert_eq!(parse_command("/CLEAR"), Some(ChatCommand::Clear));
        assert_eq!(parse_command("/Lang ES"), Some(ChatCommand::Lang("es".to_string())));
    }

    #[test]
    fn parse_lang() {
        assert_eq!(parse_command("/lang fr"), Some(ChatCommand::Lang("fr".to_string())));
        assert_eq!(
            parse_command("/lang pt-br"),
            Some(ChatCommand::Lang("pt-br".to_string()))
        );
        assert!(matches!(parse_command("/lang"), Some(ChatCommand::Invalid(_))));
        assert!(matches!(
            parse_command("/lang ../etc"),
            Some(ChatCommand::Invalid(_))
        ));
    }

    #[test]
    fn parse_disclaimer() {
        assert_eq!(
            parse_command("/disclaimer every"),
            Some(ChatCommand::Disclaimer(DisclaimerPolicy::EveryAnswer))
        );
        assert_eq!(
            parse_command("/disclaimer NEVER"),
            Some(ChatCommand::Disclaimer(DisclaimerPolicy::Never))
        );
        assert!(matches!(
            parse_command("/disclaimer"),
            Some(ChatCommand::Invalid(_))
        ));
    }

    #[test]
    fn parse_transcript_commands() {
        assert_eq!(
            parse_command("/transcript chat.json"),
            Some(ChatCommand::TranscriptPath("chat.json".to_string()))
        );
        assert_eq!(
            parse_command("/transcript clear"),
            Some(ChatCommand::ClearTranscriptPath)
        );
        assert_eq!(
            parse_command("/save out.json"),
            Some(ChatCommand::SaveTranscript("out.json".to_string()))
        );
        assert_eq!(
            parse_command("/load in.json"),
            Some(ChatCommand::LoadTranscript("in.json".to_string()))
        );
        assert!(matches!(parse_command("/save"), Some(ChatCommand::Invalid(_))));
    }

    #[test]
    fn non_commands() {
        assert_eq!(parse_command("I feel dizzy"), None);
        assert_eq!(parse_command("  my head hurts / aches"), None);
        assert_eq!(parse_command(""), None);
    }

    #[test]
    fn double_slash_sends_message() {
        assert_eq!(
            parse_command("// pain in my side"),
            Some(ChatCommand::Message("/ pain in my side".to_string()))
        );
        assert_eq!(
            parse_command("//help"),
            Some(ChatCommand::Message("/help".to_string()))
        );
    }

    #[test]
    fn unknown_command() {
        assert_eq!(
            parse_command("/diagnose"),
            Some(ChatCommand::Invalid("Unknown command: /diagnose".to_string()))
        );
    }
}
