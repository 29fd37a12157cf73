//! Output rendering for the chat application.
//!
//! This module provides a trait-based rendering abstraction that allows
//! for different output styles.  The default implementation uses ANSI
//! escape codes to style each message origin differently and to show
//! transient retry status while a submission is in flight.

use std::io::{self, Stdout, Write};
use std::time::Duration;

use crate::dispatcher::DispatchObserver;
use crate::error::Error;
use crate::types::{ChatMessage, MessageOrigin};

/// ANSI escape code for bold text (used for the assistant label).
const ANSI_BOLD: &str = "\x1b[1m";

/// ANSI escape code for dim text (used for retry status and disclaimers).
const ANSI_DIM: &str = "\x1b[2m";

/// ANSI escape code for italic text (used for disclaimers).
const ANSI_ITALIC: &str = "\x1b[3m";

/// ANSI escape code to reset all styling.
const ANSI_RESET: &str = "\x1b[0m";

/// ANSI escape code for cyan text (used for analysis blocks).
const ANSI_CYAN: &str = "\x1b[36m";

/// ANSI escape code for yellow text (used for retry status).
const ANSI_YELLOW: &str = "\x1b[33m";

/// ANSI escape code for green text (used for assistant answers).
const ANSI_GREEN: &str = "\x1b[32m";

/// ANSI escape code for red text (used for errors).
const ANSI_RED: &str = "\x1b[31m";

/// Trait for rendering chat output.
///
/// This abstraction allows for different rendering strategies:
/// - Plain text with ANSI styling
/// - Plain text without styling (for piping/redirecting)
pub trait Renderer: Send {
    /// Print one conversation message.
    fn print_message(&mut self, message: &ChatMessage);

    /// Print a transient status line, such as a pending retry.
    fn print_status(&mut self, status: &str);

    /// Print an error message.
    fn print_error(&mut self, error: &str);

    /// Print an informational message.
    fn print_info(&mut self, info: &str);

    /// Called when the user interrupts a submission in flight.
    fn print_interrupted(&mut self) {
        self.print_info("[interrupted]");
    }
}

/// Formats a message for display, one labelled block per message.
pub fn format_message(message: &ChatMessage, use_color: bool) -> String {
    let (label, style) = match message.origin {
        MessageOrigin::User => ("You", ANSI_BOLD.to_string()),
        MessageOrigin::Assistant => ("Medicare AI", format!("{ANSI_BOLD}{ANSI_GREEN}")),
        MessageOrigin::Analysis => ("Analysis", ANSI_CYAN.to_string()),
        MessageOrigin::Disclaimer => ("Note", format!("{ANSI_DIM}{ANSI_ITALIC}")),
        MessageOrigin::Error => ("Error", ANSI_RED.to_string()),
    };
    let body = if message.origin == MessageOrigin::Analysis {
        message
            .text
            .lines()
            .map(|line| format!("  {line}"))
            .collect::<Vec<_>>()
            .join("\n")
    } else {
        message.text.clone()
    };
    let separator = if message.origin == MessageOrigin::Analysis {
        "\n"
    } else {
        " "
    };
    if use_color {
        format!("{style}{label}:{ANSI_RESET}{separator}{body}")
    } else {
        format!("{label}:{separator}{body}")
    }
}

/// Formats the transient status shown while waiting to retry.
pub fn format_retry_status(retry: u32, max_retries: u32, delay: Duration, error: &Error) -> String {
    let secs = delay.as_secs_f64();
    format!("Retrying ({retry}/{max_retries}) in {secs:.0}s: {error}")
}

/// Plain text renderer with optional ANSI styling.
///
/// This renderer writes to stdout by default; any writer can be supplied
/// through [`PlainTextRenderer::with_writer`].
pub struct PlainTextRenderer<W: Write + Send = Stdout> {
    out: W,
    use_color: bool,
}

impl PlainTextRenderer<Stdout> {
    /// Creates a new PlainTextRenderer with ANSI colors enabled.
    pub fn new() -> Self {
        Self::with_color(true)
    }

    /// Creates a new PlainTextRenderer with specified color setting.
    pub fn with_color(use_color: bool) -> Self {
        Self::with_writer(io::stdout(), use_color)
    }
}

impl<W: Write + Send> PlainTextRenderer<W> {
    /// Creates a renderer that writes to `out`.
    pub fn with_writer(out: W, use_color: bool) -> Self {
        Self { out, use_color }
    }

    /// Whether ANSI styling is enabled.
    pub fn use_color(&self) -> bool {
        self.use_color
    }

    /// Consumes the renderer and returns its writer.
    pub fn into_inner(self) -> W {
        self.out
    }

    fn write_line(&mut self, line: &str) {
        let _ = writeln!(self.out, "{line}");
        let _ = self.out.flush();
    }
}

impl Default for PlainTextRenderer<Stdout> {
    fn default() -> Self {
        Self::new()
    }
}

impl<W: Write + Send> Renderer for PlainTextRenderer<W> {
    fn print_message(&mut self, message: &ChatMessage) {
        let formatted = format_message(message, self.use_color);
        self.write_line(&formatted);
    }

    fn print_status(&mut self, status: &str) {
        if self.use_color {
            let line = format!("{ANSI_DIM}{ANSI_YELLOW}{status}{ANSI_RESET}");
            self.write_line(&line);
        } else {
            let line = format!("[{status}]");
            self.write_line(&line);
        }
    }

    fn print_error(&mut self, error: &str) {
        if self.use_color {
            eprintln!("{ANSI_RED}Error: {error}{ANSI_RESET}");
        } else {
            eprintln!("Error: {error}");
        }
    }

    fn print_info(&mut self, info: &str) {
        self.write_line(info);
    }
}

impl<W: Write + Send> DispatchObserver for PlainTextRenderer<W> {
    fn on_retry(&mut self, retry: u32, max_retries: u32, delay: Duration, error: &Error) {
        let status = format_retry_status(retry, max_retries, delay, error);
        self.print_status(&status);
    }

    fn on_append(&mut self, message: &ChatMessage) {
        // The user already sees their own line at the prompt.
        if message.origin != MessageOrigin::User {
            self.print_message(message);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rendered(renderer: PlainTextRenderer<Vec<u8>>) -> String {
        String::from_utf8(renderer.into_inner()).unwrap()
    }

    #[test]
    fn renderer_default_has_color() {
        let renderer = PlainTextRenderer::new();
        assert!(renderer.use_color());
    }

    #[test]
    fn renderer_without_color() {
        let renderer = PlainTextRenderer::with_color(false);
        assert!(!renderer.use_color());
    }

    #[test]
    fn plain_labels() {
        assert_eq!(
            format_message(&ChatMessage::assistant("Drink water."), false),
            "Medicare AI: Drink water."
        );
        assert_eq!(
            format_message(&ChatMessage::error("Too many requests."), false),
            "Error: Too many requests."
        );
        assert_eq!(
            format_message(
                &ChatMessage::analysis("Condition: Flu\nMedication: Rest"),
                false
            ),
            "Analysis:\n  Condition: Flu\n  Medication: Rest"
        );
    }

    #[test]
    fn colored_labels_reset() {
        let formatted = format_message(&ChatMessage::disclaimer("Not advice."), true);
        assert!(formatted.starts_with(ANSI_DIM));
        assert!(formatted.contains(ANSI_RESET));
        assert!(formatted.ends_with("Not advice."));
    }

    #[test]
    fn observer_skips_user_messages() {
        let mut renderer = PlainTextRenderer::with_writer(Vec::new(), false);
        renderer.on_append(&ChatMessage::user("I have a cough"));
        renderer.on_append(&ChatMessage::assistant("How long?"));
        assert_eq!(rendered(renderer), "Medicare AI: How long?\n");
    }

    #[test]
    fn observer_prints_retry_status() {
        let mut renderer = PlainTextRenderer::with_writer(Vec::new(), false);
        let error = Error::timeout("attempt timed out", Some(30.0));
        renderer.on_retry(1, 3, Duration::from_secs(2), &error);
        let output = rendered(renderer);
        assert!(output.starts_with("[Retrying (1/3) in 2s: "), "{output}");
    }
}
