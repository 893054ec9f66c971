//! Output rendering for the chat application.
//!
//! This module provides a trait-based rendering abstraction so the exchange
//! layer can forward streamed fragments without knowing where they end up.
//! The default implementation writes to stdout with optional ANSI styling.

use std::io::{self, Stdout, Write};

/// ANSI escape code for bold text (used for the banner).
const ANSI_BOLD: &str = "\x1b[1m";

/// ANSI escape code for dim text (used for secondary details).
const ANSI_DIM: &str = "\x1b[2m";

/// ANSI escape code to reset all styling.
const ANSI_RESET: &str = "\x1b[0m";

/// ANSI escape code for blue text (used for the reply label).
const ANSI_BLUE: &str = "\x1b[34m";

/// ANSI escape code for cyan text (used for informational lines).
const ANSI_CYAN: &str = "\x1b[36m";

/// ANSI escape code for yellow text (used for warnings).
const ANSI_YELLOW: &str = "\x1b[33m";

/// ANSI escape code for green text (used for the banner).
const ANSI_GREEN: &str = "\x1b[32m";

/// ANSI escape code for red text (used for errors).
const ANSI_RED: &str = "\x1b[31m";

/// Trait for rendering chat output.
///
/// This abstraction allows for different rendering strategies:
/// - Plain text with ANSI styling
/// - Plain text without styling (for piping/redirecting)
/// - Capturing output in tests
pub trait Renderer: Send {
    /// Called before the first piece of a reply is shown.
    fn start_reply(&mut self);

    /// Print a chunk of reply text.
    ///
    /// This is called once per fragment as a streamed reply arrives, or once
    /// with the whole text of a buffered reply.
    fn print_text(&mut self, text: &str);

    /// Called when a reply is complete.
    ///
    /// Used to ensure proper newlines after streaming.
    fn finish_response(&mut self);

    /// Print an error message.
    fn print_error(&mut self, error: &str);

    /// Print a warning, e.g. that an unanswered message was discarded.
    fn print_warning(&mut self, warning: &str);

    /// Print an informational message.
    fn print_info(&mut self, info: &str);

    /// Print the start-of-session banner.
    fn print_banner(&mut self, title: &str, detail: &str) {
        self.print_info(title);
        self.print_info(detail);
    }
}

/// Plain text renderer with optional ANSI styling.
pub struct PlainTextRenderer {
    stdout: Stdout,
    use_color: bool,
    in_reply: bool,
}

impl PlainTextRenderer {
    /// Creates a new PlainTextRenderer with ANSI colors enabled.
    pub fn new() -> Self {
        Self::with_color(true)
    }

    /// Creates a new PlainTextRenderer with specified color setting.
    pub fn with_color(use_color: bool) -> Self {
        Self {
            stdout: io::stdout(),
            use_color,
            in_reply: false,
        }
    }

    /// Flushes stdout to ensure immediate display of streamed content.
    fn flush(&mut self) {
        let _ = self.stdout.flush();
    }

    /// Ends a reply that was cut short, so the next line starts cleanly.
    fn break_reply(&mut self) {
        if self.in_reply {
            println!();
            self.in_reply = false;
        }
    }

    fn paint(&self, color: &str, text: &str) -> String {
        if self.use_color {
            format!("{color}{text}{ANSI_RESET}")
        } else {
            text.to_string()
        }
    }
}

impl Default for PlainTextRenderer {
    fn default() -> Self {
        Self::new()
    }
}

impl Renderer for PlainTextRenderer {
    fn start_reply(&mut self) {
        self.break_reply();
        print!("{} ", self.paint(ANSI_BLUE, "Bot:"));
        self.in_reply = true;
        self.flush();
    }

    fn print_text(&mut self, text: &str) {
        print!("{text}");
        self.flush();
    }

    fn finish_response(&mut self) {
        if self.in_reply {
            println!();
            self.in_reply = false;
        }
        self.flush();
    }

    fn print_error(&mut self, error: &str) {
        self.break_reply();
        eprintln!("{}", self.paint(ANSI_RED, error));
    }

    fn print_warning(&mut self, warning: &str) {
        self.break_reply();
        println!("{}", self.paint(ANSI_YELLOW, warning));
    }

    fn print_info(&mut self, info: &str) {
        self.break_reply();
        println!("{}", self.paint(ANSI_CYAN, info));
    }

    fn print_banner(&mut self, title: &str, detail: &str) {
        self.break_reply();
        if self.use_color {
            println!("{ANSI_GREEN}{ANSI_BOLD}{title}{ANSI_RESET}");
            println!("{ANSI_DIM}{detail}{ANSI_RESET}");
        } else {
            println!("{title}");
            println!("{detail}");
        }
        self.flush();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renderer_default_has_color() {
        let renderer = PlainTextRenderer::new();
        assert!(renderer.use_color);
        assert_eq!(renderer.paint(ANSI_RED, "x"), "\x1b[31mx\x1b[0m");
    }

    #[test]
    fn renderer_without_color() {
        let renderer = PlainTextRenderer::with_color(false);
        assert!(!renderer.use_color);
        assert_eq!(renderer.paint(ANSI_RED, "x"), "x");
    }
}
