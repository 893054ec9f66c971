//! Command parsing for the chat application.
//!
//! Session commands are recognized in two spellings: the bare words typed at
//! the prompt (`quit`, `clear`, `stream on`, ...) when they make up the whole
//! input, and the same words behind a leading `/`.  Commands that take a file
//! argument are only available in the `/` form so they never swallow an
//! ordinary sentence.  A `/` followed by anything that is not a command name,
//! such as `/etc/hosts looks wrong`, is an ordinary utterance.

/// A parsed chat command.
///
/// These commands control the chat session and are not sent to the service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChatCommand {
    /// Exit the chat application.
    Quit,

    /// Clear the conversation history (`clear`, `reset`).
    Clear,

    /// Start a completely new conversation (`new`).
    New,

    /// Turn streaming on or off; `None` flips the current setting.
    Stream(Option<bool>),

    /// Display help information.
    Help,

    /// Display session statistics.
    Stats,

    /// Save the transcript to a file.
    Save(String),

    /// Replace the conversation with a transcript loaded from a file.
    Load(String),

    /// Report a parsing error back to the caller.
    Invalid(String),
}

/// Parses user input for commands.
///
/// Returns `Some(ChatCommand)` if the input is a command, or `None` if it
/// should be sent to the service as an utterance.
///
/// # Examples
///
/// ```
/// # use airchat::chat::{ChatCommand, parse_command};
/// assert_eq!(parse_command("quit"), Some(ChatCommand::Quit));
/// assert_eq!(parse_command("/stream on"), Some(ChatCommand::Stream(Some(true))));
/// assert!(parse_command("clear the table, please").is_none());
/// ```
pub fn parse_command(input: &str) -> Option<ChatCommand> {
    let input = input.trim();
    match input.strip_prefix('/') {
        Some(rest) => parse_slash(rest),
        None => parse_bare(input),
    }
}

fn parse_bare(input: &str) -> Option<ChatCommand> {
    let lower = input.to_lowercase();
    let words: Vec<&str> = lower.split_whitespace().collect();
    let command = match words.as_slice() {
        ["quit"] | ["exit"] => ChatCommand::Quit,
        ["clear"] | ["reset"] => ChatCommand::Clear,
        ["new"] => ChatCommand::New,
        ["help"] => ChatCommand::Help,
        ["stream"] | ["streaming"] => ChatCommand::Stream(None),
        ["stream" | "streaming", setting] => ChatCommand::Stream(Some(parse_on_off(setting)?)),
        _ => return None,
    };
    Some(command)
}

fn parse_slash(rest: &str) -> Option<ChatCommand> {
    let mut parts = rest.splitn(2, ' ');
    let command = parts.next().unwrap_or_default().to_lowercase();
    let argument = parts.next().map(|s| s.trim()).filter(|s| !s.is_empty());

    let command = match command.as_str() {
        "quit" | "exit" | "q" => ChatCommand::Quit,
        "clear" | "reset" => ChatCommand::Clear,
        "new" => ChatCommand::New,
        "help" | "?" => ChatCommand::Help,
        "stats" | "status" => ChatCommand::Stats,
        "stream" | "streaming" => match argument {
            None => ChatCommand::Stream(None),
            Some(arg) => match parse_on_off(arg) {
                Some(value) => ChatCommand::Stream(Some(value)),
                None => ChatCommand::Invalid("/stream expects 'on' or 'off'".to_string()),
            },
        },
        "save" => match argument {
            Some(arg) => ChatCommand::Save(arg.to_string()),
            None => ChatCommand::Invalid("/save requires a file path".to_string()),
        },
        "load" => match argument {
            Some(arg) => ChatCommand::Load(arg.to_string()),
            None => ChatCommand::Invalid("/load requires a file path".to_string()),
        },
        _ => return None,
    };
    Some(command)
}

fn parse_on_off(value: &str) -> Option<bool> {
    match value.to_lowercase().as_str() {
        "on" | "true" | "yes" => Some(true),
        "off" | "false" | "no" => Some(false),
        _ => None,
    }
}

/// Returns help text describing available commands.
pub fn help_text() -> &'static str {
    r#"Available commands:
  quit, exit          End the chat session
  clear, reset        Clear the conversation and start fresh
  new                 Start a completely new conversation
  stream on|off       Turn streaming responses on or off (bare 'stream' toggles)
  help                Show this help message
  /stats              Show session statistics
  /save <file>        Save the conversation transcript
  /load <file>        Load a conversation transcript

Tips:
  Type your message normally to chat
  Use Ctrl+C to exit at any time
  Streaming responses show the reply as it is generated"#
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_quit_commands() {
        assert_eq!(parse_command("quit"), Some(ChatCommand::Quit));
        assert_eq!(parse_command("EXIT"), Some(ChatCommand::Quit));
        assert_eq!(parse_command("/quit"), Some(ChatCommand::Quit));
        assert_eq!(parse_command("/q"), Some(ChatCommand::Quit));
        assert_eq!(parse_command("  quit  "), Some(ChatCommand::Quit));
    }

    #[test]
    fn parse_reset_aliases() {
        assert_eq!(parse_command("clear"), Some(ChatCommand::Clear));
        assert_eq!(parse_command("Reset"), Some(ChatCommand::Clear));
        assert_eq!(parse_command("/clear"), Some(ChatCommand::Clear));
        assert_eq!(parse_command("new"), Some(ChatCommand::New));
        assert_eq!(parse_command("/new"), Some(ChatCommand::New));
    }

    #[test]
    fn parse_stream_toggle() {
        assert_eq!(parse_command("stream on"), Some(ChatCommand::Stream(Some(true))));
        assert_eq!(
            parse_command("Streaming OFF"),
            Some(ChatCommand::Stream(Some(false)))
        );
        assert_eq!(parse_command("stream"), Some(ChatCommand::Stream(None)));
        assert_eq!(parse_command("/stream"), Some(ChatCommand::Stream(None)));
        assert_eq!(
            parse_command("/stream off"),
            Some(ChatCommand::Stream(Some(false)))
        );
        assert!(matches!(
            parse_command("/stream maybe"),
            Some(ChatCommand::Invalid(msg)) if msg.contains("expects")
        ));
        // A sentence that starts with "stream" is an utterance.
        assert_eq!(parse_command("stream the movie"), None);
    }

    #[test]
    fn parse_file_commands() {
        assert_eq!(
            parse_command("/save chat.json"),
            Some(ChatCommand::Save("chat.json".to_string()))
        );
        assert_eq!(
            parse_command("/load  chat.json "),
            Some(ChatCommand::Load("chat.json".to_string()))
        );
        assert!(matches!(
            parse_command("/save"),
            Some(ChatCommand::Invalid(msg)) if msg.contains("requires")
        ));
        assert_eq!(parse_command("save me"), None);
    }

    #[test]
    fn parse_help_and_stats() {
        assert_eq!(parse_command("help"), Some(ChatCommand::Help));
        assert_eq!(parse_command("/?"), Some(ChatCommand::Help));
        assert_eq!(parse_command("/stats"), Some(ChatCommand::Stats));
        assert_eq!(parse_command("stats"), None);
    }

    #[test]
    fn unknown_slash_word_is_an_utterance() {
        assert_eq!(parse_command("/frobnicate"), None);
        assert_eq!(parse_command("/etc/hosts looks wrong, why?"), None);
        assert_eq!(parse_command("/"), None);
    }

    #[test]
    fn non_commands() {
        assert_eq!(parse_command("Hello there!"), None);
        assert_eq!(parse_command("clear the table"), None);
        assert_eq!(parse_command("new ideas please"), None);
        assert_eq!(parse_command(""), None);
    }

    #[test]
    fn help_text_not_empty() {
        let help = help_text();
        assert!(help.contains("quit"));
        assert!(help.contains("clear"));
        assert!(help.contains("stream on|off"));
        assert!(help.contains("/save"));
    }
}
