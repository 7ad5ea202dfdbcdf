//! REPL input parsing.

/// What a line of user input asks for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Blank line.
    Empty,
    Quit,
    Clear,
    History,
    Help,
    /// Anything else is sent to the model.
    Message(String),
}

impl Command {
    /// Parse one line. Commands are matched case-insensitively.
    pub fn parse(line: &str) -> Self {
        let input = line.trim();
        if input.is_empty() {
            return Command::Empty;
        }

        match input.to_lowercase().as_str() {
            "quit" | "exit" | "q" => Command::Quit,
            "clear" => Command::Clear,
            "history" => Command::History,
            "help" => Command::Help,
            _ => Command::Message(input.to_string()),
        }
    }
}

/// Command reference shown by `help` and the banner.
pub const HELP_LINES: &[(&str, &str)] = &[
    ("quit/exit/q", "leave the chat"),
    ("clear", "clear the conversation history"),
    ("history", "show the conversation history"),
    ("help", "show this help"),
];
