//! Interactive read-eval-print loop.

use colored::Colorize;
use parley_protocol::Role;
use std::io::Write;
use tokio_util::sync::CancellationToken;

use crate::client::{ChatSession, TurnReply};
use crate::command::{Command, HELP_LINES};
use crate::error::ClientError;
use crate::input::LineSource;

const RULE_WIDTH: usize = 60;
const THINKING: &str = "Thinking...";

enum Input {
    Line(String),
    Eof,
    Interrupted,
}

/// Terminal chat loop over a [`ChatSession`].
///
/// Reads lines from `input` and renders to `out`; one request is in flight
/// at a time. Cancelling the interrupt token ends the session.
pub struct Repl<R, W> {
    session: ChatSession,
    input: R,
    out: W,
    interrupt: CancellationToken,
}

impl<R: LineSource, W: Write> Repl<R, W> {
    pub fn new(session: ChatSession, input: R, out: W) -> Self {
        Self {
            session,
            input,
            out,
            interrupt: CancellationToken::new(),
        }
    }

    pub fn with_interrupt(mut self, interrupt: CancellationToken) -> Self {
        self.interrupt = interrupt;
        self
    }

    pub fn session(&self) -> &ChatSession {
        &self.session
    }

    /// Run until `quit`, end of input or interrupt.
    ///
    /// Returns [`ClientError::ServiceUnavailable`] if the service never
    /// became healthy.
    pub async fn run(&mut self) -> Result<(), ClientError> {
        self.print_banner()?;
        if !self.connect().await? {
            writeln!(self.out, "\nGoodbye!")?;
            return Ok(());
        }

        loop {
            write!(self.out, "{} ", "You:".bold().green())?;
            self.out.flush()?;

            let input = tokio::select! {
                line = self.input.next_line() => match line? {
                    Some(line) => Input::Line(line),
                    None => Input::Eof,
                },
                _ = self.interrupt.cancelled() => Input::Interrupted,
            };

            let line = match input {
                Input::Line(line) => line,
                Input::Eof | Input::Interrupted => {
                    writeln!(self.out)?;
                    break;
                }
            };

            match Command::parse(&line) {
                Command::Empty => continue,
                Command::Quit => break,
                Command::Clear => {
                    self.session.clear();
                    writeln!(self.out, "{} Conversation history cleared\n", "✓".green())?;
                }
                Command::History => self.print_history()?,
                Command::Help => self.print_help()?,
                Command::Message(text) => {
                    if !self.converse(&text).await? {
                        break;
                    }
                }
            }
        }

        writeln!(self.out, "\nGoodbye!")?;
        Ok(())
    }

    /// Wait for the service. Returns `false` if interrupted first.
    async fn connect(&mut self) -> Result<bool, ClientError> {
        writeln!(self.out, "Connecting to {}...", self.session.client().base_url())?;

        let out = &mut self.out;
        let mut progress_error = None;
        let waiting = self
            .session
            .client()
            .wait_for_service(|attempt, attempts| {
                if progress_error.is_some() {
                    return;
                }
                let progress = write!(out, "\rWaiting... ({}/{})", attempt, attempts)
                    .and_then(|()| out.flush());
                if let Err(e) = progress {
                    progress_error = Some(e);
                }
            });

        let result = tokio::select! {
            result = waiting => Some(result),
            _ = self.interrupt.cancelled() => None,
        };

        if let Some(e) = progress_error {
            return Err(e.into());
        }

        match result {
            None => Ok(false),
            Some(Ok(())) => {
                writeln!(self.out, "\r{} Service ready!\n", "✓".green())?;
                Ok(true)
            }
            Some(Err(e)) => {
                writeln!(
                    self.out,
                    "\n{} Service is not running, start it first with: {}",
                    "✗".red(),
                    "parley serve".bold()
                )?;
                Err(e)
            }
        }
    }

    /// Send one message. Returns `false` if the user interrupted the wait.
    async fn converse(&mut self, text: &str) -> Result<bool, ClientError> {
        write!(self.out, "{}", THINKING.dimmed())?;
        self.out.flush()?;

        let result = tokio::select! {
            result = self.session.send_message(text) => Some(result),
            _ = self.interrupt.cancelled() => None,
        };

        write!(self.out, "\r{}\r", " ".repeat(THINKING.len()))?;

        match result {
            Some(Ok(turn)) => self.print_reply(&turn)?,
            Some(Err(e)) => writeln!(self.out, "{} {}\n", "Error:".red().bold(), e)?,
            None => {
                writeln!(self.out)?;
                return Ok(false);
            }
        }
        Ok(true)
    }

    fn print_reply(&mut self, turn: &TurnReply) -> Result<(), ClientError> {
        writeln!(self.out, "{} {}", "Assistant:".bold().blue(), turn.reply)?;
        writeln!(
            self.out,
            "{}\n",
            format!(
                "[tokens: {} | time: {:.2}s]",
                turn.usage.total_tokens,
                turn.elapsed.as_secs_f64()
            )
            .dimmed()
        )?;
        Ok(())
    }

    fn print_banner(&mut self) -> Result<(), ClientError> {
        writeln!(self.out, "{}", "=".repeat(RULE_WIDTH))?;
        writeln!(self.out, "{}", "Parley interactive chat".bold())?;
        writeln!(self.out, "{}", "=".repeat(RULE_WIDTH))?;
        writeln!(self.out, "Type a message and press Enter to send.")?;
        self.print_commands()?;
        writeln!(self.out, "{}\n", "=".repeat(RULE_WIDTH))?;
        Ok(())
    }

    fn print_help(&mut self) -> Result<(), ClientError> {
        writeln!(self.out, "\nCommands:")?;
        self.print_commands()?;
        writeln!(self.out)?;
        Ok(())
    }

    fn print_commands(&mut self) -> Result<(), ClientError> {
        for (name, description) in HELP_LINES {
            writeln!(self.out, "  {:<12} {}", name.cyan(), description)?;
        }
        Ok(())
    }

    fn print_history(&mut self) -> Result<(), ClientError> {
        let conversation = self.session.conversation();
        if conversation.is_empty() {
            writeln!(self.out, "Conversation history is empty\n")?;
            return Ok(());
        }

        writeln!(self.out, "\n{}", "=".repeat(RULE_WIDTH))?;
        writeln!(self.out, "Conversation history:")?;
        writeln!(self.out, "{}", "=".repeat(RULE_WIDTH))?;
        for (i, message) in conversation.messages().iter().enumerate() {
            let speaker = match message.role {
                Role::User => "User".green(),
                Role::Assistant => "Assistant".blue(),
                Role::System => "System".yellow(),
            };
            writeln!(self.out, "\n[{}] {}:", i + 1, speaker.bold())?;
            writeln!(self.out, "    {}", message.content)?;
        }
        writeln!(self.out, "{}", "=".repeat(RULE_WIDTH))?;
        writeln!(self.out, "Total tokens: {}\n", conversation.total_tokens())?;
        Ok(())
    }
}
