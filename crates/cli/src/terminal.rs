use std::io::{self, Write};

use anyhow::Result;
use crossterm::{
    execute,
    style::{Color, Print, ResetColor, SetForegroundColor},
};

use crate::server_client::{QueryAnswer, UploadedChunk};

/// Color scheme for terminal output.
struct Colors;

impl Colors {
    const PROMPT: Color = Color::Green;
    const ANSWER: Color = Color::Cyan;
    const CID: Color = Color::Yellow;
    const ERROR: Color = Color::Red;
    const DIM: Color = Color::DarkGrey;
    const HEADER: Color = Color::Magenta;
}

/// Longest slice of a context chunk echoed under an answer.
const CONTEXT_PREVIEW_CHARS: usize = 300;

pub struct Terminal;

impl Terminal {
    pub fn print_banner(&self, server: &str) -> Result<()> {
        let mut stdout = io::stdout();
        execute!(
            stdout,
            SetForegroundColor(Colors::HEADER),
            Print("cidrag"),
            ResetColor,
            Print(" - ask your documents\n"),
            SetForegroundColor(Colors::DIM),
            Print(format!("Server: {}\n", server)),
            Print("Type 'exit' or 'quit' to end.\n"),
            Print("---\n"),
            ResetColor,
        )?;
        stdout.flush()?;
        Ok(())
    }

    /// Read one question. `None` means the user wants to leave.
    pub fn read_input(&self) -> Result<Option<String>> {
        let mut stdout = io::stdout();
        execute!(
            stdout,
            Print("\n"),
            SetForegroundColor(Colors::PROMPT),
            Print("ask> "),
            ResetColor,
        )?;
        stdout.flush()?;

        let mut input = String::new();
        if io::stdin().read_line(&mut input)? == 0 {
            return Ok(None);
        }
        Ok(parse_input(&input))
    }

    pub fn print_uploaded(&self, uploaded: &[UploadedChunk]) -> Result<()> {
        let mut stdout = io::stdout();
        if uploaded.is_empty() {
            execute!(
                stdout,
                SetForegroundColor(Colors::DIM),
                Print("Nothing to store: no chunks produced.\n"),
                ResetColor
            )?;
            return Ok(());
        }
        for chunk in uploaded {
            execute!(
                stdout,
                SetForegroundColor(Colors::CID),
                Print(&chunk.cid),
                ResetColor,
                Print(format!("  {}\n", chunk.filename)),
                SetForegroundColor(Colors::DIM),
                Print(format!("    {}\n", one_line(&chunk.preview))),
                ResetColor,
            )?;
        }
        execute!(stdout, Print(format!("{} chunk(s) stored\n", uploaded.len())))?;
        stdout.flush()?;
        Ok(())
    }

    pub fn print_answer(&self, answer: &QueryAnswer, show_context: bool) -> Result<()> {
        let mut stdout = io::stdout();
        execute!(
            stdout,
            SetForegroundColor(Colors::ANSWER),
            Print(answer.answer.trim()),
            ResetColor,
            Print("\n"),
        )?;

        if show_context {
            if answer.context.is_empty() {
                execute!(stdout, SetForegroundColor(Colors::DIM), Print("(no context retrieved)\n"), ResetColor)?;
            }
            for chunk in &answer.context {
                execute!(
                    stdout,
                    SetForegroundColor(Colors::CID),
                    Print(format!("[{}] ", chunk.id)),
                    SetForegroundColor(Colors::DIM),
                    Print(format!("{}\n", truncate(&one_line(&chunk.content), CONTEXT_PREVIEW_CHARS))),
                    ResetColor,
                )?;
            }
        }
        stdout.flush()?;
        Ok(())
    }

    pub fn print_json(&self, value: &serde_json::Value) -> Result<()> {
        println!("{}", serde_json::to_string_pretty(value)?);
        Ok(())
    }

    pub fn print_error(&self, err: &anyhow::Error) -> Result<()> {
        let mut stdout = io::stdout();
        execute!(
            stdout,
            SetForegroundColor(Colors::ERROR),
            Print(format!("error: {:#}\n", err)),
            ResetColor,
        )?;
        stdout.flush()?;
        Ok(())
    }
}

fn parse_input(line: &str) -> Option<String> {
    let trimmed = line.trim();
    if matches!(trimmed, "exit" | "quit" | "/exit" | "/quit") {
        return None;
    }
    Some(trimmed.to_string())
}

fn one_line(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn truncate(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((cut, _)) => format!("{}...", &text[..cut]),
        None => text.to_string(),
    }
}
