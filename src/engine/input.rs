use thiserror::Error;

/// Prefix that turns a line into a chat message.
pub const CHAT_PREFIX: &str = "/c";
pub const QUIT_COMMAND: &str = "/q";

/// Longest chat text, in characters, that is sent to the peer. Keeps every
/// chat frame far below the wire frame limit even after JSON escaping.
pub const MAX_CHAT_CHARS: usize = 1024;

/// One line of local input, parsed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Move { x: i32, y: i32 },
    Chat(String),
    Quit,
    /// Blank line; only asks for a fresh frame.
    Refresh,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Invalid input format. Use x,y for moves (e.g. 7,7), /c <message> to chat or /q to quit.")]
pub struct CommandError;

/// Parses "x,y", "x y", "/c text", "/q" or a blank line.
pub fn parse_command(line: &str) -> Result<Command, CommandError> {
    let line = line.trim();
    if line.is_empty() {
        return Ok(Command::Refresh);
    }
    if line == QUIT_COMMAND {
        return Ok(Command::Quit);
    }
    if let Some(rest) = line.strip_prefix(CHAT_PREFIX) {
        // "/cfoo" is not a chat command
        if rest.is_empty() || rest.starts_with(char::is_whitespace) {
            return Ok(Command::Chat(rest.trim().to_string()));
        }
        return Err(CommandError);
    }

    let coords: Result<Vec<i32>, _> = line
        .split(|c: char| c == ',' || c.is_whitespace())
        .filter(|s| !s.is_empty())
        .map(str::parse)
        .collect();
    match coords.as_deref() {
        Ok([x, y]) => Ok(Command::Move { x: *x, y: *y }),
        _ => Err(CommandError),
    }
}
