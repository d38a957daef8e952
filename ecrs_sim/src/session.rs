//! Line-oriented operator session.

use ecrs_env::{CommandInterface, EnvError, UiSession};
use std::io::{BufRead, BufReader, Cursor, Write};
use tracing::{debug, warn};

/// Prompt shown before each command.
pub const PROMPT: &str = "ECRS> ";

/// Terminal session reading one command per line.
///
/// `exit` or end of input ends the session. A failing command is reported
/// and the session continues.
pub struct TerminalSession {
    input: Box<dyn BufRead>,
    output: Box<dyn Write>,
    
    /// Commands the operator issued
    issued: usize,
}

impl TerminalSession {
    pub fn new(input: Box<dyn BufRead>, output: Box<dyn Write>) -> Self {
        Self {
            input,
            output,
            issued: 0,
        }
    }
    
    /// Session on the process's stdin/stdout.
    pub fn stdio() -> Self {
        Self::new(Box::new(BufReader::new(std::io::stdin())), Box::new(std::io::stdout()))
    }
    
    /// Session replaying fixed lines, printing nothing.
    pub fn scripted(lines: Vec<String>) -> Self {
        let mut text = lines.join("\n");
        text.push('\n');
        Self::new(Box::new(Cursor::new(text.into_bytes())), Box::new(std::io::sink()))
    }
    
    /// Number of commands issued so far.
    pub fn issued(&self) -> usize {
        self.issued
    }
    
    fn io_error(e: std::io::Error) -> EnvError {
        EnvError::Session(e.to_string())
    }
}

impl UiSession for TerminalSession {
    fn start(&mut self, commands: &mut dyn CommandInterface) -> Result<(), EnvError> {
        let mut line = String::new();
        loop {
            write!(self.output, "{}", PROMPT).map_err(Self::io_error)?;
            self.output.flush().map_err(Self::io_error)?;
            
            line.clear();
            if self.input.read_line(&mut line).map_err(Self::io_error)? == 0 {
                debug!("Session input closed");
                break;
            }
            
            let command = line.trim();
            match command {
                "" => continue,
                "exit" | "quit" => break,
                _ => {}
            }
            
            self.issued += 1;
            if let Err(e) = commands.apply_command(command) {
                warn!("{}", e);
                writeln!(self.output, "{}", e).map_err(Self::io_error)?;
            }
        }
        Ok(())
    }
}
