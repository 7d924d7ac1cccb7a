use std::collections::VecDeque;
use std::io::{self, Write};
use std::thread;
use std::time::Duration;

use crossterm::event::{self, Event, KeyCode, KeyEventKind};

use super::control::ControlFlags;

/// Interactive commands of the console.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Quit,
    Calibrate,
    /// Unknown key or bare enter: show the prompt again.
    Prompt,
}

impl Command {
    pub fn from_key(key: char) -> Self {
        match key.to_ascii_lowercase() {
            'q' => Command::Quit,
            'c' => Command::Calibrate,
            _ => Command::Prompt,
        }
    }
}

/// A source of console commands that can be polled with a timeout.
pub trait CommandInput {
    /// Wait up to `timeout` for the next command.
    fn poll(&mut self, timeout: Duration) -> io::Result<Option<Command>>;
}

/// Keys typed on the controlling terminal.
#[derive(Debug, Default)]
pub struct TerminalInput;

impl TerminalInput {
    pub fn new() -> Self {
        Self
    }
}

impl CommandInput for TerminalInput {
    fn poll(&mut self, timeout: Duration) -> io::Result<Option<Command>> {
        if !event::poll(timeout)? {
            return Ok(None);
        }
        match event::read()? {
            Event::Key(key) if key.kind == KeyEventKind::Press => Ok(match key.code {
                KeyCode::Char(c) => Some(Command::from_key(c)),
                KeyCode::Enter => Some(Command::Prompt),
                _ => None,
            }),
            _ => Ok(None),
        }
    }
}

/// Replays a fixed list of polls. `None` entries are idle polls.
#[derive(Debug, Default)]
pub struct ScriptedInput {
    script: VecDeque<Option<Command>>,
}

impl ScriptedInput {
    pub fn new(script: impl IntoIterator<Item = Option<Command>>) -> Self {
        Self {
            script: script.into_iter().collect(),
        }
    }
}

impl CommandInput for ScriptedInput {
    fn poll(&mut self, timeout: Duration) -> io::Result<Option<Command>> {
        match self.script.pop_front() {
            Some(Some(command)) => Ok(Some(command)),
            _ => {
                thread::sleep(timeout);
                Ok(None)
            }
        }
    }
}

fn prompt() {
    print!(">> ");
    let _ = io::stdout().flush();
}

/// Serve console commands until something requests a stop.
///
/// Returns when `flags.should_stop()` turns true, whether from a quit
/// command, a signal or the render loop ending on its own.
pub fn run_command_loop<I: CommandInput>(
    input: &mut I,
    flags: &ControlFlags,
    poll: Duration,
) -> io::Result<()> {
    println!("Commands: c = calibrate tracker, q = quit");
    prompt();
    while !flags.should_stop() {
        match input.poll(poll)? {
            Some(Command::Quit) => {
                log::info!("quit requested");
                flags.request_stop();
            }
            Some(Command::Calibrate) => {
                flags.request_calibration();
                println!("Calibration requested");
                prompt();
            }
            Some(Command::Prompt) => prompt(),
            None => {}
        }
    }
    println!();
    Ok(())
}
