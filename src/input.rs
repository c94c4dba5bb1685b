use std::io::{self, BufRead};
use std::sync::mpsc::Sender;
use std::thread::{self, JoinHandle};

use crate::alarm::scheduler::Command;

/// Spawn the interactive-command listener: one line of stdin per command,
/// posted onto the channel the scheduler waits on. Exits when stdin closes
/// or the scheduler drops its receiver.
pub fn spawn_stdin_listener(commands: Sender<Command>) -> JoinHandle<()> {
    thread::spawn(move || {
        let stdin = io::stdin();
        for line in stdin.lock().lines() {
            let Ok(line) = line else {
                break;
            };
            match parse_command(&line) {
                Some(command) => {
                    if commands.send(command).is_err() {
                        break;
                    }
                }
                None => {
                    if !line.trim().is_empty() {
                        println!("unrecognized command '{}', expected fire or kill", line.trim());
                    }
                }
            }
        }
    })
}

fn parse_command(line: &str) -> Option<Command> {
    match line.trim() {
        "fire" => Some(Command::Fire),
        "kill" => Some(Command::Kill),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recognizes_the_two_commands() {
        assert_eq!(parse_command("fire"), Some(Command::Fire));
        assert_eq!(parse_command("kill"), Some(Command::Kill));
        assert_eq!(parse_command("  kill \n"), Some(Command::Kill));
    }

    #[test]
    fn everything_else_is_ignored() {
        assert_eq!(parse_command(""), None);
        assert_eq!(parse_command("snooze"), None);
        assert_eq!(parse_command("FIRE"), None);
    }
}
