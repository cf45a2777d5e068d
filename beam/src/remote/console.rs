//! Terminal output for live remote progress

use std::io::Write;

use colored::Colorize;

use crate::remote::transport::OutputObserver;

/// Prints step headers, commands and remote output to stdout
#[derive(Debug, Default, Clone, Copy)]
pub struct ConsoleObserver;

impl OutputObserver for ConsoleObserver {
    fn step(&self, title: &str) {
        println!();
        println!("{}", title.bold().underline());
    }

    fn command(&self, _host: &str, command: &str) {
        println!("{} {}", "$".dimmed(), command.cyan());
    }

    fn output(&self, chunk: &str) {
        let mut stdout = std::io::stdout().lock();
        let _ = stdout.write_all(chunk.as_bytes());
        let _ = stdout.flush();
    }

    fn ok(&self) {
        println!("{}", "OK".green());
    }
}
