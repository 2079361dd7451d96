//! Startup/config failures exit with code 3 (spec §6); task outcomes exit
//! with 0/1/2 from [`crate::output`]. This module only ever handles the
//! former — a task reaching its own terminal state is not an `Err` here.

use colored::Colorize;

pub fn handle_startup_error(err: anyhow::Error) -> ! {
    eprintln!("{} {}", "Error:".red().bold(), err);
    std::process::exit(3);
}
