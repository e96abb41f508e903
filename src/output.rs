//! Console status lines in the `[INFO]` / `[WARN]` tag style.

use colored::*;

pub fn info(message: &str) {
    println!("{} {}", "[INFO]".blue(), message);
}

pub fn warn(message: &str) {
    println!("{} {}", "[WARN]".yellow(), message);
}

pub fn success(message: &str) {
    println!("{} {}", "[SUCCESS]".green(), message);
}

pub fn error(message: &str) {
    eprintln!("{} {}", "[ERROR]".red(), message);
}

pub fn heading(title: &str) {
    println!();
    println!("{}", title.bold());
    println!("{}", "─".repeat(title.chars().count()).dimmed());
}
