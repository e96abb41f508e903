//! Interactive walk-through of every finding.
//!
//! Findings are grouped into sections. Each item gets a `y/n/a/s/q` prompt:
//!
//! - `y` accept this item
//! - `n` (or anything else) skip this item
//! - `a` accept this and every remaining item in the section
//! - `s` skip the rest of the section
//! - `q` quit without changing anything

use std::fmt;
use std::io::{self, BufRead, Write};

use anyhow::Result;
use colored::*;

use crate::classify::ClassificationResult;
use crate::gaps::GapResult;
use crate::manifest::{Entry, ListKind};
use crate::output;

/// One pending manifest change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    Move {
        entry: String,
        from: ListKind,
        to: ListKind,
    },
    Add {
        entry: String,
        list: ListKind,
        comment: Option<String>,
    },
    Remove {
        entry: String,
        list: ListKind,
    },
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Action::Move { entry, from, to } => write!(f, "{}: {} → {}", entry, from, to),
            Action::Add {
                entry,
                list,
                comment: Some(comment),
            } => write!(f, "{} ({}) → {}", entry, comment, list),
            Action::Add { entry, list, .. } => write!(f, "{} → {}", entry, list),
            Action::Remove { entry, list } => write!(f, "{} ✗ {}", entry, list),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Approve,
    Reject,
    ApproveRest,
    RejectRest,
    Abort,
}

impl Decision {
    /// Map a typed answer to a decision. Only the first character counts;
    /// anything unrecognised, including an empty line, skips the item.
    pub fn from_input(input: &str) -> Self {
        match input.trim().chars().next() {
            Some('y' | 'Y') => Decision::Approve,
            Some('a' | 'A') => Decision::ApproveRest,
            Some('s' | 'S') => Decision::RejectRest,
            Some('q' | 'Q') => Decision::Abort,
            _ => Decision::Reject,
        }
    }
}

/// Source of review decisions.
pub trait Prompter {
    fn ask(&mut self, section: &str, item: &str) -> Result<Decision>;
    fn confirm(&mut self, question: &str) -> Result<bool>;
}

/// Prompts on stdout and reads answers from stdin.
pub struct TerminalPrompter<R> {
    input: R,
}

impl TerminalPrompter<io::StdinLock<'static>> {
    pub fn stdin() -> Self {
        Self {
            input: io::stdin().lock(),
        }
    }
}

impl<R: BufRead> TerminalPrompter<R> {
    pub fn new(input: R) -> Self {
        Self { input }
    }

    fn read_answer(&mut self) -> Result<Option<String>> {
        let mut answer = String::new();
        if self.input.read_line(&mut answer)? == 0 {
            return Ok(None);
        }
        Ok(Some(answer))
    }
}

impl<R: BufRead> Prompter for TerminalPrompter<R> {
    fn ask(&mut self, _section: &str, item: &str) -> Result<Decision> {
        print!("  {} {} ", item, "[y/n/a/s/q]".dimmed());
        io::stdout().flush()?;
        // End of input is treated as quitting.
        Ok(match self.read_answer()? {
            Some(answer) => Decision::from_input(&answer),
            None => Decision::Abort,
        })
    }

    fn confirm(&mut self, question: &str) -> Result<bool> {
        loop {
            print!("{} (y/n): ", question);
            io::stdout().flush()?;

            let Some(answer) = self.read_answer()? else {
                return Ok(false);
            };
            match answer.trim().to_lowercase().as_str() {
                "y" | "yes" => return Ok(true),
                "n" | "no" => return Ok(false),
                _ => println!("Please answer yes (y) or no (n)."),
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReviewOutcome {
    /// Nothing was found.
    NoChanges,
    /// Findings were reviewed and none accepted.
    NothingAccepted,
    /// `q` was pressed.
    Aborted,
    /// The final confirmation was declined.
    Declined(Vec<Action>),
    Accepted(Vec<Action>),
}

#[derive(Debug, Clone)]
struct Section {
    title: String,
    items: Vec<(String, Action)>,
}

fn add_item(entry: &Entry, list: ListKind) -> (String, Action) {
    let label = match &entry.comment {
        Some(name) => format!("{} ({}): add to {}", entry.id, name, list),
        None => format!("{}: add to {}", entry.id, list),
    };
    let action = Action::Add {
        entry: entry.id.clone(),
        list,
        comment: entry.comment.clone(),
    };
    (label, action)
}

fn remove_item(entry: &Entry, list: ListKind) -> (String, Action) {
    let label = match &entry.comment {
        Some(name) => format!("{} ({}): remove from {}", entry.id, name, list),
        None => format!("{}: remove from {}", entry.id, list),
    };
    let action = Action::Remove {
        entry: entry.id.clone(),
        list,
    };
    (label, action)
}

fn build_sections(classification: &ClassificationResult, gaps: &GapResult) -> Vec<Section> {
    let mut sections = vec![Section {
        title: String::from("Misclassified entries"),
        items: classification
            .moves
            .iter()
            .map(|m| {
                let mut label = format!("{}: move {} → {}", m.entry, m.from, m.to);
                if m.known {
                    label.push_str(" (known cask)");
                }
                let action = Action::Move {
                    entry: m.entry.clone(),
                    from: m.from,
                    to: m.to,
                };
                (label, action)
            })
            .collect(),
    }];

    for kind in ListKind::ALL {
        sections.push(Section {
            title: format!("Missing {} (installed, not in manifest)", kind.label()),
            items: gaps.missing.get(kind).iter().map(|e| add_item(e, kind)).collect(),
        });
    }
    for kind in ListKind::ALL {
        sections.push(Section {
            title: format!("Extra {} (in manifest, not installed)", kind.label()),
            items: gaps.extra.get(kind).iter().map(|e| remove_item(e, kind)).collect(),
        });
    }

    sections.retain(|section| !section.items.is_empty());
    sections
}

/// Prompt through one section. `None` means the user quit.
fn review_section(section: &Section, prompter: &mut dyn Prompter) -> Result<Option<Vec<Action>>> {
    output::heading(&format!("{} ({})", section.title, section.items.len()));

    let mut accepted = Vec::new();
    let mut accept_rest = false;
    for (label, action) in &section.items {
        if accept_rest {
            println!("  {} {}", "✓".green(), label);
            accepted.push(action.clone());
            continue;
        }
        match prompter.ask(&section.title, label)? {
            Decision::Approve => accepted.push(action.clone()),
            Decision::Reject => {}
            Decision::ApproveRest => {
                accepted.push(action.clone());
                accept_rest = true;
            }
            Decision::RejectRest => break,
            Decision::Abort => return Ok(None),
        }
    }
    Ok(Some(accepted))
}

pub fn print_summary(actions: &[Action]) {
    output::heading("Planned changes");
    let groups: [(&str, fn(&Action) -> bool); 3] = [
        ("Move", |a| matches!(a, Action::Move { .. })),
        ("Add", |a| matches!(a, Action::Add { .. })),
        ("Remove", |a| matches!(a, Action::Remove { .. })),
    ];
    for (title, belongs) in groups {
        let group: Vec<&Action> = actions.iter().filter(|a| belongs(a)).collect();
        if group.is_empty() {
            continue;
        }
        println!("{} ({}):", title.bold(), group.len());
        for action in group {
            println!("  {}", action);
        }
    }
}

/// Walk the user through every finding and collect accepted actions. The
/// final confirmation is only asked when `apply` is set.
pub fn review(
    classification: &ClassificationResult,
    gaps: &GapResult,
    apply: bool,
    prompter: &mut dyn Prompter,
) -> Result<ReviewOutcome> {
    let sections = build_sections(classification, gaps);
    if sections.is_empty() {
        return Ok(ReviewOutcome::NoChanges);
    }

    let mut actions = Vec::new();
    for section in &sections {
        match review_section(section, prompter)? {
            Some(accepted) => actions.extend(accepted),
            None => return Ok(ReviewOutcome::Aborted),
        }
    }

    if actions.is_empty() {
        return Ok(ReviewOutcome::NothingAccepted);
    }

    print_summary(&actions);
    if apply {
        println!();
        if !prompter.confirm(&format!("Apply {} change(s) to the manifest?", actions.len()))? {
            return Ok(ReviewOutcome::Declined(actions));
        }
    }
    Ok(ReviewOutcome::Accepted(actions))
}
