//! Reading and re-rendering the `brew.sh` manifest.
//!
//! The manifest is a shell script with three array declarations:
//!
//! ```text
//! packages=(
//!   "git"
//!   "tree"
//!
//! )
//! apps=(
//!   "google-chrome"
//! )
//! app_store=(
//!   "497799835" # Xcode
//! )
//! ```
//!
//! Everything outside those three blocks is opaque script text and is carried
//! through a rewrite byte for byte.

use std::fmt;
use std::fs;
use std::path::Path;
use std::sync::OnceLock;

use regex::Regex;
use tracing::{debug, warn};

use crate::error::AuditError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ListKind {
    Packages,
    Apps,
    AppStore,
}

impl ListKind {
    pub const ALL: [ListKind; 3] = [ListKind::Packages, ListKind::Apps, ListKind::AppStore];

    /// Array name as written in the manifest.
    pub fn name(self) -> &'static str {
        match self {
            ListKind::Packages => "packages",
            ListKind::Apps => "apps",
            ListKind::AppStore => "app_store",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            ListKind::Packages => "command-line packages",
            ListKind::Apps => "GUI applications",
            ListKind::AppStore => "App Store apps",
        }
    }

    fn from_name(name: &str) -> Option<Self> {
        ListKind::ALL.into_iter().find(|kind| kind.name() == name)
    }
}

impl fmt::Display for ListKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// One manifest entry. `comment` is only meaningful in `app_store`, where it
/// holds the human-readable app name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    pub id: String,
    pub comment: Option<String>,
}

impl Entry {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            comment: None,
        }
    }

    pub fn with_comment(id: impl Into<String>, comment: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            comment: Some(comment.into()),
        }
    }
}

/// Zero-based line indices of a block: the `name=(` opener and the `)` closer.
/// Entries live in `opener + 1 .. closer`. A one-line declaration has
/// `opener == closer`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockSpan {
    pub opener: usize,
    pub closer: usize,
}

impl BlockSpan {
    pub fn start(&self) -> usize {
        self.opener + 1
    }
}

#[derive(Debug, Clone)]
pub struct ManagedList {
    pub kind: ListKind,
    pub entries: Vec<Entry>,
    pub span: Option<BlockSpan>,
    indent: String,
}

impl ManagedList {
    fn new(kind: ListKind) -> Self {
        Self {
            kind,
            entries: Vec::new(),
            span: None,
            indent: String::from("  "),
        }
    }

    pub fn contains(&self, id: &str) -> bool {
        self.entries.iter().any(|entry| entry.id == id)
    }

    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|entry| entry.id.as_str())
    }
}

/// Owned list contents, detached from any source spans.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Lists {
    pub packages: Vec<Entry>,
    pub apps: Vec<Entry>,
    pub app_store: Vec<Entry>,
}

impl Lists {
    pub fn get(&self, kind: ListKind) -> &Vec<Entry> {
        match kind {
            ListKind::Packages => &self.packages,
            ListKind::Apps => &self.apps,
            ListKind::AppStore => &self.app_store,
        }
    }

    pub fn get_mut(&mut self, kind: ListKind) -> &mut Vec<Entry> {
        match kind {
            ListKind::Packages => &mut self.packages,
            ListKind::Apps => &mut self.apps,
            ListKind::AppStore => &mut self.app_store,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Manifest {
    lines: Vec<String>,
    pub packages: ManagedList,
    pub apps: ManagedList,
    pub app_store: ManagedList,
}

fn opener_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^(packages|apps|app_store)=\(").expect("valid regex"))
}

fn app_store_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r#"^\s*"(\d+)"\s*#\s*(\S.*?)\s*$"#).expect("valid regex"))
}

#[derive(Clone, Copy)]
enum ScanState {
    Outside,
    Inside { kind: ListKind, opener: usize },
}

/// Strip comment, whitespace and quotes from a name-list line.
fn normalize_name(line: &str) -> Option<String> {
    let without_comment = match line.find('#') {
        Some(idx) => &line[..idx],
        None => line,
    };
    let name = without_comment
        .trim()
        .trim_matches(|c| c == '"' || c == '\'')
        .trim();
    if name.is_empty() {
        None
    } else {
        Some(name.to_string())
    }
}

const UNNAMED_APP_STORE_ENTRY: &str = "app_store entry is not `\"<id>\" # <name>`, skipping";

/// Entries written between the parentheses of a one-line declaration such as
/// `packages=("git" "tree")`. An `app_store` entry cannot carry its `# name`
/// comment on such a line, so none are taken from it.
fn inline_entries(kind: ListKind, inner: &str, idx: usize) -> Vec<Entry> {
    let names: Vec<String> = inner.split_whitespace().filter_map(normalize_name).collect();
    match kind {
        ListKind::AppStore => {
            if !names.is_empty() {
                warn!(line = idx + 1, "{}", UNNAMED_APP_STORE_ENTRY);
            }
            Vec::new()
        }
        _ => names.into_iter().map(Entry::new).collect(),
    }
}

fn leading_whitespace(line: &str) -> &str {
    let trimmed = line.trim_start();
    &line[..line.len() - trimmed.len()]
}

impl Manifest {
    /// Read and parse the manifest at `path`.
    pub fn load(path: &Path) -> Result<Self, AuditError> {
        if !path.is_file() {
            return Err(AuditError::ManifestMissing(path.to_path_buf()));
        }
        let text = fs::read_to_string(path).map_err(|source| AuditError::ManifestUnreadable {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&text)
    }

    pub fn parse(text: &str) -> Result<Self, AuditError> {
        let lines: Vec<String> = text.split_inclusive('\n').map(str::to_string).collect();
        let mut packages = ManagedList::new(ListKind::Packages);
        let mut apps = ManagedList::new(ListKind::Apps);
        let mut app_store = ManagedList::new(ListKind::AppStore);
        let mut seen_indent = [false; 3];
        let mut state = ScanState::Outside;

        for (idx, raw) in lines.iter().enumerate() {
            let line = raw.trim_end_matches(['\n', '\r']);
            match state {
                ScanState::Outside => {
                    let Some(kind) = opener_re()
                        .captures(line)
                        .and_then(|caps| ListKind::from_name(&caps[1]))
                    else {
                        continue;
                    };
                    let list = match kind {
                        ListKind::Packages => &mut packages,
                        ListKind::Apps => &mut apps,
                        ListKind::AppStore => &mut app_store,
                    };
                    if list.span.is_some() {
                        warn!(list = %kind, line = idx + 1, "ignoring repeated declaration");
                        continue;
                    }
                    let rest = &line[kind.name().len() + 2..];
                    let rest = &rest[..rest.find('#').unwrap_or(rest.len())];
                    if let Some(close) = rest.find(')') {
                        list.entries = inline_entries(kind, &rest[..close], idx);
                        list.span = Some(BlockSpan {
                            opener: idx,
                            closer: idx,
                        });
                        debug!(list = %kind, line = idx + 1, "one-line block");
                        continue;
                    }
                    debug!(list = %kind, line = idx + 1, "block opened");
                    state = ScanState::Inside { kind, opener: idx };
                }
                ScanState::Inside { kind, opener } => {
                    let list = match kind {
                        ListKind::Packages => &mut packages,
                        ListKind::Apps => &mut apps,
                        ListKind::AppStore => &mut app_store,
                    };
                    if line.trim_start().starts_with(')') {
                        let entries = list.entries.len();
                        debug!(list = %kind, line = idx + 1, entries, "block closed");
                        list.span = Some(BlockSpan { opener, closer: idx });
                        state = ScanState::Outside;
                        continue;
                    }

                    let entry = match kind {
                        ListKind::AppStore => match app_store_re().captures(line) {
                            Some(caps) => Some(Entry::with_comment(&caps[1], &caps[2])),
                            None => {
                                if normalize_name(line).is_some() {
                                    warn!(line = idx + 1, "{}", UNNAMED_APP_STORE_ENTRY);
                                }
                                None
                            }
                        },
                        _ => normalize_name(line).map(Entry::new),
                    };
                    if let Some(entry) = entry {
                        let slot = kind as usize;
                        if !seen_indent[slot] {
                            list.indent = leading_whitespace(line).to_string();
                            seen_indent[slot] = true;
                        }
                        list.entries.push(entry);
                    }
                }
            }
        }

        if let ScanState::Inside { kind, opener } = state {
            return Err(AuditError::UnterminatedBlock {
                list: kind,
                line: opener + 1,
            });
        }

        Ok(Self {
            lines,
            packages,
            apps,
            app_store,
        })
    }

    pub fn list(&self, kind: ListKind) -> &ManagedList {
        match kind {
            ListKind::Packages => &self.packages,
            ListKind::Apps => &self.apps,
            ListKind::AppStore => &self.app_store,
        }
    }

    /// Owned copies of the three lists as parsed.
    pub fn lists(&self) -> Lists {
        Lists {
            packages: self.packages.entries.clone(),
            apps: self.apps.entries.clone(),
            app_store: self.app_store.entries.clone(),
        }
    }

    /// The original text.
    pub fn source(&self) -> String {
        self.lines.concat()
    }

    /// Rebuild the manifest with each managed block replaced by `lists`.
    ///
    /// The output is the original file cut at block boundaries: unmanaged
    /// spans are copied verbatim and blocks are rendered fresh, in the order
    /// they occur in the file. A list with no block in the file is appended
    /// at the end when it has entries.
    pub fn render(&self, lists: &Lists) -> String {
        let mut blocks: Vec<(BlockSpan, &ManagedList)> = ListKind::ALL
            .iter()
            .filter_map(|kind| {
                let list = self.list(*kind);
                list.span.map(|span| (span, list))
            })
            .collect();
        blocks.sort_by_key(|(span, _)| span.opener);

        let mut out = String::new();
        let mut cursor = 0;
        for (span, list) in blocks {
            out.extend(self.lines[cursor..span.opener].iter().map(String::as_str));
            let terminated = self.lines[span.closer].ends_with('\n');
            out.push_str(&render_block(list.kind, lists.get(list.kind), &list.indent, terminated));
            cursor = span.closer + 1;
        }
        out.extend(self.lines[cursor..].iter().map(String::as_str));

        for kind in ListKind::ALL {
            let list = self.list(kind);
            let entries = lists.get(kind);
            if list.span.is_some() || entries.is_empty() {
                continue;
            }
            if !out.is_empty() {
                if !out.ends_with('\n') {
                    out.push('\n');
                }
                out.push('\n');
            }
            out.push_str(&render_block(kind, entries, &list.indent, true));
        }
        out
    }
}

fn render_block(kind: ListKind, entries: &[Entry], indent: &str, terminated: bool) -> String {
    let mut block = format!("{}=(\n", kind.name());
    for entry in entries {
        block.push_str(indent);
        block.push('"');
        block.push_str(&entry.id);
        block.push('"');
        if kind == ListKind::AppStore {
            if let Some(comment) = &entry.comment {
                block.push_str(" # ");
                block.push_str(comment);
            }
        }
        block.push('\n');
    }
    if !entries.is_empty() {
        block.push('\n');
    }
    block.push(')');
    if terminated {
        block.push('\n');
    }
    block
}
