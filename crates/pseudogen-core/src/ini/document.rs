//! Untyped sectioned key/value documents.
//!
//! This layer only knows about `[section]` headers and `key = value` lines.
//! It does not know what a column or a rule is; that happens in `decode`.

use std::collections::HashSet;
use std::sync::LazyLock;

use regex::Regex;

use crate::error::ParseIssue;

static HEADER_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\[\s*([A-Za-z0-9_.\-]+)\s*\]$").expect("section header regex is valid")
});

/// A single `key = value` line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    pub key: String,
    pub value: String,
    /// 1-based source line, 0 for entries built in memory.
    pub line: usize,
}

/// A `[name]` header and the entries under it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Section {
    pub name: String,
    pub line: usize,
    pub entries: Vec<Entry>,
}

impl Section {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            line: 0,
            entries: Vec::new(),
        }
    }

    pub fn get(&self, key: &str) -> Option<&Entry> {
        self.entries.iter().find(|e| e.key == key)
    }

    /// Append `key = value`, skipping blank values.
    pub fn set(&mut self, key: &str, value: impl Into<String>) {
        let value = value.into();
        if value.trim().is_empty() {
            return;
        }
        self.push(key, value);
    }

    /// Append `key = value` when set. `Some("")` is written as a bare
    /// `key =` so that it reads back as an empty value rather than a
    /// missing one.
    pub fn set_opt<T: ToString>(&mut self, key: &str, value: Option<T>) {
        if let Some(v) = value {
            self.push(key, v.to_string());
        }
    }

    fn push(&mut self, key: &str, value: String) {
        self.entries.push(Entry {
            key: key.to_string(),
            value,
            line: 0,
        });
    }

    pub fn set_list<T: ToString>(&mut self, key: &str, items: &[T]) {
        let joined = items
            .iter()
            .map(|i| i.to_string())
            .collect::<Vec<_>>()
            .join(",");
        self.set(key, joined);
    }
}

/// A parsed (or to-be-rendered) document.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Document {
    pub sections: Vec<Section>,
}

impl Document {
    /// Split text into sections, collecting every structural problem.
    ///
    /// Full-line comments start with `;` or `#`. Keys are lower-cased and
    /// may be separated from their value by `=` or `:`, whichever comes first.
    pub fn parse(text: &str) -> (Self, Vec<ParseIssue>) {
        let mut doc = Document::default();
        let mut issues = Vec::new();
        let mut seen_sections: HashSet<String> = HashSet::new();
        // false after a malformed or duplicate header: its lines are skipped
        // instead of being reported one by one.
        let mut in_valid_section = false;
        let mut skipping = false;

        for (idx, raw) in text.lines().enumerate() {
            let line_no = idx + 1;
            let line = raw.trim();
            if line.is_empty() || line.starts_with(';') || line.starts_with('#') {
                continue;
            }

            if line.starts_with('[') {
                match HEADER_RE.captures(line) {
                    Some(caps) => {
                        let name = caps[1].to_ascii_lowercase();
                        if !seen_sections.insert(name.clone()) {
                            issues.push(ParseIssue::new(
                                Some(&name),
                                Some(line_no),
                                "duplicate section",
                            ));
                            in_valid_section = false;
                            skipping = true;
                            continue;
                        }
                        doc.sections.push(Section {
                            name,
                            line: line_no,
                            entries: Vec::new(),
                        });
                        in_valid_section = true;
                        skipping = false;
                    }
                    None => {
                        issues.push(ParseIssue::new(
                            None,
                            Some(line_no),
                            format!("malformed section header '{}'", line),
                        ));
                        in_valid_section = false;
                        skipping = true;
                    }
                }
                continue;
            }

            if skipping {
                continue;
            }

            let Some(split_at) = line.find(['=', ':']) else {
                issues.push(ParseIssue::new(
                    current_name(&doc, in_valid_section),
                    Some(line_no),
                    format!("expected 'key = value', found '{}'", line),
                ));
                continue;
            };
            let key = line[..split_at].trim().to_ascii_lowercase();
            let value = line[split_at + 1..].trim().to_string();

            if key.is_empty() {
                issues.push(ParseIssue::new(
                    current_name(&doc, in_valid_section),
                    Some(line_no),
                    "missing key before delimiter",
                ));
                continue;
            }

            if !in_valid_section {
                issues.push(ParseIssue::new(
                    None,
                    Some(line_no),
                    format!("'{}' appears before any section header", key),
                ));
                continue;
            }

            let Some(section) = doc.sections.last_mut() else {
                continue;
            };
            if section.get(&key).is_some() {
                issues.push(ParseIssue::new(
                    Some(&section.name),
                    Some(line_no),
                    format!("duplicate key '{}'", key),
                ));
                continue;
            }
            section.entries.push(Entry {
                key,
                value,
                line: line_no,
            });
        }

        (doc, issues)
    }

    /// Render as `[name]` blocks of `key = value` lines, one blank line apart.
    pub fn render(&self) -> String {
        let mut out = String::new();
        for (i, section) in self.sections.iter().enumerate() {
            if i > 0 {
                out.push('\n');
            }
            out.push('[');
            out.push_str(&section.name);
            out.push_str("]\n");
            for entry in &section.entries {
                out.push_str(&entry.key);
                out.push_str(" =");
                if !entry.value.is_empty() {
                    out.push(' ');
                    out.push_str(&entry.value);
                }
                out.push('\n');
            }
        }
        out
    }
}

fn current_name(doc: &Document, in_valid_section: bool) -> Option<&str> {
    if in_valid_section {
        doc.sections.last().map(|s| s.name.as_str())
    } else {
        None
    }
}
