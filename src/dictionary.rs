//! Static translation tables.
//!
//! Hand-maintained translations are looked up before any remote request. A
//! dictionary directory is laid out as
//!
//! ```text
//! <dir>/translation/exact/<Type>.json
//! <dir>/translation/regex/<Type>.json
//! <dir>/translation_pre/{exact,regex}/Generic.json
//! <dir>/translation_post/{exact,regex}/Generic.json
//! ```
//!
//! Exact tables hold `[{"match": ..., "replacement": ...}]` and regex tables
//! hold `[{"pattern": ..., "replacement": ...}]` where the replacement may use
//! `$1`-style capture references. A missing file is an empty table.

use regex::Regex;
use serde::Deserialize;
use std::collections::HashMap;
use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::{debug, error};

use crate::context::TranslationType;

const TRANSLATION_DIR: &str = "translation";
const PRE_TRANSLATION_DIR: &str = "translation_pre";
const POST_TRANSLATION_DIR: &str = "translation_post";
const EXACT_DIR: &str = "exact";
const REGEX_DIR: &str = "regex";

#[derive(Debug)]
pub enum DictionaryError {
    /// The table exists but could not be read
    Io { path: PathBuf, source: io::Error },
    /// The table is not a JSON array of entries
    Parse { path: PathBuf, message: String },
    /// A pattern given to `Table::insert_regex` does not compile
    InvalidPattern { pattern: String, message: String },
}

impl fmt::Display for DictionaryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DictionaryError::Io { path, source } => {
                write!(f, "Failed to read table '{}': {}", path.display(), source)
            }
            DictionaryError::Parse { path, message } => {
                write!(f, "Failed to parse table '{}': {}", path.display(), message)
            }
            DictionaryError::InvalidPattern { pattern, message } => {
                write!(f, "Invalid pattern {:?}: {}", pattern, message)
            }
        }
    }
}

impl std::error::Error for DictionaryError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            DictionaryError::Io { source, .. } => Some(source),
            _ => None,
        }
    }
}

pub type DictionaryResult<T> = Result<T, DictionaryError>;

/// Returned when no exact or regex rule matched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NotFound;

impl fmt::Display for NotFound {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "no static translation")
    }
}

impl std::error::Error for NotFound {}

#[derive(Debug, Deserialize)]
struct ExactEntry {
    #[serde(rename = "match")]
    matched: String,
    replacement: String,
}

#[derive(Debug, Deserialize)]
struct RegexEntry {
    pattern: String,
    replacement: String,
}

/// One exact table plus one regex table.
#[derive(Debug, Clone, Default)]
pub struct Table {
    /// Entries in file order, used by substring rewriting.
    exact: Vec<(String, String)>,
    index: HashMap<String, usize>,
    regex: Vec<(Regex, String)>,
}

impl Table {
    pub fn new() -> Self {
        Table::default()
    }

    pub fn insert_exact(&mut self, matched: impl Into<String>, replacement: impl Into<String>) {
        let matched = matched.into();
        let replacement = replacement.into();
        match self.index.get(&matched) {
            Some(&i) => self.exact[i].1 = replacement,
            None => {
                self.index.insert(matched.clone(), self.exact.len());
                self.exact.push((matched, replacement));
            }
        }
    }

    pub fn insert_regex(
        &mut self,
        pattern: &str,
        replacement: impl Into<String>,
    ) -> DictionaryResult<()> {
        let regex = Regex::new(pattern).map_err(|e| DictionaryError::InvalidPattern {
            pattern: pattern.to_string(),
            message: e.to_string(),
        })?;
        self.regex.push((regex, replacement.into()));
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.exact.len() + self.regex.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn get_exact(&self, text: &str) -> Option<&str> {
        self.index.get(text).map(|&i| self.exact[i].1.as_str())
    }

    /// Applies every matching regex rule in table order. `None` if none matched.
    fn get_regex(&self, text: &str) -> Option<String> {
        let mut out = text.to_string();
        let mut matched = false;

        for (regex, replacement) in &self.regex {
            if !regex.is_match(&out) {
                continue;
            }
            matched = true;
            out = regex.replace_all(&out, replacement.as_str()).into_owned();
        }

        matched.then_some(out)
    }

    /// Substring replacement by every exact entry, then every regex rule.
    fn rewrite(&self, text: &str) -> String {
        let mut out = text.to_string();

        for (matched, replacement) in &self.exact {
            if !matched.is_empty() {
                out = out.replace(matched.as_str(), replacement);
            }
        }

        for (regex, replacement) in &self.regex {
            out = regex.replace_all(&out, replacement.as_str()).into_owned();
        }

        out
    }

    fn load(base: &Path, typ: TranslationType) -> DictionaryResult<Self> {
        let mut table = Table::new();

        let exact_path = base.join(EXACT_DIR).join(typ.file_name());
        if let Some(entries) = read_entries::<ExactEntry>(&exact_path)? {
            for entry in entries {
                if entry.matched.is_empty() {
                    continue;
                }
                table.insert_exact(entry.matched, entry.replacement);
            }
        }

        let regex_path = base.join(REGEX_DIR).join(typ.file_name());
        if let Some(entries) = read_entries::<RegexEntry>(&regex_path)? {
            for entry in entries {
                if entry.pattern.is_empty() {
                    continue;
                }
                // A broken rule should not take the whole table down
                if let Err(e) = table.insert_regex(&entry.pattern, entry.replacement) {
                    error!("{} in '{}', skipping", e, regex_path.display());
                }
            }
        }

        debug!(
            "Loaded {} entries for {} from {}",
            table.len(),
            typ,
            base.display()
        );

        Ok(table)
    }
}

/// Reads a JSON array of entries. `Ok(None)` when the file does not exist.
fn read_entries<T: for<'de> Deserialize<'de>>(path: &Path) -> DictionaryResult<Option<Vec<T>>> {
    let content = match fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
        Err(e) => {
            return Err(DictionaryError::Io {
                path: path.to_path_buf(),
                source: e,
            });
        }
    };

    serde_json::from_str(&content)
        .map(Some)
        .map_err(|e| DictionaryError::Parse {
            path: path.to_path_buf(),
            message: e.to_string(),
        })
}

/// All static tables, immutable once loaded.
#[derive(Debug, Clone, Default)]
pub struct Dictionary {
    tables: HashMap<TranslationType, Table>,
    pre: Table,
    post: Table,
}

impl Dictionary {
    /// An empty dictionary: every lookup misses and rewrites only trim.
    pub fn new() -> Self {
        Dictionary::default()
    }

    /// Loads every table under `dir`. A missing directory gives an empty dictionary.
    pub fn load(dir: &Path) -> DictionaryResult<Self> {
        let mut dictionary = Dictionary::new();

        let translation = dir.join(TRANSLATION_DIR);
        for typ in TranslationType::ALL {
            dictionary
                .tables
                .insert(typ, Table::load(&translation, typ)?);
        }

        dictionary.pre = Table::load(&dir.join(PRE_TRANSLATION_DIR), TranslationType::Generic)?;
        dictionary.post = Table::load(&dir.join(POST_TRANSLATION_DIR), TranslationType::Generic)?;

        Ok(dictionary)
    }

    pub fn table_mut(&mut self, typ: TranslationType) -> &mut Table {
        self.tables.entry(typ).or_default()
    }

    pub fn pre_table_mut(&mut self) -> &mut Table {
        &mut self.pre
    }

    pub fn post_table_mut(&mut self) -> &mut Table {
        &mut self.post
    }

    fn lookup_in(&self, text: &str, typ: TranslationType) -> Option<String> {
        let table = self.tables.get(&typ)?;
        table
            .get_exact(text)
            .map(str::to_string)
            .or_else(|| table.get_regex(text))
    }

    /// Static translation of `text` for `typ`, falling back to the Generic bucket.
    pub fn lookup(&self, text: &str, typ: TranslationType) -> Result<String, NotFound> {
        let text = text.trim();

        if let Some(found) = self.lookup_in(text, typ) {
            return Ok(found);
        }

        if typ != TranslationType::Generic {
            if let Some(found) = self.lookup_in(text, TranslationType::Generic) {
                return Ok(found);
            }
        }

        Err(NotFound)
    }

    /// Source text rewriting applied before any lookup.
    pub fn pre_translate(&self, text: &str) -> String {
        self.pre.rewrite(text.trim())
    }

    /// Rewriting applied to remote translations.
    pub fn post_translate(&self, text: &str) -> String {
        self.post.rewrite(text.trim())
    }
}
