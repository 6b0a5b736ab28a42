//! Patch container format.
//!
//! ```text
//! > RPGMAKER TRANS PATCH FILE VERSION 3.2
//! > BEGIN STRING
//! 短剣
//! > CONTEXT: Weapons/1/name/ < UNTRANSLATED
//!
//! > END STRING
//!
//! ```
//!
//! Source and translation lines are stored escaped (see [`crate::text::escape`]).
//! A `CONTEXT` line that follows translation text opens a new unit.

use std::fmt;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use crate::block::{PatchEntry, TranslationUnit};
use crate::engine::Engine;
use crate::text::escape;
use crate::wrap::wrap;

const MARKER: &str = "> ";
const BEGIN_STRING: &str = "BEGIN STRING";
const END_STRING: &str = "END STRING";
const CONTEXT: &str = "CONTEXT";
const UNTRANSLATED: &str = " < UNTRANSLATED";

#[derive(Debug)]
pub enum PatchError {
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    MissingHeader {
        path: PathBuf,
    },
    UnsupportedVersion {
        path: PathBuf,
        version: String,
    },
    Malformed {
        path: PathBuf,
        line: usize,
        message: String,
    },
}

impl fmt::Display for PatchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PatchError::Io { path, source } => write!(f, "{}: {}", path.display(), source),
            PatchError::MissingHeader { path } => {
                write!(f, "{}: missing patch version header", path.display())
            }
            PatchError::UnsupportedVersion { path, version } => {
                write!(f, "{}: unsupported patch version {:?}", path.display(), version)
            }
            PatchError::Malformed {
                path,
                line,
                message,
            } => write!(f, "{}:{}: {}", path.display(), line, message),
        }
    }
}

impl std::error::Error for PatchError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            PatchError::Io { source, .. } => Some(source),
            _ => None,
        }
    }
}

pub type PatchResult<T> = Result<T, PatchError>;

/// Where the parser is inside the current entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Section {
    Outside,
    Original,
    Translation,
}

/// One parsed patch file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PatchFile {
    pub path: PathBuf,
    /// Header line without the leading `> `.
    pub version: String,
    pub engine: Engine,
    pub entries: Vec<PatchEntry>,
}

impl PatchFile {
    pub async fn load(path: &Path) -> PatchResult<PatchFile> {
        let content = tokio::fs::read_to_string(path)
            .await
            .map_err(|source| PatchError::Io {
                path: path.to_path_buf(),
                source,
            })?;
        PatchFile::parse(path, &content)
    }

    pub fn parse(path: &Path, content: &str) -> PatchResult<PatchFile> {
        debug!("Parsing {}", path.display());

        let mut lines = content.lines().enumerate();

        let version = match lines.next() {
            Some((_, header)) if header.starts_with(MARKER) => header[MARKER.len()..].to_string(),
            _ => {
                return Err(PatchError::MissingHeader {
                    path: path.to_path_buf(),
                });
            }
        };
        let engine = Engine::from_header(&version).ok_or_else(|| PatchError::UnsupportedVersion {
            path: path.to_path_buf(),
            version: version.clone(),
        })?;

        let malformed = |line: usize, message: &str| PatchError::Malformed {
            path: path.to_path_buf(),
            line: line + 1,
            message: message.to_string(),
        };

        let mut entries = Vec::new();
        let mut section = Section::Outside;
        let mut entry = PatchEntry::default();
        let mut contexts: Vec<String> = Vec::new();
        let mut text = String::new();

        for (n, line) in lines {
            let Some(marker) = line.strip_prefix(MARKER) else {
                match section {
                    Section::Original => {
                        entry.original.push_str(line);
                        entry.original.push('\n');
                    }
                    Section::Translation => {
                        text.push_str(line);
                        text.push('\n');
                    }
                    Section::Outside if line.is_empty() => {}
                    Section::Outside => warn!("{}:{}: text outside of an entry", path.display(), n + 1),
                }
                continue;
            };

            if marker.starts_with(BEGIN_STRING) {
                if section != Section::Outside {
                    return Err(malformed(n, "BEGIN STRING inside an entry"));
                }
                section = Section::Original;
            } else if let Some(context) = marker.strip_prefix(CONTEXT) {
                if section == Section::Outside {
                    return Err(malformed(n, "CONTEXT outside of an entry"));
                }
                if section == Section::Translation && !text.is_empty() {
                    entry.units.push(finish_unit(&mut contexts, &mut text));
                }
                let context = context.strip_suffix(UNTRANSLATED).unwrap_or(context);
                contexts.push(context.to_string());
                section = Section::Translation;
            } else if marker.starts_with(END_STRING) {
                if section == Section::Outside {
                    return Err(malformed(n, "END STRING without BEGIN STRING"));
                }
                if !contexts.is_empty() {
                    entry.units.push(finish_unit(&mut contexts, &mut text));
                }
                entries.push(std::mem::take(&mut entry));
                section = Section::Outside;
            } else {
                warn!("{}:{}: unknown marker {:?}", path.display(), n + 1, line);
            }
        }

        if section != Section::Outside {
            return Err(malformed(content.lines().count(), "unterminated entry"));
        }

        Ok(PatchFile {
            path: path.to_path_buf(),
            version,
            engine,
            entries,
        })
    }

    /// Serialises the file. Touched units of wrappable types are wrapped to
    /// `line_length` first.
    pub fn render(&self, line_length: usize, tolerance: usize) -> String {
        let mut out = format!("{}{}\n", MARKER, self.version);

        for entry in &self.entries {
            out.push_str("> BEGIN STRING\n");
            out.push_str(&entry.original);

            for unit in &entry.units {
                for context in &unit.contexts {
                    out.push_str(MARKER);
                    out.push_str(CONTEXT);
                    out.push_str(context);
                    if !unit.is_translated {
                        out.push_str(UNTRANSLATED);
                    }
                    out.push('\n');
                }

                if !unit.is_translated {
                    out.push('\n');
                } else if unit.touched {
                    let text = if unit.translation_type().is_wrappable() {
                        wrap(&unit.translated_text, line_length, tolerance)
                    } else {
                        unit.translated_text.clone()
                    };
                    out.push_str(&escape(&text));
                    if !out.ends_with('\n') {
                        out.push('\n');
                    }
                } else {
                    out.push_str(&unit.translated_text);
                }
            }

            out.push_str("> END STRING\n\n");
        }

        out
    }

    pub async fn save(&self, line_length: usize, tolerance: usize) -> PatchResult<()> {
        debug!("Writing {}", self.path.display());
        tokio::fs::write(&self.path, self.render(line_length, tolerance))
            .await
            .map_err(|source| PatchError::Io {
                path: self.path.clone(),
                source,
            })
    }

    pub fn unit_count(&self) -> usize {
        self.entries.iter().map(|e| e.units.len()).sum()
    }
}

fn finish_unit(contexts: &mut Vec<String>, text: &mut String) -> TranslationUnit {
    let contexts = std::mem::take(contexts);
    let text = std::mem::take(text);

    if text.trim_end_matches('\n').is_empty() {
        TranslationUnit::untranslated(contexts)
    } else {
        TranslationUnit {
            contexts,
            translated_text: text,
            touched: false,
            is_translated: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "> RPGMAKER TRANS PATCH FILE VERSION 3.2
> BEGIN STRING
短剣
> CONTEXT: Weapons/1/name/ < UNTRANSLATED

> END STRING

> BEGIN STRING
ハロルド
> CONTEXT: Actors/1/name/
Harold
> CONTEXT: Enemies/2/name/ < UNTRANSLATED

> END STRING

> BEGIN STRING
\\C[14]こんにちは\\>
世界
> CONTEXT: Map001/events/1/pages/0/Dialogue
> CONTEXT: Map002/events/3/pages/0/Dialogue
\\C[14]Hello\\>
world
> END STRING

";

    fn parse(content: &str) -> PatchResult<PatchFile> {
        PatchFile::parse(Path::new("Patch/Test.txt"), content)
    }

    fn strings(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    // ========== Parsing Tests ==========

    #[test]
    fn test_parse_sample() {
        let patch = parse(SAMPLE).unwrap();
        assert_eq!(patch.version, "RPGMAKER TRANS PATCH FILE VERSION 3.2");
        assert_eq!(patch.engine, Engine::VxAce);
        assert_eq!(patch.entries.len(), 3);
        assert_eq!(patch.unit_count(), 4);

        let first = &patch.entries[0];
        assert_eq!(first.original, "短剣\n");
        assert_eq!(
            first.units,
            vec![TranslationUnit::untranslated(strings(&[": Weapons/1/name/"]))]
        );

        let second = &patch.entries[1];
        assert_eq!(second.units.len(), 2);
        assert!(second.units[0].is_translated);
        assert!(!second.units[0].touched);
        assert_eq!(second.units[0].translated_text, "Harold\n");
        assert_eq!(second.units[1].contexts, strings(&[": Enemies/2/name/"]));
        assert!(!second.units[1].is_translated);
        assert_eq!(second.units[1].translated_text, "");

        let third = &patch.entries[2];
        assert_eq!(third.original, "\\C[14]こんにちは\\>\n世界\n");
        assert_eq!(third.units.len(), 1);
        assert_eq!(third.units[0].contexts.len(), 2);
        assert_eq!(third.units[0].translated_text, "\\C[14]Hello\\>\nworld\n");
    }

    #[test]
    fn test_parse_wolf_header() {
        let content = "> WOLF TRANS PATCH FILE VERSION 1.0\n> BEGIN STRING\n剣\n> CONTEXT A/name/ < UNTRANSLATED\n\n> END STRING\n\n";
        let patch = parse(content).unwrap();
        assert_eq!(patch.engine, Engine::Wolf);
        assert_eq!(patch.entries[0].units[0].contexts, strings(&[" A/name/"]));
    }

    #[test]
    fn test_parse_rejects_missing_header() {
        assert!(matches!(parse(""), Err(PatchError::MissingHeader { .. })));
        assert!(matches!(
            parse("短剣\n"),
            Err(PatchError::MissingHeader { .. })
        ));
    }

    #[test]
    fn test_parse_rejects_unknown_version() {
        match parse("> SOME OTHER PATCH 1.0\n") {
            Err(PatchError::UnsupportedVersion { version, .. }) => {
                assert_eq!(version, "SOME OTHER PATCH 1.0")
            }
            other => panic!("Expected UnsupportedVersion, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_rejects_unterminated_entry() {
        let content = "> RPGMAKER TRANS PATCH FILE VERSION 3.2\n> BEGIN STRING\n剣\n";
        let err = parse(content).unwrap_err();
        assert!(matches!(err, PatchError::Malformed { .. }));
        assert!(err.to_string().contains("unterminated entry"));
    }

    #[test]
    fn test_parse_rejects_context_outside_entry() {
        let content = "> RPGMAKER TRANS PATCH FILE VERSION 3.2\n> CONTEXT: Actors/1/name/\n";
        match parse(content) {
            Err(PatchError::Malformed { line, .. }) => assert_eq!(line, 2),
            other => panic!("Expected Malformed, got {:?}", other),
        }
    }

    // ========== Writing Tests ==========

    #[test]
    fn test_round_trip_is_byte_exact() {
        let patch = parse(SAMPLE).unwrap();
        assert_eq!(patch.render(42, 5), SAMPLE);
    }

    #[test]
    fn test_touched_units_are_escaped_and_wrapped() {
        let mut patch = parse(SAMPLE).unwrap();

        patch.entries[0].units[0] =
            TranslationUnit::translated(strings(&[": Weapons/1/name/"]), "Dagger>");

        let long = "【dagger】It is rusty and its sharpness is dull but it will not get stuck。";
        patch.entries[2].units[0] = TranslationUnit::translated(
            strings(&[": Map001/events/1/pages/0/Dialogue"]),
            long,
        );

        let out = patch.render(42, 5);
        assert!(out.contains("> CONTEXT: Weapons/1/name/\nDagger\\>\n> END STRING"));
        assert!(out.contains(
            "> CONTEXT: Map001/events/1/pages/0/Dialogue\n【dagger】It is rusty and its sharpness is\ndull but it will not get stuck。\n> END STRING"
        ));
    }

    #[test]
    fn test_names_are_never_wrapped() {
        let mut patch = parse(SAMPLE).unwrap();
        let name = "A very long name that would otherwise be wrapped somewhere";
        patch.entries[1].units[1] =
            TranslationUnit::translated(strings(&[": Enemies/2/name/"]), name);

        let out = patch.render(20, 0);
        assert!(out.contains(&format!("> CONTEXT: Enemies/2/name/\n{}\n", name)));
    }

    // ========== File Tests ==========

    #[tokio::test]
    async fn test_load_and_save() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("Actors.txt");
        std::fs::write(&path, SAMPLE).unwrap();

        let patch = PatchFile::load(&path).await.unwrap();
        assert_eq!(patch.path, path);
        patch.save(42, 5).await.unwrap();

        assert_eq!(std::fs::read_to_string(&path).unwrap(), SAMPLE);
    }

    #[tokio::test]
    async fn test_load_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = PatchFile::load(&dir.path().join("missing.txt")).await.unwrap_err();
        assert!(matches!(err, PatchError::Io { .. }));
    }
}
