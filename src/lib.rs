//! Machine translation of game text patch files.
//!
//! A patch file pairs each source string of a game with the places it is used
//! (its contexts) and their translations. This crate fills in the missing
//! translations: source text is split into free text and embedded script
//! codes, only the free text is translated, and the result is reassembled and
//! word-wrapped without ever touching a script code.
//!
//! ```ignore
//! use patch_translator::{lexer::tokenize, token::TokenKind};
//!
//! let (tokens, error) = tokenize("疾風苦無(消費1)　en(v[25] >= 1)");
//! assert!(error.is_none());
//! assert_eq!(tokens.get(0).map(|t| t.kind), Some(TokenKind::Text));
//! ```

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info};
use walkdir::WalkDir;

pub mod assemble;
pub mod block;
pub mod context;
pub mod dictionary;
pub mod engine;
pub mod lexer;
pub mod logging;
pub mod mt;
pub mod patch;
pub mod settings;
pub mod text;
pub mod token;
pub mod workers;
pub mod wrap;


pub use block::{PatchEntry, Pipeline, TranslationUnit};
pub use context::{ContextRule, ContextRules, Matcher, TranslationType, Verdict};
pub use dictionary::{Dictionary, DictionaryError};
pub use engine::Engine;
pub use lexer::{Lexer, tokenize};
pub use mt::{HttpTranslator, MachineTranslator, MockMode, MockTranslator, MtError, MtResult};
pub use patch::{PatchError, PatchFile};
pub use settings::{Settings, SettingsError};
pub use token::{Token, TokenKind, TokenList};
pub use workers::{RunOptions, RunSummary};
pub use wrap::wrap;

/// Reasons a whole run cannot start or has to stop.
#[derive(Debug)]
pub enum RunError {
    /// The translator could not be set up or the service went down.
    Fatal(MtError),
    Settings(SettingsError),
    Dictionary(DictionaryError),
    NoFiles(PathBuf),
}

impl RunError {
    pub fn exit_code(&self) -> i32 {
        2
    }
}

impl fmt::Display for RunError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RunError::Fatal(e) => write!(f, "translator: {}", e),
            RunError::Settings(e) => write!(f, "{}", e),
            RunError::Dictionary(e) => write!(f, "failed to load dictionary: {}", e),
            RunError::NoFiles(dir) => {
                write!(f, "couldn't find anything to translate in {}", dir.display())
            }
        }
    }
}

impl std::error::Error for RunError {}

impl From<MtError> for RunError {
    fn from(e: MtError) -> Self {
        RunError::Fatal(e)
    }
}

impl From<SettingsError> for RunError {
    fn from(e: SettingsError) -> Self {
        RunError::Settings(e)
    }
}

impl From<DictionaryError> for RunError {
    fn from(e: DictionaryError) -> Self {
        RunError::Dictionary(e)
    }
}

/// Patch files under a project directory.
///
/// Looks in `<dir>/Patch` when it exists and in `dir` otherwise. Only `.txt`
/// files are collected, sorted by path.
pub fn collect_patch_files(dir: &Path) -> Vec<PathBuf> {
    let patch_dir = dir.join("Patch");
    let root = if patch_dir.is_dir() { patch_dir } else { dir.to_path_buf() };

    let mut files: Vec<PathBuf> = WalkDir::new(&root)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .map(|e| e.into_path())
        .filter(|p| p.extension().is_some_and(|ext| ext == "txt"))
        .collect();
    files.sort();

    debug!("Found {} patch files under {}", files.len(), root.display());
    files
}

/// Builds the shared pipeline from settings.
pub fn build_pipeline(settings: &Settings, use_mock: bool) -> Result<Pipeline, RunError> {
    let translator: Arc<dyn MachineTranslator> = if use_mock {
        Arc::new(MockTranslator::new(MockMode::Suffix))
    } else {
        Arc::new(HttpTranslator::new(&settings.endpoint, settings.timeout_secs)?)
    };

    mt::validate_locale(&settings.source_language)?;
    mt::validate_locale(&settings.target_language)?;

    let dictionary = Dictionary::load(&settings.dictionary_dir)?;

    let mut pipeline = Pipeline::new(translator, dictionary)
        .with_languages(&settings.source_language, &settings.target_language);
    for engine in [Engine::VxAce, Engine::Wolf] {
        let extra = settings.rules_for(engine);
        if !extra.is_empty() {
            debug!("{} extra context rules for {}", extra.len(), engine);
            pipeline = pipeline.with_extra_rules(engine, extra);
        }
    }

    info!("Using {}", pipeline.provider_name());
    Ok(pipeline)
}

/// Translates every patch file under `dir`.
pub async fn run(
    dir: &Path,
    settings: &Settings,
    use_mock: bool,
    dry_run: bool,
) -> Result<RunSummary, RunError> {
    settings.validate()?;

    let files = collect_patch_files(dir);
    if files.is_empty() {
        return Err(RunError::NoFiles(dir.to_path_buf()));
    }

    let pipeline = Arc::new(build_pipeline(settings, use_mock)?);
    let options = RunOptions {
        file_workers: settings.file_workers,
        block_workers: settings.block_workers,
        line_length: settings.line_length,
        tolerance: settings.line_tolerance,
        dry_run,
    };

    info!("Found {} files to translate", files.len());
    let mut summary = workers::run_files(pipeline, files, options).await;

    match summary.fatal.take() {
        Some(e) => Err(RunError::Fatal(e)),
        None => Ok(summary),
    }
}
