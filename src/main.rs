use clap::{Arg, ArgAction, ArgMatches, Command, value_parser};
use patch_translator::{RunError, Settings, logging, run};
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Instant;
use tracing::{error, info, warn};

fn command() -> Command {
    Command::new("patch-translator")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Machine translates RPG Maker and Wolf RPG patch files")
        .arg(
            Arg::new("patch-dir")
                .help("Patch project directory (files are read from <DIR>/Patch when present)")
                .required(true)
                .value_parser(value_parser!(PathBuf))
                .index(1),
        )
        .arg(
            Arg::new("length")
                .long("length")
                .help("Max line length (default: 42 for VX Ace, 54 for Wolf)")
                .value_parser(value_parser!(usize)),
        )
        .arg(
            Arg::new("tolerance")
                .long("tolerance")
                .help("Characters a last word may go over the line limit")
                .value_parser(value_parser!(usize)),
        )
        .arg(
            Arg::new("file-threads")
                .long("file-threads")
                .help("Files processed at the same time")
                .value_parser(value_parser!(usize)),
        )
        .arg(
            Arg::new("block-threads")
                .long("block-threads")
                .help("Entries of one file processed at the same time")
                .value_parser(value_parser!(usize)),
        )
        .arg(
            Arg::new("endpoint")
                .long("endpoint")
                .help("Translation service URL"),
        )
        .arg(
            Arg::new("dictionary")
                .long("dictionary")
                .help("Dictionary directory")
                .value_parser(value_parser!(PathBuf)),
        )
        .arg(
            Arg::new("settings")
                .long("settings")
                .help("JSON settings file")
                .value_parser(value_parser!(PathBuf)),
        )
        .arg(
            Arg::new("mock")
                .long("mock")
                .short('m')
                .help("Use the mock translator instead of the translation service")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("dry-run")
                .long("dry-run")
                .help("Translate without writing files back")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("verbose")
                .long("verbose")
                .short('v')
                .help("Debug logging")
                .action(ArgAction::SetTrue),
        )
}

/// Settings file first, then command line flags on top.
fn settings_from(matches: &ArgMatches) -> Result<Settings, RunError> {
    let mut settings = match matches.get_one::<PathBuf>("settings") {
        Some(path) => Settings::load(path)?,
        None => Settings::default(),
    };

    if let Some(&length) = matches.get_one::<usize>("length") {
        settings.line_length = Some(length);
    }
    if let Some(&tolerance) = matches.get_one::<usize>("tolerance") {
        settings.line_tolerance = tolerance;
    }
    if let Some(&n) = matches.get_one::<usize>("file-threads") {
        settings.file_workers = n;
    }
    if let Some(&n) = matches.get_one::<usize>("block-threads") {
        settings.block_workers = n;
    }
    if let Some(endpoint) = matches.get_one::<String>("endpoint") {
        settings.endpoint = endpoint.clone();
    }
    if let Some(dir) = matches.get_one::<PathBuf>("dictionary") {
        settings.dictionary_dir = dir.clone();
    }

    Ok(settings)
}

#[tokio::main]
async fn main() -> ExitCode {
    let matches = command().get_matches();
    logging::init(matches.get_flag("verbose"));

    let Some(dir) = matches.get_one::<PathBuf>("patch-dir") else {
        error!("Program requires patch directory as argument");
        return ExitCode::from(2);
    };

    let settings = match settings_from(&matches) {
        Ok(settings) => settings,
        Err(e) => {
            error!("{}", e);
            return ExitCode::from(e.exit_code() as u8);
        }
    };

    info!(
        "Line length: {}, tolerance: {}",
        settings
            .line_length
            .map_or_else(|| "engine default".to_string(), |n| n.to_string()),
        settings.line_tolerance
    );

    let start = Instant::now();
    match run(dir, &settings, matches.get_flag("mock"), matches.get_flag("dry-run")).await {
        Ok(summary) if summary.is_success() => {
            info!(
                "Translated {} units in {} files in {:.1?}",
                summary.translated_units,
                summary.files,
                start.elapsed()
            );
            ExitCode::SUCCESS
        }
        Ok(summary) => {
            warn!(
                "{} of {} files failed, finished in {:.1?}",
                summary.failed.len(),
                summary.files,
                start.elapsed()
            );
            ExitCode::from(1)
        }
        Err(e) => {
            error!("{}", e);
            ExitCode::from(e.exit_code() as u8)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_is_valid() {
        command().debug_assert();
    }

    #[test]
    fn test_flags_override_defaults() {
        let matches = command().get_matches_from([
            "patch-translator",
            "game",
            "--length",
            "50",
            "--block-threads",
            "8",
            "--endpoint",
            "http://localhost:8080/translate",
        ]);
        let settings = settings_from(&matches).unwrap();
        assert_eq!(settings.line_length, Some(50));
        assert_eq!(settings.block_workers, 8);
        assert_eq!(settings.endpoint, "http://localhost:8080/translate");
        assert_eq!(settings.line_tolerance, 5);
    }

    #[test]
    fn test_flags_override_settings_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        std::fs::write(&path, r#"{"line_tolerance": 2, "line_length": 60}"#).unwrap();

        let matches = command().get_matches_from([
            "patch-translator",
            "game",
            "--settings",
            path.to_str().unwrap(),
            "--length",
            "40",
        ]);
        let settings = settings_from(&matches).unwrap();
        assert_eq!(settings.line_length, Some(40));
        assert_eq!(settings.line_tolerance, 2);
    }
}
