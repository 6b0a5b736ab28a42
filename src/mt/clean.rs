//! Normalisation of raw translation service output.

use std::sync::LazyLock;

use regex::Regex;
use tracing::warn;

static NON_PRINTING: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[\p{C}&&[^\s]]").unwrap());
static REPEATED_WHITESPACE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s{2,}").unwrap());
static DASH_RUN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+((\s+)?[-―ー]){2,}").unwrap());
static MIDDLE_DOT_RUN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\s+)?((\s+)?[·]+){3,}").unwrap());
static SOKUON_RESIDUE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"((\s+)?っ)+").unwrap());

/// Cleans one translated span.
///
/// Steps run in a fixed order: non-printing code points are dropped, JSON
/// escapes the service leaves behind are decoded, stray backslashes are removed,
/// whitespace runs collapse to one space, dash runs become ` ー`, middle-dot
/// runs become ` ···` and leftover `っ` is deleted.
pub fn clean_translation(text: &str) -> String {
    let mut out = NON_PRINTING.replace_all(text, "").into_owned();

    out = out
        .replace("\\u0026", "＆")
        .replace("\\u003c", "<")
        .replace("\\u003e", ">");

    if out.contains("\\u0") {
        warn!("Found unexpected escaped character in translation {:?}", out);
    }

    out = out.replace('\\', "");

    out = REPEATED_WHITESPACE.replace_all(&out, " ").into_owned();
    out = DASH_RUN.replace_all(&out, " ー").into_owned();
    out = MIDDLE_DOT_RUN.replace_all(&out, " ···").into_owned();
    SOKUON_RESIDUE.replace_all(&out, "").into_owned()
}
