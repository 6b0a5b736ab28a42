use std::sync::LazyLock;

use regex::Regex;

/// File extensions that mark a string as an asset reference.
const IGNORED_EXTENSIONS: [&str; 12] = [
    ".png", ".jpg", ".jpeg", ".gif", ".bmp", ".ogg", ".mp3", ".wav", ".mid", ".midi", ".txt",
    ".csv",
];

static JAPANESE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[\p{Hiragana}\p{Katakana}\p{Han}]").unwrap());

/// Decides whether a string is worth sending for translation.
///
/// Empty strings, regex literals (`/.../`) and asset file names are rejected.
/// Everything else needs at least one Hiragana, Katakana or Han character.
pub fn is_translatable_unit(text: &str) -> bool {
    let text = text.trim();

    if text.is_empty() {
        return false;
    }

    if text.len() > 1 && text.starts_with('/') && text.ends_with('/') {
        return false;
    }

    let folded = narrow(text).to_lowercase();
    if IGNORED_EXTENSIONS.iter().any(|ext| folded.contains(ext)) {
        return false;
    }

    JAPANESE.is_match(&folded)
}

/// Folds full-width ASCII variants and the ideographic space to their narrow forms.
pub fn narrow(text: &str) -> String {
    text.chars()
        .map(|c| match c {
            '\u{FF01}'..='\u{FF5E}' => char::from_u32(c as u32 - 0xFEE0).unwrap_or(c),
            '\u{3000}' => ' ',
            _ => c,
        })
        .collect()
}

/// Reverses the patch file escaping of `\`, `>` and `#`.
pub fn unescape(text: &str) -> String {
    text.replace("\\\\", "\\")
        .replace("\\>", ">")
        .replace("\\#", "#")
}

pub fn escape(text: &str) -> String {
    text.replace('\\', "\\\\")
        .replace('>', "\\>")
        .replace('#', "\\#")
}

pub fn starts_with_whitespace(text: &str) -> bool {
    text.chars().next().is_some_and(char::is_whitespace)
}

pub fn ends_with_whitespace(text: &str) -> bool {
    text.chars().next_back().is_some_and(char::is_whitespace)
}

pub fn leading_whitespace(text: &str) -> &str {
    let end = text
        .char_indices()
        .find(|(_, c)| !c.is_whitespace())
        .map_or(text.len(), |(i, _)| i);
    &text[..end]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_translatable_units() {
        let cases = [
            ("1", false),
            ("test", false),
            (" ", false),
            ("", false),
            ("あの――", true),
            ("#####素材アイテム####", true),
            ("/(?:付加ポップアップ非表示|add_no_display)/", false),
            ("顔グラ.png", false),
            ("ＢＧＭ．ＯＧＧ音", false),
            ("漢字", true),
            ("カタカナ", true),
        ];
        for (input, expected) in cases {
            assert_eq!(is_translatable_unit(input), expected, "input: {:?}", input);
        }
    }

    #[test]
    fn test_narrow() {
        assert_eq!(narrow("ＨＰ１００％"), "HP100%");
        assert_eq!(narrow("あ\u{3000}い"), "あ い");
    }

    #[test]
    fn test_escape_round_trip() {
        let escaped = r"\#\#\#\#\#素材アイテム\#\#\#\#";
        let plain = "#####素材アイテム####";
        assert_eq!(unescape(escaped), plain);
        assert_eq!(escape(plain), escaped);

        assert_eq!(
            unescape(r"[守護]水属性ダメージを\\V[20]%軽減"),
            r"[守護]水属性ダメージを\V[20]%軽減"
        );
        assert_eq!(
            escape(r"[守護]水属性ダメージを\V[20]%軽減"),
            r"[守護]水属性ダメージを\\V[20]%軽減"
        );
        assert_eq!(escape("<<迷宮>>"), r"<<迷宮\>\>");
    }

    #[test]
    fn test_whitespace_helpers() {
        assert!(starts_with_whitespace(" a"));
        assert!(starts_with_whitespace("\u{3000}a"));
        assert!(!starts_with_whitespace(""));
        assert!(ends_with_whitespace("a\n"));
        assert!(!ends_with_whitespace("a"));
        assert_eq!(leading_whitespace("  \u{3000}text "), "  \u{3000}");
        assert_eq!(leading_whitespace("   "), "   ");
    }
}
