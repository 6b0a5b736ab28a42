use tracing::{debug, error, trace};

use crate::lexer::tokenize;
use crate::text::leading_whitespace;

fn width(s: &str) -> usize {
    s.chars().count()
}

/// Re-wraps `text` so each line holds at most `max_width` visible characters.
///
/// Lines are wrapped independently and joined with `\n`. Only text, raw
/// delimiter and number tokens count towards the width. Script tokens are
/// copied through and never split. The last word of a token may overflow by up
/// to `tolerance` characters instead of being moved to a line of its own.
pub fn wrap(text: &str, max_width: usize, tolerance: usize) -> String {
    text.split('\n')
        .map(|line| wrap_line(line, max_width, tolerance))
        .collect::<Vec<_>>()
        .join("\n")
}

fn wrap_line(input: &str, max_width: usize, tolerance: usize) -> String {
    let input = input.trim_end_matches('\n');
    if input.is_empty() {
        return input.to_string();
    }

    let (tokens, scan_error) = tokenize(input);
    if let Some(e) = scan_error {
        error!("{}, leaving line unwrapped\ntext: {:?}", e, input);
        return input.to_string();
    }

    let indent = leading_whitespace(input);

    let mut out = String::new();
    let mut just_text = String::new();
    let mut line = String::new();

    for token in &tokens {
        if !token.kind.is_visible() {
            line.push_str(&token.value);
            continue;
        }

        if width(&just_text) + width(&token.value) <= max_width {
            out.push_str(&line);
            out.push_str(&token.value);
            line.clear();
            just_text.push_str(&token.value);
            continue;
        }

        debug!("Trying to split {:?} from {:?}", token.value, input);

        let words: Vec<&str> = token.value.split(' ').collect();
        for (i, word) in words.iter().enumerate() {
            let is_last = i + 1 == words.len();
            let fitted = width(&just_text) + width(word);
            trace!("word {}/{} width {}", i + 1, words.len(), fitted);

            if fitted <= max_width {
                line.push_str(word);
                just_text.push_str(word);
                if !is_last {
                    line.push(' ');
                    just_text.push(' ');
                }
                continue;
            }

            // Nothing visible on the line yet, a break would only leave it blank
            if just_text.trim().is_empty() {
                debug!("Word {:?} is wider than a whole line, keeping it", word);
                line.push_str(word);
                just_text.push_str(word);
                if !is_last {
                    line.push(' ');
                    just_text.push(' ');
                }
                continue;
            }

            if is_last && fitted <= max_width + tolerance {
                debug!("Word {:?} overflows within tolerance, keeping it on the line", word);
                line.push_str(word);
                just_text.push_str(word);
                break;
            }

            debug!("Word {:?} was too long to fit, starting a new line", word);
            let kept = line.trim_end_matches(' ').len();
            line.truncate(kept);
            line.push('\n');
            line.push_str(indent);
            out.push_str(&line);

            line = word.to_string();
            just_text = word.to_string();
            if !is_last {
                line.push(' ');
                just_text.push(' ');
            }
        }
    }

    out.push_str(&line);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Visible width of the longest line, ignoring nothing.
    fn longest_line(text: &str) -> usize {
        text.lines().map(width).max().unwrap_or(0)
    }

    #[test]
    fn test_wrap_breaks_at_word_boundary() {
        let input = "【dagger】It is rusty and its sharpness is dull but it will not get stuck。";
        let expected = "【dagger】It is rusty and its sharpness is\ndull but it will not get stuck。";
        assert_eq!(wrap(input, 42, 5), expected);
    }

    #[test]
    fn test_wrap_bracketed_sentence() {
        let input = "<The contents will be updated even if you see the event by recollection>";
        let expected = "<The contents will be updated even if you\nsee the event by recollection>";
        assert_eq!(wrap(input, 42, 5), expected);
    }

    #[test]
    fn test_wrap_multiple_lines() {
        let input = "【dagger】It is rusty and its sharpness\n【dagger】It is rusty and its sharpness is dull but it will not get stuck。\nattack:＋４ （Slashing）（Speed↑）";
        let expected = "【dagger】It is rusty and its sharpness\n【dagger】It is rusty and its sharpness is\ndull but it will not get stuck。\nattack:＋４ （Slashing）（Speed↑）";
        assert_eq!(wrap(input, 42, 5), expected);
    }

    #[test]
    fn test_wrap_repeats_indent() {
        let input = "「For example『Element of fire』When receiving protection of,\n　Attack of fire attribute will cause additional attribute attack。\n";
        let expected = "「For example『Element of fire』When\nreceiving protection of,\n　Attack of fire attribute will cause\n　additional attribute attack。\n";
        assert_eq!(wrap(input, 42, 5), expected);
    }

    #[test]
    fn test_wrap_tolerance_keeps_last_word() {
        // 40 visible characters, then a final word that overflows by 3
        let input = format!("{} done", "a".repeat(39));
        assert_eq!(wrap(&input, 42, 5), input);
        assert_eq!(wrap(&input, 42, 0), format!("{}\ndone", "a".repeat(39)));
    }

    #[test]
    fn test_wrap_never_splits_scripts() {
        let input = "\\C[14]「Harold」\\C[0] said that the sword was far too heavy to carry";
        let wrapped = wrap(input, 20, 0);
        assert!(wrapped.contains("\\C[14]「Harold」\\C[0]"));
        assert_eq!(wrapped.replace('\n', " "), input);
        for line in wrapped.lines() {
            let visible = line.replace("\\C[14]", "").replace("\\C[0]", "");
            assert!(width(&visible) <= 20, "line too long: {:?}", line);
        }
    }

    #[test]
    fn test_wrap_overlong_first_word_starts_no_blank_line() {
        let long = "a".repeat(50);
        assert_eq!(wrap(&long, 42, 5), long);
        assert_eq!(wrap(&format!("{} bb", long), 42, 5), format!("{}\nbb", long));
    }

    #[test]
    fn test_wrap_short_text_unchanged() {
        assert_eq!(wrap("Short line", 42, 5), "Short line");
        assert_eq!(wrap("", 42, 5), "");
        assert_eq!(wrap("a\n\nb", 42, 5), "a\n\nb");
    }

    #[test]
    fn test_wrap_width_invariant() {
        let input = "During 5 turns, the user is given flames and ice and lightning and the attribute of wind for the rest of the battle";
        let wrapped = wrap(input, 30, 4);
        assert!(longest_line(&wrapped) <= 34, "{:?}", wrapped);
        assert_eq!(wrapped.replace('\n', " "), input);
    }

    #[test]
    fn test_wrap_unclosed_action_is_left_alone() {
        let input = "a very long line that would need wrapping en(v[25] >= 1";
        assert_eq!(wrap(input, 10, 0), input);
    }
}
