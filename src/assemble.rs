use tracing::{debug, warn};

use crate::lexer::contains_ignored;
use crate::mt::{MachineTranslator, MtResult, clean_translation};
use crate::text::{ends_with_whitespace, is_translatable_unit, narrow, starts_with_whitespace};
use crate::token::{Token, TokenKind, TokenList};

/// Joins tokens back into one string.
///
/// Spaces are inserted where a translated span would otherwise fuse with a
/// neighbouring Latin run, script code or number. `Error` tokens are skipped
/// and `EndOfInput` ends the walk.
pub fn assemble(tokens: &TokenList) -> String {
    let mut out = String::new();
    let mut last: Option<&Token> = None;

    for token in tokens {
        debug!("{:>14}: {:?}", token.kind, token.value);

        let last_kind = last.map(|t| t.kind);

        match token.kind {
            TokenKind::EndOfInput => break,
            TokenKind::Error => continue,
            TokenKind::Text => {
                let after_boundary = match last {
                    Some(prev) => {
                        (prev.kind == TokenKind::RawDelimiter && contains_ignored(&prev.value))
                            || matches!(
                                prev.kind,
                                TokenKind::ScriptFragment
                                    | TokenKind::RightBracket
                                    | TokenKind::RightParen
                            )
                    }
                    None => false,
                };

                if after_boundary {
                    if !ends_with_whitespace(&out) && !starts_with_whitespace(&token.value) {
                        out.push(' ');
                    }
                } else if last_kind == Some(TokenKind::Number)
                    && !ends_with_whitespace(&out)
                    && !starts_with_whitespace(&token.value)
                {
                    out.push(' ');
                }
            }
            TokenKind::RawDelimiter => {
                if token.value == "(" {
                    // Keeps a translated word from reading as a call
                    if !out.is_empty() && !ends_with_whitespace(&out) {
                        out.push(' ');
                    }
                } else if last_kind == Some(TokenKind::Text)
                    && contains_ignored(&token.value)
                    && !ends_with_whitespace(&out)
                    && !starts_with_whitespace(&token.value)
                {
                    out.push(' ');
                }
            }
            TokenKind::ScriptFragment => {
                if matches!(last_kind, Some(TokenKind::Text | TokenKind::Number))
                    && !ends_with_whitespace(&out)
                {
                    out.push(' ');
                }
            }
            TokenKind::Number => {
                if last_kind == Some(TokenKind::Text) && !ends_with_whitespace(&out) {
                    out.push(' ');
                }
            }
            _ => {}
        }

        out.push_str(&token.value);
        last = Some(token);
    }

    out
}

/// Translates one span, or returns it unchanged when it holds nothing to translate.
///
/// Only a service outage is an error. Any other failure, and an empty reply,
/// keep the source text.
pub async fn translate_string(
    translator: &dyn MachineTranslator,
    text: &str,
    source_language: &str,
    target_language: &str,
) -> MtResult<String> {
    if !is_translatable_unit(text) {
        return Ok(text.to_string());
    }

    if text == "っ" {
        return Ok(String::new());
    }

    let translation = match translator
        .translate(text, source_language, target_language)
        .await
    {
        Ok(translation) => translation,
        Err(e) if e.is_fatal() => return Err(e),
        Err(e) => {
            warn!("{}, keeping original text {:?}", e, text);
            return Ok(text.to_string());
        }
    };

    if translation.is_empty() {
        warn!(
            "Translator returned empty string, replacing with original text {:?}",
            text
        );
        return Ok(text.to_string());
    }

    Ok(clean_translation(&translation))
}

/// Replaces every `Text` and `Number` value with its translation in place.
pub async fn translate_items(
    tokens: &mut TokenList,
    translator: &dyn MachineTranslator,
    source_language: &str,
    target_language: &str,
) -> MtResult<()> {
    for token in tokens {
        match token.kind {
            TokenKind::Text => {
                let mut translation =
                    translate_string(translator, &token.value, source_language, target_language)
                        .await?;

                if starts_with_whitespace(&token.value) && !starts_with_whitespace(&translation) {
                    translation.insert(0, ' ');
                }
                if ends_with_whitespace(&token.value) && !ends_with_whitespace(&translation) {
                    translation.push(' ');
                }

                token.value = translation;
            }
            TokenKind::Number => {
                let folded = narrow(&token.value);
                let translation =
                    translate_string(translator, &folded, source_language, target_language).await?;
                token.value = translation.to_lowercase();
            }
            _ => {}
        }
    }

    Ok(())
}
