//! Per-entry translation pipeline.
//!
//! One `PatchEntry` is processed at a time: static dictionary lookups first,
//! then a single remote translation shared by every unit whose contexts allow
//! it. Units are split when only some of their contexts may be translated and
//! never merged, so every context of the input ends up in exactly one unit.

use std::sync::Arc;
use tracing::{debug, error, info};

use crate::assemble::{assemble, translate_items};
use crate::context::{ContextRule, ContextRules, TranslationType, group_contexts};
use crate::dictionary::Dictionary;
use crate::engine::Engine;
use crate::lexer::tokenize;
use crate::mt::{MachineTranslator, MtResult};
use crate::text::{is_translatable_unit, unescape};

/// One set of contexts sharing a translation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TranslationUnit {
    pub contexts: Vec<String>,
    /// Empty while `is_translated` is false.
    pub translated_text: String,
    /// Set when this run produced the translation.
    pub touched: bool,
    pub is_translated: bool,
}

impl TranslationUnit {
    pub fn untranslated(contexts: Vec<String>) -> Self {
        TranslationUnit {
            contexts,
            ..Default::default()
        }
    }

    pub fn translated(contexts: Vec<String>, text: impl Into<String>) -> Self {
        TranslationUnit {
            contexts,
            translated_text: text.into(),
            touched: true,
            is_translated: true,
        }
    }

    pub fn translation_type(&self) -> TranslationType {
        TranslationType::from_contexts(&self.contexts)
    }
}

/// A source string and every unit that translates it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PatchEntry {
    /// Source lines in escaped form, each ending in `\n`.
    pub original: String,
    pub units: Vec<TranslationUnit>,
}

impl PatchEntry {
    pub fn contexts(&self) -> impl Iterator<Item = &str> {
        self.units
            .iter()
            .flat_map(|u| u.contexts.iter().map(String::as_str))
    }
}

/// Shared, read-only translation machinery.
pub struct Pipeline {
    translator: Arc<dyn MachineTranslator>,
    dictionary: Dictionary,
    vx_ace_rules: ContextRules,
    wolf_rules: ContextRules,
    source_language: String,
    target_language: String,
}

impl Pipeline {
    pub fn new(translator: Arc<dyn MachineTranslator>, dictionary: Dictionary) -> Self {
        Pipeline {
            translator,
            dictionary,
            vx_ace_rules: ContextRules::builtin(Engine::VxAce),
            wolf_rules: ContextRules::builtin(Engine::Wolf),
            source_language: "ja".to_string(),
            target_language: "en".to_string(),
        }
    }

    pub fn with_languages(mut self, source: impl Into<String>, target: impl Into<String>) -> Self {
        self.source_language = source.into();
        self.target_language = target.into();
        self
    }

    /// Adds rules evaluated before the built-in table of `engine`.
    pub fn with_extra_rules(mut self, engine: Engine, extra: &[ContextRule]) -> Self {
        let rules = ContextRules::with_extra(engine, extra);
        match engine {
            Engine::VxAce => self.vx_ace_rules = rules,
            Engine::Wolf => self.wolf_rules = rules,
        }
        self
    }

    pub fn rules(&self, engine: Engine) -> &ContextRules {
        match engine {
            Engine::VxAce => &self.vx_ace_rules,
            Engine::Wolf => &self.wolf_rules,
        }
    }

    pub fn provider_name(&self) -> &str {
        self.translator.provider_name()
    }

    /// Fills in translations for every untranslated unit of `entry`.
    ///
    /// Only a translation service outage is returned as an error. Malformed
    /// text is logged and leaves the entry untranslated.
    pub async fn translate_entry(&self, mut entry: PatchEntry, engine: Engine) -> MtResult<PatchEntry> {
        let unescaped = unescape(&entry.original);
        if !is_translatable_unit(&unescaped) {
            return Ok(entry);
        }

        let source = self.dictionary.pre_translate(&unescaped);

        self.translate_local(&mut entry, &source);
        self.translate_remote(&mut entry, &source, engine).await?;

        Ok(entry)
    }

    /// Static lookups per translation type. Context rules do not apply here.
    fn translate_local(&self, entry: &mut PatchEntry, source: &str) {
        let mut units = Vec::with_capacity(entry.units.len());

        for unit in std::mem::take(&mut entry.units) {
            if unit.is_translated {
                units.push(unit);
                continue;
            }

            let mut hits = Vec::new();
            let mut leftover = Vec::new();

            for (typ, contexts) in group_contexts(&unit.contexts) {
                match self.dictionary.lookup(source, typ) {
                    Ok(text) => {
                        debug!("{:?} => {:?} => {:?} ({})", entry.original, source, text, typ);
                        hits.push(TranslationUnit::translated(contexts, text));
                    }
                    Err(_) => leftover.extend(contexts),
                }
            }

            if hits.is_empty() {
                units.push(unit);
                continue;
            }

            units.extend(hits);
            if !leftover.is_empty() {
                info!(
                    "Mixed entry in static lookup {:?}, untranslated contexts {:?}",
                    source, leftover
                );
                units.push(TranslationUnit::untranslated(leftover));
            }
        }

        entry.units = units;
    }

    async fn translate_remote(&self, entry: &mut PatchEntry, source: &str, engine: Engine) -> MtResult<()> {
        let rules = self.rules(engine);

        let wanted = entry.units.iter().any(|unit| {
            !unit.is_translated
                && unit
                    .contexts
                    .iter()
                    .any(|c| rules.is_translatable_context(c, source))
        });
        if !wanted {
            return Ok(());
        }

        let (mut tokens, scan_error) = tokenize(source);
        if let Some(e) = scan_error {
            let contexts: Vec<&str> = entry.contexts().collect();
            error!("{}\ntext: {:?}\ncontexts: {:?}", e, source, contexts);
            return Ok(());
        }

        translate_items(
            &mut tokens,
            self.translator.as_ref(),
            &self.source_language,
            &self.target_language,
        )
        .await?;
        let translation = self.dictionary.post_translate(&assemble(&tokens));
        debug!("{:?} => {:?} => {:?}", entry.original, source, translation);

        let mut units = Vec::with_capacity(entry.units.len() + 1);

        for unit in std::mem::take(&mut entry.units) {
            if unit.is_translated {
                units.push(unit);
                continue;
            }

            let (allowed, denied) = rules.partition_contexts(&unit.contexts, source);
            if allowed.is_empty() {
                units.push(unit);
                continue;
            }

            units.push(TranslationUnit::translated(allowed, translation.clone()));
            if !denied.is_empty() {
                info!(
                    "Mixed entry {:?}, contexts left untranslated {:?}",
                    source, denied
                );
                units.push(TranslationUnit::untranslated(denied));
            }
        }

        entry.units = units;
        Ok(())
    }
}
