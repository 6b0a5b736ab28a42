//! Context path classification.
//!
//! A context path says where in the game data a string lives, for example
//! `: Actors/1/name/` or ` DB:DataBase/武器/3/名前`. Two questions are answered
//! from it: may the string be machine translated at all, and which dictionary
//! bucket applies to it.

use serde::Deserialize;
use std::fmt;

use crate::engine::Engine;

/// Predicate over a context path and the unit's source text.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Matcher {
    Prefix(String),
    Suffix(String),
    Contains(String),
    /// Matches on the source text instead of the path.
    TextContains(String),
    All(Vec<Matcher>),
    Any(Vec<Matcher>),
    Not(Box<Matcher>),
}

impl Matcher {
    pub fn matches(&self, context: &str, text: &str) -> bool {
        match self {
            Matcher::Prefix(p) => context.starts_with(p.as_str()),
            Matcher::Suffix(s) => context.ends_with(s.as_str()),
            Matcher::Contains(s) => context.contains(s.as_str()),
            Matcher::TextContains(s) => text.contains(s.as_str()),
            Matcher::All(all) => all.iter().all(|m| m.matches(context, text)),
            Matcher::Any(any) => any.iter().any(|m| m.matches(context, text)),
            Matcher::Not(m) => !m.matches(context, text),
        }
    }
}

fn prefix(s: &str) -> Matcher {
    Matcher::Prefix(s.to_string())
}

fn suffix(s: &str) -> Matcher {
    Matcher::Suffix(s.to_string())
}

fn contains(s: &str) -> Matcher {
    Matcher::Contains(s.to_string())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Verdict {
    Allow,
    Deny,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ContextRule {
    pub matcher: Matcher,
    pub verdict: Verdict,
}

impl ContextRule {
    pub fn new(matcher: Matcher, verdict: Verdict) -> Self {
        ContextRule { matcher, verdict }
    }
}

/// Ordered rule table for one engine. The first matching rule decides and
/// paths no rule matches are allowed.
#[derive(Debug, Clone)]
pub struct ContextRules {
    rules: Vec<ContextRule>,
}

impl ContextRules {
    pub fn builtin(engine: Engine) -> Self {
        let rules = match engine {
            Engine::VxAce => vx_ace_rules(),
            Engine::Wolf => wolf_rules(),
        };
        ContextRules { rules }
    }

    /// Built-in table with `extra` rules evaluated first.
    pub fn with_extra(engine: Engine, extra: &[ContextRule]) -> Self {
        let mut rules = extra.to_vec();
        rules.extend(ContextRules::builtin(engine).rules);
        ContextRules { rules }
    }

    pub fn verdict(&self, context: &str, text: &str) -> Verdict {
        self.rules
            .iter()
            .find(|rule| rule.matcher.matches(context, text))
            .map_or(Verdict::Allow, |rule| rule.verdict)
    }

    pub fn is_translatable_context(&self, context: &str, text: &str) -> bool {
        self.verdict(context, text) == Verdict::Allow
    }

    /// Splits contexts into `(allowed, denied)`, keeping their relative order.
    pub fn partition_contexts(&self, contexts: &[String], text: &str) -> (Vec<String>, Vec<String>) {
        contexts
            .iter()
            .cloned()
            .partition(|c| self.is_translatable_context(c, text))
    }
}

/// Checks a single context path against the built-in table of `engine`.
pub fn is_translatable_context(context: &str, text: &str, engine: Engine) -> bool {
    ContextRules::builtin(engine).is_translatable_context(context, text)
}

fn vx_ace_rules() -> Vec<ContextRule> {
    vec![
        ContextRule::new(
            Matcher::Any(vec![
                suffix("_se/name/"),
                suffix("/bgm/name/"),
                suffix("_me/name/"),
                contains("/InlineScript/"),
                suffix("/currency_unit/"),
            ]),
            Verdict::Deny,
        ),
        ContextRule::new(
            Matcher::All(vec![prefix(": Scripts/"), contains("Vocab/")]),
            Verdict::Allow,
        ),
        ContextRule::new(prefix(": Scripts/"), Verdict::Deny),
    ]
}

/// Wolf database categories that hold player-facing strings.
const WOLF_DATABASE_CATEGORIES: [&str; 19] = [
    "アクター/",
    "キャラ名",
    "タイトル",
    "NPC/",
    "ステート/",
    "状態名",
    "技能/",
    "敵/",
    "武器/",
    "称号/",
    "衣装/",
    "防具/",
    "道具/",
    "メニュー設計/",
    "コンフィグ/",
    "クエスト/",
    "依頼主",
    "マップ選択画面",
    "回想モード/",
];

fn wolf_rules() -> Vec<ContextRule> {
    vec![
        ContextRule::new(suffix("/Database"), Verdict::Deny),
        ContextRule::new(
            Matcher::All(vec![
                prefix(" DB:DataBase"),
                Matcher::Any(WOLF_DATABASE_CATEGORIES.iter().map(|c| contains(c)).collect()),
            ]),
            Verdict::Allow,
        ),
        ContextRule::new(prefix(" DB:DataBase"), Verdict::Deny),
        // Strings holding paths are file references.
        ContextRule::new(
            Matcher::All(vec![
                prefix(" COMMONEVENT:"),
                Matcher::Any(vec![
                    Matcher::All(vec![
                        suffix("/SetString"),
                        Matcher::TextContains("/".to_string()),
                    ]),
                    suffix("/StringCondition"),
                ]),
            ]),
            Verdict::Deny,
        ),
    ]
}

/// Dictionary bucket for a unit, derived from its contexts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TranslationType {
    Generic,
    Name,
    Description,
    Dialogue,
    Choice,
    Vocab,
    /// Skill and state messages.
    Message,
    InlineScript,
    Script,
    /// Title screen, menus and other system terms.
    System,
}

const DATABASE_CATEGORIES: [&str; 8] = [
    ": Actors/",
    ": Armors/",
    ": Classes/",
    ": Enemies/",
    ": Items/",
    ": Skills/",
    ": Troops/",
    ": Weapons/",
];

impl TranslationType {
    pub const ALL: [TranslationType; 10] = [
        TranslationType::Generic,
        TranslationType::Name,
        TranslationType::Description,
        TranslationType::Dialogue,
        TranslationType::Choice,
        TranslationType::Vocab,
        TranslationType::Message,
        TranslationType::InlineScript,
        TranslationType::Script,
        TranslationType::System,
    ];

    pub fn name(self) -> &'static str {
        match self {
            TranslationType::Generic => "Generic",
            TranslationType::Name => "Name",
            TranslationType::Description => "Description",
            TranslationType::Dialogue => "Dialogue",
            TranslationType::Choice => "Choice",
            TranslationType::Vocab => "Vocab",
            TranslationType::Message => "Message",
            TranslationType::InlineScript => "InlineScript",
            TranslationType::Script => "Script",
            TranslationType::System => "System",
        }
    }

    /// Dictionary table file name for this bucket.
    pub fn file_name(self) -> String {
        format!("{}.json", self.name())
    }

    /// Type of a single context path, if any rule recognises it.
    pub fn of_context(context: &str) -> Option<TranslationType> {
        if DATABASE_CATEGORIES.iter().any(|p| context.starts_with(p)) {
            if context.ends_with("/name/") {
                return Some(TranslationType::Name);
            }
            if context.ends_with("/description//") {
                return Some(TranslationType::Description);
            }
        }

        if context.ends_with("/Dialogue") {
            Some(TranslationType::Dialogue)
        } else if context.contains("/Choice/") {
            Some(TranslationType::Choice)
        } else if context.contains("/message") {
            Some(TranslationType::Message)
        } else if context.contains("/InlineScript/") {
            Some(TranslationType::InlineScript)
        } else if context.starts_with(": Scripts/") {
            if context.contains("/Vocab") {
                Some(TranslationType::Vocab)
            } else {
                Some(TranslationType::Script)
            }
        } else if context.starts_with(": System/") {
            Some(TranslationType::System)
        } else {
            None
        }
    }

    /// First recognised type among `contexts`, or `Generic`.
    pub fn from_contexts<S: AsRef<str>>(contexts: &[S]) -> TranslationType {
        contexts
            .iter()
            .find_map(|c| TranslationType::of_context(c.as_ref()))
            .unwrap_or(TranslationType::Generic)
    }

    /// Whether translated text of this type may be re-wrapped.
    pub fn is_wrappable(self) -> bool {
        !matches!(
            self,
            TranslationType::Name
                | TranslationType::Vocab
                | TranslationType::Script
                | TranslationType::InlineScript
                | TranslationType::System
        )
    }
}

impl fmt::Display for TranslationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Groups contexts by their own type, in order of first appearance.
pub fn group_contexts(contexts: &[String]) -> Vec<(TranslationType, Vec<String>)> {
    let mut groups: Vec<(TranslationType, Vec<String>)> = Vec::new();

    for context in contexts {
        let typ = TranslationType::of_context(context).unwrap_or(TranslationType::Generic);
        match groups.iter_mut().find(|(t, _)| *t == typ) {
            Some((_, members)) => members.push(context.clone()),
            None => groups.push((typ, vec![context.clone()])),
        }
    }

    groups
}
