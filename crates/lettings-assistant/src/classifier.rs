//! Intent classification.
//!
//! An ordered rule table: the first row whose keyword groups all match
//! decides the intent, and text that matches no row is general chat.

use std::sync::LazyLock;

use regex::Regex;
use tracing::debug;

use crate::extractor;
use crate::intent::{Action, Intent, IntentDescriptor};

/// A keyword matched case-insensitively.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Keyword {
    /// Matches anywhere in the text (`bedroom` matches `2bedroom`,
    /// `search` matches `research`). Spaces match any run of whitespace.
    Stem(&'static str),
    /// Matches only the whole word (`add` does not match `address`).
    Word(&'static str),
}

impl Keyword {
    fn pattern(&self) -> String {
        let words = |s: &str| {
            s.split_whitespace()
                .map(regex::escape)
                .collect::<Vec<_>>()
                .join(r"\s+")
        };
        match self {
            Keyword::Stem(s) => words(s),
            Keyword::Word(s) => format!(r"\b{}\b", words(s)),
        }
    }
}

/// One row of the rule table.
pub struct Rule {
    pub action: Action,
    /// Every group must match; a group matches when any of its keywords does.
    pub groups: &'static [&'static [Keyword]],
    pub extract: fn(&str) -> IntentDescriptor,
}

const LOOKUP_VERBS: &[Keyword] = &[
    Keyword::Stem("search"),
    Keyword::Stem("find"),
    Keyword::Stem("show"),
    Keyword::Stem("list"),
];

/// The rule table, in priority order.
pub static RULES: &[Rule] = &[
    Rule {
        action: Action::SearchProperties,
        groups: &[
            LOOKUP_VERBS,
            &[
                Keyword::Stem("property"),
                Keyword::Stem("properties"),
                Keyword::Stem("flat"),
                Keyword::Stem("house"),
                Keyword::Stem("bedroom"),
            ],
        ],
        extract: extract_property_search,
    },
    Rule {
        action: Action::SearchResidents,
        groups: &[
            LOOKUP_VERBS,
            &[Keyword::Stem("tenant"), Keyword::Stem("resident")],
        ],
        extract: extract_resident_search,
    },
    Rule {
        action: Action::CreateProperty,
        groups: &[&[
            Keyword::Word("add"),
            Keyword::Stem("create"),
            Keyword::Stem("new property"),
        ]],
        extract: extract_new_property,
    },
    Rule {
        action: Action::FindTenant,
        groups: &[&[
            Keyword::Stem("who is"),
            Keyword::Stem("current tenant"),
            Keyword::Stem("tenant of"),
        ]],
        extract: extract_tenant_lookup,
    },
];

fn extract_property_search(text: &str) -> IntentDescriptor {
    let (filter, ambiguities) = extractor::property_filter(text);
    IntentDescriptor::new(Intent::SearchProperties(filter)).with_ambiguities(ambiguities)
}

fn extract_resident_search(text: &str) -> IntentDescriptor {
    IntentDescriptor::new(Intent::SearchResidents(extractor::resident_filter(text)))
}

fn extract_new_property(text: &str) -> IntentDescriptor {
    let (property, ambiguities) = extractor::new_property(text);
    IntentDescriptor::new(Intent::CreateProperty(property)).with_ambiguities(ambiguities)
}

fn extract_tenant_lookup(text: &str) -> IntentDescriptor {
    IntentDescriptor::new(Intent::FindTenant(extractor::tenant_filter(text)))
}

// =============================================================================
// Compiled rule table
// =============================================================================

struct CompiledRule {
    rule: &'static Rule,
    groups: Vec<Regex>,
}

static COMPILED: LazyLock<Vec<CompiledRule>> = LazyLock::new(|| {
    RULES
        .iter()
        .map(|rule| CompiledRule {
            rule,
            groups: rule
                .groups
                .iter()
                .map(|group| {
                    let alts: Vec<String> = group.iter().map(Keyword::pattern).collect();
                    Regex::new(&format!("(?i)(?:{})", alts.join("|")))
                        .expect("Invalid keyword regex")
                })
                .collect(),
        })
        .collect()
});

/// The first rule matching `text`, if any.
pub fn matching_rule(text: &str) -> Option<&'static Rule> {
    COMPILED
        .iter()
        .find(|compiled| compiled.groups.iter().all(|re| re.is_match(text)))
        .map(|compiled| compiled.rule)
}

/// Classify a message and extract the parameters for its intent.
pub fn classify(text: &str) -> IntentDescriptor {
    let descriptor = match matching_rule(text) {
        Some(rule) => (rule.extract)(text),
        None => IntentDescriptor::general_chat(),
    };
    debug!(
        action = ?descriptor.action(),
        ambiguities = descriptor.ambiguities.len(),
        "Message classified"
    );
    descriptor
}
