use super::types::{Drawer, Intent};

/// Verb rule: the first rule whose keyword occurs in the utterance wins.
#[derive(Debug, Clone, Copy)]
pub struct Rule {
    pub keyword: &'static str,
    pub build: fn(Drawer) -> Intent,
}

fn lock_any(_: Drawer) -> Intent {
    Intent::Lock
}

/// Priority-ordered verbs. "open" beats "close" beats "lock".
const RULES: &[Rule] = &[
    Rule { keyword: "open", build: Intent::Open },
    Rule { keyword: "close", build: Intent::Close },
    Rule { keyword: "lock", build: lock_any },
];

/// Drawer synonyms, checked in order. Top is tried before bottom.
const DRAWER_SYNONYMS: &[(Drawer, &[&str])] = &[
    (Drawer::Top, &["top", "one", "upper"]),
    (Drawer::Bottom, &["bottom", "two", "lower"]),
];

/// Keyword parser for recognized speech.
///
/// Matching is plain substring containment on the lower-cased text, so "unlock"
/// still counts as "lock" and "someone" still names drawer one.
#[derive(Debug, Default, Clone, Copy)]
pub struct IntentParser;

impl IntentParser {
    pub fn new() -> Self {
        Self
    }

    pub fn rules(&self) -> &'static [Rule] {
        RULES
    }

    pub fn parse(&self, utterance: &str) -> Intent {
        let text = utterance.to_lowercase();

        RULES
            .iter()
            .find(|rule| text.contains(rule.keyword))
            .map(|rule| (rule.build)(resolve_drawer(&text)))
            .unwrap_or(Intent::Invalid)
    }
}

fn resolve_drawer(text: &str) -> Drawer {
    DRAWER_SYNONYMS
        .iter()
        .find(|(_, words)| words.iter().any(|w| text.contains(w)))
        .map(|(drawer, _)| *drawer)
        .unwrap_or(Drawer::Any)
}

/// Shorthand for `IntentParser::new().parse(..)`.
pub fn parse(utterance: &str) -> Intent {
    IntentParser.parse(utterance)
}
