//! Ordered keyword rules used to guess a first step and a time estimate.
//!
//! Rules are evaluated top to bottom against the lowercased title and the first
//! match wins.

/// A single textual cue.
#[derive(Debug, Clone, Copy)]
pub enum Cue {
    /// Substring anywhere in the text.
    Contains(&'static str),
    /// The word opens the text or appears surrounded by spaces.
    Word(&'static str),
}

impl Cue {
    pub fn matches(&self, lower: &str) -> bool {
        match *self {
            Cue::Contains(needle) => lower.contains(needle),
            Cue::Word(word) => {
                let leading = lower
                    .strip_prefix(word)
                    .map_or(false, |rest| rest.starts_with(' '));
                leading || lower.contains(&format!(" {word} "))
            }
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct Rule<T: 'static> {
    pub cues: &'static [Cue],
    pub value: T,
}

impl<T: Copy> Rule<T> {
    pub fn matches(&self, lower: &str) -> bool {
        self.cues.iter().any(|cue| cue.matches(lower))
    }
}

pub fn first_match<T: Copy>(rules: &[Rule<T>], lower: &str, fallback: T) -> T {
    rules
        .iter()
        .find(|rule| rule.matches(lower))
        .map_or(fallback, |rule| rule.value)
}

/// Leading phrases removed from a capture, checked in order.
pub const LEADING_PHRASES: &[&str] = &[
    "remind me to ",
    "remind me ",
    "i need to ",
    "dont forget to ",
    "don't forget to ",
    "capture ",
    "note to ",
];

pub const GENERIC_START_STEP: &str = "Open the first app you need → do the smallest next step";

pub const START_STEP_RULES: &[Rule<&str>] = &[
    Rule {
        cues: &[Cue::Word("email")],
        value: "Open Mail → find the thread → write two sentences",
    },
    Rule {
        cues: &[Cue::Word("call")],
        value: "Open Phone → search the contact → tap call",
    },
    Rule {
        cues: &[Cue::Contains("pay "), Cue::Contains(" bill"), Cue::Contains("rent")],
        value: "Open the app or site → pay the amount due → confirm",
    },
    Rule {
        cues: &[Cue::Contains("schedule"), Cue::Contains("appointment")],
        value: "Open Phone → call the office → ask for the next opening",
    },
    Rule {
        cues: &[Cue::Contains("buy "), Cue::Contains("pick up ")],
        value: "Add it to your shopping list or cart",
    },
];

pub const DEFAULT_ESTIMATE_MINUTES: u32 = 5;

pub const ESTIMATE_RULES: &[Rule<u32>] = &[
    Rule {
        cues: &[Cue::Contains("pay")],
        value: 5,
    },
    Rule {
        cues: &[Cue::Contains("email")],
        value: 4,
    },
    Rule {
        cues: &[Cue::Contains("call")],
        value: 6,
    },
    Rule {
        cues: &[Cue::Contains("buy")],
        value: 3,
    },
];
