use std::fmt::Display;

use serde::{Deserialize, Serialize};

/// Document type / class label
/// Classifiers are binary when they know exactly two labels drawn from
/// {true, false} or {0, 1}.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Label {
    Bool(bool),
    Int(i64),
    Text(String),
}

impl Label {
    /// Parse the text form written by `Display`
    /// "true"/"false" become `Bool`, integers become `Int`, anything else `Text`.
    pub fn parse(s: &str) -> Self {
        match s {
            "true" => Label::Bool(true),
            "false" => Label::Bool(false),
            _ => s
                .parse::<i64>()
                .map(Label::Int)
                .unwrap_or_else(|_| Label::Text(s.to_string())),
        }
    }

    /// `Some(true)` for the positive class of a binary problem
    pub fn polarity(&self) -> Option<bool> {
        match self {
            Label::Bool(b) => Some(*b),
            Label::Int(1) => Some(true),
            Label::Int(0) => Some(false),
            _ => None,
        }
    }
}

impl Display for Label {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Label::Bool(b) => write!(f, "{b}"),
            Label::Int(i) => write!(f, "{i}"),
            Label::Text(s) => write!(f, "{s}"),
        }
    }
}

impl From<bool> for Label {
    fn from(b: bool) -> Self {
        Label::Bool(b)
    }
}

impl From<i64> for Label {
    fn from(i: i64) -> Self {
        Label::Int(i)
    }
}

impl From<i32> for Label {
    fn from(i: i32) -> Self {
        Label::Int(i as i64)
    }
}

impl From<&str> for Label {
    fn from(s: &str) -> Self {
        Label::Text(s.to_string())
    }
}

impl From<String> for Label {
    fn from(s: String) -> Self {
        Label::Text(s)
    }
}

/// True iff `labels` has exactly two distinct members, both boolean-like
pub fn is_binary<'a, I>(labels: I) -> bool
where
    I: IntoIterator<Item = &'a Label>,
{
    let mut seen: Vec<&Label> = Vec::new();
    for label in labels {
        if !seen.contains(&label) {
            seen.push(label);
        }
    }
    seen.len() == 2
        && match (seen[0], seen[1]) {
            (Label::Bool(_), Label::Bool(_)) => true,
            (Label::Int(a), Label::Int(b)) => (0..=1).contains(a) && (0..=1).contains(b),
            _ => false,
        }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_matches_display() {
        for label in [Label::Bool(true), Label::Int(-3), Label::Text("spam".into())] {
            assert_eq!(Label::parse(&label.to_string()), label);
        }
    }

    #[test]
    fn binary_detection() {
        assert!(is_binary(&[Label::Bool(true), Label::Bool(false), Label::Bool(true)]));
        assert!(is_binary(&[Label::Int(0), Label::Int(1)]));
        assert!(!is_binary(&[Label::Int(0), Label::Int(2)]));
        assert!(!is_binary(&[Label::from("spam"), Label::from("ham")]));
        assert!(!is_binary(&[Label::Bool(true)]));
    }
}
