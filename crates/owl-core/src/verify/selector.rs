//! Selector grammar.
//!
//! A selector string is one of three things: a CSS selector, a coordinate
//! pair of the form `<x>x<y>`, or a natural-language description handed to
//! the pluggable finder. Classification is purely syntactic.

use std::sync::LazyLock;

use regex::Regex;

static COORDINATE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*(\d+)x(\d+)\s*$").expect("coordinate regex"));

/// Characters that mark a string as CSS rather than natural language.
const CSS_META: &[char] = &[
    '#', '.', '[', ']', '>', ':', '+', '~', '*', '^', '$', '=', '(', ')', '"', '\'',
];

/// A classified selector.
#[derive(Debug, Clone, PartialEq)]
pub enum Selector {
    /// A CSS selector, passed to the engine as-is.
    Css(String),
    /// A viewport coordinate, `<x>x<y>`.
    Coordinate { x: f64, y: f64 },
    /// A natural-language description for the finder.
    Natural(String),
}

impl Selector {
    /// Classify a raw selector string.
    pub fn parse(raw: &str) -> Self {
        if let Some(caps) = COORDINATE.captures(raw) {
            let x = caps[1].parse().unwrap_or(0.0);
            let y = caps[2].parse().unwrap_or(0.0);
            return Self::Coordinate { x, y };
        }
        if raw.contains(CSS_META) {
            Self::Css(raw.to_string())
        } else {
            Self::Natural(raw.to_string())
        }
    }
}
