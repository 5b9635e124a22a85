//! Doc-text convention: `:param` help lines and description extraction.
//!
//! Lines matching `:param <name>: <text>` or `:param <type> <name>: <text>`
//! supply per-option help. Every other non-empty line not starting with `:`
//! joins the command description.

use regex::Regex;
use std::collections::HashMap;

#[derive(Debug, Default)]
pub struct DocText {
    pub description: String,
    help: HashMap<String, String>,
}

impl DocText {
    pub fn help(&self, name: &str) -> Option<&str> {
        self.help.get(name).map(String::as_str)
    }

    /// First line of the description, used by listings.
    pub fn summary(&self) -> Option<&str> {
        self.description.lines().next()
    }
}

pub fn parse(doc: &str) -> DocText {
    let mut help = HashMap::new();

    let untyped = Regex::new(r"(?m)^\s*:param\s+(\w+):\s+(.+?)\s*$").unwrap();
    for caps in untyped.captures_iter(doc) {
        help.insert(caps[1].to_string(), caps[2].to_string());
    }
    // Typed form wins when both are present for the same name.
    let typed = Regex::new(r"(?m)^\s*:param\s+(\w+)\s+(\w+):\s+(.+?)\s*$").unwrap();
    for caps in typed.captures_iter(doc) {
        help.insert(caps[2].to_string(), caps[3].to_string());
    }

    let description = doc
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with(':'))
        .collect::<Vec<_>>()
        .join("\n");

    DocText { description, help }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn param_lines_feed_help() {
        let doc = "greet someone\n\n:param name: who to greet\n:param loud: shout it\n";
        let parsed = parse(doc);
        assert_eq!(parsed.help("name"), Some("who to greet"));
        assert_eq!(parsed.help("loud"), Some("shout it"));
        assert_eq!(parsed.description, "greet someone");
    }

    #[test]
    fn typed_param_lines_parse() {
        let doc = ":param int count: how many times\n";
        let parsed = parse(doc);
        assert_eq!(parsed.help("count"), Some("how many times"));
        assert!(parsed.description.is_empty());
    }

    #[test]
    fn description_skips_param_lines() {
        let doc = "line one\nline two\n:param x: ignored\n\nline three\n";
        let parsed = parse(doc);
        assert_eq!(parsed.description, "line one\nline two\nline three");
        assert_eq!(parsed.summary(), Some("line one"));
    }

    #[test]
    fn indented_param_lines_match() {
        let doc = "    :param name: indented help\n";
        assert_eq!(parse(doc).help("name"), Some("indented help"));
    }

    #[test]
    fn empty_doc_is_empty() {
        let parsed = parse("");
        assert!(parsed.description.is_empty());
        assert_eq!(parsed.help("x"), None);
        assert_eq!(parsed.summary(), None);
    }
}
