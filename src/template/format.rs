//! Symbol references inside format strings
//!
//! A reference is written `$(name)` where `name` is one or more lowercase
//! letters, underscores or parentheses, so legacy names like `(bfp_name)`
//! are referenced as `$((bfp_name))`.

use std::sync::LazyLock;

use regex::Regex;

static REFERENCE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\$\(([()a-z_]+)\)").expect("reference pattern is valid"));

/// The literal token that references `name`
pub fn token(name: &str) -> String {
    format!("$({})", name)
}

/// Distinct symbol names referenced by `text`, in order of first appearance
pub fn references(text: &str) -> Vec<&str> {
    let mut names: Vec<&str> = Vec::new();
    for caps in REFERENCE.captures_iter(text) {
        if let Some(name) = caps.get(1) {
            if !names.contains(&name.as_str()) {
                names.push(name.as_str());
            }
        }
    }
    names
}

/// Replace every reference token in `text` with the value `lookup` returns.
///
/// Tokens for which `lookup` returns None are left in place. Substituted
/// values are not scanned again.
pub fn substitute<'v, F>(text: &str, mut lookup: F) -> String
where
    F: FnMut(&str) -> Option<&'v str>,
{
    let mut out = String::with_capacity(text.len());
    let mut last = 0;
    for caps in REFERENCE.captures_iter(text) {
        let (Some(whole), Some(name)) = (caps.get(0), caps.get(1)) else {
            continue;
        };
        out.push_str(&text[last..whole.start()]);
        match lookup(name.as_str()) {
            Some(value) => out.push_str(value),
            None => out.push_str(whole.as_str()),
        }
        last = whole.end();
    }
    out.push_str(&text[last..]);
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_references_in_order_without_duplicates() {
        assert_eq!(
            references("$(b)-$(a)-$(b)"),
            vec!["b", "a"]
        );
    }

    #[test]
    fn test_legacy_parenthesized_names() {
        assert_eq!(references("$((bfp_name))_x"), vec!["(bfp_name)"]);
    }

    #[test]
    fn test_adjacent_references() {
        assert_eq!(references("$(a)$(b)"), vec!["a", "b"]);
        assert_eq!(references("$(a)_$(b)"), vec!["a", "b"]);
    }

    #[test]
    fn test_non_matching_text() {
        assert!(references("plain text").is_empty());
        assert!(references("$() $(Upper) $(digit1) ${brace}").is_empty());
    }

    #[test]
    fn test_substitute_is_identity_without_references() {
        let text = "no references (here) $ ( )";
        assert_eq!(substitute(text, |_| Some("x")), text);
    }

    #[test]
    fn test_substitute_leaves_unknown_tokens() {
        let values = HashMap::from([("a", "1")]);
        let out = substitute("$(a) $(b)", |n| values.get(n).copied());
        assert_eq!(out, "1 $(b)");
    }

    #[test]
    fn test_substitute_does_not_rescan_values() {
        let values = HashMap::from([("a", "$(b)"), ("b", "2")]);
        let out = substitute("$(a)", |n| values.get(n).copied());
        assert_eq!(out, "$(b)");
    }

    #[test]
    fn test_token() {
        assert_eq!(token("author"), "$(author)");
    }
}
