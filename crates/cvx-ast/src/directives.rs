use crate::language::{first_syntax_error, string_value, SourceLanguage};
use once_cell::sync::Lazy;
use regex::Regex;
use tracing::debug;

/// The directive that places a module in the node environment.
pub const USE_NODE: &str = "use node";

static USE_NODE_LINE: Lazy<Option<Regex>> =
    Lazy::new(|| Regex::new(r#"(?m)^\s*("|')use node("|');?\s*$"#).ok());

/// Which detection strategy produced a [`DirectiveScan`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DirectiveTier {
    /// The module parsed cleanly and its directive prologue was inspected.
    Structural,
    /// The module did not parse; any line consisting solely of the directive counts.
    RegexFallback,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirectiveScan {
    pub found: bool,
    pub tier: DirectiveTier,
    /// Set when the structural parse failed.
    pub parse_error: Option<String>,
}

/// Detect a `"use node"` directive in `source`.
///
/// Only the directive prologue counts: the run of string-literal expression
/// statements at the top of the module, ignoring comments and a hashbang.
/// A module that fails to parse is scanned line by line instead, which can
/// report a directive that sits inside a comment.
pub fn scan_use_node(source: &str, language: SourceLanguage) -> DirectiveScan {
    if !source.contains(USE_NODE) {
        return DirectiveScan {
            found: false,
            tier: DirectiveTier::Structural,
            parse_error: None,
        };
    }

    let sg = language.parse(source);
    let root = sg.root();
    if let Some(parse_error) = first_syntax_error(&root, source) {
        debug!("Falling back to line scan for directive: {}", parse_error);
        let found = USE_NODE_LINE
            .as_ref()
            .is_some_and(|re| re.is_match(source));
        return DirectiveScan {
            found,
            tier: DirectiveTier::RegexFallback,
            parse_error: Some(parse_error),
        };
    }

    let mut found = false;
    for child in root.children() {
        match child.kind().as_ref() {
            "comment" | "hash_bang_line" => continue,
            "expression_statement" => {
                let Some(literal) = child.children().find(|n| n.kind() == "string") else {
                    break;
                };
                if string_value(&literal.text()) == USE_NODE {
                    found = true;
                    break;
                }
            }
            _ => break,
        }
    }

    DirectiveScan {
        found,
        tier: DirectiveTier::Structural,
        parse_error: None,
    }
}
