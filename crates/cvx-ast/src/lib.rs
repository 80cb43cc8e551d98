//! Source analysis for the bundler using ast-grep
//!
//! Answers the few questions the bundler asks about a module before handing it
//! to the build tool:
//! - does it open with the `"use node"` directive ([`directives`])
//! - does it contain any module syntax at all ([`imports::has_module_syntax`])
//! - does it import the HTTP router from the platform package ([`imports::imports_http_router`])
//!
//! Structural answers come from the tree-sitter grammars bundled with
//! `ast-grep-language`. When a file does not parse cleanly, each check falls
//! back to a line-oriented regex and reports which tier produced the answer.

pub mod directives;
pub mod errors;
pub mod imports;
pub mod language;

pub use directives::{scan_use_node, DirectiveScan, DirectiveTier, USE_NODE};
pub use errors::AstError;
pub use imports::{has_module_syntax, imports_http_router};
pub use language::SourceLanguage;
