use crate::errors::AstError;
use ast_grep_core::source::StrDoc;
use ast_grep_core::{AstGrep, Node};
use ast_grep_language::SupportLang;
use std::path::Path;

/// Grammar used to parse a module, chosen by file extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceLanguage {
    JavaScript,
    TypeScript,
    Tsx,
}

impl SourceLanguage {
    pub fn from_path(path: &Path) -> Result<Self, AstError> {
        let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("");
        Self::from_extension(ext).ok_or_else(|| AstError::UnsupportedExtension(path.to_path_buf()))
    }

    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext {
            "js" | "mjs" | "cjs" | "jsx" => Some(SourceLanguage::JavaScript),
            "ts" | "mts" | "cts" => Some(SourceLanguage::TypeScript),
            "tsx" => Some(SourceLanguage::Tsx),
            _ => None,
        }
    }

    fn grammar(self) -> SupportLang {
        match self {
            SourceLanguage::JavaScript => SupportLang::JavaScript,
            SourceLanguage::TypeScript => SupportLang::TypeScript,
            SourceLanguage::Tsx => SupportLang::Tsx,
        }
    }

    pub(crate) fn parse(self, source: &str) -> AstGrep<StrDoc<SupportLang>> {
        AstGrep::new(source, self.grammar())
    }
}

/// Describe the first syntax error in the tree, if any.
pub(crate) fn first_syntax_error(root: &Node<StrDoc<SupportLang>>, source: &str) -> Option<String> {
    let error = root.dfs().find(|n| n.kind() == "ERROR")?;
    let offset = error.range().start;
    let before = &source[..offset.min(source.len())];
    let line = before.matches('\n').count() + 1;
    let column = before.rsplit('\n').next().map_or(0, |l| l.chars().count()) + 1;
    Some(format!("unexpected syntax at line {line}, column {column}"))
}

/// Text of a string literal node without its quotes.
pub(crate) fn string_value(text: &str) -> &str {
    let trimmed = text.trim();
    if trimmed.len() >= 2 {
        &trimmed[1..trimmed.len() - 1]
    } else {
        trimmed
    }
}
