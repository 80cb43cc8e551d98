use crate::language::{first_syntax_error, string_value, SourceLanguage};
use once_cell::sync::Lazy;
use regex::Regex;
use tracing::debug;

const SERVER_MODULE: &str = "convex/server";
const HTTP_ROUTER: &str = "httpRouter";

static MODULE_SYNTAX: Lazy<Option<Regex>> =
    Lazy::new(|| Regex::new(r"(?m)^\s{0,100}(import|export)").ok());

static HTTP_ROUTER_IMPORT: Lazy<Option<Regex>> = Lazy::new(|| {
    Regex::new(r#"import\s*\{\s*httpRouter.*\}\s*from\s*"\s*convex/server\s*""#).ok()
});

/// Whether any line starts (after indentation) with `import` or `export`.
///
/// TypeScript files without module syntax are declaration-only or scripts and
/// are not bundled as entry points.
pub fn has_module_syntax(source: &str) -> bool {
    MODULE_SYNTAX.as_ref().is_some_and(|re| re.is_match(source))
}

/// Whether the module imports `httpRouter` from the platform's server package.
pub fn imports_http_router(source: &str, language: SourceLanguage) -> bool {
    if !source.contains(HTTP_ROUTER) {
        return false;
    }

    let sg = language.parse(source);
    let root = sg.root();
    if let Some(parse_error) = first_syntax_error(&root, source) {
        debug!("Falling back to regex for router import: {}", parse_error);
        return HTTP_ROUTER_IMPORT
            .as_ref()
            .is_some_and(|re| re.is_match(source));
    }

    let found = root
        .children()
        .filter(|n| n.kind() == "import_statement")
        .any(|import| {
            let from_server = import
                .field("source")
                .is_some_and(|s| string_value(&s.text()) == SERVER_MODULE);
            from_server
                && import
                    .dfs()
                    .filter(|n| n.kind() == "import_specifier")
                    .filter_map(|n| n.field("name"))
                    .any(|name| name.text() == HTTP_ROUTER)
        });
    found
}
