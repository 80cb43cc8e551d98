use crate::build_tool::{HookPlan, ResolveArgs, ResolveHook, ResolveOutcome};
use crate::errors::BundleError;
use cvx_manifest::{module_of, ExternalPackage};
use regex::Regex;
use std::collections::{BTreeMap, BTreeSet};

/// Marks imports of allowed external packages as external and records which
/// packages were left out and which were bundled.
pub struct ExternalsHook<'a> {
    packages: &'a BTreeMap<String, ExternalPackage>,
    pub external_module_names: BTreeSet<String>,
    pub bundled_module_names: BTreeSet<String>,
}

impl<'a> ExternalsHook<'a> {
    pub fn new(packages: &'a BTreeMap<String, ExternalPackage>) -> Self {
        ExternalsHook {
            packages,
            external_module_names: BTreeSet::new(),
            bundled_module_names: BTreeSet::new(),
        }
    }
}

impl ResolveHook for ExternalsHook<'_> {
    fn name(&self) -> &str {
        "convex-node-externals"
    }

    fn filter(&self) -> Option<&Regex> {
        None
    }

    fn plan(&self) -> HookPlan {
        HookPlan::Externals(self.packages.keys().cloned().collect())
    }

    fn on_resolve(&mut self, args: &ResolveArgs) -> Result<ResolveOutcome, BundleError> {
        if args.namespace != "file" {
            return Ok(ResolveOutcome::None);
        }
        let Some(module) = module_of(&args.path) else {
            return Ok(ResolveOutcome::None);
        };
        if self.packages.contains_key(module) {
            self.external_module_names.insert(module.to_string());
            return Ok(ResolveOutcome::External(args.path.clone()));
        }
        self.bundled_module_names.insert(module.to_string());
        Ok(ResolveOutcome::None)
    }
}
