//! Merging definition bundles with implementation bundles into the payload a
//! deployment starts from.

use crate::bundle::Bundle;
use crate::components::{
    AppImplementation, ComponentDefinitionPath, DefinitionBundles, Implementations,
};
use crate::errors::BundleError;
use cvx_manifest::NodeDependency;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppDefinitionConfig {
    /// Absent for projects without a root `convex.config`.
    pub definition: Option<Bundle>,
    pub dependencies: Vec<ComponentDefinitionPath>,
    pub schema: Option<Bundle>,
    pub functions: Vec<Bundle>,
    pub auth: Option<Bundle>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComponentDefinitionConfig {
    pub definition_path: ComponentDefinitionPath,
    pub definition: Bundle,
    pub dependencies: Vec<ComponentDefinitionPath>,
    pub schema: Option<Bundle>,
    pub functions: Vec<Bundle>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StartPushPayload {
    pub app_definition: AppDefinitionConfig,
    pub component_definitions: Vec<ComponentDefinitionConfig>,
    pub node_dependencies: Vec<NodeDependency>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub node_version: Option<String>,
}

impl StartPushPayload {
    /// Every module in the payload, app first, in emission order.
    pub fn modules(&self) -> impl Iterator<Item = &Bundle> {
        let app = &self.app_definition;
        app.definition
            .iter()
            .chain(app.schema.iter())
            .chain(app.functions.iter())
            .chain(app.auth.iter())
            .chain(self.component_definitions.iter().flat_map(|c| {
                std::iter::once(&c.definition)
                    .chain(c.schema.iter())
                    .chain(c.functions.iter())
            }))
    }
}

/// Payload for a project whose functions directory is not a component.
pub fn assemble_app(app: AppImplementation, node_version: Option<String>) -> StartPushPayload {
    StartPushPayload {
        app_definition: AppDefinitionConfig {
            definition: None,
            dependencies: Vec::new(),
            schema: app.schema,
            functions: app.functions,
            auth: app.auth,
        },
        component_definitions: Vec::new(),
        node_dependencies: app.external_node_dependencies,
        node_version,
    }
}

/// Pair each definition with its implementation.
///
/// Nothing is emitted unless every definition has exactly one
/// implementation and only the app declares external packages.
pub fn assemble(
    definitions: DefinitionBundles,
    implementations: Implementations,
    node_version: Option<String>,
) -> Result<StartPushPayload, BundleError> {
    if let Some(component) = implementations
        .components
        .iter()
        .find(|c| !c.external_node_dependencies.is_empty())
    {
        return Err(BundleError::fatal(format!(
            "Component {} uses external packages ({}): external dependencies not supported in components",
            component.definition_path,
            component
                .external_node_dependencies
                .iter()
                .map(|d| d.name.as_str())
                .collect::<Vec<_>>()
                .join(", ")
        )));
    }

    for implementation in &implementations.components {
        if !definitions
            .components
            .iter()
            .any(|d| d.definition_path == implementation.definition_path)
        {
            return Err(BundleError::fatal(format!(
                "No definition found for component implementation {}",
                implementation.definition_path
            )));
        }
    }

    let mut implementations_left = implementations.components;
    let mut component_definitions = Vec::with_capacity(definitions.components.len());
    for definition in definitions.components {
        let matching: Vec<usize> = implementations_left
            .iter()
            .enumerate()
            .filter(|(_, i)| i.definition_path == definition.definition_path)
            .map(|(index, _)| index)
            .collect();
        let [index] = matching[..] else {
            return Err(BundleError::fatal(format!(
                "Expected one implementation for component {}, found {}",
                definition.definition_path,
                matching.len()
            )));
        };
        let implementation = implementations_left.swap_remove(index);
        component_definitions.push(ComponentDefinitionConfig {
            definition_path: definition.definition_path,
            definition: definition.definition,
            dependencies: definition.dependencies,
            schema: implementation.schema,
            functions: implementation.functions,
        });
    }

    let app = implementations.app;
    Ok(StartPushPayload {
        app_definition: AppDefinitionConfig {
            definition: Some(definitions.app.definition),
            dependencies: definitions.app.dependencies,
            schema: app.schema,
            functions: app.functions,
            auth: app.auth,
        },
        component_definitions,
        node_dependencies: app.external_node_dependencies,
        node_version,
    })
}
