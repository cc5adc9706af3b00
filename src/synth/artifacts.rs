//! Bundled artifact templates per category.

use crate::model::TemplateCategory;
use std::fmt;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ArtifactKind {
    Entity,
    Contracts,
    Service,
    Route,
    TreeService,
    TreeRoute,
    TreeNode,
}

impl ArtifactKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ArtifactKind::Entity => "entity",
            ArtifactKind::Contracts => "contracts",
            ArtifactKind::Service => "service",
            ArtifactKind::Route => "route",
            ArtifactKind::TreeService => "tree_service",
            ArtifactKind::TreeRoute => "tree_route",
            ArtifactKind::TreeNode => "tree_node",
        }
    }
}

impl fmt::Display for ArtifactKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Copy, Debug)]
pub struct ArtifactTemplate {
    pub kind: ArtifactKind,
    pub source: &'static str,
    /// Expanded against the same scope as `source`.
    pub path_pattern: &'static str,
}

const ENTITY: ArtifactTemplate = ArtifactTemplate {
    kind: ArtifactKind::Entity,
    source: include_str!("../../templates/crud/entity.rs.tpl"),
    path_pattern: "${package_path}/${business_name}/entity.rs",
};

const CONTRACTS: ArtifactTemplate = ArtifactTemplate {
    kind: ArtifactKind::Contracts,
    source: include_str!("../../templates/crud/contracts.rs.tpl"),
    path_pattern: "${package_path}/${business_name}/contracts.rs",
};

const SERVICE: ArtifactTemplate = ArtifactTemplate {
    kind: ArtifactKind::Service,
    source: include_str!("../../templates/crud/service.rs.tpl"),
    path_pattern: "${package_path}/${business_name}/service.rs",
};

const ROUTE: ArtifactTemplate = ArtifactTemplate {
    kind: ArtifactKind::Route,
    source: include_str!("../../templates/crud/route.rs.tpl"),
    path_pattern: "${package_path}/${business_name}/routes.rs",
};

const TREE_SERVICE: ArtifactTemplate = ArtifactTemplate {
    kind: ArtifactKind::TreeService,
    source: include_str!("../../templates/tree/tree_service.rs.tpl"),
    path_pattern: "${package_path}/${business_name}/service.rs",
};

const TREE_ROUTE: ArtifactTemplate = ArtifactTemplate {
    kind: ArtifactKind::TreeRoute,
    source: include_str!("../../templates/tree/tree_route.rs.tpl"),
    path_pattern: "${package_path}/${business_name}/routes.rs",
};

const TREE_NODE: ArtifactTemplate = ArtifactTemplate {
    kind: ArtifactKind::TreeNode,
    source: include_str!("../../templates/tree/tree_node.rs.tpl"),
    path_pattern: "${package_path}/${business_name}/tree.rs",
};

/// Artifact templates for a category, in render order.
pub fn list_artifact_templates(category: TemplateCategory) -> Vec<ArtifactTemplate> {
    match category {
        TemplateCategory::SingleTableCrud => vec![ENTITY, CONTRACTS, SERVICE, ROUTE],
        TemplateCategory::TreeTable => vec![ENTITY, CONTRACTS, TREE_SERVICE, TREE_ROUTE, TREE_NODE],
    }
}
