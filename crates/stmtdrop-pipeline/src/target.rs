//! Drop target resolution.
//!
//! A drop lands on some node of the page tree. Project tiles carry a
//! `data-project-id` attribute; the nearest tagged ancestor decides which project
//! the user aimed at. That result is then combined with the project implied by the
//! current route.

use std::collections::BTreeMap;
use std::sync::Arc;

use stmtdrop_core::Project;

pub const PROJECT_ID_ATTRIBUTE: &str = "data-project-id";

/// A node of the tree a drop can land on.
pub trait DropNode {
    fn attribute(&self, name: &str) -> Option<&str>;
    fn parent(&self) -> Option<&Self>;
}

/// Minimal owned page element, enough to describe where a drop landed.
#[derive(Debug, Clone, Default)]
pub struct Element {
    tag: String,
    attributes: BTreeMap<String, String>,
    parent: Option<Arc<Element>>,
}

impl Element {
    pub fn new(tag: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            ..Self::default()
        }
    }

    pub fn with_attribute(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.insert(name.into(), value.into());
        self
    }

    /// A project tile: an element tagged with the project's id.
    pub fn project_tile(project_id: impl Into<String>) -> Self {
        Self::new("div").with_attribute(PROJECT_ID_ATTRIBUTE, project_id)
    }

    /// Create a child of `parent`.
    pub fn child_of(parent: &Arc<Element>, tag: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            attributes: BTreeMap::new(),
            parent: Some(Arc::clone(parent)),
        }
    }

    pub fn tag(&self) -> &str {
        &self.tag
    }
}

impl DropNode for Element {
    fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes.get(name).map(String::as_str)
    }

    fn parent(&self) -> Option<&Self> {
        self.parent.as_deref()
    }
}

/// Project id of the nearest tagged ancestor of `node` (itself included).
///
/// The nearest tagged element wins even when its value is empty, in which case
/// the drop has no project.
pub fn closest_project_id<N: DropNode>(node: &N) -> Option<&str> {
    let mut current = Some(node);
    while let Some(n) = current {
        if let Some(id) = n.attribute(PROJECT_ID_ATTRIBUTE) {
            return (!id.is_empty()).then_some(id);
        }
        current = n.parent();
    }
    None
}

/// Known project the drop was aimed at, if any.
pub fn resolve_drop_target<'a, N: DropNode>(
    node: &N,
    projects: &'a [Project],
) -> Option<&'a Project> {
    let id = closest_project_id(node)?;
    let project = Project::find_by_id(projects, id);
    if project.is_none() {
        tracing::debug!(project_id = %id, "Drop target tagged with unknown project");
    }
    project
}

/// Project named by the active route, e.g. `/projects/{name}`.
pub fn current_project_for_route<'a>(
    projects: &'a [Project],
    route_name: Option<&str>,
) -> Option<&'a Project> {
    Project::find_by_name(projects, route_name?)
}

/// What to do with a validated file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TargetDecision {
    Upload(Project),
    /// The file was dropped on a project other than the one being viewed.
    ConfirmCrossProject { target: Project, current: Project },
    /// Nothing tells us where the file goes.
    SelectProject,
}

pub fn decide(dropped: Option<&Project>, current: Option<&Project>) -> TargetDecision {
    match (dropped, current) {
        (Some(target), Some(current)) if target.id != current.id => {
            TargetDecision::ConfirmCrossProject {
                target: target.clone(),
                current: current.clone(),
            }
        }
        (Some(target), _) => TargetDecision::Upload(target.clone()),
        (None, Some(current)) => TargetDecision::Upload(current.clone()),
        (None, None) => TargetDecision::SelectProject,
    }
}
