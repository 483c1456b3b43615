//! # Runtime Tree
//!
//! Arena of adapters, channels and workflows. Children are owned by index;
//! a node's parent is a [`NodeId`] used only to read the parent's live state
//! when a lifecycle request is validated.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use tracing::debug;

use super::adapter::Adapter;
use super::channel::Channel;
use crate::config::ConfigurationError;
use crate::error::{Result, RuntimeError};
use crate::lifecycle::{LifecycleRequest, LifecycleState, ParentStateValidator, StateManagedComponent};
use crate::workflow::StandardWorkflow;

/// Index of a node in a [`RuntimeTree`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

impl NodeId {
    pub fn index(&self) -> usize {
        self.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeKind {
    Adapter,
    Channel,
    Workflow,
}

impl NodeKind {
    fn parent_kind(&self) -> Option<NodeKind> {
        match self {
            Self::Adapter => None,
            Self::Channel => Some(Self::Adapter),
            Self::Workflow => Some(Self::Channel),
        }
    }
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Adapter => write!(f, "adapter"),
            Self::Channel => write!(f, "channel"),
            Self::Workflow => write!(f, "workflow"),
        }
    }
}

/// The component wrapped by a node
#[derive(Clone)]
pub enum NodeComponent {
    Adapter(Arc<Adapter>),
    Channel(Arc<Channel>),
    Workflow(Arc<StandardWorkflow>),
}

impl NodeComponent {
    pub fn kind(&self) -> NodeKind {
        match self {
            Self::Adapter(_) => NodeKind::Adapter,
            Self::Channel(_) => NodeKind::Channel,
            Self::Workflow(_) => NodeKind::Workflow,
        }
    }

    pub fn state(&self) -> LifecycleState {
        match self {
            Self::Adapter(adapter) => adapter.state(),
            Self::Channel(channel) => channel.state(),
            Self::Workflow(workflow) => workflow.state(),
        }
    }

    async fn request(&self, request: LifecycleRequest) -> Result<()> {
        let component: &dyn StateManagedComponent = match self {
            Self::Adapter(adapter) => adapter.as_ref(),
            Self::Channel(channel) => channel.as_ref(),
            Self::Workflow(workflow) => workflow.as_ref(),
        };
        match request {
            LifecycleRequest::Init => component.request_init().await?,
            LifecycleRequest::Start => component.request_start().await?,
            LifecycleRequest::Stop => component.request_stop().await?,
            LifecycleRequest::Close => component.request_close().await?,
        }
        Ok(())
    }
}

struct Node {
    unique_id: String,
    component: NodeComponent,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
}

#[derive(Default)]
pub struct RuntimeTree {
    nodes: Vec<Node>,
}

impl RuntimeTree {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn add_adapter(&mut self, adapter: Adapter) -> std::result::Result<NodeId, ConfigurationError> {
        let unique_id = adapter.unique_id().to_string();
        self.insert(None, unique_id, NodeComponent::Adapter(Arc::new(adapter)))
    }

    /// Add a channel under an adapter node; the adapter then cascades to it
    pub fn add_channel(
        &mut self,
        adapter: NodeId,
        channel: Channel,
    ) -> std::result::Result<NodeId, ConfigurationError> {
        let unique_id = channel.unique_id().to_string();
        let channel = Arc::new(channel);
        let id = self.insert(
            Some(adapter),
            unique_id,
            NodeComponent::Channel(Arc::clone(&channel)),
        )?;
        if let Some(NodeComponent::Adapter(parent)) = self.component(adapter) {
            parent.add_channel(channel);
        }
        Ok(id)
    }

    /// Add a workflow under a channel node; the channel then cascades to it
    pub fn add_workflow(
        &mut self,
        channel: NodeId,
        workflow: StandardWorkflow,
    ) -> std::result::Result<NodeId, ConfigurationError> {
        let unique_id = workflow.unique_id().to_string();
        let workflow = Arc::new(workflow);
        let id = self.insert(
            Some(channel),
            unique_id,
            NodeComponent::Workflow(Arc::clone(&workflow)),
        )?;
        if let Some(NodeComponent::Channel(parent)) = self.component(channel) {
            parent.add_workflow(workflow);
        }
        Ok(id)
    }

    fn insert(
        &mut self,
        parent: Option<NodeId>,
        unique_id: String,
        component: NodeComponent,
    ) -> std::result::Result<NodeId, ConfigurationError> {
        let kind = component.kind();
        if unique_id.trim().is_empty() {
            return Err(ConfigurationError::missing_required_field(
                "unique_id",
                kind.to_string(),
            ));
        }

        if let Some(parent_id) = parent {
            let parent_node = self.nodes.get(parent_id.0).ok_or_else(|| {
                ConfigurationError::invalid_value("parent", format!("{parent_id:?}"), kind.to_string())
            })?;
            let parent_kind = parent_node.component.kind();
            if kind.parent_kind() != Some(parent_kind) {
                return Err(ConfigurationError::invalid_value(
                    "parent",
                    parent_kind.to_string(),
                    format!("{kind} {unique_id}"),
                ));
            }
            if parent_node
                .children
                .iter()
                .any(|child| self.nodes[child.0].unique_id == unique_id)
            {
                return Err(ConfigurationError::invalid_value(
                    "unique_id",
                    unique_id,
                    format!("duplicate {kind} under {}", parent_node.unique_id),
                ));
            }
        } else if self
            .roots()
            .any(|root| self.nodes[root.0].unique_id == unique_id)
        {
            return Err(ConfigurationError::invalid_value(
                "unique_id",
                unique_id,
                format!("duplicate {kind}"),
            ));
        }

        let id = NodeId(self.nodes.len());
        self.nodes.push(Node {
            unique_id,
            component,
            parent,
            children: Vec::new(),
        });
        if let Some(parent_id) = parent {
            self.nodes[parent_id.0].children.push(id);
        }
        debug!(node = %self.identity(id).unwrap_or_default(), "Runtime tree node added");
        Ok(id)
    }

    fn node(&self, id: NodeId) -> Result<&Node> {
        self.nodes.get(id.0).ok_or_else(|| {
            RuntimeError::Configuration(ConfigurationError::invalid_value(
                "node",
                format!("{id:?}"),
                "runtime tree",
            ))
        })
    }

    pub fn roots(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.nodes
            .iter()
            .enumerate()
            .filter(|(_, node)| node.parent.is_none())
            .map(|(index, _)| NodeId(index))
    }

    pub fn component(&self, id: NodeId) -> Option<&NodeComponent> {
        self.nodes.get(id.0).map(|node| &node.component)
    }

    pub fn kind(&self, id: NodeId) -> Option<NodeKind> {
        self.component(id).map(NodeComponent::kind)
    }

    pub fn unique_id(&self, id: NodeId) -> Option<&str> {
        self.nodes.get(id.0).map(|node| node.unique_id.as_str())
    }

    pub fn workflow(&self, id: NodeId) -> Option<Arc<StandardWorkflow>> {
        match self.component(id)? {
            NodeComponent::Workflow(workflow) => Some(Arc::clone(workflow)),
            _ => None,
        }
    }

    pub fn state(&self, id: NodeId) -> Option<LifecycleState> {
        self.component(id).map(NodeComponent::state)
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.nodes.get(id.0)?.parent
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        self.nodes
            .get(id.0)
            .map(|node| node.children.as_slice())
            .unwrap_or(&[])
    }

    /// Hierarchical path such as `adapter=a,channel=c,workflow=w`
    pub fn identity(&self, id: NodeId) -> Option<String> {
        let mut segments = Vec::new();
        let mut cursor = Some(id);
        while let Some(current) = cursor {
            let node = self.nodes.get(current.0)?;
            segments.push(format!("{}={}", node.component.kind(), node.unique_id));
            cursor = node.parent;
        }
        segments.reverse();
        Some(segments.join(","))
    }

    /// Resolve a path produced by [`identity`](Self::identity)
    pub fn find(&self, path: &str) -> Option<NodeId> {
        let mut candidates: Vec<NodeId> = self.roots().collect();
        let mut found = None;
        for segment in path.split(',') {
            let (kind, unique_id) = segment.trim().split_once('=')?;
            let next = candidates.iter().copied().find(|candidate| {
                let node = &self.nodes[candidate.0];
                node.unique_id == unique_id && node.component.kind().to_string() == kind
            })?;
            candidates = self.children(next).to_vec();
            found = Some(next);
        }
        found
    }

    pub async fn request_init(&self, id: NodeId) -> Result<()> {
        self.request(id, LifecycleRequest::Init).await
    }

    pub async fn request_start(&self, id: NodeId) -> Result<()> {
        self.request(id, LifecycleRequest::Start).await
    }

    pub async fn request_stop(&self, id: NodeId) -> Result<()> {
        self.request(id, LifecycleRequest::Stop).await
    }

    pub async fn request_close(&self, id: NodeId) -> Result<()> {
        self.request(id, LifecycleRequest::Close).await
    }

    /// Apply `request` to a node after checking its parent's live state
    pub async fn request(&self, id: NodeId, request: LifecycleRequest) -> Result<()> {
        let node = self.node(id)?;
        if let Some(parent) = node.parent {
            let parent_state = self.node(parent)?.component.state();
            let identity = self.identity(id).unwrap_or_else(|| node.unique_id.clone());
            ParentStateValidator::check_transition(&identity, request, parent_state)?;
        }
        node.component.request(request).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::LifecycleError;

    fn tree() -> (RuntimeTree, NodeId, NodeId, NodeId) {
        let mut tree = RuntimeTree::new();
        let adapter = tree.add_adapter(Adapter::new("a")).unwrap();
        let channel = tree.add_channel(adapter, Channel::new("c")).unwrap();
        let workflow = tree
            .add_workflow(channel, StandardWorkflow::builder("w").build().unwrap())
            .unwrap();
        (tree, adapter, channel, workflow)
    }

    #[test]
    fn test_identity_and_find() {
        let (tree, adapter, channel, workflow) = tree();
        assert_eq!(
            tree.identity(workflow).as_deref(),
            Some("adapter=a,channel=c,workflow=w")
        );
        assert_eq!(tree.find("adapter=a,channel=c,workflow=w"), Some(workflow));
        assert_eq!(tree.find("adapter=a,channel=c"), Some(channel));
        assert_eq!(tree.find("adapter=a,channel=x"), None);
        assert_eq!(tree.parent(channel), Some(adapter));
        assert_eq!(tree.children(adapter), &[channel]);
    }

    #[test]
    fn test_empty_id_rejected() {
        let mut tree = RuntimeTree::new();
        let err = tree.add_adapter(Adapter::new("")).unwrap_err();
        assert!(matches!(err, ConfigurationError::MissingRequiredField { .. }));
        assert!(tree.is_empty());
    }

    #[test]
    fn test_wrong_parent_kind_and_duplicates_rejected() {
        let (mut tree, adapter, channel, _) = tree();
        assert!(tree
            .add_workflow(adapter, StandardWorkflow::builder("w2").build().unwrap())
            .is_err());
        assert!(tree.add_channel(adapter, Channel::new("c")).is_err());
        assert!(tree.add_channel(channel, Channel::new("nested")).is_err());
    }

    #[tokio::test]
    async fn test_child_start_with_closed_parent_fails() {
        let (tree, _, _, workflow) = tree();
        let err = tree.request_start(workflow).await.unwrap_err();
        assert!(matches!(
            err,
            RuntimeError::Lifecycle(LifecycleError::ParentState {
                parent_state: LifecycleState::Closed,
                ..
            })
        ));
        assert_eq!(tree.state(workflow), Some(LifecycleState::Closed));
    }

    #[tokio::test]
    async fn test_adapter_start_cascades() {
        let (tree, adapter, channel, workflow) = tree();
        tree.request_init(adapter).await.unwrap();
        tree.request_start(adapter).await.unwrap();
        assert_eq!(tree.state(channel), Some(LifecycleState::Started));
        assert_eq!(tree.state(workflow), Some(LifecycleState::Started));

        tree.request_stop(workflow).await.unwrap();
        assert_eq!(tree.state(workflow), Some(LifecycleState::Stopped));
        tree.request_start(workflow).await.unwrap();
        assert_eq!(tree.state(workflow), Some(LifecycleState::Started));

        tree.request_close(adapter).await.unwrap();
        assert_eq!(tree.state(workflow), Some(LifecycleState::Closed));
    }
}
