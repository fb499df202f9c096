//! Structural error types for voltaic-core.

use thiserror::Error;

use crate::component::ComponentId;
use crate::node::NodeId;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum Error {
    #[error("component {component} declares no pin named {pin:?}")]
    UnknownPin { component: String, pin: String },

    #[error("pin {pin:?} of {component} is already bound to node {node}")]
    DuplicateBinding {
        component: String,
        pin: String,
        node: NodeId,
    },

    #[error("ground is already set to node {existing}")]
    GroundAlreadySet { existing: NodeId },

    #[error("unknown node: {0}")]
    NodeNotFound(NodeId),

    #[error("unknown component: {0}")]
    ComponentNotFound(ComponentId),
}

pub type Result<T> = std::result::Result<T, Error>;
