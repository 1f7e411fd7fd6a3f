//! Scene graph core
//!
//! A mutable, shared-ownership scene graph: a directed acyclic graph of
//! nodes describing spatial transforms, groupings and renderable geometry
//! for a rendering/physics front end.
//!
//! ## Architecture
//!
//! ```text
//! SceneObject (identity, parents, signals, attributes)
//!      |
//! SceneNode (class id, bounding box)
//!      |
//! GroupNode (ordered shared children, cached aggregate bounds)
//!      |
//! TransformNode / SwitchableGroup / decoration groups
//! ```
//!
//! The layers are traits over shared base structs ([`ObjectCore`],
//! [`NodeBase`], [`GroupBase`]), so every group-like kind shares one
//! implementation of child mutation, cache invalidation and upward
//! notification. Runtime "is-a" queries go through the
//! [`SceneClassRegistry`] instead of language reflection.

mod bounding_box;
mod clone;
mod decoration;
mod error;
mod geometry;
mod group;
mod node;
mod object;
mod registry;
mod signal;
mod switch;
mod transform;
mod update;

pub use bounding_box::BoundingBox;
pub use clone::CloneContext;
pub use decoration::{FixedPixelSizeGroup, UnpickableGroup};
pub use error::SceneError;
pub use geometry::GeometryNode;
pub use group::{Group, GroupBase, GroupNode, GroupRef};
pub use node::{
    downcast, same_node, try_downcast, NodeBase, SceneNode, SceneNodeRef, WeakSceneNode,
};
pub use object::{
    downcast_object, same_object, try_downcast_object, ObjectAttributes, ObjectCore, SceneObject,
    SceneObjectRef, TraverseStatus, WeakSceneObject,
};
pub use registry::{ClassId, SceneClassRegistry};
pub use signal::{Connection, Signal};
pub use switch::{Switch, SwitchableGroup};
pub use transform::{AffineTransform, PosTransform, ScaleTransform, TransformNode};
pub use update::{SceneUpdate, UpdateAction};
