//! # Scene Graph
//!
//! A mutable, shared-ownership 3D scene graph for rendering and physics
//! front ends.
//!
//! ## Features
//!
//! - **Shared subgraphs**: nodes may sit under several parents at once;
//!   children are reference-counted, parent links are non-owning
//! - **Cached bounding volumes**: aggregate boxes are invalidated eagerly on
//!   mutation and recomputed lazily on read
//! - **Path-carrying notification**: every mutation walks up all parent
//!   paths, telling each observer what changed and along which branch
//! - **Session-scoped cloning**: shared subgraphs stay shared within one
//!   [`CloneContext`](scene::CloneContext)
//! - **Open class registry**: integer class ids and super-kind chains for
//!   reflection-free "is-a" queries
//!
//! ## Quick Start
//!
//! ```rust
//! use scene_graph::prelude::*;
//!
//! let root = Group::new();
//! let lift = PosTransform::from_translation(Vec3::new(0.0, 2.0, 0.0));
//! let leaf = GeometryNode::with_bounding_box(BoundingBox::from_center_extents(
//!     Point3::origin(),
//!     Vec3::new(0.5, 0.5, 0.5),
//! ));
//!
//! lift.add_child(leaf, None);
//! root.add_child(lift.clone(), None);
//! assert_eq!(root.bounding_box().center(), Point3::new(0.0, 2.0, 0.0));
//!
//! // Mutations carry an update token so observers and bounding-box caches
//! // on every ancestor path stay coherent.
//! let mut update = SceneUpdate::new(UpdateAction::empty());
//! lift.set_translation(Vec3::new(0.0, 0.0, 5.0), Some(&mut update));
//! assert_eq!(root.bounding_box().center(), Point3::new(0.0, 0.0, 5.0));
//! ```

#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]
#![allow(clippy::module_name_repetitions, clippy::similar_names, clippy::too_many_arguments)]

pub mod foundation;
pub mod scene;

/// Common imports for scene graph users
pub mod prelude {
    pub use crate::foundation::math::{Affine3, Isometry3, Mat4, Point3, Quat, Vec3};
    pub use crate::scene::{
        AffineTransform, BoundingBox, ClassId, CloneContext, Connection, FixedPixelSizeGroup,
        GeometryNode, Group, GroupNode, GroupRef, PosTransform, SceneClassRegistry, SceneError,
        SceneNode, SceneNodeRef, SceneObject, SceneObjectRef, SceneUpdate, ScaleTransform, Signal,
        Switch, SwitchableGroup, TransformNode, TraverseStatus, UnpickableGroup, UpdateAction,
    };
}
