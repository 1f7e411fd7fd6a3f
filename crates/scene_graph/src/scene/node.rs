//! Node layer: scene objects participating in the spatial hierarchy
//!
//! A node carries the class id assigned at construction from the
//! [`SceneClassRegistry`] and a lazily recomputed bounding box. The base
//! case is a leaf with an empty box; groups and transforms override
//! [`SceneNode::bounding_box`] with their cached aggregates.

use std::rc::{Rc, Weak};

use crate::foundation::math::Affine3;
use crate::scene::bounding_box::BoundingBox;
use crate::scene::clone::CloneContext;
use crate::scene::error::SceneError;
use crate::scene::group::GroupNode;
use crate::scene::object::{
    try_downcast_object, ObjectAttributes, ObjectCore, SceneObject, SceneObjectRef, TraverseStatus,
};
use crate::scene::registry::{ClassId, SceneClassRegistry};
use crate::scene::transform::TransformNode;

/// Shared handle to a scene node
pub type SceneNodeRef = Rc<dyn SceneNode>;

/// Non-owning handle to a scene node
pub type WeakSceneNode = Weak<dyn SceneNode>;

/// State shared by every node implementation: the object core plus the
/// immutable class id
pub struct NodeBase {
    core: ObjectCore,
    self_node: WeakSceneNode,
    class_id: ClassId,
}

impl NodeBase {
    /// Create the base for a new node of the given registered class
    pub fn new<T: SceneNode + 'static>(
        self_ref: &Weak<T>,
        class_id: ClassId,
        attributes: ObjectAttributes,
    ) -> Self {
        let self_node: WeakSceneNode = self_ref.clone();
        Self {
            core: ObjectCore::new(self_ref, attributes | ObjectAttributes::NODE),
            self_node,
            class_id,
        }
    }

    /// Create the base of a clone; the class id travels with the copy
    pub(crate) fn cloned_from<T: SceneNode + 'static>(self_ref: &Weak<T>, org: &NodeBase) -> Self {
        let self_node: WeakSceneNode = self_ref.clone();
        Self {
            core: ObjectCore::cloned_from(self_ref, &org.core),
            self_node,
            class_id: org.class_id,
        }
    }

    /// The shared object state
    pub fn core(&self) -> &ObjectCore {
        &self.core
    }

    /// The class id assigned at construction
    pub fn class_id(&self) -> ClassId {
        self.class_id
    }

    /// Shared node handle to the object owning this base
    pub fn self_node(&self) -> SceneNodeRef {
        self.self_node
            .upgrade()
            .expect("self reference is set at construction and lives as long as the node")
    }
}

/// A scene object placed in the spatial hierarchy
pub trait SceneNode: SceneObject {
    /// The shared node state
    fn node_base(&self) -> &NodeBase;

    /// Polymorphic copy through a [`CloneContext`], returned as a node
    fn clone_node(&self, context: &mut CloneContext) -> SceneNodeRef;

    /// The node's bounding box; leaves without geometry are empty
    fn bounding_box(&self) -> BoundingBox {
        BoundingBox::empty()
    }

    /// The bounding box before the node's own transform is applied; equal to
    /// [`Self::bounding_box`] for non-transform nodes
    fn untransformed_bounding_box(&self) -> BoundingBox {
        self.bounding_box()
    }

    /// View this node as a grouping container, if it is one
    fn as_group(&self) -> Option<&dyn GroupNode> {
        None
    }

    /// View this node as a transform, if it is one
    fn as_transform(&self) -> Option<&dyn TransformNode> {
        None
    }

    /// The class id assigned at construction
    fn class_id(&self) -> ClassId {
        self.node_base().class_id()
    }

    /// The registered name of this node's class
    fn class_name(&self) -> String {
        SceneClassRegistry::class_name_of(self.class_id())
    }

    /// Whether the node is a grouping container
    fn is_group_node(&self) -> bool {
        self.has_attribute(ObjectAttributes::GROUP)
    }

    /// Whether the node applies a spatial transform
    fn is_transform_node(&self) -> bool {
        self.has_attribute(ObjectAttributes::TRANSFORM)
    }

    /// Depth-first node traversal under visitor control; returns `false`
    /// when the visitor stopped it
    fn traverse_nodes(&self, visitor: &mut dyn FnMut(&SceneNodeRef) -> TraverseStatus) -> bool {
        match visitor(&self.node_base().self_node()) {
            TraverseStatus::Stop => return false,
            TraverseStatus::SkipChildren => return true,
            TraverseStatus::Continue => {}
        }
        if let Some(group) = self.as_group() {
            for child in group.children() {
                if !child.traverse_nodes(visitor) {
                    return false;
                }
            }
        }
        true
    }

    /// Find the first node named `name` below (and including) this node
    ///
    /// Returns the path from this node down to the match together with the
    /// transform accumulated across the transform nodes along it.
    fn find_node(&self, name: &str) -> Option<(Vec<SceneNodeRef>, Affine3)> {
        let mut path = Vec::new();
        let mut found_transform = Affine3::identity();
        if find_node_sub(
            &self.node_base().self_node(),
            name,
            &mut path,
            Affine3::identity(),
            &mut found_transform,
        ) {
            Some((path, found_transform))
        } else {
            None
        }
    }
}

fn find_node_sub(
    node: &SceneNodeRef,
    name: &str,
    path: &mut Vec<SceneNodeRef>,
    accumulated: Affine3,
    found_transform: &mut Affine3,
) -> bool {
    path.push(node.clone());

    let mut accumulated = accumulated;
    if let Some(group) = node.as_group() {
        if let Some(transform) = node.as_transform() {
            accumulated = accumulated * transform.transform();
        }
        if node.name() == name {
            *found_transform = accumulated;
            return true;
        }
        for child in group.children() {
            if find_node_sub(&child, name, path, accumulated, found_transform) {
                return true;
            }
        }
    } else if node.name() == name {
        *found_transform = accumulated;
        return true;
    }

    path.pop();
    false
}

/// Identity comparison: whether two handles refer to the same node
pub fn same_node(a: &SceneNodeRef, b: &SceneNodeRef) -> bool {
    a.core().address() == b.core().address()
}

/// Downcast a node handle to its concrete type
///
/// Returns [`SceneError::TypeMismatch`] when the node is of a different
/// kind.
pub fn try_downcast<T: SceneObject>(node: &SceneNodeRef) -> Result<Rc<T>, SceneError> {
    let object: SceneObjectRef = node.clone();
    try_downcast_object(&object)
}

/// Downcast a node handle, treating a mismatch as a fatal contract
/// violation
///
/// # Panics
///
/// Panics when the node is of a different kind; probe with
/// [`try_downcast`] instead when the kind is uncertain.
pub fn downcast<T: SceneObject>(node: &SceneNodeRef) -> Rc<T> {
    try_downcast(node).unwrap_or_else(|err| panic!("{err}"))
}
