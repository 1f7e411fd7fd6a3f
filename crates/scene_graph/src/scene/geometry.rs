//! Geometry placeholder leaf
//!
//! The rendering layer owns meshes; the graph only needs their extent. A
//! [`GeometryNode`] is a leaf standing in for renderable geometry, carrying
//! the local bounding box the renderer computed for it.

use std::any::Any;
use std::cell::Cell;
use std::rc::Rc;

use crate::scene::bounding_box::BoundingBox;
use crate::scene::clone::CloneContext;
use crate::scene::node::{NodeBase, SceneNode, SceneNodeRef};
use crate::scene::object::{ObjectAttributes, ObjectCore, SceneObject, SceneObjectRef};
use crate::scene::registry::builtin_class_id;
use crate::scene::update::{SceneUpdate, UpdateAction};

/// Leaf node carrying the local bounds of a piece of renderable geometry
pub struct GeometryNode {
    base: NodeBase,
    bbox: Cell<BoundingBox>,
}

impl GeometryNode {
    /// Create a geometry node with empty bounds
    pub fn new() -> Rc<Self> {
        Self::with_bounding_box(BoundingBox::empty())
    }

    /// Create a geometry node with the given local bounds
    pub fn with_bounding_box(bbox: BoundingBox) -> Rc<Self> {
        Rc::new_cyclic(|weak| Self {
            base: NodeBase::new(weak, builtin_class_id::<Self>(), ObjectAttributes::GEOMETRY),
            bbox: Cell::new(bbox),
        })
    }

    /// Replace the local bounds; fires `MODIFIED | GEOMETRY_MODIFIED` when
    /// an update token is supplied
    pub fn set_bounding_box(&self, bbox: BoundingBox, update: Option<&mut SceneUpdate>) {
        self.bbox.set(bbox);
        if let Some(update) = update {
            update.set_action(UpdateAction::MODIFIED | UpdateAction::GEOMETRY_MODIFIED);
            self.notify_update(update);
        }
    }

    fn clone_with(&self) -> Rc<Self> {
        Rc::new_cyclic(|weak| Self {
            base: NodeBase::cloned_from(weak, &self.base),
            bbox: Cell::new(self.bbox.get()),
        })
    }
}

impl SceneObject for GeometryNode {
    fn core(&self) -> &ObjectCore {
        self.base.core()
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn clone_object(&self, _context: &mut CloneContext) -> SceneObjectRef {
        self.clone_with()
    }
}

impl SceneNode for GeometryNode {
    fn node_base(&self) -> &NodeBase {
        &self.base
    }

    fn clone_node(&self, _context: &mut CloneContext) -> SceneNodeRef {
        self.clone_with()
    }

    fn bounding_box(&self) -> BoundingBox {
        self.bbox.get()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::foundation::math::{Point3, Vec3};

    #[test]
    fn test_geometry_node_reports_its_bounds() {
        let bbox =
            BoundingBox::from_center_extents(Point3::new(1.0, 2.0, 3.0), Vec3::new(0.5, 0.5, 0.5));
        let node = GeometryNode::with_bounding_box(bbox);
        assert_eq!(node.bounding_box(), bbox);
        assert!(node.has_attribute(ObjectAttributes::GEOMETRY));
    }

    #[test]
    fn test_set_bounding_box_notifies_geometry_change() {
        let node = GeometryNode::new();
        let seen = Rc::new(Cell::new(UpdateAction::empty()));
        let action = seen.clone();
        node.sig_updated()
            .connect(move |update: &SceneUpdate| action.set(update.action()));

        let mut update = SceneUpdate::new(UpdateAction::empty());
        node.set_bounding_box(
            BoundingBox::from_center_extents(Point3::origin(), Vec3::new(1.0, 1.0, 1.0)),
            Some(&mut update),
        );
        assert_eq!(
            seen.get(),
            UpdateAction::MODIFIED | UpdateAction::GEOMETRY_MODIFIED
        );
    }
}
