//! Groups that modify how a subgraph is rendered or picked
//!
//! These carry no structure of their own beyond [`GroupBase`]; renderers and
//! pickers recognize them by class id.

use std::any::Any;
use std::cell::Cell;
use std::rc::Rc;

use crate::scene::bounding_box::BoundingBox;
use crate::scene::clone::CloneContext;
use crate::scene::group::{GroupBase, GroupNode};
use crate::scene::node::{NodeBase, SceneNode, SceneNodeRef};
use crate::scene::object::{ObjectAttributes, ObjectCore, SceneObject, SceneObjectRef};
use crate::scene::registry::builtin_class_id;
use crate::scene::update::{SceneUpdate, UpdateAction};

/// A group whose subtree is rendered at a fixed on-screen pixel size
/// regardless of camera distance
pub struct FixedPixelSizeGroup {
    base: GroupBase,
    pixel_size_ratio: Cell<f32>,
}

impl FixedPixelSizeGroup {
    /// Create a group with a pixel size ratio of 1.0
    pub fn new() -> Rc<Self> {
        Self::with_pixel_size_ratio(1.0)
    }

    /// Create a group with the given pixel size ratio
    pub fn with_pixel_size_ratio(pixel_size_ratio: f32) -> Rc<Self> {
        Rc::new_cyclic(|weak| Self {
            base: GroupBase::new(weak, builtin_class_id::<Self>(), ObjectAttributes::empty()),
            pixel_size_ratio: Cell::new(pixel_size_ratio),
        })
    }

    /// The ratio between on-screen pixels and model units
    pub fn pixel_size_ratio(&self) -> f32 {
        self.pixel_size_ratio.get()
    }

    /// Change the pixel size ratio; fires `MODIFIED` when it changed and an
    /// update token is supplied
    pub fn set_pixel_size_ratio(&self, ratio: f32, update: Option<&mut SceneUpdate>) {
        if (ratio - self.pixel_size_ratio.get()).abs() > f32::EPSILON {
            self.pixel_size_ratio.set(ratio);
            if let Some(update) = update {
                update.set_action(UpdateAction::MODIFIED);
                self.notify_update(update);
            }
        }
    }

    fn clone_with(&self, context: &mut CloneContext) -> Rc<Self> {
        Rc::new_cyclic(|weak| Self {
            base: GroupBase::cloned_from(weak, &self.base, context),
            pixel_size_ratio: Cell::new(self.pixel_size_ratio.get()),
        })
    }
}

impl SceneObject for FixedPixelSizeGroup {
    fn core(&self) -> &ObjectCore {
        self.base.core()
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn clone_object(&self, context: &mut CloneContext) -> SceneObjectRef {
        self.clone_with(context)
    }

    fn num_child_objects(&self) -> usize {
        self.num_children()
    }

    fn child_object(&self, index: usize) -> Option<SceneObjectRef> {
        self.base.child_object(index)
    }
}

impl SceneNode for FixedPixelSizeGroup {
    fn node_base(&self) -> &NodeBase {
        self.base.node_base()
    }

    fn clone_node(&self, context: &mut CloneContext) -> SceneNodeRef {
        self.clone_with(context)
    }

    fn bounding_box(&self) -> BoundingBox {
        self.base.cached_bounding_box()
    }

    fn as_group(&self) -> Option<&dyn GroupNode> {
        Some(self)
    }
}

impl GroupNode for FixedPixelSizeGroup {
    fn group_base(&self) -> &GroupBase {
        &self.base
    }
}

/// A group whose subtree is excluded from picking
pub struct UnpickableGroup {
    base: GroupBase,
}

impl UnpickableGroup {
    /// Create an empty unpickable group
    pub fn new() -> Rc<Self> {
        Rc::new_cyclic(|weak| Self {
            base: GroupBase::new(weak, builtin_class_id::<Self>(), ObjectAttributes::empty()),
        })
    }

    fn clone_with(&self, context: &mut CloneContext) -> Rc<Self> {
        Rc::new_cyclic(|weak| Self {
            base: GroupBase::cloned_from(weak, &self.base, context),
        })
    }
}

impl SceneObject for UnpickableGroup {
    fn core(&self) -> &ObjectCore {
        self.base.core()
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn clone_object(&self, context: &mut CloneContext) -> SceneObjectRef {
        self.clone_with(context)
    }

    fn num_child_objects(&self) -> usize {
        self.num_children()
    }

    fn child_object(&self, index: usize) -> Option<SceneObjectRef> {
        self.base.child_object(index)
    }
}

impl SceneNode for UnpickableGroup {
    fn node_base(&self) -> &NodeBase {
        self.base.node_base()
    }

    fn clone_node(&self, context: &mut CloneContext) -> SceneNodeRef {
        self.clone_with(context)
    }

    fn bounding_box(&self) -> BoundingBox {
        self.base.cached_bounding_box()
    }

    fn as_group(&self) -> Option<&dyn GroupNode> {
        Some(self)
    }
}

impl GroupNode for UnpickableGroup {
    fn group_base(&self) -> &GroupBase {
        &self.base
    }
}
