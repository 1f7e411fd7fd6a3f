//! Transform nodes: groups applying a spatial matrix to their children
//!
//! A transform caches two boxes under the one validity flag: the plain
//! aggregate of its children (the *untransformed* box) and the same box with
//! the node's matrix applied, which is what [`SceneNode::bounding_box`]
//! reports. The matrix setters take an optional update token and fire
//! `MODIFIED | GEOMETRY_MODIFIED` so externally computed values (animation,
//! solvers) land in the graph with correct invalidation.

use std::any::Any;
use std::cell::Cell;
use std::rc::Rc;

use crate::foundation::math::{affine_from_isometry, affine_from_scale, Affine3, Isometry3, Quat, Vec3};
use crate::scene::bounding_box::BoundingBox;
use crate::scene::clone::CloneContext;
use crate::scene::group::{GroupBase, GroupNode};
use crate::scene::node::{NodeBase, SceneNode, SceneNodeRef};
use crate::scene::object::{ObjectAttributes, ObjectCore, SceneObject, SceneObjectRef};
use crate::scene::registry::{builtin_class_id, ClassId};
use crate::scene::update::{SceneUpdate, UpdateAction};

/// A group that applies a transform matrix to its aggregated child bounds
pub trait TransformNode: GroupNode {
    /// The transform applied to the aggregated child bounding box,
    /// as a general affine matrix
    fn transform(&self) -> Affine3;
}

/// State shared by transform nodes: the group base plus the cached
/// untransformed child aggregate
pub struct TransformBase {
    group: GroupBase,
    untransformed_bbox: Cell<BoundingBox>,
}

impl TransformBase {
    fn new<T: GroupNode + 'static>(self_ref: &std::rc::Weak<T>, class_id: ClassId) -> Self {
        Self {
            group: GroupBase::new(
                self_ref,
                class_id,
                ObjectAttributes::TRANSFORM | ObjectAttributes::GEOMETRY,
            ),
            untransformed_bbox: Cell::new(BoundingBox::empty()),
        }
    }

    fn cloned_from<T: GroupNode + 'static>(
        self_ref: &std::rc::Weak<T>,
        org: &TransformBase,
        context: &mut CloneContext,
    ) -> Self {
        Self {
            group: GroupBase::cloned_from(self_ref, &org.group, context),
            untransformed_bbox: Cell::new(org.untransformed_bbox.get()),
        }
    }

    fn bounding_box(&self, transform: &Affine3) -> BoundingBox {
        self.group
            .cached_transformed_bounding_box(transform, &self.untransformed_bbox)
    }

    fn untransformed_bounding_box(&self, transform: &Affine3) -> BoundingBox {
        if !self.group.core().has_valid_bounding_box_cache() {
            let _ = self.bounding_box(transform);
        }
        self.untransformed_bbox.get()
    }
}

fn notify_transform_changed<T: SceneObject + ?Sized>(node: &T, update: Option<&mut SceneUpdate>) {
    if let Some(update) = update {
        update.set_action(UpdateAction::MODIFIED | UpdateAction::GEOMETRY_MODIFIED);
        node.notify_update(update);
    }
}

/// Rigid (rotation + translation) transform group
pub struct PosTransform {
    base: TransformBase,
    isometry: Cell<Isometry3>,
}

impl PosTransform {
    /// Create an identity transform
    pub fn new() -> Rc<Self> {
        Self::from_isometry(Isometry3::identity())
    }

    /// Create a transform from a rigid-body isometry
    pub fn from_isometry(isometry: Isometry3) -> Rc<Self> {
        Rc::new_cyclic(|weak| Self {
            base: TransformBase::new(weak, builtin_class_id::<Self>()),
            isometry: Cell::new(isometry),
        })
    }

    /// Create a pure translation
    pub fn from_translation(translation: Vec3) -> Rc<Self> {
        Self::from_isometry(Isometry3::translation(
            translation.x,
            translation.y,
            translation.z,
        ))
    }

    /// The current rigid transform
    pub fn isometry(&self) -> Isometry3 {
        self.isometry.get()
    }

    /// Replace the rigid transform, notifying through `update` if supplied
    pub fn set_isometry(&self, isometry: Isometry3, update: Option<&mut SceneUpdate>) {
        self.isometry.set(isometry);
        notify_transform_changed(self, update);
    }

    /// The translation part
    pub fn translation(&self) -> Vec3 {
        self.isometry.get().translation.vector
    }

    /// Replace the translation part, notifying through `update` if supplied
    pub fn set_translation(&self, translation: Vec3, update: Option<&mut SceneUpdate>) {
        let mut isometry = self.isometry.get();
        isometry.translation.vector = translation;
        self.set_isometry(isometry, update);
    }

    /// The rotation part
    pub fn rotation(&self) -> Quat {
        self.isometry.get().rotation
    }

    /// Replace the rotation part, notifying through `update` if supplied
    pub fn set_rotation(&self, rotation: Quat, update: Option<&mut SceneUpdate>) {
        let mut isometry = self.isometry.get();
        isometry.rotation = rotation;
        self.set_isometry(isometry, update);
    }

    fn clone_with(&self, context: &mut CloneContext) -> Rc<Self> {
        Rc::new_cyclic(|weak| Self {
            base: TransformBase::cloned_from(weak, &self.base, context),
            isometry: Cell::new(self.isometry.get()),
        })
    }
}

impl SceneObject for PosTransform {
    fn core(&self) -> &ObjectCore {
        self.base.group.core()
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
        self.base.group.child_object(index)
    }
}

impl SceneNode for PosTransform {
    fn node_base(&self) -> &NodeBase {
        self.base.group.node_base()
    }

    fn clone_node(&self, context: &mut CloneContext) -> SceneNodeRef {
        self.clone_with(context)
    }

    fn bounding_box(&self) -> BoundingBox {
        self.base.bounding_box(&self.transform())
    }

    fn untransformed_bounding_box(&self) -> BoundingBox {
        self.base.untransformed_bounding_box(&self.transform())
    }

    fn as_group(&self) -> Option<&dyn GroupNode> {
        Some(self)
    }

    fn as_transform(&self) -> Option<&dyn TransformNode> {
        Some(self)
    }
}

impl GroupNode for PosTransform {
    fn group_base(&self) -> &GroupBase {
        &self.base.group
    }
}

impl TransformNode for PosTransform {
    fn transform(&self) -> Affine3 {
        affine_from_isometry(&self.isometry.get())
    }
}

/// Axis-aligned scaling transform group
pub struct ScaleTransform {
    base: TransformBase,
    scale: Cell<Vec3>,
}

impl ScaleTransform {
    /// Create an identity (unit) scaling
    pub fn new() -> Rc<Self> {
        Self::from_scale(Vec3::new(1.0, 1.0, 1.0))
    }

    /// Create a per-axis scaling
    pub fn from_scale(scale: Vec3) -> Rc<Self> {
        Rc::new_cyclic(|weak| Self {
            base: TransformBase::new(weak, builtin_class_id::<Self>()),
            scale: Cell::new(scale),
        })
    }

    /// Create a uniform scaling
    pub fn from_uniform_scale(scale: f32) -> Rc<Self> {
        Self::from_scale(Vec3::new(scale, scale, scale))
    }

    /// The current scale factors
    pub fn scale(&self) -> Vec3 {
        self.scale.get()
    }

    /// Replace the scale factors, notifying through `update` if supplied
    pub fn set_scale(&self, scale: Vec3, update: Option<&mut SceneUpdate>) {
        self.scale.set(scale);
        notify_transform_changed(self, update);
    }

    fn clone_with(&self, context: &mut CloneContext) -> Rc<Self> {
        Rc::new_cyclic(|weak| Self {
            base: TransformBase::cloned_from(weak, &self.base, context),
            scale: Cell::new(self.scale.get()),
        })
    }
}

impl SceneObject for ScaleTransform {
    fn core(&self) -> &ObjectCore {
        self.base.group.core()
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
        self.base.group.child_object(index)
    }
}

impl SceneNode for ScaleTransform {
    fn node_base(&self) -> &NodeBase {
        self.base.group.node_base()
    }

    fn clone_node(&self, context: &mut CloneContext) -> SceneNodeRef {
        self.clone_with(context)
    }

    fn bounding_box(&self) -> BoundingBox {
        self.base.bounding_box(&self.transform())
    }

    fn untransformed_bounding_box(&self) -> BoundingBox {
        self.base.untransformed_bounding_box(&self.transform())
    }

    fn as_group(&self) -> Option<&dyn GroupNode> {
        Some(self)
    }

    fn as_transform(&self) -> Option<&dyn TransformNode> {
        Some(self)
    }
}

impl GroupNode for ScaleTransform {
    fn group_base(&self) -> &GroupBase {
        &self.base.group
    }
}

impl TransformNode for ScaleTransform {
    fn transform(&self) -> Affine3 {
        affine_from_scale(&self.scale.get())
    }
}

/// General affine transform group
pub struct AffineTransform {
    base: TransformBase,
    affine: Cell<Affine3>,
}

impl AffineTransform {
    /// Create an identity transform
    pub fn new() -> Rc<Self> {
        Self::from_affine(Affine3::identity())
    }

    /// Create a transform from a general affine matrix
    pub fn from_affine(affine: Affine3) -> Rc<Self> {
        Rc::new_cyclic(|weak| Self {
            base: TransformBase::new(weak, builtin_class_id::<Self>()),
            affine: Cell::new(affine),
        })
    }

    /// The current affine matrix
    pub fn affine(&self) -> Affine3 {
        self.affine.get()
    }

    /// Replace the affine matrix, notifying through `update` if supplied
    pub fn set_affine(&self, affine: Affine3, update: Option<&mut SceneUpdate>) {
        self.affine.set(affine);
        notify_transform_changed(self, update);
    }

    fn clone_with(&self, context: &mut CloneContext) -> Rc<Self> {
        Rc::new_cyclic(|weak| Self {
            base: TransformBase::cloned_from(weak, &self.base, context),
            affine: Cell::new(self.affine.get()),
        })
    }
}

impl SceneObject for AffineTransform {
    fn core(&self) -> &ObjectCore {
        self.base.group.core()
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
        self.base.group.child_object(index)
    }
}

impl SceneNode for AffineTransform {
    fn node_base(&self) -> &NodeBase {
        self.base.group.node_base()
    }

    fn clone_node(&self, context: &mut CloneContext) -> SceneNodeRef {
        self.clone_with(context)
    }

    fn bounding_box(&self) -> BoundingBox {
        self.base.bounding_box(&self.transform())
    }

    fn untransformed_bounding_box(&self) -> BoundingBox {
        self.base.untransformed_bounding_box(&self.transform())
    }

    fn as_group(&self) -> Option<&dyn GroupNode> {
        Some(self)
    }

    fn as_transform(&self) -> Option<&dyn TransformNode> {
        Some(self)
    }
}

impl GroupNode for AffineTransform {
    fn group_base(&self) -> &GroupBase {
        &self.base.group
    }
}

impl TransformNode for AffineTransform {
    fn transform(&self) -> Affine3 {
        self.affine.get()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::foundation::math::Point3;
    use crate::scene::geometry::GeometryNode;
    use crate::scene::group::Group;
    use approx::assert_relative_eq;

    fn unit_leaf() -> Rc<GeometryNode> {
        GeometryNode::with_bounding_box(BoundingBox::from_center_extents(
            Point3::origin(),
            Vec3::new(0.5, 0.5, 0.5),
        ))
    }

    #[test]
    fn test_pos_transform_translates_child_bounds() {
        let shift = PosTransform::from_translation(Vec3::new(1.0, 0.0, 0.0));
        shift.add_child(unit_leaf(), None);

        let bbox = shift.bounding_box();
        assert_relative_eq!(bbox.center(), Point3::new(1.0, 0.0, 0.0));
        assert_relative_eq!(bbox.extents(), Vec3::new(0.5, 0.5, 0.5));

        let untransformed = shift.untransformed_bounding_box();
        assert_relative_eq!(untransformed.center(), Point3::origin());
    }

    #[test]
    fn test_scale_transform_scales_child_bounds() {
        let scaled = ScaleTransform::from_scale(Vec3::new(2.0, 1.0, 1.0));
        scaled.add_child(unit_leaf(), None);

        let bbox = scaled.bounding_box();
        assert_relative_eq!(bbox.extents(), Vec3::new(1.0, 0.5, 0.5));
        assert_relative_eq!(
            scaled.untransformed_bounding_box().extents(),
            Vec3::new(0.5, 0.5, 0.5)
        );
    }

    #[test]
    fn test_affine_transform_applies_matrix() {
        let affine =
            AffineTransform::from_affine(affine_from_isometry(&Isometry3::translation(0.0, 3.0, 0.0)));
        affine.add_child(unit_leaf(), None);
        assert_relative_eq!(affine.bounding_box().center(), Point3::new(0.0, 3.0, 0.0));
    }

    #[test]
    fn test_untransformed_box_available_before_first_read() {
        let shift = PosTransform::from_translation(Vec3::new(5.0, 0.0, 0.0));
        shift.add_child(unit_leaf(), None);
        // Asking for the untransformed box first must compute both caches.
        assert_relative_eq!(shift.untransformed_bounding_box().center(), Point3::origin());
        assert_relative_eq!(shift.bounding_box().center(), Point3::new(5.0, 0.0, 0.0));
    }

    #[test]
    fn test_transform_change_notifies_and_recomputes() {
        // The concrete scenario: a group over a positioned subtree, observed
        // while the transform is re-targeted.
        let root = Group::new();
        let shift = PosTransform::from_translation(Vec3::new(1.0, 0.0, 0.0));
        let inner = Group::new();
        inner.add_child(unit_leaf(), None);
        shift.add_child(inner.clone(), None);
        root.add_child(shift.clone(), None);

        let bbox = root.bounding_box();
        assert_relative_eq!(bbox.center(), Point3::new(1.0, 0.0, 0.0));
        assert_relative_eq!(bbox.extents(), Vec3::new(0.5, 0.5, 0.5));

        let fired = Rc::new(Cell::new(0));
        let action = Rc::new(Cell::new(UpdateAction::empty()));
        let fired_counter = fired.clone();
        let action_seen = action.clone();
        root.sig_updated().connect(move |update: &SceneUpdate| {
            fired_counter.set(fired_counter.get() + 1);
            action_seen.set(update.action());
        });

        let mut update = SceneUpdate::new(UpdateAction::empty());
        shift.set_isometry(Isometry3::translation(0.0, 0.0, 5.0), Some(&mut update));

        assert_eq!(fired.get(), 1);
        assert_eq!(
            action.get(),
            UpdateAction::MODIFIED | UpdateAction::GEOMETRY_MODIFIED
        );
        assert_relative_eq!(root.bounding_box().center(), Point3::new(0.0, 0.0, 5.0));
    }

    #[test]
    fn test_set_translation_keeps_rotation() {
        let transform = PosTransform::from_isometry(Isometry3::rotation(Vec3::new(
            0.0,
            0.0,
            std::f32::consts::FRAC_PI_2,
        )));
        transform.set_translation(Vec3::new(1.0, 2.0, 3.0), None);
        assert_relative_eq!(transform.translation(), Vec3::new(1.0, 2.0, 3.0));
        let rotated = transform.rotation() * Vec3::new(1.0, 0.0, 0.0);
        assert_relative_eq!(rotated, Vec3::new(0.0, 1.0, 0.0), epsilon = 1e-6);
    }

    #[test]
    fn test_transform_exposed_through_trait() {
        let shift = PosTransform::from_translation(Vec3::new(2.0, 0.0, 0.0));
        let node: SceneNodeRef = shift;
        let transform = node.as_transform().unwrap().transform();
        assert_relative_eq!(
            transform.transform_point(&Point3::origin()),
            Point3::new(2.0, 0.0, 0.0)
        );
    }
}
