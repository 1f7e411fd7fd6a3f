//! Structural cloning sessions
//!
//! A [`CloneContext`] memoizes original-to-clone mappings by object identity
//! so that a node reached through several parents is cloned once and shared
//! by the cloned parents, mirroring the source graph's sharing pattern.
//! Memoization is scoped to one context: two independent clone calls share
//! nothing with each other.
//!
//! Two policy flags, both on by default, steer the recursion:
//!
//! - `non_node_cloning` — off means non-structural payload objects
//!   (switches) are shared with the source graph instead of copied;
//! - `meta_scene_cloning` — off means annotation-only children (those
//!   flagged `META_SCENE`) are omitted entirely from the clone.

use std::collections::HashMap;
use std::rc::Rc;

use crate::scene::node::{SceneNode, SceneNodeRef};
use crate::scene::object::{downcast_object, SceneObject, SceneObjectRef};

/// One cloning session: memoization table plus policy flags
pub struct CloneContext {
    nodes: HashMap<usize, SceneNodeRef>,
    objects: HashMap<usize, SceneObjectRef>,
    non_node_cloning: bool,
    meta_scene_cloning: bool,
}

impl CloneContext {
    /// Create a context with both policy flags on
    pub fn new() -> Self {
        Self {
            nodes: HashMap::new(),
            objects: HashMap::new(),
            non_node_cloning: true,
            meta_scene_cloning: true,
        }
    }

    /// Whether non-structural payload objects are copied (on) or shared
    /// with the source graph (off)
    pub fn non_node_cloning(&self) -> bool {
        self.non_node_cloning
    }

    /// Set the non-node cloning policy
    pub fn set_non_node_cloning(&mut self, on: bool) {
        self.non_node_cloning = on;
    }

    /// Whether annotation-only subgraphs are cloned (on) or omitted (off)
    pub fn meta_scene_cloning(&self) -> bool {
        self.meta_scene_cloning
    }

    /// Set the meta-scene cloning policy
    pub fn set_meta_scene_cloning(&mut self, on: bool) {
        self.meta_scene_cloning = on;
    }

    /// The clone of `node`, cloning it on first request and returning the
    /// memoized clone afterwards
    pub fn get_or_clone_node(&mut self, node: &SceneNodeRef) -> SceneNodeRef {
        let key = Rc::as_ptr(node).cast::<()>() as usize;
        if let Some(clone) = self.nodes.get(&key) {
            return clone.clone();
        }
        let clone = node.clone_node(self);
        self.nodes.insert(key, clone.clone());
        clone
    }

    /// The clone of a non-node object, memoized like
    /// [`Self::get_or_clone_node`]
    pub fn get_or_clone_object(&mut self, object: &SceneObjectRef) -> SceneObjectRef {
        let key = Rc::as_ptr(object).cast::<()>() as usize;
        if let Some(clone) = self.objects.get(&key) {
            return clone.clone();
        }
        let clone = object.clone_object(self);
        self.objects.insert(key, clone.clone());
        clone
    }

    /// Typed convenience over [`Self::get_or_clone_object`]
    pub fn get_or_clone<T: SceneObject>(&mut self, object: &Rc<T>) -> Rc<T> {
        let object_ref: SceneObjectRef = object.clone();
        let clone = self.get_or_clone_object(&object_ref);
        downcast_object(&clone)
    }
}

impl Default for CloneContext {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::foundation::math::{Point3, Vec3};
    use crate::scene::bounding_box::BoundingBox;
    use crate::scene::geometry::GeometryNode;
    use crate::scene::group::{Group, GroupNode};
    use crate::scene::node::{downcast, same_node};
    use crate::scene::object::ObjectAttributes;
    use crate::scene::switch::{Switch, SwitchableGroup};

    fn unit_leaf() -> Rc<GeometryNode> {
        GeometryNode::with_bounding_box(BoundingBox::from_center_extents(
            Point3::origin(),
            Vec3::new(0.5, 0.5, 0.5),
        ))
    }

    #[test]
    fn test_clone_preserves_shared_subgraphs() {
        let root = Group::new();
        let left = Group::new();
        let right = Group::new();
        let shared: SceneNodeRef = unit_leaf();
        left.add_child(shared.clone(), None);
        right.add_child(shared.clone(), None);
        root.add_child(left.clone(), None);
        root.add_child(right.clone(), None);

        let mut context = CloneContext::new();
        let root_ref: SceneNodeRef = root;
        let clone = context.get_or_clone_node(&root_ref);
        let clone = downcast::<Group>(&clone);

        let left_clone = clone.child(0).as_group().unwrap().child(0);
        let right_clone = clone.child(1).as_group().unwrap().child(0);
        assert!(same_node(&left_clone, &right_clone));
        assert!(!same_node(&left_clone, &shared));
        assert_eq!(left_clone.num_parents(), 2);
    }

    #[test]
    fn test_independent_contexts_share_nothing() {
        let original: SceneNodeRef = unit_leaf();

        let first = CloneContext::new().get_or_clone_node(&original);
        let second = CloneContext::new().get_or_clone_node(&original);
        assert!(!same_node(&first, &second));
    }

    #[test]
    fn test_clone_copies_name_and_attributes() {
        let group = Group::new();
        group.set_name("assembly");
        group.set_attribute(ObjectAttributes::MARKER);

        let group_ref: SceneNodeRef = group;
        let clone = CloneContext::new().get_or_clone_node(&group_ref);
        assert_eq!(clone.name(), "assembly");
        assert!(clone.has_attribute(ObjectAttributes::MARKER));
    }

    #[test]
    fn test_meta_scene_children_omitted_when_disabled() {
        let group = Group::new();
        let annotation: SceneNodeRef = unit_leaf();
        annotation.set_attribute(ObjectAttributes::META_SCENE);
        group.add_child(annotation, None);
        group.add_child(unit_leaf(), None);

        let group_ref: SceneNodeRef = group;

        let mut cloning = CloneContext::new();
        let kept = downcast::<Group>(&cloning.get_or_clone_node(&group_ref));
        assert_eq!(kept.num_children(), 2);

        let mut skipping = CloneContext::new();
        skipping.set_meta_scene_cloning(false);
        let stripped = downcast::<Group>(&skipping.get_or_clone_node(&group_ref));
        assert_eq!(stripped.num_children(), 1);
        assert!(!stripped
            .child(0)
            .has_attribute(ObjectAttributes::META_SCENE));
    }

    #[test]
    fn test_switch_cloned_once_and_shared_by_cloned_groups() {
        let switch = Switch::new(false);
        let first = SwitchableGroup::with_switch(switch.clone());
        let second = SwitchableGroup::with_switch(switch.clone());
        let root = Group::new();
        root.add_child(first, None);
        root.add_child(second, None);

        let root_ref: SceneNodeRef = root;
        let mut context = CloneContext::new();
        let clone = downcast::<Group>(&context.get_or_clone_node(&root_ref));

        let first_clone = downcast::<SwitchableGroup>(&clone.child(0));
        let second_clone = downcast::<SwitchableGroup>(&clone.child(1));
        let first_switch = first_clone.switch().unwrap();
        let second_switch = second_clone.switch().unwrap();

        assert!(!Rc::ptr_eq(&first_switch, &switch));
        assert!(Rc::ptr_eq(&first_switch, &second_switch));
        assert!(!first_switch.is_turned_on());
    }

    #[test]
    fn test_switch_shared_with_source_when_non_node_cloning_disabled() {
        let switch = Switch::new(true);
        let group = SwitchableGroup::with_switch(switch.clone());

        let group_ref: SceneNodeRef = group;
        let mut context = CloneContext::new();
        context.set_non_node_cloning(false);
        let clone = downcast::<SwitchableGroup>(&context.get_or_clone_node(&group_ref));

        assert!(Rc::ptr_eq(&clone.switch().unwrap(), &switch));
    }

    #[test]
    fn test_clone_carries_valid_bounding_box_cache() {
        let group = Group::new();
        group.add_child(unit_leaf(), None);
        let bbox = group.bounding_box();
        assert!(group.has_valid_bounding_box_cache());

        let group_ref: SceneNodeRef = group;
        let clone = CloneContext::new().get_or_clone_node(&group_ref);
        assert!(clone.has_valid_bounding_box_cache());
        assert_eq!(clone.bounding_box(), bbox);
    }
}
