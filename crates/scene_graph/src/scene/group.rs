//! Grouping nodes: ordered containers of shared child nodes
//!
//! A group owns its children through shared handles, so one node may sit
//! under several groups at once (a shared subgraph). Every child mutation
//! maintains the child's parent set in the same operation and, when an
//! update token is supplied, invalidates the bounding-box caches along every
//! ancestor path and fires the notification walk described in
//! [`crate::scene::object`].
//!
//! The group API lives on the [`GroupNode`] trait so that every group-like
//! kind (plain groups, transforms, switchable and decoration groups) shares
//! one implementation over its embedded [`GroupBase`].

use std::cell::{Cell, RefCell};
use std::rc::Weak;

use crate::scene::bounding_box::BoundingBox;
use crate::scene::clone::CloneContext;
use crate::scene::error::SceneError;
use crate::scene::node::{same_node, NodeBase, SceneNode, SceneNodeRef};
use crate::scene::object::{
    ObjectAttributes, ObjectCore, SceneObject, SceneObjectRef, WeakSceneObject,
};
use crate::scene::registry::{builtin_class_id, ClassId};
use crate::scene::update::{SceneUpdate, UpdateAction};

use std::any::Any;
use std::rc::Rc;

/// Shared handle to a group-like node
pub type GroupRef = Rc<dyn GroupNode>;

/// State shared by every group-like node: the node base plus the ordered
/// child sequence and the cached aggregate bounding box
pub struct GroupBase {
    node: NodeBase,
    self_group: Weak<dyn GroupNode>,
    children: RefCell<Vec<SceneNodeRef>>,
    bbox_cache: Cell<BoundingBox>,
}

impl GroupBase {
    /// Create the base for a new group of the given registered class
    pub fn new<T: GroupNode + 'static>(
        self_ref: &Weak<T>,
        class_id: ClassId,
        attributes: ObjectAttributes,
    ) -> Self {
        let self_group: Weak<dyn GroupNode> = self_ref.clone();
        Self {
            node: NodeBase::new(self_ref, class_id, attributes | ObjectAttributes::GROUP),
            self_group,
            children: RefCell::new(Vec::new()),
            bbox_cache: Cell::new(BoundingBox::empty()),
        }
    }

    /// Create the base of a clone, deep-copying children through the context
    ///
    /// Children flagged [`ObjectAttributes::META_SCENE`] are omitted
    /// entirely when the context disables meta-scene cloning. A valid
    /// bounding-box cache travels with the copy.
    pub(crate) fn cloned_from<T: GroupNode + 'static>(
        self_ref: &Weak<T>,
        org: &GroupBase,
        context: &mut CloneContext,
    ) -> Self {
        let self_group: Weak<dyn GroupNode> = self_ref.clone();
        let base = Self {
            node: NodeBase::cloned_from(self_ref, &org.node),
            self_group,
            children: RefCell::new(Vec::new()),
            bbox_cache: Cell::new(BoundingBox::empty()),
        };
        let parent: WeakSceneObject = self_ref.clone();
        for child in org.children.borrow().iter() {
            if !context.meta_scene_cloning() && child.has_attribute(ObjectAttributes::META_SCENE) {
                continue;
            }
            let clone = context.get_or_clone_node(child);
            clone.core().insert_parent(parent.clone());
            base.children.borrow_mut().push(clone);
        }
        if org.node.core().has_valid_bounding_box_cache() {
            base.bbox_cache.set(org.bbox_cache.get());
            base.node.core().set_bounding_box_cache_ready();
        }
        base
    }

    /// The shared node state
    pub fn node_base(&self) -> &NodeBase {
        &self.node
    }

    /// The shared object state
    pub fn core(&self) -> &ObjectCore {
        self.node.core()
    }

    /// Shared group handle to the object owning this base
    pub fn self_group(&self) -> GroupRef {
        self.self_group
            .upgrade()
            .expect("self reference is set at construction and lives as long as the group")
    }

    /// Aggregate the children's boxes, skipping marker-like children
    fn aggregate_child_bounds(&self) -> BoundingBox {
        let mut bbox = BoundingBox::empty();
        for child in self.children.borrow().iter() {
            if !child.has_attribute(ObjectAttributes::MARKER) {
                bbox.expand_by(&child.bounding_box());
            }
        }
        bbox
    }

    /// The cached aggregate box, recomputed lazily after invalidation
    pub(crate) fn cached_bounding_box(&self) -> BoundingBox {
        if self.core().has_valid_bounding_box_cache() {
            return self.bbox_cache.get();
        }
        let bbox = self.aggregate_child_bounds();
        self.bbox_cache.set(bbox);
        self.core().set_bounding_box_cache_ready();
        bbox
    }

    /// Recompute the untransformed aggregate and cache the transformed box;
    /// used by transform nodes which store both
    pub(crate) fn cached_transformed_bounding_box(
        &self,
        transform: &crate::foundation::math::Affine3,
        untransformed_out: &Cell<BoundingBox>,
    ) -> BoundingBox {
        if self.core().has_valid_bounding_box_cache() {
            return self.bbox_cache.get();
        }
        let untransformed = self.aggregate_child_bounds();
        untransformed_out.set(untransformed);
        let mut bbox = untransformed;
        bbox.transform(transform);
        self.bbox_cache.set(bbox);
        self.core().set_bounding_box_cache_ready();
        bbox
    }

    /// Child as a plain object handle; helper for `SceneObject`
    /// implementations
    pub(crate) fn child_object(&self, index: usize) -> Option<SceneObjectRef> {
        self.children.borrow().get(index).map(|child| {
            let object: SceneObjectRef = child.clone();
            object
        })
    }
}

impl Drop for GroupBase {
    fn drop(&mut self) {
        let addr = self.node.core().address();
        for child in self.children.borrow().iter() {
            child.core().remove_parent_addr(addr);
        }
    }
}

fn remove_child_entry<G: GroupNode + ?Sized>(
    group: &G,
    index: usize,
    update: Option<&mut SceneUpdate>,
) {
    let child = group.group_base().children.borrow_mut().remove(index);
    child
        .core()
        .remove_parent_addr(group.group_base().core().address());
    if let Some(update) = update {
        update.clear_path();
        let child_object: SceneObjectRef = child.clone();
        update.push_path(child_object);
        update.set_action(UpdateAction::REMOVED);
        group.notify_upper_nodes_of_update(update);
    }
}

/// A node owning an ordered sequence of shared child nodes
pub trait GroupNode: SceneNode {
    /// The shared group state
    fn group_base(&self) -> &GroupBase;

    /// Number of children
    fn num_children(&self) -> usize {
        self.group_base().children.borrow().len()
    }

    /// Whether the group has no children
    fn is_empty(&self) -> bool {
        self.num_children() == 0
    }

    /// Ordered snapshot of the children
    fn children(&self) -> Vec<SceneNodeRef> {
        self.group_base().children.borrow().clone()
    }

    /// Child by index
    fn try_child(&self, index: usize) -> Result<SceneNodeRef, SceneError> {
        self.group_base()
            .children
            .borrow()
            .get(index)
            .cloned()
            .ok_or(SceneError::ChildIndexOutOfRange {
                index,
                num_children: self.num_children(),
            })
    }

    /// Child by index; an out-of-range index is a fatal contract violation
    ///
    /// # Panics
    ///
    /// Panics when `index` is out of range.
    fn child(&self, index: usize) -> SceneNodeRef {
        self.try_child(index).unwrap_or_else(|err| panic!("{err}"))
    }

    /// Whether the node is among the children
    fn contains(&self, node: &SceneNodeRef) -> bool {
        self.group_base()
            .children
            .borrow()
            .iter()
            .any(|child| same_node(child, node))
    }

    /// Index of the first occurrence of the node among the children
    fn find_child_index(&self, node: &SceneNodeRef) -> Option<usize> {
        self.group_base()
            .children
            .borrow()
            .iter()
            .position(|child| same_node(child, node))
    }

    /// Append a child, registering this group as its parent
    ///
    /// Adding a node that is already an ancestor of this group creates a
    /// cycle, which breaks traversal and bounding-box recursion; that
    /// precondition is the caller's obligation and is asserted in debug
    /// builds only.
    fn add_child(&self, node: SceneNodeRef, update: Option<&mut SceneUpdate>) {
        debug_assert!(
            !node.is_ancestor_of(&self.group_base().core().self_object()),
            "adding a node below itself would create a cycle"
        );
        let self_object = self.group_base().core().self_object();
        self.group_base().children.borrow_mut().push(node.clone());
        node.add_parent(&self_object, update);
    }

    /// Append a child unless it is already present; returns whether it was
    /// added
    fn add_child_once(&self, node: &SceneNodeRef, update: Option<&mut SceneUpdate>) -> bool {
        if self.contains(node) {
            false
        } else {
            self.add_child(node.clone(), update);
            true
        }
    }

    /// Insert a child at the given position; an index past the end appends
    fn insert_child(&self, index: usize, node: SceneNodeRef, update: Option<&mut SceneUpdate>) {
        let self_object = self.group_base().core().self_object();
        {
            let mut children = self.group_base().children.borrow_mut();
            let index = index.min(children.len());
            children.insert(index, node.clone());
        }
        node.add_parent(&self_object, update);
    }

    /// Insert a child just before `next`, or at the front when `next` is
    /// not a child
    fn insert_child_before(
        &self,
        next: &SceneNodeRef,
        node: SceneNodeRef,
        update: Option<&mut SceneUpdate>,
    ) {
        let index = self.find_child_index(next).unwrap_or(0);
        self.insert_child(index, node, update);
    }

    /// Replace the whole child list with one node, keeping the node in
    /// place if it is already present so no redundant remove/add
    /// notifications fire for it
    fn set_single_child(&self, node: &SceneNodeRef, mut update: Option<&mut SceneUpdate>) {
        let num = self.num_children();
        if num > 0 {
            let mut found = false;
            for index in (0..num).rev() {
                let matches = same_node(&self.group_base().children.borrow()[index], node);
                if matches && !found {
                    found = true;
                    continue;
                }
                remove_child_entry(self, index, update.as_deref_mut());
            }
            if !self.is_empty() {
                return;
            }
        }
        self.add_child(node.clone(), update);
    }

    /// Remove every occurrence of the node; returns whether anything was
    /// removed
    fn remove_child(&self, node: &SceneNodeRef, mut update: Option<&mut SceneUpdate>) -> bool {
        let mut removed = false;
        let mut index = 0;
        while index < self.num_children() {
            let matches = same_node(&self.group_base().children.borrow()[index], node);
            if matches {
                remove_child_entry(self, index, update.as_deref_mut());
                removed = true;
            } else {
                index += 1;
            }
        }
        removed
    }

    /// Remove the child at the given position
    ///
    /// # Panics
    ///
    /// Panics when `index` is out of range; use [`Self::try_remove_child_at`]
    /// to probe.
    fn remove_child_at(&self, index: usize, update: Option<&mut SceneUpdate>) {
        self.try_remove_child_at(index, update)
            .unwrap_or_else(|err| panic!("{err}"));
    }

    /// Remove the child at the given position, reporting an out-of-range
    /// index as an error
    fn try_remove_child_at(
        &self,
        index: usize,
        update: Option<&mut SceneUpdate>,
    ) -> Result<(), SceneError> {
        let num_children = self.num_children();
        if index >= num_children {
            return Err(SceneError::ChildIndexOutOfRange {
                index,
                num_children,
            });
        }
        remove_child_entry(self, index, update);
        Ok(())
    }

    /// Remove all children, notifying per removed child
    fn clear_children(&self, mut update: Option<&mut SceneUpdate>) {
        while self.num_children() > 0 {
            remove_child_entry(self, 0, update.as_deref_mut());
        }
    }

    /// Add every child of this group to `group` as well (children become
    /// shared between the two)
    fn copy_children_to(&self, group: &dyn GroupNode, mut update: Option<&mut SceneUpdate>) {
        for child in self.children() {
            group.add_child(child, update.as_deref_mut());
        }
    }

    /// Move every child of this group into `group`, re-firing an `ADDED`
    /// notification for each moved child exactly once
    fn move_children_to(&self, group: &dyn GroupNode, mut update: Option<&mut SceneUpdate>) {
        let dest_top = group.num_children();
        for child in self.children() {
            group.add_child(child, None);
        }
        self.clear_children(update.as_deref_mut());
        if let Some(update) = update {
            update.set_action(UpdateAction::ADDED);
            for index in dest_top..group.num_children() {
                update.clear_path();
                group.child(index).notify_update(update);
            }
        }
    }

    /// Splice `group` between this group and its current children: the
    /// children move into `group`, which becomes the single child
    fn insert_chained_group(&self, group: GroupRef, update: Option<&mut SceneUpdate>) {
        self.move_children_to(&*group, None);
        let group_node: SceneNodeRef = group.clone();
        self.add_child(group_node, None);
        if let Some(update) = update {
            update.add_action(UpdateAction::ADDED);
            group.notify_update(update);
        }
    }

    /// The next link in a single-child chain: the sole child, when it is a
    /// group
    fn next_chained_group(&self) -> Option<GroupRef> {
        let children = self.group_base().children.borrow();
        if children.len() == 1 {
            if let Some(group) = children[0].as_group() {
                return Some(group.group_base().self_group());
            }
        }
        None
    }

    /// Unwrap `group` from the single-child chain below this node: its
    /// children re-attach to the chain link above it
    ///
    /// The chain is searched downward from this node, first match wins.
    /// Returns whether the group was found and removed.
    fn remove_chained_group(&self, group: &GroupRef, update: Option<&mut SceneUpdate>) -> bool {
        let mut parent = self.group_base().self_group();
        let mut next = self.next_chained_group();
        while let Some(current) = next {
            if current.core().address() == group.core().address() {
                let group_node: SceneNodeRef = group.clone();
                parent.remove_child(&group_node, None);
                group.move_children_to(&*parent, None);
                if let Some(update) = update {
                    update.add_action(UpdateAction::REMOVED);
                    update.clear_path();
                    let group_object: SceneObjectRef = group.clone();
                    update.push_path(group_object);
                    self.notify_upper_nodes_of_update(update);
                }
                return true;
            }
            next = current.next_chained_group();
            parent = current;
        }
        log::trace!("chained group not found below this node; graph left unchanged");
        false
    }
}

/// Plain grouping node
pub struct Group {
    base: GroupBase,
}

impl Group {
    /// Create an empty group
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

impl SceneObject for Group {
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

impl SceneNode for Group {
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

impl GroupNode for Group {
    fn group_base(&self) -> &GroupBase {
        &self.base
    }
}
