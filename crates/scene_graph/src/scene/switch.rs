//! Visibility switching
//!
//! A [`Switch`] is a standalone on/off object that can be shared by several
//! [`SwitchableGroup`]s so whole families of subgraphs toggle together. It
//! is a plain scene object, not a node: it carries no geometry and never
//! participates in bounding-box aggregation. A switchable group without an
//! attached switch manages its own boolean. Visibility state never affects
//! bounding boxes.

use std::any::Any;
use std::cell::{Cell, RefCell};
use std::rc::Rc;

use crate::scene::bounding_box::BoundingBox;
use crate::scene::clone::CloneContext;
use crate::scene::group::{GroupBase, GroupNode};
use crate::scene::node::{NodeBase, SceneNode, SceneNodeRef};
use crate::scene::object::{ObjectAttributes, ObjectCore, SceneObject, SceneObjectRef};
use crate::scene::registry::builtin_class_id;
use crate::scene::update::{SceneUpdate, UpdateAction};

/// Shared boolean state toggling one or more switchable groups
pub struct Switch {
    core: ObjectCore,
    turned_on: Cell<bool>,
}

impl Switch {
    /// Create a switch with the given initial state
    pub fn new(on: bool) -> Rc<Self> {
        Rc::new_cyclic(|weak| Self {
            core: ObjectCore::new(weak, ObjectAttributes::empty()),
            turned_on: Cell::new(on),
        })
    }

    /// Current state
    pub fn is_turned_on(&self) -> bool {
        self.turned_on.get()
    }

    /// Change the state; a no-op when unchanged, otherwise a `MODIFIED`
    /// notification travels through every attached group when `update` is
    /// supplied
    pub fn set_turned_on(&self, on: bool, update: Option<&mut SceneUpdate>) {
        if on != self.turned_on.get() {
            self.turned_on.set(on);
            if let Some(update) = update {
                update.set_action(UpdateAction::MODIFIED);
                self.notify_update(update);
            }
        }
    }

    fn clone_with(&self) -> Rc<Self> {
        Rc::new_cyclic(|weak| Self {
            core: ObjectCore::cloned_from(weak, &self.core),
            turned_on: Cell::new(self.turned_on.get()),
        })
    }
}

impl SceneObject for Switch {
    fn core(&self) -> &ObjectCore {
        &self.core
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn clone_object(&self, _context: &mut CloneContext) -> SceneObjectRef {
        self.clone_with()
    }
}

/// A group whose visibility is toggled directly or through a shared
/// [`Switch`]
pub struct SwitchableGroup {
    base: GroupBase,
    switch: RefCell<Option<Rc<Switch>>>,
    turned_on: Cell<bool>,
}

impl SwitchableGroup {
    /// Create a switchable group managing its own state, initially on
    pub fn new() -> Rc<Self> {
        Rc::new_cyclic(|weak| Self {
            base: GroupBase::new(weak, builtin_class_id::<Self>(), ObjectAttributes::empty()),
            switch: RefCell::new(None),
            turned_on: Cell::new(true),
        })
    }

    /// Create a switchable group delegating to a shared switch
    pub fn with_switch(switch: Rc<Switch>) -> Rc<Self> {
        let group = Self::new();
        group.set_switch(Some(switch));
        group
    }

    /// The attached switch, if any
    pub fn switch(&self) -> Option<Rc<Switch>> {
        self.switch.borrow().clone()
    }

    /// Attach a shared switch (detaching any previous one first), or detach
    /// with `None`; state and notifications then flow through the switch
    pub fn set_switch(&self, switch: Option<Rc<Switch>>) {
        if let Some(old) = self.switch.borrow_mut().take() {
            old.remove_parent(self);
        }
        if let Some(new_switch) = switch {
            let self_object = self.base.core().self_object();
            new_switch.add_parent(&self_object, None);
            *self.switch.borrow_mut() = Some(new_switch);
        }
    }

    /// Current visibility state: the switch's when attached, otherwise the
    /// group's own
    pub fn is_turned_on(&self) -> bool {
        self.switch
            .borrow()
            .as_ref()
            .map_or(self.turned_on.get(), |switch| switch.is_turned_on())
    }

    /// Change the visibility state, delegating entirely to the attached
    /// switch when there is one
    pub fn set_turned_on(&self, on: bool, update: Option<&mut SceneUpdate>) {
        let switch = self.switch.borrow().clone();
        if let Some(switch) = switch {
            switch.set_turned_on(on, update);
        } else if on != self.turned_on.get() {
            self.turned_on.set(on);
            if let Some(update) = update {
                update.set_action(UpdateAction::MODIFIED);
                self.notify_update(update);
            }
        }
    }

    fn clone_with(&self, context: &mut CloneContext) -> Rc<Self> {
        let switch = self.switch.borrow().as_ref().map(|switch| {
            if context.non_node_cloning() {
                context.get_or_clone(switch)
            } else {
                switch.clone()
            }
        });
        let clone = Rc::new_cyclic(|weak| Self {
            base: GroupBase::cloned_from(weak, &self.base, context),
            switch: RefCell::new(None),
            turned_on: Cell::new(self.turned_on.get()),
        });
        clone.set_switch(switch);
        clone
    }
}

impl Drop for SwitchableGroup {
    fn drop(&mut self) {
        if let Some(switch) = self.switch.borrow_mut().take() {
            switch.core().remove_parent_addr(self.base.core().address());
        }
    }
}

impl SceneObject for SwitchableGroup {
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

impl SceneNode for SwitchableGroup {
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

impl GroupNode for SwitchableGroup {
    fn group_base(&self) -> &GroupBase {
        &self.base
    }
}
