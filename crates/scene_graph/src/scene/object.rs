//! Graph object base layer
//!
//! Every element of the scene graph is a [`SceneObject`]: it has pointer
//! identity, a name, a set of role attributes, a set of *non-owning* parent
//! back-references, two observer signals, and the validity flag guarding the
//! cached bounding box of the concrete type built on top of it.
//!
//! ## Ownership model
//!
//! Children are held by their groups through `Rc<dyn SceneNode>` handles, so
//! a node may be owned by several groups at once and dies only when the last
//! owner releases it. Parent links are `Weak` observations: a child never
//! keeps its parents alive. The graph is a DAG by caller contract — adding a
//! node below itself is not detected in release builds and breaks traversal
//! and bounding-box recursion.
//!
//! ## Notification
//!
//! A mutation seeds a [`SceneUpdate`] token and calls
//! [`SceneObject::notify_upper_nodes_of_update`]. The walk pushes the current
//! object onto the token path, invalidates its bounding-box cache when the
//! action implies a geometry change, fires its update signal, recurses into
//! every registered parent, and pops the path entry on the way back. A node
//! shared by several ancestor paths therefore notifies the common ancestor
//! once per distinct path; the path tells the observer which branch changed.
//! Delivery is synchronous and reentrant-unsafe: an observer must not mutate
//! the graph region it is being notified about.

use std::any::Any;
use std::cell::{Cell, RefCell};
use std::path::PathBuf;
use std::rc::{Rc, Weak};

use crate::scene::clone::CloneContext;
use crate::scene::error::SceneError;
use crate::scene::signal::Signal;
use crate::scene::update::{SceneUpdate, UpdateAction};

bitflags::bitflags! {
    /// Role and behavior attributes carried by every scene object
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct ObjectAttributes: u16 {
        /// The object is a node (participates in the node hierarchy)
        const NODE = 1 << 0;
        /// The object is a grouping node owning child nodes
        const GROUP = 1 << 1;
        /// The object applies a spatial transform to its children
        const TRANSFORM = 1 << 2;
        /// The object contributes geometry to bounding-box aggregation
        const GEOMETRY = 1 << 3;
        /// The object is marker-like and excluded from bounding boxes
        const MARKER = 1 << 4;
        /// The object is annotation-only and skippable when cloning
        const META_SCENE = 1 << 5;
    }
}

/// Shared handle to a scene object
pub type SceneObjectRef = Rc<dyn SceneObject>;

/// Non-owning handle to a scene object
pub type WeakSceneObject = Weak<dyn SceneObject>;

/// Control value returned by traversal visitors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TraverseStatus {
    /// Descend into the current object's children
    Continue,
    /// Skip the current object's children but keep traversing siblings
    SkipChildren,
    /// Abort the whole traversal
    Stop,
}

/// Optional URI record attached to an object loaded from an external resource
#[derive(Clone, Default)]
struct UriInfo {
    uri: String,
    absolute_uri: String,
    object_name: String,
    fragment: String,
    metadata: Option<Rc<dyn Any>>,
}

/// State shared by every scene object implementation
///
/// Concrete types embed one `ObjectCore` (usually through [`NodeBase`] or
/// [`GroupBase`]) and hand it out via [`SceneObject::core`]; the trait's
/// provided methods do the rest.
///
/// [`NodeBase`]: crate::scene::node::NodeBase
/// [`GroupBase`]: crate::scene::group::GroupBase
pub struct ObjectCore {
    self_object: WeakSceneObject,
    name: RefCell<String>,
    attributes: Cell<ObjectAttributes>,
    bbox_cache_valid: Cell<bool>,
    parents: RefCell<Vec<WeakSceneObject>>,
    uri_info: RefCell<Option<Box<UriInfo>>>,
    sig_updated: Signal<SceneUpdate>,
    sig_graph_connection: Signal<bool>,
}

impl ObjectCore {
    /// Create the core for a new object
    ///
    /// `self_ref` is the weak handle produced by `Rc::new_cyclic`; it gives
    /// the object its identity and lets the notification walk put the object
    /// itself onto update paths.
    pub fn new<T: SceneObject + 'static>(self_ref: &Weak<T>, attributes: ObjectAttributes) -> Self {
        let self_object: WeakSceneObject = self_ref.clone();
        Self {
            self_object,
            name: RefCell::new(String::new()),
            attributes: Cell::new(attributes),
            bbox_cache_valid: Cell::new(false),
            parents: RefCell::new(Vec::new()),
            uri_info: RefCell::new(None),
            sig_updated: Signal::new(),
            sig_graph_connection: Signal::new(),
        }
    }

    /// Create the core of a clone: name, attributes and URI record are
    /// copied; parents, signals and the cache flag start fresh
    pub(crate) fn cloned_from<T: SceneObject + 'static>(
        self_ref: &Weak<T>,
        org: &ObjectCore,
    ) -> Self {
        let self_object: WeakSceneObject = self_ref.clone();
        Self {
            self_object,
            name: RefCell::new(org.name.borrow().clone()),
            attributes: Cell::new(org.attributes.get()),
            bbox_cache_valid: Cell::new(false),
            parents: RefCell::new(Vec::new()),
            uri_info: RefCell::new(org.uri_info.borrow().clone()),
            sig_updated: Signal::new(),
            sig_graph_connection: Signal::new(),
        }
    }

    /// Shared handle to the object owning this core
    pub fn self_object(&self) -> SceneObjectRef {
        self.self_object
            .upgrade()
            .expect("self reference is set at construction and lives as long as the object")
    }

    /// Stable identity of the owning object (its allocation address)
    pub(crate) fn address(&self) -> usize {
        self.self_object.as_ptr().cast::<()>() as usize
    }

    pub(crate) fn has_valid_bounding_box_cache(&self) -> bool {
        self.bbox_cache_valid.get()
    }

    pub(crate) fn set_bounding_box_cache_ready(&self) {
        self.bbox_cache_valid.set(true);
    }

    pub(crate) fn invalidate_bounding_box(&self) {
        self.bbox_cache_valid.set(false);
    }

    /// Record a parent link; set semantics, keyed by object identity.
    /// Returns whether the parent was newly inserted.
    pub(crate) fn insert_parent(&self, parent: WeakSceneObject) -> bool {
        let addr = parent.as_ptr().cast::<()>() as usize;
        let mut parents = self.parents.borrow_mut();
        if parents.iter().any(|p| p.as_ptr().cast::<()>() as usize == addr) {
            false
        } else {
            parents.push(parent);
            true
        }
    }

    /// Drop the parent link with the given identity, firing the
    /// graph-connection signal when the last link goes away
    pub(crate) fn remove_parent_addr(&self, addr: usize) {
        let removed_last = {
            let mut parents = self.parents.borrow_mut();
            let len_before = parents.len();
            parents.retain(|p| p.as_ptr().cast::<()>() as usize != addr);
            parents.len() != len_before && parents.is_empty()
        };
        if removed_last {
            self.sig_graph_connection.emit(&false);
        }
    }

    pub(crate) fn parent_objects(&self) -> Vec<SceneObjectRef> {
        self.parents.borrow().iter().filter_map(Weak::upgrade).collect()
    }

    pub(crate) fn num_parents(&self) -> usize {
        self.parents.borrow().len()
    }

    /// The depth-first upward notification walk; see
    /// [`SceneObject::notify_upper_nodes_of_update`] for the protocol
    pub(crate) fn notify_upper(&self, update: &mut SceneUpdate, invalidate_bounding_box: bool) {
        update.push_path(self.self_object());
        if invalidate_bounding_box {
            self.invalidate_bounding_box();
        }
        self.sig_updated.emit(update);
        for parent in self.parent_objects() {
            parent.core().notify_upper(update, invalidate_bounding_box);
        }
        update.pop_path();
    }

    fn with_uri_info<R>(&self, f: impl FnOnce(&mut UriInfo) -> R) -> R {
        let mut slot = self.uri_info.borrow_mut();
        f(slot.get_or_insert_with(Box::default))
    }

    fn read_uri_info<R>(&self, f: impl FnOnce(Option<&UriInfo>) -> R) -> R {
        f(self.uri_info.borrow().as_deref())
    }
}

/// Base capability of every scene graph element
///
/// Concrete types implement the four required methods; everything else is
/// provided on top of [`ObjectCore`].
pub trait SceneObject: Any {
    /// The shared object state
    fn core(&self) -> &ObjectCore;

    /// Upcast for `&`-based downcasting
    fn as_any(&self) -> &dyn Any;

    /// Polymorphic copy through a [`CloneContext`]
    fn clone_object(&self, context: &mut CloneContext) -> SceneObjectRef;

    /// Number of child objects (zero for leaves)
    fn num_child_objects(&self) -> usize {
        0
    }

    /// Child object by index, `None` when out of range
    fn child_object(&self, _index: usize) -> Option<SceneObjectRef> {
        None
    }

    /// The object name (empty by default)
    fn name(&self) -> String {
        self.core().name.borrow().clone()
    }

    /// Set the object name
    fn set_name(&self, name: &str) {
        *self.core().name.borrow_mut() = name.to_owned();
    }

    /// The full attribute set
    fn attributes(&self) -> ObjectAttributes {
        self.core().attributes.get()
    }

    /// Whether any of the given attributes are set
    fn has_attribute(&self, attribute: ObjectAttributes) -> bool {
        self.core().attributes.get().intersects(attribute)
    }

    /// Add attributes to the object
    fn set_attribute(&self, attribute: ObjectAttributes) {
        let core = self.core();
        core.attributes.set(core.attributes.get() | attribute);
    }

    /// Remove attributes from the object
    fn clear_attribute(&self, attribute: ObjectAttributes) {
        let core = self.core();
        core.attributes.set(core.attributes.get() - attribute);
    }

    /// Whether the cached bounding box is currently valid
    fn has_valid_bounding_box_cache(&self) -> bool {
        self.core().has_valid_bounding_box_cache()
    }

    /// Mark the cached bounding box stale; the next read recomputes it
    fn invalidate_bounding_box(&self) {
        self.core().invalidate_bounding_box();
    }

    /// Signal fired on every update travelling through this object
    fn sig_updated(&self) -> &Signal<SceneUpdate> {
        &self.core().sig_updated
    }

    /// Signal fired with `true` when the object gains its first parent and
    /// with `false` when it loses its last one
    fn sig_graph_connection(&self) -> &Signal<bool> {
        &self.core().sig_graph_connection
    }

    /// Register a parent link; called by container implementations in the
    /// same operation that stores the child reference
    fn add_parent(&self, parent: &SceneObjectRef, update: Option<&mut SceneUpdate>) {
        let newly_added = self.core().insert_parent(Rc::downgrade(parent));
        if let Some(update) = update {
            update.clear_path();
            update.push_path(self.core().self_object());
            update.set_action(UpdateAction::ADDED);
            parent.notify_upper_nodes_of_update(update);
        }
        if newly_added && self.core().num_parents() == 1 {
            self.core().sig_graph_connection.emit(&true);
        }
    }

    /// Drop a parent link; counterpart of [`Self::add_parent`]
    fn remove_parent(&self, parent: &dyn SceneObject) {
        self.core().remove_parent_addr(parent.core().address());
    }

    /// Number of registered parents
    fn num_parents(&self) -> usize {
        self.core().num_parents()
    }

    /// Whether the object is referenced by at least one container
    fn has_parents(&self) -> bool {
        self.core().num_parents() > 0
    }

    /// Snapshot of the registered parents
    fn parents(&self) -> Vec<SceneObjectRef> {
        self.core().parent_objects()
    }

    /// Whether this object is `object` itself or one of its ancestors
    fn is_ancestor_of(&self, object: &SceneObjectRef) -> bool {
        if self.core().address() == object.core().address() {
            return true;
        }
        object
            .parents()
            .iter()
            .any(|parent| self.is_ancestor_of(parent))
    }

    /// Push this object's change up through every registered parent path
    ///
    /// The bounding-box caches along the paths are invalidated when the
    /// token's action set implies a geometry change (`ADDED`, `REMOVED` or
    /// `GEOMETRY_MODIFIED`).
    fn notify_upper_nodes_of_update(&self, update: &mut SceneUpdate) {
        let invalidate = update.has_action(
            UpdateAction::ADDED | UpdateAction::REMOVED | UpdateAction::GEOMETRY_MODIFIED,
        );
        self.core().notify_upper(update, invalidate);
    }

    /// Variant of [`Self::notify_upper_nodes_of_update`] with an explicit
    /// invalidation decision
    fn notify_upper_nodes_of_update_with(
        &self,
        update: &mut SceneUpdate,
        invalidate_bounding_box: bool,
    ) {
        self.core().notify_upper(update, invalidate_bounding_box);
    }

    /// Seed a fresh walk: clears the token path and notifies upward from
    /// this object
    fn notify_update(&self, update: &mut SceneUpdate) {
        update.clear_path();
        self.notify_upper_nodes_of_update(update);
    }

    /// Convenience wrapper building a one-shot token for `action`
    fn notify_update_with_action(&self, action: UpdateAction) {
        let mut update = SceneUpdate::new(action);
        self.notify_update(&mut update);
    }

    /// URI of the external resource this object came from (empty if none)
    fn uri(&self) -> String {
        self.core()
            .read_uri_info(|info| info.map_or_else(String::new, |info| info.uri.clone()))
    }

    /// Whether a non-empty URI is recorded
    fn has_uri(&self) -> bool {
        self.core().read_uri_info(|info| info.is_some_and(|info| !info.uri.is_empty()))
    }

    /// Absolute form of the URI (empty if none)
    fn absolute_uri(&self) -> String {
        self.core()
            .read_uri_info(|info| info.map_or_else(String::new, |info| info.absolute_uri.clone()))
    }

    /// Record the URI and its absolute form; a bare path is stored with the
    /// `file://` scheme prepended
    fn set_uri(&self, uri: &str, absolute_uri: &str) {
        self.core().with_uri_info(|info| {
            info.uri = uri.to_owned();
            info.absolute_uri = if absolute_uri.starts_with("file://") {
                absolute_uri.to_owned()
            } else {
                format!("file://{absolute_uri}")
            };
        });
    }

    /// Name of the sub-object within the resource the URI points at
    fn uri_object_name(&self) -> String {
        self.core()
            .read_uri_info(|info| info.map_or_else(String::new, |info| info.object_name.clone()))
    }

    /// Set the sub-object name within the referenced resource
    fn set_uri_object_name(&self, object_name: &str) {
        self.core()
            .with_uri_info(|info| info.object_name = object_name.to_owned());
    }

    /// URI fragment (empty if none)
    fn uri_fragment(&self) -> String {
        self.core()
            .read_uri_info(|info| info.map_or_else(String::new, |info| info.fragment.clone()))
    }

    /// Set the URI fragment
    fn set_uri_fragment(&self, fragment: &str) {
        self.core()
            .with_uri_info(|info| info.fragment = fragment.to_owned());
    }

    /// Free-form metadata attached by the persistence layer
    fn uri_metadata(&self) -> Option<Rc<dyn Any>> {
        self.core().read_uri_info(|info| info.and_then(|info| info.metadata.clone()))
    }

    /// Attach free-form metadata from the persistence layer
    fn set_uri_metadata(&self, metadata: Option<Rc<dyn Any>>) {
        self.core().with_uri_info(|info| info.metadata = metadata);
    }

    /// Local filesystem path of the URI: strips a `file://` scheme, returns
    /// the URI verbatim otherwise
    fn local_file_path(&self) -> String {
        self.core().read_uri_info(|info| {
            info.map_or_else(String::new, |info| {
                info.uri
                    .strip_prefix("file://")
                    .map_or_else(|| info.uri.clone(), str::to_owned)
            })
        })
    }

    /// Local filesystem path of the absolute URI; empty unless the absolute
    /// URI carries the `file://` scheme
    fn local_file_absolute_path(&self) -> String {
        self.core().read_uri_info(|info| {
            info.and_then(|info| info.absolute_uri.strip_prefix("file://"))
                .map_or_else(String::new, str::to_owned)
        })
    }

    /// Record a file path URI, resolving a relative path against
    /// `base_directory` (itself resolved against the current directory when
    /// relative)
    fn set_uri_with_file_path_and_base_directory(&self, file_path: &str, base_directory: &str) {
        let mut path = PathBuf::from(file_path);
        if path.is_relative() {
            let mut base = PathBuf::from(base_directory);
            if base.is_relative() {
                if let Ok(current) = std::env::current_dir() {
                    base = current.join(base);
                }
            }
            path = base.join(path);
        }
        self.set_uri(file_path, &path.to_string_lossy());
    }

    /// Record a file path URI, resolving a relative path against the
    /// current directory
    fn set_uri_with_file_path_and_current_directory(&self, file_path: &str) {
        let mut path = PathBuf::from(file_path);
        if path.is_relative() {
            if let Ok(current) = std::env::current_dir() {
                path = current.join(path);
            }
        }
        self.set_uri(file_path, &path.to_string_lossy());
    }

    /// Depth-first search for the first object satisfying `predicate`
    /// (parent before children, left-to-right)
    fn find_object(
        &self,
        predicate: &mut dyn FnMut(&SceneObjectRef) -> bool,
    ) -> Option<SceneObjectRef> {
        let self_ref = self.core().self_object();
        if predicate(&self_ref) {
            return Some(self_ref);
        }
        for index in 0..self.num_child_objects() {
            if let Some(child) = self.child_object(index) {
                if let Some(found) = child.find_object(predicate) {
                    return Some(found);
                }
            }
        }
        None
    }

    /// Depth-first traversal under visitor control; returns `false` when
    /// the visitor stopped it
    fn traverse_objects(&self, visitor: &mut dyn FnMut(&SceneObjectRef) -> TraverseStatus) -> bool {
        match visitor(&self.core().self_object()) {
            TraverseStatus::Stop => return false,
            TraverseStatus::SkipChildren => return true,
            TraverseStatus::Continue => {}
        }
        for index in 0..self.num_child_objects() {
            if let Some(child) = self.child_object(index) {
                if !child.traverse_objects(visitor) {
                    return false;
                }
            }
        }
        true
    }
}

/// Identity comparison: whether two handles refer to the same object
pub fn same_object(a: &SceneObjectRef, b: &SceneObjectRef) -> bool {
    a.core().address() == b.core().address()
}

/// Downcast an object handle to its concrete type
///
/// Returns [`SceneError::TypeMismatch`] when the object is of a different
/// kind.
pub fn try_downcast_object<T: SceneObject>(object: &SceneObjectRef) -> Result<Rc<T>, SceneError> {
    let any: Rc<dyn Any> = object.clone();
    any.downcast::<T>().map_err(|_| SceneError::TypeMismatch {
        expected: std::any::type_name::<T>(),
    })
}

/// Downcast an object handle, treating a mismatch as a fatal contract
/// violation
///
/// # Panics
///
/// Panics when the object is of a different kind; probe with
/// [`try_downcast_object`] instead when the kind is uncertain.
pub fn downcast_object<T: SceneObject>(object: &SceneObjectRef) -> Rc<T> {
    try_downcast_object(object).unwrap_or_else(|err| panic!("{err}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::group::{Group, GroupNode};
    use crate::scene::node::SceneNodeRef;
    use crate::scene::switch::Switch;

    #[test]
    fn test_name_and_attributes() {
        let group = Group::new();
        assert_eq!(group.name(), "");
        group.set_name("chassis");
        assert_eq!(group.name(), "chassis");

        assert!(group.has_attribute(ObjectAttributes::NODE));
        assert!(group.has_attribute(ObjectAttributes::GROUP));
        assert!(!group.has_attribute(ObjectAttributes::MARKER));
        group.set_attribute(ObjectAttributes::MARKER);
        assert!(group.has_attribute(ObjectAttributes::MARKER));
        group.clear_attribute(ObjectAttributes::MARKER);
        assert!(!group.has_attribute(ObjectAttributes::MARKER));
    }

    #[test]
    fn test_uri_record() {
        let group = Group::new();
        assert!(!group.has_uri());
        assert_eq!(group.uri(), "");
        assert_eq!(group.local_file_path(), "");

        group.set_uri("model/base.mesh", "/assets/model/base.mesh");
        assert!(group.has_uri());
        assert_eq!(group.uri(), "model/base.mesh");
        assert_eq!(group.absolute_uri(), "file:///assets/model/base.mesh");
        assert_eq!(group.local_file_path(), "model/base.mesh");
        assert_eq!(group.local_file_absolute_path(), "/assets/model/base.mesh");

        group.set_uri_fragment("wheel");
        assert_eq!(group.uri_fragment(), "wheel");
        group.set_uri_object_name("base");
        assert_eq!(group.uri_object_name(), "base");
    }

    #[test]
    fn test_uri_with_base_directory() {
        let group = Group::new();
        group.set_uri_with_file_path_and_base_directory("mesh/arm.obj", "/data/robots");
        assert_eq!(group.uri(), "mesh/arm.obj");
        assert_eq!(group.local_file_absolute_path(), "/data/robots/mesh/arm.obj");
    }

    #[test]
    fn test_uri_metadata_slot() {
        let switch = Switch::new(true);
        assert!(switch.uri_metadata().is_none());
        switch.set_uri_metadata(Some(Rc::new(42_u32)));
        let metadata = switch.uri_metadata().unwrap();
        assert_eq!(*metadata.downcast_ref::<u32>().unwrap(), 42);
    }

    #[test]
    fn test_is_ancestor_of() {
        let root = Group::new();
        let middle = Group::new();
        let leaf = Group::new();
        root.add_child(middle.clone(), None);
        middle.add_child(leaf.clone(), None);

        let leaf_obj: SceneObjectRef = leaf.clone();
        let root_obj: SceneObjectRef = root.clone();
        assert!(root.is_ancestor_of(&leaf_obj));
        assert!(root.is_ancestor_of(&root_obj));
        assert!(!leaf.is_ancestor_of(&root_obj));
    }

    #[test]
    fn test_traverse_objects_statuses() {
        let root = Group::new();
        let skipped = Group::new();
        let hidden = Group::new();
        let sibling = Group::new();
        skipped.add_child(hidden.clone(), None);
        root.add_child(skipped.clone(), None);
        root.add_child(sibling.clone(), None);

        let skipped_obj: SceneObjectRef = skipped.clone();
        let mut visited = Vec::new();
        let completed = root.traverse_objects(&mut |object| {
            visited.push(object.core().address());
            if same_object(object, &skipped_obj) {
                TraverseStatus::SkipChildren
            } else {
                TraverseStatus::Continue
            }
        });
        assert!(completed);
        assert_eq!(visited.len(), 3);
        assert!(!visited.contains(&hidden.core().address()));

        let mut count = 0;
        let stopped = root.traverse_objects(&mut |_| {
            count += 1;
            TraverseStatus::Stop
        });
        assert!(!stopped);
        assert_eq!(count, 1);
    }

    #[test]
    fn test_find_object_by_name() {
        let root = Group::new();
        let target = Group::new();
        target.set_name("target");
        root.add_child(target.clone(), None);

        let found = root
            .find_object(&mut |object| object.name() == "target")
            .unwrap();
        let target_obj: SceneObjectRef = target;
        assert!(same_object(&found, &target_obj));
    }

    #[test]
    fn test_downcast_object() {
        let group = Group::new();
        let object: SceneObjectRef = group;
        assert!(try_downcast_object::<Group>(&object).is_ok());
        assert_eq!(
            try_downcast_object::<Switch>(&object).err().unwrap(),
            SceneError::TypeMismatch {
                expected: std::any::type_name::<Switch>()
            }
        );
    }

    #[test]
    fn test_graph_connection_signal() {
        let node = Group::new();
        let events = Rc::new(RefCell::new(Vec::new()));

        let log = events.clone();
        node.sig_graph_connection()
            .connect(move |connected: &bool| log.borrow_mut().push(*connected));

        let parent_a = Group::new();
        let parent_b = Group::new();
        parent_a.add_child(node.clone(), None);
        assert_eq!(*events.borrow(), vec![true]);

        parent_b.add_child(node.clone(), None);
        assert_eq!(*events.borrow(), vec![true]);

        let node_ref: SceneNodeRef = node.clone();
        parent_a.remove_child(&node_ref, None);
        assert_eq!(*events.borrow(), vec![true]);

        parent_b.remove_child(&node_ref, None);
        assert_eq!(*events.borrow(), vec![true, false]);
    }
}
