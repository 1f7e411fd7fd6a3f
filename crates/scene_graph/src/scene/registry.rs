//! Open class registry for reflection-free "is-a" queries
//!
//! Renderers and pickers dispatch on node kinds far more often than nodes
//! are constructed, so each concrete kind gets a small integer [`ClassId`]
//! assigned once at registration together with its immediate super-kind.
//! [`SceneClassRegistry::is_kind_of`] then walks the static super chain —
//! O(depth of the registration chain) with no runtime type metadata — and
//! the same ids index per-class dispatch tables in the layers above.
//!
//! Kinds are keyed by `TypeId`. Abstract roles that have no concrete type of
//! their own (the node base, the transform role) are registered under the
//! `TypeId` of their trait object, e.g. `dyn SceneNode`.
//!
//! Registration is a one-time, idempotent call per concrete kind, performed
//! during process initialization; the built-in kinds register themselves on
//! first registry access.

use std::any::TypeId;
use std::collections::HashMap;
use std::sync::{Mutex, OnceLock, PoisonError};

use crate::scene::decoration::{FixedPixelSizeGroup, UnpickableGroup};
use crate::scene::geometry::GeometryNode;
use crate::scene::group::Group;
use crate::scene::node::SceneNode;
use crate::scene::switch::SwitchableGroup;
use crate::scene::transform::{AffineTransform, PosTransform, ScaleTransform, TransformNode};

/// Integer id of a registered node class
pub type ClassId = usize;

struct ClassEntry {
    name: String,
    super_id: ClassId,
}

/// Process-wide table of node classes and their super-kind chains
pub struct SceneClassRegistry {
    entries: Vec<ClassEntry>,
    ids: HashMap<TypeId, ClassId>,
}

impl SceneClassRegistry {
    fn empty() -> Self {
        Self {
            entries: Vec::new(),
            ids: HashMap::new(),
        }
    }

    fn with_builtins() -> Self {
        let mut registry = Self::empty();
        registry.register_class::<dyn SceneNode, dyn SceneNode>("SceneNode");
        registry.register_class::<Group, dyn SceneNode>("Group");
        registry.register_class::<dyn TransformNode, Group>("Transform");
        registry.register_class::<PosTransform, dyn TransformNode>("PosTransform");
        registry.register_class::<ScaleTransform, dyn TransformNode>("ScaleTransform");
        registry.register_class::<AffineTransform, dyn TransformNode>("AffineTransform");
        registry.register_class::<FixedPixelSizeGroup, Group>("FixedPixelSizeGroup");
        registry.register_class::<SwitchableGroup, Group>("SwitchableGroup");
        registry.register_class::<UnpickableGroup, Group>("UnpickableGroup");
        registry.register_class::<GeometryNode, dyn SceneNode>("GeometryNode");
        registry
    }

    fn global() -> &'static Mutex<SceneClassRegistry> {
        static REGISTRY: OnceLock<Mutex<SceneClassRegistry>> = OnceLock::new();
        REGISTRY.get_or_init(|| Mutex::new(SceneClassRegistry::with_builtins()))
    }

    /// Run `f` against the process-wide registry instance
    pub fn with<R>(f: impl FnOnce(&mut SceneClassRegistry) -> R) -> R {
        let mut registry = Self::global()
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        f(&mut registry)
    }

    /// Register the kind `T` with super-kind `S`, returning its id
    ///
    /// Idempotent: registering an already-known kind returns the existing id
    /// unchanged. A super-kind that was never registered (or `S == T`) makes
    /// `T` a root of its chain.
    pub fn register_class<T, S>(&mut self, name: &str) -> ClassId
    where
        T: ?Sized + 'static,
        S: ?Sized + 'static,
    {
        let type_id = TypeId::of::<T>();
        if let Some(&id) = self.ids.get(&type_id) {
            return id;
        }
        let id = self.entries.len();
        let super_id = if TypeId::of::<S>() == type_id {
            id
        } else {
            self.ids.get(&TypeId::of::<S>()).copied().unwrap_or(id)
        };
        self.entries.push(ClassEntry {
            name: name.to_owned(),
            super_id,
        });
        self.ids.insert(type_id, id);
        log::debug!("registered scene node class {name} (id {id}, super {super_id})");
        id
    }

    /// The id registered for kind `T`, if any
    pub fn class_id<T: ?Sized + 'static>(&self) -> Option<ClassId> {
        self.ids.get(&TypeId::of::<T>()).copied()
    }

    /// The id of the immediate super-kind; a chain root reports itself
    pub fn super_class_id(&self, id: ClassId) -> ClassId {
        self.entries[id].super_id
    }

    /// The name the class was registered under
    pub fn class_name(&self, id: ClassId) -> String {
        self.entries[id].name.clone()
    }

    /// Number of registered classes
    pub fn num_classes(&self) -> usize {
        self.entries.len()
    }

    /// Whether `id` names `ancestor_id` or one of its sub-kinds
    pub fn is_kind_of(&self, id: ClassId, ancestor_id: ClassId) -> bool {
        let mut current = id;
        loop {
            if current == ancestor_id {
                return true;
            }
            let super_id = self.entries[current].super_id;
            if super_id == current {
                return false;
            }
            current = super_id;
        }
    }

    /// Register a kind on the process-wide instance
    pub fn register<T, S>(name: &str) -> ClassId
    where
        T: ?Sized + 'static,
        S: ?Sized + 'static,
    {
        Self::with(|registry| registry.register_class::<T, S>(name))
    }

    /// Look up a kind's id on the process-wide instance
    pub fn id_of<T: ?Sized + 'static>() -> Option<ClassId> {
        Self::with(|registry| registry.class_id::<T>())
    }

    /// Look up a class name on the process-wide instance
    pub fn class_name_of(id: ClassId) -> String {
        Self::with(|registry| registry.class_name(id))
    }

    /// Look up a super-kind id on the process-wide instance
    pub fn super_class_of(id: ClassId) -> ClassId {
        Self::with(|registry| registry.super_class_id(id))
    }

    /// Run an "is-a" query on the process-wide instance
    pub fn check_kind_of(id: ClassId, ancestor_id: ClassId) -> bool {
        Self::with(|registry| registry.is_kind_of(id, ancestor_id))
    }
}

/// Id of a built-in kind; infallible because the built-ins register on
/// first registry access
pub(crate) fn builtin_class_id<T: ?Sized + 'static>() -> ClassId {
    SceneClassRegistry::id_of::<T>()
        .expect("built-in scene classes are registered on first registry access")
}
