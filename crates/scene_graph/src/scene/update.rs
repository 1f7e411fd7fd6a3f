//! Update token carried through upward change notification
//!
//! A [`SceneUpdate`] describes *what* changed (an [`UpdateAction`] flag set)
//! and *where* (the path of objects visited so far, mutation site first).
//! The mutating operation seeds the token; the notification walk pushes each
//! object before recursing into its parents and pops it on the way back, so
//! an observer sees the exact branch the change travelled along.

use std::fmt;

use crate::scene::object::{SceneObject, SceneObjectRef};

bitflags::bitflags! {
    /// Kinds of change reported by a notification
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct UpdateAction: u8 {
        /// A child object was added
        const ADDED = 1 << 0;
        /// A child object was removed
        const REMOVED = 1 << 1;
        /// A value carried by the object changed
        const MODIFIED = 1 << 2;
        /// The change affects aggregated geometry (bounding boxes)
        const GEOMETRY_MODIFIED = 1 << 3;
    }
}

/// Token describing one logical update as it propagates upward
pub struct SceneUpdate {
    action: UpdateAction,
    path: Vec<SceneObjectRef>,
}

impl SceneUpdate {
    /// Create a token with the given action set and an empty path
    pub fn new(action: UpdateAction) -> Self {
        Self {
            action,
            path: Vec::new(),
        }
    }

    /// The current action flag set
    pub fn action(&self) -> UpdateAction {
        self.action
    }

    /// Whether any of the given flags are set
    pub fn has_action(&self, action: UpdateAction) -> bool {
        self.action.intersects(action)
    }

    /// Replace the action flag set
    pub fn set_action(&mut self, action: UpdateAction) {
        self.action = action;
    }

    /// Add flags to the action set
    pub fn add_action(&mut self, action: UpdateAction) {
        self.action |= action;
    }

    /// Replace the action set and hand the token back, for call chaining
    pub fn with_action(&mut self, action: UpdateAction) -> &mut Self {
        self.action = action;
        self
    }

    /// The objects visited so far, mutation site first
    pub fn path(&self) -> &[SceneObjectRef] {
        &self.path
    }

    /// Drop all path entries; the mutating operation calls this before
    /// seeding a fresh walk
    pub fn clear_path(&mut self) {
        self.path.clear();
    }

    /// Append an object to the path
    pub fn push_path(&mut self, object: SceneObjectRef) {
        self.path.push(object);
    }

    /// Remove the most recently pushed path entry
    pub fn pop_path(&mut self) {
        self.path.pop();
    }
}

impl Default for SceneUpdate {
    fn default() -> Self {
        Self::new(UpdateAction::MODIFIED)
    }
}

impl fmt::Debug for SceneUpdate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<String> = self.path.iter().map(|object| object.name()).collect();
        f.debug_struct("SceneUpdate")
            .field("action", &self.action)
            .field("path", &names)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_action_flags_compose() {
        let mut update = SceneUpdate::new(UpdateAction::MODIFIED);
        update.add_action(UpdateAction::GEOMETRY_MODIFIED);

        assert_eq!(
            update.action(),
            UpdateAction::MODIFIED | UpdateAction::GEOMETRY_MODIFIED
        );
        assert!(update.has_action(UpdateAction::GEOMETRY_MODIFIED));
        assert!(!update.has_action(UpdateAction::ADDED));
    }

    #[test]
    fn test_with_action_replaces_flags() {
        let mut update = SceneUpdate::new(UpdateAction::ADDED);
        update.with_action(UpdateAction::REMOVED);
        assert_eq!(update.action(), UpdateAction::REMOVED);
    }

    #[test]
    fn test_default_is_modified() {
        assert_eq!(SceneUpdate::default().action(), UpdateAction::MODIFIED);
    }
}
