//! Synchronous observer signals
//!
//! A [`Signal`] is a per-object list of interested observers invoked
//! synchronously on [`Signal::emit`]. Observers register with
//! [`Signal::connect`] and receive a [`Connection`] handle for later
//! disconnection. Emission iterates a snapshot of the slot list, so a
//! callback may connect or disconnect observers on the signal currently
//! being emitted; mutating the graph region that triggered the emission is
//! not supported (the upward notification walk is reentrant-unsafe).

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;

/// Handle identifying one observer registration on a [`Signal`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Connection {
    id: u64,
}

/// Synchronous list of observers sharing one argument type
pub struct Signal<Arg: 'static> {
    slots: RefCell<Vec<(u64, Rc<dyn Fn(&Arg)>)>>,
    next_id: Cell<u64>,
}

impl<Arg: 'static> Signal<Arg> {
    /// Create a signal with no observers
    pub fn new() -> Self {
        Self {
            slots: RefCell::new(Vec::new()),
            next_id: Cell::new(0),
        }
    }

    /// Register an observer; returns the handle used to disconnect it
    pub fn connect(&self, observer: impl Fn(&Arg) + 'static) -> Connection {
        let id = self.next_id.get();
        self.next_id.set(id + 1);
        let slot: Rc<dyn Fn(&Arg)> = Rc::new(observer);
        self.slots.borrow_mut().push((id, slot));
        Connection { id }
    }

    /// Remove a previously connected observer
    ///
    /// Disconnecting an already-removed connection is a no-op.
    pub fn disconnect(&self, connection: Connection) {
        self.slots.borrow_mut().retain(|(id, _)| *id != connection.id);
    }

    /// Invoke every connected observer with the given argument
    pub fn emit(&self, arg: &Arg) {
        let observers: Vec<Rc<dyn Fn(&Arg)>> = self
            .slots
            .borrow()
            .iter()
            .map(|(_, observer)| observer.clone())
            .collect();
        for observer in observers {
            observer(arg);
        }
    }

    /// Number of currently connected observers
    pub fn connection_count(&self) -> usize {
        self.slots.borrow().len()
    }
}

impl<Arg: 'static> Default for Signal<Arg> {
    fn default() -> Self {
        Self::new()
    }
}

impl<Arg: 'static> fmt::Debug for Signal<Arg> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Signal")
            .field("connections", &self.connection_count())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_connect_and_emit() {
        let signal = Signal::new();
        let received = Rc::new(Cell::new(0));

        let observed = received.clone();
        signal.connect(move |value: &i32| observed.set(*value));

        signal.emit(&7);
        assert_eq!(received.get(), 7);
    }

    #[test]
    fn test_disconnect_stops_delivery() {
        let signal = Signal::new();
        let count = Rc::new(Cell::new(0));

        let counter = count.clone();
        let connection = signal.connect(move |_: &()| counter.set(counter.get() + 1));

        signal.emit(&());
        signal.disconnect(connection);
        signal.emit(&());
        assert_eq!(count.get(), 1);
    }

    #[test]
    fn test_multiple_observers_all_fire() {
        let signal = Signal::new();
        let count = Rc::new(Cell::new(0));

        for _ in 0..3 {
            let counter = count.clone();
            signal.connect(move |_: &()| counter.set(counter.get() + 1));
        }
        assert_eq!(signal.connection_count(), 3);

        signal.emit(&());
        assert_eq!(count.get(), 3);
    }

    #[test]
    fn test_observer_may_disconnect_during_emit() {
        let signal = Rc::new(Signal::new());
        let count = Rc::new(Cell::new(0));

        let connection = Rc::new(Cell::new(None));
        let counter = count.clone();
        let signal_ref = signal.clone();
        let connection_ref = connection.clone();
        let id = signal.connect(move |_: &()| {
            counter.set(counter.get() + 1);
            if let Some(connection) = connection_ref.get() {
                signal_ref.disconnect(connection);
            }
        });
        connection.set(Some(id));

        signal.emit(&());
        signal.emit(&());
        assert_eq!(count.get(), 1);
    }
}
