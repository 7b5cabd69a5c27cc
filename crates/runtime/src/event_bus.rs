use foundation::time::Millis;

/// An emitted item together with the logical time it was emitted at.
#[derive(Debug, Clone, PartialEq)]
pub struct Event<E> {
    pub at: Millis,
    pub payload: E,
}

/// Ordered outbox.
///
/// Producers emit during a synchronous step; the owner of the event loop
/// drains everything afterwards and acts on it, so no producer ever needs a
/// handle to the consumer.
#[derive(Debug)]
pub struct EventBus<E> {
    events: Vec<Event<E>>,
}

impl<E> Default for EventBus<E> {
    fn default() -> Self {
        Self { events: Vec::new() }
    }
}

impl<E> EventBus<E> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn emit(&mut self, at: Millis, payload: E) {
        self.events.push(Event { at, payload });
    }

    pub fn events(&self) -> &[Event<E>] {
        &self.events
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn drain(&mut self) -> Vec<Event<E>> {
        std::mem::take(&mut self.events)
    }
}
