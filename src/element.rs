//! An observable base mixed into every producer and consumer: fires
//! typed events to zero or more listeners, synchronously, in registration
//! order. Listeners may not be removed.
//!
//! The original implementation mixes an event emitter into many types via
//! inheritance; this rewrite uses an explicit, typed listener list per
//! object instead, and a closed `Event` enum in place of an open tagged
//! union.

use std::sync::Mutex;

use crate::rtsp::message::{Request, Response};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum State {
    Null,
    Ready,
    Playing,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct Stats {
    pub sent: usize,
    pub received: usize,
}

/// Events observed in practice: state markers, RTSP protocol messages, and
/// small stat structs. RTCP is reported as a channel id plus the raw
/// compound-packet bytes rather than parsed packets, so `Event` doesn't
/// need to depend on `rtcp::Packet` trait objects (which aren't `Clone`).
#[derive(Debug, Clone)]
pub enum Event {
    State(State),
    Request(std::sync::Arc<Request>),
    Response(std::sync::Arc<Response>),
    Rtcp { channel: u8, raw: std::sync::Arc<[u8]> },
    Stats(Stats),
}

type Listener = Box<dyn Fn(&Event) + Send + Sync>;

/// Listeners run synchronously on whatever task calls `fire`; they must
/// not block.
#[derive(Default)]
pub struct Element {
    listeners: Mutex<Vec<Listener>>,
}

impl Element {
    pub fn new() -> Element {
        Element {
            listeners: Mutex::new(Vec::new()),
        }
    }

    pub fn listen<F>(&self, f: F)
    where
        F: Fn(&Event) + Send + Sync + 'static,
    {
        self.listeners.lock().unwrap().push(Box::new(f));
    }

    pub fn fire(&self, event: Event) {
        for listener in self.listeners.lock().unwrap().iter() {
            listener(&event);
        }
    }
}

impl std::fmt::Debug for Element {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Element")
            .field("listeners", &self.listeners.lock().unwrap().len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[test]
    fn fire_delivers_to_all_listeners_in_order() {
        let element = Element::new();
        let order = Arc::new(Mutex::new(Vec::new()));

        let o1 = order.clone();
        element.listen(move |_| o1.lock().unwrap().push(1));
        let o2 = order.clone();
        element.listen(move |_| o2.lock().unwrap().push(2));

        element.fire(Event::State(State::Ready));

        assert_eq!(*order.lock().unwrap(), vec![1, 2]);
    }

    #[test]
    fn fire_with_no_listeners_is_a_no_op() {
        let element = Element::new();
        element.fire(Event::State(State::Null));
    }

    #[test]
    fn fire_delivers_every_call() {
        let element = Element::new();
        let count = Arc::new(AtomicUsize::new(0));
        let c = count.clone();
        element.listen(move |_| {
            c.fetch_add(1, Ordering::SeqCst);
        });

        element.fire(Event::State(State::Playing));
        element.fire(Event::State(State::Null));

        assert_eq!(count.load(Ordering::SeqCst), 2);
    }
}
