use std::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::{Rc, Weak};

use log::trace;

pub type Callback<T> = Rc<dyn Fn(&T)>;
pub type SubscriptionId = u64;

struct Listeners<T> {
    next_id: SubscriptionId,
    callbacks: BTreeMap<SubscriptionId, Callback<T>>,
}

/// Single-threaded broadcast channel. Listeners run synchronously on `emit`, in
/// subscription order.
pub struct Channel<T: std::fmt::Debug> {
    listeners: Rc<RefCell<Listeners<T>>>,
}

impl<T: std::fmt::Debug> Clone for Channel<T> {
    fn clone(&self) -> Self {
        Self {
            listeners: Rc::clone(&self.listeners),
        }
    }
}

pub struct EventEmitter<T: std::fmt::Debug> {
    channel: Channel<T>,
}

impl<T: std::fmt::Debug> Clone for EventEmitter<T> {
    fn clone(&self) -> Self {
        Self {
            channel: self.channel.clone(),
        }
    }
}

pub struct EventObserver<T: std::fmt::Debug> {
    channel: Channel<T>,
}

impl<T: std::fmt::Debug> Clone for EventObserver<T> {
    fn clone(&self) -> Self {
        Self {
            channel: self.channel.clone(),
        }
    }
}

/// Handle returned by `subscribe`; dropping it keeps the subscription alive, calling
/// `unsubscribe` removes it.
pub struct Unsubscriber<T> {
    listeners: Weak<RefCell<Listeners<T>>>,
    id: SubscriptionId,
}

impl<T> Unsubscriber<T> {
    pub fn id(&self) -> SubscriptionId {
        self.id
    }

    pub fn unsubscribe(self) -> bool {
        match self.listeners.upgrade() {
            Some(listeners) => listeners.borrow_mut().callbacks.remove(&self.id).is_some(),
            None => false,
        }
    }
}

impl<T> std::fmt::Debug for Unsubscriber<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Unsubscriber({})", self.id)
    }
}

impl<T: std::fmt::Debug> Channel<T> {
    pub fn new() -> (EventEmitter<T>, EventObserver<T>) {
        let channel = Channel {
            listeners: Rc::new(RefCell::new(Listeners {
                next_id: 0,
                callbacks: BTreeMap::new(),
            })),
        };
        (
            EventEmitter {
                channel: channel.clone(),
            },
            EventObserver { channel },
        )
    }

    fn subscribe<F>(&self, callback: F) -> Unsubscriber<T>
    where
        F: Fn(&T) + 'static,
    {
        let mut listeners = self.listeners.borrow_mut();
        let id = listeners.next_id;
        listeners.next_id += 1;
        listeners.callbacks.insert(id, Rc::new(callback));
        Unsubscriber {
            listeners: Rc::downgrade(&self.listeners),
            id,
        }
    }

    fn emit(&self, data: &T) {
        // listeners may subscribe or unsubscribe while being notified
        let callbacks: Vec<Callback<T>> =
            self.listeners.borrow().callbacks.values().cloned().collect();
        trace!(
            target: "events",
            "Emitting {} to {} listeners: {:?}",
            std::any::type_name::<T>(),
            callbacks.len(),
            data
        );
        for callback in callbacks {
            callback(data);
        }
    }

    fn listener_count(&self) -> usize {
        self.listeners.borrow().callbacks.len()
    }

    fn clear(&self) {
        self.listeners.borrow_mut().callbacks.clear();
    }
}

impl<T: std::fmt::Debug> EventEmitter<T> {
    pub fn emit(&self, data: T) {
        self.channel.emit(&data);
    }

    pub fn emit_ref(&self, data: &T) {
        self.channel.emit(data);
    }

    pub fn listener_count(&self) -> usize {
        self.channel.listener_count()
    }

    pub fn clear(&self) {
        self.channel.clear();
    }
}

impl<T: std::fmt::Debug> EventObserver<T> {
    pub fn subscribe<F>(&self, callback: F) -> Unsubscriber<T>
    where
        F: Fn(&T) + 'static,
    {
        self.channel.subscribe(callback)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::GameEngineCommand;
    use std::cell::Cell;

    #[test]
    fn test_commands_reach_every_listener() {
        let (emitter, observer) = Channel::<GameEngineCommand>::new();
        let taps = Rc::new(RefCell::new(Vec::new()));

        for _ in 0..2 {
            let taps = Rc::clone(&taps);
            observer.subscribe(move |command: &GameEngineCommand| {
                if let GameEngineCommand::Tap(index) = command {
                    taps.borrow_mut().push(*index);
                }
            });
        }

        emitter.emit(GameEngineCommand::Tap(3));
        emitter.emit(GameEngineCommand::Restart);
        assert_eq!(*taps.borrow(), vec![3, 3]);
    }

    #[test]
    fn test_clones_share_listeners() {
        let (emitter1, observer1) = Channel::<u32>::new();
        let emitter2 = emitter1.clone();
        let observer2 = observer1.clone();
        let counter = Rc::new(Cell::new(0));

        let counter_clone = counter.clone();
        observer1.subscribe(move |seconds: &u32| counter_clone.set(counter_clone.get() + seconds));
        emitter2.emit(1);
        assert_eq!(counter.get(), 1);

        let counter_clone = counter.clone();
        observer2.subscribe(move |seconds: &u32| counter_clone.set(counter_clone.get() + seconds));
        emitter1.emit(2);
        assert_eq!(counter.get(), 5);
    }

    #[test]
    fn test_unsubscribe() {
        let (emitter, observer) = Channel::<u32>::new();
        let counter = Rc::new(Cell::new(0));
        let counter_clone = counter.clone();

        let subscription = observer.subscribe(move |_| counter_clone.set(counter_clone.get() + 1));
        emitter.emit(1);
        assert_eq!(counter.get(), 1);

        assert!(subscription.unsubscribe());
        emitter.emit(1);
        assert_eq!(counter.get(), 1);
        assert_eq!(emitter.listener_count(), 0);
    }

    #[test]
    fn test_listener_may_unsubscribe_while_notified() {
        let (emitter, observer) = Channel::<u32>::new();
        let slot: Rc<RefCell<Option<Unsubscriber<u32>>>> = Rc::new(RefCell::new(None));
        let calls = Rc::new(Cell::new(0));

        let slot_clone = Rc::clone(&slot);
        let calls_clone = Rc::clone(&calls);
        let subscription = observer.subscribe(move |_| {
            calls_clone.set(calls_clone.get() + 1);
            if let Some(subscription) = slot_clone.borrow_mut().take() {
                subscription.unsubscribe();
            }
        });
        *slot.borrow_mut() = Some(subscription);

        emitter.emit(1);
        emitter.emit(1);
        assert_eq!(calls.get(), 1);
    }

    #[test]
    fn test_unsubscribe_after_channel_dropped() {
        let (emitter, observer) = Channel::<u32>::new();
        let subscription = observer.subscribe(|_| ());
        drop(emitter);
        drop(observer);
        assert!(!subscription.unsubscribe());
    }
}
