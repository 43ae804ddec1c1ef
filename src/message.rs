use std::any::Any;
use std::collections::VecDeque;
use std::fmt;

/// # Message ID
///
/// Application defined identifier for the kind of a [Message].
#[derive(Copy, Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct MessageId(pub u32);

/// # Message
///
/// Event carried by the [MessageBus]. The payload type is defined by whoever posts the message.
pub struct Message {
    id: MessageId,
    payload: Box<dyn Any>,
}

impl Message {
    /// Returns a message with the given ID and payload.
    pub fn new<T: Any>(id: MessageId, payload: T) -> Self {
        Self {
            id,
            payload: Box::new(payload),
        }
    }

    /// Returns the ID of the message.
    pub fn id(&self) -> MessageId {
        self.id
    }

    /// Returns the payload if it is of type `T`.
    pub fn data<T: Any>(&self) -> Option<&T> {
        self.payload.downcast_ref::<T>()
    }
}

impl fmt::Debug for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Message").field("id", &self.id).finish_non_exhaustive()
    }
}

/// # Message Bus
///
/// First-in first-out queue of messages. Messages posted since the previous drain are delivered
/// together by the next drain.
#[derive(Debug, Default)]
pub struct MessageBus {
    queue: VecDeque<Message>,
}

impl MessageBus {
    /// Returns an empty bus.
    pub fn new() -> Self {
        Self::default()
    }

    /// Posts a message with the given ID and payload.
    pub fn post<T: Any>(&mut self, id: MessageId, payload: T) {
        self.queue.push_back(Message::new(id, payload));
    }

    /// Removes and returns every pending message in posting order.
    pub fn drain(&mut self) -> impl Iterator<Item = Message> + '_ {
        self.queue.drain(..)
    }

    /// Returns the number of pending messages.
    pub fn len(&self) -> usize {
        self.queue.len()
    }

    /// Returns true if there are no pending messages.
    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }
}
