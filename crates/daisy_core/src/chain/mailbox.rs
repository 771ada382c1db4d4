use super::message::ChainMessage;

/// Double-buffered inbox owned by one participant and written only by its
/// left neighbor.
///
/// The writer fills the producer slot and raises the flip flag. The owner swaps
/// the slots at the start of its own tick, before reading, so it always sees a
/// message that was completely written either this tick or the previous one.
#[derive(Debug, Clone, Default)]
pub struct Mailbox {
    slots: [ChainMessage; 2],
    consumer: usize,
    flip_requested: bool,
}

impl Mailbox {
    pub fn new() -> Self {
        Self::default()
    }

    /// Slot the left neighbor writes into.
    pub fn producer_mut(&mut self) -> &mut ChainMessage {
        &mut self.slots[1 - self.consumer]
    }

    /// Last committed message, as seen by the owner.
    pub fn consumer(&self) -> &ChainMessage {
        &self.slots[self.consumer]
    }

    /// Write a whole message and ask the owner to swap it in.
    pub fn publish(&mut self, message: &ChainMessage) {
        *self.producer_mut() = *message;
        self.request_flip();
    }

    pub fn request_flip(&mut self) {
        self.flip_requested = true;
    }

    pub fn flip_requested(&self) -> bool {
        self.flip_requested
    }

    /// Swap producer and consumer if a flip is pending. Returns whether it did.
    pub fn flip_if_requested(&mut self) -> bool {
        if self.flip_requested {
            self.consumer = 1 - self.consumer;
            self.flip_requested = false;
            true
        } else {
            false
        }
    }
}
