use crossbeam_channel::{bounded, Receiver, Sender, TrySendError};

/// Holds at most one error, first writer wins.
///
/// Every operation is non-blocking. While an error is held, later sends are
/// dropped; once it has been received the slot accepts a new one.
pub struct ErrorSlot<E = anyhow::Error> {
    tx: Sender<E>,
    rx: Receiver<E>,
}

impl<E> ErrorSlot<E> {
    pub fn new() -> Self {
        let (tx, rx) = bounded(1);
        Self { tx, rx }
    }

    /// Stores `err` unless the slot is already occupied.
    pub fn send(&self, err: E) {
        if let Err(TrySendError::Full(_)) = self.tx.try_send(err) {
            log::trace!("error slot occupied, dropping error");
        }
    }

    /// Stores `err` like [`send`](Self::send), then always runs `cancel`.
    pub fn send_and_cancel<F: FnOnce()>(&self, err: E, cancel: F) {
        self.send(err);
        cancel();
    }

    /// Takes the held error, leaving the slot empty.
    pub fn receive(&self) -> Option<E> {
        self.rx.try_recv().ok()
    }

    /// [`receive`](Self::receive) as a `Result`, so a batch outcome can be `?`-ed.
    pub fn check(&self) -> Result<(), E> {
        match self.receive() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

impl<E> Default for ErrorSlot<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E> std::fmt::Debug for ErrorSlot<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ErrorSlot")
            .field("occupied", &!self.rx.is_empty())
            .finish()
    }
}
