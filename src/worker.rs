//! Worker threads and one-shot promises.
//!
//! The recognition loop is frame-driven and must never block on inference. A pipeline that
//! wants its classifier off the frame thread sends the input to a [`Worker`] and keeps a
//! [`PromiseHandle`] it can poll once per frame; the handle *is* the busy-flag. See
//! [`crate::nn::ThreadedClassifier`] for the single-flight wrapper built on top.

use std::{
    io,
    panic::resume_unwind,
    thread::{self, JoinHandle},
};

use crossbeam::channel::{Sender, TryRecvError};

/// Creates a connected pair of [`Promise`] and [`PromiseHandle`].
pub fn promise<T>() -> (Promise<T>, PromiseHandle<T>) {
    // Capacity of 1 means that `Promise::fulfill` never blocks.
    let (sender, recv) = crossbeam::channel::bounded(1);
    (Promise { inner: sender }, PromiseHandle { recv })
}

/// An empty slot that can be filled with a `T`, fulfilling the promise.
pub struct Promise<T> {
    inner: Sender<T>,
}

impl<T> Promise<T> {
    /// Fulfills the promise with a value, consuming it.
    ///
    /// This method does not block or fail. If the connected [`PromiseHandle`] was dropped,
    /// `value` is dropped and nothing happens.
    pub fn fulfill(self, value: T) {
        self.inner.send(value).ok();
    }
}

/// A handle connected to a [`Promise`] that will eventually resolve to a value of type `T`.
pub struct PromiseHandle<T> {
    recv: crossbeam::channel::Receiver<T>,
}

impl<T> PromiseHandle<T> {
    /// Checks for the promised value without blocking.
    ///
    /// Returns [`None`] while the promise is outstanding. Once the promise has been fulfilled,
    /// or dropped unfulfilled (its thread exited), this resolves with `Ok`/`Err` respectively.
    /// A dropped promise is an answer too, so a poller never waits on it forever.
    pub fn poll(&mut self) -> Option<Result<T, PromiseDropped>> {
        match self.recv.try_recv() {
            Ok(value) => Some(Ok(value)),
            Err(TryRecvError::Empty) => None,
            Err(TryRecvError::Disconnected) => Some(Err(PromiseDropped { _priv: () })),
        }
    }

    /// Blocks the calling thread until the [`Promise`] is fulfilled.
    pub fn block(self) -> Result<T, PromiseDropped> {
        self.recv.recv().map_err(|_| PromiseDropped { _priv: () })
    }
}

/// Error returned when the connected [`Promise`] was dropped without being fulfilled.
#[derive(Debug, Clone, Copy)]
pub struct PromiseDropped {
    _priv: (),
}

/// A builder object that can be used to configure and spawn a [`Worker`].
#[derive(Clone)]
pub struct WorkerBuilder {
    name: Option<String>,
}

impl WorkerBuilder {
    /// Sets the name of the [`Worker`] thread.
    pub fn name<N: Into<String>>(self, name: N) -> Self {
        Self {
            name: Some(name.into()),
        }
    }

    /// Spawns a [`Worker`] thread that uses `handler` to process incoming messages.
    pub fn spawn<I, F>(self, mut handler: F) -> io::Result<Worker<I>>
    where
        I: Send + 'static,
        F: FnMut(I) + Send + 'static,
    {
        // Capacity 1: the single-flight discipline upstream guarantees at most one
        // outstanding message, so `send` never blocks on a busy worker.
        let (sender, recv) = crossbeam::channel::bounded(1);
        let mut builder = thread::Builder::new();
        if let Some(name) = &self.name {
            builder = builder.name(name.clone());
        }
        let handle = builder.spawn(move || {
            if let Some(name) = &self.name {
                log::trace!("worker '{name}' starting");
            }
            for message in recv {
                handler(message);
            }
            if let Some(name) = &self.name {
                log::trace!("worker '{name}' exiting");
            }
        })?;

        Ok(Worker {
            sender: Some(sender),
            handle: Some(handle),
        })
    }
}

/// A handle to a worker thread that processes messages of type `I`.
///
/// When dropped, the channel to the thread is closed and the thread joined. If the thread has
/// panicked, the panic is forwarded to the thread dropping the `Worker`.
pub struct Worker<I: Send + 'static> {
    sender: Option<Sender<I>>,
    handle: Option<JoinHandle<()>>,
}

impl<I: Send + 'static> Drop for Worker<I> {
    fn drop(&mut self) {
        // Close the channel to signal the thread to exit.
        drop(self.sender.take());
        self.wait_for_exit();
    }
}

impl Worker<()> {
    /// Returns a builder that can be used to configure and spawn a [`Worker`].
    #[inline]
    pub fn builder() -> WorkerBuilder {
        WorkerBuilder { name: None }
    }
}

impl<I: Send + 'static> Worker<I> {
    fn wait_for_exit(&mut self) {
        if let Some(handle) = self.handle.take() {
            match handle.join() {
                Ok(()) => {}
                Err(payload) => {
                    if !thread::panicking() {
                        resume_unwind(payload);
                    }
                }
            }
        }
    }

    /// Sends a message to the worker thread.
    ///
    /// If the worker has panicked, this joins it and propagates the panic to the calling
    /// thread.
    pub fn send(&mut self, msg: I) {
        match self.sender.as_ref().unwrap().send(msg) {
            Ok(()) => {}
            Err(_) => {
                self.wait_for_exit();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::panic::{catch_unwind, AssertUnwindSafe};

    use super::*;

    fn silent_panic(payload: String) {
        resume_unwind(Box::new(payload));
    }

    #[test]
    fn worker_fulfills_promise() {
        let mut worker = Worker::builder()
            .name("doubler")
            .spawn(|(n, promise): (i32, Promise<i32>)| promise.fulfill(n * 2))
            .unwrap();
        let (promise, handle) = promise();
        worker.send((21, promise));
        assert_eq!(handle.block().unwrap(), 42);
    }

    #[test]
    fn poll_resolves_after_fulfillment() {
        let (promise, mut handle) = promise::<u32>();
        assert!(handle.poll().is_none());
        promise.fulfill(7);
        assert_eq!(handle.poll().unwrap().unwrap(), 7);
    }

    #[test]
    fn dropped_promise_is_an_answer() {
        let (promise, mut handle) = promise::<u32>();
        drop(promise);
        assert!(handle.poll().unwrap().is_err());
    }

    #[test]
    fn worker_propagates_panic_on_drop() {
        let mut worker = Worker::builder()
            .spawn(|_: ()| silent_panic("worker panic".into()))
            .unwrap();
        worker.send(());
        catch_unwind(AssertUnwindSafe(|| drop(worker))).unwrap_err();
    }
}
