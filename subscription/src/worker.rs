//! Background thread delivering publish results
//!
//! Transports that receive publish responses on a network thread can hand
//! them to a [`PublishWorker`] instead of calling the subscription callback
//! inline. The worker invokes the callback on its own thread, one result at
//! a time, in the order they were sent.

use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use crossbeam::channel::{self, Receiver, Sender};
use ua_types::PublishResult;

use crate::error::TransportError;
use crate::transport::PublishCallback;

/// Commands sent to the worker thread
#[derive(Debug)]
pub enum Command {
    /// Hand a publish result to the callback
    Deliver(PublishResult),
    /// Stop after the commands already queued
    Shutdown,
}

/// Cloneable handle for queueing publish results
#[derive(Debug, Clone)]
pub struct PublishSender {
    tx: Sender<Command>,
}

impl PublishSender {
    /// Queue a result for delivery
    ///
    /// # Returns
    /// * `Err(TransportError::ChannelClosed)` - If the worker has stopped
    pub fn send(&self, result: PublishResult) -> Result<(), TransportError> {
        self.tx
            .send(Command::Deliver(result))
            .map_err(|_| TransportError::ChannelClosed)
    }
}

/// Handle to a running publish delivery thread
///
/// Dropping the handle shuts the worker down and waits for it.
pub struct PublishWorker {
    tx: Sender<Command>,
    delivered: Arc<AtomicU64>,
    handle: Option<JoinHandle<()>>,
}

impl PublishWorker {
    pub fn sender(&self) -> PublishSender {
        PublishSender {
            tx: self.tx.clone(),
        }
    }

    /// Number of results handed to the callback so far
    pub fn delivered(&self) -> u64 {
        self.delivered.load(Ordering::Relaxed)
    }

    /// Deliver everything already queued, then stop the thread
    pub fn shutdown(mut self) {
        self.stop();
    }

    fn stop(&mut self) {
        let Some(handle) = self.handle.take() else {
            return;
        };

        // Fails only if the thread already exited.
        let _ = self.tx.send(Command::Shutdown);

        if handle.join().is_err() {
            tracing::error!("Publish worker thread panicked");
        }
    }
}

impl Drop for PublishWorker {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Spawns the publish delivery thread
pub fn spawn_publish_worker(callback: PublishCallback) -> std::io::Result<PublishWorker> {
    let (tx, rx) = channel::unbounded();
    let delivered = Arc::new(AtomicU64::new(0));

    let counter = Arc::clone(&delivered);
    let handle = thread::Builder::new()
        .name("opcua-publish".to_string())
        .spawn(move || run_delivery_loop(callback, rx, counter))?;

    Ok(PublishWorker {
        tx,
        delivered,
        handle: Some(handle),
    })
}

fn run_delivery_loop(callback: PublishCallback, rx: Receiver<Command>, delivered: Arc<AtomicU64>) {
    tracing::debug!("Publish worker started");

    for command in rx.iter() {
        match command {
            Command::Deliver(result) => {
                let sequence_number = result.notification_message.sequence_number;
                if panic::catch_unwind(AssertUnwindSafe(|| callback(result))).is_err() {
                    tracing::error!(
                        "Publish callback panicked while handling sequence number {}",
                        sequence_number
                    );
                }
                delivered.fetch_add(1, Ordering::Relaxed);
            }
            Command::Shutdown => {
                tracing::debug!("Publish worker received shutdown command");
                break;
            }
        }
    }

    tracing::debug!("Publish worker shut down");
}
