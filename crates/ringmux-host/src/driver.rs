use std::{
    sync::{
        atomic::{AtomicU32, Ordering},
        Arc,
    },
    thread::{self, JoinHandle},
};

use crossbeam_channel::{bounded, unbounded, Sender};
use ringmux_core::{
    config::Config,
    error::{ErrorKind, Result},
    registers::NotificationRegisters,
};
use ringmux_protocol::ring::ComArea;
use ringmux_stream::{OwnerId, Request};
use tracing::{debug, error};

use crate::{client::Client, device::Device, event_loop::EventLoop, interrupt::Interrupts};

/// A running worker thread and the means to reach it.
///
/// The worker keeps running while any [`Client`] or the driver itself can still submit
/// requests. Dropping the driver detaches the worker; it stops once the last client is gone.
#[derive(Debug)]
pub struct Driver {
    requests: Sender<Request>,
    worker: JoinHandle<Device>,
    next_owner: AtomicU32,
}

impl Driver {
    /// Claims the host side of `area` and starts the worker.
    pub fn start<R>(config: Config, area: &Arc<ComArea>, registers: R, interrupts: Interrupts) -> Result<Driver>
    where
        R: NotificationRegisters + 'static,
    {
        let (requests, receiver) = match config.request_queue_size {
            Some(size) => bounded(size),
            None => unbounded(),
        };
        let name = config.worker_name.clone();
        let device = Device::new(config, area)?;
        let event_loop = EventLoop::new(device, registers, receiver, interrupts);

        let worker = thread::Builder::new().name(name.clone()).spawn(move || event_loop.run())?;
        debug!(worker = %name, "started worker");

        Ok(Driver { requests, worker, next_owner: AtomicU32::new(1) })
    }

    /// Returns a client with a fresh owner identity.
    pub fn client(&self) -> Client {
        let owner = OwnerId(self.next_owner.fetch_add(1, Ordering::Relaxed));
        Client::new(owner, self.requests.clone())
    }

    /// Returns true while the worker thread is alive.
    pub fn is_running(&self) -> bool {
        !self.worker.is_finished()
    }

    /// Stops accepting requests from the driver and waits for the worker to exit.
    ///
    /// Blocks until every client has been dropped as well. Returns the final device state.
    pub fn shutdown(self) -> Result<Device> {
        let Driver { requests, worker, .. } = self;
        drop(requests);
        worker.join().map_err(|_| {
            error!("worker thread panicked");
            ErrorKind::WorkerPanicked
        })
    }
}
