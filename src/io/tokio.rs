// Copyright 2023 Matthew Ingwersen.
//
// Licensed under the Apache License, Version 2.0 (the "License"); you
// may not use this file except in compliance with the License. You may
// obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or
// implied. See the License for the specific language governing
// permissions and limitations under the License.

//! Implementation of the Tokio I/O provider.

// NOTE: In this provider, I/O error handling is generally to exit the
// task. The run_with_respawning function acts as a supervisor that will
// respawn the UDP receiver and the workers, possibly after a delay, if
// they exit with an error or a panic.

use std::future::Future;
use std::io;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use log::{debug, error, warn};
use tokio::net::UdpSocket;
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{broadcast, mpsc, Mutex};

use super::{Upstream, MAX_UDP_MESSAGE_SIZE};
use crate::server::{Response, Server};

/// A Tokio I/O provider.
///
/// This provider uses asynchronous I/O and runs the server by spawning
/// tasks on a Tokio runtime. A single receiver task reads datagrams
/// from the listening socket into a bounded queue, and a fixed pool of
/// worker tasks takes datagrams from the queue, hands them to the
/// [`Server`], and then either sends the local answer or forwards the
/// datagram to the [`Upstream`] and relays its reply.
///
/// The `TokioIoProvider` supports graceful shutdown. To initiate a
/// graceful shutdown, use the [`TokioShutdownController`] returned by
/// [`TokioIoProvider::start`].
pub struct TokioIoProvider {
    socket: Arc<UdpSocket>,
    config: TokioIoConfig,
}

/// Configuration for a [`TokioIoProvider`].
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct TokioIoConfig {
    /// The number of worker tasks.
    pub workers: usize,

    /// How many received datagrams may wait for a worker. Datagrams
    /// received while the queue is full are dropped.
    pub queue_capacity: usize,
}

impl Default for TokioIoConfig {
    fn default() -> Self {
        Self {
            workers: 16,
            queue_capacity: 1024,
        }
    }
}

impl TokioIoProvider {
    /// Creates a new `TokioIoProvider`. This call binds the UDP socket
    /// in preparation, but does not start the server. This function
    /// requires that the Tokio runtime be active.
    ///
    /// Zero values in `config` are treated as one.
    pub async fn bind(addr: SocketAddr, config: TokioIoConfig) -> io::Result<Self> {
        let socket = UdpSocket::bind(addr).await?;
        let config = TokioIoConfig {
            workers: config.workers.max(1),
            queue_capacity: config.queue_capacity.max(1),
        };
        Ok(Self {
            socket: Arc::new(socket),
            config,
        })
    }

    /// Returns the address the listening socket is bound to.
    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.socket.local_addr()
    }

    /// Starts the server on the active Tokio runtime.
    ///
    /// This spawns tasks on the active Tokio runtime and then returns
    /// a [`TokioShutdownController`] that can be used to shut down the
    /// tasks at a later time. (The [`TokioShutdownController`] must be
    /// held as long as the server should be running, since dropping it
    /// will trigger shutdown.)
    pub fn start(self, server: &Arc<Server>, upstream: &Arc<Upstream>) -> TokioShutdownController {
        let (shutdown_controller, shutdown_handle) = make_shutdown_channels();
        let (queue_sender, queue_receiver) = mpsc::channel(self.config.queue_capacity);

        // Start the workers.
        let worker = Worker {
            server: server.clone(),
            upstream: upstream.clone(),
            socket: self.socket.clone(),
            queue: Arc::new(Mutex::new(queue_receiver)),
        };
        for _ in 0..self.config.workers {
            tokio::spawn(run_with_respawning(
                run_worker,
                shutdown_handle.clone(),
                worker.clone(),
            ));
        }

        // Start the receiver.
        let receiver = Receiver {
            socket: self.socket,
            queue: queue_sender,
        };
        tokio::spawn(run_with_respawning(
            run_udp_receiver,
            shutdown_handle,
            receiver,
        ));

        shutdown_controller
    }
}

/// How long to wait between respawns of a task. This is to prevent
/// tasks that crash immediately from using up significant CPU time.
const TASK_RESPAWN_DELAY: Duration = Duration::from_secs(1);

/// Runs a Tokio task, respawning it if it returns an I/O error, is
/// cancelled, or panics.
async fn run_with_respawning<F, G, S>(f: F, mut shutdown: ShutdownHandle, state: S)
where
    F: Fn(ShutdownHandle, S) -> G,
    G: Future<Output = io::Result<()>> + Send + 'static,
    S: Clone,
{
    loop {
        let last_spawn_time = Instant::now();
        match tokio::spawn(f(shutdown.clone(), state.clone())).await {
            Ok(Ok(())) => return,
            Ok(Err(e)) => log_io_error(e),
            Err(_) => (), // The task panicked or was cancelled.
        }

        // If necessary, wait before respawning, but receive shutdown
        // requests immediately.
        let since_last_spawn = Instant::now().duration_since(last_spawn_time);
        if let Some(duration_to_wait) = TASK_RESPAWN_DELAY.checked_sub(since_last_spawn) {
            tokio::select! {
                _ = shutdown.request_receiver.recv() => return,
                _ = tokio::time::sleep(duration_to_wait) => (),
            }
        }
    }
}

////////////////////////////////////////////////////////////////////////
// RECEIVER AND WORKERS                                               //
////////////////////////////////////////////////////////////////////////

/// A datagram waiting in the inbound queue.
#[derive(Debug)]
struct Datagram {
    octets: Vec<u8>,
    source: SocketAddr,
}

/// The state of the receiver task.
#[derive(Clone)]
struct Receiver {
    socket: Arc<UdpSocket>,
    queue: mpsc::Sender<Datagram>,
}

/// The state shared by the worker tasks.
#[derive(Clone)]
struct Worker {
    server: Arc<Server>,
    upstream: Arc<Upstream>,
    socket: Arc<UdpSocket>,
    queue: Arc<Mutex<mpsc::Receiver<Datagram>>>,
}

/// The UDP receiver loop.
async fn run_udp_receiver(mut shutdown: ShutdownHandle, receiver: Receiver) -> io::Result<()> {
    loop {
        let mut octets = vec![0; MAX_UDP_MESSAGE_SIZE];

        // Receive a datagram (or a shutdown request).
        let (len, source) = tokio::select! {
            _ = shutdown.request_receiver.recv() => return Ok(()),
            res = receiver.socket.recv_from(&mut octets) => res?,
        };
        octets.truncate(len);

        match receiver.queue.try_send(Datagram { octets, source }) {
            Ok(()) => (),
            Err(TrySendError::Full(datagram)) => {
                debug!("inbound queue full, dropping datagram from {}", datagram.source);
            }
            Err(TrySendError::Closed(_)) => return Ok(()),
        }
    }
}

/// The worker loop.
async fn run_worker(mut shutdown: ShutdownHandle, worker: Worker) -> io::Result<()> {
    loop {
        let datagram = {
            let mut queue = worker.queue.lock().await;
            tokio::select! {
                _ = shutdown.request_receiver.recv() => return Ok(()),
                datagram = queue.recv() => match datagram {
                    Some(datagram) => datagram,
                    None => return Ok(()),
                },
            }
        };
        handle_datagram(&worker, datagram).await;
    }
}

/// Processes one datagram and sends the reply, if any.
async fn handle_datagram(worker: &Worker, datagram: Datagram) {
    let Datagram { octets, source } = datagram;
    let reply = match worker.server.handle_message(&octets, source) {
        Response::Answer(answer) => answer,
        Response::Forward => match worker.upstream.forward(&octets).await {
            Ok(reply) => reply,
            Err(e) => {
                warn!("failed to forward query from {source} to {}: {e}", worker.upstream.addr());
                return;
            }
        },
        Response::None => return,
    };
    if let Err(e) = worker.socket.send_to(&reply, source).await {
        log_io_error(e);
    }
}

////////////////////////////////////////////////////////////////////////
// GRACEFUL SHUTDOWN                                                  //
////////////////////////////////////////////////////////////////////////

/// Controls the shutdown of a server's Tokio tasks.
///
/// This type is used to shut down the Tokio tasks spawned by
/// [`TokioIoProvider::start`]. Use
/// [`TokioShutdownController::shut_down`] or its blocking variant,
/// [`TokioShutdownController::blocking_shut_down`], to initiate
/// shutdown and wait for its completion. Dropping the controller will
/// also trigger shutdown (but will not wait for it to complete).
///
/// A worker that is in the middle of a forward finishes it (within the
/// upstream timeout) before it exits.
#[must_use]
pub struct TokioShutdownController {
    request_sender: broadcast::Sender<()>,
    wait_receiver: mpsc::Receiver<()>,
}

impl TokioShutdownController {
    /// Requests that running server tasks shut down, and then waits for
    /// them to terminate.
    pub async fn shut_down(mut self) {
        drop(self.request_sender);
        let _ = self.wait_receiver.recv().await;
    }

    /// The blocking variant of [`TokioShutdownController::shut_down`].
    pub fn blocking_shut_down(mut self) {
        drop(self.request_sender);
        let _ = self.wait_receiver.blocking_recv();
    }
}

/// A handle held by tasks to interact with the graceful shutdown
/// mechanism.
///
/// This type has two roles:
///
/// 1. It enables tasks to listen for graceful shutdown signals. This
///    is done by waiting for all senders attached to `request_receiver`
///    to close.
/// 2. It prevents graceful shutdown from completing until it is
///    dropped. This is done by holding `wait_sender`. All server tasks
///    therefore own a `ShutdownHandle`.
struct ShutdownHandle {
    request_receiver: broadcast::Receiver<()>,
    wait_sender: mpsc::Sender<()>,
}

impl Clone for ShutdownHandle {
    fn clone(&self) -> Self {
        // A resubscribed receiver misses values already queued, but no
        // values are ever sent: the signal is all senders being dropped.
        ShutdownHandle {
            request_receiver: self.request_receiver.resubscribe(),
            wait_sender: self.wait_sender.clone(),
        }
    }
}

/// Produces a [`TokioShutdownController`] and an initial
/// [`ShutdownHandle`] connected to it.
fn make_shutdown_channels() -> (TokioShutdownController, ShutdownHandle) {
    let (request_sender, request_receiver) = broadcast::channel(1);
    let (wait_sender, wait_receiver) = mpsc::channel(1);
    let controller = TokioShutdownController {
        request_sender,
        wait_receiver,
    };
    let handle = ShutdownHandle {
        request_receiver,
        wait_sender,
    };
    (controller, handle)
}

/// Logs an I/O error.
fn log_io_error(e: io::Error) {
    error!("I/O error: {e}");
}

////////////////////////////////////////////////////////////////////////
// TESTS                                                              //
////////////////////////////////////////////////////////////////////////
