//! Reentrant request/reply connection.
//!
//! A thread blocked in [`Connection::send_and_wait_for_reply`] keeps pumping
//! incoming frames while it waits. Requests from the peer are dispatched on
//! that same thread, so a host call can be answered by nested plug-in calls
//! (and those by nested host calls) without deadlocking. Replies are matched
//! by id; a reply that arrives for another waiting thread is parked for it.
//! Replies for calls nobody waits for any more are dropped.

use crate::codec;
use crate::config::IpcConfig;
use crate::error::{IpcError, Result};
use crate::protocol::Selector;
use crate::transport::{
    memory_pair_with_limit, Frame, FrameKind, FrameReceiver, FrameSender, SocketTransport, FRAME_OVERHEAD,
};
use parking_lot::{Condvar, Mutex, RwLock};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, warn};

/// How long a waiter sleeps before re-checking whether it can pump.
const WAITER_POLL: Duration = Duration::from_millis(5);

/// Routes incoming calls to local objects.
pub trait Dispatch: Send + Sync {
    /// Handle one call. The returned bytes are the reply payload; one-way
    /// calls discard them.
    fn dispatch(&self, selector: Selector, payload: &[u8]) -> Result<Vec<u8>>;
}

enum Outcome {
    Reply(Vec<u8>),
    Fault(String),
}

impl Outcome {
    fn into_result(self) -> Result<Vec<u8>> {
        match self {
            Outcome::Reply(payload) => Ok(payload),
            Outcome::Fault(message) => Err(IpcError::RemoteFault(message)),
        }
    }
}

#[derive(Default)]
struct Waiters {
    /// Ids of outgoing requests whose callers are still waiting.
    pending: HashSet<u64>,
    /// Outcomes received by a thread other than the waiting one.
    parked: HashMap<u64, Outcome>,
}

pub struct Connection {
    sender: Mutex<Box<dyn FrameSender>>,
    receiver: Mutex<Box<dyn FrameReceiver>>,
    dispatcher: RwLock<Option<Arc<dyn Dispatch>>>,
    next_id: AtomicU64,
    waiters: Mutex<Waiters>,
    waiters_changed: Condvar,
    closed: AtomicBool,
    max_frame_size: usize,
}

impl Connection {
    pub fn new(sender: impl FrameSender + 'static, receiver: impl FrameReceiver + 'static) -> Arc<Self> {
        let max_frame_size = sender.max_frame_size();
        Arc::new(Self {
            sender: Mutex::new(Box::new(sender)),
            receiver: Mutex::new(Box::new(receiver)),
            dispatcher: RwLock::new(None),
            next_id: AtomicU64::new(1),
            waiters: Mutex::new(Waiters::default()),
            waiters_changed: Condvar::new(),
            closed: AtomicBool::new(false),
            max_frame_size,
        })
    }

    /// Two connections wired to each other in this process.
    pub fn pair() -> (Arc<Self>, Arc<Self>) {
        Self::pair_with_frame_limit(IpcConfig::default().max_frame_size)
    }

    pub fn pair_with_frame_limit(max_frame_size: usize) -> (Arc<Self>, Arc<Self>) {
        let (a, b) = memory_pair_with_limit(max_frame_size);
        let (a_tx, a_rx) = a.split();
        let (b_tx, b_rx) = b.split();
        (Self::new(a_tx, a_rx), Self::new(b_tx, b_rx))
    }

    pub fn from_socket(transport: SocketTransport) -> Arc<Self> {
        let (sender, receiver) = transport.split();
        Self::new(sender, receiver)
    }

    pub fn set_dispatcher(&self, dispatcher: Arc<dyn Dispatch>) {
        *self.dispatcher.write() = Some(dispatcher);
    }

    pub fn clear_dispatcher(&self) {
        self.dispatcher.write().take();
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    /// Largest call argument or reply payload a single frame can carry.
    ///
    /// Callers moving bulk data split it into pieces of at most this size.
    pub fn max_payload_size(&self) -> usize {
        self.max_frame_size.saturating_sub(FRAME_OVERHEAD)
    }

    // ========================================================================
    // Outgoing calls
    // ========================================================================

    pub fn send_without_reply(&self, selector: Selector, payload: Vec<u8>) -> Result<()> {
        self.send_frame(&Frame::one_way(selector as u32, payload))
    }

    /// Send a request and block until its reply, serving peer calls meanwhile.
    pub fn send_and_wait_for_reply(&self, selector: Selector, payload: Vec<u8>) -> Result<Vec<u8>> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.waiters.lock().pending.insert(id);
        let result = self
            .send_frame(&Frame::request(id, selector as u32, payload))
            .and_then(|()| self.pump(Some(id)));
        {
            let mut waiters = self.waiters.lock();
            waiters.pending.remove(&id);
            waiters.parked.remove(&id);
        }
        match result {
            Ok(Some(reply)) => Ok(reply),
            Ok(None) => Err(IpcError::Disconnected),
            Err(e) => Err(e),
        }
    }

    /// Encode `args`, call and decode the reply.
    pub fn call<A, R>(&self, selector: Selector, args: &A) -> Result<R>
    where
        A: Serialize + ?Sized,
        R: DeserializeOwned,
    {
        debug!(%selector, "call");
        let reply = self.send_and_wait_for_reply(selector, codec::encode(args)?)?;
        codec::decode(&reply)
    }

    pub fn notify<A>(&self, selector: Selector, args: &A) -> Result<()>
    where
        A: Serialize + ?Sized,
    {
        debug!(%selector, "notify");
        self.send_without_reply(selector, codec::encode(args)?)
    }

    // ========================================================================
    // Serving
    // ========================================================================

    /// Dispatch incoming calls until the peer says goodbye.
    ///
    /// Returns `Err` if the session ended any other way.
    pub fn serve(&self) -> Result<()> {
        self.pump(None).map(|_| ())
    }

    /// End the session: tell the peer and drop the dispatcher.
    pub fn close(&self) {
        if self.closed.swap(true, Ordering::AcqRel) {
            return;
        }
        if let Err(e) = self.sender.lock().send(&Frame::goodbye()) {
            debug!(error = %e, "goodbye not delivered");
        }
        self.clear_dispatcher();
        self.wake_waiters();
    }

    fn send_frame(&self, frame: &Frame) -> Result<()> {
        if self.is_closed() {
            return Err(IpcError::Disconnected);
        }
        self.sender.lock().send(frame)
    }

    fn wake_waiters(&self) {
        let _waiters = self.waiters.lock();
        self.waiters_changed.notify_all();
    }

    fn park(&self, id: u64, outcome: Outcome) {
        let mut waiters = self.waiters.lock();
        if !waiters.pending.contains(&id) {
            debug!(id, "dropping reply to a call nobody waits for");
            return;
        }
        waiters.parked.insert(id, outcome);
        self.waiters_changed.notify_all();
    }

    /// Terminal failure: mark closed so other waiters stop, and tell the peer.
    fn fail(&self, err: IpcError) -> IpcError {
        error!(error = %err, "session terminated");
        self.close();
        err
    }

    /// Receive the next frame, or the parked outcome of `waiting_for`.
    fn next_frame(&self, waiting_for: Option<u64>) -> Result<std::result::Result<Frame, Outcome>> {
        let mut waiters = self.waiters.lock();
        loop {
            if let Some(outcome) = waiting_for.and_then(|id| waiters.parked.remove(&id)) {
                return Ok(Err(outcome));
            }
            if self.is_closed() {
                return Err(IpcError::Disconnected);
            }
            if let Some(mut receiver) = self.receiver.try_lock() {
                drop(waiters);
                let frame = receiver.recv();
                drop(receiver);
                self.wake_waiters();
                return frame.map(Ok);
            }
            self.waiters_changed.wait_for(&mut waiters, WAITER_POLL);
        }
    }

    /// Pump frames until `waiting_for` is answered, or until goodbye when serving.
    fn pump(&self, waiting_for: Option<u64>) -> Result<Option<Vec<u8>>> {
        loop {
            let frame = match self.next_frame(waiting_for) {
                Ok(Ok(frame)) => frame,
                Ok(Err(outcome)) => return outcome.into_result().map(Some),
                Err(IpcError::Disconnected) if self.is_closed() => return Err(IpcError::Disconnected),
                Err(e) => return Err(self.fail(e)),
            };

            match frame.kind {
                FrameKind::Reply { id } if Some(id) == waiting_for => return Ok(Some(frame.payload)),
                FrameKind::Fault { id, message } if Some(id) == waiting_for => {
                    return Err(IpcError::RemoteFault(message))
                }
                FrameKind::Reply { id } => self.park(id, Outcome::Reply(frame.payload)),
                FrameKind::Fault { id, message } => self.park(id, Outcome::Fault(message)),
                FrameKind::Request { id, selector } => self.handle_request(id, selector, &frame.payload)?,
                FrameKind::OneWay { selector } => self.handle_one_way(selector, &frame.payload)?,
                FrameKind::Goodbye => {
                    debug!("peer closed the session");
                    self.closed.store(true, Ordering::Release);
                    self.clear_dispatcher();
                    self.wake_waiters();
                    return match waiting_for {
                        None => Ok(None),
                        Some(_) => Err(IpcError::Disconnected),
                    };
                }
            }
        }
    }

    fn route(&self, raw: u32, payload: &[u8]) -> Result<Vec<u8>> {
        let selector = Selector::from_raw(raw).ok_or(IpcError::UnknownSelector(raw))?;
        // Cloned out so the lock is not held while the handler runs.
        let dispatcher = self
            .dispatcher
            .read()
            .clone()
            .ok_or_else(|| IpcError::InvalidState(format!("no dispatcher for {selector}")))?;
        dispatcher.dispatch(selector, payload)
    }

    fn handle_request(&self, id: u64, raw: u32, payload: &[u8]) -> Result<()> {
        let reply = match self.route(raw, payload) {
            Ok(reply) => Frame::reply(id, reply),
            Err(e) if e.is_fatal() => {
                let _ = self.send_frame(&Frame::fault(id, e.to_string()));
                return Err(self.fail(e));
            }
            Err(e) => {
                error!(selector = raw, error = %e, "request rejected");
                Frame::fault(id, e.to_string())
            }
        };
        match self.send_frame(&reply) {
            // Nothing was written; the caller gets a fault and the session goes on.
            Err(IpcError::FrameTooLarge { size, limit }) => {
                error!(selector = raw, size, limit, "reply exceeds the frame size limit");
                let fault = Frame::fault(id, format!("reply of {size} bytes exceeds limit of {limit} bytes"));
                self.send_frame(&fault).map_err(|e| self.fail(e))
            }
            sent => sent.map_err(|e| self.fail(e)),
        }
    }

    #[cfg(test)]
    fn waiter_counts(&self) -> (usize, usize) {
        let waiters = self.waiters.lock();
        (waiters.pending.len(), waiters.parked.len())
    }

    fn handle_one_way(&self, raw: u32, payload: &[u8]) -> Result<()> {
        match self.route(raw, payload) {
            Ok(_) => Ok(()),
            Err(e) if e.is_fatal() => Err(self.fail(e)),
            Err(e) => {
                warn!(selector = raw, error = %e, "one-way call rejected");
                Ok(())
            }
        }
    }
}

impl Drop for Connection {
    fn drop(&mut self) {
        if !self.closed.load(Ordering::Acquire) {
            let _ = self.sender.get_mut().send(&Frame::goodbye());
        }
    }
}
