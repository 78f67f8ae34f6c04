//! Session (C7): owns every per-connection resource and dispatches wire
//! events either synchronously or by queuing a task.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, RwLock};
use std::time::Instant;

use specview_frame::Frame;
use specview_region::RegionHandler;
use specview_wire::MessageBody;

use crate::animation::AnimationState;
use crate::cursor::CursorDebouncer;
use crate::error::{Error, Result};
use crate::runtime::{CancelFlags, SessionRefcount};

/// Outbound queue the socket loop drains. The defer hook corking
/// behavior (coalescing multiple pushes into one write) lives in the
/// socket loop itself (`specview-server`); this queue only orders the
/// messages.
#[derive(Default)]
pub struct OutboundQueue {
    inner: Mutex<Vec<MessageBody>>,
}

impl OutboundQueue {
    pub fn push(&self, message: MessageBody) {
        self.inner.lock().expect("outbound queue lock poisoned").push(message);
    }

    /// Drains everything queued so far. Messages under
    /// [`specview_wire::COMPRESSION_SKIP_THRESHOLD`] bytes (checked by
    /// the caller after encoding) skip permessage-deflate.
    pub fn drain(&self) -> Vec<MessageBody> {
        std::mem::take(&mut self.inner.lock().expect("outbound queue lock poisoned"))
    }

    pub fn len(&self) -> usize {
        self.inner.lock().expect("outbound queue lock poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

pub struct Session {
    pub session_id: u32,
    pub read_only: bool,
    pub frames: RwLock<HashMap<i32, Arc<Frame>>>,
    pub regions: Mutex<RegionHandler>,
    pub animations: Mutex<HashMap<i32, AnimationState>>,
    pub cursor: CursorDebouncer,
    pub cancel: Arc<CancelFlags>,
    pub refcount: Arc<SessionRefcount>,
    pub outbound: OutboundQueue,
    last_message_at: Mutex<Instant>,
}

impl Session {
    pub fn new(session_id: u32, read_only: bool) -> Self {
        Self {
            session_id,
            read_only,
            frames: RwLock::new(HashMap::new()),
            regions: Mutex::new(RegionHandler::new(read_only)),
            animations: Mutex::new(HashMap::new()),
            cursor: CursorDebouncer::new(),
            cancel: CancelFlags::new(),
            refcount: SessionRefcount::new(),
            outbound: OutboundQueue::default(),
            last_message_at: Mutex::new(Instant::now()),
        }
    }

    pub fn touch(&self) {
        *self.last_message_at.lock().expect("last-message lock poisoned") = Instant::now();
    }

    pub fn idle_for(&self, now: Instant) -> std::time::Duration {
        now.duration_since(*self.last_message_at.lock().expect("last-message lock poisoned"))
    }

    pub fn insert_frame(&self, file_id: i32, frame: Frame) {
        self.frames
            .write()
            .expect("frames lock poisoned")
            .insert(file_id, Arc::new(frame));
    }

    pub fn frame(&self, file_id: i32) -> Result<Arc<Frame>> {
        self.frames
            .read()
            .expect("frames lock poisoned")
            .get(&file_id)
            .cloned()
            .ok_or(Error::UnknownFile(file_id))
    }

    pub fn close_frame(&self, file_id: i32) {
        self.frames.write().expect("frames lock poisoned").remove(&file_id);
        self.animations.lock().expect("animations lock poisoned").remove(&file_id);
    }

    /// Rejects write operations (`SAVE_FILE`, `EXPORT_REGION`) while in
    /// read-only mode.
    pub fn check_writable(&self) -> Result<()> {
        if self.read_only {
            return Err(Error::ReadOnly);
        }
        Ok(())
    }

    pub fn emit_error(&self, error: &Error) {
        tracing::warn!(session = self.session_id, error = %error, "session error surfaced to client");
        self.outbound.push(MessageBody::ErrorData(error.to_wire()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_file_is_reported_not_panicked() {
        let session = Session::new(1, false);
        let err = session.frame(42).unwrap_err();
        assert!(matches!(err, Error::UnknownFile(42)));
    }

    #[test]
    fn read_only_session_rejects_writes() {
        let session = Session::new(1, true);
        assert!(matches!(session.check_writable(), Err(Error::ReadOnly)));
    }

    #[test]
    fn outbound_queue_drains_in_push_order() {
        let session = Session::new(1, false);
        session.outbound.push(MessageBody::Ping);
        session.outbound.push(MessageBody::Pong);
        let drained = session.outbound.drain();
        assert_eq!(drained, vec![MessageBody::Ping, MessageBody::Pong]);
        assert!(session.outbound.is_empty());
    }
}
