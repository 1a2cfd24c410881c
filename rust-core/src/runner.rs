//! Threaded session runtime.
//!
//! When the three sensor streams are produced on separate OS threads, their
//! events must still be applied one at a time in arrival order so that a
//! motion update sees the heading committed before it. The runner gives the
//! `Session` to a single consumer thread and feeds it through one
//! `std::sync::mpsc` channel shared by every producer.

use std::sync::mpsc::{self, Receiver, Sender};
use std::thread::{self, JoinHandle};

use tracing::debug;

use crate::error::{DrError, Result};
use crate::export::SessionSnapshot;
use crate::session::{SensorEvent, Session};
use crate::types::{GeoFix, MotionSample, OrientationSample};

enum Command {
    Event(SensorEvent),
    Start,
    Stop,
    Reset,
    Snapshot(Sender<SessionSnapshot>),
    Shutdown,
}

/// Cloneable producer handle for one or more sensor streams.
#[derive(Clone)]
pub struct EventSender {
    tx: Sender<Command>,
}

impl EventSender {
    /// Queue an event behind everything already sent.
    pub fn send(&self, event: SensorEvent) -> Result<()> {
        self.tx
            .send(Command::Event(event))
            .map_err(|_| DrError::SessionClosed)
    }

    pub fn orientation(&self, sample: OrientationSample) -> Result<()> {
        self.send(SensorEvent::Orientation(sample))
    }

    pub fn motion(&self, sample: MotionSample) -> Result<()> {
        self.send(SensorEvent::Motion(sample))
    }

    pub fn fix(&self, fix: GeoFix) -> Result<()> {
        self.send(SensorEvent::Fix(fix))
    }
}

/// Owns the consumer thread that applies queued commands to a session.
pub struct SessionRunner {
    tx: Sender<Command>,
    handle: Option<JoinHandle<Session>>,
}

impl SessionRunner {
    /// Move `session` onto a new consumer thread.
    pub fn spawn(session: Session) -> Self {
        let (tx, rx) = mpsc::channel::<Command>();
        let handle = thread::spawn(move || consumer_loop(session, rx));
        Self {
            tx,
            handle: Some(handle),
        }
    }

    /// A new producer handle.
    pub fn sender(&self) -> EventSender {
        EventSender {
            tx: self.tx.clone(),
        }
    }

    pub fn start(&self) -> Result<()> {
        self.command(Command::Start)
    }

    /// Events already queued are still applied before the stop takes effect.
    pub fn stop(&self) -> Result<()> {
        self.command(Command::Stop)
    }

    pub fn reset(&self) -> Result<()> {
        self.command(Command::Reset)
    }

    /// Snapshot taken after every command queued before this call.
    pub fn snapshot(&self) -> Result<SessionSnapshot> {
        let (reply_tx, reply_rx) = mpsc::channel();
        self.command(Command::Snapshot(reply_tx))?;
        reply_rx.recv().map_err(|_| DrError::SessionClosed)
    }

    /// Drain the queue, stop the consumer and hand the session back.
    pub fn shutdown(mut self) -> Result<Session> {
        self.command(Command::Shutdown)?;
        let handle = self.handle.take().ok_or(DrError::SessionClosed)?;
        handle.join().map_err(|_| DrError::SessionClosed)
    }

    fn command(&self, command: Command) -> Result<()> {
        self.tx.send(command).map_err(|_| DrError::SessionClosed)
    }
}

impl Drop for SessionRunner {
    fn drop(&mut self) {
        if let Some(handle) = self.handle.take() {
            let _ = self.tx.send(Command::Shutdown);
            let _ = handle.join();
        }
    }
}

fn consumer_loop(mut session: Session, rx: Receiver<Command>) -> Session {
    let mut processed: u64 = 0;
    while let Ok(command) = rx.recv() {
        match command {
            Command::Event(event) => {
                session.dispatch(&event);
                processed += 1;
            }
            Command::Start => session.start(),
            Command::Stop => session.stop(),
            Command::Reset => session.reset(),
            Command::Snapshot(reply) => {
                // Requester may have given up; nothing to do then
                let _ = reply.send(session.snapshot());
            }
            Command::Shutdown => break,
        }
    }
    debug!(events = processed, "session consumer exited");
    session
}
