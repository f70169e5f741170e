//! Event sources that can be hooked to an [`InputHandler`].

use std::io::{self, BufRead};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use parking_lot::Mutex;

use super::handler::{InputEvent, InputHandler};

/// External producer of input events.
///
/// The engine hooks a source when a run starts and unhooks it when the run
/// leaves `Running`. Events arriving while unhooked are dropped.
pub trait InputSource: Send {
    fn hook(&mut self, handler: InputHandler) -> io::Result<()>;
    fn unhook(&mut self);
}

const POLL_INTERVAL: Duration = Duration::from_millis(20);

/// Input source fed through a channel, dispatched on its own thread.
///
/// Re-hooking waits for the previous dispatch thread to exit, so at most one
/// thread drains the channel at a time.
pub struct ChannelInputSource {
    receiver: Arc<Mutex<Receiver<InputEvent>>>,
    hooked: Arc<AtomicBool>,
    worker: Option<JoinHandle<()>>,
}

impl ChannelInputSource {
    /// Create the source and the sender used to feed it.
    pub fn new() -> (Self, Sender<InputEvent>) {
        let (sender, receiver) = mpsc::channel();
        (
            Self {
                receiver: Arc::new(Mutex::new(receiver)),
                hooked: Arc::new(AtomicBool::new(false)),
                worker: None,
            },
            sender,
        )
    }
}

impl InputSource for ChannelInputSource {
    fn hook(&mut self, handler: InputHandler) -> io::Result<()> {
        if self.hooked.load(Ordering::SeqCst) {
            return Ok(());
        }
        // An unhooked thread exits within one poll interval.
        if let Some(previous) = self.worker.take() {
            let _ = previous.join();
        }
        self.hooked.store(true, Ordering::SeqCst);
        let receiver = Arc::clone(&self.receiver);
        let hooked = Arc::clone(&self.hooked);
        let worker = thread::Builder::new()
            .name("input-dispatch".to_string())
            .spawn(move || {
                let receiver = receiver.lock();
                while hooked.load(Ordering::SeqCst) {
                    match receiver.recv_timeout(POLL_INTERVAL) {
                        Ok(event) => {
                            handler.handle(event);
                        }
                        Err(RecvTimeoutError::Timeout) => {}
                        Err(RecvTimeoutError::Disconnected) => break,
                    }
                }
            });
        match worker {
            Ok(worker) => {
                self.worker = Some(worker);
                Ok(())
            }
            Err(e) => {
                self.hooked.store(false, Ordering::SeqCst);
                Err(e)
            }
        }
    }

    fn unhook(&mut self) {
        self.hooked.store(false, Ordering::SeqCst);
    }
}

/// Input source reading one key name per line, e.g. from stdin.
///
/// The reader thread blocks on the next line; after `unhook` the line that
/// wakes it is discarded and the thread exits.
pub struct LineInputSource<R> {
    reader: Option<R>,
    hooked: Arc<AtomicBool>,
}

impl<R: BufRead + Send + 'static> LineInputSource<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader: Some(reader),
            hooked: Arc::new(AtomicBool::new(false)),
        }
    }
}

impl<R: BufRead + Send + 'static> InputSource for LineInputSource<R> {
    fn hook(&mut self, handler: InputHandler) -> io::Result<()> {
        let Some(reader) = self.reader.take() else {
            // Already consumed by an earlier run; the thread is still alive.
            self.hooked.store(true, Ordering::SeqCst);
            return Ok(());
        };
        self.hooked.store(true, Ordering::SeqCst);
        let hooked = Arc::clone(&self.hooked);
        thread::Builder::new()
            .name("input-dispatch".to_string())
            .spawn(move || {
                for line in reader.lines() {
                    let Ok(line) = line else { break };
                    if !hooked.load(Ordering::SeqCst) {
                        continue;
                    }
                    match InputEvent::from_key(&line) {
                        Some(event) => {
                            handler.handle(event);
                        }
                        None if line.trim().is_empty() => {}
                        None => tracing::warn!(key = %line.trim(), "Unknown key"),
                    }
                }
            })?;
        Ok(())
    }

    fn unhook(&mut self) {
        self.hooked.store(false, Ordering::SeqCst);
    }
}
