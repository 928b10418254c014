use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError};
use std::sync::Arc;
use std::time::Duration;

use crossterm::event::{self, Event as CtEvent, KeyEvent, KeyEventKind};

/// How long `Runner::step` waits per poll when no tick task is live
const IDLE_POLL: Duration = Duration::from_millis(500);

/// Unified event type consumed by the app runner
#[derive(Clone, Debug)]
pub enum GameEvent {
    Key(KeyEvent),
    Resize,
    Tick,
    /// The event source hung up; the loop should stop
    Closed,
}

/// Source of terminal events (keyboard, resize, etc.)
pub trait GameEventSource: Send + 'static {
    /// Block for up to `timeout` waiting for an event.
    /// Returns Ok(event) if an event arrives before the timeout, or Err(Timeout) if it expires.
    fn recv_timeout(&self, timeout: Duration) -> Result<GameEvent, RecvTimeoutError>;
}

/// Production event source using crossterm
pub struct CrosstermEventSource {
    rx: Receiver<GameEvent>,
}

impl CrosstermEventSource {
    pub fn new() -> Self {
        let (tx, rx) = mpsc::channel();

        std::thread::spawn(move || loop {
            match event::read() {
                // Windows reports both press and release
                Ok(CtEvent::Key(key)) if key.kind == KeyEventKind::Press => {
                    if tx.send(GameEvent::Key(key)).is_err() {
                        break;
                    }
                }
                Ok(CtEvent::Resize(_, _)) => {
                    if tx.send(GameEvent::Resize).is_err() {
                        break;
                    }
                }
                Ok(_) => {}
                Err(_) => break,
            }
        });

        Self { rx }
    }
}

impl Default for CrosstermEventSource {
    fn default() -> Self {
        Self::new()
    }
}

impl GameEventSource for CrosstermEventSource {
    fn recv_timeout(&self, timeout: Duration) -> Result<GameEvent, RecvTimeoutError> {
        self.rx.recv_timeout(timeout)
    }
}

/// Configurable ticker interface
pub trait Ticker: Send + Sync + 'static {
    fn interval(&self) -> Duration;
}

/// Fixed interval ticker
#[derive(Clone, Copy, Debug)]
pub struct FixedTicker {
    interval: Duration,
}

impl FixedTicker {
    pub fn new(interval: Duration) -> Self {
        Self { interval }
    }
}

impl Ticker for FixedTicker {
    fn interval(&self) -> Duration {
        self.interval
    }
}

/// Shared cancellation flag for a [`TickTask`]
#[derive(Clone, Debug, Default)]
pub struct CancelToken {
    cancelled: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}

/// A periodic tick that lives only while a quiz is being played.
///
/// Whoever enters the Playing screen owns the task and cancels it on the way
/// out. Dropping the task cancels it too. A cancelled task never produces
/// another tick.
#[derive(Debug)]
pub struct TickTask {
    interval: Duration,
    token: CancelToken,
}

impl TickTask {
    pub fn start<T: Ticker>(ticker: &T) -> Self {
        Self {
            interval: ticker.interval(),
            token: CancelToken::default(),
        }
    }

    pub fn token(&self) -> CancelToken {
        self.token.clone()
    }

    pub fn cancel(&self) {
        self.token.cancel();
    }

    pub fn is_live(&self) -> bool {
        !self.token.is_cancelled()
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }
}

impl Drop for TickTask {
    fn drop(&mut self) {
        self.token.cancel();
    }
}

/// Runner that advances the application one event/tick at a time
pub struct Runner<E: GameEventSource> {
    event_source: E,
}

impl<E: GameEventSource> Runner<E> {
    pub fn new(event_source: E) -> Self {
        Self { event_source }
    }

    /// Blocks for the next event. With a live `tick` task, a quiet interval
    /// yields `Tick`; otherwise it keeps waiting for input.
    pub fn step(&self, tick: Option<&TickTask>) -> GameEvent {
        loop {
            let live = tick.filter(|t| t.is_live());
            let timeout = live.map_or(IDLE_POLL, TickTask::interval);

            match self.event_source.recv_timeout(timeout) {
                Ok(ev) => return ev,
                Err(RecvTimeoutError::Disconnected) => return GameEvent::Closed,
                Err(RecvTimeoutError::Timeout) => {
                    // re-check: the task may have been cancelled while we waited
                    if tick.is_some_and(TickTask::is_live) {
                        return GameEvent::Tick;
                    }
                }
            }
        }
    }
}

/// Test event source for unit tests
pub struct TestEventSource {
    rx: Receiver<GameEvent>,
}

impl TestEventSource {
    pub fn new(rx: Receiver<GameEvent>) -> Self {
        Self { rx }
    }
}

impl GameEventSource for TestEventSource {
    fn recv_timeout(&self, timeout: Duration) -> Result<GameEvent, RecvTimeoutError> {
        self.rx.recv_timeout(timeout)
    }
}
