//! Timed yes/no confirmation
//!
//! A long-lived key reader and a per-prompt countdown thread feed one event
//! channel. Whichever side settles the shared [`CancelToken`] first decides
//! the prompt; the other side's result is dropped. The terminal is in raw
//! mode only while a prompt is open, so a single key press answers it.

use crossterm::cursor::MoveToColumn;
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use crossterm::execute;
use crossterm::style::Print;
use crossterm::terminal::{disable_raw_mode, enable_raw_mode, Clear, ClearType};
use std::io;
use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};
use std::sync::mpsc::{self, Receiver, Sender, TryRecvError};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

const PENDING: u8 = 0;
const ANSWERED: u8 = 1;
const TIMED_OUT: u8 = 2;

const POLL_INTERVAL: Duration = Duration::from_millis(100);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Settled {
    Answered,
    TimedOut,
}

/// Single-assignment flag shared by the input side and the timer side.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicU8>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `true` only for the first caller.
    pub fn try_settle(&self, how: Settled) -> bool {
        let code = match how {
            Settled::Answered => ANSWERED,
            Settled::TimedOut => TIMED_OUT,
        };
        self.0
            .compare_exchange(PENDING, code, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    pub fn state(&self) -> Option<Settled> {
        match self.0.load(Ordering::Acquire) {
            ANSWERED => Some(Settled::Answered),
            TIMED_OUT => Some(Settled::TimedOut),
            _ => None,
        }
    }

    pub fn is_settled(&self) -> bool {
        self.state().is_some()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PromptEvent {
    Key(KeyEvent),
    Tick { prompt: u64, remaining: u64 },
    Expired { prompt: u64 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecisionSource {
    Operator,
    Timeout,
    /// No prompt was shown (`--yes`).
    Auto,
    /// Ctrl-C at the prompt: decline this row and stop the run.
    Interrupted,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Decision {
    pub proceed: bool,
    pub source: DecisionSource,
}

pub trait Confirm {
    fn confirm(&mut self, question: &str) -> Decision;
}

/// Always proceeds without asking.
#[derive(Debug, Default, Clone, Copy)]
pub struct AutoConfirm;

impl Confirm for AutoConfirm {
    fn confirm(&mut self, _question: &str) -> Decision {
        Decision {
            proceed: true,
            source: DecisionSource::Auto,
        }
    }
}

/// What a single key press means at the prompt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyAnswer {
    Proceed,
    Decline,
    /// Enter: take the configured default.
    Default,
    Interrupt,
}

/// `y` proceeds, `n` declines, Enter takes the default, Ctrl-C interrupts.
/// Every other key is ignored.
pub fn interpret_key(key: &KeyEvent) -> Option<KeyAnswer> {
    if key.kind == KeyEventKind::Release {
        return None;
    }
    match key.code {
        KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => {
            Some(KeyAnswer::Interrupt)
        }
        KeyCode::Char('y') | KeyCode::Char('Y') => Some(KeyAnswer::Proceed),
        KeyCode::Char('n') | KeyCode::Char('N') => Some(KeyAnswer::Decline),
        KeyCode::Enter => Some(KeyAnswer::Default),
        _ => None,
    }
}

impl KeyAnswer {
    pub fn decision(self, default_proceed: bool) -> Decision {
        let (proceed, source) = match self {
            KeyAnswer::Proceed => (true, DecisionSource::Operator),
            KeyAnswer::Decline => (false, DecisionSource::Operator),
            KeyAnswer::Default => (default_proceed, DecisionSource::Operator),
            KeyAnswer::Interrupt => (false, DecisionSource::Interrupted),
        };
        Decision { proceed, source }
    }
}

/// Wait for the prompt `prompt_id` to be decided.
///
/// A key only counts if it settles the token; once the timer has settled it,
/// late input is ignored and the timeout default applies.
pub fn await_decision(
    events: &Receiver<PromptEvent>,
    prompt_id: u64,
    token: &CancelToken,
    default_proceed: bool,
    mut on_tick: impl FnMut(u64),
) -> Decision {
    let timed_out = Decision {
        proceed: default_proceed,
        source: DecisionSource::Timeout,
    };

    loop {
        match events.recv() {
            Ok(PromptEvent::Key(key)) => {
                let Some(answer) = interpret_key(&key) else {
                    debug!(code = ?key.code, "key ignored at prompt");
                    continue;
                };
                if token.try_settle(Settled::Answered) {
                    return answer.decision(default_proceed);
                }
                debug!("input arrived after timeout, ignored");
            }
            Ok(PromptEvent::Tick { prompt, remaining }) if prompt == prompt_id => {
                if !token.is_settled() {
                    on_tick(remaining);
                }
            }
            Ok(PromptEvent::Expired { prompt }) if prompt == prompt_id => {
                if token.state() == Some(Settled::TimedOut) {
                    return timed_out;
                }
            }
            Ok(_) => {}
            Err(_) => {
                // Every sender is gone; nothing can answer any more.
                token.try_settle(Settled::TimedOut);
                return timed_out;
            }
        }
    }
}

/// Spawn the countdown for one prompt.
pub fn spawn_countdown(
    tx: Sender<PromptEvent>,
    prompt_id: u64,
    token: CancelToken,
    timeout: Duration,
) -> thread::JoinHandle<()> {
    thread::spawn(move || {
        let started = Instant::now();
        let mut last_shown = u64::MAX;
        loop {
            if token.is_settled() {
                return;
            }
            let elapsed = started.elapsed();
            if elapsed >= timeout {
                if token.try_settle(Settled::TimedOut) {
                    let _ = tx.send(PromptEvent::Expired { prompt: prompt_id });
                }
                return;
            }
            let remaining = (timeout - elapsed).as_secs_f64().ceil() as u64;
            if remaining != last_shown {
                last_shown = remaining;
                if tx.send(PromptEvent::Tick { prompt: prompt_id, remaining }).is_err() {
                    return;
                }
            }
            thread::sleep(POLL_INTERVAL);
        }
    })
}

/// Raw mode for the lifetime of the guard.
struct RawModeGuard;

impl RawModeGuard {
    fn enable() -> io::Result<Self> {
        enable_raw_mode()?;
        Ok(Self)
    }
}

impl Drop for RawModeGuard {
    fn drop(&mut self) {
        let _ = disable_raw_mode();
    }
}

/// Console prompt with a visible countdown.
pub struct TimedConsolePrompt {
    timeout: Duration,
    default_proceed: bool,
    tx: Sender<PromptEvent>,
    rx: Receiver<PromptEvent>,
    next_prompt: u64,
    stop_reader: Arc<AtomicBool>,
}

impl TimedConsolePrompt {
    pub fn new(timeout: Duration, default_proceed: bool) -> Self {
        let (tx, rx) = mpsc::channel();
        let stop_reader = Arc::new(AtomicBool::new(false));
        spawn_key_reader(tx.clone(), Arc::clone(&stop_reader));
        Self {
            timeout,
            default_proceed,
            tx,
            rx,
            next_prompt: 0,
            stop_reader,
        }
    }

    /// Throw away keys pressed before the question was shown.
    fn drain_stale(&self) {
        loop {
            match self.rx.try_recv() {
                Ok(PromptEvent::Key(key)) => debug!(code = ?key.code, "discarding early input"),
                Ok(_) => {}
                Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => return,
            }
        }
    }
}

impl Drop for TimedConsolePrompt {
    fn drop(&mut self) {
        self.stop_reader.store(true, Ordering::Release);
    }
}

impl Confirm for TimedConsolePrompt {
    fn confirm(&mut self, question: &str) -> Decision {
        self.drain_stale();
        self.next_prompt += 1;
        let prompt_id = self.next_prompt;

        // Without a terminal no key can arrive; the countdown still runs out.
        let guard = match RawModeGuard::enable() {
            Ok(guard) => Some(guard),
            Err(e) => {
                warn!(error = %e, "raw mode unavailable, waiting for the timeout default");
                None
            }
        };

        let token = CancelToken::new();
        let timer = spawn_countdown(self.tx.clone(), prompt_id, token.clone(), self.timeout);

        let decision = await_decision(&self.rx, prompt_id, &token, self.default_proceed, |remaining| {
            let _ = execute!(
                io::stdout(),
                MoveToColumn(0),
                Clear(ClearType::CurrentLine),
                Print(format!("{} ({}s until auto-continue) ", question, remaining))
            );
        });
        let _ = timer.join();
        drop(guard);

        let verdict = match decision.source {
            DecisionSource::Timeout => {
                let default = if self.default_proceed { "y" } else { "n" };
                format!("no answer, continuing with '{}'", default)
            }
            DecisionSource::Interrupted => "interrupted".to_string(),
            _ if decision.proceed => "y".to_string(),
            _ => "n".to_string(),
        };
        let _ = execute!(io::stdout(), MoveToColumn(0), Clear(ClearType::CurrentLine));
        println!("{} {}", question, verdict);
        decision
    }
}

fn spawn_key_reader(tx: Sender<PromptEvent>, stop: Arc<AtomicBool>) {
    thread::spawn(move || {
        while !stop.load(Ordering::Acquire) {
            match event::poll(POLL_INTERVAL) {
                Ok(true) => match event::read() {
                    Ok(Event::Key(key)) => {
                        if tx.send(PromptEvent::Key(key)).is_err() {
                            return;
                        }
                    }
                    Ok(_) => {}
                    Err(e) => {
                        debug!(error = %e, "terminal read failed, key reader stopping");
                        return;
                    }
                },
                Ok(false) => {}
                Err(e) => {
                    debug!(error = %e, "terminal poll failed, key reader stopping");
                    return;
                }
            }
        }
    });
}
