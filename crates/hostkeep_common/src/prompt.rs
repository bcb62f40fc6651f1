//! Operator confirmation
//!
//! Only a lone `y` or `Y` counts as consent. Anything else, including empty
//! input, `yes` and end of input, declines. Ctrl-C while waiting cancels the
//! prompt without taking the rest of the run down with it.

use std::io::{self, Write};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{debug, warn};

/// How often the reader re-checks for cancellation
const POLL_INTERVAL_MS: libc::c_int = 100;

/// Operator's answer to a yes/no question
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Confirmation {
    Accepted,
    Declined,
    /// SIGINT arrived while waiting for input
    Interrupted,
}

impl Confirmation {
    /// Classify one line of operator input
    pub fn from_input(line: &str) -> Self {
        if is_affirmative(line) {
            Confirmation::Accepted
        } else {
            Confirmation::Declined
        }
    }
}

/// `y` / `Y` with nothing but a line terminator around it
pub fn is_affirmative(line: &str) -> bool {
    let answer = line.strip_suffix('\n').unwrap_or(line);
    let answer = answer.strip_suffix('\r').unwrap_or(answer);
    answer.eq_ignore_ascii_case("y")
}

/// Source of operator decisions
pub trait Prompter {
    fn confirm(&mut self, question: &str) -> Confirmation;
}

/// Interactive prompt on the controlling terminal
#[derive(Debug, Default)]
pub struct ConsolePrompter;

impl ConsolePrompter {
    pub fn new() -> Self {
        Self
    }
}

impl Prompter for ConsolePrompter {
    fn confirm(&mut self, question: &str) -> Confirmation {
        print!("{} [y/N]: ", question);
        let _ = io::stdout().flush();

        let runtime = match tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
        {
            Ok(rt) => rt,
            Err(e) => {
                warn!(error = %e, "no signal-aware prompt, reading stdin directly");
                return read_answer(io::stdin().lock());
            }
        };

        // The reader only touches stdin once input is ready, so cancelling it
        // leaves nothing pending on the terminal for later child processes.
        let cancel = Arc::new(AtomicBool::new(false));
        let (tx, rx) = tokio::sync::oneshot::channel();
        let reader = {
            let cancel = Arc::clone(&cancel);
            std::thread::spawn(move || {
                if let Some(answer) = read_unless_cancelled(&cancel) {
                    let _ = tx.send(answer);
                }
            })
        };

        let answer = runtime.block_on(async {
            tokio::select! {
                answer = rx => answer.unwrap_or(Confirmation::Declined),
                Ok(()) = tokio::signal::ctrl_c() => {
                    println!();
                    Confirmation::Interrupted
                }
            }
        });
        cancel.store(true, Ordering::SeqCst);
        if reader.join().is_err() {
            warn!("confirmation reader panicked");
        }
        debug!(?answer, "operator answered");
        answer
    }
}

/// Wait for stdin to become readable, then read the answer
///
/// Returns `None` without reading once `cancel` is set.
fn read_unless_cancelled(cancel: &AtomicBool) -> Option<Confirmation> {
    let mut fds = libc::pollfd {
        fd: libc::STDIN_FILENO,
        events: libc::POLLIN,
        revents: 0,
    };
    while !cancel.load(Ordering::SeqCst) {
        let ready = unsafe { libc::poll(&mut fds, 1, POLL_INTERVAL_MS) };
        if ready > 0 {
            return Some(read_answer(io::stdin().lock()));
        }
        if ready < 0 {
            let err = io::Error::last_os_error();
            if err.kind() != io::ErrorKind::Interrupted {
                warn!(error = %err, "cannot wait for confirmation");
                return Some(Confirmation::Declined);
            }
        }
    }
    None
}

/// Read one line; end of input or a read error declines
fn read_answer<R: io::BufRead>(mut reader: R) -> Confirmation {
    let mut line = String::new();
    match reader.read_line(&mut line) {
        Ok(0) => Confirmation::Declined,
        Ok(_) => Confirmation::from_input(&line),
        Err(e) => {
            warn!(error = %e, "failed to read confirmation");
            Confirmation::Declined
        }
    }
}
