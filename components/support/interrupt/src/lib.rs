/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at http://mozilla.org/MPL/2.0/. */

// Helps manage "interruptable" things across our various crates.
//
// Unlike the SQL-flavoured version of this crate this one has no notion of
// a "query scope"; the thing being interrupted here is an in-flight async
// task (the remote-suggestion fetch), not a database statement, so the
// primitive is a plain atomic flag shared between the task and whoever asks
// it to stop.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Something that is interruptable. In practice, this will almost certainly
/// be Sync + Send, as it will typically be created on one thread, but
/// `.interrupt()` will be called from a different thread.
pub trait Interruptable {
    /// Take some action when interrupted.
    fn interrupt(&self);
}

/// Represents the state of something that may be interrupted. Decoupled from
/// Interruptable so that things which want to check if they have been
/// interrupted don't need to know about the interrupt mechanics.
pub trait Interruptee {
    fn was_interrupted(&self) -> bool;

    fn err_if_interrupted(&self) -> std::result::Result<(), Interrupted> {
        if self.was_interrupted() {
            Err(Interrupted)
        } else {
            Ok(())
        }
    }
}

/// A convenience implementation, should only be used in tests.
pub struct NeverInterrupts;

impl Interruptee for NeverInterrupts {
    #[inline]
    fn was_interrupted(&self) -> bool {
        false
    }
}

/// The error returned by `err_if_interrupted`, and the public "cancelled"
/// signal a component surfaces when a caller tore down an in-flight
/// operation.
#[derive(Debug, Clone, Copy, thiserror::Error)]
#[error("The operation was interrupted.")]
pub struct Interrupted;

/// A shared, clonable cancellation flag. One half of the pair is handed to
/// the caller as a handle they can call `.interrupt()` on; the other half
/// is polled (or checked once, on completion) by the task doing the work.
#[derive(Clone, Default)]
pub struct CancellationToken {
    flag: Arc<AtomicBool>,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Interruptable for CancellationToken {
    fn interrupt(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }
}

impl Interruptee for CancellationToken {
    fn was_interrupted(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn never_interrupts_is_never_interrupted() {
        assert!(!NeverInterrupts.was_interrupted());
        assert!(NeverInterrupts.err_if_interrupted().is_ok());
    }

    #[test]
    fn cancellation_token_round_trips() {
        let token = CancellationToken::new();
        let handle = token.clone();
        assert!(!token.was_interrupted());
        handle.interrupt();
        assert!(token.was_interrupted());
        assert!(matches!(token.err_if_interrupted(), Err(Interrupted)));
    }
}
