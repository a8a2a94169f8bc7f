//! Tick scheduling primitives.
//!
//! The render loop is cooperative: the host environment fires a callback per
//! display frame, and the pipeline performs one tick per callback. Rather
//! than an implicit self-rescheduling callback chain, the contract is
//! explicit — a [`FrameScheduler`] requests the next display-frame callback,
//! and a [`CancelToken`] is checked at the top of every tick so a tick that
//! was already scheduled when its session died does no work.

use std::cell::Cell;
use std::rc::Rc;

/// Single-threaded cancellation flag shared between a session and any tick
/// callbacks still in flight. Cancellation is synchronous and immediate:
/// once `cancel` returns, no later tick touches session resources.
#[derive(Clone, Debug, Default)]
pub struct CancelToken {
    flag: Rc<Cell<bool>>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.flag.set(true);
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.get()
    }
}

/// Hook into the host's display-refresh signal. Implementations request one
/// more callback; they are invoked at the end of a tick even when the tick
/// skipped its draw, so an unready source keeps the loop alive instead of
/// stalling it.
pub trait FrameScheduler {
    fn schedule(&mut self);
}
