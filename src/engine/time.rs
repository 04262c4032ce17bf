use std::sync::mpsc;
use serde::{Deserialize, Serialize};

// ----------------------------------------------
// UpdateTimer
// ----------------------------------------------

pub type Seconds = f32;

// Fixed-rate ticker driven by frame deltas. Used when the host has no
// timer of its own to post step signals.
#[derive(Clone, Default, Serialize, Deserialize)]
pub struct UpdateTimer {
    update_frequency_secs: Seconds,
    time_since_last_update_secs: Seconds,
}

#[repr(u32)]
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum UpdateTimerResult {
    DoNotUpdate,
    ShouldUpdate,
}

impl UpdateTimerResult {
    #[inline]
    pub fn should_update(self) -> bool {
        self == UpdateTimerResult::ShouldUpdate
    }
}

impl UpdateTimer {
    #[inline]
    pub fn new(update_frequency_secs: Seconds) -> Self {
        debug_assert!(update_frequency_secs >= 0.0);
        Self { update_frequency_secs, time_since_last_update_secs: 0.0 }
    }

    #[inline]
    pub fn tick(&mut self, delta_time_secs: Seconds) -> UpdateTimerResult {
        self.time_since_last_update_secs += delta_time_secs;
        if self.time_since_last_update_secs >= self.update_frequency_secs {
            // Reset the clock.
            self.time_since_last_update_secs = 0.0;
            UpdateTimerResult::ShouldUpdate
        } else {
            UpdateTimerResult::DoNotUpdate
        }
    }

    #[inline]
    pub fn frequency_secs(&self) -> Seconds {
        self.update_frequency_secs
    }

    #[inline]
    pub fn time_since_last_secs(&self) -> Seconds {
        self.time_since_last_update_secs
    }
}

// ----------------------------------------------
// StepChannel
// ----------------------------------------------

// Single-producer single-consumer funnel for the periodic step signal.
// The sender may live on a timer thread; the receiver is drained once per
// loop iteration on the thread that owns the views.
pub struct StepChannel;

impl StepChannel {
    pub fn new() -> (StepSender, StepReceiver) {
        let (sender, receiver) = mpsc::channel();
        (StepSender { sender }, StepReceiver { receiver })
    }
}

#[derive(Clone)]
pub struct StepSender {
    sender: mpsc::Sender<()>,
}

impl StepSender {
    // Returns false once the receiving side is gone.
    #[inline]
    pub fn post(&self) -> bool {
        self.sender.send(()).is_ok()
    }
}

pub struct StepReceiver {
    receiver: mpsc::Receiver<()>,
}

impl StepReceiver {
    // Number of steps posted since the last drain. Never blocks.
    pub fn drain(&self) -> u32 {
        let mut count = 0;
        while self.receiver.try_recv().is_ok() {
            count += 1;
        }
        count
    }
}
