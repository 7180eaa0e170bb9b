//! Fixed-rate tick driver.
//!
//! The engines drive their step loops off one `Scheduler` each: `tick()`
//! sleeps until the next deadline, then reschedules. `delay_tick` and
//! `hurry_tick` bias the next deadline by one adjustment quantum, which is
//! how the client's drift discipline nudges its clock toward the server's.

use tokio::time::sleep_until;

use crate::time::{Epoch, SimDuration, SimTime};

/// Consecutive late wakes before a slow-loop report.
const SLOW_LOOP_STRIKES: u32 = 10;

/// A wake this fraction of a period past its deadline counts as late.
const LATE_FRACTION_NUM: i64 = 3;
const LATE_FRACTION_DEN: i64 = 10;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TickOutcome {
    OnTime,
    /// Ten consecutive wakes ran late; the loop cannot keep up with its
    /// configured rate. The strike counter has been reset.
    RunningSlow,
}

pub struct Scheduler<M> {
    epoch: Epoch<M>,
    period: SimDuration,
    delay: SimDuration,
    next_exec_time: SimTime<M>,
    requested_delay: SimDuration,
    delay_counter: u32,
}

impl<M> Scheduler<M> {
    /// `period` is the tick interval; `delay` is the adjustment quantum
    /// applied by [`delay_tick`](Self::delay_tick) and
    /// [`hurry_tick`](Self::hurry_tick).
    pub fn new(epoch: Epoch<M>, period: SimDuration, delay: SimDuration) -> Self {
        Self {
            epoch,
            period,
            delay,
            next_exec_time: epoch.now() + period,
            requested_delay: SimDuration::ZERO,
            delay_counter: 0,
        }
    }

    pub fn period(&self) -> SimDuration {
        self.period
    }

    /// Waits for the next deadline, then computes the one after it.
    pub async fn tick(&mut self) -> TickOutcome {
        sleep_until(self.epoch.instant_at(self.next_exec_time)).await;
        self.note_wake(self.epoch.now())
    }

    /// Push the next tick later by one adjustment quantum.
    pub fn delay_tick(&mut self) {
        self.requested_delay += self.delay;
    }

    /// Pull the next tick earlier by one adjustment quantum.
    pub fn hurry_tick(&mut self) {
        self.requested_delay -= self.delay;
    }

    pub(crate) fn note_wake(&mut self, now: SimTime<M>) -> TickOutcome {
        let late_threshold = self.period * LATE_FRACTION_NUM / LATE_FRACTION_DEN;
        if now > self.next_exec_time + late_threshold {
            self.delay_counter += 1;
        } else {
            self.delay_counter = 0;
        }

        self.next_exec_time = now + self.period + self.requested_delay;
        self.requested_delay = SimDuration::ZERO;

        if self.delay_counter >= SLOW_LOOP_STRIKES {
            self.delay_counter = 0;
            TickOutcome::RunningSlow
        } else {
            TickOutcome::OnTime
        }
    }

    pub(crate) fn next_exec_time(&self) -> SimTime<M> {
        self.next_exec_time
    }
}
