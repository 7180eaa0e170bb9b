use crate::scheduler::{Scheduler, TickOutcome};
use crate::time::{ClientEpoch, SimDuration, SimTime};

type ClientSimTime = SimTime<crate::time::ClientMarker>;

fn at(millis: i64) -> ClientSimTime {
    SimTime::from_micros_since_epoch(millis * 1_000)
}

fn scheduler() -> Scheduler<crate::time::ClientMarker> {
    // 100 ms period, 10 ms adjustment quantum.
    Scheduler::new(
        ClientEpoch::at_now(),
        SimDuration::from_millis(100),
        SimDuration::from_millis(10),
    )
}

#[tokio::test(start_paused = true)]
async fn on_time_wakes_do_not_accumulate_strikes() {
    let mut scheduler = scheduler();
    let mut now = 100;
    for _ in 0..50 {
        // Slightly late, but under the 30% threshold.
        assert_eq!(scheduler.note_wake(at(now + 20)), TickOutcome::OnTime);
        now += 100;
    }
}

#[tokio::test(start_paused = true)]
async fn ten_consecutive_late_wakes_report_a_slow_loop() {
    let mut scheduler = scheduler();
    let mut now = 0;
    for strike in 1..=9 {
        // 50 ms past the deadline is beyond period * 0.3.
        now = scheduler.next_exec_time().as_micros_since_epoch() / 1_000 + 50;
        assert_eq!(
            scheduler.note_wake(at(now)),
            TickOutcome::OnTime,
            "strike {strike}",
        );
    }
    now = scheduler.next_exec_time().as_micros_since_epoch() / 1_000 + 50;
    assert_eq!(scheduler.note_wake(at(now)), TickOutcome::RunningSlow);

    // The counter reset; the next late wake is strike one again.
    now = scheduler.next_exec_time().as_micros_since_epoch() / 1_000 + 50;
    assert_eq!(scheduler.note_wake(at(now)), TickOutcome::OnTime);
}

#[tokio::test(start_paused = true)]
async fn a_punctual_wake_clears_the_strike_counter() {
    let mut scheduler = scheduler();
    for _ in 0..9 {
        let late = scheduler.next_exec_time().as_micros_since_epoch() / 1_000 + 50;
        scheduler.note_wake(at(late));
    }
    // One punctual wake resets the streak.
    let punctual = scheduler.next_exec_time().as_micros_since_epoch() / 1_000;
    assert_eq!(scheduler.note_wake(at(punctual)), TickOutcome::OnTime);

    let late = scheduler.next_exec_time().as_micros_since_epoch() / 1_000 + 50;
    assert_eq!(scheduler.note_wake(at(late)), TickOutcome::OnTime);
}

#[tokio::test(start_paused = true)]
async fn delay_and_hurry_bias_the_next_deadline_once() {
    let mut scheduler = scheduler();

    scheduler.delay_tick();
    scheduler.note_wake(at(100));
    assert_eq!(scheduler.next_exec_time(), at(210));

    // The bias is consumed; the following deadline is a plain period.
    scheduler.note_wake(at(210));
    assert_eq!(scheduler.next_exec_time(), at(310));

    scheduler.hurry_tick();
    scheduler.note_wake(at(310));
    assert_eq!(scheduler.next_exec_time(), at(400));

    // Opposing requests cancel out.
    scheduler.delay_tick();
    scheduler.hurry_tick();
    scheduler.note_wake(at(400));
    assert_eq!(scheduler.next_exec_time(), at(500));
}

#[tokio::test(start_paused = true)]
async fn tick_waits_out_the_period() {
    let mut scheduler = scheduler();
    let start = tokio::time::Instant::now();
    assert_eq!(scheduler.tick().await, TickOutcome::OnTime);
    let elapsed = tokio::time::Instant::now() - start;
    assert!(elapsed >= std::time::Duration::from_millis(100));
}
