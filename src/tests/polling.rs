use std::time::{Duration, Instant};

use crate::{service::PollingController, view::RefreshStatus};

const COOLDOWN: Duration = Duration::from_millis(2000);
const GRACE: Duration = Duration::from_millis(500);

fn ms(millis: u64) -> Duration {
    Duration::from_millis(millis)
}

#[test]
fn starts_active() {
    let polling = PollingController::new(COOLDOWN, GRACE);
    assert_eq!(polling.status(Instant::now()), RefreshStatus::Active);
}

#[test]
fn focus_pauses_until_blur_settles() {
    let t0 = Instant::now();
    let mut polling = PollingController::new(COOLDOWN, GRACE);

    polling.focus_in("bid-Laptop");
    assert!(polling.is_paused(t0));
    // focus alone never times out
    assert!(polling.is_paused(t0 + ms(60_000)));

    polling.focus_out("bid-Laptop", t0 + ms(1000));
    assert!(polling.is_paused(t0 + ms(1200)));
    assert_eq!(polling.status(t0 + ms(1500)), RefreshStatus::Active);
}

#[test]
fn input_pauses_for_the_cooldown() {
    let t0 = Instant::now();
    let mut polling = PollingController::new(COOLDOWN, GRACE);

    polling.input(t0);
    assert!(polling.is_paused(t0 + ms(1999)));
    assert!(!polling.is_paused(t0 + ms(2000)));
}

#[test]
fn every_keystroke_restarts_the_cooldown() {
    let t0 = Instant::now();
    let mut polling = PollingController::new(COOLDOWN, GRACE);

    polling.input(t0);
    polling.input(t0 + ms(1500));
    assert!(polling.is_paused(t0 + ms(3000)));
    assert!(!polling.is_paused(t0 + ms(3500)));
}

#[test]
fn moving_focus_between_bid_fields_stays_paused() {
    let t0 = Instant::now();
    let mut polling = PollingController::new(COOLDOWN, GRACE);

    polling.focus_in("bid-Laptop");
    polling.focus_out("bid-Laptop", t0);
    polling.focus_in("bid-Phone");

    assert!(polling.is_paused(t0 + ms(5000)));
}

#[test]
fn blur_from_a_field_without_focus_keeps_the_focused_one() {
    let t0 = Instant::now();
    let mut polling = PollingController::new(COOLDOWN, GRACE);

    polling.focus_in("bid-Phone");
    polling.focus_out("bid-Laptop", t0);

    assert!(polling.is_paused(t0 + ms(5000)));
}

#[test]
fn settled_blur_ends_the_typing_cooldown() {
    let t0 = Instant::now();
    let mut polling = PollingController::new(COOLDOWN, GRACE);

    polling.focus_in("bid-Laptop");
    polling.input(t0);
    polling.focus_out("bid-Laptop", t0 + ms(100));

    assert!(polling.is_paused(t0 + ms(599)));
    assert!(!polling.is_paused(t0 + ms(600)));
}
