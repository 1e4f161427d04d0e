use crate::clock::Clock;
use std::time::Duration;

#[test]
fn test_new_clock_is_stopped_at_zero() {
    let mut clock = Clock::new();
    assert!(!clock.is_running());
    clock.update();
    assert_eq!(clock.elapsed(), 0.0);
}

#[test]
fn test_update_advances_elapsed() {
    let mut clock = Clock::new();
    clock.start();
    std::thread::sleep(Duration::from_millis(5));
    clock.update();
    assert!(clock.elapsed() >= 0.005);
}

#[test]
fn test_stop_freezes_elapsed() {
    let mut clock = Clock::new();
    clock.start();
    std::thread::sleep(Duration::from_millis(2));
    clock.update();
    clock.stop();
    let frozen = clock.elapsed();

    std::thread::sleep(Duration::from_millis(2));
    clock.update();
    assert_eq!(clock.elapsed(), frozen);
}

#[test]
fn test_restart_resets_elapsed() {
    let mut clock = Clock::new();
    clock.start();
    std::thread::sleep(Duration::from_millis(2));
    clock.update();
    clock.start();
    assert_eq!(clock.elapsed(), 0.0);
}
