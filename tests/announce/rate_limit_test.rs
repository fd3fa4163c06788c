//! Integration tests for the persistent rate limiter.

use codex_session_watch::announce::{read_rate_state, RateLimiter, RATE_WINDOW_SECS};
use tempfile::TempDir;

fn run_sequence(limiter: &mut RateLimiter, times: &[f64]) -> Vec<bool> {
    times.iter().map(|t| limiter.allow_at(*t)).collect()
}

#[test]
fn min_spacing_denies_second_call() {
    let dir = TempDir::new().unwrap();
    let mut limiter = RateLimiter::new(60, 5, dir.path().join("rate.txt"));
    assert_eq!(run_sequence(&mut limiter, &[100.0, 101.0]), vec![true, false]);
}

#[test]
fn fourth_call_within_hour_denied() {
    let dir = TempDir::new().unwrap();
    let mut limiter = RateLimiter::new(3, 5, dir.path().join("rate.txt"));
    assert_eq!(
        run_sequence(&mut limiter, &[100.0, 200.0, 300.0, 400.0, 3000.0]),
        vec![true, true, true, false, false]
    );
}

#[test]
fn state_file_survives_restart() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("rate.txt");

    {
        let mut limiter = RateLimiter::new(2, 0, path.clone());
        assert!(limiter.allow_at(1000.0));
        assert!(limiter.allow_at(1500.0));
    }

    let stored = read_rate_state(&path, 1600.0, RATE_WINDOW_SECS);
    assert_eq!(stored, vec![1000.0, 1500.0]);

    let mut restarted = RateLimiter::new(2, 0, path.clone());
    assert!(!restarted.allow_at(1600.0));
    assert!(restarted.allow_at(4601.0));
}

#[test]
fn fractional_timestamps_round_trip() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("rate.txt");
    let mut limiter = RateLimiter::new(10, 0, path.clone());
    assert!(limiter.allow_at(1_770_381_751.042));

    let content = std::fs::read_to_string(&path).unwrap();
    assert_eq!(content, "1770381751.042\n");
}
