// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

#![allow(clippy::unwrap_used)]

use super::*;
use rand::rngs::StdRng;
use rand::SeedableRng;
use yare::parameterized;

fn policy() -> BackoffPolicy {
    BackoffPolicy::new(Duration::from_millis(100), Duration::from_secs(5), 0.8).unwrap()
}

#[parameterized(
    first = { 0, 100 },
    second = { 1, 200 },
    third = { 2, 400 },
    sixth = { 5, 3200 },
    capped = { 6, 5000 },
    far = { 40, 5000 },
    max = { u32::MAX, 5000 },
)]
fn capped_delay_doubles_until_ceiling(attempt: u32, expected_ms: u64) {
    assert_eq!(
        policy().capped_delay(attempt),
        Duration::from_millis(expected_ms)
    );
}

#[test]
fn attempt_zero_waits_at_least_jittered_base() {
    let policy = policy();
    for _ in 0..200 {
        let delay = policy.next_delay(0);
        assert!(delay >= Duration::from_millis(80));
        assert!(delay <= Duration::from_millis(100));
    }
}

#[test]
fn delay_never_exceeds_ceiling() {
    let policy = policy();
    let mut rng = StdRng::seed_from_u64(7);
    for attempt in 0..64 {
        for _ in 0..20 {
            assert!(policy.next_delay_with(attempt, &mut rng) <= policy.ceiling());
        }
    }
}

#[test]
fn delay_is_non_decreasing_in_expectation() {
    let policy = policy();
    let mut rng = StdRng::seed_from_u64(42);
    let samples = 500;

    let mean = |attempt: u32, rng: &mut StdRng| -> f64 {
        let total: f64 = (0..samples)
            .map(|_| policy.next_delay_with(attempt, rng).as_secs_f64())
            .sum();
        total / f64::from(samples)
    };

    let means: Vec<f64> = (0..10).map(|n| mean(n, &mut rng)).collect();
    for pair in means.windows(2) {
        // Once both sides sit at the ceiling the means only differ by noise.
        assert!(pair[1] >= pair[0] * 0.98, "means: {:?}", means);
    }
}

#[test]
fn jitter_floor_of_one_is_deterministic() {
    let policy =
        BackoffPolicy::new(Duration::from_millis(50), Duration::from_secs(1), 1.0).unwrap();
    assert_eq!(policy.next_delay(0), Duration::from_millis(50));
    assert_eq!(policy.next_delay(3), Duration::from_millis(400));
}

#[parameterized(
    zero_base = { Duration::ZERO, Duration::from_secs(1), 0.8 },
    ceiling_below_base = { Duration::from_secs(2), Duration::from_secs(1), 0.8 },
    zero_floor = { Duration::from_secs(1), Duration::from_secs(2), 0.0 },
    floor_above_one = { Duration::from_secs(1), Duration::from_secs(2), 1.5 },
)]
fn invalid_policies_are_rejected(base: Duration, ceiling: Duration, floor: f64) {
    assert!(BackoffPolicy::new(base, ceiling, floor).is_err());
}
