use gridx_domain_credits::{max_reserve, time_cost, worker_reward, SettlementParameters};

fn params() -> SettlementParameters {
    SettlementParameters {
        rate_per_second: 0.1,
        base: 0.05,
        worker_reward_fraction: 0.8,
    }
}

/// S1 from the spec's concrete scenarios: a 60s-timeout reservation at
/// rate 0.1/s with base 0 costs exactly 6.0, and a 3s run costs 0.3.
#[test]
fn s1_happy_path_arithmetic() {
    let p = SettlementParameters {
        rate_per_second: 0.1,
        base: 0.0,
        worker_reward_fraction: 0.8,
    };
    let reserved = max_reserve(60, &p);
    assert_eq!(reserved, 6.0);

    let cost = time_cost(3.0, reserved, &p);
    assert!((cost - 0.3).abs() < 1e-9);
    assert!((worker_reward(cost, &p) - 0.24).abs() < 1e-9);
}

#[test]
fn max_reserve_includes_base_cost() {
    assert!((max_reserve(10, &params()) - (0.1 * 10.0 + 0.05)).abs() < 1e-9);
}

#[test]
fn time_cost_clamps_to_the_reservation_ceiling() {
    let p = params();
    let reserved = max_reserve(5, &p);
    // A wildly overrunning duration never costs more than was reserved.
    assert_eq!(time_cost(10_000.0, reserved, &p), reserved);
}

#[test]
fn time_cost_floors_at_zero_for_negative_duration() {
    let p = SettlementParameters {
        rate_per_second: 0.1,
        base: 0.0,
        worker_reward_fraction: 0.8,
    };
    assert_eq!(time_cost(-1.0, 5.0, &p), 0.0);
}

#[test]
fn worker_reward_scales_linearly_with_cost() {
    let p = params();
    let double = worker_reward(2.0, &p);
    let single = worker_reward(1.0, &p);
    assert!((double - 2.0 * single).abs() < 1e-9);
}
