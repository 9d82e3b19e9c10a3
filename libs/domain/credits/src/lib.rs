//! Pure arithmetic for the credit economy: reservation sizing, settlement
//! cost, and worker reward. None of this touches the store — the ledger's
//! atomic debit/credit primitives live in the store's credit repository,
//! which calls these functions to decide *how much*.

use serde::{Deserialize, Serialize};

/// Process-wide settlement parameters: cost rate per second, flat base
/// cost, and the fraction of settlement cost rewarded to the worker's
/// owner.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct SettlementParameters {
    pub rate_per_second: f64,
    pub base: f64,
    pub worker_reward_fraction: f64,
}

/// Worst-case cost of a job with the given declared timeout. This is what
/// gets reserved (debited) at submission time; the surplus over the actual
/// `time_cost` is refunded at settlement.
pub fn max_reserve(timeout_seconds: u32, params: &SettlementParameters) -> f64 {
    params.rate_per_second * timeout_seconds as f64 + params.base
}

/// Actual settlement cost for an observed execution duration, clamped to
/// `[0, reserved]` so a worker that somehow overruns its reservation never
/// costs the submitter more than was reserved.
pub fn time_cost(duration_seconds: f64, reserved: f64, params: &SettlementParameters) -> f64 {
    let raw = params.rate_per_second * duration_seconds.max(0.0) + params.base;
    raw.clamp(0.0, reserved)
}

/// Share of the settlement cost credited to the worker's owner.
pub fn worker_reward(cost: f64, params: &SettlementParameters) -> f64 {
    cost * params.worker_reward_fraction
}
