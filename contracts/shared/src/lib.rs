//! Shared types and utilities for RangeLock Soroban contracts.
//!
//! Everything the incentives contract and the pool engine exchange lives
//! here: pool and tick-range identity, token amounts, the fixed duration
//! catalog, and a thin client for the pool engine interface.

#![no_std]
use soroban_sdk::{contracttype, Address};

// ============================================================================
// Pool & Range Identity
// ============================================================================

/// Composite identity of an AMM pool: asset pair, fee tier, extension.
/// The key is used verbatim; there is no separate numeric pool id.
#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct PoolKey {
    pub token_a: Address,
    pub token_b: Address,
    pub fee_bps: u32,
    pub extension: Address,
}

/// One price range of a pool, bounded by a pair of ticks.
#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct RangeKey {
    pub pool: PoolKey,
    pub tick_lower: i32,
    pub tick_upper: i32,
}

// ============================================================================
// Financial Types
// ============================================================================

#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct TokenAmount {
    pub token: Address,
    pub amount: i128,
}

/// Token amounts moved by a pool-side liquidity change.
#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct AmountDelta {
    pub amount0: i128,
    pub amount1: i128,
}

// ============================================================================
// Duration Catalog
// ============================================================================

/// The ten lock terms offered by the protocol. Day counts are calendar
/// approximations: 30-day months and 365-day years.
#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum DurationTier {
    OneMonth,
    ThreeMonths,
    SixMonths,
    OneYear,
    TwoYears,
    ThreeYears,
    FiveYears,
    TenYears,
    TwentyYears,
    OneHundredYears,
}

impl DurationTier {
    /// Every tier, in ascending order of term length.
    pub const ALL: [DurationTier; 10] = [
        DurationTier::OneMonth,
        DurationTier::ThreeMonths,
        DurationTier::SixMonths,
        DurationTier::OneYear,
        DurationTier::TwoYears,
        DurationTier::ThreeYears,
        DurationTier::FiveYears,
        DurationTier::TenYears,
        DurationTier::TwentyYears,
        DurationTier::OneHundredYears,
    ];

    pub fn days(&self) -> u64 {
        match self {
            DurationTier::OneMonth => 30,
            DurationTier::ThreeMonths => 90,
            DurationTier::SixMonths => 180,
            DurationTier::OneYear => 365,
            DurationTier::TwoYears => 730,
            DurationTier::ThreeYears => 1095,
            DurationTier::FiveYears => 1825,
            DurationTier::TenYears => 3650,
            DurationTier::TwentyYears => 7300,
            DurationTier::OneHundredYears => 36500,
        }
    }

    /// Lock term in seconds.
    pub fn seconds(&self) -> u64 {
        self.days() * SECONDS_PER_DAY
    }
}

// ============================================================================
// Pool Engine Client
// ============================================================================

/// Typed wrappers around the pool engine's contract interface.
///
/// The engine owns all price-curve and liquidity math; callers pass tick
/// bounds and token amounts through unchanged. A `pool_price` of zero means
/// the pool has never been initialized.
pub mod pool_engine {
    use soroban_sdk::{Address, Env, IntoVal, Symbol, Val, Vec};

    use super::{AmountDelta, PoolKey};

    /// Current sqrt price of the pool in Q96 fixed point, zero if none.
    pub fn pool_price(env: &Env, engine: &Address, pool: &PoolKey) -> u128 {
        let args: Vec<Val> = Vec::from_array(env, [pool.clone().into_val(env)]);
        env.invoke_contract::<u128>(engine, &Symbol::new(env, "pool_price"), args)
    }

    /// Liquidity obtainable from the given token amounts at the given price.
    pub fn liquidity_for_amounts(
        env: &Env,
        engine: &Address,
        price: u128,
        tick_lower: i32,
        tick_upper: i32,
        amount0: i128,
        amount1: i128,
    ) -> u128 {
        let args: Vec<Val> = Vec::from_array(
            env,
            [
                price.into_val(env),
                tick_lower.into_val(env),
                tick_upper.into_val(env),
                amount0.into_val(env),
                amount1.into_val(env),
            ],
        );
        env.invoke_contract::<u128>(engine, &Symbol::new(env, "liquidity_for_amounts"), args)
    }

    /// Add liquidity to a range; returns the token amounts actually drawn.
    pub fn add_liquidity(
        env: &Env,
        engine: &Address,
        pool: &PoolKey,
        tick_lower: i32,
        tick_upper: i32,
        liquidity_delta: i128,
    ) -> AmountDelta {
        let args: Vec<Val> = Vec::from_array(
            env,
            [
                pool.clone().into_val(env),
                tick_lower.into_val(env),
                tick_upper.into_val(env),
                liquidity_delta.into_val(env),
            ],
        );
        env.invoke_contract::<AmountDelta>(engine, &Symbol::new(env, "add_liquidity"), args)
    }

    /// Remove liquidity from a range; the engine routes proceeds to the
    /// position owner. `liquidity_delta` is negative.
    pub fn remove_liquidity(
        env: &Env,
        engine: &Address,
        pool: &PoolKey,
        tick_lower: i32,
        tick_upper: i32,
        liquidity_delta: i128,
    ) -> AmountDelta {
        let args: Vec<Val> = Vec::from_array(
            env,
            [
                pool.clone().into_val(env),
                tick_lower.into_val(env),
                tick_upper.into_val(env),
                liquidity_delta.into_val(env),
            ],
        );
        env.invoke_contract::<AmountDelta>(engine, &Symbol::new(env, "remove_liquidity"), args)
    }
}

// ============================================================================
// Validation Helpers
// ============================================================================

/// Validate that an amount is positive
pub fn validate_positive_amount(amount: i128) -> bool {
    amount > 0
}

/// Validate that a tick range is well formed (lower strictly below upper)
pub fn validate_tick_range(tick_lower: i32, tick_upper: i32) -> bool {
    tick_lower < tick_upper
}

// ============================================================================
// Constants
// ============================================================================

/// Seconds in a day
pub const SECONDS_PER_DAY: u64 = 86400;

/// Fixed-point scale of the reward settlement ratio (10^18)
pub const REWARD_SCALE: u128 = 1_000_000_000_000_000_000;

/// Largest bucket capacity or reward balance whose product with
/// `REWARD_SCALE` still fits in u128. Funding is bounded to it so the
/// settlement ratio math stays in range for the life of the bucket.
pub const MAX_SETTLEABLE_AMOUNT: u128 = u128::MAX / REWARD_SCALE;

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn duration_catalog_endpoints() {
        assert_eq!(DurationTier::OneMonth.seconds(), 30 * 86400);
        assert_eq!(DurationTier::OneHundredYears.seconds(), 36500 * 86400);
    }

    #[test]
    fn duration_catalog_is_strictly_increasing() {
        for pair in DurationTier::ALL.windows(2) {
            assert!(pair[0].seconds() < pair[1].seconds());
        }
    }

    #[test]
    fn tick_range_validation() {
        assert!(validate_tick_range(-100, 100));
        assert!(!validate_tick_range(100, 100));
        assert!(!validate_tick_range(100, -100));
    }

    #[test]
    fn settleable_bound_keeps_ratio_products_in_range() {
        assert!(MAX_SETTLEABLE_AMOUNT.checked_mul(REWARD_SCALE).is_some());
        assert!((MAX_SETTLEABLE_AMOUNT + 1).checked_mul(REWARD_SCALE).is_none());
        assert!(MAX_SETTLEABLE_AMOUNT <= i128::MAX as u128);
    }
}
