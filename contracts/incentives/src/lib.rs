#![no_std]
use soroban_sdk::{
    contract, contracterror, contractimpl, contracttype, log, symbol_short, token, Address, Env,
    Vec,
};

use rangelock_shared::{
    pool_engine, validate_positive_amount, validate_tick_range, DurationTier, RangeKey,
    TokenAmount, MAX_SETTLEABLE_AMOUNT, REWARD_SCALE,
};

// Data Types
#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct RewardBucket {
    pub funder: Address,
    pub remaining_liquidity: u128,
    pub rewards: Vec<TokenAmount>,
}

/// A bucket slot is never reused. Removal leaves a tombstone so stored
/// indices stay valid forever and stale references fail by state check,
/// not by arithmetic on zeroed fields.
#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum BucketSlot {
    Live(RewardBucket),
    Removed,
}

#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct LockRecord {
    pub owner: Address,
    pub range: RangeKey,
    pub duration: DurationTier,
    pub liquidity: u128,
    pub created_at: u64,
    pub reward_snapshot: Vec<TokenAmount>,
    pub withdrawn: bool,
}

/// Inputs to `lock_liquidity`, bundled to keep the entry point readable.
#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct LockParams {
    pub range: RangeKey,
    pub duration: DurationTier,
    pub bucket_index: u32,
    pub amount0_desired: i128,
    pub amount1_desired: i128,
    pub amount0_min: i128,
    pub amount1_min: i128,
    pub deadline: u64,
}

#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct IncentivesConfig {
    pub pool_engine: Address,
}

// Storage Keys
#[contracttype]
pub enum DataKey {
    Config,
    Bucket(RangeKey, DurationTier, u32),
    BucketCount(RangeKey, DurationTier),
    Lock(Address, u64),
    LockCount(Address),
}

// Error Types
#[contracterror]
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
#[repr(u32)]
pub enum IncentivesError {
    NotInitialized = 1,
    AlreadyInitialized = 2,
    TokensAmountsMismatch = 3,
    InvalidAmount = 4,
    InvalidTickRange = 5,
    BucketNotFound = 6,
    BucketRemoved = 7,
    BucketExhausted = 8,
    NotFunder = 9,
    NoLiquidity = 10,
    PoolNotInitialized = 11,
    ExpiredDeadline = 12,
    TooMuchSlippage = 13,
    LockNotFound = 14,
    NotMatured = 15,
    AlreadyUnlocked = 16,
    NumericOverflow = 17,
}

// Events
#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct RewardsAddedEvent {
    pub funder: Address,
    pub range: RangeKey,
    pub duration: DurationTier,
    pub bucket_index: u32,
    pub capacity: u128,
    pub timestamp: u64,
}

#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct RewardsRemovedEvent {
    pub funder: Address,
    pub range: RangeKey,
    pub duration: DurationTier,
    pub bucket_index: u32,
    pub timestamp: u64,
}

#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct LiquidityLockedEvent {
    pub owner: Address,
    pub lock_id: u64,
    pub liquidity: u128,
    pub amount0: i128,
    pub amount1: i128,
    pub timestamp: u64,
}

#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct LiquidityUnlockedEvent {
    pub owner: Address,
    pub lock_id: u64,
    pub liquidity: u128,
    pub amount0: i128,
    pub amount1: i128,
    pub timestamp: u64,
}

#[contract]
pub struct IncentivesContract;

#[contractimpl]
impl IncentivesContract {
    /// Initialize the contract with the pool engine it settles against
    pub fn initialize(env: Env, pool_engine: Address) -> Result<(), IncentivesError> {
        if env.storage().instance().has(&DataKey::Config) {
            return Err(IncentivesError::AlreadyInitialized);
        }

        let config = IncentivesConfig {
            pool_engine: pool_engine.clone(),
        };
        env.storage().instance().set(&DataKey::Config, &config);

        log!(&env, "Incentives contract initialized with pool engine: {}", pool_engine);

        Ok(())
    }

    /// Stake a bucket of reward tokens against a (range, duration) key.
    /// Anyone may fund; the tokens move into contract custody up front.
    /// Returns the bucket's permanent index under that key.
    pub fn add_rewards(
        env: Env,
        funder: Address,
        range: RangeKey,
        duration: DurationTier,
        tokens: Vec<Address>,
        amounts: Vec<i128>,
        capacity: u128,
    ) -> Result<u32, IncentivesError> {
        funder.require_auth();

        Self::read_config(&env)?;

        if !validate_tick_range(range.tick_lower, range.tick_upper) {
            return Err(IncentivesError::InvalidTickRange);
        }
        if tokens.len() != amounts.len() {
            return Err(IncentivesError::TokensAmountsMismatch);
        }
        // Capacity and reward balances may not exceed the settleable
        // bound: every draw multiplies them by REWARD_SCALE in u128, and
        // the pool engine consumes capacity as i128. A bucket accepted
        // here can always be drawn.
        if tokens.is_empty() || capacity == 0 || capacity > MAX_SETTLEABLE_AMOUNT {
            return Err(IncentivesError::InvalidAmount);
        }
        for amount in amounts.iter() {
            if !validate_positive_amount(amount) || amount as u128 > MAX_SETTLEABLE_AMOUNT {
                return Err(IncentivesError::InvalidAmount);
            }
        }

        // Pull every reward token into custody. A failed transfer aborts the
        // whole invocation, so no partially funded bucket can exist.
        let contract = env.current_contract_address();
        let mut rewards = Vec::new(&env);
        for i in 0..tokens.len() {
            let token_address = tokens.get_unchecked(i);
            let amount = amounts.get_unchecked(i);
            token::Client::new(&env, &token_address).transfer(&funder, &contract, &amount);
            rewards.push_back(TokenAmount {
                token: token_address,
                amount,
            });
        }

        let count_key = DataKey::BucketCount(range.clone(), duration.clone());
        let bucket_index: u32 = env.storage().persistent().get(&count_key).unwrap_or(0);

        let bucket = RewardBucket {
            funder: funder.clone(),
            remaining_liquidity: capacity,
            rewards,
        };
        env.storage().persistent().set(
            &DataKey::Bucket(range.clone(), duration.clone(), bucket_index),
            &BucketSlot::Live(bucket),
        );
        env.storage().persistent().set(&count_key, &(bucket_index + 1));

        let event = RewardsAddedEvent {
            funder: funder.clone(),
            range,
            duration,
            bucket_index,
            capacity,
            timestamp: env.ledger().timestamp(),
        };
        env.events().publish((symbol_short!("add_rwds"),), event);

        log!(&env, "Funder {} added bucket {} with capacity {}", funder, bucket_index, capacity);

        Ok(bucket_index)
    }

    /// Withdraw a bucket's remaining rewards and retire its slot.
    /// Only the original funder may remove. Returns the refunded balances.
    pub fn remove_rewards(
        env: Env,
        caller: Address,
        range: RangeKey,
        duration: DurationTier,
        bucket_index: u32,
    ) -> Result<Vec<TokenAmount>, IncentivesError> {
        caller.require_auth();

        Self::read_config(&env)?;

        let bucket_key = DataKey::Bucket(range.clone(), duration.clone(), bucket_index);
        let bucket = Self::read_live_bucket(&env, &bucket_key)?;

        if bucket.funder != caller {
            return Err(IncentivesError::NotFunder);
        }

        // CEI: tombstone the slot before refunding custody.
        env.storage().persistent().set(&bucket_key, &BucketSlot::Removed);

        let contract = env.current_contract_address();
        for entry in bucket.rewards.iter() {
            if entry.amount > 0 {
                token::Client::new(&env, &entry.token).transfer(&contract, &caller, &entry.amount);
            }
        }

        let event = RewardsRemovedEvent {
            funder: caller.clone(),
            range,
            duration,
            bucket_index,
            timestamp: env.ledger().timestamp(),
        };
        env.events().publish((symbol_short!("rem_rwds"),), event);

        log!(&env, "Funder {} removed bucket {}", caller, bucket_index);

        Ok(bucket.rewards)
    }

    /// Lock liquidity into a price range for a fixed term, drawing an
    /// immediate reward payout from the chosen bucket. Returns the
    /// liquidity actually locked.
    pub fn lock_liquidity(
        env: Env,
        caller: Address,
        params: LockParams,
    ) -> Result<u128, IncentivesError> {
        caller.require_auth();

        let config = Self::read_config(&env)?;

        let now = env.ledger().timestamp();
        if now > params.deadline {
            return Err(IncentivesError::ExpiredDeadline);
        }
        if !validate_tick_range(params.range.tick_lower, params.range.tick_upper) {
            return Err(IncentivesError::InvalidTickRange);
        }

        let price = pool_engine::pool_price(&env, &config.pool_engine, &params.range.pool);
        if price == 0 {
            return Err(IncentivesError::PoolNotInitialized);
        }

        let requested = pool_engine::liquidity_for_amounts(
            &env,
            &config.pool_engine,
            price,
            params.range.tick_lower,
            params.range.tick_upper,
            params.amount0_desired,
            params.amount1_desired,
        );
        if requested == 0 {
            return Err(IncentivesError::NoLiquidity);
        }

        let bucket_key = DataKey::Bucket(
            params.range.clone(),
            params.duration.clone(),
            params.bucket_index,
        );
        let mut bucket = Self::read_live_bucket(&env, &bucket_key)?;
        let (payout, effective) = Self::settle_draw(&env, &mut bucket, requested)?;
        env.storage().persistent().set(&bucket_key, &BucketSlot::Live(bucket));

        let lock_id: u64 = env
            .storage()
            .persistent()
            .get(&DataKey::LockCount(caller.clone()))
            .unwrap_or(0);
        let record = LockRecord {
            owner: caller.clone(),
            range: params.range.clone(),
            duration: params.duration.clone(),
            liquidity: effective,
            created_at: now,
            reward_snapshot: payout.clone(),
            withdrawn: false,
        };
        env.storage()
            .persistent()
            .set(&DataKey::Lock(caller.clone(), lock_id), &record);
        env.storage()
            .persistent()
            .set(&DataKey::LockCount(caller.clone()), &(lock_id + 1));

        // The engine may round the actual amounts against the caller. An Err
        // here makes the host discard the bucket write, the lock record and
        // the engine's position change together.
        let delta = pool_engine::add_liquidity(
            &env,
            &config.pool_engine,
            &params.range.pool,
            params.range.tick_lower,
            params.range.tick_upper,
            effective as i128,
        );
        if delta.amount0 < params.amount0_min || delta.amount1 < params.amount1_min {
            return Err(IncentivesError::TooMuchSlippage);
        }

        // Pay the settled rewards out of custody.
        let contract = env.current_contract_address();
        for entry in payout.iter() {
            if entry.amount > 0 {
                token::Client::new(&env, &entry.token).transfer(&contract, &caller, &entry.amount);
            }
        }

        let event = LiquidityLockedEvent {
            owner: caller.clone(),
            lock_id,
            liquidity: effective,
            amount0: delta.amount0,
            amount1: delta.amount1,
            timestamp: now,
        };
        env.events().publish((symbol_short!("lock"),), event);

        log!(&env, "User {} locked {} liquidity as lock {}", caller, effective, lock_id);

        Ok(effective)
    }

    /// Withdraw a matured lock's liquidity from the pool. The engine routes
    /// the underlying tokens to the position owner.
    pub fn unlock_liquidity(
        env: Env,
        caller: Address,
        lock_id: u64,
        deadline: u64,
    ) -> Result<(), IncentivesError> {
        caller.require_auth();

        let config = Self::read_config(&env)?;

        let now = env.ledger().timestamp();
        if now > deadline {
            return Err(IncentivesError::ExpiredDeadline);
        }

        let lock_key = DataKey::Lock(caller.clone(), lock_id);
        let mut record: LockRecord = env
            .storage()
            .persistent()
            .get(&lock_key)
            .ok_or(IncentivesError::LockNotFound)?;

        if record.withdrawn {
            return Err(IncentivesError::AlreadyUnlocked);
        }

        let maturity = record.created_at + record.duration.seconds();
        if now < maturity {
            log!(&env, "Lock {} matures at {}, current time {}", lock_id, maturity, now);
            return Err(IncentivesError::NotMatured);
        }

        // CEI: mark withdrawn before touching the pool.
        record.withdrawn = true;
        env.storage().persistent().set(&lock_key, &record);

        let removed = pool_engine::remove_liquidity(
            &env,
            &config.pool_engine,
            &record.range.pool,
            record.range.tick_lower,
            record.range.tick_upper,
            -(record.liquidity as i128),
        );

        let event = LiquidityUnlockedEvent {
            owner: caller.clone(),
            lock_id,
            liquidity: record.liquidity,
            amount0: removed.amount0,
            amount1: removed.amount1,
            timestamp: now,
        };
        env.events().publish((symbol_short!("unlock"),), event);

        log!(&env, "User {} unlocked lock {} with {} liquidity", caller, lock_id, record.liquidity);

        Ok(())
    }

    /// Get a live bucket's current state
    pub fn get_bucket(
        env: Env,
        range: RangeKey,
        duration: DurationTier,
        bucket_index: u32,
    ) -> Result<RewardBucket, IncentivesError> {
        Self::read_live_bucket(&env, &DataKey::Bucket(range, duration, bucket_index))
    }

    /// Number of buckets ever created under a (range, duration) key
    pub fn get_bucket_count(env: Env, range: RangeKey, duration: DurationTier) -> u32 {
        env.storage()
            .persistent()
            .get(&DataKey::BucketCount(range, duration))
            .unwrap_or(0)
    }

    /// Get a lock record
    pub fn get_lock(env: Env, owner: Address, lock_id: u64) -> Result<LockRecord, IncentivesError> {
        env.storage()
            .persistent()
            .get(&DataKey::Lock(owner, lock_id))
            .ok_or(IncentivesError::LockNotFound)
    }

    /// Number of locks an owner has ever created
    pub fn get_lock_count(env: Env, owner: Address) -> u64 {
        env.storage()
            .persistent()
            .get(&DataKey::LockCount(owner))
            .unwrap_or(0)
    }

    /// Timestamp at which a lock becomes withdrawable
    pub fn lock_maturity(env: Env, owner: Address, lock_id: u64) -> Result<u64, IncentivesError> {
        let record: LockRecord = env
            .storage()
            .persistent()
            .get(&DataKey::Lock(owner, lock_id))
            .ok_or(IncentivesError::LockNotFound)?;
        Ok(record.created_at + record.duration.seconds())
    }

    /// Get contract configuration
    pub fn get_config(env: Env) -> Result<IncentivesConfig, IncentivesError> {
        Self::read_config(&env)
    }

    // Internal helper functions
    fn read_config(env: &Env) -> Result<IncentivesConfig, IncentivesError> {
        env.storage()
            .instance()
            .get(&DataKey::Config)
            .ok_or(IncentivesError::NotInitialized)
    }

    fn read_live_bucket(env: &Env, key: &DataKey) -> Result<RewardBucket, IncentivesError> {
        let slot: BucketSlot = env
            .storage()
            .persistent()
            .get(key)
            .ok_or(IncentivesError::BucketNotFound)?;
        match slot {
            BucketSlot::Live(bucket) => Ok(bucket),
            BucketSlot::Removed => Err(IncentivesError::BucketRemoved),
        }
    }

    /// Settle one draw against a bucket: every reward token pays out the
    /// same fraction that the draw takes of the remaining capacity, rounded
    /// toward zero. Partial draws may strand dust in the bucket; a draw
    /// that consumes the full remainder pays each token out exactly.
    fn settle_draw(
        env: &Env,
        bucket: &mut RewardBucket,
        requested: u128,
    ) -> Result<(Vec<TokenAmount>, u128), IncentivesError> {
        // State check first: a drained bucket must fail before any ratio
        // math can divide by its zero capacity.
        if bucket.remaining_liquidity == 0 {
            return Err(IncentivesError::BucketExhausted);
        }

        let effective = requested.min(bucket.remaining_liquidity);
        let ratio = effective
            .checked_mul(REWARD_SCALE)
            .ok_or(IncentivesError::NumericOverflow)?
            .checked_div(bucket.remaining_liquidity)
            .ok_or(IncentivesError::NumericOverflow)?;

        let mut payout = Vec::new(env);
        let mut rewards = Vec::new(env);
        for entry in bucket.rewards.iter() {
            let held = entry.amount as u128;
            let paid = held
                .checked_mul(ratio)
                .ok_or(IncentivesError::NumericOverflow)?
                .checked_div(REWARD_SCALE)
                .ok_or(IncentivesError::NumericOverflow)?;
            payout.push_back(TokenAmount {
                token: entry.token.clone(),
                amount: paid as i128,
            });
            rewards.push_back(TokenAmount {
                token: entry.token,
                amount: (held - paid) as i128,
            });
        }

        bucket.rewards = rewards;
        bucket.remaining_liquidity -= effective;

        Ok((payout, effective))
    }
}
