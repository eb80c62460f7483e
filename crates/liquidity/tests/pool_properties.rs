use liquidity::{
    math, AddLiquidityParams, LiquidityError, LiquidityPool, ManualClock, PoolConfig, PoolPhase,
    RemoveLiquidityParams, SwapParams,
};
use proptest::prelude::*;
use std::sync::Arc;
use swap_primitives::{Address, Amount};
use token_ledger::{InMemoryToken, TokenLedger};

const NOW: u64 = 1_000_000;

struct Setup {
    pool: LiquidityPool,
    user: Address,
}

fn setup() -> Setup {
    let token_a = Arc::new(InMemoryToken::new("TKNA", 18));
    let token_b = Arc::new(InMemoryToken::new("TKNB", 18));
    let pool_address = Address::from_label("pool");
    let pool = LiquidityPool::new(
        pool_address,
        token_a.clone(),
        token_b.clone(),
        Arc::new(ManualClock::new(NOW)),
        PoolConfig::default(),
    )
    .unwrap();

    let user = Address::from_label("user");
    for token in [&token_a, &token_b] {
        token.mint(&user, &Amount::from_u128(u128::MAX)).unwrap();
        token.approve(&user, &pool_address, &Amount::max_value()).unwrap();
    }
    Setup { pool, user }
}

fn deposit(
    s: &mut Setup,
    a: u128,
    b: u128,
) -> Result<liquidity::AddLiquidityResult, LiquidityError> {
    let params = AddLiquidityParams {
        token_a: s.pool.token_a(),
        token_b: s.pool.token_b(),
        amount_a_desired: Amount::from_u128(a),
        amount_b_desired: Amount::from_u128(b),
        amount_a_min: Amount::zero(),
        amount_b_min: Amount::zero(),
        to: s.user,
        deadline: NOW,
    };
    let user = s.user;
    s.pool.add_liquidity(&user, params)
}

fn swap(s: &mut Setup, a_to_b: bool, amount_in: u128) -> Result<Amount, LiquidityError> {
    let token_in = if a_to_b { s.pool.token_a() } else { s.pool.token_b() };
    let user = s.user;
    s.pool.swap(
        &user,
        SwapParams {
            token_in,
            amount_in: Amount::from_u128(amount_in),
            amount_out_min: Amount::zero(),
            to: user,
            deadline: NOW,
        },
    )
}

fn u(amount: &Amount) -> u128 {
    amount.to_u128().unwrap()
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn prop_deposit_preserves_ratio(
        ra in 1_000u128..1_000_000_000_000,
        rb in 1_000u128..1_000_000_000_000,
        da in 1_000u128..1_000_000_000_000,
        db in 1_000u128..1_000_000_000_000,
    ) {
        let mut s = setup();
        deposit(&mut s, ra, rb).unwrap();
        let total = u(&s.pool.total_liquidity());

        let result = match deposit(&mut s, da, db) {
            Ok(result) => result,
            Err(LiquidityError::InsufficientLiquidityMinted { .. }) => return Ok(()),
            Err(other) => return Err(TestCaseError::fail(other.to_string())),
        };
        let (ua, ub, minted) = (u(&result.amount_a), u(&result.amount_b), u(&result.minted));

        prop_assert!(ua <= da && ub <= db);
        // Used amounts sit on the reserve ratio up to one unit of rounding
        let lhs = ua * rb;
        let rhs = ub * ra;
        prop_assert!(lhs.abs_diff(rhs) < ra.max(rb));
        // Minted shares are the least diluting proportional amount
        prop_assert_eq!(minted, (ua * total / ra).min(ub * total / rb));
        prop_assert!(s.pool.audit().is_ok());
    }

    #[test]
    fn prop_swaps_never_decrease_k(
        ra in 1_000u128..1_000_000_000_000,
        rb in 1_000u128..1_000_000_000_000,
        trades in proptest::collection::vec((any::<bool>(), 1u128..10_000_000_000), 1..20),
    ) {
        let mut s = setup();
        deposit(&mut s, ra, rb).unwrap();

        for (a_to_b, amount_in) in trades {
            let k_before = s.pool.state().k().unwrap();
            let before = s.pool.reserves();
            match swap(&mut s, a_to_b, amount_in) {
                Ok(_) => {
                    prop_assert!(s.pool.state().k().unwrap() >= k_before);
                }
                Err(LiquidityError::InsufficientOutputAmount { .. }) => {
                    prop_assert_eq!(s.pool.reserves(), before);
                }
                Err(other) => return Err(TestCaseError::fail(other.to_string())),
            }
            prop_assert_eq!(s.pool.phase(), PoolPhase::Funded);
        }
        prop_assert!(s.pool.audit().is_ok());
    }

    #[test]
    fn prop_deposit_withdraw_round_trip(
        a in 1_000u128..u64::MAX as u128,
        b in 1u128..u64::MAX as u128,
    ) {
        let mut s = setup();
        let minted = deposit(&mut s, a, b).unwrap().minted;
        let user = s.user;

        let out = s.pool.remove_liquidity(&user, RemoveLiquidityParams {
            token_a: s.pool.token_a(),
            token_b: s.pool.token_b(),
            shares: minted,
            amount_a_min: Amount::zero(),
            amount_b_min: Amount::zero(),
            to: user,
            deadline: NOW,
        }).unwrap();

        prop_assert!(u(&out.amount_a) <= a && u(&out.amount_b) <= b);
        prop_assert_eq!(u(&out.amount_a), a);
        prop_assert_eq!(u(&out.amount_b), b);
        prop_assert_eq!(s.pool.phase(), PoolPhase::Empty);
        prop_assert!(s.pool.audit().is_ok());
    }

    #[test]
    fn prop_fee_is_always_charged(
        amount_in in 1u128..1_000_000_000_000,
        reserve_in in 1u128..1_000_000_000_000,
        reserve_out in 1u128..1_000_000_000_000,
    ) {
        let out = math::get_amount_out(
            &Amount::from_u128(amount_in),
            &Amount::from_u128(reserve_in),
            &Amount::from_u128(reserve_out),
        ).unwrap();
        // out < reserve_out * amount_in / (reserve_in + amount_in), the zero-fee output
        let lhs = out.checked_mul(&Amount::from_u128(reserve_in + amount_in)).unwrap();
        let rhs = Amount::from_u128(reserve_out)
            .checked_mul(&Amount::from_u128(amount_in))
            .unwrap();
        prop_assert!(lhs < rhs);
        prop_assert!(u(&out) < reserve_out);
    }
}

#[test]
fn test_reference_scenario() {
    let mut s = setup();
    deposit(&mut s, 1000, 2000).unwrap();

    let (a, b) = (s.pool.token_a(), s.pool.token_b());
    assert_eq!(s.pool.get_price(&a, &b).unwrap(), Amount::from_units(2, 18));

    let out = swap(&mut s, true, 10).unwrap();
    // floor(2000 * 9970 / (1000 * 1000 + 9970)) = floor(19.74)
    assert_eq!(out, Amount::from_u64(19));
    assert_eq!(s.pool.reserve_a(), Amount::from_u64(1010));
    assert_eq!(s.pool.reserve_b(), Amount::from_u64(2000 - 19));
}

#[test]
fn test_expired_deadline_leaves_state_unchanged() {
    let mut s = setup();
    deposit(&mut s, 10_000, 20_000).unwrap();
    let before = s.pool.state().clone();
    let events_before = s.pool.events().len();
    let user = s.user;
    let (a, b) = (s.pool.token_a(), s.pool.token_b());
    let past = NOW - 1;

    let add = s.pool.add_liquidity(
        &user,
        AddLiquidityParams {
            token_a: a,
            token_b: b,
            amount_a_desired: Amount::from_u64(5_000),
            amount_b_desired: Amount::from_u64(10_000),
            amount_a_min: Amount::zero(),
            amount_b_min: Amount::zero(),
            to: user,
            deadline: past,
        },
    );
    let remove = s.pool.remove_liquidity(
        &user,
        RemoveLiquidityParams {
            token_a: a,
            token_b: b,
            shares: Amount::from_u64(5_000),
            amount_a_min: Amount::zero(),
            amount_b_min: Amount::zero(),
            to: user,
            deadline: past,
        },
    );
    let swapped = s.pool.swap(
        &user,
        SwapParams {
            token_in: a,
            amount_in: Amount::from_u64(100),
            amount_out_min: Amount::zero(),
            to: user,
            deadline: past,
        },
    );

    for err in [add.unwrap_err(), remove.unwrap_err(), swapped.unwrap_err()] {
        assert_eq!(err.category(), liquidity::ErrorCategory::Temporal);
    }
    assert_eq!(s.pool.state(), &before);
    assert_eq!(s.pool.events().len(), events_before);
}

#[test]
fn test_full_cycle_returns_to_empty_and_reseeds() {
    let mut s = setup();
    let minted = deposit(&mut s, 5_000, 7_000).unwrap().minted;
    swap(&mut s, true, 1_000).unwrap();
    swap(&mut s, false, 500).unwrap();

    let user = s.user;
    let (a, b) = (s.pool.token_a(), s.pool.token_b());
    let out = s
        .pool
        .remove_liquidity(
            &user,
            RemoveLiquidityParams {
                token_a: a,
                token_b: b,
                shares: minted,
                amount_a_min: Amount::zero(),
                amount_b_min: Amount::zero(),
                to: user,
                deadline: NOW,
            },
        )
        .unwrap();

    // Fees stay in the pool and go to the last provider
    let total_out = u(&out.amount_a) * u(&out.amount_b);
    assert!(total_out >= 5_000 * 7_000);
    assert_eq!(s.pool.phase(), PoolPhase::Empty);

    // Empty -> Funded again with a fresh ratio
    let reseed = deposit(&mut s, 3_000, 3_000).unwrap();
    assert_eq!(reseed.minted, Amount::from_u64(3_000));
    assert_eq!(s.pool.price_a_to_b().unwrap(), Amount::from_units(1, 18));
}
