// liquidity/src/math.rs

//! Pure constant-product formulas
//!
//! All functions are stateless and operate on checked 256-bit amounts; any
//! intermediate overflow is reported as [`LiquidityError::Arithmetic`]
//! rather than wrapping.

use crate::{checked, LiquidityError, LiquidityResult};
use serde::{Deserialize, Serialize};
use swap_primitives::Amount;

/// Basis-point denominator for fees (10_000 bps = 100%)
pub const FEE_DENOMINATOR: u64 = 10_000;

/// Default swap fee: 30 bps, i.e. the 997/1000 multiplier
pub const DEFAULT_FEE_BPS: u16 = 30;

/// Smallest share amount a deposit may mint
pub const MINIMUM_LIQUIDITY: u64 = 1_000;

/// Decimal digits of the fixed-point price scale (SCALE = 10^18)
pub const PRICE_PRECISION: u32 = 18;

/// Output of a swap simulation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SwapQuote {
    /// Input amount
    pub amount_in: Amount,
    /// Output amount after fee
    pub amount_out: Amount,
    /// Portion of the input retained by the pool as fee
    pub fee_amount: Amount,
    /// Shortfall versus the spot-price output, in basis points
    pub price_impact_bps: u64,
}

fn ensure_reserves(reserve_in: &Amount, reserve_out: &Amount) -> LiquidityResult<()> {
    if reserve_in.is_zero() || reserve_out.is_zero() {
        return Err(LiquidityError::InsufficientLiquidity);
    }
    Ok(())
}

fn fee_multiplier(fee_bps: u16) -> LiquidityResult<Amount> {
    if fee_bps == 0 || u64::from(fee_bps) >= FEE_DENOMINATOR {
        return Err(LiquidityError::InvalidConfiguration(format!(
            "fee must be within 1..{FEE_DENOMINATOR} bps, got {fee_bps}"
        )));
    }
    Ok(Amount::from_u64(FEE_DENOMINATOR - u64::from(fee_bps)))
}

/// Amount of the other asset equivalent to `amount_a` at the current ratio
///
/// `amount_b = amount_a * reserve_b / reserve_a`, rounded down.
pub fn quote(amount_a: &Amount, reserve_a: &Amount, reserve_b: &Amount) -> LiquidityResult<Amount> {
    if amount_a.is_zero() {
        return Err(LiquidityError::InvalidAmount("quote amount is zero".into()));
    }
    ensure_reserves(reserve_a, reserve_b)?;

    let numerator = checked(amount_a.checked_mul(reserve_b), "quote numerator")?;
    checked(numerator.checked_div(reserve_a), "quote division")
}

/// Output for an exact input at the default 0.3% fee
pub fn get_amount_out(
    amount_in: &Amount,
    reserve_in: &Amount,
    reserve_out: &Amount,
) -> LiquidityResult<Amount> {
    get_amount_out_with_fee(amount_in, reserve_in, reserve_out, DEFAULT_FEE_BPS)
}

/// Output for an exact input
///
/// ```text
/// in_with_fee = amount_in * (10000 - fee_bps)
/// amount_out  = reserve_out * in_with_fee / (reserve_in * 10000 + in_with_fee)
/// ```
pub fn get_amount_out_with_fee(
    amount_in: &Amount,
    reserve_in: &Amount,
    reserve_out: &Amount,
    fee_bps: u16,
) -> LiquidityResult<Amount> {
    if amount_in.is_zero() {
        return Err(LiquidityError::InvalidAmount("input amount is zero".into()));
    }
    ensure_reserves(reserve_in, reserve_out)?;
    let multiplier = fee_multiplier(fee_bps)?;

    let in_with_fee = checked(amount_in.checked_mul(&multiplier), "input with fee")?;
    let numerator = checked(reserve_out.checked_mul(&in_with_fee), "swap numerator")?;
    let scaled_reserve = checked(
        reserve_in.checked_mul(&Amount::from_u64(FEE_DENOMINATOR)),
        "scaled reserve",
    )?;
    let denominator = checked(scaled_reserve.checked_add(&in_with_fee), "swap denominator")?;

    checked(numerator.checked_div(&denominator), "swap division")
}

/// Minimum input that yields at least `amount_out`
///
/// Inverse of [`get_amount_out_with_fee`], rounded up.
pub fn get_amount_in(
    amount_out: &Amount,
    reserve_in: &Amount,
    reserve_out: &Amount,
    fee_bps: u16,
) -> LiquidityResult<Amount> {
    if amount_out.is_zero() {
        return Err(LiquidityError::InvalidAmount("output amount is zero".into()));
    }
    ensure_reserves(reserve_in, reserve_out)?;
    if amount_out >= reserve_out {
        return Err(LiquidityError::InsufficientLiquidity);
    }
    let multiplier = fee_multiplier(fee_bps)?;

    let numerator = checked(
        reserve_in
            .checked_mul(amount_out)
            .and_then(|n| n.checked_mul(&Amount::from_u64(FEE_DENOMINATOR))),
        "amount-in numerator",
    )?;
    let remaining = checked(reserve_out.checked_sub(amount_out), "remaining reserve")?;
    let denominator = checked(remaining.checked_mul(&multiplier), "amount-in denominator")?;
    let floor = checked(numerator.checked_div(&denominator), "amount-in division")?;

    checked(floor.checked_add(&Amount::one()), "amount-in rounding")
}

/// Amounts actually taken from a deposit request
///
/// On an empty pool the desired amounts are used as-is. Otherwise the side
/// that binds first at the current reserve ratio is used in full and the
/// other side is reduced to match, subject to the caller's minimums.
pub fn optimal_deposit(
    desired_a: &Amount,
    desired_b: &Amount,
    min_a: &Amount,
    min_b: &Amount,
    reserve_a: &Amount,
    reserve_b: &Amount,
) -> LiquidityResult<(Amount, Amount)> {
    if reserve_a.is_zero() && reserve_b.is_zero() {
        if desired_a < min_a {
            return Err(LiquidityError::InsufficientAmountA {
                actual: desired_a.clone(),
                minimum: min_a.clone(),
            });
        }
        if desired_b < min_b {
            return Err(LiquidityError::InsufficientAmountB {
                actual: desired_b.clone(),
                minimum: min_b.clone(),
            });
        }
        return Ok((desired_a.clone(), desired_b.clone()));
    }

    let optimal_b = quote(desired_a, reserve_a, reserve_b)?;
    if &optimal_b <= desired_b {
        if &optimal_b < min_b {
            return Err(LiquidityError::InsufficientAmountB {
                actual: optimal_b,
                minimum: min_b.clone(),
            });
        }
        return Ok((desired_a.clone(), optimal_b));
    }

    let optimal_a = quote(desired_b, reserve_b, reserve_a)?;
    // optimal_b > desired_b implies optimal_a <= desired_a
    if &optimal_a > desired_a {
        return Err(LiquidityError::InvariantViolation(
            "optimal A exceeds desired A".into(),
        ));
    }
    if &optimal_a < min_a {
        return Err(LiquidityError::InsufficientAmountA {
            actual: optimal_a,
            minimum: min_a.clone(),
        });
    }
    Ok((optimal_a, desired_b.clone()))
}

/// Shares minted for a deposit of `(amount_a, amount_b)`
///
/// The first deposit mints exactly `amount_a` shares. Later deposits mint
/// `min(amount_a * total / reserve_a, amount_b * total / reserve_b)`, the
/// least diluting side.
pub fn shares_to_mint(
    amount_a: &Amount,
    amount_b: &Amount,
    reserve_a: &Amount,
    reserve_b: &Amount,
    total_shares: &Amount,
) -> LiquidityResult<Amount> {
    if total_shares.is_zero() {
        return Ok(amount_a.clone());
    }
    ensure_reserves(reserve_a, reserve_b)?;

    let from_a = checked(
        amount_a
            .checked_mul(total_shares)
            .and_then(|n| n.checked_div(reserve_a)),
        "shares from A",
    )?;
    let from_b = checked(
        amount_b
            .checked_mul(total_shares)
            .and_then(|n| n.checked_div(reserve_b)),
        "shares from B",
    )?;

    Ok(from_a.min(from_b))
}

/// Pro-rata reserves released by burning `shares`
pub fn pro_rata(
    shares: &Amount,
    reserve_a: &Amount,
    reserve_b: &Amount,
    total_shares: &Amount,
) -> LiquidityResult<(Amount, Amount)> {
    if total_shares.is_zero() {
        return Err(LiquidityError::InsufficientLiquidity);
    }
    if shares > total_shares {
        return Err(LiquidityError::InsufficientShares {
            required: shares.clone(),
            available: total_shares.clone(),
        });
    }

    let amount_a = checked(
        reserve_a
            .checked_mul(shares)
            .and_then(|n| n.checked_div(total_shares)),
        "withdraw A",
    )?;
    let amount_b = checked(
        reserve_b
            .checked_mul(shares)
            .and_then(|n| n.checked_div(total_shares)),
        "withdraw B",
    )?;
    Ok((amount_a, amount_b))
}

/// Spot price `reserve_out * 10^precision / reserve_in`
pub fn spot_price(
    reserve_in: &Amount,
    reserve_out: &Amount,
    precision: u32,
) -> LiquidityResult<Amount> {
    ensure_reserves(reserve_in, reserve_out)?;
    checked(
        reserve_out
            .checked_mul(&Amount::pow10(precision))
            .and_then(|n| n.checked_div(reserve_in)),
        "spot price",
    )
}

/// Full quote for an exact-input swap
pub fn swap_quote(
    amount_in: &Amount,
    reserve_in: &Amount,
    reserve_out: &Amount,
    fee_bps: u16,
) -> LiquidityResult<SwapQuote> {
    let amount_out = get_amount_out_with_fee(amount_in, reserve_in, reserve_out, fee_bps)?;

    let fee_amount = checked(
        amount_in
            .checked_mul(&Amount::from_u64(u64::from(fee_bps)))
            .and_then(|n| n.checked_div(&Amount::from_u64(FEE_DENOMINATOR))),
        "fee amount",
    )?;

    let ideal = checked(
        amount_in
            .checked_mul(reserve_out)
            .and_then(|n| n.checked_div(reserve_in)),
        "ideal output",
    )?;
    let price_impact_bps = if ideal.is_zero() {
        0
    } else {
        let shortfall = ideal.checked_sub(&amount_out).unwrap_or_else(Amount::zero);
        let bps = checked(
            shortfall
                .checked_mul(&Amount::from_u64(FEE_DENOMINATOR))
                .and_then(|n| n.checked_div(&ideal)),
            "price impact",
        )?;
        bps.to_u128().map_or(FEE_DENOMINATOR, |v| v as u64)
    };

    Ok(SwapQuote {
        amount_in: amount_in.clone(),
        amount_out,
        fee_amount,
        price_impact_bps,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn amt(v: u64) -> Amount {
        Amount::from_u64(v)
    }

    #[test]
    fn test_amount_out_reference_scenario() {
        // 2000 * 9970 / (1000 * 1000 + 9970) = 19.74..
        let out = get_amount_out(&amt(10), &amt(1000), &amt(2000)).unwrap();
        assert_eq!(out, amt(19));
    }

    #[test]
    fn test_amount_out_matches_997_over_1000() {
        let amount_in = Amount::from_units(10, 18);
        let reserve_in = Amount::from_units(100, 18);
        let reserve_out = Amount::from_units(200, 18);

        let with_fee = amount_in.checked_mul(&amt(997)).unwrap();
        let expected = reserve_out
            .checked_mul(&with_fee)
            .unwrap()
            .checked_div(
                &reserve_in
                    .checked_mul(&amt(1000))
                    .unwrap()
                    .checked_add(&with_fee)
                    .unwrap(),
            )
            .unwrap();

        assert_eq!(
            get_amount_out(&amount_in, &reserve_in, &reserve_out).unwrap(),
            expected
        );
    }

    #[test]
    fn test_amount_out_domain_checks() {
        assert!(matches!(
            get_amount_out(&amt(0), &amt(1000), &amt(1000)),
            Err(LiquidityError::InvalidAmount(_))
        ));
        assert_eq!(
            get_amount_out(&amt(10), &amt(0), &amt(1000)),
            Err(LiquidityError::InsufficientLiquidity)
        );
        assert_eq!(
            get_amount_out(&amt(10), &amt(1000), &amt(0)),
            Err(LiquidityError::InsufficientLiquidity)
        );
        assert!(matches!(
            get_amount_out_with_fee(&amt(10), &amt(1000), &amt(1000), 0),
            Err(LiquidityError::InvalidConfiguration(_))
        ));
    }

    #[test]
    fn test_amount_out_overflow_is_reported() {
        let huge = Amount::max_value();
        assert!(matches!(
            get_amount_out(&huge, &amt(1), &amt(1)),
            Err(LiquidityError::Arithmetic(_))
        ));
    }

    #[test]
    fn test_amount_in_inverts_amount_out() {
        let reserve_in = amt(1_000_000);
        let reserve_out = amt(2_000_000);
        let wanted = amt(5_000);

        let needed = get_amount_in(&wanted, &reserve_in, &reserve_out, DEFAULT_FEE_BPS).unwrap();
        let got = get_amount_out(&needed, &reserve_in, &reserve_out).unwrap();
        assert!(got >= wanted);

        let one_less = needed.checked_sub(&Amount::one()).unwrap();
        assert!(get_amount_out(&one_less, &reserve_in, &reserve_out).unwrap() < wanted);
    }

    #[test]
    fn test_amount_in_cannot_drain_reserve() {
        assert_eq!(
            get_amount_in(&amt(1000), &amt(1000), &amt(1000), DEFAULT_FEE_BPS),
            Err(LiquidityError::InsufficientLiquidity)
        );
    }

    #[test]
    fn test_quote() {
        assert_eq!(quote(&amt(50), &amt(100), &amt(200)).unwrap(), amt(100));
        assert_eq!(quote(&amt(1), &amt(3), &amt(2)).unwrap(), amt(0));
        assert!(quote(&amt(0), &amt(100), &amt(200)).is_err());
    }

    #[test]
    fn test_optimal_deposit_first_deposit_uses_desired() {
        let (a, b) =
            optimal_deposit(&amt(100), &amt(200), &amt(0), &amt(0), &amt(0), &amt(0)).unwrap();
        assert_eq!((a, b), (amt(100), amt(200)));
    }

    #[test]
    fn test_optimal_deposit_reduces_b() {
        // Ratio 1:2, offering 50 A with 150 B only needs 100 B
        let (a, b) =
            optimal_deposit(&amt(50), &amt(150), &amt(0), &amt(0), &amt(100), &amt(200)).unwrap();
        assert_eq!((a, b), (amt(50), amt(100)));
    }

    #[test]
    fn test_optimal_deposit_reduces_a() {
        // Offering 80 A with 100 B only needs 50 A
        let (a, b) =
            optimal_deposit(&amt(80), &amt(100), &amt(0), &amt(0), &amt(100), &amt(200)).unwrap();
        assert_eq!((a, b), (amt(50), amt(100)));
    }

    #[test]
    fn test_optimal_deposit_enforces_minimums() {
        let err = optimal_deposit(&amt(50), &amt(150), &amt(0), &amt(101), &amt(100), &amt(200))
            .unwrap_err();
        assert!(matches!(err, LiquidityError::InsufficientAmountB { .. }));

        let err = optimal_deposit(&amt(80), &amt(100), &amt(60), &amt(0), &amt(100), &amt(200))
            .unwrap_err();
        assert!(matches!(err, LiquidityError::InsufficientAmountA { .. }));
    }

    #[test]
    fn test_shares_to_mint() {
        assert_eq!(
            shares_to_mint(&amt(100), &amt(200), &amt(0), &amt(0), &amt(0)).unwrap(),
            amt(100)
        );
        assert_eq!(
            shares_to_mint(&amt(50), &amt(100), &amt(100), &amt(200), &amt(100)).unwrap(),
            amt(50)
        );
        // Excess B does not earn extra shares
        assert_eq!(
            shares_to_mint(&amt(50), &amt(400), &amt(100), &amt(200), &amt(100)).unwrap(),
            amt(50)
        );
    }

    #[test]
    fn test_pro_rata() {
        let (a, b) = pro_rata(&amt(25), &amt(100), &amt(200), &amt(100)).unwrap();
        assert_eq!((a, b), (amt(25), amt(50)));

        let (a, b) = pro_rata(&amt(100), &amt(100), &amt(200), &amt(100)).unwrap();
        assert_eq!((a, b), (amt(100), amt(200)));

        assert!(matches!(
            pro_rata(&amt(101), &amt(100), &amt(200), &amt(100)),
            Err(LiquidityError::InsufficientShares { .. })
        ));
        assert_eq!(
            pro_rata(&amt(1), &amt(0), &amt(0), &amt(0)),
            Err(LiquidityError::InsufficientLiquidity)
        );
    }

    #[test]
    fn test_spot_price() {
        let two = spot_price(&amt(1000), &amt(2000), PRICE_PRECISION).unwrap();
        assert_eq!(two, Amount::from_units(2, 18));

        let half = spot_price(&amt(2000), &amt(1000), PRICE_PRECISION).unwrap();
        assert_eq!(half, Amount::from_u64(500_000_000_000_000_000));

        assert_eq!(
            spot_price(&amt(0), &amt(1000), PRICE_PRECISION),
            Err(LiquidityError::InsufficientLiquidity)
        );
    }

    #[test]
    fn test_swap_quote_fields() {
        let quote = swap_quote(&amt(10_000), &amt(1_000_000), &amt(1_000_000), 30).unwrap();
        assert_eq!(quote.fee_amount, amt(30));
        assert!(quote.amount_out < amt(10_000));
        // 0.3% fee plus ~1% curve slippage
        assert!(quote.price_impact_bps >= 30 && quote.price_impact_bps < 200);
    }
}
