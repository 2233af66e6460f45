//! Property-Based Tests - Decimal Algebra and Book Invariants
//!
//! Uses `proptest` to verify that the decimal string helpers and the
//! order book reconstructor hold their invariants across random inputs.

use proptest::prelude::*;

use oanda_bridge::domain::decimal;
use oanda_bridge::domain::orderbook::{reconstruct, Bucket};

/// Fixed-point decimal strings with up to 8 fractional digits.
fn decimal_string() -> impl Strategy<Value = String> {
    (any::<bool>(), 0u64..10_000_000, 0u32..=8).prop_map(|(negative, digits, scale)| {
        let value = rust_decimal::Decimal::new(i64::try_from(digits).unwrap_or(0), scale);
        if negative && !value.is_zero() {
            format!("-{value}")
        } else {
            value.to_string()
        }
    })
}

// ── Decimal Algebra Properties ──────────────────────────────

proptest! {
    /// gt and lt are mirror images and never both hold.
    #[test]
    fn gt_lt_are_antisymmetric(a in decimal_string(), b in decimal_string()) {
        let gt = decimal::gt(&a, &b).unwrap();
        let lt = decimal::lt(&b, &a).unwrap();
        prop_assert_eq!(gt, lt);
        prop_assert!(!(decimal::gt(&a, &b).unwrap() && decimal::lt(&a, &b).unwrap()));
    }

    /// Addition is commutative on value.
    #[test]
    fn add_is_commutative(a in decimal_string(), b in decimal_string()) {
        let ab = decimal::add(&a, &b).unwrap();
        let ba = decimal::add(&b, &a).unwrap();
        prop_assert_eq!(decimal::compare(&ab, &ba).unwrap(), std::cmp::Ordering::Equal);
    }

    /// abs is never negative and equals abs of the negation.
    #[test]
    fn abs_is_sign_free(a in decimal_string()) {
        let abs = decimal::abs(&a).unwrap();
        prop_assert!(!decimal::lt(&abs, "0").unwrap());
        let negated = decimal::negate(&a).unwrap();
        prop_assert_eq!(
            decimal::compare(&abs, &decimal::abs(&negated).unwrap()).unwrap(),
            std::cmp::Ordering::Equal
        );
    }

    /// Trailing zeros never change a comparison.
    #[test]
    fn trailing_zeros_are_insignificant(a in decimal_string()) {
        let padded = if a.contains('.') { format!("{a}000") } else { format!("{a}.000") };
        prop_assert_eq!(decimal::compare(&a, &padded).unwrap(), std::cmp::Ordering::Equal);
    }
}

// ── Order Book Properties ───────────────────────────────────

proptest! {
    /// Every bucket lands on exactly one side, bids below and asks
    /// above the reference, each side sorted best first.
    #[test]
    fn book_sides_partition_buckets(
        ticks in proptest::collection::hash_set(1u32..2000, 0..40),
        reference_tick in 1u32..2000,
    ) {
        let buckets: Vec<Bucket> = ticks
            .iter()
            .filter(|t| **t != reference_tick)
            .map(|t| Bucket {
                price: format!("1.{t:04}"),
                long_count_percent: "0.0100".to_string(),
                short_count_percent: "0.0050".to_string(),
            })
            .collect();
        let reference = format!("1.{reference_tick:04}");

        let (bids, asks) = reconstruct(&buckets, &reference).unwrap();
        prop_assert_eq!(bids.len() + asks.len(), buckets.len());
        for level in &bids {
            prop_assert!(decimal::lt(&level.price, &reference).unwrap());
            prop_assert_eq!(level.volume.as_str(), "0.0150");
        }
        for level in &asks {
            prop_assert!(decimal::gt(&level.price, &reference).unwrap());
        }
        for pair in bids.windows(2) {
            prop_assert!(decimal::gt(&pair[0].price, &pair[1].price).unwrap());
        }
        for pair in asks.windows(2) {
            prop_assert!(decimal::lt(&pair[0].price, &pair[1].price).unwrap());
        }
    }
}
