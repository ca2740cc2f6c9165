// Edge case tests for mathematical operations

use common_constants::{MAX_HEALTH_FACTOR, RAY, WAD};
use common_math::SharedMathModule;
use multiversx_sc::types::{BigUint, ManagedDecimal};
use multiversx_sc_scenario::api::StaticApi;

pub struct MathTester;
impl multiversx_sc::contract_base::ContractBase for MathTester {
    type Api = StaticApi;
}
impl SharedMathModule for MathTester {}

// ============== EXTREME PRECISION TESTS ==============

#[test]
fn test_wad_ray_precision_edge_cases() {
    let tester = MathTester;

    let a = ManagedDecimal::<StaticApi, usize>::from_raw_units(BigUint::from(WAD), 18);
    let b = ManagedDecimal::<StaticApi, usize>::from_raw_units(BigUint::from(WAD * 2), 18);
    let result = tester.mul_half_up(&a, &b, 18);
    assert_eq!(result.into_raw_units(), &BigUint::from(WAD * 2));

    let ray_val = ManagedDecimal::<StaticApi, usize>::from_raw_units(BigUint::from(RAY), 27);
    let wad_val = ManagedDecimal::<StaticApi, usize>::from_raw_units(BigUint::from(WAD), 18);
    let result = tester.div_half_up(&ray_val, &wad_val, 9);
    assert_eq!(result.into_raw_units(), &BigUint::from(1_000_000_000u64));
}

#[test]
fn test_large_operands_do_not_overflow() {
    let tester = MathTester;

    // 1e12 tokens at RAY precision squared stays exact in the big integer domain
    let big = ManagedDecimal::<StaticApi, usize>::from_raw_units(
        BigUint::from(RAY) * BigUint::from(1_000_000_000_000u64),
        27,
    );
    let result = tester.ray_mul(&big, &big);
    let expected = BigUint::from(RAY) * BigUint::from(1_000_000_000_000_000_000_000_000u128);
    assert_eq!(result.into_raw_units(), &expected);
}

// ============== ZERO AND ONE TESTS ==============

#[test]
fn test_operations_with_zero_and_one() {
    let tester = MathTester;

    let zero = ManagedDecimal::<StaticApi, usize>::from_raw_units(BigUint::from(0u64), 5);
    let one = ManagedDecimal::<StaticApi, usize>::from_raw_units(BigUint::from(100000u64), 5);

    let result = tester.mul_half_up(&one, &zero, 5);
    assert_eq!(result.into_raw_units(), &BigUint::from(0u64));

    let result = tester.div_half_up(&zero, &one, 5);
    assert_eq!(result.into_raw_units(), &BigUint::from(0u64));

    let result = tester.div_ceil(&zero, &one, 5);
    assert_eq!(result.into_raw_units(), &BigUint::from(0u64));

    let result = tester.mul_half_up(&one, &one, 5);
    assert_eq!(result.into_raw_units(), &BigUint::from(100000u64));
}

#[test]
#[should_panic]
fn test_division_by_zero_is_fatal() {
    let tester = MathTester;

    let one = tester.ray();
    let zero = tester.ray_zero();
    let _ = tester.ray_div(&one, &zero);
}

#[test]
fn test_saturating_sub_and_min_max() {
    let tester = MathTester;

    let small = tester.to_decimal_wad(BigUint::from(WAD));
    let large = tester.to_decimal_wad(BigUint::from(WAD * 3));

    assert_eq!(
        tester.saturating_sub(&small, &large).into_raw_units(),
        &BigUint::zero()
    );
    assert_eq!(
        tester.saturating_sub(&large, &small).into_raw_units(),
        &BigUint::from(WAD * 2)
    );
    assert!(tester.get_min(small.clone(), large.clone()) == small);
    assert!(tester.get_max(small, large.clone()) == large);
}

#[test]
fn test_unit_constructors() {
    let tester = MathTester;

    assert_eq!(tester.ray().into_raw_units(), &BigUint::from(RAY));
    assert_eq!(tester.wad().into_raw_units(), &BigUint::from(WAD));
    assert_eq!(tester.bps().into_raw_units(), &BigUint::from(10_000u64));
    assert_eq!(tester.bps_zero().scale(), 4);
    assert_eq!(
        tester.max_health_factor().into_raw_units(),
        &BigUint::from(MAX_HEALTH_FACTOR)
    );
}
