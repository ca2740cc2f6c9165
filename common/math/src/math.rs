#![no_std]

use common_constants::{
    BPS, BPS_PRECISION, MAX_HEALTH_FACTOR, RAY, RAY_PRECISION, WAD, WAD_PRECISION,
};

multiversx_sc::imports!();

/// Direction an inexact quotient is rounded in.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Rounding {
    Floor,
    HalfUp,
    Ceil,
}

fn pow10<M: ManagedTypeApi>(exponent: NumDecimals) -> BigUint<M> {
    BigUint::from(10u64).pow(exponent as u32)
}

fn divide<M: ManagedTypeApi>(
    numerator: BigUint<M>,
    denominator: &BigUint<M>,
    rounding: Rounding,
) -> BigUint<M> {
    match rounding {
        Rounding::Floor => numerator / denominator,
        Rounding::HalfUp => (numerator + &(denominator / 2u64)) / denominator,
        Rounding::Ceil => (numerator + denominator - &BigUint::from(1u64)) / denominator,
    }
}

/// Fixed-point primitives shared by every component of the engine.
///
/// Values are `ManagedDecimal`s carrying their own scale. Products and quotients
/// take the precision of the result explicitly, bring both operands to it and
/// round exactly once.
#[multiversx_sc::module]
pub trait SharedMathModule {
    /// `a * b` at `precision`, rounded as requested.
    fn mul_rounded(
        &self,
        a: &ManagedDecimal<Self::Api, NumDecimals>,
        b: &ManagedDecimal<Self::Api, NumDecimals>,
        precision: NumDecimals,
        rounding: Rounding,
    ) -> ManagedDecimal<Self::Api, NumDecimals> {
        let product = a.rescale(precision).into_raw_units() * b.rescale(precision).into_raw_units();
        self.to_decimal(divide(product, &pow10(precision), rounding), precision)
    }

    /// `a / b` at `precision`, rounded as requested. Panics when `b` is zero.
    fn div_rounded(
        &self,
        a: &ManagedDecimal<Self::Api, NumDecimals>,
        b: &ManagedDecimal<Self::Api, NumDecimals>,
        precision: NumDecimals,
        rounding: Rounding,
    ) -> ManagedDecimal<Self::Api, NumDecimals> {
        let numerator = a.rescale(precision).into_raw_units() * &pow10(precision);
        let denominator = b.rescale(precision).into_raw_units().clone();
        self.to_decimal(divide(numerator, &denominator, rounding), precision)
    }

    fn mul_half_up(
        &self,
        a: &ManagedDecimal<Self::Api, NumDecimals>,
        b: &ManagedDecimal<Self::Api, NumDecimals>,
        precision: NumDecimals,
    ) -> ManagedDecimal<Self::Api, NumDecimals> {
        self.mul_rounded(a, b, precision, Rounding::HalfUp)
    }

    fn div_half_up(
        &self,
        a: &ManagedDecimal<Self::Api, NumDecimals>,
        b: &ManagedDecimal<Self::Api, NumDecimals>,
        precision: NumDecimals,
    ) -> ManagedDecimal<Self::Api, NumDecimals> {
        self.div_rounded(a, b, precision, Rounding::HalfUp)
    }

    fn div_floor(
        &self,
        a: &ManagedDecimal<Self::Api, NumDecimals>,
        b: &ManagedDecimal<Self::Api, NumDecimals>,
        precision: NumDecimals,
    ) -> ManagedDecimal<Self::Api, NumDecimals> {
        self.div_rounded(a, b, precision, Rounding::Floor)
    }

    fn div_ceil(
        &self,
        a: &ManagedDecimal<Self::Api, NumDecimals>,
        b: &ManagedDecimal<Self::Api, NumDecimals>,
        precision: NumDecimals,
    ) -> ManagedDecimal<Self::Api, NumDecimals> {
        self.div_rounded(a, b, precision, Rounding::Ceil)
    }

    fn ray_mul(
        &self,
        a: &ManagedDecimal<Self::Api, NumDecimals>,
        b: &ManagedDecimal<Self::Api, NumDecimals>,
    ) -> ManagedDecimal<Self::Api, NumDecimals> {
        self.mul_rounded(a, b, RAY_PRECISION, Rounding::HalfUp)
    }

    fn ray_div(
        &self,
        a: &ManagedDecimal<Self::Api, NumDecimals>,
        b: &ManagedDecimal<Self::Api, NumDecimals>,
    ) -> ManagedDecimal<Self::Api, NumDecimals> {
        self.div_rounded(a, b, RAY_PRECISION, Rounding::HalfUp)
    }

    /// `value * bps / 10_000` in the scale of `value`, rounded as requested.
    fn percent_mul_rounded(
        &self,
        value: &ManagedDecimal<Self::Api, NumDecimals>,
        bps: &ManagedDecimal<Self::Api, NumDecimals>,
        rounding: Rounding,
    ) -> ManagedDecimal<Self::Api, NumDecimals> {
        let product = value.into_raw_units() * bps.rescale(BPS_PRECISION).into_raw_units();
        let scaled = divide(product, &BigUint::from(BPS as u64), rounding);
        self.to_decimal(scaled, value.scale())
    }

    fn percent_mul(
        &self,
        value: &ManagedDecimal<Self::Api, NumDecimals>,
        bps: &ManagedDecimal<Self::Api, NumDecimals>,
    ) -> ManagedDecimal<Self::Api, NumDecimals> {
        self.percent_mul_rounded(value, bps, Rounding::HalfUp)
    }

    /// `value * 10_000 / bps` rounded half-up, in the scale of `value`.
    fn percent_div(
        &self,
        value: &ManagedDecimal<Self::Api, NumDecimals>,
        bps: &ManagedDecimal<Self::Api, NumDecimals>,
    ) -> ManagedDecimal<Self::Api, NumDecimals> {
        let numerator = value.into_raw_units() * &BigUint::from(BPS as u64);
        let denominator = bps.rescale(BPS_PRECISION).into_raw_units().clone();
        self.to_decimal(
            divide(numerator, &denominator, Rounding::HalfUp),
            value.scale(),
        )
    }

    fn to_decimal(
        &self,
        value: BigUint,
        precision: NumDecimals,
    ) -> ManagedDecimal<Self::Api, NumDecimals> {
        ManagedDecimal::from_raw_units(value, precision)
    }

    fn to_decimal_wad(&self, value: BigUint) -> ManagedDecimal<Self::Api, NumDecimals> {
        self.to_decimal(value, WAD_PRECISION)
    }

    fn to_decimal_ray(&self, value: BigUint) -> ManagedDecimal<Self::Api, NumDecimals> {
        self.to_decimal(value, RAY_PRECISION)
    }

    fn to_decimal_bps(&self, value: BigUint) -> ManagedDecimal<Self::Api, NumDecimals> {
        self.to_decimal(value, BPS_PRECISION)
    }

    fn zero_at(&self, precision: NumDecimals) -> ManagedDecimal<Self::Api, NumDecimals> {
        self.to_decimal(BigUint::zero(), precision)
    }

    fn bps_zero(&self) -> ManagedDecimal<Self::Api, NumDecimals> {
        self.zero_at(BPS_PRECISION)
    }

    fn wad_zero(&self) -> ManagedDecimal<Self::Api, NumDecimals> {
        self.zero_at(WAD_PRECISION)
    }

    fn ray_zero(&self) -> ManagedDecimal<Self::Api, NumDecimals> {
        self.zero_at(RAY_PRECISION)
    }

    /// One, as a RAY.
    fn ray(&self) -> ManagedDecimal<Self::Api, NumDecimals> {
        self.to_decimal(BigUint::from(RAY), RAY_PRECISION)
    }

    /// One, as a WAD.
    fn wad(&self) -> ManagedDecimal<Self::Api, NumDecimals> {
        self.to_decimal(BigUint::from(WAD), WAD_PRECISION)
    }

    /// 100%, in basis points.
    fn bps(&self) -> ManagedDecimal<Self::Api, NumDecimals> {
        self.to_decimal(BigUint::from(BPS as u64), BPS_PRECISION)
    }

    fn max_health_factor(&self) -> ManagedDecimal<Self::Api, NumDecimals> {
        self.to_decimal(BigUint::from(MAX_HEALTH_FACTOR), RAY_PRECISION)
    }

    /// Brings `value` to `new_precision`. Dropped digits are rounded as requested;
    /// upscaling is always exact.
    fn rescale_rounded(
        &self,
        value: &ManagedDecimal<Self::Api, NumDecimals>,
        new_precision: NumDecimals,
        rounding: Rounding,
    ) -> ManagedDecimal<Self::Api, NumDecimals> {
        let old_precision = value.scale();
        if new_precision >= old_precision {
            return value.rescale(new_precision);
        }

        let factor = pow10(old_precision - new_precision);
        self.to_decimal(
            divide(value.into_raw_units().clone(), &factor, rounding),
            new_precision,
        )
    }

    fn rescale_half_up(
        &self,
        value: &ManagedDecimal<Self::Api, NumDecimals>,
        new_precision: NumDecimals,
    ) -> ManagedDecimal<Self::Api, NumDecimals> {
        self.rescale_rounded(value, new_precision, Rounding::HalfUp)
    }

    fn rescale_ceil(
        &self,
        value: &ManagedDecimal<Self::Api, NumDecimals>,
        new_precision: NumDecimals,
    ) -> ManagedDecimal<Self::Api, NumDecimals> {
        self.rescale_rounded(value, new_precision, Rounding::Ceil)
    }

    /// `a - b`, or zero when `b > a`. Both operands must share a scale.
    fn saturating_sub(
        &self,
        a: &ManagedDecimal<Self::Api, NumDecimals>,
        b: &ManagedDecimal<Self::Api, NumDecimals>,
    ) -> ManagedDecimal<Self::Api, NumDecimals> {
        if a > b {
            a.clone() - b.clone()
        } else {
            self.zero_at(a.scale())
        }
    }

    fn get_min(
        &self,
        a: ManagedDecimal<Self::Api, NumDecimals>,
        b: ManagedDecimal<Self::Api, NumDecimals>,
    ) -> ManagedDecimal<Self::Api, NumDecimals> {
        if b < a {
            b
        } else {
            a
        }
    }

    fn get_max(
        &self,
        a: ManagedDecimal<Self::Api, NumDecimals>,
        b: ManagedDecimal<Self::Api, NumDecimals>,
    ) -> ManagedDecimal<Self::Api, NumDecimals> {
        if b > a {
            b
        } else {
            a
        }
    }
}
