//! Randomized opening offer

use rand::Rng;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};

use super::types::{DiscountBand, Product};

/// Draws the seller's opening offer a few percent below list price
#[derive(Clone, Debug)]
pub struct DiscountGenerator {
    band: DiscountBand,
}

impl DiscountGenerator {
    pub fn new(band: DiscountBand) -> Self {
        Self { band }
    }

    /// Lowest and highest opening offer for `list_price`, at cent precision
    pub fn bounds(&self, list_price: Decimal) -> (Decimal, Decimal) {
        let lowest = discounted(list_price, self.band.max_percent)
            .round_dp_with_strategy(2, RoundingStrategy::ToPositiveInfinity);
        let highest = discounted(list_price, self.band.min_percent)
            .round_dp_with_strategy(2, RoundingStrategy::ToNegativeInfinity);
        (lowest, highest)
    }

    pub fn initial_offer(&self, product: &Product) -> Decimal {
        self.initial_offer_with(product, &mut rand::thread_rng())
    }

    /// Same as [`initial_offer`](Self::initial_offer) with a caller-provided RNG
    pub fn initial_offer_with<R: Rng>(&self, product: &Product, rng: &mut R) -> Decimal {
        // Draw in hundredths of a percent so the distribution stays uniform
        let min_bp = to_basis(self.band.min_percent);
        let max_bp = to_basis(self.band.max_percent).max(min_bp);
        let percent = Decimal::new(rng.gen_range(min_bp..=max_bp), 2);

        // Bounds can cross for bands narrower than a cent; `highest` wins then
        let (lowest, highest) = self.bounds(product.list_price);
        discounted(product.list_price, percent)
            .round_dp(2)
            .max(lowest)
            .min(highest)
    }
}

fn discounted(list_price: Decimal, percent: Decimal) -> Decimal {
    list_price * (Decimal::ONE_HUNDRED - percent) / Decimal::ONE_HUNDRED
}

fn to_basis(percent: Decimal) -> i64 {
    (percent * Decimal::ONE_HUNDRED).round().to_i64().unwrap_or(0)
}
