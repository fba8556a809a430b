//! Order pricing.
//!
//! A pure derivation from the cart view plus the delivery, gift and coupon
//! selections. No I/O, no caching: consumers recompute the breakdown
//! whenever any input changes.
//!
//! The subtotal is taken from the denormalized product snapshots on the cart
//! lines, which can lag behind the catalog. That staleness window is bounded
//! by the next reconcile fetch and resolved authoritatively server-side at
//! order creation.

use serde::Serialize;

use crate::model::{cart_total, AppliedCoupon, CartLine, DeliveryOptions, DeliverySpeed};

/// Tax rate applied to the subtotal.
pub const TAX_RATE: f64 = 0.05;

/// Flat surcharge for express delivery. Standard delivery is free.
pub const EXPRESS_DELIVERY_SURCHARGE: f64 = 50.0;

/// The full price breakdown shown on the order review page and submitted
/// with order creation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PriceBreakdown {
    pub subtotal: f64,
    pub delivery_charges: f64,
    pub tax_amount: f64,
    pub gift_price: f64,
    pub coupon_discount: f64,
    pub total: f64,
}

/// Derives the price breakdown.
///
/// - delivery is free under a free-shipping coupon, regardless of speed
/// - tax is `round(subtotal * TAX_RATE)`, half away from zero
/// - the total is floored at zero so a discount larger than the rest of the
///   order never produces a negative charge
pub fn price_order(
    lines: &[CartLine],
    delivery: &DeliveryOptions,
    coupon: Option<&AppliedCoupon>,
) -> PriceBreakdown {
    let subtotal = cart_total(lines);

    let free_shipping = coupon.is_some_and(AppliedCoupon::is_free_shipping);
    let delivery_charges = if free_shipping {
        0.0
    } else {
        match delivery.speed {
            DeliverySpeed::Standard => 0.0,
            DeliverySpeed::Express => EXPRESS_DELIVERY_SURCHARGE,
        }
    };

    let tax_amount = (subtotal * TAX_RATE).round();
    let gift_price = delivery.gift.as_ref().map_or(0.0, |g| g.gift_price);
    let coupon_discount = coupon.map_or(0.0, |c| c.discount_amount);

    let total =
        (subtotal + delivery_charges + tax_amount + gift_price - coupon_discount).max(0.0);

    PriceBreakdown {
        subtotal,
        delivery_charges,
        tax_amount,
        gift_price,
        coupon_discount,
        total,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Coupon, CouponType, GiftSelection, ProductSnapshot};

    fn line(product_id: &str, quantity: u32, price: f64) -> CartLine {
        CartLine {
            id: format!("line-{product_id}"),
            product_id: product_id.to_string(),
            quantity,
            product: ProductSnapshot {
                id: product_id.to_string(),
                name: format!("Product {product_id}"),
                price,
                category: "test".to_string(),
                description: None,
                images: Vec::new(),
            },
        }
    }

    fn applied(kind: CouponType, discount: f64) -> AppliedCoupon {
        AppliedCoupon {
            coupon: Coupon {
                code: "TEST".to_string(),
                kind,
                start_date: 0,
                end_date: i64::MAX,
                usage_limit: None,
                usage_count: 0,
                is_active: true,
            },
            discount_amount: discount,
        }
    }

    #[test]
    fn tax_rounds_to_whole_units() {
        // 199 * 0.05 = 9.95 rounds to 10
        let breakdown = price_order(&[line("p1", 1, 199.0)], &DeliveryOptions::default(), None);
        assert_eq!(breakdown.subtotal, 199.0);
        assert_eq!(breakdown.tax_amount, 10.0);
        assert_eq!(breakdown.total, 209.0);
    }

    #[test]
    fn express_surcharge_applies_without_coupon() {
        let options = DeliveryOptions {
            speed: DeliverySpeed::Express,
            ..Default::default()
        };
        let breakdown = price_order(&[line("p1", 1, 100.0)], &options, None);
        assert_eq!(breakdown.delivery_charges, EXPRESS_DELIVERY_SURCHARGE);
    }

    #[test]
    fn free_shipping_coupon_zeroes_delivery_even_for_express() {
        let options = DeliveryOptions {
            speed: DeliverySpeed::Express,
            ..Default::default()
        };
        let coupon = applied(CouponType::FreeShipping, 0.0);
        let breakdown = price_order(&[line("p1", 1, 500.0)], &options, Some(&coupon));
        assert_eq!(breakdown.delivery_charges, 0.0);
        assert_eq!(breakdown.tax_amount, 25.0);
        assert_eq!(breakdown.total, 525.0);
    }

    #[test]
    fn total_is_floored_at_zero() {
        // Pathological discount larger than the whole order.
        let coupon = applied(CouponType::Fixed, 1000.0);
        let breakdown = price_order(&[line("p1", 1, 100.0)], &DeliveryOptions::default(), Some(&coupon));
        assert_eq!(breakdown.tax_amount, 5.0);
        assert_eq!(breakdown.total, 0.0);
    }

    #[test]
    fn gift_price_adds_to_total() {
        let options = DeliveryOptions {
            gift: Some(GiftSelection {
                gift_id: "g1".to_string(),
                gift_name: "Wrap".to_string(),
                gift_price: 15.0,
            }),
            ..Default::default()
        };
        let breakdown = price_order(&[line("p1", 2, 100.0)], &options, None);
        assert_eq!(breakdown.gift_price, 15.0);
        assert_eq!(breakdown.total, 200.0 + 10.0 + 15.0);
    }

    #[test]
    fn empty_cart_prices_to_zero() {
        let breakdown = price_order(&[], &DeliveryOptions::default(), None);
        assert_eq!(breakdown.subtotal, 0.0);
        assert_eq!(breakdown.total, 0.0);
    }
}
