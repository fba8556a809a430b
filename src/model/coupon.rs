//! Coupon types.
//!
//! The client never computes discount amounts. It submits a code plus a cart
//! projection and receives an authoritative discount from the server. The
//! only client-side coupon logic is the advisory display filter below.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CouponType {
    Percentage,
    Fixed,
    FreeShipping,
}

/// A server-defined coupon. Dates are unix timestamps in seconds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Coupon {
    pub code: String,
    #[serde(rename = "type")]
    pub kind: CouponType,
    pub start_date: i64,
    pub end_date: i64,
    #[serde(default)]
    pub usage_limit: Option<u32>,
    #[serde(default)]
    pub usage_count: u32,
    pub is_active: bool,
}

impl Coupon {
    /// Advisory check used only to filter the displayed list of available
    /// coupons. The server re-checks all of this at apply time.
    pub fn is_displayable(&self, now: i64) -> bool {
        self.is_active
            && self.start_date <= now
            && now <= self.end_date
            && self.usage_limit.map_or(true, |limit| self.usage_count < limit)
    }
}

/// Display-only filter over the available-coupons list.
pub fn displayable_coupons(coupons: &[Coupon], now: i64) -> Vec<Coupon> {
    coupons
        .iter()
        .filter(|c| c.is_displayable(now))
        .cloned()
        .collect()
}

/// A coupon currently applied to the cart, together with the discount the
/// server granted for the cart contents it was validated against.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppliedCoupon {
    pub coupon: Coupon,
    pub discount_amount: f64,
}

impl AppliedCoupon {
    pub fn is_free_shipping(&self) -> bool {
        self.coupon.kind == CouponType::FreeShipping
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn coupon(code: &str, active: bool, start: i64, end: i64, limit: Option<u32>, used: u32) -> Coupon {
        Coupon {
            code: code.to_string(),
            kind: CouponType::Fixed,
            start_date: start,
            end_date: end,
            usage_limit: limit,
            usage_count: used,
            is_active: active,
        }
    }

    #[test]
    fn display_filter_honors_window_activity_and_limit() {
        let now = 1_000;
        let coupons = vec![
            coupon("OK", true, 500, 1_500, Some(10), 3),
            coupon("EXPIRED", true, 100, 900, None, 0),
            coupon("FUTURE", true, 1_100, 2_000, None, 0),
            coupon("INACTIVE", false, 500, 1_500, None, 0),
            coupon("EXHAUSTED", true, 500, 1_500, Some(5), 5),
        ];
        let shown = displayable_coupons(&coupons, now);
        assert_eq!(shown.len(), 1);
        assert_eq!(shown[0].code, "OK");
    }

    #[test]
    fn free_shipping_detection() {
        let mut c = coupon("SHIP", true, 0, 10, None, 0);
        c.kind = CouponType::FreeShipping;
        let applied = AppliedCoupon {
            coupon: c,
            discount_amount: 0.0,
        };
        assert!(applied.is_free_shipping());
    }
}
