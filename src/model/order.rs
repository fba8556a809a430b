//! The order creation payload.

use serde::Serialize;

use super::cart::CartProjection;
use super::delivery::DeliverySpeed;

/// Payload for creating an order, mirroring the backend's `POST orders`
/// contract. Built by [`crate::checkout::Checkout`] from the cart view plus
/// the delivery/gift/coupon selections.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OrderRequest {
    pub total_amount: f64,
    pub shipping_address_id: String,
    pub items: Vec<CartProjection>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub coupon_code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub discount_amount: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gift_design_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gift_price: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gift_card_message: Option<String>,
    pub delivery_charges: f64,
    pub delivery_type: DeliverySpeed,
    pub tax_amount: f64,
}
