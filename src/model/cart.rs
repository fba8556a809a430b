//! Cart line and product snapshot types.

use serde::{Deserialize, Serialize};

/// Identifier of a product in the catalog.
pub type ProductId = String;

/// Identifier of a cart line. May be a temporary client-generated id
/// (`local-{n}`) between an optimistic add and the reconcile fetch that
/// replaces it with the server-issued id.
pub type LineId = String;

/// Denormalized product fields carried on a cart line for display and
/// pricing. The price here can lag behind the catalog; the server remains
/// the source of truth for the charged amount at order creation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductSnapshot {
    pub id: ProductId,
    pub name: String,
    pub price: f64,
    pub category: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub images: Vec<String>,
}

impl ProductSnapshot {
    /// Placeholder snapshot used for an optimistically added line until the
    /// reconcile fetch brings the real product data.
    pub fn placeholder(product_id: &str) -> Self {
        Self {
            id: product_id.to_string(),
            name: String::new(),
            price: 0.0,
            category: String::new(),
            description: None,
            images: Vec::new(),
        }
    }

    pub fn is_placeholder(&self) -> bool {
        self.name.is_empty() && self.price == 0.0
    }
}

/// One product's presence in the cart.
///
/// Invariant: `quantity >= 1`. A line whose quantity would drop to zero is
/// removed, never retained.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CartLine {
    pub id: LineId,
    pub product_id: ProductId,
    pub quantity: u32,
    pub product: ProductSnapshot,
}

impl CartLine {
    pub fn subtotal(&self) -> f64 {
        self.product.price * f64::from(self.quantity)
    }
}

/// Total number of units across all lines.
pub fn cart_count(lines: &[CartLine]) -> u32 {
    lines.iter().map(|l| l.quantity).sum()
}

/// Sum of `price * quantity` over all lines, from the denormalized snapshots.
pub fn cart_total(lines: &[CartLine]) -> f64 {
    lines.iter().map(CartLine::subtotal).sum()
}

/// The minimal per-line projection submitted with coupon validation and
/// order creation requests.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CartProjection {
    pub product_id: ProductId,
    pub quantity: u32,
    pub price: f64,
}

impl CartProjection {
    pub fn of(lines: &[CartLine]) -> Vec<Self> {
        lines
            .iter()
            .map(|l| Self {
                product_id: l.product_id.clone(),
                quantity: l.quantity,
                price: l.product.price,
            })
            .collect()
    }
}
