use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CartItem {
    pub id: String,
    pub name: String,
    pub price_cents: i64,
    pub quantity: i64,
}

impl CartItem {
    pub fn line_total_cents(&self) -> i64 {
        self.price_cents * self.quantity
    }
}

pub fn total_items(cart: &[CartItem]) -> i64 {
    cart.iter().map(|item| item.quantity).sum()
}

pub fn total_price_cents(cart: &[CartItem]) -> i64 {
    cart.iter().map(|item| item.line_total_cents()).sum()
}
