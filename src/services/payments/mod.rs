pub mod stripe;

use async_trait::async_trait;

#[derive(Debug, Clone)]
pub struct CheckoutLineItem {
    pub name: String,
    pub amount_cents: i64,
    pub quantity: i64,
}

#[derive(Debug, Clone)]
pub struct CheckoutRequest {
    pub customer_email: Option<String>,
    pub line_items: Vec<CheckoutLineItem>,
    pub success_url: String,
    pub cancel_url: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaymentStatus {
    Paid,
    Unpaid,
}

#[derive(Debug, Clone)]
pub struct CheckoutSession {
    pub id: String,
    pub url: Option<String>,
    pub payment_status: PaymentStatus,
}

/// Hosted-checkout collaborator. The core never sees provider payloads,
/// only the session id, redirect URL and payment status.
#[async_trait]
pub trait PaymentProvider: Send + Sync {
    async fn create_checkout_session(
        &self,
        request: &CheckoutRequest,
    ) -> anyhow::Result<CheckoutSession>;

    async fn fetch_checkout_session(&self, session_id: &str) -> anyhow::Result<CheckoutSession>;
}
