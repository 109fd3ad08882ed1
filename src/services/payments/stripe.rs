use anyhow::Context;
use async_trait::async_trait;
use serde::Deserialize;

use super::{CheckoutRequest, CheckoutSession, PaymentProvider, PaymentStatus};

const API_BASE: &str = "https://api.stripe.com/v1";

pub struct StripeCheckoutProvider {
    secret_key: String,
    currency: String,
    client: reqwest::Client,
}

impl StripeCheckoutProvider {
    pub fn new(secret_key: String, currency: String) -> Self {
        Self {
            secret_key,
            currency,
            client: reqwest::Client::new(),
        }
    }
}

#[derive(Deserialize)]
struct SessionResponse {
    id: String,
    url: Option<String>,
    payment_status: Option<String>,
}

fn session_from(response: SessionResponse) -> CheckoutSession {
    let payment_status = match response.payment_status.as_deref() {
        Some("paid") | Some("no_payment_required") => PaymentStatus::Paid,
        _ => PaymentStatus::Unpaid,
    };
    CheckoutSession {
        id: response.id,
        url: response.url,
        payment_status,
    }
}

#[async_trait]
impl PaymentProvider for StripeCheckoutProvider {
    async fn create_checkout_session(
        &self,
        request: &CheckoutRequest,
    ) -> anyhow::Result<CheckoutSession> {
        let mut form: Vec<(String, String)> = vec![
            ("mode".to_string(), "payment".to_string()),
            ("payment_method_types[0]".to_string(), "card".to_string()),
            ("success_url".to_string(), request.success_url.clone()),
            ("cancel_url".to_string(), request.cancel_url.clone()),
        ];
        if let Some(email) = &request.customer_email {
            form.push(("customer_email".to_string(), email.clone()));
        }
        for (i, item) in request.line_items.iter().enumerate() {
            form.push((
                format!("line_items[{i}][price_data][currency]"),
                self.currency.clone(),
            ));
            form.push((
                format!("line_items[{i}][price_data][product_data][name]"),
                item.name.clone(),
            ));
            form.push((
                format!("line_items[{i}][price_data][unit_amount]"),
                item.amount_cents.to_string(),
            ));
            form.push((format!("line_items[{i}][quantity]"), item.quantity.to_string()));
        }

        let response: SessionResponse = self
            .client
            .post(format!("{API_BASE}/checkout/sessions"))
            .basic_auth(&self.secret_key, None::<&str>)
            .form(&form)
            .send()
            .await
            .context("failed to reach Stripe")?
            .error_for_status()
            .context("Stripe API returned error")?
            .json()
            .await
            .context("failed to decode Stripe response")?;

        Ok(session_from(response))
    }

    async fn fetch_checkout_session(&self, session_id: &str) -> anyhow::Result<CheckoutSession> {
        let response: SessionResponse = self
            .client
            .get(format!("{API_BASE}/checkout/sessions/{session_id}"))
            .basic_auth(&self.secret_key, None::<&str>)
            .send()
            .await
            .context("failed to reach Stripe")?
            .error_for_status()
            .context("Stripe API returned error")?
            .json()
            .await
            .context("failed to decode Stripe response")?;

        Ok(session_from(response))
    }
}
