//! `PaymentProvider` implementation backed by the PayPal gateway

use crate::config::{PayPalConfig, PayPalEnv};
use crate::gateway::PayPalGateway;
use async_trait::async_trait;
use chrono::Utc;
use serde_json::Value;
use rust_decimal::Decimal;
use shop_core::{
    parse_amount, round_money, CaptureStatus, IntentRequest, IntentStatus, PaymentCapture,
    PaymentIntent, PaymentProvider, PaymentProviderKind, ProviderAvailability, SettingsMap,
    ShopResult,
};
use std::str::FromStr;

/// PayPal checkout: the buyer approves in PayPal's UI between
/// `create_intent` and `capture`.
#[derive(Debug, Clone)]
pub struct PayPalProvider {
    gateway: PayPalGateway,
    env: PayPalEnv,
}

impl PayPalProvider {
    pub fn new(gateway: PayPalGateway, env: PayPalEnv) -> Self {
        Self { gateway, env }
    }

    /// Effective configuration for the given settings snapshot
    pub fn config(&self, settings: &SettingsMap) -> PayPalConfig {
        PayPalConfig::resolve(&self.env, settings)
    }
}

#[async_trait]
impl PaymentProvider for PayPalProvider {
    fn kind(&self) -> PaymentProviderKind {
        PaymentProviderKind::PayPal
    }

    async fn create_intent(
        &self,
        request: &IntentRequest,
        settings: &SettingsMap,
        _availability: &ProviderAvailability,
    ) -> ShopResult<PaymentIntent> {
        let amount = parse_amount(&request.amount)?;
        let currency = request.currency_code();

        let body = self
            .gateway
            .create_order(&self.config(settings), &request.amount, Some(&currency))
            .await?;

        Ok(PaymentIntent {
            provider: self.kind(),
            reference: body.get("id").and_then(|v| v.as_str()).map(str::to_string),
            amount: round_money(amount),
            currency,
            status: IntentStatus::AwaitingApproval,
            payload: Some(body),
            created_at: Utc::now(),
        })
    }

    async fn capture(
        &self,
        reference: &str,
        settings: &SettingsMap,
        _availability: &ProviderAvailability,
    ) -> ShopResult<PaymentCapture> {
        let body = self
            .gateway
            .capture_order(&self.config(settings), reference)
            .await?;

        let status = match body.get("status").and_then(|v| v.as_str()) {
            Some("COMPLETED") => CaptureStatus::Completed,
            _ => CaptureStatus::Pending,
        };
        let (amount, currency) = match captured_amount(&body) {
            Some((amount, currency)) => (Some(amount), Some(currency)),
            None => (None, None),
        };

        Ok(PaymentCapture {
            provider: self.kind(),
            reference: reference.trim().to_string(),
            status,
            amount,
            currency,
            payload: Some(body),
        })
    }
}

/// Sum of the captures in a capture response, with their shared currency.
/// `None` when there are no captures or they disagree on currency.
fn captured_amount(body: &Value) -> Option<(Decimal, String)> {
    let captures = body
        .get("purchase_units")?
        .as_array()?
        .iter()
        .filter_map(|unit| unit.pointer("/payments/captures")?.as_array())
        .flatten();

    let mut total = Decimal::ZERO;
    let mut currency: Option<String> = None;
    for capture in captures {
        let amount = capture.get("amount")?;
        let value = Decimal::from_str(amount.get("value")?.as_str()?).ok()?;
        let code = amount.get("currency_code")?.as_str()?.to_uppercase();
        match &currency {
            Some(existing) if *existing != code => return None,
            Some(_) => {}
            None => currency = Some(code),
        }
        total = total.checked_add(value)?;
    }
    currency.map(|currency| (total, currency))
}
