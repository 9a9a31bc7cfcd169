/// Stripe webhook verification
///
/// [`construct_event`] hands the raw body and the `Stripe-Signature` header
/// to `stripe_webhook::Webhook::construct_event`, which checks the
/// HMAC-SHA256 signature and timestamp tolerance and deserializes the typed
/// event. The typed event object is then mapped onto the [`BillingEvent`]
/// variants reconciliation acts on.

use chrono::{DateTime, Utc};
use serde_json::Value;
use stripe_webhook::{EventObject, Webhook};
use uuid::Uuid;

use super::reconcile::{BillingError, BillingEvent, CheckoutMode};

/// Header carrying the webhook signature
pub const SIGNATURE_HEADER: &str = "stripe-signature";

/// A webhook event whose signature checked out
#[derive(Debug, Clone, PartialEq)]
pub struct VerifiedEvent {
    pub id: String,
    pub event_type: String,
    pub billing: BillingEvent,
}

/// Verifies and parses one webhook delivery
///
/// # Errors
///
/// - `MissingSecret`: `secret` is empty
/// - `InvalidWebhook`: bad signature, stale timestamp or unparseable event
pub fn construct_event(
    payload: &[u8],
    signature: &str,
    secret: &str,
) -> Result<VerifiedEvent, BillingError> {
    if secret.is_empty() {
        return Err(BillingError::MissingSecret);
    }

    let payload = std::str::from_utf8(payload)
        .map_err(|_| BillingError::InvalidWebhook("Payload is not valid UTF-8".to_string()))?;

    let event = Webhook::construct_event(payload, signature, secret)
        .map_err(|e| BillingError::InvalidWebhook(e.to_string()))?;

    let id = event.id.as_str().to_string();
    let event_type = event.type_.as_str().to_string();
    let billing = billing_event(event.data.object, &event_type, payload);

    Ok(VerifiedEvent {
        id,
        event_type,
        billing,
    })
}

fn billing_event(object: EventObject, event_type: &str, payload: &str) -> BillingEvent {
    match object {
        EventObject::CheckoutSessionCompleted(session) => {
            let metadata_account_id = session
                .metadata
                .as_ref()
                .and_then(|metadata| metadata.get("account_id"))
                .map(String::as_str);

            BillingEvent::CheckoutCompleted {
                account_id: checkout_account_id(
                    session.client_reference_id.as_deref(),
                    metadata_account_id,
                ),
                customer_id: session
                    .customer
                    .map(|customer| customer.into_id().as_str().to_string()),
                mode: CheckoutMode::from_stripe(session.mode.as_str()),
                subscription_id: session
                    .subscription
                    .map(|subscription| subscription.into_id().as_str().to_string()),
            }
        }
        EventObject::CustomerSubscriptionCreated(subscription)
        | EventObject::CustomerSubscriptionUpdated(subscription) => {
            BillingEvent::SubscriptionChanged {
                subscription_id: subscription.id.as_str().to_string(),
                customer_id: Some(subscription.customer.into_id().as_str().to_string()),
                status: subscription.status.as_str().to_string(),
                current_period_end: subscription_period_end(payload),
            }
        }
        EventObject::CustomerSubscriptionDeleted(subscription) => {
            BillingEvent::SubscriptionDeleted {
                subscription_id: subscription.id.as_str().to_string(),
                customer_id: Some(subscription.customer.into_id().as_str().to_string()),
                ended_at: subscription
                    .ended_at
                    .and_then(|secs| DateTime::from_timestamp(secs, 0)),
            }
        }
        EventObject::InvoicePaymentSucceeded(invoice) => BillingEvent::InvoicePaid {
            customer_id: invoice
                .customer
                .map(|customer| customer.into_id().as_str().to_string()),
            period_end: invoice
                .lines
                .data
                .iter()
                .map(|line| line.period.end)
                .max()
                .and_then(|secs| DateTime::from_timestamp(secs, 0)),
        },
        EventObject::InvoicePaymentFailed(invoice) => BillingEvent::InvoiceFailed {
            customer_id: invoice
                .customer
                .map(|customer| customer.into_id().as_str().to_string()),
        },
        _ => BillingEvent::Other(event_type.to_string()),
    }
}

/// First of `client_reference_id` and `metadata.account_id` that is a UUID
fn checkout_account_id(
    client_reference_id: Option<&str>,
    metadata_account_id: Option<&str>,
) -> Option<Uuid> {
    [client_reference_id, metadata_account_id]
        .into_iter()
        .flatten()
        .find_map(|raw| Uuid::parse_str(raw.trim()).ok())
}

/// `current_period_end` of the subscription in `payload`
///
/// API versions from 2025-03-31 carry the period on each subscription item
/// instead of the subscription; there the latest item period wins.
fn subscription_period_end(payload: &str) -> Option<DateTime<Utc>> {
    let envelope: Value = serde_json::from_str(payload).ok()?;
    let object = envelope.pointer("/data/object")?;

    let secs = object
        .get("current_period_end")
        .and_then(Value::as_i64)
        .or_else(|| {
            object
                .pointer("/items/data")?
                .as_array()?
                .iter()
                .filter_map(|item| item.get("current_period_end").and_then(Value::as_i64))
                .max()
        })?;

    DateTime::from_timestamp(secs, 0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_empty_secret_is_a_configuration_error() {
        let result = construct_event(b"{}", "t=1,v1=00", "");
        assert!(matches!(result, Err(BillingError::MissingSecret)));
    }

    #[test]
    fn test_bad_signature_is_rejected() {
        let result = construct_event(b"{}", "t=1,v1=00", "whsec_test");
        assert!(matches!(result, Err(BillingError::InvalidWebhook(_))));

        let result = construct_event(b"{}", "garbage", "whsec_test");
        assert!(matches!(result, Err(BillingError::InvalidWebhook(_))));
    }

    #[test]
    fn test_non_utf8_payload_is_rejected() {
        let result = construct_event(&[0xff, 0xfe], "t=1,v1=00", "whsec_test");
        assert!(matches!(result, Err(BillingError::InvalidWebhook(_))));
    }

    #[test]
    fn test_checkout_account_id_sources() {
        let id = Uuid::new_v4();
        let id_str = id.to_string();

        assert_eq!(checkout_account_id(Some(&id_str), None), Some(id));
        assert_eq!(checkout_account_id(None, Some(&id_str)), Some(id));
        assert_eq!(checkout_account_id(Some("cart-42"), Some(&id_str)), Some(id));
        assert_eq!(checkout_account_id(Some("cart-42"), None), None);
        assert_eq!(checkout_account_id(None, None), None);
    }

    #[test]
    fn test_period_end_on_subscription() {
        let payload = json!({
            "id": "evt_1",
            "type": "customer.subscription.updated",
            "data": { "object": { "id": "sub_1", "current_period_end": 1_800_000_000i64 } }
        })
        .to_string();

        assert_eq!(
            subscription_period_end(&payload),
            DateTime::from_timestamp(1_800_000_000, 0)
        );
    }

    #[test]
    fn test_period_end_on_items() {
        let payload = json!({
            "id": "evt_1",
            "type": "customer.subscription.updated",
            "data": { "object": {
                "id": "sub_1",
                "items": { "data": [
                    { "id": "si_1", "current_period_end": 1_750_000_000i64 },
                    { "id": "si_2", "current_period_end": 1_760_000_000i64 }
                ]}
            }}
        })
        .to_string();

        assert_eq!(
            subscription_period_end(&payload),
            DateTime::from_timestamp(1_760_000_000, 0)
        );
    }

    #[test]
    fn test_period_end_missing() {
        let payload = json!({ "data": { "object": { "id": "sub_1" } } }).to_string();
        assert_eq!(subscription_period_end(&payload), None);
        assert_eq!(subscription_period_end("not json"), None);
    }
}
