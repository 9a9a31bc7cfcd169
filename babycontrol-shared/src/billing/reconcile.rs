/// Stripe event reconciliation
///
/// Verified webhook events arrive as [`BillingEvent`], then [`plan_billing`]
/// computes the account's new [`BillingState`] without touching the database.
/// [`process_event`] wires the two together with account lookup and the
/// `stripe_events` idempotency ledger.
///
/// Last write wins: every event overwrites the billing columns it owns,
/// except that cancellation of a subscription the account no longer holds
/// is ignored.

use chrono::{DateTime, Utc};
use sqlx::PgPool;
use thiserror::Error;
use uuid::Uuid;

use super::webhook::VerifiedEvent;
use crate::models::account::{Account, BillingState, PlanType};
use crate::models::stripe_event::StripeEvent;

#[derive(Debug, Error)]
pub enum BillingError {
    #[error("Stripe webhook secret is not configured")]
    MissingSecret,

    #[error("Invalid Stripe webhook: {0}")]
    InvalidWebhook(String),

    #[error("Database error: {0}")]
    DatabaseError(#[from] sqlx::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckoutMode {
    Subscription,
    Payment,
    Other,
}

impl CheckoutMode {
    pub fn from_stripe(mode: &str) -> Self {
        match mode {
            "subscription" => CheckoutMode::Subscription,
            "payment" => CheckoutMode::Payment,
            _ => CheckoutMode::Other,
        }
    }
}

/// The events reconciliation acts on
#[derive(Debug, Clone, PartialEq)]
pub enum BillingEvent {
    CheckoutCompleted {
        account_id: Option<Uuid>,
        customer_id: Option<String>,
        mode: CheckoutMode,
        subscription_id: Option<String>,
    },
    SubscriptionChanged {
        subscription_id: String,
        customer_id: Option<String>,
        status: String,
        current_period_end: Option<DateTime<Utc>>,
    },
    SubscriptionDeleted {
        subscription_id: String,
        customer_id: Option<String>,
        ended_at: Option<DateTime<Utc>>,
    },
    InvoicePaid {
        customer_id: Option<String>,
        period_end: Option<DateTime<Utc>>,
    },
    InvoiceFailed {
        customer_id: Option<String>,
    },
    Other(String),
}

/// How to find the account an event refers to
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AccountLookup {
    ById(Uuid),
    ByStripe {
        subscription_id: Option<String>,
        customer_id: Option<String>,
    },
}

impl BillingEvent {
    pub fn lookup(&self) -> Option<AccountLookup> {
        match self {
            BillingEvent::CheckoutCompleted {
                account_id: Some(id),
                ..
            } => Some(AccountLookup::ById(*id)),
            BillingEvent::CheckoutCompleted {
                account_id: None,
                customer_id,
                subscription_id,
                ..
            } => Some(AccountLookup::ByStripe {
                subscription_id: subscription_id.clone(),
                customer_id: customer_id.clone(),
            }),
            BillingEvent::SubscriptionChanged {
                subscription_id,
                customer_id,
                ..
            }
            | BillingEvent::SubscriptionDeleted {
                subscription_id,
                customer_id,
                ..
            } => Some(AccountLookup::ByStripe {
                subscription_id: Some(subscription_id.clone()),
                customer_id: customer_id.clone(),
            }),
            BillingEvent::InvoicePaid { customer_id, .. } => Some(AccountLookup::ByStripe {
                subscription_id: None,
                customer_id: customer_id.clone(),
            }),
            BillingEvent::InvoiceFailed { .. } | BillingEvent::Other(_) => None,
        }
    }
}

/// True when the account tracks a different subscription than `subscription_id`
fn is_stale(current: &BillingState, subscription_id: &str) -> bool {
    current
        .subscription_id
        .as_deref()
        .is_some_and(|tracked| tracked != subscription_id)
}

/// Computes the billing state after `event`
///
/// Returns `None` when the event leaves the account unchanged. A lifetime
/// (`full`) plan is never downgraded by subscription events.
pub fn plan_billing(
    current: &BillingState,
    event: &BillingEvent,
    now: DateTime<Utc>,
) -> Option<BillingState> {
    let lifetime = current.plan_type == Some(PlanType::Full);
    let mut next = current.clone();

    match event {
        BillingEvent::CheckoutCompleted {
            customer_id,
            mode,
            subscription_id,
            ..
        } => {
            if customer_id.is_some() {
                next.stripe_customer_id = customer_id.clone();
            }
            match mode {
                CheckoutMode::Subscription => {
                    if !lifetime {
                        next.plan_type = Some(PlanType::Sub);
                    }
                    if subscription_id.is_some() {
                        next.subscription_id = subscription_id.clone();
                    }
                }
                CheckoutMode::Payment => {
                    next.plan_type = Some(PlanType::Full);
                    next.plan_expires = None;
                }
                CheckoutMode::Other => {}
            }
        }
        BillingEvent::SubscriptionChanged {
            subscription_id,
            customer_id,
            status,
            current_period_end,
        } => {
            if customer_id.is_some() {
                next.stripe_customer_id = customer_id.clone();
            }
            match status.as_str() {
                "active" | "trialing" => {
                    next.subscription_id = Some(subscription_id.clone());
                    if !lifetime {
                        next.plan_type = Some(PlanType::Sub);
                        next.plan_expires = *current_period_end;
                    }
                }
                "canceled" | "unpaid" | "incomplete_expired" => {
                    if !lifetime && !is_stale(current, subscription_id) {
                        next.subscription_id = None;
                        next.plan_type = None;
                    }
                }
                _ => {}
            }
        }
        BillingEvent::SubscriptionDeleted {
            subscription_id,
            ended_at,
            ..
        } => {
            if !is_stale(current, subscription_id) {
                next.subscription_id = None;
                if !lifetime {
                    next.plan_type = None;
                    next.plan_expires = Some(ended_at.unwrap_or(now));
                }
            }
        }
        BillingEvent::InvoicePaid { period_end, .. } => {
            if let (false, Some(end)) = (lifetime, period_end) {
                if current.plan_expires.map_or(true, |existing| *end > existing) {
                    next.plan_expires = Some(*end);
                }
            }
        }
        BillingEvent::InvoiceFailed { .. } | BillingEvent::Other(_) => {}
    }

    (next != *current).then_some(next)
}

/// What happened to a webhook event
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReconcileOutcome {
    /// Already in `stripe_events`
    Duplicate,

    /// Event type we don't act on
    Ignored,

    /// No account matches the event's references
    AccountNotFound,

    /// Account found; billing already matched the event
    Unchanged { account_id: Uuid },

    Updated { account_id: Uuid },
}

async fn find_account(
    pool: &PgPool,
    lookup: &AccountLookup,
) -> Result<Option<Account>, sqlx::Error> {
    match lookup {
        AccountLookup::ById(id) => Account::find_by_id(pool, *id).await,
        AccountLookup::ByStripe {
            subscription_id,
            customer_id,
        } => {
            if let Some(subscription_id) = subscription_id {
                let account = Account::find_by_subscription_id(pool, subscription_id).await?;
                if account.is_some() {
                    return Ok(account);
                }
            }
            match customer_id {
                Some(customer_id) => Account::find_by_stripe_customer_id(pool, customer_id).await,
                None => Ok(None),
            }
        }
    }
}

/// Reconciles one verified webhook event
///
/// The event id is recorded only after the account update succeeds, so a
/// database failure leaves the event eligible for Stripe's redelivery.
pub async fn process_event(
    pool: &PgPool,
    event: &VerifiedEvent,
    now: DateTime<Utc>,
) -> Result<ReconcileOutcome, BillingError> {
    if StripeEvent::exists(pool, &event.id).await? {
        tracing::debug!(event_id = %event.id, "Duplicate Stripe event");
        return Ok(ReconcileOutcome::Duplicate);
    }

    let billing_event = &event.billing;

    let outcome = match billing_event.lookup() {
        None => {
            match billing_event {
                BillingEvent::InvoiceFailed { customer_id } => tracing::warn!(
                    event_id = %event.id,
                    customer_id = ?customer_id,
                    "Invoice payment failed"
                ),
                _ => tracing::info!(
                    event_id = %event.id,
                    event_type = %event.event_type,
                    "Unhandled Stripe event type"
                ),
            }
            ReconcileOutcome::Ignored
        }
        Some(lookup) => match find_account(pool, &lookup).await? {
            None => {
                tracing::warn!(
                    event_id = %event.id,
                    event_type = %event.event_type,
                    lookup = ?lookup,
                    "No account matches Stripe event"
                );
                ReconcileOutcome::AccountNotFound
            }
            Some(account) => {
                match plan_billing(&account.billing_state(), billing_event, now) {
                    Some(next) => {
                        Account::set_billing_state(pool, account.id, &next).await?;
                        tracing::info!(
                            event_id = %event.id,
                            event_type = %event.event_type,
                            account_id = %account.id,
                            plan_type = ?next.plan_type.map(|p| p.as_str()),
                            plan_expires = ?next.plan_expires,
                            "Account billing updated"
                        );
                        ReconcileOutcome::Updated {
                            account_id: account.id,
                        }
                    }
                    None => ReconcileOutcome::Unchanged {
                        account_id: account.id,
                    },
                }
            }
        },
    };

    StripeEvent::record(pool, &event.id, &event.event_type).await?;

    Ok(outcome)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn at(secs: i64) -> DateTime<Utc> {
        DateTime::from_timestamp(secs, 0).unwrap()
    }

    fn subscribed(subscription_id: &str) -> BillingState {
        BillingState {
            plan_type: Some(PlanType::Sub),
            plan_expires: Some(at(1_800_000_000)),
            subscription_id: Some(subscription_id.to_string()),
            stripe_customer_id: Some("cus_1".to_string()),
        }
    }

    fn canceled(subscription_id: &str) -> BillingEvent {
        BillingEvent::SubscriptionChanged {
            subscription_id: subscription_id.to_string(),
            customer_id: Some("cus_1".to_string()),
            status: "canceled".to_string(),
            current_period_end: None,
        }
    }

    fn deleted(subscription_id: &str) -> BillingEvent {
        BillingEvent::SubscriptionDeleted {
            subscription_id: subscription_id.to_string(),
            customer_id: Some("cus_1".to_string()),
            ended_at: None,
        }
    }

    #[test]
    fn test_checkout_mode_from_stripe() {
        assert_eq!(CheckoutMode::from_stripe("subscription"), CheckoutMode::Subscription);
        assert_eq!(CheckoutMode::from_stripe("payment"), CheckoutMode::Payment);
        assert_eq!(CheckoutMode::from_stripe("setup"), CheckoutMode::Other);
    }

    #[test]
    fn test_checkout_subscription() {
        let account_id = Uuid::new_v4();
        let event = BillingEvent::CheckoutCompleted {
            account_id: Some(account_id),
            customer_id: Some("cus_1".to_string()),
            mode: CheckoutMode::Subscription,
            subscription_id: Some("sub_1".to_string()),
        };

        assert_eq!(event.lookup(), Some(AccountLookup::ById(account_id)));

        let next = plan_billing(&BillingState::default(), &event, Utc::now()).unwrap();
        assert_eq!(next.plan_type, Some(PlanType::Sub));
        assert_eq!(next.subscription_id.as_deref(), Some("sub_1"));
        assert_eq!(next.stripe_customer_id.as_deref(), Some("cus_1"));
    }

    #[test]
    fn test_checkout_without_account_falls_back_to_stripe_ids() {
        let event = BillingEvent::CheckoutCompleted {
            account_id: None,
            customer_id: Some("cus_1".to_string()),
            mode: CheckoutMode::Payment,
            subscription_id: None,
        };

        assert_eq!(
            event.lookup(),
            Some(AccountLookup::ByStripe {
                subscription_id: None,
                customer_id: Some("cus_1".to_string()),
            })
        );
    }

    #[test]
    fn test_checkout_payment_is_lifetime() {
        let current = BillingState {
            plan_expires: Some(Utc::now() + Duration::days(10)),
            ..subscribed("sub_1")
        };
        let event = BillingEvent::CheckoutCompleted {
            account_id: None,
            customer_id: Some("cus_1".to_string()),
            mode: CheckoutMode::Payment,
            subscription_id: None,
        };

        let next = plan_billing(&current, &event, Utc::now()).unwrap();
        assert_eq!(next.plan_type, Some(PlanType::Full));
        assert_eq!(next.plan_expires, None);
    }

    #[test]
    fn test_subscription_active_sets_period_end() {
        let event = BillingEvent::SubscriptionChanged {
            subscription_id: "sub_1".to_string(),
            customer_id: Some("cus_1".to_string()),
            status: "active".to_string(),
            current_period_end: Some(at(1_800_000_000)),
        };

        let next = plan_billing(&BillingState::default(), &event, Utc::now()).unwrap();
        assert_eq!(next.plan_type, Some(PlanType::Sub));
        assert_eq!(next.plan_expires, Some(at(1_800_000_000)));
        assert_eq!(next.subscription_id.as_deref(), Some("sub_1"));
    }

    #[test]
    fn test_subscription_canceled_clears() {
        let next = plan_billing(&subscribed("sub_1"), &canceled("sub_1"), Utc::now()).unwrap();
        assert_eq!(next.plan_type, None);
        assert_eq!(next.subscription_id, None);
    }

    #[test]
    fn test_stale_cancellation_keeps_current_subscription() {
        let current = subscribed("sub_new");

        assert_eq!(plan_billing(&current, &canceled("sub_old"), Utc::now()), None);
        assert_eq!(plan_billing(&current, &deleted("sub_old"), Utc::now()), None);
    }

    #[test]
    fn test_cancellation_without_tracked_subscription_still_clears() {
        let current = BillingState {
            subscription_id: None,
            ..subscribed("sub_1")
        };

        let next = plan_billing(&current, &deleted("sub_1"), Utc::now()).unwrap();
        assert_eq!(next.plan_type, None);
    }

    #[test]
    fn test_lifetime_never_downgraded() {
        let current = BillingState {
            plan_type: Some(PlanType::Full),
            plan_expires: None,
            subscription_id: None,
            stripe_customer_id: Some("cus_1".to_string()),
        };

        assert_eq!(plan_billing(&current, &canceled("sub_1"), Utc::now()), None);
        assert_eq!(plan_billing(&current, &deleted("sub_1"), Utc::now()), None);
    }

    #[test]
    fn test_subscription_deleted_uses_now_without_ended_at() {
        let now = Utc::now();
        let current = BillingState {
            plan_expires: Some(now + Duration::days(20)),
            stripe_customer_id: None,
            ..subscribed("sub_1")
        };

        let next = plan_billing(&current, &deleted("sub_1"), now).unwrap();
        assert_eq!(next.plan_type, None);
        assert_eq!(next.subscription_id, None);
        assert_eq!(next.plan_expires, Some(now));
    }

    #[test]
    fn test_invoice_extends_period() {
        let event = BillingEvent::InvoicePaid {
            customer_id: Some("cus_1".to_string()),
            period_end: Some(at(1_760_000_000)),
        };
        let current = BillingState {
            plan_expires: Some(at(1_740_000_000)),
            ..subscribed("sub_1")
        };

        assert_eq!(
            event.lookup(),
            Some(AccountLookup::ByStripe {
                subscription_id: None,
                customer_id: Some("cus_1".to_string()),
            })
        );

        let next = plan_billing(&current, &event, Utc::now()).unwrap();
        assert_eq!(next.plan_expires, Some(at(1_760_000_000)));

        // An older period never shortens access
        let later = BillingState {
            plan_expires: Some(at(1_900_000_000)),
            ..current
        };
        assert_eq!(plan_billing(&later, &event, Utc::now()), None);
    }

    #[test]
    fn test_unknown_event_is_ignored() {
        let event = BillingEvent::Other("customer.created".to_string());
        assert_eq!(event.lookup(), None);
        assert_eq!(plan_billing(&BillingState::default(), &event, Utc::now()), None);

        let failed = BillingEvent::InvoiceFailed { customer_id: None };
        assert_eq!(failed.lookup(), None);
    }
}
