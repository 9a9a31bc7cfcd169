/// Stripe billing
///
/// - `webhook`: signature verification and typed event mapping
/// - `reconcile`: account billing updates

pub mod reconcile;
pub mod webhook;

pub use reconcile::{process_event, BillingError, BillingEvent, ReconcileOutcome};
pub use webhook::{construct_event, VerifiedEvent, SIGNATURE_HEADER};
