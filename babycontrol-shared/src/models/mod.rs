/// Database models for Baby Control
///
/// Every family-owned row carries `family_id`, and every lookup takes the
/// caller's family so a record from another family reads as missing.
///
/// # Models
///
/// - `account`: SaaS account owners and their billing state
/// - `family`, `settings`, `caretaker`, `baby`: the household
/// - `activity_log`: shared plumbing for the nine log kinds below
/// - `sleep_log`, `feed_log`, `diaper_log`, `bath_log`, `pump_log`, `note`,
///   `milestone`, `measurement`, `medicine_log`: activity logs
/// - `medicine`: per-family medicine catalogue
/// - `activity_settings`: button order and visibility
/// - `app_config`, `email_config`: instance singletons
/// - `family_setup_invite`: one-time family creation tokens
/// - `stripe_event`: processed webhook ids
///
/// # Example
///
/// ```no_run
/// use babycontrol_shared::models::family::{CreateFamily, Family};
/// use babycontrol_shared::db::pool::{create_pool, DatabaseConfig};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let pool = create_pool(DatabaseConfig::default()).await?;
///
/// let family = Family::create(
///     &pool,
///     CreateFamily {
///         slug: "smith-family".to_string(),
///         name: "Smith Family".to_string(),
///         account_id: None,
///     },
/// )
/// .await?;
/// # Ok(())
/// # }
/// ```

pub mod account;
pub mod activity_log;
pub mod activity_settings;
pub mod app_config;
pub mod baby;
pub mod bath_log;
pub mod caretaker;
pub mod diaper_log;
pub mod email_config;
pub mod family;
pub mod family_setup_invite;
pub mod feed_log;
pub mod measurement;
pub mod medicine;
pub mod medicine_log;
pub mod milestone;
pub mod note;
pub mod pump_log;
pub mod settings;
pub mod sleep_log;
pub mod stripe_event;
