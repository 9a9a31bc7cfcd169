/// API route handlers
///
/// This module contains all route handlers organized by resource:
///
/// - `health`: Health check endpoint
/// - `auth`: Caretaker, family and system administrator login, token refresh
/// - `accounts`: SaaS account registration, verification and lifecycle
/// - `stripe`: Stripe webhook receiver
/// - `families`, `family_setup`: family lookup, administration and creation
/// - `caretakers`, `babies`, `medicines`: family records
/// - `logs`: the nine activity log kinds
/// - `settings`: family settings, activity tiles and the unit catalogue
/// - `admin`: instance and email configuration
/// - `backup`: whole-database snapshot download and restore

pub mod accounts;
pub mod admin;
pub mod auth;
pub mod babies;
pub mod backup;
pub mod caretakers;
pub mod families;
pub mod family_setup;
pub mod health;
pub mod logs;
pub mod medicines;
pub mod settings;
pub mod stripe;
