/// Cross-log activity views
///
/// - `timeline`: all log kinds for one baby merged into one list
/// - `status`: last feed/diaper/sleep and overdue warnings
/// - `settings`: activity tile order and visibility

pub mod settings;
pub mod status;
pub mod timeline;
