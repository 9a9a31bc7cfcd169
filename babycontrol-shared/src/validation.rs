/// Field validators shared by request types.
///
/// Each function has the shape `validator` expects for
/// `#[validate(custom(function = "..."))]`, so request structs in the API
/// crate can reference them directly.

use chrono::NaiveTime;
use validator::ValidationError;

use crate::auth::password::validate_security_pin;

/// Slugs that would collide with application routes.
pub const RESERVED_SLUGS: &[&str] = &[
    "account", "accounts", "admin", "api", "app", "auth", "family", "family-select",
    "family-manager", "families", "health", "login", "logout", "setup", "settings",
    "static", "www",
];

pub const SLUG_MIN_LENGTH: usize = 3;
pub const SLUG_MAX_LENGTH: usize = 50;

fn error(code: &'static str, message: impl Into<String>) -> ValidationError {
    let message: String = message.into();
    let mut err = ValidationError::new(code);
    err.message = Some(message.into());
    err
}

/// Explains why `slug` is unusable, `None` when it is fine.
///
/// Uniqueness is a database concern and is checked separately.
pub fn slug_problem(slug: &str) -> Option<&'static str> {
    if slug.len() < SLUG_MIN_LENGTH {
        return Some("Slug must be at least 3 characters long");
    }
    if slug.len() > SLUG_MAX_LENGTH {
        return Some("Slug must be at most 50 characters long");
    }
    if !slug
        .chars()
        .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
    {
        return Some("Slug may only contain lowercase letters, numbers and hyphens");
    }
    if slug.starts_with('-') || slug.ends_with('-') {
        return Some("Slug cannot start or end with a hyphen");
    }
    if RESERVED_SLUGS.contains(&slug) {
        return Some("This slug is reserved");
    }
    None
}

pub fn validate_slug(slug: &str) -> Result<(), ValidationError> {
    match slug_problem(slug) {
        Some(reason) => Err(error("slug", reason)),
        None => Ok(()),
    }
}

/// Caretaker login IDs are exactly two digits; "00" belongs to the family system login.
pub fn validate_login_id(login_id: &str) -> Result<(), ValidationError> {
    if login_id.len() != 2 || !login_id.chars().all(|c| c.is_ascii_digit()) {
        return Err(error("login_id_format", "Login ID must be exactly two digits"));
    }
    if login_id == "00" {
        return Err(error("login_id_reserved", "Login ID 00 is reserved"));
    }
    Ok(())
}

pub fn validate_pin(pin: &str) -> Result<(), ValidationError> {
    validate_security_pin(pin).map_err(|msg| error("security_pin", msg))
}

/// Parses an `HH:MM` duration or clock string into minutes.
pub fn parse_hh_mm(value: &str) -> Option<i64> {
    let (hours, minutes) = value.split_once(':')?;
    if hours.len() != 2 || minutes.len() != 2 {
        return None;
    }
    let hours: i64 = hours.parse().ok()?;
    let minutes: i64 = minutes.parse().ok()?;
    if !(0..24).contains(&hours) || !(0..60).contains(&minutes) {
        return None;
    }
    Some(hours * 60 + minutes)
}

pub fn validate_hh_mm(value: &str) -> Result<(), ValidationError> {
    if parse_hh_mm(value).is_some() && NaiveTime::parse_from_str(value, "%H:%M").is_ok() {
        Ok(())
    } else {
        Err(error("time_format", "Time must be in HH:MM format"))
    }
}

/// Unit abbreviations must come from the unit catalogue.
pub fn validate_unit_abbr(abbr: &str) -> Result<(), ValidationError> {
    if crate::units::find(abbr).is_some() {
        Ok(())
    } else {
        Err(error("unit", format!("Unknown unit '{}'", abbr)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slug_rules() {
        assert!(validate_slug("smith-family").is_ok());
        assert!(validate_slug("abc").is_ok());
        assert!(validate_slug("a1-b2").is_ok());

        assert!(validate_slug("ab").is_err());
        assert!(validate_slug(&"a".repeat(51)).is_err());
        assert!(validate_slug("Smith").is_err());
        assert!(validate_slug("smith_family").is_err());
        assert!(validate_slug("-smith").is_err());
        assert!(validate_slug("admin").is_err());
        assert!(validate_slug("login").is_err());
    }

    #[test]
    fn test_slug_problem_messages() {
        assert_eq!(slug_problem("setup"), Some("This slug is reserved"));
        assert_eq!(slug_problem("good-slug"), None);
    }

    #[test]
    fn test_login_id_rules() {
        assert!(validate_login_id("01").is_ok());
        assert!(validate_login_id("99").is_ok());

        let err = validate_login_id("00").unwrap_err();
        assert_eq!(err.code, "login_id_reserved");
        assert!(validate_login_id("1").is_err());
        assert!(validate_login_id("123").is_err());
        assert!(validate_login_id("a1").is_err());
    }

    #[test]
    fn test_pin_rules() {
        assert!(validate_pin("1234").is_ok());
        assert!(validate_pin("12").is_err());
        assert!(validate_pin("abcd").is_err());
    }

    #[test]
    fn test_hh_mm() {
        assert_eq!(parse_hh_mm("03:00"), Some(180));
        assert_eq!(parse_hh_mm("00:45"), Some(45));
        assert_eq!(parse_hh_mm("23:59"), Some(1439));
        assert_eq!(parse_hh_mm("3:00"), None);
        assert_eq!(parse_hh_mm("24:00"), None);
        assert_eq!(parse_hh_mm("02:60"), None);
        assert_eq!(parse_hh_mm("0300"), None);

        assert!(validate_hh_mm("02:30").is_ok());
        assert!(validate_hh_mm("2:30").is_err());
    }

    #[test]
    fn test_unit_abbr() {
        assert!(validate_unit_abbr("OZ").is_ok());
        assert!(validate_unit_abbr("ML").is_ok());
        assert!(validate_unit_abbr("FURLONG").is_err());
    }
}
