/// Authorization helpers and permission checks
///
/// # Permission Model
///
/// 1. **Family scope**: every family resource is only visible to callers whose
///    token carries that family. Resources from other families are reported as
///    not found so their existence never leaks.
/// 2. **Family admin**: caretaker management, family settings and similar
///    writes require the `admin` role (family-system logins are admins).
/// 3. **System admin**: deployment-wide configuration, family activation,
///    setup invites and backups require the system admin principal.
///
/// # Example
///
/// ```no_run
/// use babycontrol_shared::auth::authorization::{require_admin, require_baby_in_family};
/// use babycontrol_shared::auth::middleware::AuthContext;
/// use sqlx::PgPool;
/// use uuid::Uuid;
///
/// async fn check(
///     pool: &PgPool,
///     auth: &AuthContext,
///     baby_id: Uuid,
/// ) -> Result<(), Box<dyn std::error::Error>> {
///     let family_id = require_admin(auth)?;
///     require_baby_in_family(pool, family_id, baby_id).await?;
///     Ok(())
/// }
/// ```

use sqlx::PgPool;
use uuid::Uuid;

use super::jwt::Principal;
use super::middleware::AuthContext;
use crate::models::baby::Baby;

/// Error type for authorization checks
#[derive(Debug, thiserror::Error)]
pub enum AuthzError {
    /// Token is not bound to a family
    #[error("No family associated with this login")]
    NoFamily,

    /// Caller is not a family admin
    #[error("Admin role required")]
    AdminRequired,

    /// Caller is not the system administrator
    #[error("System administrator access required")]
    SysAdminRequired,

    /// Caller is not a SaaS account holder
    #[error("Account login required")]
    AccountRequired,

    /// Resource missing or owned by another family
    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("Database error: {0}")]
    DatabaseError(#[from] sqlx::Error),
}

/// Returns the caller's family ID
pub fn require_family(auth: &AuthContext) -> Result<Uuid, AuthzError> {
    auth.family_id.ok_or(AuthzError::NoFamily)
}

/// Returns the caller's family ID if the caller administers that family
pub fn require_admin(auth: &AuthContext) -> Result<Uuid, AuthzError> {
    let family_id = require_family(auth)?;

    if !auth.is_admin() {
        return Err(AuthzError::AdminRequired);
    }

    Ok(family_id)
}

pub fn require_sys_admin(auth: &AuthContext) -> Result<(), AuthzError> {
    if !auth.is_sys_admin() {
        return Err(AuthzError::SysAdminRequired);
    }

    Ok(())
}

/// Returns the account ID of an account-holder token
pub fn require_account(auth: &AuthContext) -> Result<Uuid, AuthzError> {
    match auth.principal {
        Principal::Account => Ok(auth.subject_id),
        _ => Err(AuthzError::AccountRequired),
    }
}

/// Checks that a resource's family matches the caller's
///
/// A mismatch is reported as `NotFound(resource)`.
pub fn require_same_family(
    auth: &AuthContext,
    resource_family_id: Uuid,
    resource: &'static str,
) -> Result<(), AuthzError> {
    if auth.family_id != Some(resource_family_id) {
        return Err(AuthzError::NotFound(resource));
    }

    Ok(())
}

/// Checks that a live baby belongs to `family_id`
pub async fn require_baby_in_family(
    pool: &PgPool,
    family_id: Uuid,
    baby_id: Uuid,
) -> Result<(), AuthzError> {
    if !Baby::belongs_to_family(pool, baby_id, family_id).await? {
        return Err(AuthzError::NotFound("Baby"));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::caretaker::CaretakerRole;

    fn context(
        principal: Principal,
        family_id: Option<Uuid>,
        role: Option<CaretakerRole>,
    ) -> AuthContext {
        AuthContext {
            subject_id: Uuid::new_v4(),
            principal,
            family_id,
            role,
        }
    }

    #[test]
    fn test_require_family() {
        let family_id = Uuid::new_v4();
        let auth = context(Principal::Caretaker, Some(family_id), Some(CaretakerRole::User));
        assert_eq!(require_family(&auth).unwrap(), family_id);

        let auth = context(Principal::SysAdmin, None, None);
        assert!(matches!(require_family(&auth), Err(AuthzError::NoFamily)));
    }

    #[test]
    fn test_require_admin() {
        let family_id = Uuid::new_v4();

        let admin = context(Principal::Caretaker, Some(family_id), Some(CaretakerRole::Admin));
        assert_eq!(require_admin(&admin).unwrap(), family_id);

        let user = context(Principal::Caretaker, Some(family_id), Some(CaretakerRole::User));
        assert!(matches!(require_admin(&user), Err(AuthzError::AdminRequired)));

        let system = context(Principal::FamilySystem, Some(family_id), Some(CaretakerRole::Admin));
        assert!(require_admin(&system).is_ok());
    }

    #[test]
    fn test_require_sys_admin() {
        assert!(require_sys_admin(&context(Principal::SysAdmin, None, None)).is_ok());

        let family_admin = context(
            Principal::Caretaker,
            Some(Uuid::new_v4()),
            Some(CaretakerRole::Admin),
        );
        assert!(matches!(
            require_sys_admin(&family_admin),
            Err(AuthzError::SysAdminRequired)
        ));
    }

    #[test]
    fn test_require_account() {
        let account = context(Principal::Account, None, None);
        assert_eq!(require_account(&account).unwrap(), account.subject_id);

        let caretaker = context(Principal::Caretaker, Some(Uuid::new_v4()), None);
        assert!(require_account(&caretaker).is_err());
    }

    #[test]
    fn test_cross_family_resource_is_not_found() {
        let auth = context(Principal::Caretaker, Some(Uuid::new_v4()), Some(CaretakerRole::Admin));

        let err = require_same_family(&auth, Uuid::new_v4(), "Feed log").unwrap_err();
        assert_eq!(err.to_string(), "Feed log not found");
        assert!(require_same_family(&auth, auth.family_id.unwrap(), "Feed log").is_ok());
    }
}
