/// Authentication and authorization utilities
///
/// # Modules
///
/// - [`password`]: Argon2id hashing for passwords and security PINs
/// - [`jwt`]: JWT token generation and validation
/// - [`middleware`]: Bearer token extraction and `AuthContext`
/// - [`authorization`]: Family scoping and role checks
/// - [`lockout`]: Failed-login lockout tracking
///
/// # Example
///
/// ```no_run
/// use babycontrol_shared::auth::password::{hash_password, verify_password};
/// use babycontrol_shared::auth::jwt::{create_token, Claims, TokenType};
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let hash = hash_password("1234")?;
/// assert!(verify_password("1234", &hash)?);
///
/// let claims = Claims::sys_admin(TokenType::Access);
/// let token = create_token(&claims, "secret-key")?;
/// # Ok(())
/// # }
/// ```

pub mod password;
pub mod jwt;
pub mod middleware;
pub mod authorization;
pub mod lockout;
