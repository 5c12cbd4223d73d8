pub mod claims;
pub mod jwt;
pub mod password;
pub mod temporary_token;

pub use claims::{AccessClaims, RefreshClaims};
pub use jwt::{
    issue_access_token, issue_refresh_token, verify_access_token, verify_refresh_token,
};
pub use password::{generate_temporary_password, hash_password, verify_password};
pub use temporary_token::{hash_token, TemporaryToken};
