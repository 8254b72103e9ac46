pub use super::profiles::Entity as Profiles;
pub use super::revoked_tokens::Entity as RevokedTokens;
pub use super::users::Entity as Users;
