pub mod token_service;
pub use token_service::{Claims, TokenError, TokenPurpose, TokenService};

pub mod mailer;
pub use mailer::{AccountMail, LogMailer, MailPurpose, Mailer, SmtpMailer};

pub mod storage;
pub use storage::{AvatarStorage, LocalAvatarStorage, StorageError};

pub mod account_service;
pub mod account_service_impl;
pub use account_service::{AccountError, AccountService};
pub use account_service_impl::SeaOrmAccountService;

pub mod credential_service;
pub mod credential_service_impl;
pub use credential_service::{CredentialError, CredentialService};
pub use credential_service_impl::SeaOrmCredentialService;
