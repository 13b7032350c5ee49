/// Auth & access-control engine
///
/// Realm resolution, token issue/verify, credential validation, the
/// bitmask permission evaluator, the post-auth account-state guard,
/// the password-reset flow, and federated identity linking. The
/// account stores plug in through the `PrincipalLookup` seam; nothing
/// here imports them directly.
pub mod access;
pub mod credentials;
pub mod guard;
pub mod oauth;
pub mod password;
pub mod principal;
pub mod realm;
pub mod reset;
pub mod service;
pub mod tokens;

pub use credentials::CredentialValidator;
pub use guard::AccountStateGuard;
pub use oauth::{IdentityLinker, Provider};
pub use principal::{Principal, PrincipalLookup};
pub use realm::Realm;
pub use reset::PasswordResetService;
pub use service::{AuthService, TokenPair};
