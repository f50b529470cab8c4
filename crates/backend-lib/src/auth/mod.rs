// ============================
// finance-backend-lib/src/auth/mod.rs
// ============================
//! Authentication module.

pub mod context;
pub mod identity;
pub mod key;
pub mod password;
pub mod token;
mod service;
mod service_impl;

pub use context::{CurrentIdentity, MaybeIdentity, RequestIdentityContext};
pub use identity::{
    IdentityResolver, IdentityStore, InMemoryIdentityStore, Principal, RoleSet, UserRecord,
    ROLE_PREFIX,
};
pub use key::{SigningKey, SIGNING_KEY_LEN};
pub use password::{hash_password, verify_password};
pub use service::AuthService;
pub use service_impl::DefaultAuth;
pub use token::{now_ms, Claims, TokenCodec, TOKEN_ALGORITHM};
