//! `farmlink-auth` — authorization decisions for warehouse management.
//!
//! Identity and role arrive from the authentication middleware and are trusted as
//! given. This crate only decides whether a resolved principal may act on a warehouse
//! location; it performs no credential validation.

pub mod authorize;
pub mod principal;
pub mod roles;

pub use authorize::{
    AuthorizationExplanation, AuthzError, ManagerAccess, authorize_lot_management,
    explain_lot_management,
};
pub use principal::Principal;
pub use roles::Role;
