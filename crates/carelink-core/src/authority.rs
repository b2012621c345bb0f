//! # Acting Identity
//!
//! Mutations that act on behalf of a patient or nurse carry the actor's id
//! in their arguments. Whether that id is believed is an explicit policy:
//!
//! - `TrustClient` (default): the id in the request is accepted as given and
//!   no token is needed. Any caller may act as any patient or nurse.
//! - `VerifiedToken`: a valid token is required, and the claimed id must be
//!   the token's subject holding the matching role.
//!
//! The resolver and query paths never see this; only the mutation engine
//! consults it.

use crate::auth::Identity;
use crate::{CareError, RecordId, Role};
use serde::{Deserialize, Serialize};

/// Which acting identities a mutation accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthorityPolicy {
    #[default]
    TrustClient,
    VerifiedToken,
}

/// What the caller proved about themselves.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ActingIdentity {
    /// No token, or one that failed verification.
    #[default]
    Anonymous,
    Verified(Identity),
}

impl ActingIdentity {
    #[must_use]
    pub fn identity(&self) -> Option<&Identity> {
        match self {
            Self::Anonymous => None,
            Self::Verified(identity) => Some(identity),
        }
    }
}

/// What a mutation claims about who performs it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActingClaim<'a> {
    /// Acts as this patient.
    Patient(&'a RecordId),
    /// Acts as this nurse.
    Nurse(&'a RecordId),
    /// Any signed-in user.
    Authenticated,
}

impl AuthorityPolicy {
    /// Accept or refuse `claim` for a caller holding `acting`.
    pub fn authorize(self, acting: &ActingIdentity, claim: ActingClaim<'_>) -> Result<(), CareError> {
        match self {
            Self::TrustClient => Ok(()),
            Self::VerifiedToken => {
                let identity = acting.identity().ok_or(CareError::Unauthorized)?;
                let allowed = match claim {
                    ActingClaim::Patient(id) => {
                        identity.role == Role::Patient && identity.user_id == *id
                    }
                    ActingClaim::Nurse(id) => {
                        identity.role == Role::Nurse && identity.user_id == *id
                    }
                    ActingClaim::Authenticated => true,
                };
                if allowed {
                    Ok(())
                } else {
                    Err(CareError::Unauthorized)
                }
            }
        }
    }
}
