//! Identifiers and participant roles.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Unique identifier assigned to a proposal on admission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProposalId(Uuid);

impl ProposalId {
    /// Generates a fresh random identifier.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Wraps an existing UUID.
    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// The underlying UUID.
    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for ProposalId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ProposalId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for ProposalId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s).map(Self)
    }
}

macro_rules! string_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Creates the identifier from any string-like value.
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            /// The identifier as a string slice.
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                Self(s.to_string())
            }
        }

        impl From<String> for $name {
            fn from(s: String) -> Self {
                Self(s)
            }
        }
    };
}

string_id!(
    /// Identifier of a model agent submitting proposals.
    AgentId
);

string_id!(
    /// Identifier of a human reviewer issuing verdicts.
    HumanId
);

/// Operations a participant may be allowed to perform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Capability {
    /// Submit proposals for governance.
    Submit,
    /// Cancel one's own pending proposal.
    CancelOwn,
    /// Approve or reject a pending proposal.
    Resolve,
    /// Expire overdue proposals and publish committed outcomes.
    Administer,
}

/// Every party that can cause a log transition.
///
/// The set is closed: model agents propose, human reviewers decide, the
/// system performs automatic gating and expiry.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "role", content = "id", rename_all = "snake_case")]
pub enum Participant {
    /// An untrusted language-model agent.
    ModelAgent(AgentId),
    /// A human with approval authority.
    HumanReviewer(HumanId),
    /// The gate itself.
    System,
}

impl Participant {
    /// Whether this participant holds the given capability.
    pub fn can(&self, capability: Capability) -> bool {
        matches!(
            (self, capability),
            (Participant::ModelAgent(_), Capability::Submit)
                | (Participant::ModelAgent(_), Capability::CancelOwn)
                | (Participant::HumanReviewer(_), Capability::Resolve)
                | (Participant::System, Capability::Administer)
        )
    }
}

impl fmt::Display for Participant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Participant::ModelAgent(id) => write!(f, "agent:{}", id),
            Participant::HumanReviewer(id) => write!(f, "human:{}", id),
            Participant::System => f.write_str("system"),
        }
    }
}
