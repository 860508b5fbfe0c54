//! Staff roles and the request context threaded through task operations.

use super::{ParseStaffRoleError, StaffId, TaskStatus};
use serde::{Deserialize, Serialize};

/// Role of a staff member as reported by the staff directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StaffRole {
    /// Individual contributor.
    Staff,
    /// Team manager.
    Manager,
    /// Senior manager above team managers.
    SeniorManager,
    /// Department director.
    Director,
    /// Human resources.
    Hr,
}

impl StaffRole {
    /// Returns the canonical storage representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Staff => "staff",
            Self::Manager => "manager",
            Self::SeniorManager => "senior_manager",
            Self::Director => "director",
            Self::Hr => "hr",
        }
    }

    /// Returns `true` for every role above the base staff role.
    #[must_use]
    pub const fn is_elevated(self) -> bool {
        !matches!(self, Self::Staff)
    }

    /// Position in the assignment hierarchy; higher outranks lower.
    #[must_use]
    pub const fn rank(self) -> u8 {
        match self {
            Self::Staff => 0,
            Self::Manager | Self::Hr => 1,
            Self::SeniorManager => 2,
            Self::Director => 3,
        }
    }
}

impl TryFrom<&str> for StaffRole {
    type Error = ParseStaffRoleError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        let normalized = value.trim().to_ascii_lowercase().replace([' ', '-'], "_");
        match normalized.as_str() {
            "staff" => Ok(Self::Staff),
            "manager" => Ok(Self::Manager),
            "senior_manager" => Ok(Self::SeniorManager),
            "director" => Ok(Self::Director),
            "hr" => Ok(Self::Hr),
            _ => Err(ParseStaffRoleError(value.to_owned())),
        }
    }
}

/// Initial status of a task created (or regenerated) for an owner with
/// `role`.
///
/// Base staff start work immediately; elevated roles create tasks that still
/// need assigning.
#[must_use]
pub const fn default_status_for_role(role: StaffRole) -> TaskStatus {
    if role.is_elevated() {
        TaskStatus::Unassigned
    } else {
        TaskStatus::Ongoing
    }
}

/// Whether a member with role `assigner` may hand task ownership to a member
/// with role `assignee`.
#[must_use]
pub const fn can_assign_across_role(assigner: StaffRole, assignee: StaffRole) -> bool {
    assigner.is_elevated() && assigner.rank() >= assignee.rank()
}

/// Identity and role of the staff member performing an operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ActorContext {
    staff_id: StaffId,
    role: StaffRole,
}

impl ActorContext {
    /// Creates an actor context.
    #[must_use]
    pub const fn new(staff_id: StaffId, role: StaffRole) -> Self {
        Self { staff_id, role }
    }

    /// Returns the acting staff member.
    #[must_use]
    pub const fn staff_id(&self) -> StaffId {
        self.staff_id
    }

    /// Returns the acting staff member's role.
    #[must_use]
    pub const fn role(&self) -> StaffRole {
        self.role
    }
}
