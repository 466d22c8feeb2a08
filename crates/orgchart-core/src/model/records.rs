//! Persisted records and their create/update payloads.
//!
//! Update payloads never carry a tree pointer (`parent_id`, `manager_id`):
//! those change only through the move operations in [`crate::tree`], which
//! keeps the cycle check in one place.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::{OrgType, RelationType};

// ---------------------------------------------------------------------------
// Organization
// ---------------------------------------------------------------------------

/// A node in the BOARD -> HOLDING -> LEGAL_ENTITY -> LOCATION hierarchy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Organization {
    pub id: i64,
    pub name: String,
    pub code: String,
    pub description: Option<String>,
    pub org_type: OrgType,
    pub is_active: bool,
    pub parent_id: Option<i64>,
    pub legal_address: Option<String>,
    pub physical_address: Option<String>,
    /// Taxpayer id.
    pub inn: Option<String>,
    /// Tax registration reason code.
    pub kpp: Option<String>,
    /// Valuable final product statement.
    pub ckp: Option<String>,
    pub created_at_us: i64,
    pub updated_at_us: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewOrganization {
    pub name: String,
    pub code: String,
    pub org_type: OrgType,
    #[serde(default)]
    pub parent_id: Option<i64>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub legal_address: Option<String>,
    #[serde(default)]
    pub physical_address: Option<String>,
    #[serde(default)]
    pub inn: Option<String>,
    #[serde(default)]
    pub kpp: Option<String>,
    #[serde(default)]
    pub ckp: Option<String>,
}

impl NewOrganization {
    /// Minimal payload: name, code, and type, no parent.
    #[must_use]
    pub fn new(name: impl Into<String>, code: impl Into<String>, org_type: OrgType) -> Self {
        Self {
            name: name.into(),
            code: code.into(),
            org_type,
            parent_id: None,
            description: None,
            legal_address: None,
            physical_address: None,
            inn: None,
            kpp: None,
            ckp: None,
        }
    }

    #[must_use]
    pub const fn with_parent(mut self, parent_id: i64) -> Self {
        self.parent_id = Some(parent_id);
        self
    }
}

/// Partial update; `None` leaves the field untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OrganizationUpdate {
    pub name: Option<String>,
    pub code: Option<String>,
    pub description: Option<String>,
    pub org_type: Option<OrgType>,
    pub is_active: Option<bool>,
    pub legal_address: Option<String>,
    pub physical_address: Option<String>,
    pub inn: Option<String>,
    pub kpp: Option<String>,
    pub ckp: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct OrganizationFilter {
    pub org_type: Option<OrgType>,
    pub parent_id: Option<i64>,
    /// Only parentless organizations. Ignored when `parent_id` is set.
    pub roots_only: bool,
    pub is_active: Option<bool>,
    pub limit: Option<u32>,
    pub offset: Option<u32>,
}

// ---------------------------------------------------------------------------
// Division
// ---------------------------------------------------------------------------

/// A department-like node in a tree scoped to one organization.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Division {
    pub id: i64,
    pub name: String,
    pub code: String,
    pub description: Option<String>,
    pub ckp: Option<String>,
    pub organization_id: i64,
    pub parent_id: Option<i64>,
    /// Depth in the division tree, 0 for roots.
    pub level: u32,
    pub is_active: bool,
    pub created_at_us: i64,
    pub updated_at_us: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewDivision {
    pub name: String,
    pub code: String,
    pub organization_id: i64,
    #[serde(default)]
    pub parent_id: Option<i64>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub ckp: Option<String>,
}

impl NewDivision {
    #[must_use]
    pub fn new(name: impl Into<String>, code: impl Into<String>, organization_id: i64) -> Self {
        Self {
            name: name.into(),
            code: code.into(),
            organization_id,
            parent_id: None,
            description: None,
            ckp: None,
        }
    }

    #[must_use]
    pub const fn with_parent(mut self, parent_id: i64) -> Self {
        self.parent_id = Some(parent_id);
        self
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DivisionUpdate {
    pub name: Option<String>,
    pub code: Option<String>,
    pub description: Option<String>,
    pub ckp: Option<String>,
    /// A change here cascades to every descendant division.
    pub is_active: Option<bool>,
}

#[derive(Debug, Clone, Default)]
pub struct DivisionFilter {
    pub organization_id: Option<i64>,
    pub parent_id: Option<i64>,
    pub roots_only: bool,
    pub level: Option<u32>,
    pub is_active: Option<bool>,
    pub limit: Option<u32>,
    pub offset: Option<u32>,
}

// ---------------------------------------------------------------------------
// Position
// ---------------------------------------------------------------------------

/// A job title that staff members may hold.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Position {
    pub id: i64,
    pub name: String,
    pub description: Option<String>,
    pub is_active: bool,
    pub created_at_us: i64,
    pub updated_at_us: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewPosition {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PositionUpdate {
    pub name: Option<String>,
    pub description: Option<String>,
    pub is_active: Option<bool>,
}

#[derive(Debug, Clone, Default)]
pub struct PositionFilter {
    /// Case-insensitive substring match on the name.
    pub name_contains: Option<String>,
    pub is_active: Option<bool>,
    pub limit: Option<u32>,
    pub offset: Option<u32>,
}

// ---------------------------------------------------------------------------
// Staff
// ---------------------------------------------------------------------------

/// A person with exactly one primary manager pointer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Staff {
    pub id: i64,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub middle_name: Option<String>,
    pub phone: Option<String>,
    pub description: Option<String>,
    pub is_active: bool,
    pub organization_id: i64,
    pub division_id: Option<i64>,
    /// An organization of type LOCATION.
    pub location_id: Option<i64>,
    pub position_id: Option<i64>,
    pub manager_id: Option<i64>,
    pub created_at_us: i64,
    pub updated_at_us: i64,
}

impl Staff {
    /// "Last First Middle".
    #[must_use]
    pub fn full_name(&self) -> String {
        match self.middle_name.as_deref() {
            Some(middle) if !middle.is_empty() => {
                format!("{} {} {}", self.last_name, self.first_name, middle)
            }
            _ => format!("{} {}", self.last_name, self.first_name),
        }
    }

    /// "Last F.M." (initials only).
    #[must_use]
    pub fn short_name(&self) -> String {
        let mut name = self.last_name.clone();
        if let Some(first) = self.first_name.chars().next() {
            name.push(' ');
            name.push(first);
            name.push('.');
            if let Some(middle) = self.middle_name.as_deref().and_then(|m| m.chars().next()) {
                name.push(middle);
                name.push('.');
            }
        }
        name
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewStaff {
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub organization_id: i64,
    #[serde(default)]
    pub middle_name: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub division_id: Option<i64>,
    #[serde(default)]
    pub location_id: Option<i64>,
    #[serde(default)]
    pub position_id: Option<i64>,
    #[serde(default)]
    pub manager_id: Option<i64>,
}

impl NewStaff {
    #[must_use]
    pub fn new(
        email: impl Into<String>,
        first_name: impl Into<String>,
        last_name: impl Into<String>,
        organization_id: i64,
    ) -> Self {
        Self {
            email: email.into(),
            first_name: first_name.into(),
            last_name: last_name.into(),
            organization_id,
            middle_name: None,
            phone: None,
            description: None,
            division_id: None,
            location_id: None,
            position_id: None,
            manager_id: None,
        }
    }

    #[must_use]
    pub const fn with_manager(mut self, manager_id: i64) -> Self {
        self.manager_id = Some(manager_id);
        self
    }
}

/// Partial staff update. Nested options distinguish "leave" (`None`) from
/// "clear" (`Some(None)`) for nullable references.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StaffUpdate {
    pub email: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub middle_name: Option<String>,
    pub phone: Option<String>,
    pub description: Option<String>,
    pub is_active: Option<bool>,
    pub organization_id: Option<i64>,
    pub division_id: Option<Option<i64>>,
    pub location_id: Option<Option<i64>>,
    pub position_id: Option<Option<i64>>,
}

#[derive(Debug, Clone, Default)]
pub struct StaffFilter {
    pub organization_id: Option<i64>,
    pub division_id: Option<i64>,
    pub location_id: Option<i64>,
    pub manager_id: Option<i64>,
    pub is_active: Option<bool>,
    pub limit: Option<u32>,
    pub offset: Option<u32>,
}

// ---------------------------------------------------------------------------
// FunctionalRelation
// ---------------------------------------------------------------------------

/// A typed, secondary reporting edge between two staff members.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FunctionalRelation {
    pub id: i64,
    pub manager_id: i64,
    pub subordinate_id: i64,
    pub relation_type: RelationType,
    pub description: Option<String>,
    pub is_active: bool,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub created_at_us: i64,
    pub updated_at_us: i64,
}

impl FunctionalRelation {
    /// Whether the two validity windows share at least one day. Missing
    /// bounds are open-ended.
    #[must_use]
    pub fn overlaps(&self, start: Option<NaiveDate>, end: Option<NaiveDate>) -> bool {
        ranges_overlap((self.start_date, self.end_date), (start, end))
    }
}

pub(crate) fn ranges_overlap(
    a: (Option<NaiveDate>, Option<NaiveDate>),
    b: (Option<NaiveDate>, Option<NaiveDate>),
) -> bool {
    let a_starts_before_b_ends = match (a.0, b.1) {
        (Some(start), Some(end)) => start <= end,
        _ => true,
    };
    let b_starts_before_a_ends = match (b.0, a.1) {
        (Some(start), Some(end)) => start <= end,
        _ => true,
    };
    a_starts_before_b_ends && b_starts_before_a_ends
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewRelation {
    pub manager_id: i64,
    pub subordinate_id: i64,
    #[serde(default)]
    pub relation_type: RelationType,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub start_date: Option<NaiveDate>,
    #[serde(default)]
    pub end_date: Option<NaiveDate>,
}

impl NewRelation {
    #[must_use]
    pub const fn new(manager_id: i64, subordinate_id: i64, relation_type: RelationType) -> Self {
        Self {
            manager_id,
            subordinate_id,
            relation_type,
            description: None,
            start_date: None,
            end_date: None,
        }
    }

    #[must_use]
    pub const fn between(mut self, start: Option<NaiveDate>, end: Option<NaiveDate>) -> Self {
        self.start_date = start;
        self.end_date = end;
        self
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RelationUpdate {
    pub description: Option<String>,
    pub is_active: Option<bool>,
    pub start_date: Option<Option<NaiveDate>>,
    pub end_date: Option<Option<NaiveDate>>,
}

#[derive(Debug, Clone, Default)]
pub struct RelationFilter {
    pub manager_id: Option<i64>,
    pub subordinate_id: Option<i64>,
    pub relation_type: Option<RelationType>,
    pub active_only: bool,
    pub limit: Option<u32>,
    pub offset: Option<u32>,
}
