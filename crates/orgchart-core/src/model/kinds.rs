use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};

/// The four organization levels, from governance down to physical sites.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrgType {
    Board,
    Holding,
    LegalEntity,
    Location,
}

impl OrgType {
    pub const ALL: [Self; 4] = [Self::Board, Self::Holding, Self::LegalEntity, Self::Location];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Board => "board",
            Self::Holding => "holding",
            Self::LegalEntity => "legal_entity",
            Self::Location => "location",
        }
    }
}

/// Kinds of secondary (matrix) reporting lines between staff.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RelationType {
    Functional,
    Administrative,
    Project,
    Territorial,
    Mentoring,
    Strategic,
    Governance,
    Advisory,
    Supervisory,
}

impl Default for RelationType {
    fn default() -> Self {
        Self::Functional
    }
}

impl RelationType {
    pub const ALL: [Self; 9] = [
        Self::Functional,
        Self::Administrative,
        Self::Project,
        Self::Territorial,
        Self::Mentoring,
        Self::Strategic,
        Self::Governance,
        Self::Advisory,
        Self::Supervisory,
    ];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Functional => "functional",
            Self::Administrative => "administrative",
            Self::Project => "project",
            Self::Territorial => "territorial",
            Self::Mentoring => "mentoring",
            Self::Strategic => "strategic",
            Self::Governance => "governance",
            Self::Advisory => "advisory",
            Self::Supervisory => "supervisory",
        }
    }
}

/// Every record type held by the entity store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    Organization,
    Division,
    Position,
    Staff,
    FunctionalRelation,
}

impl EntityKind {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Organization => "organization",
            Self::Division => "division",
            Self::Position => "position",
            Self::Staff => "staff",
            Self::FunctionalRelation => "functional relation",
        }
    }

    /// Backing table name.
    #[must_use]
    pub const fn table(self) -> &'static str {
        match self {
            Self::Organization => "organizations",
            Self::Division => "divisions",
            Self::Position => "positions",
            Self::Staff => "staff",
            Self::FunctionalRelation => "functional_relations",
        }
    }
}

impl fmt::Display for OrgType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Display for RelationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when parsing an enum value from text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseEnumError {
    pub expected: &'static str,
    pub got: String,
}

impl fmt::Display for ParseEnumError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid {}: '{}'", self.expected, self.got)
    }
}

impl std::error::Error for ParseEnumError {}

fn normalize(input: &str) -> String {
    input.trim().to_ascii_lowercase().replace('-', "_")
}

impl FromStr for OrgType {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = normalize(s);
        match normalized.as_str() {
            "board" => Ok(Self::Board),
            "holding" => Ok(Self::Holding),
            "legal_entity" | "legal" => Ok(Self::LegalEntity),
            "location" => Ok(Self::Location),
            _ => Err(ParseEnumError {
                expected: "organization type",
                got: s.to_string(),
            }),
        }
    }
}

impl FromStr for RelationType {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = normalize(s);
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_str() == normalized)
            .ok_or_else(|| ParseEnumError {
                expected: "relation type",
                got: s.to_string(),
            })
    }
}
