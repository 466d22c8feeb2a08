//! Domain vocabulary: enums, records, and payloads.

mod kinds;
mod records;

pub use kinds::{EntityKind, OrgType, ParseEnumError, RelationType};
pub(crate) use records::ranges_overlap;
pub use records::{
    Division, DivisionFilter, DivisionUpdate, FunctionalRelation, NewDivision, NewOrganization,
    NewPosition, NewRelation, NewStaff, Organization, OrganizationFilter, OrganizationUpdate,
    Position, PositionFilter, PositionUpdate, RelationFilter, RelationUpdate, Staff, StaffFilter,
    StaffUpdate,
};
