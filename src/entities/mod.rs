// Entity Models - canonical rows of the capital-repair store
//
// Each entity has:
// - A natural key that every upsert conflicts on
// - Optional descriptive values (a blank value never overwrites a stored one)
// - Plain data only; persistence lives in db.rs

pub mod building;
pub mod company;
pub mod components;

pub use building::{AccountOwnerType, Building, Municipality};
pub use company::{BuildingLink, ContactUpdate, ManagementCompany, OrgType};
pub use components::{ConstructionElement, Lift, Service};
