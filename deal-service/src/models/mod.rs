mod analysis;
mod audit_log;
mod contact;
mod document;
mod membership;
mod organization;
mod spac;
mod target;

pub use analysis::DocumentAnalysis;
pub use audit_log::{AuditAction, AuditLog, AuditSortField, EntityKind};
pub use contact::{Contact, ContactSortField};
pub use document::{Document, DocumentSortField};
pub use membership::{Membership, Role};
pub use organization::Organization;
pub use spac::{Spac, SpacSortField, SpacStatus};
pub use target::{Target, TargetSortField, TargetStage};
