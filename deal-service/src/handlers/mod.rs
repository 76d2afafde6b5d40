mod audit;
mod contacts;
mod documents;
mod filings;
mod health;
mod organizations;
mod spacs;
mod targets;

pub use audit::{export_audit_logs, list_audit_logs};
pub use contacts::{create_contact, delete_contact, get_contact, list_contacts, update_contact};
pub use documents::{
    analyze_document, delete_document, download_document, get_document, list_documents,
    update_document, upload_document,
};
pub use filings::lookup_filings;
pub use health::health_check;
pub use organizations::{create_organization, get_organization, list_members};
pub use spacs::{create_spac, delete_spac, get_spac, list_spacs, score_spac, update_spac};
pub use targets::{create_target, delete_target, get_target, list_targets, update_target};
