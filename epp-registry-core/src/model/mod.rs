//! The persistent resource model.
//!
//! Resources are immutable value records: every mutation builds a whole new
//! version, and the previous version survives only as the read snapshot the
//! commit coordinator checks against. Cross-resource links (domain →
//! nameserver hosts, host → superordinate domain) are plain identifier
//! fields resolved through the store at read time, never owning pointers.

mod billing;
mod contact;
mod domain;
mod history;
mod host;
mod poll;
mod resource;
mod tld;
mod transfer;

pub use billing::{BillingEvent, BillingKind, BillingReason};
pub use contact::Contact;
pub use domain::{add_years, Domain, MAX_NAMESERVERS};
pub use history::{HistoryEntry, HistoryType};
pub use host::Host;
pub use poll::{PollMessage, PollMessageKind};
pub use resource::{end_of_time, RepoId, Resource, ResourceCommon};
pub use tld::Tld;
pub use transfer::{TransferData, TransferStatus};
