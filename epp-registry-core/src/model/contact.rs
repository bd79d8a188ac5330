//! Contact resources.

use serde::{Deserialize, Serialize};

use epp_registry_proto::command::PostalInfo;

use super::resource::ResourceCommon;
use super::transfer::TransferData;

/// A registrant/admin/tech contact object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Contact {
    pub common: ResourceCommon,
    pub postal_info: PostalInfo,
    pub voice: Option<String>,
    pub fax: Option<String>,
    pub email: String,
    pub auth_info: String,
    pub transfer_data: TransferData,
}
