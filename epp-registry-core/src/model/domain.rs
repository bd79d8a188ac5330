//! Domain resources.

use std::collections::BTreeSet;

use chrono::{DateTime, Datelike, Utc};
use serde::{Deserialize, Serialize};

use super::resource::ResourceCommon;
use super::transfer::TransferData;

/// Maximum number of nameservers a domain may reference (RFC 5731 policy).
pub const MAX_NAMESERVERS: usize = 13;

/// A registered domain.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Domain {
    pub common: ResourceCommon,
    /// TLD the name is registered under.
    pub tld: String,
    /// Registrant contact id (weak reference).
    pub registrant: String,
    /// Designated (type, contact id) pairs: admin, tech, billing.
    pub contacts: Vec<(String, String)>,
    /// Nameserver host names (weak references, looked up at read time).
    pub nameservers: BTreeSet<String>,
    /// Names of hosts subordinate to this domain. Maintained by host flows.
    pub subordinate_hosts: BTreeSet<String>,
    pub registration_expiration_time: DateTime<Utc>,
    pub transfer_data: TransferData,
    pub auth_info: String,
    /// Open-ended autorenew entities, ended when the domain is deleted or
    /// transferred.
    pub autorenew_billing_id: Option<u64>,
    pub autorenew_poll_id: Option<u64>,
}

impl Domain {
    /// Extends an expiration by `years`, capped at ten years from `now`.
    ///
    /// ICANN policy: no registration may have more than ten years of
    /// unexpired term at any moment.
    #[must_use]
    pub fn extend_registration_with_cap(
        now: DateTime<Utc>,
        current_expiration: DateTime<Utc>,
        years: u32,
    ) -> DateTime<Utc> {
        let years = i32::try_from(years).unwrap_or(i32::MAX);
        let extended = add_years(current_expiration, years);
        let cap = add_years(now, 10);
        extended.min(cap)
    }
}

/// Adds calendar years, clamping Feb 29 to Feb 28 on non-leap years.
#[must_use]
pub fn add_years(time: DateTime<Utc>, years: i32) -> DateTime<Utc> {
    time.with_year(time.year() + years)
        .or_else(|| time.with_day(28).and_then(|t| t.with_year(t.year() + years)))
        .unwrap_or(time)
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    #[test]
    fn extension_is_capped_at_ten_years_from_now() {
        let now = Utc.with_ymd_and_hms(2026, 8, 7, 0, 0, 0).unwrap();
        let expiration = Utc.with_ymd_and_hms(2035, 8, 7, 0, 0, 0).unwrap();
        let extended = Domain::extend_registration_with_cap(now, expiration, 5);
        assert_eq!(extended, Utc.with_ymd_and_hms(2036, 8, 7, 0, 0, 0).unwrap());
    }

    #[test]
    fn extension_below_cap_is_untouched() {
        let now = Utc.with_ymd_and_hms(2026, 8, 7, 0, 0, 0).unwrap();
        let expiration = Utc.with_ymd_and_hms(2027, 8, 7, 0, 0, 0).unwrap();
        let extended = Domain::extend_registration_with_cap(now, expiration, 2);
        assert_eq!(extended, Utc.with_ymd_and_hms(2029, 8, 7, 0, 0, 0).unwrap());
    }

    #[test]
    fn leap_day_clamps() {
        let leap = Utc.with_ymd_and_hms(2028, 2, 29, 12, 0, 0).unwrap();
        let next = add_years(leap, 1);
        assert_eq!(next, Utc.with_ymd_and_hms(2029, 2, 28, 12, 0, 0).unwrap());
    }
}
