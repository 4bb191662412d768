//! Deterministic session ids.
//!
//! Upstream feeds that don't carry ids get one derived from the session start:
//! a version 5 UUID over the configured namespace and the start instant in its
//! canonical form. The same instant always renders to the same string, so an
//! unchanged session keeps its id across polls and restarts.

use chrono::{DateTime, SecondsFormat, Utc};
use uuid::Uuid;

/// Namespace used when none is configured.
pub const DEFAULT_NAMESPACE: Uuid = Uuid::from_u128(0xd0fb8c8a_8682_4c99_8365_333f3c727d63);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IdentityDeriver {
    namespace: Uuid,
}

impl IdentityDeriver {
    pub fn new(namespace: Uuid) -> Self {
        IdentityDeriver { namespace }
    }

    pub fn namespace(&self) -> Uuid {
        self.namespace
    }

    pub fn derive(&self, start: &DateTime<Utc>) -> Uuid {
        Uuid::new_v5(&self.namespace, canonical_instant(start).as_bytes())
    }
}

impl Default for IdentityDeriver {
    fn default() -> Self {
        IdentityDeriver::new(DEFAULT_NAMESPACE)
    }
}

/// RFC 3339 in UTC with a `Z` suffix. Sub-second digits only when non-zero.
pub fn canonical_instant(instant: &DateTime<Utc>) -> String {
    instant.to_rfc3339_opts(SecondsFormat::AutoSi, true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, FixedOffset, TimeZone};

    fn parse(s: &str) -> DateTime<Utc> {
        DateTime::<FixedOffset>::parse_from_rfc3339(s)
            .unwrap()
            .with_timezone(&Utc)
    }

    #[test]
    fn default_namespace_matches_deployed_value() {
        assert_eq!(
            DEFAULT_NAMESPACE.to_string(),
            "d0fb8c8a-8682-4c99-8365-333f3c727d63"
        );
    }

    #[test]
    fn canonical_form_ignores_parse_offset() {
        let utc = parse("2024-01-01T00:00:00Z");
        let shifted = parse("2024-01-01T01:00:00+01:00");

        assert_eq!(canonical_instant(&utc), "2024-01-01T00:00:00Z");
        assert_eq!(canonical_instant(&shifted), "2024-01-01T00:00:00Z");
    }

    #[test]
    fn same_start_same_id() {
        let deriver = IdentityDeriver::default();
        let a = deriver.derive(&parse("2024-01-01T00:00:00Z"));
        let b = deriver.derive(&parse("2023-12-31T19:00:00-05:00"));

        assert_eq!(a, b);
        assert_eq!(a.get_version_num(), 5);
    }

    #[test]
    fn id_is_v5_of_canonical_start() {
        let namespace = Uuid::from_u128(1);
        let deriver = IdentityDeriver::new(namespace);

        let expected = Uuid::new_v5(&namespace, b"2024-01-01T00:00:00Z");
        assert_eq!(deriver.derive(&parse("2024-01-01T00:00:00Z")), expected);
    }

    #[test]
    fn distinct_starts_distinct_ids() {
        let deriver = IdentityDeriver::default();
        let base = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();

        let ids: std::collections::HashSet<Uuid> = (0..500)
            .map(|i| deriver.derive(&(base + chrono::Duration::minutes(30 * i))))
            .collect();

        assert_eq!(ids.len(), 500);
    }

    #[test]
    fn namespace_changes_id() {
        let start = parse("2024-01-01T00:00:00Z");
        let a = IdentityDeriver::new(Uuid::from_u128(1)).derive(&start);
        let b = IdentityDeriver::new(Uuid::from_u128(2)).derive(&start);

        assert_ne!(a, b);
    }
}
