//! Flag identifier catalog as published by the game server, and the
//! flattening pass that turns it into persistable records.
//!
//! The catalog is a four-level JSON object:
//!
//! ```text
//! { "<service>": { "<team>": { "<round>": { "<description>": "<flagid>" } } } }
//! ```
//!
//! Team and round keys are integers serialized as text. Every level keeps the
//! key order of the response body so that flattening is deterministic.

use std::collections::HashMap;
use std::fmt;
use std::marker::PhantomData;

use chrono::{DateTime, Utc};
use serde::de::{Deserialize, Deserializer, MapAccess, Visitor};
use serde::Serialize;
use thiserror::Error;

/// A JSON object whose values all share type `V`, in source order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entries<V>(Vec<(String, V)>);

impl<V> Entries<V> {
    #[must_use]
    pub fn new() -> Self {
        Self(Vec::new())
    }

    pub fn push(&mut self, key: impl Into<String>, value: V) {
        self.0.push((key.into(), value));
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &V)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v))
    }
}

impl<V> Default for Entries<V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: Into<String>, V> FromIterator<(K, V)> for Entries<V> {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(iter.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }
}

impl<'de, V: Deserialize<'de>> Deserialize<'de> for Entries<V> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct EntriesVisitor<V>(PhantomData<V>);

        impl<'de, V: Deserialize<'de>> Visitor<'de> for EntriesVisitor<V> {
            type Value = Entries<V>;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("a JSON object")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<Self::Value, A::Error> {
                let mut entries: Vec<(String, V)> =
                    Vec::with_capacity(map.size_hint().unwrap_or(0));
                let mut positions: HashMap<String, usize> = HashMap::new();
                while let Some((key, value)) = map.next_entry::<String, V>()? {
                    // A repeated key replaces the earlier value where it stood.
                    match positions.get(&key) {
                        Some(&index) => entries[index].1 = value,
                        None => {
                            positions.insert(key.clone(), entries.len());
                            entries.push((key, value));
                        }
                    }
                }
                Ok(Entries(entries))
            }
        }

        deserializer.deserialize_map(EntriesVisitor(PhantomData))
    }
}

/// Description → flag identifier.
pub type Descriptions = Entries<String>;
/// Round → descriptions.
pub type Rounds = Entries<Descriptions>;
/// Team → rounds.
pub type Teams = Entries<Rounds>;

/// The full catalog: service → team → round → description → flag identifier.
#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Deserialize)]
#[serde(transparent)]
pub struct Catalog(Entries<Teams>);

impl Catalog {
    /// Decode a catalog from a JSON response body.
    ///
    /// # Errors
    /// Returns the underlying `serde_json` error if the body is not JSON or
    /// does not have the four-level object shape with string leaves.
    pub fn from_json(body: &[u8]) -> Result<Self, serde_json::Error> {
        serde_json::from_slice(body)
    }

    /// Iterate services in source order.
    pub fn services(&self) -> impl Iterator<Item = (&str, &Teams)> {
        self.0.iter()
    }

    /// Number of services in the catalog.
    #[must_use]
    pub fn service_count(&self) -> usize {
        self.0.len()
    }

    /// Number of flag identifiers (leaves) in the catalog.
    #[must_use]
    pub fn identifier_count(&self) -> usize {
        self.services()
            .flat_map(|(_, teams)| teams.iter())
            .flat_map(|(_, rounds)| rounds.iter())
            .map(|(_, descriptions)| descriptions.len())
            .sum()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl FromIterator<(String, Teams)> for Catalog {
    fn from_iter<I: IntoIterator<Item = (String, Teams)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// One persisted flag identifier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FlagRecord {
    pub service: String,
    pub team: i64,
    pub round: i64,
    pub flagid: String,
    pub description: String,
    /// Reconciliation time, shared by every record of one cycle.
    pub timestamp: DateTime<Utc>,
}

impl FlagRecord {
    /// The uniqueness key of this record. The description is not part of it.
    #[must_use]
    pub fn key(&self) -> RecordKey {
        RecordKey {
            service: self.service.clone(),
            team: self.team,
            round: self.round,
            flagid: self.flagid.clone(),
        }
    }
}

/// (service, team, round, flagid): at most one record per key survives a cycle.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RecordKey {
    pub service: String,
    pub team: i64,
    pub round: i64,
    pub flagid: String,
}

impl fmt::Display for RecordKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}/team {}/round {}/{}",
            self.service, self.team, self.round, self.flagid
        )
    }
}

/// Which integer-valued catalog level a malformed key was found at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyLevel {
    Team,
    Round,
}

impl fmt::Display for KeyLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KeyLevel::Team => f.write_str("team"),
            KeyLevel::Round => f.write_str("round"),
        }
    }
}

/// A team or round key that does not parse as an integer.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("malformed {level} key {key:?} in service {service:?}: expected an integer")]
pub struct MalformedKeyError {
    pub level: KeyLevel,
    pub service: String,
    pub key: String,
}

fn parse_key(level: KeyLevel, service: &str, key: &str) -> Result<i64, MalformedKeyError> {
    key.parse::<i64>().map_err(|_| MalformedKeyError {
        level,
        service: service.to_string(),
        key: key.to_string(),
    })
}

/// Flatten a catalog into records stamped with `timestamp`.
///
/// Records come out ordered by service, team, round and description, each in
/// catalog order. A single malformed team or round key rejects the whole
/// catalog.
///
/// # Errors
/// Returns `MalformedKeyError` for the first team or round key that is not an
/// integer.
pub fn flatten(
    catalog: &Catalog,
    timestamp: DateTime<Utc>,
) -> Result<Vec<FlagRecord>, MalformedKeyError> {
    let mut records = Vec::with_capacity(catalog.identifier_count());

    for (service, teams) in catalog.services() {
        for (team_key, rounds) in teams.iter() {
            let team = parse_key(KeyLevel::Team, service, team_key)?;
            for (round_key, descriptions) in rounds.iter() {
                let round = parse_key(KeyLevel::Round, service, round_key)?;
                for (description, flagid) in descriptions.iter() {
                    records.push(FlagRecord {
                        service: service.to_string(),
                        team,
                        round,
                        flagid: flagid.clone(),
                        description: description.to_string(),
                        timestamp,
                    });
                }
            }
        }
    }

    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn ts() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 5).unwrap()
    }

    fn parse(body: &str) -> Catalog {
        Catalog::from_json(body.as_bytes()).expect("catalog should decode")
    }

    const GAME_CATALOG: &str = r#"{
        "service1": {
            "1": {
                "20": {"flagid1_desc": "flagid1_service1_team1_round20", "flagid2_desc": "flagid2_service1_team1_round20"},
                "21": {"flagid1_desc": "flagid1_service1_team1_round21"}
            },
            "2": {
                "20": {"flagid1_desc": "flagid1_service1_team2_round20"}
            }
        },
        "service2": {
            "1": {
                "24": {"flagid1_desc": "kenneth71"}
            },
            "2": {
                "24": {"flagid1_desc": "kenneth71"}
            }
        }
    }"#;

    #[test]
    fn flatten_produces_one_record_per_leaf() {
        let catalog = parse(GAME_CATALOG);
        assert_eq!(catalog.service_count(), 2);
        assert_eq!(catalog.identifier_count(), 6);

        let records = flatten(&catalog, ts()).unwrap();
        assert_eq!(records.len(), 6);

        let first = &records[0];
        assert_eq!(first.service, "service1");
        assert_eq!(first.team, 1);
        assert_eq!(first.round, 20);
        assert_eq!(first.description, "flagid1_desc");
        assert_eq!(first.flagid, "flagid1_service1_team1_round20");
    }

    #[test]
    fn flatten_counts_match_product_of_levels() {
        // 3 services x 4 teams x 5 rounds x 2 descriptions
        let mut services = Vec::new();
        for s in 0..3 {
            let teams: Teams = (1..=4)
                .map(|t| {
                    let rounds: Rounds = (100..105)
                        .map(|r| {
                            let descs: Descriptions = ["user", "note"]
                                .iter()
                                .map(|d| (d.to_string(), format!("{s}-{t}-{r}-{d}")))
                                .collect();
                            (r.to_string(), descs)
                        })
                        .collect();
                    (t.to_string(), rounds)
                })
                .collect();
            services.push((format!("svc{s}"), teams));
        }
        let catalog: Catalog = services.into_iter().collect();

        let records = flatten(&catalog, ts()).unwrap();
        assert_eq!(records.len(), 3 * 4 * 5 * 2);
        assert!(records.iter().all(|r| r.flagid
            == format!("{}-{}-{}-{}", &r.service[3..], r.team, r.round, r.description)));
    }

    #[test]
    fn repeated_json_key_keeps_last_value_in_first_position() {
        let catalog = parse(r#"{"svc1":{"1":{"20":{"user":"a","note":"n","user":"b"}}}}"#);
        assert_eq!(catalog.identifier_count(), 2);

        let records = flatten(&catalog, ts()).unwrap();
        let leaves: Vec<(&str, &str)> = records
            .iter()
            .map(|r| (r.description.as_str(), r.flagid.as_str()))
            .collect();
        assert_eq!(leaves, vec![("user", "b"), ("note", "n")]);
    }

    #[test]
    fn repeated_team_key_replaces_whole_subtree() {
        let catalog = parse(r#"{"svc1":{"1":{"20":{"user":"old"}},"1":{"21":{"user":"new"}}}}"#);

        let records = flatten(&catalog, ts()).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].round, 21);
        assert_eq!(records[0].flagid, "new");
    }

    #[test]
    fn flatten_keeps_source_order_at_every_level() {
        let catalog = parse(
            r#"{
                "zeta": {"3": {"9": {"b": "z1", "a": "z2"}}, "1": {"2": {"x": "z3"}}},
                "alpha": {"2": {"5": {"only": "a1"}}}
            }"#,
        );

        let order: Vec<_> = flatten(&catalog, ts())
            .unwrap()
            .into_iter()
            .map(|r| r.flagid)
            .collect();
        assert_eq!(order, vec!["z1", "z2", "z3", "a1"]);
    }

    #[test]
    fn flatten_stamps_every_record_with_the_same_timestamp() {
        let records = flatten(&parse(GAME_CATALOG), ts()).unwrap();
        assert!(records.iter().all(|r| r.timestamp == ts()));
    }

    #[test]
    fn flatten_rejects_non_numeric_team_key() {
        let catalog = parse(
            r#"{"service1": {"1": {"20": {"d": "ok"}}, "two": {"20": {"d": "bad"}}}}"#,
        );

        let err = flatten(&catalog, ts()).unwrap_err();
        assert_eq!(err.level, KeyLevel::Team);
        assert_eq!(err.key, "two");
        assert_eq!(err.service, "service1");
        assert!(err.to_string().contains("\"two\""));
    }

    #[test]
    fn flatten_rejects_non_numeric_round_key() {
        let catalog = parse(r#"{"svc": {"1": {"round-20": {"d": "x"}}}}"#);

        let err = flatten(&catalog, ts()).unwrap_err();
        assert_eq!(err.level, KeyLevel::Round);
        assert_eq!(err.key, "round-20");
    }

    #[test]
    fn flatten_normalizes_leading_zeros() {
        let catalog = parse(r#"{"svc": {"007": {"0020": {"d": "x"}}}}"#);

        let records = flatten(&catalog, ts()).unwrap();
        assert_eq!(records[0].team, 7);
        assert_eq!(records[0].round, 20);
    }

    #[test]
    fn flatten_empty_catalog_yields_nothing() {
        let catalog = parse("{}");
        assert!(catalog.is_empty());
        assert!(flatten(&catalog, ts()).unwrap().is_empty());
    }

    #[test]
    fn decode_rejects_non_string_leaf() {
        let err = Catalog::from_json(br#"{"svc": {"1": {"2": {"d": 42}}}}"#).unwrap_err();
        assert!(err.is_data());
    }

    #[test]
    fn decode_rejects_array_level() {
        let err = Catalog::from_json(br#"{"svc": [1, 2, 3]}"#).unwrap_err();
        assert!(err.to_string().contains("a JSON object"));
    }

    #[test]
    fn decode_rejects_garbage() {
        assert!(Catalog::from_json(b"<html>502 Bad Gateway</html>").is_err());
    }

    #[test]
    fn record_key_ignores_description() {
        let a = FlagRecord {
            service: "svc".into(),
            team: 1,
            round: 2,
            flagid: "id".into(),
            description: "first".into(),
            timestamp: ts(),
        };
        let b = FlagRecord {
            description: "second".into(),
            ..a.clone()
        };
        assert_eq!(a.key(), b.key());
        assert_eq!(a.key().to_string(), "svc/team 1/round 2/id");
    }
}
