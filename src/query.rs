//! Leg-fetch boundary.
//!
//! The engine never talks to the CDR store directly. A [`LegSource`] hands it
//! the legs selected by a [`LegQuery`]: a call date window, an optional
//! number filter that keeps whole correlation groups, and a `Dial`-only
//! switch.

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use chrono::NaiveDateTime;
use tracing::debug;

use crate::constants::{COUNTRY_PREFIX, LASTAPP_DIAL, NATIONAL_PREFIX};
use crate::error::CdrResult;
use crate::leg::LegRecord;

/// Spellings under which a number may appear in CDR columns.
///
/// `+33612345678` and `0612345678` are the same line; short internal numbers
/// may also have been dialed with the national prefix.
pub fn number_variants(number: &str) -> Vec<String> {
    let number = number.trim();
    if let Some(national) = number.strip_prefix(COUNTRY_PREFIX) {
        vec![national.to_string(), format!("{}{}", NATIONAL_PREFIX, national)]
    } else if let Some(stripped) = number.strip_prefix(NATIONAL_PREFIX) {
        vec![number.to_string(), stripped.to_string()]
    } else {
        vec![number.to_string(), format!("{}{}", NATIONAL_PREFIX, number)]
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LegQuery {
    /// Inclusive lower bound on the call date
    pub from: Option<NaiveDateTime>,
    /// Inclusive upper bound on the call date
    pub to: Option<NaiveDateTime>,
    /// Keep only groups touching one of these numbers; empty keeps all
    pub numbers: Vec<String>,
    /// Keep only legs whose last application is `Dial`
    pub dial_only: bool,
}

impl LegQuery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn between(from: NaiveDateTime, to: NaiveDateTime) -> Self {
        Self {
            from: Some(from),
            to: Some(to),
            ..Default::default()
        }
    }

    pub fn with_numbers<I, S>(mut self, numbers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.numbers = numbers
            .into_iter()
            .map(Into::into)
            .collect();
        self
    }

    pub fn dial_only(mut self, dial_only: bool) -> Self {
        self.dial_only = dial_only;
        self
    }

    pub fn in_range(&self, leg: &LegRecord) -> bool {
        self.from
            .map_or(true, |from| leg.timestamp >= from)
            && self
                .to
                .map_or(true, |to| leg.timestamp <= to)
    }

    /// Apply the query to a leg list, keeping input order.
    ///
    /// The number filter is evaluated on every in-range leg, before the
    /// `Dial`-only restriction, so a group is kept whole even when the
    /// matching leg is not itself a `Dial` leg.
    pub fn apply(&self, legs: Vec<LegRecord>) -> Vec<LegRecord> {
        let in_range: Vec<LegRecord> = legs
            .into_iter()
            .filter(|leg| self.in_range(leg))
            .collect();

        let matched: Option<HashSet<String>> = if self
            .numbers
            .is_empty()
        {
            None
        } else {
            let variants = self.variants();
            Some(
                in_range
                    .iter()
                    .filter(|leg| leg_matches(leg, &variants))
                    .map(|leg| {
                        leg.correlation_id
                            .clone()
                    })
                    .collect(),
            )
        };

        let selected: Vec<LegRecord> = in_range
            .into_iter()
            .filter(|leg| !self.dial_only || leg.last_app == LASTAPP_DIAL)
            .filter(|leg| {
                matched
                    .as_ref()
                    .map_or(true, |ids| ids.contains(&leg.correlation_id))
            })
            .collect();
        debug!("Query selected {} legs", selected.len());
        selected
    }

    fn variants(&self) -> HashSet<String> {
        self.numbers
            .iter()
            .flat_map(|number| number_variants(number))
            .filter(|variant| !variant.is_empty())
            .collect()
    }
}

fn leg_matches(leg: &LegRecord, variants: &HashSet<String>) -> bool {
    variants
        .iter()
        .any(|variant| {
            let channel_marker = format!("PJSIP/{}", variant);
            leg.src == *variant
                || leg.dst == *variant
                || leg.did.as_deref() == Some(variant.as_str())
                || leg
                    .channel
                    .contains(&channel_marker)
                || leg
                    .dst_channel
                    .contains(&channel_marker)
        })
}

/// Anything able to produce raw legs for a query.
pub trait LegSource {
    fn fetch(&self, query: &LegQuery) -> CdrResult<Vec<LegRecord>>;
}

/// Legs already loaded in memory.
#[derive(Debug, Clone, Default)]
pub struct MemoryLegSource {
    legs: Vec<LegRecord>,
}

impl MemoryLegSource {
    pub fn new(legs: Vec<LegRecord>) -> Self {
        Self { legs }
    }
}

impl LegSource for MemoryLegSource {
    fn fetch(&self, query: &LegQuery) -> CdrResult<Vec<LegRecord>> {
        Ok(query.apply(
            self.legs
                .clone(),
        ))
    }
}

/// CDR export on disk: a JSON array, or one JSON row per line.
#[derive(Debug, Clone)]
pub struct JsonFileLegSource {
    path: PathBuf,
}

impl JsonFileLegSource {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path
                .as_ref()
                .to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Every leg in the file, unfiltered.
    pub fn load(&self) -> CdrResult<Vec<LegRecord>> {
        let text = fs::read_to_string(&self.path)?;
        let legs = if text
            .trim_start()
            .starts_with('[')
        {
            LegRecord::from_json_array(&text)?
        } else {
            LegRecord::from_json_lines(&text)?
        };
        debug!("Loaded {} legs from {}", legs.len(), self.path.display());
        Ok(legs)
    }
}

impl LegSource for JsonFileLegSource {
    fn fetch(&self, query: &LegQuery) -> CdrResult<Vec<LegRecord>> {
        Ok(query.apply(self.load()?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::leg::parse_calldate;

    fn leg(correlation_id: &str, calldate: &str, src: &str, dst: &str) -> LegRecord {
        LegRecord {
            timestamp: parse_calldate(calldate).unwrap(),
            correlation_id: correlation_id.into(),
            src: src.into(),
            dst: dst.into(),
            last_app: "Dial".into(),
            ..Default::default()
        }
    }

    #[test]
    fn variants_of_each_spelling() {
        assert_eq!(
            number_variants("+33601020304"),
            vec!["601020304".to_string(), "0601020304".to_string()]
        );
        assert_eq!(
            number_variants("0601020304"),
            vec!["0601020304".to_string(), "601020304".to_string()]
        );
        assert_eq!(
            number_variants("101"),
            vec!["101".to_string(), "0101".to_string()]
        );
    }

    #[test]
    fn date_window_is_inclusive() {
        let query = LegQuery::between(
            parse_calldate("2025-05-01 08:00:00").unwrap(),
            parse_calldate("2025-05-01 09:00:00").unwrap(),
        );
        let legs = query.apply(vec![
            leg("a", "2025-05-01 08:00:00", "101", "102"),
            leg("b", "2025-05-01 09:00:00", "101", "102"),
            leg("c", "2025-05-01 09:00:01", "101", "102"),
        ]);
        let ids: Vec<&str> = legs
            .iter()
            .map(|l| l.correlation_id.as_str())
            .collect();
        assert_eq!(ids, vec!["a", "b"]);
    }

    #[test]
    fn number_filter_keeps_whole_groups() {
        let query = LegQuery::new().with_numbers(["+33601020304"]);
        let legs = query.apply(vec![
            leg("a", "2025-05-01 08:00:00", "0601020304", "600"),
            leg("a", "2025-05-01 08:00:05", "600", "101"),
            leg("b", "2025-05-01 08:10:00", "102", "103"),
            LegRecord {
                channel: "PJSIP/601020304-00000001".into(),
                ..leg("c", "2025-05-01 08:20:00", "", "104")
            },
        ]);
        let ids: Vec<&str> = legs
            .iter()
            .map(|l| l.correlation_id.as_str())
            .collect();
        assert_eq!(ids, vec!["a", "a", "c"]);
    }

    #[test]
    fn did_matches_number() {
        let query = LegQuery::new().with_numbers(["0199998888"]);
        let legs = query.apply(vec![LegRecord {
            did: Some("0199998888".into()),
            ..leg("a", "2025-05-01 08:00:00", "0601020304", "600")
        }]);
        assert_eq!(legs.len(), 1);
    }

    #[test]
    fn dial_only_drops_other_applications() {
        let query = LegQuery::new()
            .with_numbers(["101"])
            .dial_only(true);
        let legs = query.apply(vec![
            LegRecord {
                last_app: "Queue".into(),
                ..leg("a", "2025-05-01 08:00:00", "101", "600")
            },
            leg("a", "2025-05-01 08:00:02", "600", "102"),
        ]);
        assert_eq!(legs.len(), 1);
        assert_eq!(legs[0].src, "600");
    }

    #[test]
    fn memory_source_applies_query() {
        let source = MemoryLegSource::new(vec![
            leg("a", "2025-05-01 08:00:00", "101", "102"),
            leg("b", "2025-05-02 08:00:00", "101", "102"),
        ]);
        let query = LegQuery {
            to: Some(parse_calldate("2025-05-01").unwrap() + chrono::Duration::days(1)),
            ..Default::default()
        };
        assert_eq!(source.fetch(&query).unwrap().len(), 1);
    }

    #[test]
    fn missing_file_is_io_error() {
        let err = JsonFileLegSource::new("/nonexistent/cdr.json")
            .fetch(&LegQuery::new())
            .unwrap_err();
        assert!(matches!(err, crate::error::CdrError::Io(_)));
    }
}
