//! Aggregate figures over reconstructed calls, for reports.

use std::collections::BTreeMap;
use std::hash::Hash;

use chrono::{NaiveDate, Timelike};
use indexmap::IndexMap;
use serde::Serialize;

use crate::call::{Call, CallDirection};

/// Counters and durations over a set of calls. Durations are in seconds;
/// averages only consider answered calls and are truncated.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CallStatistics {
    pub total: usize,
    pub received: usize,
    pub emitted: usize,

    pub internal: usize,
    pub internal_emitted: usize,
    pub internal_received: usize,

    pub missed: usize,
    pub missed_external: usize,
    pub missed_internal: usize,
    pub internal_answered_received: usize,

    pub reached: usize,
    pub reached_external: usize,
    pub reached_internal: usize,

    pub total_duration: u64,
    pub received_duration: u64,
    pub internal_received_duration: u64,
    pub external_received_duration: u64,
    pub emitted_duration: u64,
    pub internal_emitted_duration: u64,
    pub external_emitted_duration: u64,

    pub average_duration: u64,
    pub average_internal_duration: u64,
    pub average_external_duration: u64,

    pub forwarded_received: usize,
    pub forwarded_received_duration: u64,

    pub click_to_call: usize,
}

impl CallStatistics {
    /// Without reference numbers, internal calls are left out entirely:
    /// the report is then about the company's external traffic.
    pub fn from_calls(calls: &[Call], reference_numbers: &[String]) -> Self {
        let calls: Vec<&Call> = calls
            .iter()
            .filter(|call| !reference_numbers.is_empty() || !call.is_internal)
            .collect();

        let mut stats = Self {
            total: calls.len(),
            ..Default::default()
        };
        let mut answered = Averager::default();
        let mut answered_internal = Averager::default();
        let mut answered_external = Averager::default();

        for call in calls {
            let inbound = call.direction == CallDirection::Inbound;
            let outbound = call.direction == CallDirection::Outbound;
            let is_answered = call.is_answered();
            let duration = call.duration;

            stats.total_duration = stats
                .total_duration
                .saturating_add(duration);
            if call.is_internal {
                stats.internal += 1;
            }
            if call.is_click_to_call {
                stats.click_to_call += 1;
            }

            if inbound {
                stats.received += 1;
                stats.received_duration = stats
                    .received_duration
                    .saturating_add(duration);
                if call.is_internal {
                    stats.internal_received += 1;
                    stats.internal_received_duration = stats
                        .internal_received_duration
                        .saturating_add(duration);
                } else {
                    stats.external_received_duration = stats
                        .external_received_duration
                        .saturating_add(duration);
                }
                if is_answered {
                    if call.is_internal {
                        stats.internal_answered_received += 1;
                    }
                } else {
                    stats.missed += 1;
                    if call.is_internal {
                        stats.missed_internal += 1;
                    } else {
                        stats.missed_external += 1;
                    }
                }
                if call.is_forwarded() {
                    stats.forwarded_received += 1;
                    stats.forwarded_received_duration = stats
                        .forwarded_received_duration
                        .saturating_add(duration);
                }
            }

            if outbound {
                stats.emitted += 1;
                stats.emitted_duration = stats
                    .emitted_duration
                    .saturating_add(duration);
                if call.is_internal {
                    stats.internal_emitted += 1;
                    stats.internal_emitted_duration = stats
                        .internal_emitted_duration
                        .saturating_add(duration);
                } else {
                    stats.external_emitted_duration = stats
                        .external_emitted_duration
                        .saturating_add(duration);
                }
                if is_answered {
                    stats.reached += 1;
                    if call.is_internal {
                        stats.reached_internal += 1;
                    } else {
                        stats.reached_external += 1;
                    }
                }
            }

            if is_answered {
                answered.add(duration);
                if call.is_internal {
                    answered_internal.add(duration);
                } else {
                    answered_external.add(duration);
                }
            }
        }

        stats.average_duration = answered.truncated_mean();
        stats.average_internal_duration = answered_internal.truncated_mean();
        stats.average_external_duration = answered_external.truncated_mean();
        stats
    }
}

#[derive(Default)]
struct Averager {
    sum: u64,
    count: u64,
}

impl Averager {
    fn add(&mut self, value: u64) {
        self.sum = self
            .sum
            .saturating_add(value);
        self.count += 1;
    }

    fn truncated_mean(&self) -> u64 {
        if self.count == 0 {
            0
        } else {
            self.sum / self.count
        }
    }
}

/// Figures for one bucket of a breakdown (an hour, a day, a number).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Breakdown<K> {
    pub key: K,
    pub calls: usize,
    pub received: usize,
    pub emitted: usize,
    pub answered: usize,
    pub total_duration: u64,
    /// Mean over calls with a positive duration, halves rounded to even
    pub mean_duration: u64,
    /// Percentage of answered calls, one decimal
    pub answer_rate: f64,
}

impl<K> Breakdown<K> {
    fn new(key: K) -> Self {
        Self {
            key,
            calls: 0,
            received: 0,
            emitted: 0,
            answered: 0,
            total_duration: 0,
            mean_duration: 0,
            answer_rate: 0.0,
        }
    }

    fn add(&mut self, call: &Call, positive: &mut Averager) {
        self.calls += 1;
        match call.direction {
            CallDirection::Inbound => self.received += 1,
            CallDirection::Outbound => self.emitted += 1,
            CallDirection::Internal => {}
        }
        if call.is_answered() {
            self.answered += 1;
        }
        self.total_duration = self
            .total_duration
            .saturating_add(call.duration);
        if call.duration > 0 {
            positive.add(call.duration);
        }
    }

    fn finish(mut self, positive: &Averager) -> Self {
        if positive.count > 0 {
            let mean = positive.sum as f64 / positive.count as f64;
            self.mean_duration = mean.round_ties_even() as u64;
        }
        if self.calls > 0 {
            let rate = self.answered as f64 / self.calls as f64 * 100.0;
            self.answer_rate = (rate * 10.0).round_ties_even() / 10.0;
        }
        self
    }
}

fn breakdown<'a, K, I>(calls: I, key: impl Fn(&Call) -> K) -> IndexMap<K, Breakdown<K>>
where
    K: Hash + Eq + Clone,
    I: IntoIterator<Item = &'a Call>,
{
    let mut buckets: IndexMap<K, (Breakdown<K>, Averager)> = IndexMap::new();
    for call in calls {
        let k = key(call);
        let (bucket, positive) = buckets
            .entry(k.clone())
            .or_insert_with(|| (Breakdown::new(k), Averager::default()));
        bucket.add(call, positive);
    }
    buckets
        .into_iter()
        .map(|(k, (bucket, positive))| (k, bucket.finish(&positive)))
        .collect()
}

/// Calls per hour of the day, hours in ascending order.
pub fn hourly(calls: &[Call]) -> Vec<Breakdown<u32>> {
    let sorted: BTreeMap<u32, Breakdown<u32>> = breakdown(calls, |call| {
        call.start_time
            .hour()
    })
    .into_iter()
    .collect();
    sorted
        .into_values()
        .collect()
}

/// Calls per calendar day, days in ascending order.
pub fn daily(calls: &[Call]) -> Vec<Breakdown<NaiveDate>> {
    let sorted: BTreeMap<NaiveDate, Breakdown<NaiveDate>> = breakdown(calls, |call| {
        call.start_time
            .date()
    })
    .into_iter()
    .collect();
    sorted
        .into_values()
        .collect()
}

fn top_by(
    calls: &[Call],
    direction: CallDirection,
    n: usize,
    key: impl Fn(&Call) -> String,
) -> Vec<Breakdown<String>> {
    let mut rows: Vec<Breakdown<String>> = breakdown(
        calls
            .iter()
            .filter(|call| call.direction == direction),
        key,
    )
    .into_values()
    .collect();
    rows.sort_by(|a, b| b.calls.cmp(&a.calls));
    rows.truncate(n);
    rows
}

/// Most called numbers among outbound calls.
pub fn top_destinations(calls: &[Call], n: usize) -> Vec<Breakdown<String>> {
    top_by(calls, CallDirection::Outbound, n, |call| {
        call.destination
            .clone()
    })
}

/// Most frequent callers among inbound calls.
pub fn top_sources(calls: &[Call], n: usize) -> Vec<Breakdown<String>> {
    top_by(calls, CallDirection::Inbound, n, |call| {
        call.source
            .clone()
    })
}

/// Every breakdown of a report at once.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Breakdowns {
    pub hourly: Vec<Breakdown<u32>>,
    pub daily: Vec<Breakdown<NaiveDate>>,
    pub top_destinations: Vec<Breakdown<String>>,
    pub top_sources: Vec<Breakdown<String>>,
}

impl Breakdowns {
    pub fn of(calls: &[Call], top_n: usize) -> Self {
        Self {
            hourly: hourly(calls),
            daily: daily(calls),
            top_destinations: top_destinations(calls, top_n),
            top_sources: top_sources(calls, top_n),
        }
    }
}

/// `HH:MM:SS`, hours not wrapped at 24.
pub fn format_duration(seconds: u64) -> String {
    format!(
        "{:02}:{:02}:{:02}",
        seconds / 3600,
        (seconds % 3600) / 60,
        seconds % 60
    )
}
