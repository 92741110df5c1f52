//! Growth trend aggregation.
//!
//! Users and unlock requests are bucketed per calendar day (`month/day`, no
//! year), then walked in `(month, day)` order to build cumulative and daily
//! series. Match and request counters are computed per participant id.

use crate::types::firestore::{Fields, Value};
use crate::types::records::{RequestStatus, UnlockRequest, UserRecord};

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use time::{Duration, OffsetDateTime, UtcOffset};

/// A calendar day without its year. Orders by month, then day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct DayLabel {
    month: u8,
    day: u8,
}

impl DayLabel {
    pub fn new(month: u8, day: u8) -> Self {
        Self { month, day }
    }

    pub fn from_millis(millis: i64, offset: UtcOffset) -> Option<Self> {
        let utc = OffsetDateTime::from_unix_timestamp_nanos(i128::from(millis) * 1_000_000).ok()?;
        let local = utc.checked_add(Duration::seconds(i64::from(offset.whole_seconds())))?;
        Some(Self {
            month: u8::from(local.month()),
            day: local.day(),
        })
    }
}

impl fmt::Display for DayLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.month, self.day)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DailyBucket {
    pub new_users: u64,
    pub requests: u64,
    pub approved: u64,
    pub rejected: u64,
    pub active_users: u64,
}

pub type DailyBuckets = BTreeMap<DayLabel, DailyBucket>;

pub fn bucket_by_day(
    users: &[UserRecord],
    requests: &[UnlockRequest],
    offset: UtcOffset,
) -> DailyBuckets {
    let mut buckets = DailyBuckets::new();
    let day = |millis: Option<i64>| millis.and_then(|millis| DayLabel::from_millis(millis, offset));

    for user in users {
        if let Some(label) = day(user.registered_at) {
            buckets.entry(label).or_default().new_users += 1;
        }
        if let Some(label) = day(user.last_login) {
            buckets.entry(label).or_default().active_users += 1;
        }
    }

    for request in requests {
        let Some(label) = day(request.created_at) else {
            continue;
        };
        let bucket = buckets.entry(label).or_default();
        bucket.requests += 1;
        match request.status {
            RequestStatus::Approved => bucket.approved += 1,
            RequestStatus::Rejected => bucket.rejected += 1,
            RequestStatus::Pending | RequestStatus::Other(_) => {}
        }
    }

    buckets
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Series {
    pub labels: Vec<String>,
    pub user_history: Vec<u64>,
    pub request_history: Vec<u64>,
    pub approved_history: Vec<u64>,
    pub rejected_history: Vec<u64>,
    pub active_history: Vec<u64>,
    pub daily_user_history: Vec<u64>,
    pub daily_request_history: Vec<u64>,
}

pub fn derive_series(buckets: &DailyBuckets) -> Series {
    let mut series = Series::default();
    let mut running = DailyBucket::default();

    for (label, bucket) in buckets {
        running.new_users += bucket.new_users;
        running.requests += bucket.requests;
        running.approved += bucket.approved;
        running.rejected += bucket.rejected;

        series.labels.push(label.to_string());
        series.user_history.push(running.new_users);
        series.request_history.push(running.requests);
        series.approved_history.push(running.approved);
        series.rejected_history.push(running.rejected);
        series.active_history.push(bucket.active_users);
        series.daily_user_history.push(bucket.new_users);
        series.daily_request_history.push(bucket.requests);
    }

    series
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MatchCounters {
    pub approved: u64,
    pub matched_people: u64,
    pub multi_matched: u64,
    pub max_matches: u64,
    pub max_sent: u64,
    pub max_received: u64,
}

pub fn count_matches(requests: &[UnlockRequest]) -> MatchCounters {
    let mut matches: HashMap<&str, u64> = HashMap::new();
    let mut sent: HashMap<&str, u64> = HashMap::new();
    let mut received: HashMap<&str, u64> = HashMap::new();
    let mut approved = 0;

    for request in requests {
        let requester = request.requester_id.as_deref();
        let target = request.target_id.as_deref();

        if request.status == RequestStatus::Approved {
            approved += 1;
            for id in [requester, target].into_iter().flatten() {
                *matches.entry(id).or_default() += 1;
            }
        }
        if let Some(id) = requester {
            *sent.entry(id).or_default() += 1;
        }
        if let Some(id) = target {
            *received.entry(id).or_default() += 1;
        }
    }

    let max = |counts: &HashMap<&str, u64>| counts.values().copied().max().unwrap_or(0);
    MatchCounters {
        approved,
        matched_people: matches.values().filter(|&&count| count >= 1).count() as u64,
        multi_matched: matches.values().filter(|&&count| count >= 2).count() as u64,
        max_matches: max(&matches),
        max_sent: max(&sent),
        max_received: max(&received),
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GrowthTrend {
    pub series: Series,
    pub total_users: u64,
    pub total_requests: u64,
    pub counters: MatchCounters,
}

impl GrowthTrend {
    pub fn from_records(
        users: &[UserRecord],
        requests: &[UnlockRequest],
        offset: UtcOffset,
    ) -> Self {
        let buckets = bucket_by_day(users, requests, offset);
        Self {
            series: derive_series(&buckets),
            total_users: users.len() as u64,
            total_requests: requests.len() as u64,
            counters: count_matches(requests),
        }
    }

    /// The summary document body, stamped with `last_updated`.
    pub fn to_fields(&self, last_updated: OffsetDateTime) -> Fields {
        let ints = |values: &[u64]| Value::array(values.iter().copied().map(Value::integer));
        let series = &self.series;
        let counters = &self.counters;

        let entries = [
            (
                "labels",
                Value::array(series.labels.iter().cloned().map(Value::string)),
            ),
            ("userHistory", ints(&series.user_history)),
            ("requestHistory", ints(&series.request_history)),
            ("approvedHistory", ints(&series.approved_history)),
            ("rejectedHistory", ints(&series.rejected_history)),
            ("activeHistory", ints(&series.active_history)),
            ("dailyUserHistory", ints(&series.daily_user_history)),
            ("dailyRequestHistory", ints(&series.daily_request_history)),
            ("totalUsers", Value::integer(self.total_users)),
            ("totalRequests", Value::integer(self.total_requests)),
            ("approvedCount", Value::integer(counters.approved)),
            ("matchedPeopleCount", Value::integer(counters.matched_people)),
            ("multiMatchedCount", Value::integer(counters.multi_matched)),
            ("maxMatches", Value::integer(counters.max_matches)),
            ("maxSentRequests", Value::integer(counters.max_sent)),
            ("maxReceivedRequests", Value::integer(counters.max_received)),
            (
                "lastUpdated",
                Value::TimestampValue(last_updated.to_offset(UtcOffset::UTC)),
            ),
        ];

        entries
            .into_iter()
            .map(|(name, value)| (name.to_string(), value))
            .collect()
    }
}
