use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::BTreeSet;

/// Ratings below this are disapproval, above it approval
const NEUTRAL_RATING: i64 = 3;

/// A stored offering: one professor teaching a subject over some years
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Offering {
    pub professor: String,

    /// Years taught, as stored (e.g. "2019")
    #[serde(default)]
    pub years: Vec<String>,
}

/// Rating counters of one offering
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct OfferingStats {
    pub approval: u32,
    pub disapproval: u32,
    pub neutral: u32,
}

impl OfferingStats {
    /// Counts one comment rating
    pub fn record(&mut self, rating: i64) {
        match rating.cmp(&NEUTRAL_RATING) {
            Ordering::Less => self.disapproval += 1,
            Ordering::Greater => self.approval += 1,
            Ordering::Equal => self.neutral += 1,
        }
    }

    pub fn from_ratings(ratings: impl IntoIterator<Item = i64>) -> Self {
        let mut stats = Self::default();
        for rating in ratings {
            stats.record(rating);
        }
        stats
    }

    pub fn total(&self) -> u32 {
        self.approval + self.disapproval + self.neutral
    }

    pub fn rates(&self) -> Rates {
        Rates::from_counts(self.approval, self.disapproval, self.neutral)
    }
}

/// Approval, neutral, and disapproval shares of the total
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct Rates {
    pub approval: f64,
    pub neutral: f64,
    pub disapproval: f64,
}

impl Rates {
    /// Computes `count / total` for each counter; a zero total gives all zeros
    pub fn from_counts(approval: u32, disapproval: u32, neutral: u32) -> Self {
        let total = approval + disapproval + neutral;
        if total == 0 {
            return Self::default();
        }

        let total = f64::from(total);
        Self {
            approval: f64::from(approval) / total,
            neutral: f64::from(neutral) / total,
            disapproval: f64::from(disapproval) / total,
        }
    }
}

/// An offering as returned to readers, with derived rates
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OfferingView {
    pub professor: String,

    /// Offering document id
    pub code: String,

    pub years: Vec<String>,
    pub approval: f64,
    pub neutral: f64,
    pub disapproval: f64,
}

impl OfferingView {
    pub fn new(id: impl Into<String>, offering: Offering, stats: OfferingStats) -> Self {
        let rates = stats.rates();
        Self {
            professor: offering.professor,
            code: id.into(),
            years: offering.years,
            approval: rates.approval,
            neutral: rates.neutral,
            disapproval: rates.disapproval,
        }
    }

    /// A view without rating information
    pub fn partial(id: impl Into<String>, offering: Offering) -> Self {
        Self::new(id, offering, OfferingStats::default())
    }

    /// Most recent year taught
    pub fn latest_year(&self) -> Option<&str> {
        self.years.iter().map(String::as_str).max()
    }

    pub fn distinct_years(&self) -> usize {
        self.years.iter().collect::<BTreeSet<_>>().len()
    }
}

/// Ranking order of offerings
///
/// 1. `approval + neutral`, descending
/// 2. `disapproval`, ascending
/// 3. latest year taught, descending
/// 4. distinct years taught, descending
pub fn compare_offerings(a: &OfferingView, b: &OfferingView) -> Ordering {
    let favorable = |o: &OfferingView| o.approval + o.neutral;

    favorable(b)
        .partial_cmp(&favorable(a))
        .unwrap_or(Ordering::Equal)
        .then_with(|| {
            a.disapproval
                .partial_cmp(&b.disapproval)
                .unwrap_or(Ordering::Equal)
        })
        .then_with(|| b.latest_year().cmp(&a.latest_year()))
        .then_with(|| b.distinct_years().cmp(&a.distinct_years()))
}

/// Sorts offerings in ranking order; equal offerings keep their order
pub fn rank_offerings(offerings: &mut [OfferingView]) {
    offerings.sort_by(compare_offerings);
}
