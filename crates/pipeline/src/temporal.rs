//! Temporal raster series and date resolution
//!
//! A layer such as population density is published as snapshots at
//! irregular dates. [`TemporalSeries::resolve`] turns the series into one
//! raster for the task date: the nearest edge snapshot outside the covered
//! range, the exact snapshot on a snapshot date, and a cell-wise linear
//! interpolation between the two bracketing snapshots otherwise.

use chrono::NaiveDate;
use tracing::debug;
use waterdriver_algorithms::algebra::lerp;
use waterdriver_core::raster::Raster;

use crate::error::{PipelineError, Result};

/// What to do with a query date outside the series' date range
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EdgePolicy {
    /// Use the nearest edge snapshot unchanged
    #[default]
    Clamp,
    /// Fail with [`PipelineError::DataUnavailable`]
    Strict,
}

/// Which rule resolves a query date
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Resolution {
    /// Query precedes the first snapshot (index 0)
    BeforeFirst,
    /// Query follows the last snapshot
    AfterLast,
    /// A snapshot is dated exactly on the query date
    Exact(usize),
    /// Query lies strictly between snapshots `prev` and `next`
    Interpolated { prev: usize, next: usize, fraction: f64 },
}

/// Dated rasters sorted by date, at most one per date
#[derive(Debug, Clone)]
pub struct TemporalSeries {
    layer: String,
    entries: Vec<(NaiveDate, Raster<f64>)>,
    policy: EdgePolicy,
}

impl TemporalSeries {
    /// Build a series from unordered entries.
    ///
    /// Fails on an empty list or on two entries with the same date.
    pub fn new(layer: impl Into<String>, mut entries: Vec<(NaiveDate, Raster<f64>)>) -> Result<Self> {
        let layer = layer.into();
        if entries.is_empty() {
            return Err(PipelineError::NoTemporalData { layer });
        }
        entries.sort_by_key(|(date, _)| *date);
        if let Some(pair) = entries.windows(2).find(|w| w[0].0 == w[1].0) {
            return Err(PipelineError::DuplicateTimestamp {
                layer,
                date: pair[0].0,
            });
        }
        Ok(Self {
            layer,
            entries,
            policy: EdgePolicy::default(),
        })
    }

    pub fn with_policy(mut self, policy: EdgePolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn layer(&self) -> &str {
        &self.layer
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn dates(&self) -> impl Iterator<Item = NaiveDate> + '_ {
        self.entries.iter().map(|(date, _)| *date)
    }

    pub fn min_date(&self) -> NaiveDate {
        self.entries[0].0
    }

    pub fn max_date(&self) -> NaiveDate {
        self.entries[self.entries.len() - 1].0
    }

    /// Index of the first entry dated on or after `date`
    pub fn first_on_or_after(&self, date: NaiveDate) -> Option<usize> {
        let idx = self.entries.partition_point(|(d, _)| *d < date);
        (idx < self.entries.len()).then_some(idx)
    }

    /// Index of the last entry dated on or before `date`
    pub fn last_on_or_before(&self, date: NaiveDate) -> Option<usize> {
        self.entries.partition_point(|(d, _)| *d <= date).checked_sub(1)
    }

    pub fn get(&self, index: usize) -> Option<(NaiveDate, &Raster<f64>)> {
        self.entries.get(index).map(|(d, r)| (*d, r))
    }

    /// Decide how `date` is resolved, without touching any raster.
    pub fn resolve_branch(&self, date: NaiveDate) -> Resolution {
        if date < self.min_date() {
            return Resolution::BeforeFirst;
        }
        if date > self.max_date() {
            return Resolution::AfterLast;
        }
        // Both exist: date lies inside [min_date, max_date]
        let prev = self.last_on_or_before(date).unwrap_or(0);
        let next = self.first_on_or_after(date).unwrap_or(prev);
        if prev == next {
            return Resolution::Exact(prev);
        }
        let span = (self.entries[next].0 - self.entries[prev].0).num_days() as f64;
        let elapsed = (date - self.entries[prev].0).num_days() as f64;
        Resolution::Interpolated {
            prev,
            next,
            fraction: elapsed / span,
        }
    }

    /// The raster for `date`.
    pub fn resolve(&self, date: NaiveDate) -> Result<Raster<f64>> {
        let branch = self.resolve_branch(date);
        debug!(layer = %self.layer, %date, ?branch, "resolved temporal layer");

        match branch {
            Resolution::BeforeFirst | Resolution::AfterLast
                if self.policy == EdgePolicy::Strict =>
            {
                Err(PipelineError::DataUnavailable {
                    layer: self.layer.clone(),
                    date,
                })
            }
            Resolution::BeforeFirst => Ok(self.entries[0].1.clone()),
            Resolution::AfterLast => Ok(self.entries[self.entries.len() - 1].1.clone()),
            Resolution::Exact(idx) => Ok(self.entries[idx].1.clone()),
            Resolution::Interpolated {
                prev,
                next,
                fraction,
            } => Ok(lerp(&self.entries[prev].1, &self.entries[next].1, fraction)?),
        }
    }
}
