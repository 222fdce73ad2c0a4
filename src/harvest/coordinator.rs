//! Fan-out coordinator - concurrent unit processing with fan-in
//!
//! Every unit of work gets its own task. Tasks share nothing mutable: each
//! one sends its single result into a channel whose capacity equals the unit
//! count, so a send never waits on the reader. The coordinator then:
//!
//! 1. Waits until every task has finished (the barrier)
//! 2. Drops its own sender, closing the channel
//! 3. Drains the channel into the report
//!
//! The channel is only closed after the barrier, so no task can ever send
//! into a closed channel, cancelled or not.
//!
//! In-flight work is capped by a semaphore sized from configuration. Results
//! arrive in completion order; consumers that need a stable order re-sort.

use crate::config::HarvesterConfig;
use crate::url::FetchUnit;
use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use tokio::sync::{mpsc, Semaphore};
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

/// Classification of a unit-level failure
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum FailureKind {
    /// Resource does not exist upstream
    NotFound,

    /// Document structure did not match expectations
    Parse,

    /// Request timed out
    Timeout,

    /// Non-success status or network-level failure
    Unreachable,

    /// Mandatory identity fields are missing
    Fatal,

    /// The persistence collaborator failed
    Storage,

    /// The unit was cancelled before completing
    Cancelled,

    /// The task processing the unit panicked
    Panicked,
}

impl FailureKind {
    /// Returns true if a caller-side retry policy may retry this failure
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Timeout | Self::Unreachable)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NotFound => "not_found",
            Self::Parse => "parse",
            Self::Timeout => "timeout",
            Self::Unreachable => "unreachable",
            Self::Fatal => "fatal",
            Self::Storage => "storage",
            Self::Cancelled => "cancelled",
            Self::Panicked => "panicked",
        }
    }
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A failed unit, tagged with the unit it came from
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnitFailure {
    /// Label of the originating unit
    pub unit: String,
    pub kind: FailureKind,
    pub message: String,
}

impl UnitFailure {
    pub fn new(unit: impl Into<String>, kind: FailureKind, message: impl Into<String>) -> Self {
        Self {
            unit: unit.into(),
            kind,
            message: message.into(),
        }
    }
}

impl fmt::Display for UnitFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}: {}", self.kind, self.unit, self.message)
    }
}

/// A unit of work that can name itself in a failure report
pub trait UnitLabel {
    fn unit_label(&self) -> String;
}

impl UnitLabel for FetchUnit {
    fn unit_label(&self) -> String {
        self.label().to_string()
    }
}

impl UnitLabel for String {
    fn unit_label(&self) -> String {
        self.clone()
    }
}

/// Concurrency limits for a fan-out
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FanOutLimits {
    /// Maximum number of units processed at the same time (at least 1)
    pub max_concurrent: usize,
}

impl FanOutLimits {
    pub fn new(max_concurrent: usize) -> Self {
        Self {
            max_concurrent: max_concurrent.max(1),
        }
    }
}

impl From<&HarvesterConfig> for FanOutLimits {
    fn from(config: &HarvesterConfig) -> Self {
        Self::new(config.max_concurrent_fetches as usize)
    }
}

/// Outcome of a fan-out over `expected` units
#[derive(Debug)]
pub struct FanOutReport<T> {
    /// Number of units submitted
    pub expected: usize,

    /// Successful results, in completion order
    pub collected: Vec<T>,

    /// Units that failed, including panicked tasks
    pub dropped: Vec<UnitFailure>,

    /// Units abandoned because of cancellation
    pub cancelled: usize,
}

impl<T> FanOutReport<T> {
    pub fn dropped_count(&self) -> usize {
        self.dropped.len()
    }

    /// Every submitted unit is accounted for exactly once
    pub fn is_accounted(&self) -> bool {
        self.collected.len() + self.dropped.len() + self.cancelled == self.expected
    }
}

/// How a task ended
enum TaskExit {
    Sent,
    Cancelled,
}

/// Runs `work` over every unit concurrently and collects the results
///
/// # Arguments
///
/// * `units` - The units of work; one task is spawned per unit
/// * `limits` - Cap on units processed at the same time
/// * `cancel` - Cancelling stops waiting tasks and aborts in-flight work
/// * `work` - Processes one unit; receives a clone of the cancellation token
///
/// # Returns
///
/// A report accounting for every unit as collected, dropped, or cancelled.
/// A failure of one unit never affects the others.
pub async fn fan_out<U, T, F, Fut>(
    units: Vec<U>,
    limits: FanOutLimits,
    cancel: &CancellationToken,
    work: F,
) -> FanOutReport<T>
where
    U: UnitLabel + Send + 'static,
    T: Send + 'static,
    F: Fn(U, CancellationToken) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<T, UnitFailure>> + Send + 'static,
{
    let expected = units.len();
    tracing::debug!(
        "Fanning out {} units ({} in flight at most)",
        expected,
        limits.max_concurrent
    );

    let (tx, mut rx) = mpsc::channel::<Result<T, UnitFailure>>(expected.max(1));
    let semaphore = Arc::new(Semaphore::new(limits.max_concurrent));
    let work = Arc::new(work);
    let mut tasks = JoinSet::new();
    let mut labels = HashMap::with_capacity(expected);

    for unit in units {
        let label = unit.unit_label();
        let tx = tx.clone();
        let semaphore = Arc::clone(&semaphore);
        let work = Arc::clone(&work);
        let cancel = cancel.clone();

        let handle = tasks.spawn(async move {
            let _permit = tokio::select! {
                biased;
                _ = cancel.cancelled() => return TaskExit::Cancelled,
                permit = semaphore.acquire_owned() => match permit {
                    Ok(permit) => permit,
                    Err(_) => return TaskExit::Cancelled,
                },
            };

            let result = work(unit, cancel.clone()).await;

            if let Err(failure) = &result {
                if failure.kind == FailureKind::Cancelled {
                    return TaskExit::Cancelled;
                }
            }

            // The receiver outlives the barrier, so this only fails if the
            // coordinator itself was dropped mid-flight.
            match tx.send(result).await {
                Ok(()) => TaskExit::Sent,
                Err(_) => TaskExit::Cancelled,
            }
        });
        labels.insert(handle.id(), label);
    }

    // Barrier: every spawned task must finish before the channel closes
    let mut cancelled = 0;
    let mut panicked = Vec::new();
    while let Some(joined) = tasks.join_next().await {
        match joined {
            Ok(TaskExit::Sent) => {}
            Ok(TaskExit::Cancelled) => cancelled += 1,
            Err(e) => {
                let unit = labels
                    .remove(&e.id())
                    .unwrap_or_else(|| format!("task {}", e.id()));
                tracing::error!("Unit task {} failed to complete: {}", unit, e);
                panicked.push(UnitFailure::new(unit, FailureKind::Panicked, e.to_string()));
            }
        }
    }

    drop(tx);

    let mut collected = Vec::with_capacity(expected);
    let mut dropped = Vec::new();
    while let Some(result) = rx.recv().await {
        match result {
            Ok(value) => collected.push(value),
            Err(failure) => {
                tracing::warn!("Dropped unit {}", failure);
                dropped.push(failure);
            }
        }
    }
    dropped.extend(panicked);

    tracing::debug!(
        "Fan-out finished: {} collected, {} dropped, {} cancelled of {}",
        collected.len(),
        dropped.len(),
        cancelled,
        expected
    );

    FanOutReport {
        expected,
        collected,
        dropped,
        cancelled,
    }
}
