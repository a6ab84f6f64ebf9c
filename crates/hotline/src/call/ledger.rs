//! Call statistics and recent call history

use std::collections::VecDeque;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;
use uuid::Uuid;

use crate::classifier::Outcome;

/// Calls kept in the recent history
pub const HISTORY_LIMIT: usize = 10;

/// Nominal agent response time per call, in seconds
const NOMINAL_RESPONSE_SECS: f64 = 3.5;

const UNDETERMINED_CATEGORY: &str = "Не визначено";
const OPERATOR: &str = "Оператор";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "lowercase")]
pub enum CallStatus {
    Resolved,
    Escalated,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
pub struct CallRecord {
    pub id: Uuid,
    pub timestamp: DateTime<Utc>,
    pub query: String,
    pub category: String,
    pub status: CallStatus,
    pub executor: String,
}

impl CallRecord {
    pub fn new(query: impl Into<String>, outcome: Option<&Outcome>, status: CallStatus) -> Self {
        let category = outcome
            .map(|o| o.subtype.clone())
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| UNDETERMINED_CATEGORY.to_string());
        let executor = outcome
            .map(|o| o.executor.clone())
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| OPERATOR.to_string());

        Self {
            id: Uuid::new_v4(),
            timestamp: Utc::now(),
            query: query.into(),
            category,
            status,
            executor,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
pub struct CallStats {
    pub total_calls: u32,
    pub ai_resolved: u32,
    pub escalated: u32,
    /// Seconds, rounded to one decimal
    pub avg_response_time: f64,
}

impl CallStats {
    pub fn record(&mut self, status: CallStatus) {
        let total = self.total_calls as f64;
        let avg = (self.avg_response_time * total + NOMINAL_RESPONSE_SECS) / (total + 1.0);
        self.avg_response_time = (avg * 10.0).round() / 10.0;

        self.total_calls += 1;
        match status {
            CallStatus::Resolved => self.ai_resolved += 1,
            CallStatus::Escalated => self.escalated += 1,
        }
    }

    /// Share of calls resolved without an operator, as a whole percentage
    pub fn ai_resolved_percent(&self) -> u32 {
        if self.total_calls == 0 {
            return 0;
        }
        (self.ai_resolved as f64 / self.total_calls as f64 * 100.0).round() as u32
    }
}

/// Aggregate stats plus the most recent calls, newest first
#[derive(Debug, Clone, Default)]
pub struct CallLedger {
    stats: CallStats,
    history: VecDeque<CallRecord>,
}

impl CallLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, record: CallRecord) {
        self.stats.record(record.status);
        self.history.push_front(record);
        self.history.truncate(HISTORY_LIMIT);
    }

    pub fn stats(&self) -> &CallStats {
        &self.stats
    }

    pub fn history(&self) -> impl Iterator<Item = &CallRecord> {
        self.history.iter()
    }
}
