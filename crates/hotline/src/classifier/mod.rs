//! Request classification
//!
//! A keyword scoring pass over the category catalog. The backend classifier is
//! preferred when reachable; [`Classifier`] is the local fallback.

pub mod catalog;
pub mod service;
pub mod store;

use serde::{Deserialize, Serialize};
use ts_rs::TS;

pub use catalog::{Catalog, CategoryRecord, Urgency};
pub use service::ClassificationService;
pub use store::CatalogStore;

use catalog::id_from_any;

const KEYWORD_WEIGHT: u32 = 3;
const SUBTYPE_WEIGHT: u32 = 2;
const BASE_CONFIDENCE: f64 = 0.6;
const CONFIDENCE_PER_POINT: f64 = 0.1;
const MAX_CONFIDENCE: f64 = 0.95;
/// Confidence of the unclassified outcome
pub const UNCLASSIFIED_CONFIDENCE: f64 = 0.3;

/// Result of classifying one utterance
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
pub struct Outcome {
    #[serde(deserialize_with = "id_from_any")]
    pub id: String,
    pub problem: String,
    #[serde(rename = "type")]
    pub category_type: String,
    pub subtype: String,
    #[serde(default)]
    pub location: Option<String>,
    pub response: String,
    pub executor: String,
    pub urgency: Urgency,
    pub response_time: u32,
    pub confidence: f64,
    #[serde(default)]
    pub needs_operator: bool,
}

impl Outcome {
    fn matched(record: &CategoryRecord, score: u32) -> Self {
        Self {
            id: record.id.clone(),
            problem: record.problem.clone(),
            category_type: record.category_type.clone(),
            subtype: record.subtype.clone(),
            location: record.location.clone(),
            response: record.response.clone(),
            executor: record.executor_label().to_string(),
            urgency: record.urgency,
            response_time: record.response_time,
            confidence: confidence_for(score),
            needs_operator: false,
        }
    }

    /// Outcome for requests that match no category; routed to a human operator
    pub fn unclassified() -> Self {
        Self {
            id: "0".to_string(),
            problem: "Загальне питання".to_string(),
            category_type: "Консультація".to_string(),
            subtype: "потребує оператора".to_string(),
            location: None,
            response: "Вибачте, я не зміг точно визначити тип вашого звернення. Зачекайте, будь ласка, я переключу вас на оператора для детальної консультації.".to_string(),
            executor: "Оператор контактного центру".to_string(),
            urgency: Urgency::Standard,
            response_time: 0,
            confidence: UNCLASSIFIED_CONFIDENCE,
            needs_operator: true,
        }
    }
}

/// Saturating confidence for a positive match score
pub fn confidence_for(score: u32) -> f64 {
    (BASE_CONFIDENCE + CONFIDENCE_PER_POINT * score as f64).min(MAX_CONFIDENCE)
}

/// Score of one category against an already lower-cased query
pub fn score(query_lower: &str, record: &CategoryRecord) -> u32 {
    let keyword_hits = record
        .keywords
        .iter()
        .filter(|kw| query_lower.contains(kw.to_lowercase().as_str()))
        .count() as u32;

    let subtype_hit = record
        .subtype
        .to_lowercase()
        .split_whitespace()
        .any(|word| query_lower.contains(word));

    keyword_hits * KEYWORD_WEIGHT + if subtype_hit { SUBTYPE_WEIGHT } else { 0 }
}

/// Local keyword classifier over a catalog snapshot
#[derive(Debug, Clone, Copy)]
pub struct Classifier<'a> {
    catalog: &'a Catalog,
}

impl<'a> Classifier<'a> {
    pub fn new(catalog: &'a Catalog) -> Self {
        Self { catalog }
    }

    /// Classify a free-text request.
    ///
    /// The highest scoring category wins; on equal scores the one earlier in
    /// catalog order is kept.
    pub fn classify(&self, text: &str) -> Outcome {
        let query_lower = text.to_lowercase();

        let mut best: Option<(&CategoryRecord, u32)> = None;
        for record in self.catalog.records() {
            let s = score(&query_lower, record);
            let current = best.map(|(_, b)| b).unwrap_or(0);
            if s > current {
                best = Some((record, s));
            }
        }

        match best {
            Some((record, s)) => Outcome::matched(record, s),
            None => Outcome::unclassified(),
        }
    }
}
