//! Recommendation ranker.
//!
//! Merges user favorites, other user-defined
//! crop rules, and classifier output under a strict priority order,
//! deduplicates by case-insensitive name, pads short lists through the
//! AI suggestion oracle, and re-sorts the trimmed list by confidence
//! for display.

pub mod score;

use std::collections::HashSet;

use thiserror::Error;
use tracing::debug;

use shared_types::{Candidate, CandidateSource, CropRule, Prediction, SensorReading};

use crate::classifier::{Classifier, ClassifierError, LabelProbability};
use crate::oracle::{CropAi, OracleError};
use crate::retry;
use score::{round2, rule_confidence};

/// Length every recommendation list is padded toward.
pub const TARGET_LIST_LEN: usize = 25;
/// How many already-seen names go into the oracle prompt.
pub const KNOWN_NAMES_PROMPT_CAP: usize = 15;
/// Total AI padding attempts per request.
pub const MAX_AI_ATTEMPTS: usize = 2;

#[derive(Debug, Error)]
pub enum RankError {
    #[error("Sensor readings are all zero. Connect sensors or switch mode.")]
    ZeroReading,
    #[error("classifier failed: {0}")]
    Classifier(#[from] ClassifierError),
}

/// Rank a reading against the rule store and the classifier, padding to
/// [`TARGET_LIST_LEN`] through the AI oracle. Classifier failure is fatal
/// to the request; oracle failure only shortens the list.
pub async fn rank(
    reading: &SensorReading,
    rules: &[CropRule],
    classifier: &dyn Classifier,
    ai: &dyn CropAi,
) -> Result<Prediction, RankError> {
    if reading.is_zero_npk() {
        return Err(RankError::ZeroReading);
    }

    let labels = classifier.classify(reading)?;
    let (favorites, user) = assemble_rule_candidates(reading, rules);
    let ml = assemble_ml_candidates(labels);

    let merged = merge_prioritized(favorites, user, ml);
    let filled = pad_with_ai(merged, reading, ai).await;

    let mut selected: Vec<Candidate> = filled.into_iter().take(TARGET_LIST_LEN).collect();
    // Display order is strictly by confidence, even where that reorders
    // across source-priority boundaries.
    sort_by_confidence(&mut selected);

    let (predicted_crop, confidence) = selected
        .first()
        .map(|c| (c.crop.clone(), c.confidence))
        .unwrap_or_else(|| ("Unknown".to_string(), 0.0));

    Ok(Prediction {
        predicted_crop,
        confidence,
        recommendations: selected,
    })
}

/// Score every rule and split the matches into favorites and the rest.
/// A favorite is always included; anything else needs a non-zero score.
fn assemble_rule_candidates(
    reading: &SensorReading,
    rules: &[CropRule],
) -> (Vec<Candidate>, Vec<Candidate>) {
    let mut favorites = Vec::new();
    let mut user = Vec::new();

    for rule in rules {
        let confidence = rule_confidence(reading, rule);
        if !rule.favorite && confidence <= 0.0 {
            continue;
        }
        let candidate = Candidate {
            crop: rule.name.clone(),
            confidence,
            source: if rule.favorite {
                CandidateSource::Favorite
            } else {
                CandidateSource::YourCrops
            },
        };
        if rule.favorite {
            favorites.push(candidate);
        } else {
            user.push(candidate);
        }
    }
    (favorites, user)
}

/// Every classifier label becomes a candidate so the list fills out even
/// when no rule matches.
fn assemble_ml_candidates(labels: Vec<LabelProbability>) -> Vec<Candidate> {
    labels
        .into_iter()
        .map(|lp| Candidate {
            crop: lp.label,
            confidence: round2(lp.probability * 100.0),
            source: CandidateSource::MlModel,
        })
        .collect()
}

/// Priority merge: favorites then other user rules form the committed
/// prefix unconditionally; ML candidates fill the remaining slots,
/// skipping names already present, stopping at the target length.
fn merge_prioritized(
    mut favorites: Vec<Candidate>,
    mut user: Vec<Candidate>,
    mut ml: Vec<Candidate>,
) -> Vec<Candidate> {
    sort_by_confidence(&mut favorites);
    sort_by_confidence(&mut user);
    sort_by_confidence(&mut ml);

    let mut merged = favorites;
    merged.extend(user);

    let mut seen: HashSet<String> = merged.iter().map(|c| c.crop.to_lowercase()).collect();
    for candidate in ml {
        if merged.len() >= TARGET_LIST_LEN {
            break;
        }
        if seen.insert(candidate.crop.to_lowercase()) {
            merged.push(candidate);
        }
    }
    merged
}

/// Bounded AI padding: up to [`MAX_AI_ATTEMPTS`] oracle calls, each
/// contributing only names not already in the list. Any oracle failure
/// is non-fatal and simply leaves the list shorter.
async fn pad_with_ai(
    merged: Vec<Candidate>,
    reading: &SensorReading,
    ai: &dyn CropAi,
) -> Vec<Candidate> {
    let reading = *reading;
    retry::fill_bounded(
        MAX_AI_ATTEMPTS,
        merged,
        |items: &[Candidate]| items.len() >= TARGET_LIST_LEN,
        move |attempt, current: Vec<Candidate>| async move {
            let shortfall = TARGET_LIST_LEN.saturating_sub(current.len());
            let known: Vec<String> = current.iter().map(|c| c.crop.to_lowercase()).collect();
            let prompt_names = &known[..known.len().min(KNOWN_NAMES_PROMPT_CAP)];
            debug!(
                attempt,
                have = current.len(),
                shortfall,
                "asking AI oracle for more crops"
            );

            let batch = ai.suggest_crops(&reading, prompt_names, shortfall).await?;

            let mut seen: HashSet<String> = known.into_iter().collect();
            let fresh: Vec<Candidate> = batch
                .into_iter()
                .filter(|c| seen.insert(c.crop.to_lowercase()))
                .collect();
            Ok::<_, OracleError>(fresh)
        },
    )
    .await
}

fn sort_by_confidence(candidates: &mut [Candidate]) {
    candidates.sort_by(|a, b| b.confidence.total_cmp(&a.confidence));
}
