// src/services/recommender.rs

use crate::{
    config::{
        MATCH_THRESHOLD_PERCENTAGE, MAX_RECOMMENDATIONS, MAX_STRENGTHS, MAX_WEAKNESSES,
        PROGRAM_CANDIDATE_LIMIT, STRENGTH_THRESHOLD_PERCENTAGE, TOP_CATEGORY_COUNT,
        WEAKNESS_THRESHOLD_PERCENTAGE,
    },
    models::{
        program::Program,
        result::{CategoryScore, Recommendation},
    },
    repository::ProgramCatalog,
};

/// What a recommendation run produced.
///
/// `NoMatches` and `CatalogUnavailable` both end up as an empty list on the
/// stored result; keeping them apart lets callers log or report the outage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecommendationOutcome {
    Matched(Vec<Recommendation>),
    NoMatches,
    CatalogUnavailable(String),
}

impl RecommendationOutcome {
    pub fn into_recommendations(self) -> Vec<Recommendation> {
        match self {
            RecommendationOutcome::Matched(recommendations) => recommendations,
            RecommendationOutcome::NoMatches | RecommendationOutcome::CatalogUnavailable(_) => {
                Vec::new()
            }
        }
    }
}

/// Names of the strongest categories, best first (stable on ties).
pub fn top_categories(category_scores: &[CategoryScore]) -> Vec<String> {
    let mut sorted: Vec<&CategoryScore> = category_scores.iter().collect();
    sorted.sort_by(|a, b| b.percentage.cmp(&a.percentage));
    sorted
        .into_iter()
        .take(TOP_CATEGORY_COUNT)
        .map(|c| c.category.clone())
        .collect()
}

/// Looks up programs for the student's strongest categories and ranks them.
///
/// Never fails: a catalog error is reported as `CatalogUnavailable` so that a
/// test submission can still be saved.
pub async fn recommend(
    category_scores: &[CategoryScore],
    catalog: &dyn ProgramCatalog,
) -> RecommendationOutcome {
    let top = top_categories(category_scores);
    if top.is_empty() {
        return RecommendationOutcome::NoMatches;
    }

    let programs = match catalog
        .find_active_programs(&top, PROGRAM_CANDIDATE_LIMIT)
        .await
    {
        Ok(programs) => programs,
        Err(e) => {
            tracing::error!("Error generating recommendations: {}", e);
            return RecommendationOutcome::CatalogUnavailable(e.to_string());
        }
    };

    let recommendations = rank_programs(category_scores, &top, &programs);
    if recommendations.is_empty() {
        RecommendationOutcome::NoMatches
    } else {
        RecommendationOutcome::Matched(recommendations)
    }
}

/// Scores candidate programs against the top categories and keeps the best three.
///
/// Only top categories at or above the match threshold count toward a match
/// score; a program with none of them is dropped rather than scored 0.
/// Equal match scores keep catalog order.
pub fn rank_programs(
    category_scores: &[CategoryScore],
    top: &[String],
    programs: &[Program],
) -> Vec<Recommendation> {
    let strengths = strengths(category_scores);
    let weaknesses = weaknesses(category_scores);

    let mut recommendations: Vec<Recommendation> = programs
        .iter()
        .filter_map(|program| {
            let match_score = match_score(category_scores, top)?;
            Some(Recommendation {
                program_id: program.id,
                program_name: program.name.clone(),
                match_score,
                reason: format!(
                    "Your strong {} skills align well with {}",
                    top.join(", "),
                    program.name
                ),
                strengths: strengths.clone(),
                weaknesses: weaknesses.clone(),
            })
        })
        .collect();

    recommendations.sort_by(|a, b| b.match_score.cmp(&a.match_score));
    recommendations.truncate(MAX_RECOMMENDATIONS);
    recommendations
}

/// Mean percentage of the top categories that clear the match threshold.
/// `None` when none of them do.
fn match_score(category_scores: &[CategoryScore], top: &[String]) -> Option<i32> {
    let matched: Vec<i32> = top
        .iter()
        .filter_map(|name| {
            category_scores
                .iter()
                .find(|c| c.category.to_lowercase() == name.to_lowercase())
        })
        .map(|c| c.percentage)
        .filter(|&p| p >= MATCH_THRESHOLD_PERCENTAGE)
        .collect();

    if matched.is_empty() {
        return None;
    }

    let sum: i32 = matched.iter().sum();
    let score = (sum as f64 / matched.len() as f64).round() as i32;
    Some(score.clamp(0, 100))
}

fn strengths(category_scores: &[CategoryScore]) -> Vec<String> {
    category_scores
        .iter()
        .filter(|c| c.percentage >= STRENGTH_THRESHOLD_PERCENTAGE)
        .take(MAX_STRENGTHS)
        .map(|c| format!("Excellent {} skills ({}%)", c.category, c.percentage))
        .collect()
}

fn weaknesses(category_scores: &[CategoryScore]) -> Vec<String> {
    category_scores
        .iter()
        .filter(|c| c.percentage < WEAKNESS_THRESHOLD_PERCENTAGE)
        .take(MAX_WEAKNESSES)
        .map(|c| format!("Need improvement in {} ({}%)", c.category, c.percentage))
        .collect()
}
