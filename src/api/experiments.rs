//! A/B experiment variant assignment.
//!
//! Assignment persistence lives in the browser: the client sends the variant
//! it already holds as `?current=`, and a still-valid variant is echoed back so
//! a visitor never flips between arms. Otherwise a variant is drawn at random
//! in proportion to its configured weight.

use std::collections::HashMap;

use axum::{
    extract::{
        rejection::{PathRejection, QueryRejection},
        Path, Query, State,
    },
    response::{IntoResponse, Response},
};
use rand::distributions::{Distribution, WeightedIndex};
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::config::schema::ExperimentConfig;
use crate::http::response::{ApiError, Envelope};
use crate::http::server::AppState;

struct Experiment {
    variants: Vec<String>,
    weights: WeightedIndex<u32>,
}

/// Experiments loaded at startup.
#[derive(Default)]
pub struct ExperimentRegistry {
    experiments: HashMap<String, Experiment>,
}

impl ExperimentRegistry {
    pub fn from_config(configs: &[ExperimentConfig]) -> Self {
        let mut experiments = HashMap::new();
        for config in configs {
            let weights = config.variants.iter().map(|v| v.weight);
            match WeightedIndex::new(weights) {
                Ok(weights) => {
                    let variants = config.variants.iter().map(|v| v.name.clone()).collect();
                    experiments.insert(config.id.clone(), Experiment { variants, weights });
                }
                Err(e) => {
                    tracing::warn!(experiment = %config.id, error = %e, "Skipping experiment with unusable weights");
                }
            }
        }
        Self { experiments }
    }

    pub fn len(&self) -> usize {
        self.experiments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.experiments.is_empty()
    }

    /// Variant for `id`, keeping `current` when it is still offered.
    /// `None` when the experiment does not exist.
    pub fn assign<R: Rng + ?Sized>(&self, id: &str, current: Option<&str>, rng: &mut R) -> Option<&str> {
        let experiment = self.experiments.get(id)?;

        if let Some(current) = current {
            if let Some(kept) = experiment.variants.iter().find(|v| v.as_str() == current) {
                return Some(kept);
            }
        }

        let index = experiment.weights.sample(rng);
        experiment.variants.get(index).map(String::as_str)
    }
}

#[derive(Debug, Deserialize)]
pub struct VariantQuery {
    current: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct Assignment {
    experiment: String,
    variant: String,
}

/// `GET /api/experiments/{id}/variant`
pub async fn variant(
    State(state): State<AppState>,
    id: Result<Path<String>, PathRejection>,
    query: Result<Query<VariantQuery>, QueryRejection>,
) -> Result<Response, ApiError> {
    let (Path(id), Query(query)) = (id?, query?);
    let variant = state
        .experiments
        .assign(&id, query.current.as_deref(), &mut rand::thread_rng())
        .map(str::to_string)
        .ok_or_else(|| ApiError::NotFound("Experiment not found".into()))?;

    Ok(Envelope::ok(Assignment { experiment: id, variant }).into_response())
}
