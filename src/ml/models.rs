use nalgebra::DVector;
use serde::Deserialize;
use statrs::statistics::Statistics;
use tracing::debug;

use super::features::{FeatureSchema, Granularity};
use crate::error::ModelError;

/// On-disk layout of a station model, as exported by the training notebooks.
#[derive(Debug, Deserialize)]
pub struct ModelArtifact {
    pub features: Vec<String>,
    pub model: RegressorArtifact,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RegressorArtifact {
    Linear {
        coefficients: Vec<f64>,
        intercept: f64,
    },
    RandomForest {
        trees: Vec<DecisionTree>,
    },
}

#[derive(Debug, Clone, Deserialize)]
pub struct DecisionTree {
    pub nodes: Vec<TreeNode>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum TreeNode {
    Split {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
    },
    Leaf {
        value: f64,
    },
}

impl DecisionTree {
    fn validate(&self, n_features: usize) -> Result<(), String> {
        if self.nodes.is_empty() {
            return Err("tree has no nodes".to_string());
        }

        // Children always sit after their parent, so traversal terminates.
        for (index, node) in self.nodes.iter().enumerate() {
            if let TreeNode::Split {
                feature,
                left,
                right,
                ..
            } = node
            {
                if *feature >= n_features {
                    return Err(format!(
                        "node {} splits on feature {} of {}",
                        index, feature, n_features
                    ));
                }
                for child in [*left, *right] {
                    if child <= index || child >= self.nodes.len() {
                        return Err(format!("node {} has invalid child {}", index, child));
                    }
                }
            }
        }
        Ok(())
    }

    fn predict(&self, x: &[f64]) -> f64 {
        let mut index = 0;
        loop {
            match &self.nodes[index] {
                TreeNode::Leaf { value } => return *value,
                TreeNode::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    index = if x[*feature] <= *threshold { *left } else { *right };
                }
            }
        }
    }
}

#[derive(Debug, Clone)]
pub enum Regressor {
    Linear {
        coefficients: DVector<f64>,
        intercept: f64,
    },
    RandomForest {
        trees: Vec<DecisionTree>,
    },
}

/// A validated, ready-to-use model for one station and granularity.
#[derive(Debug, Clone)]
pub struct StationModel {
    pub station_id: i32,
    pub granularity: Granularity,
    pub n_features: usize,
    pub regressor: Regressor,
}

impl StationModel {
    /// Parses an artifact and checks it against the configured schema.
    pub fn from_json(
        station_id: i32,
        schema: &FeatureSchema,
        path: &str,
        bytes: &[u8],
    ) -> Result<Self, ModelError> {
        let load_error = |reason: String| ModelError::ModelLoadError {
            path: path.to_string(),
            reason,
        };

        let artifact: ModelArtifact =
            serde_json::from_slice(bytes).map_err(|e| load_error(e.to_string()))?;

        let configured = schema.names();
        if artifact.features != configured {
            return Err(ModelError::SchemaMismatch {
                artifact: artifact.features,
                configured,
            });
        }

        let n_features = schema.len();
        let regressor = match artifact.model {
            RegressorArtifact::Linear {
                coefficients,
                intercept,
            } => {
                if coefficients.len() != n_features {
                    return Err(load_error(format!(
                        "{} coefficients for {} features",
                        coefficients.len(),
                        n_features
                    )));
                }
                Regressor::Linear {
                    coefficients: DVector::from_vec(coefficients),
                    intercept,
                }
            }
            RegressorArtifact::RandomForest { trees } => {
                if trees.is_empty() {
                    return Err(load_error("forest has no trees".to_string()));
                }
                for (i, tree) in trees.iter().enumerate() {
                    tree.validate(n_features)
                        .map_err(|reason| load_error(format!("tree {}: {}", i, reason)))?;
                }
                Regressor::RandomForest { trees }
            }
        };

        Ok(Self {
            station_id,
            granularity: schema.granularity,
            n_features,
            regressor,
        })
    }

    pub fn predict(&self, x: &[f64]) -> Result<f64, ModelError> {
        if x.len() != self.n_features {
            return Err(ModelError::ShapeMismatch {
                expected: self.n_features,
                actual: x.len(),
            });
        }

        debug!(
            "Running {} inference for station {}",
            self.granularity, self.station_id
        );

        let prediction = match &self.regressor {
            Regressor::Linear {
                coefficients,
                intercept,
            } => coefficients.dot(&DVector::from_row_slice(x)) + intercept,
            Regressor::RandomForest { trees } => {
                trees.iter().map(|tree| tree.predict(x)).mean()
            }
        };

        if !prediction.is_finite() {
            return Err(ModelError::NonFiniteOutput {
                station_id: self.station_id,
            });
        }
        Ok(prediction)
    }
}
