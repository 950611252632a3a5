pub mod engine;
pub mod features;
pub mod models;
pub mod registry;
pub mod response;

pub use engine::PredictionEngine;
pub use features::FeatureSchemas;
pub use registry::ModelRegistry;
pub use response::PredictionResult;
