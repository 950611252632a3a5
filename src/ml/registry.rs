use dashmap::DashMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, warn};

use super::features::{FeatureSchemas, Granularity};
use super::models::StationModel;
use crate::error::ModelError;

/// Station models keyed by station id and granularity.
///
/// Artifacts are read from `<directory>/<granularity>/station_<id>.json`
/// the first time they are requested and kept for the life of the process.
/// [`ModelRegistry::preload`] reads everything up front instead.
pub struct ModelRegistry {
    directory: PathBuf,
    schemas: FeatureSchemas,
    models: DashMap<(i32, Granularity), Arc<StationModel>>,
}

impl ModelRegistry {
    pub fn new(directory: impl Into<PathBuf>, schemas: FeatureSchemas) -> Self {
        Self {
            directory: directory.into(),
            schemas,
            models: DashMap::new(),
        }
    }

    pub fn schemas(&self) -> &FeatureSchemas {
        &self.schemas
    }

    pub fn path_for(&self, station_id: i32, granularity: Granularity) -> PathBuf {
        self.directory
            .join(granularity.to_string())
            .join(format!("station_{}.json", station_id))
    }

    #[cfg(test)]
    pub fn loaded_count(&self) -> usize {
        self.models.len()
    }

    pub async fn get(
        &self,
        station_id: i32,
        granularity: Granularity,
    ) -> Result<Arc<StationModel>, ModelError> {
        if let Some(model) = self.models.get(&(station_id, granularity)) {
            return Ok(model.clone());
        }

        let model = Arc::new(self.load(station_id, granularity).await?);
        self.models
            .insert((station_id, granularity), model.clone());
        Ok(model)
    }

    async fn load(
        &self,
        station_id: i32,
        granularity: Granularity,
    ) -> Result<StationModel, ModelError> {
        let path = self.path_for(station_id, granularity);
        let location = path.display().to_string();

        let bytes = match tokio::fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(ModelError::NotFound {
                    station_id,
                    granularity,
                });
            }
            Err(e) => {
                return Err(ModelError::ModelLoadError {
                    path: location,
                    reason: e.to_string(),
                });
            }
        };

        let model =
            StationModel::from_json(station_id, self.schemas.get(granularity), &location, &bytes)?;
        info!("Loaded {} model for station {} from {}", granularity, station_id, location);
        Ok(model)
    }

    /// Loads every artifact under the model directory, failing on the first
    /// one that does not match its schema. Returns the number loaded.
    pub async fn preload(&self) -> Result<usize, ModelError> {
        let mut loaded = 0;

        for granularity in [Granularity::Hourly, Granularity::Daily] {
            let dir = self.directory.join(granularity.to_string());
            let mut entries = match tokio::fs::read_dir(&dir).await {
                Ok(entries) => entries,
                Err(e) if e.kind() == ErrorKind::NotFound => {
                    warn!("Model directory {} does not exist", dir.display());
                    continue;
                }
                Err(e) => {
                    return Err(ModelError::ModelLoadError {
                        path: dir.display().to_string(),
                        reason: e.to_string(),
                    });
                }
            };

            while let Some(entry) = entries.next_entry().await.map_err(|e| {
                ModelError::ModelLoadError {
                    path: dir.display().to_string(),
                    reason: e.to_string(),
                }
            })? {
                let Some(station_id) = station_id_from_path(&entry.path()) else {
                    debug!("Skipping {}", entry.path().display());
                    continue;
                };
                self.get(station_id, granularity).await?;
                loaded += 1;
            }
        }

        info!("Preloaded {} station models", loaded);
        Ok(loaded)
    }
}

fn station_id_from_path(path: &Path) -> Option<i32> {
    if path.extension()? != "json" {
        return None;
    }
    path.file_stem()?
        .to_str()?
        .strip_prefix("station_")?
        .parse()
        .ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ModelsConfig;
    use crate::testing::{linear_artifact, write_model};

    fn registry(dir: &Path) -> ModelRegistry {
        ModelRegistry::new(dir, FeatureSchemas::from_config(&ModelsConfig::default()))
    }

    #[test]
    fn station_ids_come_from_file_names() {
        assert_eq!(station_id_from_path(Path::new("hourly/station_42.json")), Some(42));
        assert_eq!(station_id_from_path(Path::new("hourly/station_42.pkl")), None);
        assert_eq!(station_id_from_path(Path::new("hourly/randForest42.json")), None);
    }

    #[tokio::test]
    async fn loads_lazily_and_caches() {
        let dir = tempfile::tempdir().unwrap();
        let registry = registry(dir.path());
        let schema = registry.schemas().hourly.clone();
        write_model(
            dir.path(),
            Granularity::Hourly,
            42,
            &linear_artifact(&schema, &vec![0.0; schema.len()], 12.0),
        );

        assert_eq!(registry.loaded_count(), 0);
        let first = registry.get(42, Granularity::Hourly).await.unwrap();
        let second = registry.get(42, Granularity::Hourly).await.unwrap();

        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(registry.loaded_count(), 1);
    }

    #[tokio::test]
    async fn missing_artifact_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let registry = registry(dir.path());

        let err = registry.get(7, Granularity::Daily).await.unwrap_err();
        assert!(matches!(
            err,
            ModelError::NotFound {
                station_id: 7,
                granularity: Granularity::Daily
            }
        ));
    }

    #[tokio::test]
    async fn preload_reads_both_granularities() {
        let dir = tempfile::tempdir().unwrap();
        let registry = registry(dir.path());
        let hourly = registry.schemas().hourly.clone();
        let daily = registry.schemas().daily.clone();

        for station in [1, 2] {
            write_model(
                dir.path(),
                Granularity::Hourly,
                station,
                &linear_artifact(&hourly, &vec![0.0; hourly.len()], 1.0),
            );
        }
        write_model(
            dir.path(),
            Granularity::Daily,
            1,
            &linear_artifact(&daily, &vec![0.0; daily.len()], 1.0),
        );

        assert_eq!(registry.preload().await.unwrap(), 3);
        assert_eq!(registry.loaded_count(), 3);
    }

    #[tokio::test]
    async fn preload_fails_fast_on_schema_mismatch() {
        let dir = tempfile::tempdir().unwrap();
        let registry = registry(dir.path());
        // an hourly-shaped artifact in the daily directory
        let hourly = registry.schemas().hourly.clone();
        write_model(
            dir.path(),
            Granularity::Daily,
            5,
            &linear_artifact(&hourly, &vec![0.0; hourly.len()], 1.0),
        );

        let err = registry.preload().await.unwrap_err();
        assert!(matches!(err, ModelError::SchemaMismatch { .. }));
    }
}
