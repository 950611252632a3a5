pub mod models;
pub mod store;

pub use models::{DynamicReading, StaticStation};
pub use store::{MySqlStationStore, StationStore};
