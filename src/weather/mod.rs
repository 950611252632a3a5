pub mod client;
pub mod forecast;

pub use client::{ForecastSource, OpenWeatherClient};
pub use forecast::{Condition, Forecast};
