pub mod covers;
pub mod health;
pub mod preferences;
pub mod recommendations;

pub use covers::covers_config;
pub use health::health_check;
pub use preferences::preferences_config;
pub use recommendations::recommendations_config;
