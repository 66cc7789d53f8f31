//! Command implementations for the cardlink CLI

pub mod readers;
pub mod run;
pub mod scenario;

pub use readers::readers;
pub use run::run;
pub use scenario::check_scenario;
