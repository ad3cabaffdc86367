pub mod additives;
pub mod config;
pub mod error;
pub mod logging;
pub mod reconcile;
pub mod report;
pub mod run;
pub mod session;
