pub mod analysis;
pub mod batch;
pub mod config;
pub mod cons;
pub mod dispatch;
pub mod error;
pub mod params;
pub mod pbs;
pub mod plot;
pub mod run;
