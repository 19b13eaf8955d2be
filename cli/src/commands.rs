pub mod dataset;
pub mod hazard;
pub mod rank;
pub mod risk;
pub mod vulnerability;
