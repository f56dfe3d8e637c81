pub mod base_units;
pub mod polling_interval;
