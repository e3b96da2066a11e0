pub mod license_gate;
pub mod rate_limit;
