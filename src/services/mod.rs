pub mod aggregation_service;
pub mod chart_service;
pub mod correlator_service;
pub mod date_range_service;
pub mod projection_service;
pub mod rate_service;
pub mod render_service;
pub mod session_service;
