//! Read-only operational endpoints.

pub mod health_route;
pub mod metrics_route;
pub mod stats_route;
