pub mod landmark_aggregator;
pub mod posture_metrics;
