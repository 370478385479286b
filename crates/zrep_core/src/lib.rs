pub mod analysis;
pub mod domain;
pub mod error;
pub mod labels;
pub mod metrics;
pub mod period;
pub mod report;
pub mod source;
