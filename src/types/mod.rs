pub mod qualification;
pub mod report;
pub mod requirement;
pub mod supplier;
