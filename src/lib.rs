pub mod mnist;
pub mod plot;
pub mod report;
