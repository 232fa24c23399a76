pub mod analytics;
pub mod diagnostics;
pub mod share;
