mod analytics;
mod report;
mod share;
mod user;

pub use analytics::*;
pub use report::*;
pub use share::*;
pub use user::*;
