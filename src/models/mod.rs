pub mod environment;
pub mod project;
pub mod report;
pub mod test_case;
pub mod test_step;
pub mod variable;

pub use environment::*;
pub use project::*;
pub use report::*;
pub use test_case::*;
pub use test_step::*;
pub use variable::*;

/// Entities with this status participate in runs and listings.
pub const STATUS_ENABLED: i32 = 1;
/// Disabled entities are kept but excluded from runs.
pub const STATUS_DISABLED: i32 = 0;
