pub mod environment;
pub mod project;
pub mod test_case;
pub mod test_step;
pub mod variable;

pub mod prelude;

pub use prelude::*;
