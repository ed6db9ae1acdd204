pub mod app;
pub mod factory;
pub mod target;

pub use app::TestApp;
pub use factory::Factory;
pub use target::{FlakyTarget, TestTarget};
