pub use super::environment::Entity as Environment;
pub use super::project::Entity as Project;
pub use super::test_case::Entity as TestCase;
pub use super::test_step::Entity as TestStep;
pub use super::variable::Entity as Variable;
