pub mod crypto;
pub mod document;
pub mod executor;
pub mod report;
pub mod runner;
pub mod sql;
pub mod store;
pub mod template;
pub mod validator;

pub use crypto::ValueCipher;
pub use executor::StepExecutor;
pub use runner::{CaseRunner, RunOptions};
pub use sql::SqlPool;
pub use store::VariableStore;
pub use template::{RunContext, ScopeChain};
