pub mod common;
pub mod environment;
pub mod execute;
pub mod step;
pub mod variable;

pub use common::VariableScopeParams;
pub use environment::{get_default_environment, set_default_environment, EnvironmentResponse};
pub use execute::{execute_test_case, execute_test_step, ExecuteRequest};
pub use step::{reorder_steps, ReorderStepsRequest, TestStepListResponse, TestStepResponse};
pub use variable::{
    create_variable, delete_variable, get_variable, list_variables, process_template,
    upsert_variable, CreateVariableRequest, ProcessTemplateRequest, ProcessTemplateResponse,
    UpsertVariableRequest, VariableListResponse, VariableResponse,
};
