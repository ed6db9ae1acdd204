use std::collections::HashSet;

use async_trait::async_trait;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, Set,
    TransactionTrait,
};
use uuid::Uuid;

use crate::entity::test_step::{self, ActiveModel, Column, Entity as TestStepEntity};
use crate::error::{AppError, AppResult};
use crate::models::{CreateTestStep, StepOrder, TestStep, STATUS_DISABLED};
use crate::repositories::Repository;

/// Test step repository for database operations
pub struct TestStepRepository;

#[async_trait]
impl Repository<TestStep> for TestStepRepository {
    async fn find_by_id(db: &DatabaseConnection, id: Uuid) -> AppResult<TestStep> {
        let model = TestStepEntity::find_by_id(id)
            .one(db)
            .await?
            .ok_or_else(|| AppError::NotFound("Test step".to_string()))?;

        Ok(model.into())
    }

    async fn delete(db: &DatabaseConnection, id: Uuid) -> AppResult<()> {
        let result = TestStepEntity::delete_by_id(id).exec(db).await?;

        if result.rows_affected == 0 {
            return Err(AppError::NotFound("Test step".to_string()));
        }

        Ok(())
    }
}

impl TestStepRepository {
    /// Create a new test step
    pub async fn create(
        db: &DatabaseConnection,
        test_case_id: Uuid,
        input: &CreateTestStep,
    ) -> AppResult<TestStep> {
        let model = ActiveModel {
            id: Set(Uuid::new_v4()),
            test_case_id: Set(test_case_id),
            name: Set(input.name.clone()),
            url: Set(input.url.clone()),
            method: Set(input.method.clone()),
            headers: Set(input.headers.clone()),
            params: Set(input.params.clone()),
            body: Set(input.body.clone()),
            files: Set(input.files.clone()),
            auth: Set(input.auth.clone()),
            extract: Set(input.extract.clone()),
            validate: Set(input.validate.clone()),
            sql_queries: Set(input.sql_queries.clone()),
            timeout: Set(input.timeout),
            retry: Set(input.retry),
            retry_interval: Set(input.retry_interval),
            order: Set(input.order),
            status: Set(input.status),
            created_at: Set(time::OffsetDateTime::now_utc()),
            updated_at: Set(time::OffsetDateTime::now_utc()),
        };

        let result = model.insert(db).await?;
        Ok(result.into())
    }

    /// List the steps of a case that participate in runs, in execution order
    pub async fn find_enabled_by_case(
        db: &DatabaseConnection,
        test_case_id: Uuid,
    ) -> AppResult<Vec<TestStep>> {
        let models = TestStepEntity::find()
            .filter(Column::TestCaseId.eq(test_case_id))
            .filter(Column::Status.ne(STATUS_DISABLED))
            .order_by_asc(Column::Order)
            .all(db)
            .await?;

        Ok(models.into_iter().map(|m| m.into()).collect())
    }

    /// List every step of a case regardless of status, in execution order
    pub async fn find_all_by_case(
        db: &DatabaseConnection,
        test_case_id: Uuid,
    ) -> AppResult<Vec<TestStep>> {
        let models = TestStepEntity::find()
            .filter(Column::TestCaseId.eq(test_case_id))
            .order_by_asc(Column::Order)
            .all(db)
            .await?;

        Ok(models.into_iter().map(|m| m.into()).collect())
    }

    /// Apply a batch of order assignments in one transaction.
    ///
    /// Every referenced step must exist and belong to the same case, and the
    /// resulting orders must stay unique across the whole case, counting the
    /// steps the batch leaves untouched. On any violation nothing is changed.
    /// Returns the full step list of the case in its new order.
    pub async fn reorder(
        db: &DatabaseConnection,
        orders: &[StepOrder],
    ) -> AppResult<Vec<TestStep>> {
        if orders.is_empty() {
            return Err(AppError::Validation("step_orders must not be empty".to_string()));
        }

        let mut seen_steps = HashSet::new();
        let mut seen_orders = HashSet::new();
        for entry in orders {
            if entry.order < 0 {
                return Err(AppError::Validation(format!(
                    "order must be non-negative, got {}",
                    entry.order
                )));
            }
            if !seen_steps.insert(entry.step_id) {
                return Err(AppError::Validation(format!(
                    "step {} appears more than once",
                    entry.step_id
                )));
            }
            if !seen_orders.insert(entry.order) {
                return Err(AppError::Constraint(format!(
                    "order {} assigned more than once within the case",
                    entry.order
                )));
            }
        }

        let txn = db.begin().await?;

        let mut moved = Vec::with_capacity(orders.len());
        let mut test_case_id: Option<Uuid> = None;
        for entry in orders {
            let model = TestStepEntity::find_by_id(entry.step_id)
                .one(&txn)
                .await?
                .ok_or_else(|| AppError::NotFound("Test step".to_string()))?;

            match test_case_id {
                None => test_case_id = Some(model.test_case_id),
                Some(case) if case != model.test_case_id => {
                    return Err(AppError::Constraint(
                        "steps belong to different test cases".to_string(),
                    ));
                }
                Some(_) => {}
            }

            moved.push(model);
        }
        // Non-empty input, so the loop above always set this
        let test_case_id =
            test_case_id.ok_or_else(|| AppError::Internal("empty reorder batch".to_string()))?;

        let untouched = TestStepEntity::find()
            .filter(Column::TestCaseId.eq(test_case_id))
            .filter(Column::Id.is_not_in(seen_steps.iter().copied()))
            .all(&txn)
            .await?;
        for sibling in &untouched {
            if seen_orders.contains(&sibling.order) {
                return Err(AppError::Constraint(format!(
                    "order {} assigned more than once within the case",
                    sibling.order
                )));
            }
        }

        // Park moved steps on negative orders first so the intermediate
        // states never collide with a kept or newly assigned order.
        for (model, entry) in moved.iter().zip(orders) {
            let mut active: ActiveModel = model.clone().into();
            active.order = Set(-(entry.order + 1));
            active.update(&txn).await?;
        }
        for (model, entry) in moved.iter().zip(orders) {
            let mut active: ActiveModel = model.clone().into();
            active.order = Set(entry.order);
            active.updated_at = Set(time::OffsetDateTime::now_utc());
            active.update(&txn).await?;
        }

        txn.commit().await?;

        Self::find_all_by_case(db, test_case_id).await
    }
}

// Conversion from SeaORM model to our domain model
impl From<test_step::Model> for TestStep {
    fn from(m: test_step::Model) -> Self {
        Self {
            id: m.id,
            test_case_id: m.test_case_id,
            name: m.name,
            url: m.url,
            method: m.method,
            headers: m.headers,
            params: m.params,
            body: m.body,
            files: m.files,
            auth: m.auth,
            extract: m.extract,
            validate: m.validate,
            sql_queries: m.sql_queries,
            timeout: m.timeout,
            retry: m.retry,
            retry_interval: m.retry_interval,
            order: m.order,
            status: m.status,
            created_at: m.created_at,
            updated_at: m.updated_at,
        }
    }
}
