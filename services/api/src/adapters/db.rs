//! services/api/src/adapters/db.rs
//!
//! This module contains the database adapter, which is the concrete implementation
//! of the `DatabaseService` port from the `core` crate. It handles all interactions
//! with the PostgreSQL database using `sqlx`. Ids come from `SERIAL` columns, so
//! concurrent writers are safe.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::types::Json;
use sqlx::{FromRow, PgPool};
use testgen_core::domain::{
    File, NewFile, NewTestCase, NewTestPlan, NewUser, TestCase, TestPlan, User,
};
use testgen_core::ports::{DatabaseService, PortError, PortResult};

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// A database adapter that implements the `DatabaseService` port.
#[derive(Clone)]
pub struct DbAdapter {
    pool: PgPool,
}

impl DbAdapter {
    /// Creates a new `DbAdapter`.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// A helper function to run database migrations at startup.
    pub async fn run_migrations(&self) -> Result<(), sqlx::Error> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        Ok(())
    }
}

fn unexpected(e: sqlx::Error) -> PortError {
    PortError::Unexpected(e.to_string())
}

//=========================================================================================
// "Impure" Database Record Structs
//=========================================================================================

const USER_COLUMNS: &str = "id, username, password";
const FILE_COLUMNS: &str = "id, name, size, type AS mime_type, storage_key, uploaded_at";
const TEST_CASE_COLUMNS: &str = "id, test_id, description, prerequisites, steps, \
     expected_results, priority, type AS test_type, file_ids, created_at, selected";
const TEST_PLAN_COLUMNS: &str = "id, name, description, test_case_ids, created_at";

#[derive(FromRow)]
struct UserRecord {
    id: i32,
    username: String,
    password: String,
}
impl UserRecord {
    fn to_domain(self) -> User {
        User {
            id: self.id,
            username: self.username,
            password: self.password,
        }
    }
}

#[derive(FromRow)]
struct FileRecord {
    id: i32,
    name: String,
    size: i64,
    mime_type: String,
    storage_key: String,
    uploaded_at: DateTime<Utc>,
}
impl FileRecord {
    fn to_domain(self) -> File {
        File {
            id: self.id,
            name: self.name,
            size: self.size,
            mime_type: self.mime_type,
            storage_key: self.storage_key,
            uploaded_at: self.uploaded_at,
        }
    }
}

#[derive(FromRow)]
struct TestCaseRecord {
    id: i32,
    test_id: String,
    description: String,
    prerequisites: Option<String>,
    steps: Json<Vec<String>>,
    expected_results: String,
    priority: String,
    test_type: String,
    file_ids: Json<Vec<i32>>,
    created_at: DateTime<Utc>,
    selected: bool,
}
impl TestCaseRecord {
    // Labels are written from the enums, so a parse failure means the row was edited by hand.
    fn to_domain(self) -> PortResult<TestCase> {
        let priority = self
            .priority
            .parse()
            .map_err(|e| PortError::Unexpected(format!("test case {}: {}", self.id, e)))?;
        let test_type = self
            .test_type
            .parse()
            .map_err(|e| PortError::Unexpected(format!("test case {}: {}", self.id, e)))?;
        Ok(TestCase {
            id: self.id,
            test_id: self.test_id,
            description: self.description,
            prerequisites: self.prerequisites,
            steps: self.steps.0,
            expected_results: self.expected_results,
            priority,
            test_type,
            file_ids: self.file_ids.0,
            created_at: self.created_at,
            selected: self.selected,
        })
    }
}

#[derive(FromRow)]
struct TestPlanRecord {
    id: i32,
    name: String,
    description: Option<String>,
    test_case_ids: Json<Vec<i32>>,
    created_at: DateTime<Utc>,
}
impl TestPlanRecord {
    fn to_domain(self) -> TestPlan {
        TestPlan {
            id: self.id,
            name: self.name,
            description: self.description,
            test_case_ids: self.test_case_ids.0,
            created_at: self.created_at,
        }
    }
}

//=========================================================================================
// `DatabaseService` Trait Implementation
//=========================================================================================

#[async_trait]
impl DatabaseService for DbAdapter {
    async fn create_user(&self, user: NewUser) -> PortResult<User> {
        let sql = format!(
            "INSERT INTO users (username, password) VALUES ($1, $2) RETURNING {}",
            USER_COLUMNS
        );
        let record = sqlx::query_as::<_, UserRecord>(&sql)
            .bind(&user.username)
            .bind(&user.password)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| match e {
                sqlx::Error::Database(ref db) if db.is_unique_violation() => PortError::Conflict(
                    format!("Username '{}' is already taken", user.username),
                ),
                _ => unexpected(e),
            })?;
        Ok(record.to_domain())
    }

    async fn get_user(&self, id: i32) -> PortResult<Option<User>> {
        let sql = format!("SELECT {} FROM users WHERE id = $1", USER_COLUMNS);
        let record = sqlx::query_as::<_, UserRecord>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(unexpected)?;
        Ok(record.map(UserRecord::to_domain))
    }

    async fn get_user_by_username(&self, username: &str) -> PortResult<Option<User>> {
        let sql = format!("SELECT {} FROM users WHERE username = $1", USER_COLUMNS);
        let record = sqlx::query_as::<_, UserRecord>(&sql)
            .bind(username)
            .fetch_optional(&self.pool)
            .await
            .map_err(unexpected)?;
        Ok(record.map(UserRecord::to_domain))
    }

    async fn create_file(&self, file: NewFile) -> PortResult<File> {
        let sql = format!(
            "INSERT INTO files (name, size, type, storage_key) VALUES ($1, $2, $3, $4) RETURNING {}",
            FILE_COLUMNS
        );
        let record = sqlx::query_as::<_, FileRecord>(&sql)
            .bind(&file.name)
            .bind(file.size)
            .bind(&file.mime_type)
            .bind(&file.storage_key)
            .fetch_one(&self.pool)
            .await
            .map_err(unexpected)?;
        Ok(record.to_domain())
    }

    async fn get_file(&self, id: i32) -> PortResult<Option<File>> {
        let sql = format!("SELECT {} FROM files WHERE id = $1", FILE_COLUMNS);
        let record = sqlx::query_as::<_, FileRecord>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(unexpected)?;
        Ok(record.map(FileRecord::to_domain))
    }

    async fn get_all_files(&self) -> PortResult<Vec<File>> {
        let sql = format!("SELECT {} FROM files ORDER BY id ASC", FILE_COLUMNS);
        let records = sqlx::query_as::<_, FileRecord>(&sql)
            .fetch_all(&self.pool)
            .await
            .map_err(unexpected)?;
        Ok(records.into_iter().map(FileRecord::to_domain).collect())
    }

    async fn delete_file(&self, id: i32) -> PortResult<Option<File>> {
        let sql = format!("DELETE FROM files WHERE id = $1 RETURNING {}", FILE_COLUMNS);
        let record = sqlx::query_as::<_, FileRecord>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(unexpected)?;
        Ok(record.map(FileRecord::to_domain))
    }

    async fn create_test_case(&self, test_case: NewTestCase) -> PortResult<TestCase> {
        let sql = format!(
            "INSERT INTO test_cases \
             (test_id, description, prerequisites, steps, expected_results, priority, type, file_ids) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8) RETURNING {}",
            TEST_CASE_COLUMNS
        );
        let record = sqlx::query_as::<_, TestCaseRecord>(&sql)
            .bind(&test_case.test_id)
            .bind(&test_case.description)
            .bind(&test_case.prerequisites)
            .bind(Json(&test_case.steps))
            .bind(&test_case.expected_results)
            .bind(test_case.priority.as_str())
            .bind(test_case.test_type.as_str())
            .bind(Json(&test_case.file_ids))
            .fetch_one(&self.pool)
            .await
            .map_err(unexpected)?;
        record.to_domain()
    }

    async fn get_test_case(&self, id: i32) -> PortResult<Option<TestCase>> {
        let sql = format!("SELECT {} FROM test_cases WHERE id = $1", TEST_CASE_COLUMNS);
        let record = sqlx::query_as::<_, TestCaseRecord>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(unexpected)?;
        record.map(TestCaseRecord::to_domain).transpose()
    }

    async fn get_all_test_cases(&self) -> PortResult<Vec<TestCase>> {
        let sql = format!("SELECT {} FROM test_cases ORDER BY id ASC", TEST_CASE_COLUMNS);
        let records = sqlx::query_as::<_, TestCaseRecord>(&sql)
            .fetch_all(&self.pool)
            .await
            .map_err(unexpected)?;
        records.into_iter().map(TestCaseRecord::to_domain).collect()
    }

    async fn update_test_case_selection(&self, id: i32, selected: bool) -> PortResult<TestCase> {
        let sql = format!(
            "UPDATE test_cases SET selected = $1 WHERE id = $2 RETURNING {}",
            TEST_CASE_COLUMNS
        );
        let record = sqlx::query_as::<_, TestCaseRecord>(&sql)
            .bind(selected)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(unexpected)?
            .ok_or_else(|| PortError::NotFound(format!("Test case with ID {} not found", id)))?;
        record.to_domain()
    }

    async fn create_test_plan(&self, test_plan: NewTestPlan) -> PortResult<TestPlan> {
        let sql = format!(
            "INSERT INTO test_plans (name, description, test_case_ids) VALUES ($1, $2, $3) RETURNING {}",
            TEST_PLAN_COLUMNS
        );
        let record = sqlx::query_as::<_, TestPlanRecord>(&sql)
            .bind(&test_plan.name)
            .bind(&test_plan.description)
            .bind(Json(&test_plan.test_case_ids))
            .fetch_one(&self.pool)
            .await
            .map_err(unexpected)?;
        Ok(record.to_domain())
    }

    async fn get_test_plan(&self, id: i32) -> PortResult<Option<TestPlan>> {
        let sql = format!("SELECT {} FROM test_plans WHERE id = $1", TEST_PLAN_COLUMNS);
        let record = sqlx::query_as::<_, TestPlanRecord>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(unexpected)?;
        Ok(record.map(TestPlanRecord::to_domain))
    }

    async fn get_all_test_plans(&self) -> PortResult<Vec<TestPlan>> {
        let sql = format!("SELECT {} FROM test_plans ORDER BY id ASC", TEST_PLAN_COLUMNS);
        let records = sqlx::query_as::<_, TestPlanRecord>(&sql)
            .fetch_all(&self.pool)
            .await
            .map_err(unexpected)?;
        Ok(records.into_iter().map(TestPlanRecord::to_domain).collect())
    }
}
