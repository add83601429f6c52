//! services/api/src/adapters/memory.rs
//!
//! An in-memory implementation of the `DatabaseService` port, used when no database
//! is configured and in tests. Each instance owns its own tables; ids are assigned
//! while the table lock is held, so concurrent writers never share an id.

use async_trait::async_trait;
use chrono::Utc;
use std::collections::BTreeMap;
use testgen_core::domain::{
    File, NewFile, NewTestCase, NewTestPlan, NewUser, TestCase, TestPlan, User,
};
use testgen_core::ports::{DatabaseService, PortError, PortResult};
use tokio::sync::Mutex;

#[derive(Default)]
struct Tables {
    users: BTreeMap<i32, User>,
    files: BTreeMap<i32, File>,
    test_cases: BTreeMap<i32, TestCase>,
    test_plans: BTreeMap<i32, TestPlan>,
    last_user_id: i32,
    last_file_id: i32,
    last_test_case_id: i32,
    last_test_plan_id: i32,
}

fn next_id(last: &mut i32) -> i32 {
    *last += 1;
    *last
}

/// A `DatabaseService` backed by ordered maps behind a single lock.
#[derive(Default)]
pub struct InMemoryAdapter {
    tables: Mutex<Tables>,
}

impl InMemoryAdapter {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl DatabaseService for InMemoryAdapter {
    async fn create_user(&self, user: NewUser) -> PortResult<User> {
        let mut tables = self.tables.lock().await;
        if tables.users.values().any(|u| u.username == user.username) {
            return Err(PortError::Conflict(format!(
                "Username '{}' is already taken",
                user.username
            )));
        }
        let record = User {
            id: next_id(&mut tables.last_user_id),
            username: user.username,
            password: user.password,
        };
        tables.users.insert(record.id, record.clone());
        Ok(record)
    }

    async fn get_user(&self, id: i32) -> PortResult<Option<User>> {
        Ok(self.tables.lock().await.users.get(&id).cloned())
    }

    async fn get_user_by_username(&self, username: &str) -> PortResult<Option<User>> {
        let tables = self.tables.lock().await;
        Ok(tables
            .users
            .values()
            .find(|u| u.username == username)
            .cloned())
    }

    async fn create_file(&self, file: NewFile) -> PortResult<File> {
        let mut tables = self.tables.lock().await;
        let record = File {
            id: next_id(&mut tables.last_file_id),
            name: file.name,
            size: file.size,
            mime_type: file.mime_type,
            storage_key: file.storage_key,
            uploaded_at: Utc::now(),
        };
        tables.files.insert(record.id, record.clone());
        Ok(record)
    }

    async fn get_file(&self, id: i32) -> PortResult<Option<File>> {
        Ok(self.tables.lock().await.files.get(&id).cloned())
    }

    async fn get_all_files(&self) -> PortResult<Vec<File>> {
        Ok(self.tables.lock().await.files.values().cloned().collect())
    }

    async fn delete_file(&self, id: i32) -> PortResult<Option<File>> {
        Ok(self.tables.lock().await.files.remove(&id))
    }

    async fn create_test_case(&self, test_case: NewTestCase) -> PortResult<TestCase> {
        let mut tables = self.tables.lock().await;
        let record = TestCase {
            id: next_id(&mut tables.last_test_case_id),
            test_id: test_case.test_id,
            description: test_case.description,
            prerequisites: test_case.prerequisites,
            steps: test_case.steps,
            expected_results: test_case.expected_results,
            priority: test_case.priority,
            test_type: test_case.test_type,
            file_ids: test_case.file_ids,
            created_at: Utc::now(),
            selected: false,
        };
        tables.test_cases.insert(record.id, record.clone());
        Ok(record)
    }

    async fn get_test_case(&self, id: i32) -> PortResult<Option<TestCase>> {
        Ok(self.tables.lock().await.test_cases.get(&id).cloned())
    }

    async fn get_all_test_cases(&self) -> PortResult<Vec<TestCase>> {
        Ok(self.tables.lock().await.test_cases.values().cloned().collect())
    }

    async fn update_test_case_selection(&self, id: i32, selected: bool) -> PortResult<TestCase> {
        let mut tables = self.tables.lock().await;
        let record = tables
            .test_cases
            .get_mut(&id)
            .ok_or_else(|| PortError::NotFound(format!("Test case with ID {} not found", id)))?;
        record.selected = selected;
        Ok(record.clone())
    }

    async fn create_test_plan(&self, test_plan: NewTestPlan) -> PortResult<TestPlan> {
        let mut tables = self.tables.lock().await;
        let record = TestPlan {
            id: next_id(&mut tables.last_test_plan_id),
            name: test_plan.name,
            description: test_plan.description,
            test_case_ids: test_plan.test_case_ids,
            created_at: Utc::now(),
        };
        tables.test_plans.insert(record.id, record.clone());
        Ok(record)
    }

    async fn get_test_plan(&self, id: i32) -> PortResult<Option<TestPlan>> {
        Ok(self.tables.lock().await.test_plans.get(&id).cloned())
    }

    async fn get_all_test_plans(&self) -> PortResult<Vec<TestPlan>> {
        Ok(self.tables.lock().await.test_plans.values().cloned().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use testgen_core::domain::{Priority, TestCaseType};

    fn new_file(name: &str) -> NewFile {
        NewFile {
            name: name.to_string(),
            size: 42,
            mime_type: "text/plain".to_string(),
            storage_key: format!("files-1-abc-{}", name),
        }
    }

    fn new_test_case(test_id: &str) -> NewTestCase {
        NewTestCase {
            test_id: test_id.to_string(),
            description: "User can log in".to_string(),
            prerequisites: Some("Account exists".to_string()),
            steps: vec!["Open app".to_string(), "Submit credentials".to_string()],
            expected_results: "Dashboard is shown".to_string(),
            priority: Priority::High,
            test_type: TestCaseType::Functional,
            file_ids: vec![1],
        }
    }

    #[tokio::test]
    async fn files_get_increasing_ids_and_can_be_deleted() {
        let store = InMemoryAdapter::new();
        let first = store.create_file(new_file("a.txt")).await.unwrap();
        let second = store.create_file(new_file("b.txt")).await.unwrap();
        assert_eq!((first.id, second.id), (1, 2));

        let removed = store.delete_file(first.id).await.unwrap();
        assert_eq!(removed.map(|f| f.name), Some("a.txt".to_string()));

        let remaining = store.get_all_files().await.unwrap();
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].id, second.id);
        assert!(store.get_file(first.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn deleting_an_unknown_file_is_not_an_error() {
        let store = InMemoryAdapter::new();
        assert!(store.delete_file(99).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn created_test_cases_start_unselected() {
        let store = InMemoryAdapter::new();
        let created = store.create_test_case(new_test_case("TC-001")).await.unwrap();
        assert!(!created.selected);
        assert_eq!(
            store.get_test_case(created.id).await.unwrap(),
            Some(created)
        );
    }

    #[tokio::test]
    async fn selection_update_changes_only_the_flag() {
        let store = InMemoryAdapter::new();
        let created = store.create_test_case(new_test_case("TC-001")).await.unwrap();

        let updated = store
            .update_test_case_selection(created.id, true)
            .await
            .unwrap();
        assert!(updated.selected);

        let fetched = store.get_test_case(created.id).await.unwrap().unwrap();
        assert_eq!(
            fetched,
            TestCase {
                selected: true,
                ..created
            }
        );
    }

    #[tokio::test]
    async fn selection_update_on_unknown_id_is_not_found() {
        let store = InMemoryAdapter::new();
        let result = store.update_test_case_selection(7, true).await;
        assert!(matches!(result, Err(PortError::NotFound(_))));
    }

    #[tokio::test]
    async fn usernames_are_unique() {
        let store = InMemoryAdapter::new();
        let user = NewUser {
            username: "qa".to_string(),
            password: "hunter2".to_string(),
        };
        let created = store.create_user(user.clone()).await.unwrap();
        assert!(matches!(
            store.create_user(user).await,
            Err(PortError::Conflict(_))
        ));
        assert_eq!(
            store.get_user_by_username("qa").await.unwrap(),
            Some(created.clone())
        );
        assert_eq!(store.get_user(created.id).await.unwrap(), Some(created));
        assert!(store.get_user(2).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_plans_round_trip() {
        let store = InMemoryAdapter::new();
        let plan = store
            .create_test_plan(NewTestPlan {
                name: "Release 1".to_string(),
                description: None,
                test_case_ids: vec![3, 1, 2],
            })
            .await
            .unwrap();
        assert_eq!(plan.test_case_ids, vec![3, 1, 2]);
        assert_eq!(store.get_all_test_plans().await.unwrap(), vec![plan.clone()]);
        assert_eq!(store.get_test_plan(plan.id).await.unwrap(), Some(plan));
    }

    #[tokio::test]
    async fn concurrent_writers_never_share_an_id() {
        let store = Arc::new(InMemoryAdapter::new());
        let handles: Vec<_> = (0..32)
            .map(|i| {
                let store = store.clone();
                tokio::spawn(async move {
                    store
                        .create_file(new_file(&format!("{}.txt", i)))
                        .await
                        .unwrap()
                        .id
                })
            })
            .collect();

        let mut ids = Vec::new();
        for handle in handles {
            ids.push(handle.await.unwrap());
        }
        ids.sort_unstable();
        ids.dedup();
        assert_eq!(ids.len(), 32);
    }
}
