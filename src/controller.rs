use anyhow::Error;
use chrono::{DateTime, Utc};
use log::{error, info, warn};
use serde::Serialize;
use std::{
    fmt,
    sync::{Arc, Mutex, MutexGuard, PoisonError},
};

use crate::districts::{Chart, District, UnknownDistrictErr};
use crate::workers::{DraftWorker, NewWorker, Worker, WorkerStore};

pub const LOADING_MESSAGE: &str = "Loading workers...";
pub const EMPTY_MESSAGE: &str = "No workers found";

/// Local view of the dashboard.
///
/// # Notes
///
/// `workers` is a read-through cache of the store: replaced on load,
/// appended to on create, filtered on delete.
#[derive(Debug)]
pub struct DashboardState {
    workers: Vec<Worker>,
    draft: DraftWorker,
    loading: bool,
    district: District,
    /// Last time a store response was applied.
    synced_at: Option<DateTime<Utc>>,
}

impl Default for DashboardState {
    fn default() -> Self {
        Self {
            workers: Vec::new(),
            draft: DraftWorker::default(),
            loading: true,
            district: District::default(),
            synced_at: None,
        }
    }
}

impl DashboardState {
    /// Keeps the first record of each id.
    fn replace(&mut self, workers: Vec<Worker>) {
        self.workers.clear();
        for worker in workers {
            self.append(worker);
        }
    }

    fn append(&mut self, worker: Worker) {
        if self.workers.iter().any(|w| w.id == worker.id) {
            warn!("Ignoring duplicated worker id {}", worker.id);
            return;
        }
        self.workers.push(worker);
    }

    fn remove(&mut self, id: &str) {
        self.workers.retain(|w| w.id != id);
    }

    fn touch(&mut self) {
        self.synced_at = Some(Utc::now());
    }
}

/// Snapshot of [`DashboardState`] handed to the page.
#[derive(Serialize, Debug)]
pub struct DashboardView {
    pub workers: Vec<Worker>,
    pub loading: bool,
    /// Shown instead of the table while loading or when there is no worker.
    pub status: Option<&'static str>,
    pub draft: DraftWorker,
    pub district: District,
    pub districts: [District; 4],
    pub chart: Chart,
    pub synced_at: Option<DateTime<Utc>>,
}

/* -------------------------------------------------------------------------- */
/*                                 Controller                                 */
/* -------------------------------------------------------------------------- */

/// Keeps the local worker list consistent with the store.
///
/// The state lock is never held across a store call: concurrent requests
/// are applied in the order their responses arrive. Clones share the same
/// state.
#[derive(Clone)]
pub struct WorkerListController {
    store: Arc<dyn WorkerStore>,
    state: Arc<Mutex<DashboardState>>,
}

impl WorkerListController {
    pub fn new(store: impl WorkerStore + 'static) -> Self {
        Self {
            store: Arc::new(store),
            state: Arc::new(Mutex::new(DashboardState::default())),
        }
    }

    fn state(&self) -> MutexGuard<'_, DashboardState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Fetches the whole collection. A failure is only logged: the list stays
    /// empty and the page shows its empty state.
    ///
    /// Does nothing once loaded.
    pub async fn load(&self) {
        if !self.state().loading {
            return;
        }
        let result = self.store.list().await;

        let mut state = self.state();
        match result {
            Ok(workers) => {
                info!("Loaded {} workers", workers.len());
                state.replace(workers);
                state.touch();
            }
            Err(err) => {
                DashboardErr::LoadFailed(err).logged();
            }
        }
        state.loading = false;
    }

    pub async fn add_worker(&self, name: &str, village: &str) -> Result<Worker, DashboardErr> {
        if !DraftWorker::new(name, village).is_submittable() {
            return Err(DashboardErr::ValidationFailed.logged());
        }

        let created = self
            .store
            .create(NewWorker { name, village })
            .await
            .map_err(|err| DashboardErr::CreateFailed(err).logged())?;

        let mut state = self.state();
        state.append(created.clone());
        state.draft.clear();
        state.touch();
        info!("Added worker {}", created.id);
        Ok(created)
    }

    pub async fn delete_worker(&self, id: &str) -> Result<(), DashboardErr> {
        self.store
            .delete(id)
            .await
            .map_err(|err| DashboardErr::DeleteFailed(err).logged())?;

        let mut state = self.state();
        state.remove(id);
        state.touch();
        info!("Deleted worker {}", id);
        Ok(())
    }

    /// Only the chart follows the selection, the worker list is untouched.
    pub fn select_district(&self, name: &str) -> Result<District, DashboardErr> {
        let district = name
            .parse::<District>()
            .map_err(|err| DashboardErr::UnknownDistrict(err).logged())?;
        self.state().district = district;
        Ok(district)
    }

    pub fn update_draft(&self, draft: DraftWorker) {
        self.state().draft = draft;
    }

    /// Shows `draft` in the form and adds a worker with exactly its values.
    ///
    /// The shared draft is only written, never read back: concurrent
    /// submissions each send their own name and village.
    pub async fn submit_draft(&self, draft: DraftWorker) -> Result<Worker, DashboardErr> {
        self.update_draft(draft.clone());
        self.add_worker(&draft.name, &draft.village).await
    }

    pub fn chart(&self) -> Chart {
        self.state().district.chart()
    }

    pub fn view(&self) -> DashboardView {
        let state = self.state();
        let status = if state.loading {
            Some(LOADING_MESSAGE)
        } else if state.workers.is_empty() {
            Some(EMPTY_MESSAGE)
        } else {
            None
        };

        DashboardView {
            workers: state.workers.clone(),
            loading: state.loading,
            status,
            draft: state.draft.clone(),
            district: state.district,
            districts: District::ALL,
            chart: state.district.chart(),
            synced_at: state.synced_at,
        }
    }
}

/* --------------------------------- Errors --------------------------------- */

/// Failures of the dashboard operations.
///
/// `Display` gives the message meant for the end user; the store error is
/// kept for the logs.
#[derive(Debug)]
pub enum DashboardErr {
    /// Only reaches the logs: a failed load shows the empty list.
    LoadFailed(Error),
    ValidationFailed,
    CreateFailed(Error),
    DeleteFailed(Error),
    UnknownDistrict(UnknownDistrictErr),
}

impl DashboardErr {
    pub fn cause(&self) -> Option<&Error> {
        match self {
            DashboardErr::LoadFailed(err)
            | DashboardErr::CreateFailed(err)
            | DashboardErr::DeleteFailed(err) => Some(err),
            DashboardErr::ValidationFailed | DashboardErr::UnknownDistrict(_) => None,
        }
    }

    /// Reports the failure on the operator console.
    fn logged(self) -> Self {
        match self.cause() {
            Some(cause) => error!("{} {:#}", self, cause),
            None => warn!("{}", self),
        }
        self
    }
}

impl fmt::Display for DashboardErr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DashboardErr::LoadFailed(_) => f.write_str("Failed to load workers."),
            DashboardErr::ValidationFailed => f.write_str("Please provide both name and village."),
            DashboardErr::CreateFailed(_) => f.write_str("Failed to add worker. Please try again."),
            DashboardErr::DeleteFailed(_) => {
                f.write_str("Failed to delete worker. Please try again.")
            }
            DashboardErr::UnknownDistrict(err) => fmt::Display::fmt(err, f),
        }
    }
}

/* -------------------------------------------------------------------------- */
/*                                    Tests                                   */
/* -------------------------------------------------------------------------- */

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workers::fake::FakeStore;

    fn worker(id: &str, name: &str, village: &str) -> Worker {
        Worker {
            id: id.to_string(),
            name: name.to_string(),
            village: village.to_string(),
        }
    }

    async fn loaded(store: &FakeStore) -> WorkerListController {
        let controller = WorkerListController::new(store.clone());
        controller.load().await;
        controller
    }

    #[rocket::async_test]
    async fn test_starts_loading() {
        let controller = WorkerListController::new(FakeStore::default());
        let view = controller.view();
        assert!(view.loading);
        assert_eq!(view.status, Some(LOADING_MESSAGE));
        assert_eq!(view.district, District::Madurai);
        assert!(view.synced_at.is_none());
    }

    #[rocket::async_test]
    async fn test_load_replaces_collection() {
        let store = FakeStore::with_workers(vec![worker("1", "Kumar", "Alanganallur")]);
        let controller = loaded(&store).await;

        let view = controller.view();
        assert!(!view.loading);
        assert_eq!(view.workers, vec![worker("1", "Kumar", "Alanganallur")]);
        assert_eq!(view.status, None);
        assert!(view.synced_at.is_some());
    }

    #[rocket::async_test]
    async fn test_load_failure_leaves_empty_list() {
        let store = FakeStore::with_workers(vec![worker("1", "Kumar", "Alanganallur")]);
        store.set_failing(true);
        let controller = loaded(&store).await;

        let view = controller.view();
        assert!(!view.loading);
        assert!(view.workers.is_empty());
        assert_eq!(view.status, Some(EMPTY_MESSAGE));
        assert!(view.synced_at.is_none());
    }

    #[rocket::async_test]
    async fn test_load_happens_once() {
        let store = FakeStore::with_workers(vec![worker("1", "Kumar", "Alanganallur")]);
        let controller = loaded(&store).await;
        controller.delete_worker("1").await.unwrap();
        let calls = store.calls();

        controller.load().await;
        assert_eq!(store.calls(), calls);
        assert!(controller.view().workers.is_empty());
    }

    #[rocket::async_test]
    async fn test_clones_share_state() {
        let store = FakeStore::default();
        let controller = loaded(&store).await;
        let handle = controller.clone();

        handle.add_worker("Devi", "Usilampatti").await.unwrap();
        assert_eq!(controller.view().workers.len(), 1);
    }

    #[rocket::async_test]
    async fn test_load_drops_duplicated_ids() {
        let store = FakeStore::with_workers(vec![
            worker("1", "Kumar", "Alanganallur"),
            worker("1", "Kumar bis", "Melur"),
            worker("2", "Devi", "Usilampatti"),
        ]);
        let controller = loaded(&store).await;

        let workers = controller.view().workers;
        assert_eq!(workers.len(), 2);
        assert_eq!(workers[0].name, "Kumar");
        assert_eq!(workers[1].id, "2");
    }

    #[rocket::async_test]
    async fn test_add_worker_appends_and_clears_draft() {
        let store = FakeStore::with_workers(vec![worker("1", "Kumar", "Alanganallur")]);
        let controller = loaded(&store).await;
        controller.update_draft(DraftWorker::new("Devi", "Usilampatti"));

        let created = controller.add_worker("Devi", "Usilampatti").await.unwrap();
        assert_eq!(created, worker("2", "Devi", "Usilampatti"));

        let view = controller.view();
        assert_eq!(view.workers.len(), 2);
        assert_eq!(view.workers.last(), Some(&created));
        assert_eq!(view.draft, DraftWorker::default());
    }

    #[rocket::async_test]
    async fn test_add_worker_rejects_blank_fields() {
        let store = FakeStore::with_workers(vec![worker("1", "Kumar", "Alanganallur")]);
        let controller = loaded(&store).await;
        let calls = store.calls();

        for (name, village) in [("", "x"), ("x", ""), ("  ", "  ")] {
            let result = controller.add_worker(name, village).await;
            assert!(matches!(result, Err(DashboardErr::ValidationFailed)));
        }

        assert_eq!(store.calls(), calls);
        assert_eq!(controller.view().workers.len(), 1);
    }

    #[rocket::async_test]
    async fn test_add_worker_failure_keeps_state() {
        let store = FakeStore::default();
        let controller = loaded(&store).await;
        store.set_failing(true);

        let result = controller
            .submit_draft(DraftWorker::new("Devi", "Usilampatti"))
            .await;
        assert!(matches!(result, Err(DashboardErr::CreateFailed(_))));

        let view = controller.view();
        assert!(view.workers.is_empty());
        assert_eq!(view.draft, DraftWorker::new("Devi", "Usilampatti"));
    }

    #[rocket::async_test]
    async fn test_submit_draft_sends_typed_values() {
        let store = FakeStore::default();
        let controller = loaded(&store).await;
        let created = controller
            .submit_draft(DraftWorker::new(" Devi", "Usilampatti "))
            .await
            .unwrap();
        assert_eq!(created.name, " Devi");
        assert_eq!(created.village, "Usilampatti ");
        assert_eq!(store.stored().len(), 1);
    }

    #[rocket::async_test]
    async fn test_delete_worker_filters_by_id() {
        let store = FakeStore::with_workers(vec![
            worker("1", "Kumar", "Alanganallur"),
            worker("2", "Devi", "Usilampatti"),
        ]);
        let controller = loaded(&store).await;

        controller.delete_worker("1").await.unwrap();

        let workers = controller.view().workers;
        assert_eq!(workers, vec![worker("2", "Devi", "Usilampatti")]);
        assert_eq!(store.stored(), workers);
    }

    #[rocket::async_test]
    async fn test_delete_worker_failure_keeps_collection() {
        let store = FakeStore::with_workers(vec![worker("1", "Kumar", "Alanganallur")]);
        let controller = loaded(&store).await;
        store.set_failing(true);

        let result = controller.delete_worker("1").await;
        assert!(matches!(result, Err(DashboardErr::DeleteFailed(_))));
        assert_eq!(controller.view().workers.len(), 1);
    }

    #[rocket::async_test]
    async fn test_select_district_only_touches_chart() {
        let store = FakeStore::with_workers(vec![worker("1", "Kumar", "Alanganallur")]);
        let controller = loaded(&store).await;
        let calls = store.calls();
        let before = controller.view().workers;

        assert_eq!(controller.select_district("Theni").unwrap(), District::Theni);

        let view = controller.view();
        assert_eq!(view.district, District::Theni);
        assert_eq!(view.chart.data.datasets[0].data, [45, 60, 58, 62, 70]);
        assert_eq!(view.workers, before);
        assert_eq!(store.calls(), calls);
    }

    #[rocket::async_test]
    async fn test_select_unknown_district_keeps_selection() {
        let controller = loaded(&FakeStore::default()).await;
        controller.select_district("Salem").unwrap();

        let result = controller.select_district("Chennai");
        assert!(matches!(result, Err(DashboardErr::UnknownDistrict(_))));
        assert_eq!(controller.view().district, District::Salem);
    }

    #[test]
    fn test_user_facing_messages() {
        assert_eq!(
            DashboardErr::ValidationFailed.to_string(),
            "Please provide both name and village."
        );
        assert_eq!(
            DashboardErr::CreateFailed(anyhow::anyhow!("timeout")).to_string(),
            "Failed to add worker. Please try again."
        );
        assert_eq!(
            DashboardErr::DeleteFailed(anyhow::anyhow!("404")).to_string(),
            "Failed to delete worker. Please try again."
        );
    }

    #[test]
    fn test_load_failure_keeps_cause_for_logs() {
        let err = DashboardErr::LoadFailed(anyhow::anyhow!("connection refused"));
        assert_eq!(err.to_string(), "Failed to load workers.");
        assert_eq!(err.cause().unwrap().to_string(), "connection refused");
        assert!(DashboardErr::ValidationFailed.cause().is_none());
    }

    #[test]
    fn test_concurrent_submissions_send_their_own_values() {
        let runtime = rocket::tokio::runtime::Builder::new_multi_thread()
            .worker_threads(8)
            .enable_all()
            .build()
            .unwrap();

        runtime.block_on(async {
            let store = FakeStore::default();
            let controller = loaded(&store).await;

            let tasks: Vec<_> = (0..500)
                .map(|i| {
                    let controller = controller.clone();
                    rocket::tokio::spawn(async move {
                        let name = format!("worker-{}", i);
                        let village = format!("village-{}", i);
                        let created = controller
                            .submit_draft(DraftWorker::new(&name, &village))
                            .await
                            .unwrap();
                        (name, village, created)
                    })
                })
                .collect();

            for task in tasks {
                let (name, village, created) = task.await.unwrap();
                assert_eq!(created.name, name);
                assert_eq!(created.village, village);
            }

            assert_eq!(controller.view().workers.len(), 500);
            assert_eq!(store.stored().len(), 500);
        });
    }
}
