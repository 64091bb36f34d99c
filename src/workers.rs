use anyhow::{anyhow, Context, Error};
use reqwest::header::{ACCEPT, USER_AGENT};
use reqwest::{Client, Url};
use rocket::{async_trait, FromForm};
use serde::{Deserialize, Serialize};

/// A worker record as owned by the remote store.
///
/// # Notes
///
/// The store names the identifier `_id`; the dashboard exposes it as `id`.
#[derive(Serialize, Deserialize, Clone, PartialEq, Eq, Debug)]
pub struct Worker {
    #[serde(rename(deserialize = "_id"))]
    pub id: String,
    pub name: String,
    pub village: String,
}

/// Pending input of the "Add Worker" form.
#[derive(Serialize, Deserialize, FromForm, Clone, PartialEq, Eq, Default, Debug)]
pub struct DraftWorker {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub village: String,
}

impl DraftWorker {
    pub fn new(name: &str, village: &str) -> Self {
        Self {
            name: name.to_string(),
            village: village.to_string(),
        }
    }

    /// Both fields must hold something else than whitespace.
    pub fn is_submittable(&self) -> bool {
        !self.name.trim().is_empty() && !self.village.trim().is_empty()
    }

    pub fn clear(&mut self) {
        self.name.clear();
        self.village.clear();
    }
}

/// Body of a create request.
#[derive(Serialize, Debug)]
pub struct NewWorker<'a> {
    pub name: &'a str,
    pub village: &'a str,
}

/* -------------------------------------------------------------------------- */
/*                                Worker Store                                */
/* -------------------------------------------------------------------------- */

/// The remote collaborator holding the authoritative worker collection.
///
/// Any failure (transport or non-2xx) is reported as a plain `Error`.
#[async_trait]
pub trait WorkerStore: Send + Sync {
    async fn list(&self) -> Result<Vec<Worker>, Error>;
    async fn create(&self, worker: NewWorker<'_>) -> Result<Worker, Error>;
    async fn delete(&self, id: &str) -> Result<(), Error>;
}

pub struct HttpWorkerStore {
    client: Client,
    base_url: Url,
}

impl HttpWorkerStore {
    pub fn new(base_url: &str) -> Result<Self, Error> {
        let base_url =
            Url::parse(base_url).with_context(|| format!("invalid backend url - {}", base_url))?;
        if base_url.cannot_be_a_base() {
            return Err(anyhow!("backend url cannot be a base - {}", base_url));
        }
        let client = Client::builder()
            .build()
            .context("failed to build reqwest client")?;

        Ok(Self { client, base_url })
    }

    /// `<base>/api/workers` followed by `segments`, each one percent-encoded.
    pub fn endpoint(&self, segments: &[&str]) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(["api", "workers"]).extend(segments);
        }
        url
    }
}

#[async_trait]
impl WorkerStore for HttpWorkerStore {
    async fn list(&self) -> Result<Vec<Worker>, Error> {
        self.client
            .get(self.endpoint(&[]))
            .header(ACCEPT, "application/json")
            .header(USER_AGENT, "mgnrega worker dashboard")
            .send()
            .await
            .context("failed to complete request")?
            .error_for_status()
            .context("worker store refused to list workers")?
            .json()
            .await
            .context("failed to deserialize workers")
    }

    async fn create(&self, worker: NewWorker<'_>) -> Result<Worker, Error> {
        self.client
            .post(self.endpoint(&[]))
            .header(ACCEPT, "application/json")
            .header(USER_AGENT, "mgnrega worker dashboard")
            .json(&worker)
            .send()
            .await
            .context("failed to complete request")?
            .error_for_status()
            .context("worker store refused to create the worker")?
            .json()
            .await
            .context("failed to deserialize created worker")
    }

    async fn delete(&self, id: &str) -> Result<(), Error> {
        // The response body is ignored, only the status matters.
        self.client
            .delete(self.endpoint(&[id]))
            .header(USER_AGENT, "mgnrega worker dashboard")
            .send()
            .await
            .context("failed to complete request")?
            .error_for_status()
            .with_context(|| format!("worker store refused to delete worker {}", id))?;
        Ok(())
    }
}


/* -------------------------------------------------------------------------- */
/*                                    Tests                                   */
/* -------------------------------------------------------------------------- */
