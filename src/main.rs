#[macro_use]
extern crate rocket;

mod controller;
mod dashboard;
mod districts;
mod workers;

use log::{error, info};
use rocket::fairing::AdHoc;
use rocket::{Build, Rocket};
use serde::Deserialize;

use crate::controller::WorkerListController;
use crate::workers::HttpWorkerStore;

const DEFAULT_BACKEND_URL: &str = "https://mgnrega-backend-raqv.onrender.com";

/// Read from `Rocket.toml` or `ROCKET_BACKEND_URL`.
#[derive(Deserialize, Debug, PartialEq)]
struct DashboardConfig {
    #[serde(default = "default_backend_url")]
    backend_url: String,
}

fn default_backend_url() -> String {
    DEFAULT_BACKEND_URL.to_string()
}

async fn connect_store(rocket: Rocket<Build>) -> Result<Rocket<Build>, Rocket<Build>> {
    let config = match rocket.figment().extract::<DashboardConfig>() {
        Ok(config) => config,
        Err(err) => {
            error!("Invalid dashboard configuration: {}", err);
            return Err(rocket);
        }
    };

    match HttpWorkerStore::new(&config.backend_url) {
        Ok(store) => {
            info!("Worker store at {}", config.backend_url);
            Ok(rocket.manage(WorkerListController::new(store)))
        }
        Err(err) => {
            error!("Cannot reach the worker store: {:#}", err);
            Err(rocket)
        }
    }
}

/// Mounts the dashboard and loads the workers once the server is up.
fn mount_dashboard(rocket: Rocket<Build>) -> Rocket<Build> {
    rocket
        .mount("/", dashboard::routes())
        .attach(AdHoc::on_liftoff("Worker list load", |rocket| {
            Box::pin(async move {
                if let Some(controller) = rocket.state::<WorkerListController>() {
                    let controller = controller.clone();
                    rocket::tokio::spawn(async move { controller.load().await });
                }
            })
        }))
}

#[launch]
fn rocket() -> _ {
    mount_dashboard(rocket::build()).attach(AdHoc::try_on_ignite("Worker store", connect_store))
}

/* -------------------------------------------------------------------------- */
/*                                    Tests                                   */
/* -------------------------------------------------------------------------- */
