use rocket::{
    delete,
    form::Form,
    get,
    http::Status,
    post, put,
    request::{FlashMessage, Request},
    response::{self, content::RawHtml, status::Created, Flash, Redirect, Responder},
    routes,
    serde::json::Json,
    FromForm, Route, State,
};
use reqwest::Url;
use serde_json::json;

use crate::controller::{DashboardErr, DashboardView, WorkerListController};
use crate::districts::{Chart, LABELS};
use crate::workers::{DraftWorker, Worker};

pub fn routes() -> Vec<Route> {
    routes![
        index,
        submit_worker,
        remove_worker,
        choose_district,
        view,
        update_draft,
        add_worker,
        delete_worker,
        select_district,
        chart,
    ]
}

/* -------------------------------------------------------------------------- */
/*                                    Page                                    */
/* -------------------------------------------------------------------------- */

#[derive(FromForm)]
pub struct DistrictChoice {
    district: String,
}

#[get("/")]
pub fn index(
    dashboard: &State<WorkerListController>,
    notice: Option<FlashMessage<'_>>,
) -> RawHtml<String> {
    RawHtml(render(&dashboard.view(), notice.as_ref().map(|n| n.message())))
}

#[post("/workers", data = "<draft>")]
pub async fn submit_worker(
    dashboard: &State<WorkerListController>,
    draft: Form<DraftWorker>,
) -> Result<Redirect, Flash<Redirect>> {
    dashboard
        .submit_draft(draft.into_inner())
        .await
        .map(|_| Redirect::to("/"))
        .map_err(|err| Flash::error(Redirect::to("/"), err.to_string()))
}

#[post("/workers/<id>/delete")]
pub async fn remove_worker(
    dashboard: &State<WorkerListController>,
    id: &str,
) -> Result<Redirect, Flash<Redirect>> {
    dashboard
        .delete_worker(id)
        .await
        .map(|_| Redirect::to("/"))
        .map_err(|err| Flash::error(Redirect::to("/"), err.to_string()))
}

#[post("/district", data = "<choice>")]
pub fn choose_district(
    dashboard: &State<WorkerListController>,
    choice: Form<DistrictChoice>,
) -> Result<Redirect, Flash<Redirect>> {
    dashboard
        .select_district(&choice.district)
        .map(|_| Redirect::to("/"))
        .map_err(|err| Flash::error(Redirect::to("/"), err.to_string()))
}

/* -------------------------------------------------------------------------- */
/*                                  JSON API                                  */
/* -------------------------------------------------------------------------- */

#[get("/api/dashboard")]
pub fn view(dashboard: &State<WorkerListController>) -> Json<DashboardView> {
    Json(dashboard.view())
}

#[put("/api/draft", data = "<draft>")]
pub fn update_draft(dashboard: &State<WorkerListController>, draft: Json<DraftWorker>) -> Status {
    dashboard.update_draft(draft.into_inner());
    Status::NoContent
}

/// Same as pressing "Add Worker" after typing `draft`.
#[post("/api/workers", data = "<draft>")]
pub async fn add_worker(
    dashboard: &State<WorkerListController>,
    draft: Json<DraftWorker>,
) -> Result<Created<Json<Worker>>, DashboardErr> {
    let worker = dashboard.submit_draft(draft.into_inner()).await?;
    Ok(Created::new(format!("/api/workers/{}", worker.id)).body(Json(worker)))
}

#[delete("/api/workers/<id>")]
pub async fn delete_worker(
    dashboard: &State<WorkerListController>,
    id: &str,
) -> Result<Status, DashboardErr> {
    dashboard.delete_worker(id).await?;
    Ok(Status::NoContent)
}

#[put("/api/district/<name>")]
pub fn select_district(
    dashboard: &State<WorkerListController>,
    name: &str,
) -> Result<Json<Chart>, DashboardErr> {
    Ok(Json(dashboard.select_district(name)?.chart()))
}

#[get("/api/chart")]
pub fn chart(dashboard: &State<WorkerListController>) -> Json<Chart> {
    Json(dashboard.chart())
}

impl<'r> Responder<'r, 'static> for DashboardErr {
    fn respond_to(self, request: &'r Request<'_>) -> response::Result<'static> {
        let status = match self {
            DashboardErr::ValidationFailed => Status::UnprocessableEntity,
            DashboardErr::UnknownDistrict(_) => Status::NotFound,
            DashboardErr::LoadFailed(_)
            | DashboardErr::CreateFailed(_)
            | DashboardErr::DeleteFailed(_) => Status::BadGateway,
        };
        (status, Json(json!({ "message": self.to_string() }))).respond_to(request)
    }
}

/* -------------------------------------------------------------------------- */
/*                                  Rendering                                 */
/* -------------------------------------------------------------------------- */

fn escape(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

/// Form target deleting `id`, sent as a single path segment.
fn delete_action(id: &str) -> String {
    Url::parse("http://dashboard/workers")
        .map(|mut url| {
            if let Ok(mut path) = url.path_segments_mut() {
                path.push(id).push("delete");
            }
            url.path().to_string()
        })
        .unwrap_or_default()
}

fn render_workers(view: &DashboardView) -> String {
    if let Some(status) = view.status {
        return format!("<p>{}</p>", status);
    }

    let rows: String = view
        .workers
        .iter()
        .map(|worker| {
            format!(
                r#"<tr><td>{}</td><td>{}</td><td><form method="post" action="{}"><button type="submit">Delete</button></form></td></tr>"#,
                escape(&worker.name),
                escape(&worker.village),
                escape(&delete_action(&worker.id)),
            )
        })
        .collect();

    format!(
        "<table><thead><tr><th>Name</th><th>Village</th><th>Action</th></tr></thead><tbody>{}</tbody></table>",
        rows
    )
}

fn render_chart(view: &DashboardView) -> String {
    let options: String = view
        .districts
        .iter()
        .map(|district| {
            let selected = if *district == view.district { " selected" } else { "" };
            format!(r#"<option value="{0}"{1}>{0}</option>"#, district, selected)
        })
        .collect();

    let values = view
        .chart
        .data
        .datasets
        .first()
        .map(|dataset| dataset.data)
        .unwrap_or_default();
    let bars: String = LABELS
        .iter()
        .zip(values)
        .map(|(label, value)| format!("<tr><td>{}</td><td>{}</td></tr>", label, value))
        .collect();

    // `</` never appears in the static chart payload.
    let payload = serde_json::to_string(&view.chart).unwrap_or_default();

    format!(
        r#"<h2>District Performance Overview</h2>
<form method="post" action="/district"><select name="district">{}</select><button type="submit">Show</button></form>
<table class="chart">{}</table>
<script type="application/json" id="chart-data">{}</script>"#,
        options, bars, payload
    )
}

/// The whole dashboard page; `notice` is the last failure to show the user.
pub fn render(view: &DashboardView, notice: Option<&str>) -> String {
    let notice = notice
        .map(|message| format!(r#"<p class="notice" role="alert">{}</p>"#, escape(message)))
        .unwrap_or_default();

    format!(
        r#"<!DOCTYPE html>
<html>
<head><meta charset="utf-8"><title>MGNREGA Worker Dashboard</title></head>
<body>
<header><h1>MGNREGA Worker Dashboard</h1><p>Empowering Rural India through Transparency and Simplicity</p></header>
{notice}
<form method="post" action="/workers">
<input type="text" name="name" placeholder="Enter worker name" value="{name}">
<input type="text" name="village" placeholder="Enter village name" value="{village}">
<button type="submit">Add Worker</button>
</form>
{workers}
{chart}
</body>
</html>
"#,
        notice = notice,
        name = escape(&view.draft.name),
        village = escape(&view.draft.village),
        workers = render_workers(view),
        chart = render_chart(view),
    )
}

/* -------------------------------------------------------------------------- */
/*                                    Tests                                   */
/* -------------------------------------------------------------------------- */
