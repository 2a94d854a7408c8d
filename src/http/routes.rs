//! Simulated education routes used to exercise the pipeline.
//!
//! Every handler accepts `?delay_ms=` to stand in for slow document-store
//! work. Nothing is persisted.

use std::time::Duration;

use axum::{
    body::{Body, Bytes},
    extract::{Path, Query},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use futures_util::stream;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

#[derive(Debug, Default, Deserialize)]
pub struct SimulatedWork {
    #[serde(default)]
    pub delay_ms: u64,
}

impl SimulatedWork {
    async fn run(&self) {
        if self.delay_ms > 0 {
            tokio::time::sleep(Duration::from_millis(self.delay_ms)).await;
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Announcement {
    #[serde(default)]
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub body: String,
}

#[derive(Debug, Deserialize)]
pub struct HomeworkUpdate {
    pub title: Option<String>,
    pub due: Option<String>,
}

pub fn router() -> Router {
    Router::new()
        .route("/api/announcements", get(list_announcements).post(create_announcement))
        .route("/api/homework/{id}", get(get_homework).put(update_homework))
        .route("/api/reports/export", get(export_report).post(export_report))
}

async fn list_announcements(Query(work): Query<SimulatedWork>) -> Json<Vec<Announcement>> {
    work.run().await;
    Json(vec![Announcement {
        id: "ann_1".into(),
        title: "Welcome back".into(),
        body: "Term starts on Monday.".into(),
    }])
}

async fn create_announcement(
    Query(work): Query<SimulatedWork>,
    Json(mut announcement): Json<Announcement>,
) -> impl IntoResponse {
    work.run().await;
    announcement.id = format!("ann_{}", &uuid::Uuid::new_v4().simple().to_string()[..8]);
    (StatusCode::CREATED, Json(announcement))
}

async fn get_homework(Path(id): Path<String>, Query(work): Query<SimulatedWork>) -> Json<Value> {
    work.run().await;
    Json(json!({ "id": id, "title": "Fractions worksheet", "due": "2026-10-20" }))
}

async fn update_homework(
    Path(id): Path<String>,
    Query(work): Query<SimulatedWork>,
    Json(update): Json<HomeworkUpdate>,
) -> Json<Value> {
    work.run().await;
    Json(json!({
        "id": id,
        "title": update.title.unwrap_or_else(|| "Fractions worksheet".into()),
        "due": update.due,
        "updated": true,
    }))
}

/// Chunked CSV export; each row takes `delay_ms`. POST runs it as a job.
async fn export_report(Query(work): Query<SimulatedWork>) -> Response {
    let delay = Duration::from_millis(work.delay_ms);
    let rows = stream::unfold(0u32, move |row| async move {
        if row >= 5 {
            return None;
        }
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        let line = Bytes::from(format!("student_{row},{}\n", 60 + row * 7));
        Some((Ok::<_, std::io::Error>(line), row + 1))
    });

    Response::builder()
        .header(header::CONTENT_TYPE, "text/csv")
        .body(Body::from_stream(rows))
        .unwrap_or_else(|_| StatusCode::INTERNAL_SERVER_ERROR.into_response())
}
