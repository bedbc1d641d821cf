use std::convert::Infallible;

use actix_web::web::Bytes;
use actix_web::{web, HttpResponse};
use serde::Deserialize;
use tokio_stream::wrappers::errors::BroadcastStreamRecvError;
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::StreamExt;

use crate::application::Caller;
use crate::errors::AppError;
use crate::relay::{ChangeEvent, Table};
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct ChangesParams {
    pub table: String,
}

fn frame(event: &ChangeEvent) -> Option<Bytes> {
    let data = serde_json::to_string(event).ok()?;
    Some(Bytes::from(format!("event: change\ndata: {data}\n\n")))
}

/// GET /changes?table=orders
///
/// Server-sent events carrying every committed change to one table. Clients
/// that fall behind get a `lagged` event and should refetch.
#[utoipa::path(
    get,
    path = "/changes",
    params(
        ("table" = String, Query, description = "orders, products, users, delivery_partners or malicious_activities"),
    ),
    responses(
        (status = 200, description = "text/event-stream of change events"),
        (status = 400, description = "Unknown table"),
        (status = 401, description = "Missing caller identity"),
    ),
    tag = "changes"
)]
pub async fn subscribe(
    state: web::Data<AppState>,
    _caller: Caller,
    query: web::Query<ChangesParams>,
) -> Result<HttpResponse, AppError> {
    let table: Table = query.table.parse()?;
    log::debug!("change feed opened for {}", table);

    let stream = BroadcastStream::new(state.relay.subscribe_all()).filter_map(move |msg| {
        let bytes = match msg {
            Ok(event) if event.table == table => frame(&event)?,
            Ok(_) => return None,
            Err(BroadcastStreamRecvError::Lagged(n)) => {
                Bytes::from(format!("event: lagged\ndata: {n}\n\n"))
            }
        };
        Some(Ok::<Bytes, Infallible>(bytes))
    });

    Ok(HttpResponse::Ok()
        .content_type("text/event-stream")
        .insert_header(("Cache-Control", "no-cache"))
        .streaming(stream))
}
