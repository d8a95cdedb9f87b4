use axum::Json;
use serde::Serialize;

/// Success envelope: `{"ok": true, "data": ...}`. The failure counterpart
/// lives in `error.rs`.
#[derive(Debug, Serialize)]
pub struct Envelope<T> {
    pub ok: bool,
    pub data: T,
}

pub fn ok<T: Serialize>(data: T) -> Json<Envelope<T>> {
    Json(Envelope { ok: true, data })
}
