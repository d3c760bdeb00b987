//! JSON envelopes for the table API: rows under `data`, table facts under `meta`.

use crate::mapper::Record;
use axum::Json;
use serde::Serialize;

#[derive(Serialize)]
pub struct RowBody {
    pub data: Record,
    pub meta: RowMeta,
}

#[derive(Serialize)]
pub struct RowMeta {
    pub table: String,
}

#[derive(Serialize)]
pub struct RowsBody {
    pub data: Vec<Record>,
    pub meta: ListMeta,
}

#[derive(Serialize)]
pub struct ListMeta {
    pub table: String,
    pub count: usize,
    pub limit: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub offset: Option<u32>,
}

pub fn row(table: &str, data: Record) -> Json<RowBody> {
    Json(RowBody {
        data,
        meta: RowMeta { table: table.to_string() },
    })
}

/// A page of rows; `count` is the size of this page, not of the table.
pub fn rows(table: &str, data: Vec<Record>, limit: u32, offset: Option<u32>) -> Json<RowsBody> {
    let count = data.len();
    Json(RowsBody {
        data,
        meta: ListMeta {
            table: table.to_string(),
            count,
            limit,
            offset,
        },
    })
}
