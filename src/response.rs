//! Standard response envelope helpers.

use crate::model::Page;
use axum::{http::StatusCode, Json};
use serde::Serialize;

#[derive(Serialize)]
pub struct SuccessOne<T> {
    pub data: T,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub meta: Option<serde_json::Value>,
}

#[derive(Serialize)]
pub struct SuccessMany<T> {
    pub data: Vec<T>,
    pub meta: MetaCount,
}

#[derive(Serialize)]
pub struct MetaCount {
    pub count: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page_size: Option<u32>,
}

impl MetaCount {
    fn count(count: usize) -> Self {
        MetaCount {
            count: count as u64,
            total: None,
            page: None,
            page_size: None,
        }
    }
}

pub fn success_one<T: Serialize>(data: T) -> (StatusCode, Json<SuccessOne<T>>) {
    (
        StatusCode::CREATED,
        Json(SuccessOne {
            data,
            meta: None,
        }),
    )
}

pub fn success_one_ok<T: Serialize>(data: T) -> (StatusCode, Json<SuccessOne<T>>) {
    (
        StatusCode::OK,
        Json(SuccessOne {
            data,
            meta: None,
        }),
    )
}

pub fn success_many<T: Serialize>(data: Vec<T>) -> (StatusCode, Json<SuccessMany<T>>) {
    let meta = MetaCount::count(data.len());
    (StatusCode::OK, Json(SuccessMany { data, meta }))
}

/// One page of a listing; `meta` carries the total across pages.
pub fn success_page<T: Serialize>(page: Page<T>) -> (StatusCode, Json<SuccessMany<T>>) {
    let meta = MetaCount {
        total: Some(page.total),
        page: Some(page.page),
        page_size: Some(page.page_size),
        ..MetaCount::count(page.items.len())
    };
    (
        StatusCode::OK,
        Json(SuccessMany {
            data: page.items,
            meta,
        }),
    )
}
