//! The behavior simulating endpoints.

use std::{collections::BTreeMap, convert::Infallible};

use rama::http::{
    Body, Response, StatusCode,
    headers::{self, ContentLength, HeaderMapExt as _},
    service::web::response::{Headers, IntoResponse, Json},
};
use serde::Serialize;

use crate::{
    http::{response, routes::RouteContext},
    size::{ParseSizeError, parse_size},
};

pub fn index(_: &RouteContext<'_>) -> Response {
    response::plain_text(StatusCode::OK, "ok")
}

#[derive(Debug, Serialize)]
struct HealthStatus {
    status: &'static str,
}

pub fn health(_: &RouteContext<'_>) -> Response {
    Json(HealthStatus { status: "ok" }).into_response()
}

/// Respond with a body of the requested size (`s`), bounded by the configured maximum.
pub fn data(ctx: &RouteContext<'_>) -> Response {
    let size = match parse_data_size(ctx.exchange.params().size().unwrap_or_default()) {
        Ok(size) => size,
        Err(err) => return response::bad_request(err.to_string()),
    };

    if size > ctx.config.max_response_size {
        return response::bad_request("size exceeds maximum");
    }

    let mut resp = (
        StatusCode::OK,
        Headers::single(headers::ContentType::octet_stream()),
        zero_body(size),
    )
        .into_response();
    resp.headers_mut().typed_insert(ContentLength(size));
    resp
}

const ZERO_CHUNK_SIZE: usize = 64 * 1024;

static ZEROS: [u8; ZERO_CHUNK_SIZE] = [0; ZERO_CHUNK_SIZE];

/// A body of `size` zero bytes, streamed in slices of one shared zero chunk.
fn zero_body(size: u64) -> Body {
    let mut remaining = size;
    let chunks = std::iter::from_fn(move || {
        let n = remaining.min(ZERO_CHUNK_SIZE as u64) as usize;
        remaining -= n as u64;
        (n > 0).then(|| Ok::<_, Infallible>(&ZEROS[..n]))
    });
    Body::from_stream(futures::stream::iter(chunks))
}

/// Zero is the same amount in every unit, so a bare zero is accepted as well.
fn parse_data_size(input: &str) -> Result<u64, ParseSizeError> {
    match parse_size(input) {
        Err(ParseSizeError::InvalidFormat(_)) if input.trim().parse::<f64>() == Ok(0.) => Ok(0),
        result => result,
    }
}

/// Respond with the status code found in the path, if it is an error status.
pub fn error(ctx: &RouteContext<'_>) -> Response {
    match ctx
        .segment
        .and_then(|s| s.parse::<u16>().ok())
        .filter(|code| (400..600).contains(code))
        .and_then(|code| StatusCode::from_u16(code).ok())
    {
        Some(status) => response::status_text(status),
        None => response::status_text(StatusCode::BAD_REQUEST),
    }
}

/// Echo all request headers as a JSON object of canonical name to values.
pub fn headers(ctx: &RouteContext<'_>) -> Response {
    let mut echo: BTreeMap<String, Vec<String>> = BTreeMap::new();
    for (name, value) in ctx.exchange.headers() {
        echo.entry(canonical_header_name(name.as_str()))
            .or_default()
            .push(String::from_utf8_lossy(value.as_bytes()).into_owned());
    }
    Json(echo).into_response()
}

/// `x-forwarded-for` becomes `X-Forwarded-For`.
fn canonical_header_name(name: &str) -> String {
    let mut upper = true;
    name.chars()
        .map(|c| {
            let c = if upper {
                c.to_ascii_uppercase()
            } else {
                c.to_ascii_lowercase()
            };
            upper = c == '-';
            c
        })
        .collect()
}
