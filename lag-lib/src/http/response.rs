use rama::http::{
    HeaderValue, Response, StatusCode,
    header::ALLOW,
    headers,
    service::web::response::{Headers, IntoResponse},
};

pub fn plain_text(status: StatusCode, body: impl Into<String>) -> Response {
    (
        status,
        Headers::single(headers::ContentType::text_utf8()),
        body.into(),
    )
        .into_response()
}

pub fn bad_request(message: impl Into<String>) -> Response {
    plain_text(StatusCode::BAD_REQUEST, message)
}

/// Respond with the status and its canonical reason phrase as body.
pub fn status_text(status: StatusCode) -> Response {
    plain_text(status, status.canonical_reason().unwrap_or_default())
}

pub fn not_found() -> Response {
    status_text(StatusCode::NOT_FOUND)
}

pub fn method_not_allowed(allow: &'static str) -> Response {
    let mut resp = status_text(StatusCode::METHOD_NOT_ALLOWED);
    resp.headers_mut()
        .insert(ALLOW, HeaderValue::from_static(allow));
    resp
}
