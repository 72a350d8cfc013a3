//! HTTP response helpers.

use anyhow::Result;
use tiny_http::{Header, Method, Request, Response, StatusCode};

use crate::utils::mime::types::{HTML, PLAIN};

pub fn is_head_request(request: &Request) -> bool {
    request.method() == &Method::Head
}

/// GET and HEAD are the only methods pages and assets answer.
pub fn is_read_request(request: &Request) -> bool {
    matches!(request.method(), Method::Get | Method::Head)
}

pub fn send_body(
    request: Request,
    status: u16,
    content_type: &'static str,
    body: Vec<u8>,
) -> Result<()> {
    if is_head_request(&request) {
        return send_head(request, status, content_type);
    }
    let response = Response::from_data(body)
        .with_status_code(StatusCode(status))
        .with_header(make_header("Content-Type", content_type))
        .with_header(make_header("Cache-Control", "no-cache"));
    request.respond(response)?;
    Ok(())
}

fn send_head(request: Request, status: u16, content_type: &'static str) -> Result<()> {
    let response = Response::empty(StatusCode(status))
        .with_header(make_header("Content-Type", content_type));
    request.respond(response)?;
    Ok(())
}

pub fn send_html(request: Request, body: String) -> Result<()> {
    send_body(request, 200, HTML, body.into_bytes())
}

pub fn respond_not_found(request: Request) -> Result<()> {
    send_body(request, 404, PLAIN, b"404 Not Found".to_vec())
}

pub fn respond_bad_request(request: Request, reason: &str) -> Result<()> {
    send_body(request, 400, PLAIN, format!("400 Bad Request: {reason}").into_bytes())
}

pub fn respond_method_not_allowed(request: Request, allow: &'static str) -> Result<()> {
    let response = Response::from_string("405 Method Not Allowed")
        .with_status_code(StatusCode(405))
        .with_header(make_header("Content-Type", PLAIN))
        .with_header(make_header("Allow", allow));
    request.respond(response)?;
    Ok(())
}

/// Respond with 503 Service Unavailable (server shutting down).
pub fn respond_unavailable(request: Request) -> Result<()> {
    send_body(request, 503, PLAIN, b"503 Service Unavailable".to_vec())
}

pub fn respond_internal_error(request: Request) -> Result<()> {
    send_body(request, 500, PLAIN, b"500 Internal Server Error".to_vec())
}

fn make_header(key: &'static str, value: &'static str) -> Header {
    Header::from_bytes(key, value).expect("static header is valid ASCII")
}
