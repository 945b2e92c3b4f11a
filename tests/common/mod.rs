//! Shared test utilities and fixtures
//!
//! A mock reqres-style API: `GET /users`, avatar images under `/img/faces`,
//! and `POST /login`.

#![allow(dead_code)]

use std::io::Cursor;
use std::time::Duration;

use staffdir_providers::{HttpClient, HttpSettings};
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

pub const VALID_EMAIL: &str = "eve.holt@reqres.in";
pub const VALID_PASSWORD: &str = "cityslicka";
pub const TOKEN: &str = "QpwL5tke4Pnpja7X4";

/// Settings pointing at the mock server; plain HTTP is allowed.
pub fn settings_for(server: &MockServer) -> HttpSettings {
    let mut settings = HttpSettings::new(&server.uri()).expect("mock uri is a valid base");
    settings.allow_insecure_http = true;
    settings
}

pub fn client_for(server: &MockServer) -> HttpClient {
    HttpClient::new(settings_for(server)).expect("client builds")
}

pub fn avatar_path(id: i64) -> String {
    format!("/img/faces/{id}-image.png")
}

/// A `width` x `height` PNG.
pub fn png_bytes(width: u32, height: u32) -> Vec<u8> {
    let image = image::RgbaImage::from_pixel(width, height, image::Rgba([10, 20, 30, 255]));
    let mut out = Cursor::new(Vec::new());
    image
        .write_to(&mut out, image::ImageFormat::Png)
        .expect("encode png");
    out.into_inner()
}

fn user(server: &MockServer, id: i64, first: &str, last: &str) -> serde_json::Value {
    serde_json::json!({
        "id": id,
        "email": format!("{}.{}@reqres.in", first.to_lowercase(), last.to_lowercase()),
        "first_name": first,
        "last_name": last,
        "avatar": format!("{}{}", server.uri(), avatar_path(id)),
    })
}

/// Mount `GET /users?page=1` listing George (1), Janet (2) and Emma (3).
pub async fn mount_users(server: &MockServer) {
    let body = serde_json::json!({
        "page": 1,
        "per_page": 6,
        "total": 3,
        "total_pages": 1,
        "data": [
            user(server, 1, "George", "Bluth"),
            user(server, 2, "Janet", "Weaver"),
            user(server, 3, "Emma", "Wong"),
        ]
    });
    Mock::given(method("GET"))
        .and(path("/users"))
        .and(query_param("page", "1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .expect(1)
        .mount(server)
        .await;
}

pub async fn mount_empty_users(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/users"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"data": []})))
        .mount(server)
        .await;
}

pub async fn mount_users_status(server: &MockServer, status: u16) {
    Mock::given(method("GET"))
        .and(path("/users"))
        .respond_with(ResponseTemplate::new(status))
        .mount(server)
        .await;
}

pub async fn mount_avatar(server: &MockServer, id: i64, width: u32, height: u32) {
    Mock::given(method("GET"))
        .and(path(avatar_path(id)))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("content-type", "image/png")
                .set_body_bytes(png_bytes(width, height)),
        )
        .mount(server)
        .await;
}

/// Like [`mount_avatar`], answering only after `delay`.
pub async fn mount_slow_avatar(
    server: &MockServer,
    id: i64,
    width: u32,
    height: u32,
    delay: Duration,
) {
    Mock::given(method("GET"))
        .and(path(avatar_path(id)))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("content-type", "image/png")
                .set_body_bytes(png_bytes(width, height))
                .set_delay(delay),
        )
        .mount(server)
        .await;
}

/// An avatar whose bytes are not an image.
pub async fn mount_corrupt_avatar(server: &MockServer, id: i64) {
    Mock::given(method("GET"))
        .and(path(avatar_path(id)))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(b"\x89PNG garbage".to_vec()))
        .mount(server)
        .await;
}

pub async fn mount_login_ok(server: &MockServer) {
    Mock::given(method("POST"))
        .and(path("/login"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"token": TOKEN})))
        .mount(server)
        .await;
}

pub async fn mount_login_error(server: &MockServer, message: &str) {
    Mock::given(method("POST"))
        .and(path("/login"))
        .respond_with(
            ResponseTemplate::new(400).set_body_json(serde_json::json!({"error": message})),
        )
        .mount(server)
        .await;
}
