// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Result, anyhow};
use orderdesk_app::{
    LookupRequest, ProductId, RawPrice, RowId, Transport, TransportError, UpdateRequest,
};
use orderdesk_http::Client;
use std::thread;
use std::time::Duration;
use tiny_http::{Header, Method, Response, Server};

fn json_header() -> Header {
    Header::from_bytes("Content-Type", "application/json").expect("valid content type header")
}

fn shipped(row: i64) -> UpdateRequest {
    UpdateRequest {
        row: RowId::new(row),
        field: "status".to_owned(),
        value: "shipped".to_owned(),
        token: "csrf-abc".to_owned(),
    }
}

#[test]
fn unreachable_server_is_a_transport_error() -> Result<()> {
    let client = Client::new("http://127.0.0.1:1/admin", Duration::from_millis(50))?;

    let error = client
        .send_update(&shipped(1))
        .expect_err("update should fail for unreachable endpoint");
    assert!(matches!(error, TransportError::Unreachable { .. }));
    assert!(error.to_string().contains("127.0.0.1:1"));
    Ok(())
}

#[test]
fn update_posts_json_body_with_token_header() -> Result<()> {
    let server =
        Server::http("127.0.0.1:0").map_err(|error| anyhow!("start mock server: {error}"))?;
    let addr = format!("http://{}/admin/orders/order", server.server_addr());

    let handle = thread::spawn(move || {
        let mut request = server.recv().expect("request expected");
        assert_eq!(request.method(), &Method::Post);
        assert_eq!(request.url(), "/admin/orders/order/ajax/update-status/");
        let token = request
            .headers()
            .iter()
            .find(|header| header.field.equiv("X-CSRFToken"))
            .map(|header| header.value.as_str().to_owned());
        assert_eq!(token.as_deref(), Some("csrf-abc"));

        let mut body = String::new();
        request
            .as_reader()
            .read_to_string(&mut body)
            .expect("request body");
        let body: serde_json::Value = serde_json::from_str(&body).expect("json body");
        assert_eq!(body, serde_json::json!({"id": 42, "status": "shipped"}));

        let response = Response::from_string(r#"{"success":true,"message":"Updated"}"#)
            .with_status_code(200)
            .with_header(json_header());
        request.respond(response).expect("response should succeed");
    });

    let client = Client::new(&addr, Duration::from_secs(1))?;
    let reply = client.send_update(&shipped(42))?;
    assert!(reply.success);
    assert_eq!(reply.message.as_deref(), Some("Updated"));

    handle.join().expect("server thread should join");
    Ok(())
}

#[test]
fn error_status_with_reply_body_is_a_logical_rejection() -> Result<()> {
    let server =
        Server::http("127.0.0.1:0").map_err(|error| anyhow!("start mock server: {error}"))?;
    let addr = format!("http://{}/", server.server_addr());

    let handle = thread::spawn(move || {
        let request = server.recv().expect("request expected");
        let response = Response::from_string(r#"{"success":false,"error":"Invalid status"}"#)
            .with_status_code(400)
            .with_header(json_header());
        request.respond(response).expect("response should succeed");
    });

    let client = Client::new(&addr, Duration::from_secs(1))?;
    let reply = client.send_update(&shipped(7))?;
    assert!(!reply.success);
    assert_eq!(reply.error.as_deref(), Some("Invalid status"));

    handle.join().expect("server thread should join");
    Ok(())
}

#[test]
fn html_error_page_is_a_status_error() -> Result<()> {
    let server =
        Server::http("127.0.0.1:0").map_err(|error| anyhow!("start mock server: {error}"))?;
    let addr = format!("http://{}/", server.server_addr());

    let handle = thread::spawn(move || {
        let request = server.recv().expect("request expected");
        let response = Response::from_string("<html><body>Server Error</body></html>")
            .with_status_code(500);
        request.respond(response).expect("response should succeed");
    });

    let client = Client::new(&addr, Duration::from_secs(1))?;
    let error = client
        .send_update(&shipped(7))
        .expect_err("500 without reply body must fail");
    assert_eq!(
        error,
        TransportError::Status {
            status: 500,
            body: String::new()
        }
    );

    handle.join().expect("server thread should join");
    Ok(())
}

#[test]
fn success_status_with_garbage_body_is_a_decode_error() -> Result<()> {
    let server =
        Server::http("127.0.0.1:0").map_err(|error| anyhow!("start mock server: {error}"))?;
    let addr = format!("http://{}/", server.server_addr());

    let handle = thread::spawn(move || {
        let request = server.recv().expect("request expected");
        let response = Response::from_string("ok").with_status_code(200);
        request.respond(response).expect("response should succeed");
    });

    let client = Client::new(&addr, Duration::from_secs(1))?;
    let error = client
        .send_update(&shipped(7))
        .expect_err("non-json body must fail");
    assert!(matches!(error, TransportError::Decode { .. }));

    handle.join().expect("server thread should join");
    Ok(())
}

#[test]
fn lookup_sends_product_as_query_parameter() -> Result<()> {
    let server =
        Server::http("127.0.0.1:0").map_err(|error| anyhow!("start mock server: {error}"))?;
    let addr = format!("http://{}/admin", server.server_addr());

    let handle = thread::spawn(move || {
        let request = server.recv().expect("request expected");
        assert_eq!(request.method(), &Method::Get);
        assert_eq!(request.url(), "/admin/ajax/price/?pid=31");
        let response = Response::from_string(r#"{"price":"123,45"}"#)
            .with_status_code(200)
            .with_header(json_header());
        request.respond(response).expect("response should succeed");
    });

    let client = Client::with_paths(
        &addr,
        Duration::from_secs(1),
        "ajax/update-status/",
        "/ajax/price/",
        "pid",
    )?;
    let reply = client.lookup_price(&LookupRequest {
        product: ProductId::new(31),
    })?;
    assert_eq!(reply.price, Some(RawPrice::Text("123,45".to_owned())));

    handle.join().expect("server thread should join");
    Ok(())
}

#[test]
fn lookup_not_found_is_a_status_error() -> Result<()> {
    let server =
        Server::http("127.0.0.1:0").map_err(|error| anyhow!("start mock server: {error}"))?;
    let addr = format!("http://{}/", server.server_addr());

    let handle = thread::spawn(move || {
        let request = server.recv().expect("request expected");
        let response = Response::from_string(r#"{"error":"Product not found"}"#)
            .with_status_code(404)
            .with_header(json_header());
        request.respond(response).expect("response should succeed");
    });

    let client = Client::new(&addr, Duration::from_secs(1))?;
    let error = client
        .lookup_price(&LookupRequest {
            product: ProductId::new(999),
        })
        .expect_err("404 lookup must fail");
    assert!(matches!(error, TransportError::Status { status: 404, .. }));

    handle.join().expect("server thread should join");
    Ok(())
}

#[test]
fn visit_follows_the_job_link_under_the_change_list() -> Result<()> {
    let server =
        Server::http("127.0.0.1:0").map_err(|error| anyhow!("start mock server: {error}"))?;
    let addr = format!("http://{}/admin/orders/order/", server.server_addr());

    let handle = thread::spawn(move || {
        let request = server.recv().expect("request expected");
        assert_eq!(request.method(), &Method::Get);
        assert_eq!(request.url(), "/admin/orders/order/run-fix-orders/?val=20");
        let response = Response::from_string("<html>started</html>");
        request.respond(response).expect("response should succeed");
    });

    let client = Client::new(&addr, Duration::from_secs(1))?;
    client.visit("run-fix-orders/?val=20")?;

    handle.join().expect("server thread should join");
    Ok(())
}

#[test]
fn refused_job_link_is_a_status_error() -> Result<()> {
    let server =
        Server::http("127.0.0.1:0").map_err(|error| anyhow!("start mock server: {error}"))?;
    let addr = format!("http://{}/", server.server_addr());

    let handle = thread::spawn(move || {
        let request = server.recv().expect("request expected");
        let response = Response::from_string("Forbidden").with_status_code(403);
        request.respond(response).expect("response should succeed");
    });

    let client = Client::new(&addr, Duration::from_secs(1))?;
    let error = client
        .visit("run-fix-skus/?val=1")
        .expect_err("403 must fail");
    let expected = TransportError::Status {
        status: 403,
        body: "Forbidden".to_owned(),
    };
    assert_eq!(error, expected);

    handle.join().expect("server thread should join");
    Ok(())
}

#[test]
fn unreachable_job_link_is_a_transport_error() -> Result<()> {
    let client = Client::new("http://127.0.0.1:1/admin", Duration::from_millis(50))?;
    let error = client
        .visit("run-fix-orders/?val=1")
        .expect_err("visit should fail for unreachable endpoint");
    assert!(matches!(error, TransportError::Unreachable { .. }));
    Ok(())
}
