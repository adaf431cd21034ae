//! The public secrets page and secret overwrites.

mod common;

use axum::http::StatusCode;
use common::{assert_redirect, body_text, TestApp};

#[tokio::test]
async fn secrets_page_is_public_and_lists_only_present_secrets() {
    let app = TestApp::new();

    let mut alice = app.browser();
    alice.post_form("/register", "username=alice&password=pw1").await;
    alice.post_form("/submit", "secret=alice+was+here").await;

    // Bob registers but never submits.
    let mut bob = app.browser();
    bob.post_form("/register", "username=bob&password=pw2").await;

    let mut visitor = app.browser();
    let response = visitor.get("/secrets").await;
    assert_eq!(response.status(), StatusCode::OK);
    let page = body_text(response).await;
    assert!(page.contains("<li>alice was here</li>"));
    assert_eq!(page.matches("<li>").count(), 1);
    assert!(!page.contains("bob"));
}

#[tokio::test]
async fn resubmitting_overwrites_the_secret() {
    let app = TestApp::new();
    let mut browser = app.browser();
    browser.post_form("/register", "username=alice&password=pw1").await;

    assert_redirect(&browser.post_form("/submit", "secret=first").await, "/secrets");
    assert_redirect(&browser.post_form("/submit", "secret=second").await, "/secrets");

    let page = body_text(browser.get("/secrets").await).await;
    assert!(!page.contains("first"));
    assert_eq!(page.matches("<li>second</li>").count(), 1);
}

#[tokio::test]
async fn submit_without_field_returns_to_form() {
    let app = TestApp::new();
    let mut browser = app.browser();
    browser.post_form("/register", "username=alice&password=pw1").await;

    assert_redirect(&browser.post_form("/submit", "").await, "/submit");
    let page = body_text(browser.get("/secrets").await).await;
    assert_eq!(page.matches("<li>").count(), 0);
}

#[tokio::test]
async fn secrets_are_escaped() {
    let app = TestApp::new();
    let mut browser = app.browser();
    browser.post_form("/register", "username=alice&password=pw1").await;
    browser
        .post_form("/submit", "secret=%3Cb%3Ebold%3C%2Fb%3E")
        .await;

    let page = body_text(browser.get("/secrets").await).await;
    assert!(page.contains("&lt;b&gt;bold&lt;/b&gt;"));
}

#[tokio::test]
async fn unreadable_submission_returns_to_form() {
    let app = TestApp::new();
    let mut browser = app.browser();
    browser.post_form("/register", "username=alice&password=pw1").await;

    let response = browser
        .post_raw("/submit", Some("text/plain"), "secret=hidden")
        .await;
    assert_redirect(&response, "/submit");

    let page = body_text(browser.get("/secrets").await).await;
    assert!(!page.contains("hidden"));
}
