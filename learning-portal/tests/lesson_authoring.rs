mod common;

use axum::http::StatusCode;
use common::{app, assert_redirect, body_text, location, router, Browser, MockLms};
use learning_portal::models::user::Role;
use std::sync::Arc;
use std::time::Duration;

const LESSONS: &str = "/admin/courses/5/lessons";

async fn admin(mock: MockLms) -> (Browser, Arc<MockLms>) {
    let api = Arc::new(mock);
    let mut browser = Browser::new(router(api.clone()));
    browser.login("root@example.com").await;
    (browser, api)
}

fn seeded() -> MockLms {
    MockLms::with_role(Role::Admin).with_lessons(&[
        (11, "Ownership", "Moves and borrows", 2),
        (12, "Intro to traits", "Shared behaviour", 3),
        (13, "Getting started", "Install the toolchain", 1),
    ])
}

async fn open_dialog(browser: &mut Browser) -> String {
    let response = browser.post_form(&format!("{LESSONS}/wizard"), "").await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    let path = location(&response);
    assert!(path.starts_with("/admin/courses/5/lessons/wizard/"));
    path
}

#[tokio::test]
async fn lesson_list_searches_and_sorts_by_order() {
    let (mut browser, _) = admin(seeded()).await;

    let body = body_text(browser.get(LESSONS).await).await;
    let first = body.find("Getting started").unwrap();
    let second = body.find("Ownership").unwrap();
    let third = body.find("Intro to traits").unwrap();
    assert!(first < second && second < third);

    let body = body_text(browser.get(&format!("{LESSONS}?sort=desc")).await).await;
    assert!(body.find("Intro to traits").unwrap() < body.find("Getting started").unwrap());

    let body = body_text(browser.get(&format!("{LESSONS}?search=TRAIT")).await).await;
    assert!(body.contains("Intro to traits"));
    assert!(!body.contains("Ownership"));
}

#[tokio::test]
async fn deleting_a_lesson_returns_to_the_list() {
    let (mut browser, api) = admin(seeded()).await;

    let confirm = browser.get(&format!("{LESSONS}/11/delete")).await;
    assert_eq!(confirm.status(), StatusCode::OK);
    assert!(body_text(confirm).await.contains("Ownership"));

    let response = browser.post_form(&format!("{LESSONS}/11/delete"), "").await;
    assert_redirect(&response, LESSONS);
    assert_eq!(api.removed.lock().unwrap().as_slice(), [11]);
}

#[tokio::test]
async fn failed_delete_is_reported_in_place() {
    let mock = seeded();
    *mock.fail_remove.lock().unwrap() = true;
    let (mut browser, _) = admin(mock).await;

    let response = browser.post_form(&format!("{LESSONS}/11/delete"), "").await;
    assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    assert!(body_text(response)
        .await
        .contains("Failed to delete lesson. Please try again."));
}

#[tokio::test]
async fn wizard_creates_a_lesson_with_one_resource_batch() {
    let (mut browser, api) = admin(seeded()).await;
    let dialog = open_dialog(&mut browser).await;

    let page = body_text(browser.get(&dialog).await).await;
    assert!(page.contains("Step 1 of 3"));

    let response = browser
        .post_form(
            &format!("{dialog}/details"),
            "title=Intro&description=Basics&order=1&action=next",
        )
        .await;
    assert_redirect(&response, &dialog);
    assert!(body_text(browser.get(&dialog).await).await.contains("Step 2 of 3"));

    browser
        .post_multipart(&format!("{dialog}/resources"), &[("action", "add")], &[])
        .await;
    let response = browser
        .post_multipart(
            &format!("{dialog}/resources"),
            &[("title_0", "Slides"), ("action", "next")],
            &[("file_0", "slides.pdf", vec![0u8; 200 * 1024])],
        )
        .await;
    assert_redirect(&response, &dialog);

    let review = body_text(browser.get(&dialog).await).await;
    assert!(review.contains("Step 3 of 3"));
    assert!(review.contains("slides.pdf"));

    assert_redirect(&browser.post_form(&format!("{dialog}/submit"), "").await, &dialog);

    let created = api.created.lock().unwrap().clone();
    assert_eq!(created.len(), 1);
    assert_eq!(created[0].title, "Intro");
    assert_eq!(created[0].description, "Basics");
    assert_eq!(created[0].order, 1);
    assert_eq!(created[0].course, 5);

    let uploads = api.uploads.lock().unwrap().clone();
    assert_eq!(uploads.len(), 1);
    assert_eq!(uploads[0].0, 101);
    assert_eq!(
        uploads[0].1,
        vec![("Slides".to_string(), "slides.pdf".to_string(), 200 * 1024)]
    );

    // the dialog stays open, emptied, on the first step
    let page = body_text(browser.get(&dialog).await).await;
    assert!(page.contains("Step 1 of 3"));
    assert!(!page.contains("slides.pdf"));
}

#[tokio::test]
async fn incomplete_details_keep_the_dialog_on_step_one() {
    let (mut browser, api) = admin(seeded()).await;
    let dialog = open_dialog(&mut browser).await;

    browser
        .post_form(
            &format!("{dialog}/details"),
            "title=&description=Basics&order=0&action=next",
        )
        .await;

    let page = body_text(browser.get(&dialog).await).await;
    assert!(page.contains("Step 1 of 3"));
    assert!(page.contains("Title is required"));

    // submit outside review is ignored
    browser.post_form(&format!("{dialog}/submit"), "").await;
    assert!(api.created.lock().unwrap().is_empty());
}

#[tokio::test]
async fn details_cannot_be_blanked_once_in_review() {
    let (mut browser, api) = admin(seeded()).await;
    let dialog = open_dialog(&mut browser).await;

    browser
        .post_form(
            &format!("{dialog}/details"),
            "title=Intro&description=Basics&order=2&action=next",
        )
        .await;
    browser
        .post_multipart(&format!("{dialog}/resources"), &[("action", "next")], &[])
        .await;
    assert!(body_text(browser.get(&dialog).await).await.contains("Step 3 of 3"));

    let response = browser
        .post_form(&format!("{dialog}/details"), "title=&description=&order=3")
        .await;
    assert_redirect(&response, &dialog);

    let review = body_text(browser.get(&dialog).await).await;
    assert!(review.contains("Step 3 of 3"));
    assert!(review.contains("Intro"));

    browser.post_form(&format!("{dialog}/submit"), "").await;
    let created = api.created.lock().unwrap().clone();
    assert_eq!(created.len(), 1);
    assert_eq!(created[0].title, "Intro");
    assert_eq!(created[0].description, "Basics");
    assert_eq!(created[0].order, 2);
}

#[tokio::test]
async fn failed_create_keeps_the_draft_for_retry() {
    let mock = seeded();
    *mock.fail_create.lock().unwrap() = true;
    let (mut browser, api) = admin(mock).await;
    let dialog = open_dialog(&mut browser).await;

    browser
        .post_form(
            &format!("{dialog}/details"),
            "title=Intro&description=Basics&order=4&action=next",
        )
        .await;
    browser
        .post_multipart(&format!("{dialog}/resources"), &[("action", "next")], &[])
        .await;
    browser.post_form(&format!("{dialog}/submit"), "").await;

    assert_eq!(api.created.lock().unwrap().len(), 1);
    assert!(api.uploads.lock().unwrap().is_empty());

    let page = body_text(browser.get(&dialog).await).await;
    assert!(page.contains("Failed to add lesson. Please try again."));
    assert!(page.contains("Step 3 of 3"));
}

#[tokio::test]
async fn drafts_are_private_to_their_author() {
    let api = Arc::new(seeded());
    let app = router(api.clone());

    let mut author = Browser::new(app.clone());
    author.login("root@example.com").await;
    let dialog = open_dialog(&mut author).await;

    let mut other = Browser::new(app);
    other.login("second-admin@example.com").await;
    assert_eq!(other.get(&dialog).await.status(), StatusCode::NOT_FOUND);

    let unknown = "/admin/courses/5/lessons/wizard/00000000-0000-0000-0000-000000000000";
    assert_eq!(author.get(unknown).await.status(), StatusCode::NOT_FOUND);

    let wrong_course = dialog.replace("/courses/5/", "/courses/6/");
    assert_eq!(author.get(&wrong_course).await.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn closing_the_dialog_discards_the_draft() {
    let (mut browser, _) = admin(seeded()).await;
    let dialog = open_dialog(&mut browser).await;

    assert_redirect(&browser.post_form(&format!("{dialog}/close"), "").await, LESSONS);
    assert_eq!(browser.get(&dialog).await.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn oversized_resource_upload_is_rejected_as_too_large() {
    let (mut browser, _) = admin(seeded()).await;
    let dialog = open_dialog(&mut browser).await;
    browser
        .post_form(
            &format!("{dialog}/details"),
            "title=Intro&description=Basics&order=1&action=next",
        )
        .await;

    let response = browser
        .post_multipart(
            &format!("{dialog}/resources"),
            &[("title_0", "Huge")],
            &[("file_0", "huge.pdf", vec![0u8; 26 * 1024 * 1024])],
        )
        .await;
    assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
    assert!(body_text(response)
        .await
        .contains("Upload is larger than the 20MB total allowed."));

    // the draft is untouched
    let page = body_text(browser.get(&dialog).await).await;
    assert!(page.contains("Step 2 of 3"));
    assert!(!page.contains("huge.pdf"));
}

#[tokio::test]
async fn logging_out_discards_open_drafts() {
    let (app, state) = app(Arc::new(seeded()));
    let mut browser = Browser::new(app.clone());
    browser.login("root@example.com").await;

    let mut dialogs = Vec::new();
    for _ in 0..3 {
        dialogs.push(open_dialog(&mut browser).await);
    }
    assert_eq!(state.drafts.len(), 3);

    assert_redirect(&browser.post_form("/logout", "").await, "/login");
    assert!(state.drafts.is_empty());

    // the same person signing in again, from anywhere, starts clean
    let mut fresh = Browser::new(app);
    fresh.login("root@example.com").await;
    assert_eq!(fresh.get(&dialogs[0]).await.status(), StatusCode::NOT_FOUND);

    browser.login("root@example.com").await;
    assert_eq!(browser.get(&dialogs[0]).await.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn a_new_login_does_not_inherit_drafts() {
    let api = Arc::new(seeded());
    let app = router(api);

    let mut first = Browser::new(app.clone());
    first.login("root@example.com").await;
    let dialog = open_dialog(&mut first).await;

    let mut second = Browser::new(app);
    second.login("root@example.com").await;
    assert_eq!(second.get(&dialog).await.status(), StatusCode::NOT_FOUND);
    assert_eq!(first.get(&dialog).await.status(), StatusCode::OK);
}

#[tokio::test]
async fn open_dialogs_are_capped_per_login() {
    let (app, state) = app(Arc::new(seeded()));
    let mut browser = Browser::new(app);
    browser.login("root@example.com").await;

    let mut dialogs = Vec::new();
    for _ in 0..50 {
        dialogs.push(open_dialog(&mut browser).await);
    }

    assert_eq!(state.drafts.len(), 5);
    assert_eq!(browser.get(&dialogs[0]).await.status(), StatusCode::NOT_FOUND);
    assert_eq!(browser.get(&dialogs[49]).await.status(), StatusCode::OK);
}

#[tokio::test]
async fn guard_denial_discards_open_drafts() {
    let mock = seeded();
    *mock.token_ttl.lock().unwrap() = 2;
    let (app, state) = app(Arc::new(mock));
    let mut browser = Browser::new(app);
    browser.login("root@example.com").await;

    let dialog = open_dialog(&mut browser).await;
    assert_eq!(state.drafts.len(), 1);

    tokio::time::sleep(Duration::from_millis(2100)).await;
    assert_redirect(&browser.get(&dialog).await, "/login");
    assert!(state.drafts.is_empty());
}
