//! Listing, detail, and reorder integration tests.

use salvo::http::StatusCode;

use super::helpers::*;

#[test_log::test(tokio::test)]
async fn list_returns_owned_calendars_sorted() {
    let (host, service) = create_test_service();
    host.seed_user("alice");
    host.seed_calendar("alice", "b", "beta", &[Component::Events]);
    host.seed_calendar("alice", "a", "Alpha", &[Component::Events, Component::Tasks]);

    let response = TestRequest::get("/api/users/alice/calendars")
        .as_service_account()
        .send(&service)
        .await
        .assert_status(StatusCode::OK);

    let body = response.json();
    let names: Vec<&str> = body
        .as_array()
        .expect("array body")
        .iter()
        .map(|c| c["displayname"].as_str().expect("displayname"))
        .collect();
    assert_eq!(names, vec!["Alpha", "beta"]);
    assert_eq!(body[0]["components"], serde_json::json!(["VEVENT", "VTODO"]));
}

#[test_log::test(tokio::test)]
async fn list_for_unknown_user_is_not_found() {
    let (_host, service) = create_test_service();

    TestRequest::get("/api/users/nobody/calendars")
        .as_service_account()
        .send(&service)
        .await
        .assert_status(StatusCode::NOT_FOUND);
}

#[test_log::test(tokio::test)]
async fn get_returns_viewer_display_name_and_personal_flag() {
    let (host, service) = create_test_service();
    host.seed_user("alice");
    let calendar_id = host.seed_calendar("alice", "work", "Work", &[Component::Events]);

    let response = TestRequest::get(&format!("/api/users/alice/calendars/{calendar_id}"))
        .as_service_account()
        .send(&service)
        .await
        .assert_status(StatusCode::OK);

    let body = response.json();
    assert_eq!(body["id"].as_i64(), Some(calendar_id));
    assert_eq!(body["displayname"], "Work");
    // Owned by a real user, not the service account.
    assert_eq!(body["is_personal"], true);
}

#[test_log::test(tokio::test)]
async fn get_for_invisible_calendar_is_forbidden() {
    let (host, service) = create_test_service();
    host.seed_user("alice");
    host.seed_user("bob");
    let calendar_id = host.seed_calendar("bob", "private", "Private", &[Component::Events]);

    TestRequest::get(&format!("/api/users/alice/calendars/{calendar_id}"))
        .as_service_account()
        .send(&service)
        .await
        .assert_status(StatusCode::FORBIDDEN);
}

#[test_log::test(tokio::test)]
async fn reorder_writes_the_full_order_table() {
    let (host, service) = create_test_service();
    host.seed_user("alice");
    host.seed_calendar("alice", "one", "One", &[Component::Events]);
    let target = host.seed_calendar("alice", "two", "Two", &[Component::Events]);

    TestRequest::put(&format!("/api/users/alice/calendars/{target}/top"))
        .as_service_account()
        .send(&service)
        .await
        .assert_status(StatusCode::OK);

    assert_eq!(
        host.property("alice", "calendars/alice/two", PropertyKind::CalendarOrder),
        Some("0".to_string())
    );
    assert_eq!(
        host.property("alice", "calendars/alice/one", PropertyKind::CalendarOrder),
        Some("1".to_string())
    );
}

#[test_log::test(tokio::test)]
async fn reorder_of_missing_calendar_succeeds_without_changes() {
    let (host, service) = create_test_service();
    host.seed_user("alice");

    TestRequest::put("/api/users/alice/calendars/404/top")
        .as_service_account()
        .send(&service)
        .await
        .assert_status(StatusCode::OK);

    assert!(host.journal().is_empty());
}

#[test_log::test(tokio::test)]
async fn reorder_task_list_sets_default_route() {
    let (host, service) = create_test_service();
    host.seed_user("alice");
    let target = host.seed_calendar("alice", "todo", "Todo", &[Component::Tasks]);

    TestRequest::put(&format!("/api/users/alice/calendars/{target}/top"))
        .as_service_account()
        .send(&service)
        .await
        .assert_status(StatusCode::OK);

    assert_eq!(
        host.preference("alice", "tasks", "various_initialRoute"),
        Some("/calendars/todo".to_string())
    );
}
