//! Room lifecycle integration tests over the HTTP surface.

use salvo::http::StatusCode;

use super::helpers::*;

const ROOM: &str = "!abc:matrix";

fn room_group_id() -> String {
    roomdav_test::component::util::room_id::group_id_for_room(ROOM)
}

async fn create_room_calendar(service: &salvo::Service, users: &[&str]) -> i64 {
    let response = TestRequest::post("/api/calendars")
        .as_service_account()
        .json_body(&serde_json::json!({
            "mxRoomId": ROOM,
            "displayName": "Team Calendar",
            "userIds": users,
        }))
        .send(service)
        .await
        .assert_status(StatusCode::OK);
    let body = response.json();
    body["id"].as_i64().expect("calendar id")
}

#[test_log::test(tokio::test)]
async fn create_and_share_builds_group_and_share() {
    let (host, service) = create_test_service();
    host.seed_user("alice");

    let calendar_id = create_room_calendar(&service, &["alice"]).await;

    let group_id = room_group_id();
    assert_eq!(group_id.len(), 64);

    let members = host.members_of(&group_id);
    assert!(members.contains(&"alice".to_string()));
    assert!(members.contains(&SERVICE_ACCOUNT.to_string()));

    assert_eq!(
        host.shares_of(calendar_id),
        vec![format!("principal:principals/groups/{group_id}")]
    );

    // The room's display name was applied for every member.
    let svc_path = format!("calendars/{SERVICE_ACCOUNT}/{group_id}");
    assert_eq!(
        host.property(SERVICE_ACCOUNT, &svc_path, PropertyKind::DisplayName),
        Some("Team Calendar".to_string())
    );
}

#[test_log::test(tokio::test)]
async fn create_and_share_twice_returns_same_calendar() {
    let (host, service) = create_test_service();
    host.seed_user("alice");

    let first = create_room_calendar(&service, &["alice"]).await;
    let second = create_room_calendar(&service, &["alice"]).await;
    assert_eq!(first, second);

    let creations = host
        .journal()
        .iter()
        .filter(|call| matches!(call, HostCall::CreateCalendar { .. }))
        .count();
    assert_eq!(creations, 1);
}

#[test_log::test(tokio::test)]
async fn share_by_non_owner_is_forbidden() {
    let (host, service) = create_test_service();
    host.seed_user("alice");
    host.seed_user("bob");
    let calendar_id = host.seed_calendar("alice", "personal", "Personal", &[Component::Events]);

    let response = TestRequest::put(&format!("/api/users/bob/calendars/{calendar_id}"))
        .as_service_account()
        .json_body(&serde_json::json!({
            "mxRoomId": ROOM,
            "displayName": "Hijacked",
        }))
        .send(&service)
        .await
        .assert_status(StatusCode::FORBIDDEN);
    let message = response.json()["message"]
        .as_str()
        .expect("error message")
        .to_string();
    assert!(message.contains("not owned by bob"));
}

#[test_log::test(tokio::test)]
async fn share_of_missing_calendar_is_not_found() {
    let (_host, service) = create_test_service();

    TestRequest::put("/api/users/watcha/calendars/999")
        .as_service_account()
        .json_body(&serde_json::json!({
            "mxRoomId": ROOM,
            "displayName": "Ghost",
        }))
        .send(&service)
        .await
        .assert_status(StatusCode::NOT_FOUND);
}

#[test_log::test(tokio::test)]
async fn add_user_joins_group_and_renames() {
    let (host, service) = create_test_service();
    host.seed_user("alice");
    host.seed_user("bob");

    let calendar_id = create_room_calendar(&service, &["alice"]).await;

    TestRequest::post("/api/users")
        .as_service_account()
        .json_body(&serde_json::json!({
            "userId": "bob",
            "mxRoomId": ROOM,
            "calendarIds": [calendar_id],
            "displayName": "Team Calendar",
        }))
        .send(&service)
        .await
        .assert_status(StatusCode::OK);

    let group_id = room_group_id();
    assert!(host.members_of(&group_id).contains(&"bob".to_string()));

    let bob_path = format!("calendars/bob/{group_id}_shared_by_{SERVICE_ACCOUNT}");
    assert_eq!(
        host.property("bob", &bob_path, PropertyKind::DisplayName),
        Some("Team Calendar".to_string())
    );
}

#[test_log::test(tokio::test)]
async fn remove_user_leaves_group() {
    let (host, service) = create_test_service();
    host.seed_user("alice");

    create_room_calendar(&service, &["alice"]).await;
    let group_id = room_group_id();
    assert!(host.members_of(&group_id).contains(&"alice".to_string()));

    TestRequest::delete("/api/users/alice")
        .as_service_account()
        .json_body(&serde_json::json!({ "mxRoomId": ROOM }))
        .send(&service)
        .await
        .assert_status(StatusCode::OK);

    assert!(!host.members_of(&group_id).contains(&"alice".to_string()));
}

#[test_log::test(tokio::test)]
async fn rename_updates_group_and_member_views() {
    let (host, service) = create_test_service();
    host.seed_user("alice");

    let calendar_id = create_room_calendar(&service, &["alice"]).await;

    TestRequest::put("/api/calendars/displayname")
        .as_service_account()
        .json_body(&serde_json::json!({
            "calendarIds": [calendar_id],
            "mxRoomId": ROOM,
            "displayName": "Renamed Room",
        }))
        .send(&service)
        .await
        .assert_status(StatusCode::OK);

    let group_id = room_group_id();
    let alice_path = format!("calendars/alice/{group_id}_shared_by_{SERVICE_ACCOUNT}");
    assert_eq!(
        host.property("alice", &alice_path, PropertyKind::DisplayName),
        Some("Renamed Room".to_string())
    );
}

#[test_log::test(tokio::test)]
async fn unshare_with_group_deletion_tears_the_room_down() {
    let (host, service) = create_test_service();
    host.seed_user("alice");

    let calendar_id = create_room_calendar(&service, &["alice"]).await;
    let group_id = room_group_id();

    TestRequest::delete("/api/calendars")
        .as_service_account()
        .json_body(&serde_json::json!({
            "calendarIds": [calendar_id],
            "mxRoomId": ROOM,
            "deleteGroup": true,
        }))
        .send(&service)
        .await
        .assert_status(StatusCode::OK);

    let journal = host.journal();
    assert!(journal.contains(&HostCall::DeleteCalendar { calendar_id }));
    assert!(journal.contains(&HostCall::DeleteGroup {
        group_id: group_id.clone()
    }));
    assert!(host.members_of(&group_id).is_empty());
}
