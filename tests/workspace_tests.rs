mod helpers;

use axum::http::StatusCode;
use bounty_server::access::workspace_role::WorkspaceRole;
use bounty_server::models::view::workspace::{BudgetView, WorkspaceMemberView, WorkspaceView};
use helpers::bounty_helpers::{assign, create_bounty};
use helpers::workspace_helpers::{
    add_member, create_funded_workspace, create_member, create_workspace, deposit, get_budget,
};
use helpers::{create_fake_user, data, error_code, error_message, fake_pubkey, PUBKEY_HEADER};
use serde_json::json;

test_with_server!(create_workspace_with_owner_and_empty_budget, |server, ctx_state, config| {
    let owner = create_fake_user(&server).await;
    let workspace = create_workspace(&server, &owner).await;
    assert_eq!(workspace.owner_pubkey, owner);

    let response = server
        .get(&format!("/api/workspaces/{}", workspace.id))
        .add_header(PUBKEY_HEADER, &owner)
        .await;
    response.assert_status_success();
    assert_eq!(data::<WorkspaceView>(&response).name, workspace.name);

    let response = server
        .get(&format!("/api/workspaces/{}/members", workspace.id))
        .add_header(PUBKEY_HEADER, &owner)
        .await;
    response.assert_status_success();
    let members = data::<Vec<WorkspaceMemberView>>(&response);
    assert_eq!(members.len(), 1);
    assert_eq!(members[0].user_pubkey, owner);
    assert_eq!(members[0].role, WorkspaceRole::Owner);

    let budget = get_budget(&server, &workspace.id, &owner).await;
    assert_eq!(budget.total_budget, 0);
    assert_eq!(budget.available_budget, 0);
    assert_eq!(budget.reserved_budget, 0);
    assert_eq!(budget.paid_budget, 0);
});

test_with_server!(create_workspace_registers_unknown_caller, |server, ctx_state, config| {
    let owner = fake_pubkey();
    let workspace = create_workspace(&server, &owner).await;
    assert_eq!(workspace.owner_pubkey, owner);

    let response = server
        .get(&format!("/api/users/{owner}"))
        .add_header(PUBKEY_HEADER, &owner)
        .await;
    response.assert_status_success();
});

test_with_server!(duplicate_workspace_name_is_conflict, |server, ctx_state, config| {
    let owner = create_fake_user(&server).await;
    let body = json!({ "name": "Lightning Labs" });
    server
        .post("/api/workspaces")
        .add_header(PUBKEY_HEADER, &owner)
        .json(&body)
        .await
        .assert_status_success();
    let response = server
        .post("/api/workspaces")
        .add_header(PUBKEY_HEADER, &owner)
        .json(&body)
        .await;
    response.assert_status(StatusCode::CONFLICT);
});

test_with_server!(invalid_workspace_input_is_rejected, |server, ctx_state, config| {
    let owner = create_fake_user(&server).await;
    let response = server
        .post("/api/workspaces")
        .add_header(PUBKEY_HEADER, &owner)
        .json(&json!({ "name": "  " }))
        .await;
    response.assert_status(StatusCode::BAD_REQUEST);
    assert_eq!(error_code(&response), "VALIDATION_ERROR");

    let response = server
        .post("/api/workspaces")
        .add_header(PUBKEY_HEADER, &owner)
        .json(&json!({ "name": "Valid name", "website": "not a url" }))
        .await;
    response.assert_status(StatusCode::BAD_REQUEST);
});

test_with_server!(deposit_updates_total_and_available, |server, ctx_state, config| {
    let (owner, workspace) = create_funded_workspace(&server, 100_000).await;
    let response = deposit(&server, &workspace.id, &owner, 25_000).await;
    response.assert_status_success();
    let budget = data::<BudgetView>(&response);
    assert_eq!(budget.total_budget, 125_000);
    assert_eq!(budget.available_budget, 125_000);
    assert_eq!(budget.reserved_budget, 0);
    assert_eq!(budget.paid_budget, 0);

    let response = deposit(&server, &workspace.id, &owner, 0).await;
    response.assert_status(StatusCode::BAD_REQUEST);
    let budget = get_budget(&server, &workspace.id, &owner).await;
    assert_eq!(budget.total_budget, 125_000);
});

test_with_server!(deposit_requires_admin, |server, ctx_state, config| {
    let (owner, workspace) = create_funded_workspace(&server, 1_000).await;
    let contributor = create_member(&server, &workspace.id, &owner, "CONTRIBUTOR").await;
    let response = deposit(&server, &workspace.id, &contributor, 500).await;
    response.assert_status(StatusCode::FORBIDDEN);

    let outsider = create_fake_user(&server).await;
    let response = server
        .get(&format!("/api/workspaces/{}/budget", workspace.id))
        .add_header(PUBKEY_HEADER, &outsider)
        .await;
    response.assert_status(StatusCode::FORBIDDEN);

    let budget = get_budget(&server, &workspace.id, &contributor).await;
    assert_eq!(budget.total_budget, 1_000);
});

test_with_server!(add_member_rules, |server, ctx_state, config| {
    let owner = create_fake_user(&server).await;
    let workspace = create_workspace(&server, &owner).await;
    let admin = create_member(&server, &workspace.id, &owner, "ADMIN").await;

    let user = create_fake_user(&server).await;
    let response = add_member(&server, &workspace.id, &admin, &user, "OWNER").await;
    response.assert_status(StatusCode::BAD_REQUEST);

    let response = add_member(&server, &workspace.id, &admin, &user, "CONTRIBUTOR").await;
    response.assert_status_success();
    let member = data::<WorkspaceMemberView>(&response);
    assert_eq!(member.role, WorkspaceRole::Contributor);

    let response = add_member(&server, &workspace.id, &admin, &user, "VIEWER").await;
    response.assert_status(StatusCode::CONFLICT);

    let response = add_member(&server, &workspace.id, &user, &create_fake_user(&server).await, "VIEWER").await;
    response.assert_status(StatusCode::FORBIDDEN);

    let response = add_member(&server, &workspace.id, &owner, &fake_pubkey(), "VIEWER").await;
    response.assert_status(StatusCode::NOT_FOUND);
});

test_with_server!(update_member_role, |server, ctx_state, config| {
    let owner = create_fake_user(&server).await;
    let workspace = create_workspace(&server, &owner).await;
    let viewer = create_member(&server, &workspace.id, &owner, "VIEWER").await;

    let response = server
        .patch(&format!("/api/workspaces/{}/members/{viewer}", workspace.id))
        .add_header(PUBKEY_HEADER, &owner)
        .json(&json!({ "role": "ADMIN" }))
        .await;
    response.assert_status_success();
    assert_eq!(data::<WorkspaceMemberView>(&response).role, WorkspaceRole::Admin);

    let response = server
        .patch(&format!("/api/workspaces/{}/members/{owner}", workspace.id))
        .add_header(PUBKEY_HEADER, &viewer)
        .json(&json!({ "role": "VIEWER" }))
        .await;
    response.assert_status(StatusCode::FORBIDDEN);
    assert_eq!(error_message(&response), "Owner role cannot be reassigned");
});

test_with_server!(remove_member_rules, |server, ctx_state, config| {
    let (owner, workspace) = create_funded_workspace(&server, 10_000).await;
    let contributor = create_member(&server, &workspace.id, &owner, "CONTRIBUTOR").await;
    let viewer = create_member(&server, &workspace.id, &owner, "VIEWER").await;

    let response = server
        .delete(&format!("/api/workspaces/{}/members/{owner}", workspace.id))
        .add_header(PUBKEY_HEADER, &owner)
        .await;
    response.assert_status(StatusCode::FORBIDDEN);

    let bounty = create_bounty(&server, &workspace.id, &owner, 1_000, "OPEN").await;
    assign(&server, &bounty.id, &owner, &contributor)
        .await
        .assert_status_success();
    let response = server
        .delete(&format!("/api/workspaces/{}/members/{contributor}", workspace.id))
        .add_header(PUBKEY_HEADER, &owner)
        .await;
    response.assert_status(StatusCode::CONFLICT);

    let response = server
        .delete(&format!("/api/workspaces/{}/members/{viewer}", workspace.id))
        .add_header(PUBKEY_HEADER, &viewer)
        .await;
    response.assert_status_success();

    let response = server
        .get(&format!("/api/workspaces/{}/members", workspace.id))
        .add_header(PUBKEY_HEADER, &owner)
        .await;
    let members = data::<Vec<WorkspaceMemberView>>(&response);
    assert_eq!(members.len(), 2);
    assert!(members.iter().all(|m| m.user_pubkey != viewer));
});

test_with_server!(unknown_workspace_is_not_found, |server, ctx_state, config| {
    let caller = create_fake_user(&server).await;
    let response = server
        .get("/api/workspaces/01HZZZZZZZZZZZZZZZZZZZZZZZ")
        .add_header(PUBKEY_HEADER, &caller)
        .await;
    response.assert_status(StatusCode::NOT_FOUND);
    assert_eq!(error_code(&response), "NOT_FOUND");
});
