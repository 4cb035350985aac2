use axum_test::{TestResponse, TestServer};
use bounty_server::models::view::workspace::{BudgetView, WorkspaceView};
use fake::{faker, Fake};
use serde_json::json;

use super::{create_fake_user, data, PUBKEY_HEADER};

#[allow(dead_code)]
pub async fn create_workspace(server: &TestServer, owner: &str) -> WorkspaceView {
    let company: String = faker::company::en::CompanyName().fake();
    let suffix: u32 = (1000..99999).fake();
    let response = server
        .post("/api/workspaces")
        .add_header(PUBKEY_HEADER, owner)
        .json(&json!({
            "name": format!("{company} {suffix}"),
            "description": faker::lorem::en::Sentence(5..10).fake::<String>(),
        }))
        .await;
    response.assert_status_success();
    data::<WorkspaceView>(&response)
}

#[allow(dead_code)]
pub async fn add_member(
    server: &TestServer,
    workspace_id: &str,
    caller: &str,
    user_pubkey: &str,
    role: &str,
) -> TestResponse {
    server
        .post(&format!("/api/workspaces/{workspace_id}/members"))
        .add_header(PUBKEY_HEADER, caller)
        .json(&json!({ "userPubkey": user_pubkey, "role": role }))
        .await
}

/// Registers a user and adds it to the workspace with the given role.
#[allow(dead_code)]
pub async fn create_member(server: &TestServer, workspace_id: &str, owner: &str, role: &str) -> String {
    let pubkey = create_fake_user(server).await;
    add_member(server, workspace_id, owner, &pubkey, role)
        .await
        .assert_status_success();
    pubkey
}

#[allow(dead_code)]
pub async fn deposit(server: &TestServer, workspace_id: &str, caller: &str, amount: u64) -> TestResponse {
    server
        .post(&format!("/api/workspaces/{workspace_id}/budget/deposit"))
        .add_header(PUBKEY_HEADER, caller)
        .json(&json!({ "amount": amount }))
        .await
}

#[allow(dead_code)]
pub async fn get_budget(server: &TestServer, workspace_id: &str, caller: &str) -> BudgetView {
    let response = server
        .get(&format!("/api/workspaces/{workspace_id}/budget"))
        .add_header(PUBKEY_HEADER, caller)
        .await;
    response.assert_status_success();
    data::<BudgetView>(&response)
}

/// Owner with a funded workspace.
#[allow(dead_code)]
pub async fn create_funded_workspace(server: &TestServer, amount: u64) -> (String, WorkspaceView) {
    let owner = create_fake_user(server).await;
    let workspace = create_workspace(server, &owner).await;
    deposit(server, &workspace.id, &owner, amount)
        .await
        .assert_status_success();
    (owner, workspace)
}
