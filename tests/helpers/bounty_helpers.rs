use axum_test::{TestResponse, TestServer};
use bounty_server::models::view::bounty::BountyView;
use fake::{faker, Fake};
use serde_json::json;

use super::{data, PUBKEY_HEADER};

#[allow(dead_code)]
pub async fn create_bounty(
    server: &TestServer,
    workspace_id: &str,
    caller: &str,
    amount: u64,
    status: &str,
) -> BountyView {
    let response = server
        .post(&format!("/api/workspaces/{workspace_id}/bounties"))
        .add_header(PUBKEY_HEADER, caller)
        .json(&json!({
            "title": faker::lorem::en::Sentence(3..6).fake::<String>(),
            "description": faker::lorem::en::Paragraph(1..3).fake::<String>(),
            "deliverables": faker::lorem::en::Sentence(4..8).fake::<String>(),
            "amount": amount,
            "tags": ["rust", "backend"],
            "status": status,
        }))
        .await;
    response.assert_status_success();
    data::<BountyView>(&response)
}

#[allow(dead_code)]
pub async fn get_bounty(server: &TestServer, bounty_id: &str, caller: &str) -> TestResponse {
    server
        .get(&format!("/api/bounties/{bounty_id}"))
        .add_header(PUBKEY_HEADER, caller)
        .await
}

#[allow(dead_code)]
pub async fn patch_bounty(
    server: &TestServer,
    bounty_id: &str,
    caller: &str,
    body: serde_json::Value,
) -> TestResponse {
    server
        .patch(&format!("/api/bounties/{bounty_id}"))
        .add_header(PUBKEY_HEADER, caller)
        .json(&body)
        .await
}

#[allow(dead_code)]
pub async fn assign(server: &TestServer, bounty_id: &str, caller: &str, assignee: &str) -> TestResponse {
    server
        .post(&format!("/api/bounties/{bounty_id}/assign"))
        .add_header(PUBKEY_HEADER, caller)
        .json(&json!({ "assigneePubkey": assignee }))
        .await
}

#[allow(dead_code)]
pub async fn unassign(server: &TestServer, bounty_id: &str, caller: &str) -> TestResponse {
    server
        .delete(&format!("/api/bounties/{bounty_id}/assign"))
        .add_header(PUBKEY_HEADER, caller)
        .await
}

#[allow(dead_code)]
pub async fn submit_proof(server: &TestServer, bounty_id: &str, caller: &str) -> TestResponse {
    server
        .post(&format!("/api/bounties/{bounty_id}/proofs"))
        .add_header(PUBKEY_HEADER, caller)
        .json(&json!({
            "proofUrl": "https://github.com/example/repo/pull/42",
            "description": faker::lorem::en::Sentence(5..10).fake::<String>(),
        }))
        .await
}

#[allow(dead_code)]
pub async fn review_proof(
    server: &TestServer,
    bounty_id: &str,
    proof_id: &str,
    caller: &str,
    approved: bool,
) -> TestResponse {
    server
        .patch(&format!("/api/bounties/{bounty_id}/proofs/{proof_id}"))
        .add_header(PUBKEY_HEADER, caller)
        .json(&json!({ "approved": approved, "feedback": "Reviewed" }))
        .await
}

#[allow(dead_code)]
pub async fn complete(server: &TestServer, bounty_id: &str, caller: &str) -> TestResponse {
    server
        .post(&format!("/api/bounties/{bounty_id}/complete"))
        .add_header(PUBKEY_HEADER, caller)
        .await
}
