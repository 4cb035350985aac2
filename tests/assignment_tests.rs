mod helpers;

use axum::http::StatusCode;
use bounty_server::entities::bounty::bounty_status::BountyStatus;
use bounty_server::models::view::bounty::{BountyAssignmentView, BountyView};
use bounty_server::models::view::proof::ProofWithBountyView;
use helpers::bounty_helpers::{
    assign, complete, create_bounty, get_bounty, patch_bounty, review_proof, submit_proof,
    unassign,
};
use helpers::workspace_helpers::{create_funded_workspace, create_member, get_budget};
use helpers::{create_fake_user, data, error_code, error_message, PUBKEY_HEADER};
use serde_json::json;

test_with_server!(assign_then_pay_moves_budget, |server, ctx_state, config| {
    let (owner, workspace) = create_funded_workspace(&server, 100_000).await;
    let contributor = create_member(&server, &workspace.id, &owner, "CONTRIBUTOR").await;
    let bounty = create_bounty(&server, &workspace.id, &owner, 50_000, "OPEN").await;

    let response = assign(&server, &bounty.id, &owner, &contributor).await;
    response.assert_status_success();
    let assigned = data::<BountyAssignmentView>(&response);
    assert_eq!(assigned.bounty.status, BountyStatus::Assigned);
    assert_eq!(assigned.bounty.assignee_pubkey.as_deref(), Some(contributor.as_str()));
    assert!(assigned.bounty.assigned_at.is_some());
    assert_eq!(
        assigned.assignee.map(|u| u.pubkey).as_deref(),
        Some(contributor.as_str())
    );

    let budget = get_budget(&server, &workspace.id, &owner).await;
    assert_eq!(budget.total_budget, 100_000);
    assert_eq!(budget.available_budget, 50_000);
    assert_eq!(budget.reserved_budget, 50_000);
    assert_eq!(budget.paid_budget, 0);

    let response = submit_proof(&server, &bounty.id, &contributor).await;
    response.assert_status_success();
    let submitted = data::<ProofWithBountyView>(&response);
    assert_eq!(submitted.bounty.status, BountyStatus::InReview);

    review_proof(&server, &bounty.id, &submitted.proof.id, &owner, true)
        .await
        .assert_status_success();

    let response = complete(&server, &bounty.id, &owner).await;
    response.assert_status_success();
    let completed = data::<BountyView>(&response);
    assert_eq!(completed.status, BountyStatus::Completed);
    assert!(completed.paid_at.is_some());
    assert!(completed.completed_at.is_some());

    let budget = get_budget(&server, &workspace.id, &owner).await;
    assert_eq!(budget.total_budget, 100_000);
    assert_eq!(budget.available_budget, 50_000);
    assert_eq!(budget.reserved_budget, 0);
    assert_eq!(budget.paid_budget, 50_000);
});

test_with_server!(assign_over_available_budget_fails, |server, ctx_state, config| {
    let (owner, workspace) = create_funded_workspace(&server, 100_000).await;
    let contributor = create_member(&server, &workspace.id, &owner, "CONTRIBUTOR").await;
    let first = create_bounty(&server, &workspace.id, &owner, 50_000, "OPEN").await;
    assign(&server, &first.id, &owner, &contributor)
        .await
        .assert_status_success();

    let second = create_bounty(&server, &workspace.id, &owner, 60_000, "OPEN").await;
    let response = assign(&server, &second.id, &owner, &contributor).await;
    response.assert_status(StatusCode::BAD_REQUEST);
    assert_eq!(error_code(&response), "INSUFFICIENT_BUDGET");
    assert_eq!(error_message(&response), "Insufficient available budget");

    let response = get_bounty(&server, &second.id, &owner).await;
    let unchanged = data::<BountyView>(&response);
    assert_eq!(unchanged.status, BountyStatus::Open);
    assert!(unchanged.assignee_pubkey.is_none());

    let budget = get_budget(&server, &workspace.id, &owner).await;
    assert_eq!(budget.available_budget, 50_000);
    assert_eq!(budget.reserved_budget, 50_000);
});

test_with_server!(assign_exact_available_budget, |server, ctx_state, config| {
    let (owner, workspace) = create_funded_workspace(&server, 30_000).await;
    let contributor = create_member(&server, &workspace.id, &owner, "CONTRIBUTOR").await;
    let bounty = create_bounty(&server, &workspace.id, &owner, 30_000, "OPEN").await;

    assign(&server, &bounty.id, &owner, &contributor)
        .await
        .assert_status_success();
    let budget = get_budget(&server, &workspace.id, &owner).await;
    assert_eq!(budget.available_budget, 0);
    assert_eq!(budget.reserved_budget, 30_000);
});

test_with_server!(concurrent_assign_reserves_once, |server, ctx_state, config| {
    let (owner, workspace) = create_funded_workspace(&server, 100_000).await;
    let first = create_member(&server, &workspace.id, &owner, "CONTRIBUTOR").await;
    let second = create_member(&server, &workspace.id, &owner, "CONTRIBUTOR").await;
    let bounty = create_bounty(&server, &workspace.id, &owner, 40_000, "OPEN").await;

    let (res_a, res_b) = tokio::join!(
        assign(&server, &bounty.id, &owner, &first),
        assign(&server, &bounty.id, &owner, &second),
    );
    let statuses = [res_a.status_code(), res_b.status_code()];
    assert_eq!(statuses.iter().filter(|s| s.is_success()).count(), 1);
    assert_eq!(
        statuses
            .iter()
            .filter(|s| **s == StatusCode::BAD_REQUEST)
            .count(),
        1
    );
    let failed = if res_a.status_code().is_success() { &res_b } else { &res_a };
    assert!(error_message(failed).contains("OPEN"));

    let budget = get_budget(&server, &workspace.id, &owner).await;
    assert_eq!(budget.reserved_budget, 40_000);
    assert_eq!(budget.available_budget, 60_000);
});

test_with_server!(assign_and_unassign_restores_budget, |server, ctx_state, config| {
    let (owner, workspace) = create_funded_workspace(&server, 20_000).await;
    let contributor = create_member(&server, &workspace.id, &owner, "CONTRIBUTOR").await;
    let bounty = create_bounty(&server, &workspace.id, &owner, 15_000, "OPEN").await;

    assign(&server, &bounty.id, &owner, &contributor)
        .await
        .assert_status_success();
    let response = unassign(&server, &bounty.id, &owner).await;
    response.assert_status_success();
    let open = data::<BountyView>(&response);
    assert_eq!(open.status, BountyStatus::Open);
    assert!(open.assignee_pubkey.is_none());

    let budget = get_budget(&server, &workspace.id, &owner).await;
    assert_eq!(budget.available_budget, 20_000);
    assert_eq!(budget.reserved_budget, 0);

    unassign(&server, &bounty.id, &owner)
        .await
        .assert_status(StatusCode::CONFLICT);
});

test_with_server!(unassign_from_review_rejects_pending_proof, |server, ctx_state, config| {
    let (owner, workspace) = create_funded_workspace(&server, 20_000).await;
    let contributor = create_member(&server, &workspace.id, &owner, "CONTRIBUTOR").await;
    let bounty = create_bounty(&server, &workspace.id, &owner, 5_000, "OPEN").await;
    assign(&server, &bounty.id, &owner, &contributor)
        .await
        .assert_status_success();
    submit_proof(&server, &bounty.id, &contributor)
        .await
        .assert_status_success();

    let response = unassign(&server, &bounty.id, &owner).await;
    response.assert_status_success();
    assert_eq!(data::<BountyView>(&response).status, BountyStatus::Open);

    let response = server
        .get(&format!("/api/bounties/{}/proofs", bounty.id))
        .add_header(PUBKEY_HEADER, &owner)
        .await;
    let proofs = data::<Vec<serde_json::Value>>(&response);
    assert_eq!(proofs.len(), 1);
    assert_eq!(proofs[0]["status"], "REJECTED");

    let budget = get_budget(&server, &workspace.id, &owner).await;
    assert_eq!(budget.reserved_budget, 0);
    assert_eq!(budget.available_budget, 20_000);
});

test_with_server!(assign_rules, |server, ctx_state, config| {
    let (owner, workspace) = create_funded_workspace(&server, 20_000).await;
    let contributor = create_member(&server, &workspace.id, &owner, "CONTRIBUTOR").await;
    let draft = create_bounty(&server, &workspace.id, &owner, 5_000, "DRAFT").await;
    let open = create_bounty(&server, &workspace.id, &owner, 5_000, "OPEN").await;

    let response = assign(&server, &draft.id, &owner, &contributor).await;
    response.assert_status(StatusCode::BAD_REQUEST);

    let outsider = create_fake_user(&server).await;
    let response = assign(&server, &open.id, &owner, &outsider).await;
    response.assert_status(StatusCode::FORBIDDEN);

    let response = assign(&server, &open.id, &owner, &helpers::fake_pubkey()).await;
    response.assert_status(StatusCode::NOT_FOUND);

    let response = assign(&server, &open.id, &contributor, &contributor).await;
    response.assert_status(StatusCode::FORBIDDEN);
});

test_with_server!(patch_status_assigns_bounty, |server, ctx_state, config| {
    let (owner, workspace) = create_funded_workspace(&server, 20_000).await;
    let contributor = create_member(&server, &workspace.id, &owner, "CONTRIBUTOR").await;
    let bounty = create_bounty(&server, &workspace.id, &owner, 5_000, "OPEN").await;

    let response = patch_bounty(&server, &bounty.id, &owner, json!({ "status": "ASSIGNED" })).await;
    response.assert_status(StatusCode::BAD_REQUEST);

    let response = patch_bounty(
        &server,
        &bounty.id,
        &owner,
        json!({ "status": "ASSIGNED", "assigneePubkey": contributor }),
    )
    .await;
    response.assert_status_success();
    let assigned = data::<BountyView>(&response);
    assert_eq!(assigned.status, BountyStatus::Assigned);
    assert_eq!(assigned.assignee_pubkey.as_deref(), Some(contributor.as_str()));

    let budget = get_budget(&server, &workspace.id, &owner).await;
    assert_eq!(budget.reserved_budget, 5_000);
});

test_with_server!(claim_open_bounty, |server, ctx_state, config| {
    let (owner, workspace) = create_funded_workspace(&server, 20_000).await;
    let contributor = create_member(&server, &workspace.id, &owner, "CONTRIBUTOR").await;
    let viewer = create_member(&server, &workspace.id, &owner, "VIEWER").await;
    let bounty = create_bounty(&server, &workspace.id, &owner, 8_000, "OPEN").await;
    let path = format!("/api/workspaces/{}/bounties/{}/claim", workspace.id, bounty.id);

    server
        .patch(&path)
        .add_header(PUBKEY_HEADER, &viewer)
        .await
        .assert_status(StatusCode::FORBIDDEN);

    let response = server
        .patch(&path)
        .add_header(PUBKEY_HEADER, &contributor)
        .await;
    response.assert_status_success();
    let claimed = data::<BountyAssignmentView>(&response);
    assert_eq!(claimed.bounty.status, BountyStatus::Assigned);
    assert_eq!(claimed.bounty.assignee_pubkey.as_deref(), Some(contributor.as_str()));

    let budget = get_budget(&server, &workspace.id, &owner).await;
    assert_eq!(budget.reserved_budget, 8_000);
    assert_eq!(budget.available_budget, 12_000);

    server
        .patch(&path)
        .add_header(PUBKEY_HEADER, &contributor)
        .await
        .assert_status(StatusCode::BAD_REQUEST);
});
