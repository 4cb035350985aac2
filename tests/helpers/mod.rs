#[macro_use]
pub mod test_with_server;
pub mod bounty_helpers;
pub mod workspace_helpers;

use axum_test::{TestResponse, TestServer};
use bounty_server::models::api_response::ApiResponse;
use bounty_server::models::view::user::UserView;
use fake::{faker, Fake};
use serde::de::DeserializeOwned;
use serde_json::json;
use uuid::Uuid;

pub const PUBKEY_HEADER: &str = "x-user-pubkey";

#[allow(dead_code)]
pub fn fake_pubkey() -> String {
    format!("02{}{}", Uuid::new_v4().simple(), Uuid::new_v4().simple())
}

#[allow(dead_code)]
pub fn fake_username() -> String {
    let name: String = faker::internet::en::Username().fake();
    let suffix: u32 = (1000..9999).fake();
    format!("{}_{}", name.chars().take(20).collect::<String>(), suffix)
}

/// Unwraps the `data` of a successful envelope.
#[allow(dead_code)]
pub fn data<T: DeserializeOwned>(response: &TestResponse) -> T {
    response
        .json::<ApiResponse<T>>()
        .data
        .expect("response has data")
}

#[allow(dead_code)]
pub fn error_code(response: &TestResponse) -> String {
    response
        .json::<ApiResponse<serde_json::Value>>()
        .error
        .expect("response has error")
        .code
}

#[allow(dead_code)]
pub fn error_message(response: &TestResponse) -> String {
    response
        .json::<ApiResponse<serde_json::Value>>()
        .error
        .expect("response has error")
        .message
}

#[allow(dead_code)]
pub async fn register_user(server: &TestServer, pubkey: &str, username: Option<&str>) -> TestResponse {
    server
        .post("/api/users")
        .add_header(PUBKEY_HEADER, pubkey)
        .json(&json!({ "username": username }))
        .await
}

/// Registers a fresh user and returns its pubkey.
#[allow(dead_code)]
pub async fn create_fake_user(server: &TestServer) -> String {
    let pubkey = fake_pubkey();
    let response = register_user(server, &pubkey, Some(&fake_username())).await;
    response.assert_status_success();
    let user = data::<UserView>(&response);
    assert_eq!(user.pubkey, pubkey);
    pubkey
}
