//! Login view-model driven by the HTTP login service.

use staffdir_engine::{LoginAttempt, LoginViewModel};
use staffdir_providers::HttpLoginService;

use crate::common;

#[tokio::test]
async fn valid_credentials_log_in() {
    let server = wiremock::MockServer::start().await;
    common::mount_login_ok(&server).await;

    let vm = LoginViewModel::new(HttpLoginService::new(common::client_for(&server)));
    vm.update_email(common::VALID_EMAIL);
    vm.update_password(common::VALID_PASSWORD);

    assert_eq!(vm.login().await, LoginAttempt::Succeeded);
    let state = vm.snapshot();
    assert_eq!(state.token.as_ref().map(|t| t.as_str()), Some(common::TOKEN));
    assert!(!state.is_loading);
}

#[tokio::test]
async fn rejected_credentials_show_server_message() {
    let server = wiremock::MockServer::start().await;
    common::mount_login_error(&server, "user not found").await;

    let vm = LoginViewModel::new(HttpLoginService::new(common::client_for(&server)));
    vm.update_email("peter@klaven.com");
    vm.update_password("abc123");

    assert_eq!(
        vm.login().await,
        LoginAttempt::Failed("user not found".to_string())
    );
    assert_eq!(vm.snapshot().error_message, "user not found");
    assert!(!vm.is_login_successful());
}

#[tokio::test]
async fn invalid_form_never_reaches_the_server() {
    let server = wiremock::MockServer::start().await;
    common::mount_login_ok(&server).await;

    let vm = LoginViewModel::new(HttpLoginService::new(common::client_for(&server)));
    vm.update_email(common::VALID_EMAIL);
    vm.update_password("abc");

    assert_eq!(vm.login().await, LoginAttempt::InvalidForm);
    let requests = server.received_requests().await.expect("recording enabled");
    assert!(requests.is_empty());
}
