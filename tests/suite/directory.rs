//! Directory view-model driven by the HTTP collaborators.

use std::time::Duration;

use staffdir_engine::{AssetState, DirectoryState, DirectoryViewModel, LoadRequest, RecordId};
use staffdir_providers::{HttpAssetSource, HttpRecordSource};

use crate::common;

fn view_model(
    server: &wiremock::MockServer,
) -> DirectoryViewModel<HttpRecordSource, HttpAssetSource> {
    let client = common::client_for(server);
    DirectoryViewModel::new(HttpRecordSource::new(client.clone()), HttpAssetSource::new(client))
}

async fn settled(vm: &DirectoryViewModel<HttpRecordSource, HttpAssetSource>) -> DirectoryState {
    let mut sub = vm.subscribe();
    let state = tokio::time::timeout(
        Duration::from_secs(10),
        sub.wait_for(|s| !s.is_loading && s.is_settled()),
    )
    .await
    .expect("directory settles")
    .expect("publisher alive");
    (*state).clone()
}

#[tokio::test]
async fn directory_settles_with_one_failed_avatar() {
    let server = wiremock::MockServer::start().await;
    common::mount_users(&server).await;
    common::mount_avatar(&server, 1, 4, 4).await;
    common::mount_corrupt_avatar(&server, 2).await;
    common::mount_avatar(&server, 3, 8, 2).await;

    let vm = view_model(&server);
    assert_eq!(vm.load_directory(), LoadRequest::Started { generation: 1 });
    let state = settled(&vm).await;

    let names: Vec<String> = state.entries.iter().map(|e| e.record.full_name()).collect();
    assert_eq!(names, ["George Bluth", "Janet Weaver", "Emma Wong"]);
    assert!(state.error_message.is_empty());

    let george = state.entry(RecordId::new(1)).expect("george");
    let avatar = george.asset.asset().expect("george avatar");
    assert_eq!((avatar.width(), avatar.height()), (4, 4));

    let janet = state.entry(RecordId::new(2)).expect("janet");
    assert_eq!(
        janet.asset,
        AssetState::Failed("Failed to decode bitmap".to_string())
    );

    let emma = state.entry(RecordId::new(3)).expect("emma");
    assert_eq!(emma.asset.asset().map(|a| (a.width(), a.height())), Some((8, 2)));
}

#[tokio::test]
async fn missing_avatar_is_local_to_its_entry() {
    let server = wiremock::MockServer::start().await;
    common::mount_users(&server).await;
    common::mount_avatar(&server, 1, 1, 1).await;
    common::mount_avatar(&server, 3, 1, 1).await;
    // Nothing mounted for avatar 2: the mock server answers 404.

    let vm = view_model(&server);
    vm.load_directory();
    let state = settled(&vm).await;

    assert_eq!(
        state.entry(RecordId::new(2)).map(|e| e.asset.clone()),
        Some(AssetState::Failed("Failed to load image: HTTP 404".to_string()))
    );
    assert_eq!(state.pending_assets(), 0);
    assert!(state.entry(RecordId::new(1)).is_some_and(|e| e.asset.asset().is_some()));
}

#[tokio::test]
async fn server_error_fails_the_whole_load() {
    let server = wiremock::MockServer::start().await;
    common::mount_users_status(&server, 500).await;

    let vm = view_model(&server);
    vm.load_directory();
    let state = settled(&vm).await;

    assert_eq!(state, DirectoryState::list_failed("Error: HTTP 500"));
    let requests = server.received_requests().await.expect("recording enabled");
    assert!(
        requests.iter().all(|r| r.url.path() == "/users"),
        "no avatar may be requested after a failed listing"
    );
}

#[tokio::test]
async fn empty_listing_settles_as_empty_directory() {
    let server = wiremock::MockServer::start().await;
    common::mount_empty_users(&server).await;

    let vm = view_model(&server);
    vm.load_directory();
    let state = settled(&vm).await;

    assert!(state.is_empty_directory());
}
