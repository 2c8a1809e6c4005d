// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use qc_wire::MemoryStore;
use yare::parameterized;

async fn manager(anonymous: bool) -> UserManager<MemoryStore> {
    let users = UserManager::new(MemoryStore::new(), "admin", anonymous);
    users.set_admin_password("hunter2").await.unwrap();
    users
}

#[tokio::test]
async fn add_user_and_authenticate() {
    let users = manager(false).await;
    let userid = users.add_user("alice", "pw1", "hunter2").await.unwrap();
    assert_eq!(userid.len(), 32);

    assert!(users.authenticate("alice", "pw1").await.unwrap());
    assert!(!users.authenticate("alice", "wrong").await.unwrap());
    assert_eq!(users.userid("alice").await.unwrap(), userid);
}

#[tokio::test]
async fn add_user_requires_admin_password() {
    let users = manager(false).await;
    let result = users.add_user("alice", "pw1", "wrong").await;
    assert!(matches!(result, Err(AuthError::AdminRequired)));
}

#[tokio::test]
async fn add_user_rejected_in_anonymous_mode() {
    let users = manager(true).await;
    let result = users.add_user("alice", "pw1", "hunter2").await;
    assert!(matches!(result, Err(AuthError::WrongMode)));
}

#[tokio::test]
async fn anonymous_registration() {
    let users = manager(true).await;
    let userid = users.add_anonymous_user().await.unwrap();
    assert_eq!(userid.len(), 32);
    // Anonymous users authenticate by existence alone.
    assert!(users.authenticate(&userid, "").await.unwrap());
}

#[tokio::test]
async fn anonymous_registration_rejected_for_named_server() {
    let users = manager(false).await;
    assert!(matches!(
        users.add_anonymous_user().await,
        Err(AuthError::WrongMode)
    ));
}

#[tokio::test]
async fn unknown_user_fails_authentication() {
    let users = manager(false).await;
    assert!(matches!(
        users.authenticate("nobody", "pw").await,
        Err(AuthError::UnknownUser(_))
    ));
}

#[tokio::test]
async fn delete_user_requires_admin() {
    let users = manager(false).await;
    users.add_user("alice", "pw1", "hunter2").await.unwrap();

    assert!(matches!(
        users.delete_user("alice", "wrong").await,
        Err(AuthError::AdminRequired)
    ));
    users.delete_user("alice", "hunter2").await.unwrap();
    assert!(!users.user_exists("alice").await.unwrap());
}

#[tokio::test]
async fn admin_account_cannot_be_deleted() {
    let users = manager(false).await;
    assert!(matches!(
        users.delete_user("admin", "hunter2").await,
        Err(AuthError::AdminRequired)
    ));
}

#[parameterized(
    admin_name   = { "admin" },
    spaces       = { "no spaces" },
    empty        = { "" },
    slash        = { "a/b" },
)]
fn invalid_usernames(name: &str) {
    let rt = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .unwrap();
    rt.block_on(async {
        let users = manager(false).await;
        let result = users.add_user(name, "pw", "hunter2").await;
        assert!(matches!(result, Err(AuthError::InvalidUsername(_))), "{name}");
    });
}
