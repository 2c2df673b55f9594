use forum_core::db::open_db_in_memory;
use forum_core::{
    Collection, DocumentStore, EntityId, Filter, ModelError, Profile, Query, RegisterUser,
    SqliteDocumentStore, StatusService, StoreError, StoreResult, Update, User, UserService,
    ValidationError,
};
use rusqlite::Connection;
use serde_json::Value;

fn store(conn: &Connection) -> SqliteDocumentStore<'_> {
    let store = SqliteDocumentStore::try_new(conn).unwrap();
    StatusService::new(&store).ensure_initialized().unwrap();
    store
}

fn request(username: &str) -> RegisterUser {
    RegisterUser {
        username: username.to_string(),
        password_hash: "hash".to_string(),
        email: format!("{username}@example.com"),
    }
}

fn register(store: &SqliteDocumentStore<'_>, username: &str) -> User {
    UserService::new(store).register(request(username)).unwrap()
}

#[test]
fn registration_assigns_increasing_ordinals() {
    let conn = open_db_in_memory().unwrap();
    let store = store(&conn);

    let indexes: Vec<u64> = ["alice", "bob", "carol"]
        .into_iter()
        .map(|name| register(&store, name).index)
        .collect();
    assert_eq!(indexes, vec![1, 2, 3]);

    let status = StatusService::new(&store).load().unwrap();
    assert_eq!(status.user_count, 3);
    assert_eq!(status.user_index, 3);
}

/// Delegates to SQLite but rejects every new user document.
struct UserInsertsFail<'a> {
    inner: &'a SqliteDocumentStore<'a>,
}

impl DocumentStore for UserInsertsFail<'_> {
    fn get(&self, collection: Collection, id: EntityId) -> StoreResult<Option<Value>> {
        self.inner.get(collection, id)
    }

    fn find(&self, collection: Collection, query: &Query) -> StoreResult<Vec<Value>> {
        self.inner.find(collection, query)
    }

    fn count(&self, collection: Collection, filter: &Filter) -> StoreResult<u64> {
        self.inner.count(collection, filter)
    }

    fn insert(&self, collection: Collection, id: EntityId, doc: &Value) -> StoreResult<()> {
        if collection == Collection::Users {
            return Err(StoreError::from(rusqlite::Error::InvalidQuery));
        }
        self.inner.insert(collection, id, doc)
    }

    fn update(
        &self,
        collection: Collection,
        id: EntityId,
        update: &Update,
    ) -> StoreResult<Option<Value>> {
        self.inner.update(collection, id, update)
    }

    fn delete(&self, collection: Collection, id: EntityId) -> StoreResult<bool> {
        self.inner.delete(collection, id)
    }
}

#[test]
fn failed_insert_skips_an_ordinal_without_counting_the_user() {
    let conn = open_db_in_memory().unwrap();
    let store = store(&conn);

    let flaky = UserInsertsFail { inner: &store };
    let err = UserService::new(&flaky).register(request("ghost")).unwrap_err();
    assert!(matches!(err, ModelError::Store(StoreError::Unavailable(_))));

    let alice = register(&store, "alice");
    assert_eq!(alice.index, 2);

    let status = StatusService::new(&store).load().unwrap();
    assert_eq!(status.user_count, 1);
    assert_eq!(status.user_index, 2);
    assert!(UserService::new(&store)
        .find_by_username("ghost")
        .unwrap()
        .is_none());
}

#[test]
fn fresh_user_is_inactive_until_activated() {
    let conn = open_db_in_memory().unwrap();
    let store = store(&conn);
    let users = UserService::new(&store);
    let alice = users.register(request("alice")).unwrap();

    assert!(!alice.is_active);
    assert!(!alice.is_superuser);
    let code = alice.validate_code.clone().unwrap();

    assert!(matches!(
        users.activate("alice", "wrong"),
        Err(ModelError::InvalidCode)
    ));
    let active = users.activate("alice", &code).unwrap();
    assert!(active.is_active);
    assert!(active.validate_code.is_none());

    // The code is single use.
    assert!(matches!(
        users.activate("alice", &code),
        Err(ModelError::InvalidCode)
    ));
}

#[test]
fn duplicate_and_malformed_usernames_are_rejected() {
    let conn = open_db_in_memory().unwrap();
    let store = store(&conn);
    let users = UserService::new(&store);
    users.register(request("alice")).unwrap();

    match users.register(request("alice")) {
        Err(ModelError::UsernameTaken(name)) => assert_eq!(name, "alice"),
        other => panic!("unexpected result: {other:?}"),
    }
    assert!(matches!(
        users.register(request("has space")),
        Err(ModelError::Validation(ValidationError::InvalidUsername(_)))
    ));
    assert!(matches!(
        users.register(RegisterUser {
            email: " ".to_string(),
            ..request("bob")
        }),
        Err(ModelError::Validation(ValidationError::EmptyField { .. }))
    ));

    assert_eq!(StatusService::new(&store).load().unwrap().user_count, 1);
}

#[test]
fn password_reset_requires_the_issued_code() {
    let conn = open_db_in_memory().unwrap();
    let store = store(&conn);
    let users = UserService::new(&store);
    users.register(request("alice")).unwrap();

    assert!(matches!(
        users.reset_password("alice", "guess", "new-hash"),
        Err(ModelError::InvalidCode)
    ));

    let code = users.issue_reset_code("alice").unwrap();
    assert!(matches!(
        users.reset_password("alice", &code, ""),
        Err(ModelError::Validation(_))
    ));
    let user = users.reset_password("alice", &code, "new-hash").unwrap();
    assert_eq!(user.password, "new-hash");
    assert!(user.reset_code.is_none());

    assert!(users
        .issue_reset_code("nobody")
        .unwrap_err()
        .is_not_found());
}

#[test]
fn follow_and_unfollow_keep_the_inverse_relation() {
    let conn = open_db_in_memory().unwrap();
    let store = store(&conn);
    register(&store, "alice");
    register(&store, "bob");
    let users = UserService::new(&store);

    let bob = users.follow("alice", "bob").unwrap();
    assert!(users.is_followed_by(&bob, "alice"));
    let alice = users.require_user("alice").unwrap();
    assert!(users.is_fans(&alice, "bob"));
    assert!(!users.is_followed_by(&alice, "bob"));

    // Following twice does not duplicate entries.
    let bob = users.follow("alice", "bob").unwrap();
    assert_eq!(bob.fans, vec!["alice".to_string()]);

    let bob = users.unfollow("alice", "bob").unwrap();
    assert!(!users.is_followed_by(&bob, "alice"));
    let alice = users.require_user("alice").unwrap();
    assert!(!users.is_fans(&alice, "bob"));
    assert!(alice.follow.is_empty());

    // Unfollowing again is a no-op.
    users.unfollow("alice", "bob").unwrap();
}

#[test]
fn self_follow_and_unknown_users_are_rejected() {
    let conn = open_db_in_memory().unwrap();
    let store = store(&conn);
    register(&store, "alice");
    let users = UserService::new(&store);

    assert!(matches!(
        users.follow("alice", "alice"),
        Err(ModelError::Validation(ValidationError::SelfFollow(_)))
    ));
    assert!(users.follow("alice", "ghost").unwrap_err().is_not_found());
    assert!(users.find_by_username("ghost").unwrap().is_none());
}

#[test]
fn profile_updates_set_and_clear_fields() {
    let conn = open_db_in_memory().unwrap();
    let store = store(&conn);
    register(&store, "alice");
    let users = UserService::new(&store);

    let profile = Profile {
        website: Some("https://alice.dev".to_string()),
        location: Some("Lisbon".to_string()),
        ..Profile::default()
    };
    let alice = users.update_profile("alice", &profile).unwrap();
    assert_eq!(alice.profile, profile);

    let cleared = Profile {
        location: Some("Porto".to_string()),
        ..Profile::default()
    };
    let alice = users.update_profile("alice", &cleared).unwrap();
    assert!(alice.profile.website.is_none());
    assert_eq!(alice.profile.location.as_deref(), Some("Porto"));
    assert_eq!(users.get(forum_core::Ref::of(&alice)).unwrap(), alice);
}

#[test]
fn superuser_flag_can_be_granted_and_revoked() {
    let conn = open_db_in_memory().unwrap();
    let store = store(&conn);
    register(&store, "root");
    let users = UserService::new(&store);

    assert!(users.set_superuser("root", true).unwrap().is_superuser);
    assert!(!users.set_superuser("root", false).unwrap().is_superuser);
}
