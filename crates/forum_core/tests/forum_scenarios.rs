use forum_core::db::open_db_in_memory;
use forum_core::{
    Article, ArticleCategory, CommentService, ContentKind, ContentService, DocumentStoreExt,
    LatestReply, ModelError, NewArticle, NewComment, NewSite, NewTopic, Node, Ref, RegisterUser,
    Site, SiteCategory, SqliteDocumentStore, StatusService, TaxonomyService, Topic, Update, User,
    UserService,
};
use rusqlite::Connection;

fn store(conn: &Connection) -> SqliteDocumentStore<'_> {
    let store = SqliteDocumentStore::try_new(conn).unwrap();
    StatusService::new(&store).ensure_initialized().unwrap();
    store
}

fn register(store: &SqliteDocumentStore<'_>, username: &str) -> User {
    UserService::new(store)
        .register(RegisterUser {
            username: username.to_string(),
            password_hash: "hash".to_string(),
            email: format!("{username}@example.com"),
        })
        .unwrap()
}

fn superuser(store: &SqliteDocumentStore<'_>, username: &str) -> User {
    register(store, username);
    UserService::new(store).set_superuser(username, true).unwrap()
}

fn general(store: &SqliteDocumentStore<'_>) -> Node {
    TaxonomyService::new(store)
        .create_node("general", "General", "")
        .unwrap()
}

fn post_topic(store: &SqliteDocumentStore<'_>, node: &Node, author: &User, title: &str) -> Topic {
    ContentService::new(store)
        .create_topic(NewTopic {
            node: Ref::of(node),
            title: title.to_string(),
            markdown: "**hi**".to_string(),
            author: Ref::of(author),
        })
        .unwrap()
}

#[test]
fn alice_topic_with_bob_reply() {
    let conn = open_db_in_memory().unwrap();
    let store = store(&conn);
    let alice = register(&store, "alice");
    let bob = register(&store, "bob");
    superuser(&store, "root-superuser");
    let node = general(&store);

    let topic = post_topic(&store, &node, &alice, "Hello");
    let comments = CommentService::new(&store);
    let c1 = comments
        .add_comment(NewComment {
            content_id: topic.id,
            markdown: "welcome".to_string(),
            author: Ref::of(&bob),
        })
        .unwrap();

    let contents = ContentService::new(&store);
    let topic = contents.get::<Topic>(topic.id).unwrap();
    assert_eq!(topic.content.comment_count, 1);
    let replier = contents.latest_replier(&topic).unwrap().unwrap();
    assert_eq!(replier.username, "bob");

    assert!(contents.can_edit(&topic.content, "alice").unwrap());
    assert!(!contents.can_edit(&topic.content, "bob").unwrap());
    assert!(contents.can_edit(&topic.content, "root-superuser").unwrap());
    assert!(!contents.can_edit(&topic.content, "nobody").unwrap());

    assert!(!comments.can_delete(&c1, "alice").unwrap());
    assert!(!comments.can_delete(&c1, "bob").unwrap());
    assert!(comments.can_delete(&c1, "root-superuser").unwrap());
    assert!(!comments.can_delete(&c1, "nobody").unwrap());

    assert_eq!(comments.creator(&c1).unwrap().id, bob.id);
    assert_eq!(comments.topic(&c1).unwrap().id, topic.id);

    let status = StatusService::new(&store).load().unwrap();
    assert_eq!(status.user_count, 3);
    assert_eq!(status.topic_count, 1);
    assert_eq!(status.reply_count, 1);

    let node = TaxonomyService::new(&store).get::<Node>(node.id).unwrap();
    assert_eq!(node.topic_count, 1);
}

#[test]
fn deleted_node_degrades_to_not_found() {
    let conn = open_db_in_memory().unwrap();
    let store = store(&conn);
    let alice = register(&store, "alice");
    let node = general(&store);
    let topic = post_topic(&store, &node, &alice, "Orphan");

    TaxonomyService::new(&store)
        .delete_node(Ref::of(&node))
        .unwrap();

    let contents = ContentService::new(&store);
    let topic = contents.get::<Topic>(topic.id).unwrap();
    let err = contents.node(&topic).unwrap_err();
    assert!(err.is_not_found());
    assert_eq!(topic.content.title, "Orphan");
    assert_eq!(topic.content.html, "<p><strong>hi</strong></p>");
    assert_eq!(contents.creator(&topic.content).unwrap().id, alice.id);
}

#[test]
fn deleted_categories_degrade_to_not_found() {
    let conn = open_db_in_memory().unwrap();
    let store = store(&conn);
    let alice = register(&store, "alice");
    let taxonomy = TaxonomyService::new(&store);
    let tutorials = taxonomy.create_article_category("Tutorials").unwrap();
    let links = taxonomy.create_site_category("Links").unwrap();

    let contents = ContentService::new(&store);
    let article = contents
        .create_article(NewArticle {
            category: Ref::of(&tutorials),
            title: "Ownership".to_string(),
            markdown: "borrow *carefully*".to_string(),
            author: Ref::of(&alice),
            original: None,
        })
        .unwrap();
    let site = contents
        .create_site(NewSite {
            category: Ref::of(&links),
            title: "Crates".to_string(),
            url: "https://crates.io".to_string(),
            markdown: "registry".to_string(),
            author: Ref::of(&alice),
        })
        .unwrap();

    let listed = taxonomy.articles(&tutorials).unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].id, article.id);
    assert_eq!(contents.owner(&article).unwrap().id, tutorials.id);
    assert_eq!(contents.owner(&site).unwrap().id, links.id);

    taxonomy.delete::<ArticleCategory>(tutorials.id).unwrap();
    taxonomy.delete::<SiteCategory>(links.id).unwrap();

    let article = contents.get::<Article>(article.id).unwrap();
    assert!(contents.owner(&article).unwrap_err().is_not_found());
    assert_eq!(article.content.title, "Ownership");
    assert_eq!(article.content.html, "<p>borrow <em>carefully</em></p>");

    let site = contents.get::<Site>(site.id).unwrap();
    assert!(contents.owner(&site).unwrap_err().is_not_found());
    assert_eq!(site.url, "https://crates.io");
    assert_eq!(contents.creator(&site.content).unwrap().id, alice.id);
}

#[test]
fn topic_of_article_comment_is_not_found() {
    let conn = open_db_in_memory().unwrap();
    let store = store(&conn);
    let alice = register(&store, "alice");
    let category = TaxonomyService::new(&store)
        .create_article_category("Tutorials")
        .unwrap();
    let article = ContentService::new(&store)
        .create_article(NewArticle {
            category: Ref::of(&category),
            title: "Intro".to_string(),
            markdown: "text".to_string(),
            author: Ref::of(&alice),
            original: None,
        })
        .unwrap();

    let comments = CommentService::new(&store);
    let comment = comments
        .add_comment(NewComment {
            content_id: article.id,
            markdown: "nice".to_string(),
            author: Ref::of(&alice),
        })
        .unwrap();
    assert_eq!(comment.kind, ContentKind::Article);

    assert!(comments.topic(&comment).unwrap_err().is_not_found());
    let content = comments.content(&comment).unwrap();
    assert_eq!(content.kind(), ContentKind::Article);
    assert_eq!(content.envelope().comment_count, 1);

    // Only topic replies count towards the site-wide reply total.
    assert_eq!(StatusService::new(&store).load().unwrap().reply_count, 0);
    assert!(ContentService::new(&store)
        .get::<Topic>(article.id)
        .unwrap_err()
        .is_not_found());
}

#[test]
fn resolution_is_idempotent() {
    let conn = open_db_in_memory().unwrap();
    let store = store(&conn);
    let alice = register(&store, "alice");
    let node = general(&store);
    let topic = post_topic(&store, &node, &alice, "Twice");

    let first = store.resolve(Ref::<User>::of(&alice)).unwrap();
    let second = store.resolve(Ref::<User>::of(&alice)).unwrap();
    assert_eq!(first, second);

    let contents = ContentService::new(&store);
    assert_eq!(
        contents.get_any(topic.id).unwrap(),
        contents.get_any(topic.id).unwrap()
    );
    assert_eq!(contents.node(&topic).unwrap(), contents.node(&topic).unwrap());
}

#[test]
fn latest_topics_are_capped_owned_and_newest_first() {
    let conn = open_db_in_memory().unwrap();
    let store = store(&conn);
    let alice = register(&store, "alice");
    let bob = register(&store, "bob");
    let node = general(&store);

    for i in 0..12_i64 {
        let at = 1_000 + (i * 7) % 12;
        let topic = Topic::new(Ref::of(&node), format!("t{i}"), "body", Ref::of(&alice), at);
        store.insert_doc(&topic).unwrap();
    }
    let foreign = Topic::new(Ref::of(&node), "bob's", "body", Ref::of(&bob), 5_000);
    store.insert_doc(&foreign).unwrap();

    let users = UserService::new(&store);
    let latest = users.latest_topics(&alice).unwrap();
    assert_eq!(latest.len(), 10);
    assert!(latest
        .iter()
        .all(|topic| topic.content.created_by.id() == alice.id));
    assert!(latest
        .windows(2)
        .all(|pair| pair[0].content.created_at >= pair[1].content.created_at));
    assert_eq!(latest[0].content.created_at, 1_011);

    let short = UserService::new(&store).with_latest_limit(3);
    assert_eq!(short.latest_topics(&alice).unwrap().len(), 3);

    let carol = register(&store, "carol");
    assert!(users.latest_topics(&carol).unwrap().is_empty());
}

#[test]
fn latest_replies_only_include_topic_comments() {
    let conn = open_db_in_memory().unwrap();
    let store = store(&conn);
    let alice = register(&store, "alice");
    let bob = register(&store, "bob");
    let node = general(&store);
    let topic = post_topic(&store, &node, &alice, "Topic");
    let category = TaxonomyService::new(&store)
        .create_article_category("News")
        .unwrap();
    let article: Article = ContentService::new(&store)
        .create_article(NewArticle {
            category: Ref::of(&category),
            title: "Article".to_string(),
            markdown: "body".to_string(),
            author: Ref::of(&alice),
            original: None,
        })
        .unwrap();

    let comments = CommentService::new(&store);
    for content_id in [topic.id, article.id, topic.id] {
        comments
            .add_comment(NewComment {
                content_id,
                markdown: "reply".to_string(),
                author: Ref::of(&bob),
            })
            .unwrap();
    }

    let replies = UserService::new(&store).latest_replies(&bob).unwrap();
    assert_eq!(replies.len(), 2);
    assert!(replies
        .iter()
        .all(|comment| comment.kind == ContentKind::Topic && comment.content_id == topic.id));
    assert!(UserService::new(&store)
        .latest_replies(&alice)
        .unwrap()
        .is_empty());
}

#[test]
fn updater_is_absent_until_edited_and_edit_requires_permission() {
    let conn = open_db_in_memory().unwrap();
    let store = store(&conn);
    let alice = register(&store, "alice");
    register(&store, "bob");
    let root = superuser(&store, "root");
    let node = general(&store);
    let topic = post_topic(&store, &node, &alice, "Draft");

    let contents = ContentService::new(&store);
    assert!(contents.updater(&topic.content).unwrap().is_none());

    let err = contents
        .edit::<Topic>(topic.id, "bob", "Hijacked", "nope")
        .unwrap_err();
    assert!(matches!(err, ModelError::Denied { .. }));
    let err = contents
        .edit::<Topic>(topic.id, "ghost", "Hijacked", "nope")
        .unwrap_err();
    assert!(matches!(err, ModelError::Denied { .. }));

    let edited = contents
        .edit::<Topic>(topic.id, "root", "Final", "use `new`")
        .unwrap();
    assert_eq!(edited.content.title, "Final");
    assert_eq!(edited.content.html, "<p>use <code>new</code></p>");
    assert_eq!(edited.content.created_by.id(), alice.id);
    assert_eq!(contents.updater(&edited.content).unwrap().unwrap().id, root.id);

    let err = contents
        .edit::<Topic>(topic.id, "alice", "  ", "blank title")
        .unwrap_err();
    assert!(matches!(err, ModelError::Validation(_)));
}

#[test]
fn missing_creator_and_dangling_replier_degrade_differently() {
    let conn = open_db_in_memory().unwrap();
    let store = store(&conn);
    let alice = register(&store, "alice");
    let node = general(&store);
    let topic = post_topic(&store, &node, &alice, "Ghosts");

    let ghost = LatestReply {
        replier: Ref::new(uuid::Uuid::new_v4()),
        replied_at: 42,
    };
    let update = Update::new().set("latest_reply", serde_json::to_value(ghost).unwrap());
    let topic: Topic = store.update_doc(topic.id, &update).unwrap().unwrap();

    let contents = ContentService::new(&store);
    assert!(contents.latest_replier(&topic).unwrap().is_none());

    assert!(store.delete_doc::<User>(alice.id).unwrap());
    assert!(contents.creator(&topic.content).unwrap_err().is_not_found());
}

#[test]
fn comments_keep_store_order_and_ascending_sorts_by_time() {
    let conn = open_db_in_memory().unwrap();
    let store = store(&conn);
    let alice = register(&store, "alice");
    let node = general(&store);
    let topic = post_topic(&store, &node, &alice, "Thread");

    for at in [30, 10, 20] {
        let comment = forum_core::Comment::new(
            ContentKind::Topic,
            topic.id,
            format!("at {at}"),
            Ref::of(&alice),
            at,
        );
        store.insert_doc(&comment).unwrap();
    }

    let contents = ContentService::new(&store);
    let stored: Vec<i64> = contents
        .comments(topic.id)
        .unwrap()
        .iter()
        .map(|comment| comment.created_at)
        .collect();
    assert_eq!(stored, vec![30, 10, 20]);

    let ascending: Vec<i64> = contents
        .comments_ascending(topic.id)
        .unwrap()
        .iter()
        .map(|comment| comment.created_at)
        .collect();
    assert_eq!(ascending, vec![10, 20, 30]);
}

#[test]
fn topics_in_node_order_by_last_activity() {
    let conn = open_db_in_memory().unwrap();
    let store = store(&conn);
    let alice = register(&store, "alice");
    let node = general(&store);

    let quiet = Topic::new(Ref::of(&node), "quiet", "body", Ref::of(&alice), 100);
    let mut busy = Topic::new(Ref::of(&node), "busy", "body", Ref::of(&alice), 50);
    busy.latest_reply = Some(LatestReply {
        replier: Ref::of(&alice),
        replied_at: 500,
    });
    let fresh = Topic::new(Ref::of(&node), "fresh", "body", Ref::of(&alice), 200);
    for topic in [&quiet, &busy, &fresh] {
        store.insert_doc(topic).unwrap();
    }

    let titles: Vec<String> = TaxonomyService::new(&store)
        .topics_in_node(&node)
        .unwrap()
        .into_iter()
        .map(|topic| topic.content.title)
        .collect();
    assert_eq!(titles, vec!["busy", "fresh", "quiet"]);
}
