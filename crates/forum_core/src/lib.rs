//! Domain core for a community forum: users, topics, articles, sites,
//! packages, comments and site-wide counters over a document store.

pub mod config;
pub mod db;
pub mod logging;
pub mod markup;
pub mod model;
pub mod service;
pub mod store;

pub use config::{ConfigError, ForumConfig};
pub use db::{open_db, open_db_in_memory, DbError, DbResult};
pub use logging::{default_log_level, init_logging, logging_status, LoggingError};
pub use model::article::{Article, Attribution};
pub use model::comment::Comment;
pub use model::content::{AnyContent, Content, ContentId, ContentItem, ContentKind, Edited};
pub use model::id::{Collection, Document, EntityId, Ref};
pub use model::package::Package;
pub use model::site::Site;
pub use model::status::{Status, STATUS_ID};
pub use model::taxonomy::{ArticleCategory, Node, PackageCategory, SiteCategory, Taxonomy};
pub use model::topic::{LatestReply, Topic};
pub use model::user::{Profile, User, UserId};
pub use model::validation::ValidationError;
pub use service::comment_service::{CommentService, NewComment};
pub use service::content_service::{ContentService, NewArticle, NewPackage, NewSite, NewTopic};
pub use service::error::{ModelError, ModelResult};
pub use service::status_service::StatusService;
pub use service::taxonomy_service::TaxonomyService;
pub use service::user_service::{RegisterUser, UserService, LATEST_LIMIT};
pub use store::sqlite::SqliteDocumentStore;
pub use store::{
    DocumentStore, DocumentStoreExt, Filter, Query, StoreError, StoreResult, Update, UpdateOp,
};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
