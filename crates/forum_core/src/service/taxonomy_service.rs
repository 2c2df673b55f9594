//! Taxonomy use-cases: nodes and categories.
//!
//! # Responsibility
//! - Create, list, look up and delete taxonomy entities.
//! - Enumerate members and repair denormalized member counts.
//!
//! # Invariants
//! - Slugs of nodes and package categories are unique per collection.
//! - Deleting a taxonomy entity leaves its members in place; their owner
//!   references dangle.

use crate::model::article::Article;
use crate::model::id::{Collection, EntityId, Ref};
use crate::model::package::Package;
use crate::model::site::Site;
use crate::model::taxonomy::{ArticleCategory, Node, PackageCategory, SiteCategory, Taxonomy};
use crate::model::topic::Topic;
use crate::service::error::{ModelError, ModelResult};
use crate::store::{DocumentStore, DocumentStoreExt, Filter, Query, Update};
use log::info;

pub struct TaxonomyService<S: DocumentStore> {
    store: S,
}

impl<S: DocumentStore> TaxonomyService<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Creates a node.
    ///
    /// # Errors
    /// - `SlugTaken` when another node uses the slug.
    pub fn create_node(&self, slug: &str, name: &str, description: &str) -> ModelResult<Node> {
        self.ensure_slug_free::<Node>(slug)?;
        let node = Node {
            description: description.to_string(),
            ..Node::new(slug, name)
        };
        self.create(node)
    }

    pub fn create_site_category(&self, name: &str) -> ModelResult<SiteCategory> {
        self.create(SiteCategory::new(name))
    }

    pub fn create_article_category(&self, name: &str) -> ModelResult<ArticleCategory> {
        self.create(ArticleCategory::new(name))
    }

    pub fn create_package_category(
        &self,
        slug: &str,
        name: &str,
    ) -> ModelResult<PackageCategory> {
        self.ensure_slug_free::<PackageCategory>(slug)?;
        self.create(PackageCategory::new(slug, name))
    }

    pub fn get<T: Taxonomy>(&self, id: EntityId) -> ModelResult<T> {
        self.store
            .load::<T>(id)?
            .ok_or_else(|| ModelError::not_found(T::COLLECTION, id))
    }

    /// Every entity of kind `T`, in creation order.
    pub fn list<T: Taxonomy>(&self) -> ModelResult<Vec<T>> {
        Ok(self.store.find_as::<T>(Query::new(Filter::new()))?)
    }

    pub fn node_by_slug(&self, slug: &str) -> ModelResult<Node> {
        self.by_slug::<Node>(slug)?
            .ok_or_else(|| ModelError::not_found(Collection::Nodes, slug))
    }

    pub fn package_category_by_slug(&self, slug: &str) -> ModelResult<PackageCategory> {
        self.by_slug::<PackageCategory>(slug)?
            .ok_or_else(|| ModelError::not_found(Collection::PackageCategories, slug))
    }

    /// Member items of `owner`, in store order.
    pub fn members<T: Taxonomy>(&self, owner: &T) -> ModelResult<Vec<T::Member>> {
        let filter = Filter::new().eq_id(T::MEMBER_PATH, owner.id());
        Ok(self.store.find_as::<T::Member>(Query::new(filter))?)
    }

    pub fn sites(&self, category: &SiteCategory) -> ModelResult<Vec<Site>> {
        self.members(category)
    }

    pub fn articles(&self, category: &ArticleCategory) -> ModelResult<Vec<Article>> {
        self.members(category)
    }

    pub fn packages(&self, category: &PackageCategory) -> ModelResult<Vec<Package>> {
        self.members(category)
    }

    /// Topics of `node`, most recent activity first.
    pub fn topics_in_node(&self, node: &Node) -> ModelResult<Vec<Topic>> {
        let mut topics = self.members(node)?;
        topics.sort_by_key(|topic| std::cmp::Reverse(topic.last_activity_at()));
        Ok(topics)
    }

    /// Rewrites the denormalized member count from enumeration.
    ///
    /// Returns the counted number; entities without a count are left as is.
    pub fn recount<T: Taxonomy>(&self, id: EntityId) -> ModelResult<u64> {
        let owner = self.get::<T>(id)?;
        let filter = Filter::new().eq_id(T::MEMBER_PATH, owner.id());
        let count = self.store.count_as::<T::Member>(filter)?;

        if let Some(count_path) = T::COUNT_PATH {
            self.store
                .update_doc::<T>(id, &Update::new().set(count_path, count))?
                .ok_or_else(|| ModelError::not_found(T::COLLECTION, id))?;
        }
        Ok(count)
    }

    pub fn recount_node(&self, node: Ref<Node>) -> ModelResult<u64> {
        self.recount::<Node>(node.id())
    }

    pub fn recount_package_category(&self, category: Ref<PackageCategory>) -> ModelResult<u64> {
        self.recount::<PackageCategory>(category.id())
    }

    /// Deletes the entity; members keep their now dangling reference.
    pub fn delete<T: Taxonomy>(&self, id: EntityId) -> ModelResult<()> {
        if !self.store.delete_doc::<T>(id)? {
            return Err(ModelError::not_found(T::COLLECTION, id));
        }
        info!(
            "event=taxonomy_delete module=service status=ok collection={} id={id}",
            T::COLLECTION
        );
        Ok(())
    }

    pub fn delete_node(&self, node: Ref<Node>) -> ModelResult<()> {
        self.delete::<Node>(node.id())
    }

    fn create<T: Taxonomy>(&self, entity: T) -> ModelResult<T> {
        entity.validate()?;
        self.store.insert_doc(&entity)?;
        info!(
            "event=taxonomy_create module=service status=ok collection={} id={}",
            T::COLLECTION,
            entity.id()
        );
        Ok(entity)
    }

    fn by_slug<T: Taxonomy>(&self, slug: &str) -> ModelResult<Option<T>> {
        let query = Query {
            limit: Some(1),
            ..Query::new(Filter::new().eq("slug", slug))
        };
        Ok(self.store.find_as::<T>(query)?.into_iter().next())
    }

    fn ensure_slug_free<T: Taxonomy>(&self, slug: &str) -> ModelResult<()> {
        if self.by_slug::<T>(slug)?.is_some() {
            return Err(ModelError::SlugTaken(slug.to_string()));
        }
        Ok(())
    }
}
