//! Resource CRUD semantics: loosely-shaped `get`/`post` calls translated into
//! concrete provider operations and paginated response documents.

use crate::args::{clamp_limit, clamp_offset, display_id, Fields, Selection, Where};
use crate::error::{AppError, ConfigError};
use crate::label::LabelPair;
use crate::provider::{Provider, ProviderSource};
use crate::registry::ServiceRegistry;
use crate::response::{Document, Links};
use crate::service::QueryDescriptor;
use serde_json::{Map, Value};
use std::fmt;
use std::sync::{Arc, Weak};

/// Page size applied when a `get` call carries no usable limit.
pub const DEFAULT_PAGE_SIZE: usize = 10;

/// One resource's service: a label pair, a bound provider, and a handle back to
/// the registry for cross-resource relation lookups.
pub struct ResourceService {
    labels: LabelPair,
    provider: Arc<dyn Provider>,
    registry: Weak<ServiceRegistry>,
    page_size: usize,
}

impl fmt::Debug for ResourceService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResourceService")
            .field("resource", &self.labels.plural)
            .field("endpoint", &self.provider.endpoint())
            .field("page_size", &self.page_size)
            .finish_non_exhaustive()
    }
}

impl ResourceService {
    pub(crate) fn new(
        resource: &str,
        source: &ProviderSource,
        endpoint: Option<&str>,
        registry: Weak<ServiceRegistry>,
    ) -> Result<ResourceService, AppError> {
        let labels = LabelPair::derive(resource)?;
        let provider = source.resolve(resource, endpoint)?;
        Ok(ResourceService {
            labels,
            provider,
            registry,
            page_size: DEFAULT_PAGE_SIZE,
        })
    }

    /// Service without a registry. Relation clauses fail on such a service;
    /// everything else works.
    pub fn standalone(resource: &str, source: &ProviderSource) -> Result<ResourceService, AppError> {
        Self::new(resource, source, None, Weak::new())
    }

    pub fn labels(&self) -> &LabelPair {
        &self.labels
    }

    pub fn endpoint(&self) -> String {
        self.provider.endpoint()
    }

    /// Read one object, a subset of objects by id, or a filtered page.
    ///
    /// Id-shaped targets resolve directly; filter-shaped targets go through the
    /// provider's `find`. A single-object read with exactly one requested field
    /// returns the bare attribute value.
    pub async fn get(
        &self,
        target: Where,
        fields: Fields,
        limit: Option<i64>,
        offset: Option<i64>,
        sort: Option<String>,
    ) -> Result<Document, AppError> {
        let offset = clamp_offset(offset);
        let mut limit = clamp_limit(limit, self.page_size);
        let fields = fields.normalize();
        let (selection, forced) = target.normalize();
        if let Some(n) = forced {
            limit = n;
        }

        let (ids, filter) = match selection {
            Selection::Ids(ids) => {
                let mut filter = Map::new();
                filter.insert("id".to_string(), Value::Array(ids.clone()));
                (ids, filter)
            }
            Selection::Filter(filter) => {
                let ids = self
                    .provider
                    .find(&filter, limit, offset, sort.as_deref())
                    .await?;
                if ids.is_empty() {
                    return Err(AppError::NotFound(format!(
                        "no {} matched the query",
                        self.labels.plural
                    )));
                }
                (ids, filter)
            }
        };
        tracing::debug!(resource = %self.labels.plural, ids = ids.len(), limit, offset, "get");

        let descriptor = QueryDescriptor {
            filter,
            fields: fields.clone(),
            limit,
            offset,
            sort,
        };

        if limit == 1 {
            let id = &ids[0];
            if fields.len() == 1 {
                let value = self.provider.get_attr(id, &fields[0]).await?;
                return Ok(Document::new(value));
            }
            let object = self.provider.get(id, &fields).await?;
            let links = self.page_links(&descriptor).await?;
            return Ok(Document::with_links(object, links));
        }

        let objects = self.provider.fetch(&ids, &fields).await?;
        let links = self.page_links(&descriptor).await?;
        Ok(Document::with_links(Value::Array(objects), links))
    }

    /// Write: create objects (optionally wiring relations to peer resources),
    /// or update attributes on existing objects when `fields` is non-empty.
    pub async fn post(
        &self,
        payload: Value,
        target: Where,
        fields: Fields,
    ) -> Result<Document, AppError> {
        let fields = fields.normalize();
        if fields.is_empty() {
            self.create(payload, target).await
        } else {
            self.update_attributes(payload, target, &fields).await
        }
    }

    /// Prev/next cursor links against the provider's total count for the
    /// descriptor's filter.
    async fn page_links(&self, d: &QueryDescriptor) -> Result<Option<Links>, AppError> {
        let count = self.provider.count(&d.filter).await? as usize;
        let endpoint = self.provider.endpoint();
        let next = {
            let candidate = d.offset + d.limit;
            if candidate >= count {
                None
            } else {
                Some(format!("{}?{}", endpoint, d.query_string(candidate)))
            }
        };
        let prev = {
            let candidate = d.offset as i64 - d.limit as i64;
            // A previous page exists only if stepping back a full page still
            // leaves a non-empty earlier window.
            if d.limit as i64 + candidate <= 0 {
                None
            } else {
                Some(format!(
                    "{}?{}",
                    endpoint,
                    d.query_string(candidate.max(0) as usize)
                ))
            }
        };
        Ok(Links::non_empty(prev, next))
    }

    async fn update_attributes(
        &self,
        payload: Value,
        target: Where,
        fields: &[String],
    ) -> Result<Document, AppError> {
        if target.is_none() {
            return Err(AppError::BadRequest(
                "a target id or filter is required to update attributes".into(),
            ));
        }
        let (selection, _) = target.normalize();
        let ids = match selection {
            Selection::Ids(ids) => {
                for id in &ids {
                    if !self.provider.exists(id).await? {
                        return Err(AppError::NotFound(format!(
                            "{} `{}` does not exist",
                            self.labels.singular,
                            display_id(id)
                        )));
                    }
                }
                ids
            }
            Selection::Filter(filter) => {
                if filter.is_empty() {
                    return Err(AppError::BadRequest(
                        "a target id or filter is required to update attributes".into(),
                    ));
                }
                self.provider.find(&filter, usize::MAX, 0, None).await?
            }
        };
        if ids.is_empty() {
            return Err(AppError::NotFound(format!(
                "no {} matched the query",
                self.labels.plural
            )));
        }
        tracing::debug!(resource = %self.labels.plural, ids = ids.len(), fields = fields.len(), "update attributes");

        // Single id, single field: an object payload exposing that field
        // unwraps to the bare value; anything else is the value itself.
        if ids.len() == 1 && fields.len() == 1 {
            let field = &fields[0];
            let value = match payload {
                Value::Object(mut m) if m.contains_key(field) => m.remove(field).unwrap_or(Value::Null),
                other => other,
            };
            self.provider.add_attr(&ids[0], field, value).await?;
            return Ok(Document::new(Value::Array(ids)));
        }

        let attrs = match payload {
            Value::Object(m) => m,
            _ => return Err(AppError::BadRequest("payload must be an object".into())),
        };
        let mut names: Vec<&str> = attrs.keys().map(String::as_str).collect();
        names.sort_unstable();
        let mut wanted: Vec<&str> = fields.iter().map(String::as_str).collect();
        wanted.sort_unstable();
        if names != wanted {
            return Err(AppError::BadRequest(
                "fields must match payload attributes".into(),
            ));
        }

        for id in &ids {
            for (k, v) in &attrs {
                self.provider.add_attr(id, k, v.clone()).await?;
            }
        }
        Ok(Document::new(Value::Array(ids)))
    }

    async fn create(&self, payload: Value, target: Where) -> Result<Document, AppError> {
        let (mut objects, single) = split_payload(payload)?;

        let mut relations: Vec<(String, Value)> = Vec::new();
        let mut assigned: Vec<Value> = Vec::new();
        match target {
            Where::None => {}
            Where::Filter(map) => {
                // Relation clause: each key names a peer resource. A literal
                // `id` key would be ambiguous with the positional form.
                if map.contains_key("id") {
                    return Err(ConfigError::AmbiguousRelationKey.into());
                }
                for (name, selector) in map {
                    let peer = self.peer(&name)?;
                    let related = peer.lookup_id(selector).await?;
                    relations.push((name, related));
                }
            }
            other => match other.normalize() {
                (Selection::Ids(ids), _) => assigned = ids,
                (Selection::Filter(_), _) => {
                    return Err(AppError::BadRequest(
                        "where must be a relation clause or id list".into(),
                    ))
                }
            },
        }

        // Pre-assigned id batches: one id per object, pairwise-consistent with
        // any ids the payload objects already carry.
        if !assigned.is_empty() {
            if assigned.len() != objects.len() {
                return Err(AppError::BadRequest(
                    "where must list one id per payload object".into(),
                ));
            }
            for (obj, id) in objects.iter_mut().zip(&assigned) {
                match obj.get("id") {
                    Some(own) if own != id => {
                        return Err(AppError::BadRequest(
                            "payload ids must match where ids".into(),
                        ))
                    }
                    Some(_) => {}
                    None => {
                        obj.insert("id".to_string(), id.clone());
                    }
                }
            }
        }

        // Duplicate-create guard.
        for obj in &objects {
            if let Some(id) = obj.get("id") {
                if self.provider.exists(id).await? {
                    return Err(AppError::Conflict(format!(
                        "{} `{}` already exists",
                        self.labels.singular,
                        display_id(id)
                    )));
                }
            }
        }

        let mut created = Vec::with_capacity(objects.len());
        let mut created_ids = Vec::with_capacity(objects.len());
        for mut obj in objects {
            for (name, related) in &relations {
                obj.insert(name.clone(), Value::Array(vec![related.clone()]));
            }
            let stored = self.provider.add(obj).await?;
            if let Some(id) = stored.get("id") {
                created_ids.push(id.clone());
            }
            created.push(stored);
        }
        tracing::debug!(resource = %self.labels.plural, created = created.len(), "create");

        // Reverse fan-out: register the new ids on each related peer object,
        // exactly once per named relation.
        for (name, related) in &relations {
            let peer = self.peer(name)?;
            tracing::debug!(resource = %self.labels.plural, peer = %name, "relation fan-out");
            Box::pin(peer.post(
                Value::Array(created_ids.clone()),
                Where::Ids(vec![related.clone()]),
                Fields::One(self.labels.plural.clone()),
            ))
            .await?;
        }

        let data = if single {
            created.into_iter().next().unwrap_or(Value::Null)
        } else {
            Value::Array(created)
        };
        Ok(Document::new(data))
    }

    /// Resolve a relation selector on this resource to a concrete id.
    pub(crate) async fn lookup_id(&self, selector: Value) -> Result<Value, AppError> {
        match selector {
            Value::Object(map) => {
                let ids = self.provider.find(&map, 1, 0, None).await?;
                ids.into_iter().next().ok_or_else(|| {
                    AppError::NotFound(format!(
                        "no {} matched the relation clause",
                        self.labels.singular
                    ))
                })
            }
            id => {
                if !self.provider.exists(&id).await? {
                    return Err(AppError::NotFound(format!(
                        "{} `{}` does not exist",
                        self.labels.singular,
                        display_id(&id)
                    )));
                }
                Ok(id)
            }
        }
    }

    fn peer(&self, name: &str) -> Result<Arc<ResourceService>, AppError> {
        let registry = self.registry.upgrade().ok_or(ConfigError::RegistryGone)?;
        registry.get(name)
    }
}

fn split_payload(payload: Value) -> Result<(Vec<Map<String, Value>>, bool), AppError> {
    match payload {
        Value::Object(m) => Ok((vec![m], true)),
        Value::Array(items) => {
            if items.is_empty() {
                return Err(AppError::BadRequest("payload must not be empty".into()));
            }
            let mut out = Vec::with_capacity(items.len());
            for item in items {
                match item {
                    Value::Object(m) => out.push(m),
                    _ => {
                        return Err(AppError::BadRequest(
                            "payload must be object or array of objects".into(),
                        ))
                    }
                }
            }
            Ok((out, false))
        }
        _ => Err(AppError::BadRequest(
            "payload must be object or array of objects".into(),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::{MemoryProvider, MemoryProviderFactory};
    use crate::registry::RegistryBuilder;
    use async_trait::async_trait;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn registry() -> Arc<ServiceRegistry> {
        RegistryBuilder::new()
            .default_provider(Arc::new(MemoryProviderFactory::default()))
            .build()
            .unwrap()
    }

    async fn seed(svc: &ResourceService, n: usize) {
        for i in 0..n {
            svc.post(json!({"name": format!("item-{}", i)}), Where::None, Fields::None)
                .await
                .unwrap();
        }
    }

    #[tokio::test]
    async fn create_then_get_round_trip() {
        let posts = registry().get("posts").unwrap();
        let created = posts
            .post(json!({"name": "a"}), Where::None, Fields::None)
            .await
            .unwrap();
        let id = created.data["id"].clone();
        assert!(!id.is_null());

        let read = posts
            .get(Where::Id(id), Fields::None, None, None, None)
            .await
            .unwrap();
        assert_eq!(read.data["name"], json!("a"));
    }

    #[tokio::test]
    async fn debug_output_names_the_resource() {
        let posts = registry().get("posts").unwrap();
        let repr = format!("{:?}", posts);
        assert!(repr.contains("ResourceService"));
        assert!(repr.contains("posts"));
    }

    #[tokio::test]
    async fn single_and_batch_get_agree_on_data() {
        let posts = registry().get("posts").unwrap();
        let id = posts
            .post(json!({"name": "a"}), Where::None, Fields::None)
            .await
            .unwrap()
            .data["id"]
            .clone();

        let by_id = posts
            .get(Where::Id(id.clone()), Fields::None, None, None, None)
            .await
            .unwrap();
        let by_list = posts
            .get(Where::Ids(vec![id.clone()]), Fields::None, None, None, None)
            .await
            .unwrap();
        let by_raw = posts
            .get(Where::Raw(display_id(&id)), Fields::None, None, None, None)
            .await
            .unwrap();
        assert_eq!(by_id.data, by_list.data);
        assert_eq!(by_id.data, by_raw.data);
    }

    #[tokio::test]
    async fn single_field_get_returns_bare_attribute() {
        let posts = registry().get("posts").unwrap();
        let id = posts
            .post(json!({"name": "a"}), Where::None, Fields::None)
            .await
            .unwrap()
            .data["id"]
            .clone();
        let doc = posts
            .get(Where::Id(id), Fields::One("name".into()), None, None, None)
            .await
            .unwrap();
        assert_eq!(doc.data, json!("a"));
        assert!(doc.links.is_none());
    }

    #[tokio::test]
    async fn get_unknown_filter_is_not_found() {
        let posts = registry().get("posts").unwrap();
        seed(&posts, 3).await;
        let err = posts
            .get(
                Where::Filter([("name".to_string(), json!("missing"))].into_iter().collect()),
                Fields::None,
                None,
                None,
                None,
            )
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn pagination_links_follow_offset_window() {
        let posts = registry().get("posts").unwrap();
        seed(&posts, 25).await;

        let first = posts
            .get(Where::None, Fields::None, Some(10), Some(0), None)
            .await
            .unwrap();
        let links = first.links.unwrap();
        assert!(links.prev.is_none());
        assert_eq!(links.next.as_deref(), Some("/posts?limit=10&offset=10"));

        let middle = posts
            .get(Where::None, Fields::None, Some(10), Some(10), None)
            .await
            .unwrap();
        let links = middle.links.unwrap();
        assert_eq!(links.prev.as_deref(), Some("/posts?limit=10&offset=0"));
        assert_eq!(links.next.as_deref(), Some("/posts?limit=10&offset=20"));

        let last = posts
            .get(Where::None, Fields::None, Some(10), Some(20), None)
            .await
            .unwrap();
        let links = last.links.unwrap();
        assert_eq!(links.prev.as_deref(), Some("/posts?limit=10&offset=10"));
        assert!(links.next.is_none());
    }

    #[tokio::test]
    async fn exact_page_boundary_has_no_next() {
        let posts = registry().get("posts").unwrap();
        seed(&posts, 20).await;
        let doc = posts
            .get(Where::None, Fields::None, Some(10), Some(10), None)
            .await
            .unwrap();
        let links = doc.links.unwrap();
        assert!(links.next.is_none());
        assert!(links.prev.is_some());
    }

    #[tokio::test]
    async fn duplicate_create_conflicts() {
        let posts = registry().get("posts").unwrap();
        posts
            .post(json!({"id": 7, "name": "a"}), Where::None, Fields::None)
            .await
            .unwrap();
        let err = posts
            .post(json!({"id": 7, "name": "b"}), Where::None, Fields::None)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));
    }

    #[tokio::test]
    async fn batch_create_with_preassigned_ids() {
        let posts = registry().get("posts").unwrap();
        let created = posts
            .post(
                json!([{"name": "a"}, {"name": "b"}]),
                Where::Ids(vec![json!(10), json!(11)]),
                Fields::None,
            )
            .await
            .unwrap();
        assert_eq!(created.data[0]["id"], json!(10));
        assert_eq!(created.data[1]["id"], json!(11));

        let err = posts
            .post(
                json!([{"name": "c"}]),
                Where::Ids(vec![json!(20), json!(21)]),
                Fields::None,
            )
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::BadRequest(_)));

        let err = posts
            .post(
                json!([{"id": 30, "name": "d"}]),
                Where::Ids(vec![json!(31)]),
                Fields::None,
            )
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::BadRequest(_)));
    }

    #[tokio::test]
    async fn heterogeneous_payload_rejected() {
        let posts = registry().get("posts").unwrap();
        let err = posts
            .post(json!([{"name": "a"}, 5]), Where::None, Fields::None)
            .await
            .unwrap_err();
        match err {
            AppError::BadRequest(msg) => {
                assert_eq!(msg, "payload must be object or array of objects")
            }
            other => panic!("unexpected error {:?}", other),
        }
    }

    #[tokio::test]
    async fn attribute_update_requires_target() {
        let posts = registry().get("posts").unwrap();
        let err = posts
            .post(json!("x"), Where::None, Fields::One("name".into()))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::BadRequest(_)));
    }

    #[tokio::test]
    async fn attribute_update_single_target_unwraps_value() {
        let posts = registry().get("posts").unwrap();
        let id = posts
            .post(json!({"name": "a"}), Where::None, Fields::None)
            .await
            .unwrap()
            .data["id"]
            .clone();

        // Scalar payload.
        posts
            .post(
                json!("b"),
                Where::Ids(vec![id.clone()]),
                Fields::One("name".into()),
            )
            .await
            .unwrap();
        // Object payload exposing the field.
        posts
            .post(
                json!({"name": "c"}),
                Where::Ids(vec![id.clone()]),
                Fields::One("name".into()),
            )
            .await
            .unwrap();

        let doc = posts
            .get(Where::Id(id), Fields::One("name".into()), None, None, None)
            .await
            .unwrap();
        assert_eq!(doc.data, json!("c"));
    }

    #[tokio::test]
    async fn attribute_update_fields_must_match_payload() {
        let posts = registry().get("posts").unwrap();
        let a = posts
            .post(json!({"name": "a"}), Where::None, Fields::None)
            .await
            .unwrap()
            .data["id"]
            .clone();
        let b = posts
            .post(json!({"name": "b"}), Where::None, Fields::None)
            .await
            .unwrap()
            .data["id"]
            .clone();

        let err = posts
            .post(
                json!({"name": "x", "rank": 1}),
                Where::Ids(vec![a.clone(), b.clone()]),
                Fields::One("name".into()),
            )
            .await
            .unwrap_err();
        match err {
            AppError::BadRequest(msg) => assert_eq!(msg, "fields must match payload attributes"),
            other => panic!("unexpected error {:?}", other),
        }

        let affected = posts
            .post(
                json!({"name": "x", "rank": 1}),
                Where::Ids(vec![a.clone(), b.clone()]),
                Fields::Many(vec!["name".into(), "rank".into()]),
            )
            .await
            .unwrap();
        assert_eq!(affected.data, json!([a.clone(), b.clone()]));
        let read = posts
            .get(Where::Id(a), Fields::One("rank".into()), None, None, None)
            .await
            .unwrap();
        assert_eq!(read.data, json!(1));
    }

    #[tokio::test]
    async fn attribute_update_on_missing_id_is_not_found() {
        let posts = registry().get("posts").unwrap();
        let err = posts
            .post(
                json!("x"),
                Where::Ids(vec![json!(99)]),
                Fields::One("name".into()),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn relation_create_wires_both_sides() {
        let reg = registry();
        let posts = reg.get("posts").unwrap();
        let comments = reg.get("comments").unwrap();
        posts
            .post(json!({"id": 7, "name": "a post"}), Where::None, Fields::None)
            .await
            .unwrap();

        let comment = comments
            .post(
                json!({"text": "hi"}),
                Where::Filter([("posts".to_string(), json!(7))].into_iter().collect()),
                Fields::None,
            )
            .await
            .unwrap();
        assert_eq!(comment.data["posts"], json!([7]));

        let back = posts
            .get(
                Where::Id(json!(7)),
                Fields::One("comments".into()),
                None,
                None,
                None,
            )
            .await
            .unwrap();
        assert_eq!(back.data, json!([comment.data["id"].clone()]));
    }

    #[tokio::test]
    async fn relation_clause_rejects_literal_id_key() {
        let comments = registry().get("comments").unwrap();
        let err = comments
            .post(
                json!({"text": "hi"}),
                Where::Filter([("id".to_string(), json!(1))].into_iter().collect()),
                Fields::None,
            )
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            AppError::Config(ConfigError::AmbiguousRelationKey)
        ));
    }

    #[tokio::test]
    async fn relation_to_missing_peer_object_is_not_found() {
        let reg = registry();
        let _posts = reg.get("posts").unwrap();
        let comments = reg.get("comments").unwrap();
        let err = comments
            .post(
                json!({"text": "hi"}),
                Where::Filter([("posts".to_string(), json!(404))].into_iter().collect()),
                Fields::None,
            )
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    /// Counts `add_attr` calls so the fan-out cardinality is observable.
    struct SpyProvider {
        inner: MemoryProvider,
        add_attr_calls: AtomicUsize,
    }

    #[async_trait]
    impl Provider for SpyProvider {
        async fn find(
            &self,
            filter: &Map<String, Value>,
            limit: usize,
            offset: usize,
            sort: Option<&str>,
        ) -> Result<Vec<Value>, AppError> {
            self.inner.find(filter, limit, offset, sort).await
        }
        async fn fetch(&self, ids: &[Value], fields: &[String]) -> Result<Vec<Value>, AppError> {
            self.inner.fetch(ids, fields).await
        }
        async fn get(&self, id: &Value, fields: &[String]) -> Result<Value, AppError> {
            self.inner.get(id, fields).await
        }
        async fn get_attr(&self, id: &Value, field: &str) -> Result<Value, AppError> {
            self.inner.get_attr(id, field).await
        }
        async fn add(&self, object: Map<String, Value>) -> Result<Value, AppError> {
            self.inner.add(object).await
        }
        async fn add_attr(&self, id: &Value, field: &str, value: Value) -> Result<(), AppError> {
            self.add_attr_calls.fetch_add(1, Ordering::SeqCst);
            self.inner.add_attr(id, field, value).await
        }
        async fn exists(&self, id: &Value) -> Result<bool, AppError> {
            self.inner.exists(id).await
        }
        async fn count(&self, filter: &Map<String, Value>) -> Result<u64, AppError> {
            self.inner.count(filter).await
        }
        fn endpoint(&self) -> String {
            self.inner.endpoint()
        }
    }

    #[tokio::test]
    async fn fan_out_happens_once_per_relation() {
        let spy = Arc::new(SpyProvider {
            inner: MemoryProvider::new("/posts"),
            add_attr_calls: AtomicUsize::new(0),
        });
        let reg = RegistryBuilder::new()
            .default_provider(Arc::new(MemoryProviderFactory::default()))
            .service_provider("posts", spy.clone())
            .build()
            .unwrap();
        let posts = reg.get("posts").unwrap();
        let comments = reg.get("comments").unwrap();
        posts
            .post(json!({"id": 7}), Where::None, Fields::None)
            .await
            .unwrap();

        comments
            .post(
                json!([{"text": "a"}, {"text": "b"}]),
                Where::Filter([("posts".to_string(), json!(7))].into_iter().collect()),
                Fields::None,
            )
            .await
            .unwrap();
        // One fan-out call carrying both new ids, not one call per object.
        assert_eq!(spy.add_attr_calls.load(Ordering::SeqCst), 1);
        let attached = posts
            .get(
                Where::Id(json!(7)),
                Fields::One("comments".into()),
                None,
                None,
                None,
            )
            .await
            .unwrap();
        assert_eq!(attached.data.as_array().map(Vec::len), Some(2));
    }

    #[tokio::test]
    async fn standalone_service_cannot_resolve_peers() {
        let posts = ResourceService::standalone(
            "comments",
            &ProviderSource::Concrete(Arc::new(MemoryProvider::new("/comments"))),
        )
        .unwrap();
        let err = posts
            .post(
                json!({"text": "hi"}),
                Where::Filter([("posts".to_string(), json!(1))].into_iter().collect()),
                Fields::None,
            )
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Config(ConfigError::RegistryGone)));
    }
}
