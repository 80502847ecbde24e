//! Typed CRUD over one entity collection
//!
//! An [`EntityManager`] accumulates a filter and a result cap through
//! [`filter`](EntityManager::filter) and [`top`](EntityManager::top), then
//! performs exactly one round trip per terminal operation. Terminal
//! operations never modify the accumulated state.
//!
//! A manager is a per-request builder and is not meant to be shared
//! between threads; concurrent callers create one manager each over a
//! shared gateway.

use crate::error::{ODataError, ValidationError};
use crate::filter::{Q, Value};
use crate::http::{HttpGateway, Method, STATUS_CREATED, STATUS_NO_CONTENT, STATUS_OK};
use crate::query::{QUERY_ENCODE_SET, QueryParams, QuerySpec};
use percent_encoding::utf8_percent_encode;
use crate::schema::EntityDescriptor;
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::collections::BTreeMap;
use std::fmt;
use tracing::{debug, warn};

/// JSON key wrapping list responses
pub const LIST_KEY: &str = "value";

/// Result of a collection fetch
#[derive(Debug)]
pub struct Listing<M> {
    /// Valid items in response order
    pub items: Vec<M>,
    /// Items skipped in lenient mode, by zero-based response index
    pub invalid: BTreeMap<usize, ValidationError>,
}

impl<M> Listing<M> {
    pub fn is_complete(&self) -> bool {
        self.invalid.is_empty()
    }

    pub fn into_items(self) -> Vec<M> {
        self.items
    }
}

pub struct EntityManager<'a, M, G: HttpGateway + ?Sized> {
    descriptor: &'a EntityDescriptor<M>,
    gateway: &'a G,
    filter: Option<Q>,
    top: Option<u32>,
}

impl<'a, M, G> EntityManager<'a, M, G>
where
    M: DeserializeOwned,
    G: HttpGateway + ?Sized,
{
    pub fn new(descriptor: &'a EntityDescriptor<M>, gateway: &'a G) -> Self {
        EntityManager {
            descriptor,
            gateway,
            filter: None,
            top: None,
        }
    }

    /// AND the criteria onto any filter set so far
    pub fn filter(&mut self, criteria: Q) -> &mut Self {
        self.filter = Some(match self.filter.take() {
            Some(existing) => existing.and(&criteria),
            None => criteria,
        });
        self
    }

    /// [`filter`](Self::filter) with `field__operator__annotation` keys
    pub fn filter_lookups<I, K, V>(&mut self, pairs: I) -> Result<&mut Self, ODataError>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<Value>,
    {
        let criteria = Q::lookups(pairs)?;
        Ok(self.filter(criteria))
    }

    pub fn top(&mut self, n: u32) -> &mut Self {
        self.top = Some(n);
        self
    }

    pub fn current_filter(&self) -> Option<&Q> {
        self.filter.as_ref()
    }

    pub fn current_top(&self) -> Option<u32> {
        self.top
    }

    pub fn descriptor(&self) -> &EntityDescriptor<M> {
        self.descriptor
    }

    /// Collection path relative to the service root
    pub fn relative_url(&self) -> &str {
        self.descriptor.entity_name()
    }

    /// Single-resource path with the compiled `$select`
    pub fn canonical_url(&self, guid: &str) -> Result<String, ODataError> {
        Ok(format!("{}{}", self.resource_path(guid), self.select_params()?))
    }

    /// Compiled `$select`, `$filter` and `$top`
    pub fn query_params(&self) -> Result<QueryParams, ODataError> {
        let spec = QuerySpec::for_mapping(self.descriptor.mapping())
            .with_filter(self.filter.clone())
            .with_top(self.top);
        Ok(QueryParams::compile(&spec, self.descriptor.mapping())?)
    }

    pub fn query_string(&self) -> Result<String, ODataError> {
        Ok(self.query_params()?.encode())
    }

    /// Fetch the collection.
    ///
    /// Without `lenient`, the first item that fails validation aborts the
    /// call. With it, such items are skipped and reported in
    /// [`Listing::invalid`].
    pub fn all(&self, lenient: bool) -> Result<Listing<M>, ODataError> {
        let url = format!("{}{}", self.relative_url(), self.query_string()?);
        debug!(entity = self.descriptor.entity_name(), url = %url, "fetching collection");

        let response = self
            .gateway
            .request(Method::Get, &url, None)?
            .expect_status(STATUS_OK)?;
        let objects = match response.json()? {
            serde_json::Value::Object(mut envelope) => match envelope.remove(LIST_KEY) {
                Some(serde_json::Value::Array(objects)) => objects,
                _ => return Err(missing_list_key(&response.body)),
            },
            _ => return Err(missing_list_key(&response.body)),
        };

        let mut listing = Listing {
            items: Vec::with_capacity(objects.len()),
            invalid: BTreeMap::new(),
        };
        for (index, object) in objects.into_iter().enumerate() {
            match self.validate(object, Some(index)) {
                Ok(item) => listing.items.push(item),
                Err(e) if lenient => {
                    warn!(entity = self.descriptor.entity_name(), index, error = %e.source, "skipping invalid item");
                    listing.invalid.insert(index, e);
                }
                Err(e) => return Err(e.into()),
            }
        }
        Ok(listing)
    }

    /// Fetch one entity by guid
    pub fn get(&self, guid: &str) -> Result<M, ODataError> {
        let url = self.canonical_url(guid)?;
        let response = self
            .gateway
            .request(Method::Get, &url, None)?
            .expect_status(STATUS_OK)?;
        Ok(self.validate(response.json()?, None)?)
    }

    /// Post a new entity; `entity` is serialized with its wire aliases
    pub fn create<B: Serialize + ?Sized>(&self, entity: &B) -> Result<M, ODataError> {
        let body = serde_json::to_value(entity).map_err(ODataError::Encoding)?;
        let url = format!("{}{}", self.relative_url(), self.select_params()?);
        let response = self
            .gateway
            .request(Method::Post, &url, Some(&body))?
            .expect_status(STATUS_CREATED)?;
        Ok(self.validate(response.json()?, None)?)
    }

    /// Patch an existing entity
    pub fn update<B: Serialize + ?Sized>(&self, guid: &str, entity: &B) -> Result<M, ODataError> {
        let body = serde_json::to_value(entity).map_err(ODataError::Encoding)?;
        let url = self.canonical_url(guid)?;
        let response = self
            .gateway
            .request(Method::Patch, &url, Some(&body))?
            .expect_status(STATUS_OK)?;
        Ok(self.validate(response.json()?, None)?)
    }

    pub fn delete(&self, guid: &str) -> Result<(), ODataError> {
        self.gateway
            .request(Method::Delete, &self.resource_path(guid), None)?
            .expect_status(STATUS_NO_CONTENT)?;
        Ok(())
    }

    /// Quotes in the key are doubled, then anything outside the
    /// unreserved set is percent-encoded so it cannot end the path.
    fn resource_path(&self, guid: &str) -> String {
        let key = guid.replace('\'', "''");
        format!(
            "{}(guid'{}')",
            self.relative_url(),
            utf8_percent_encode(&key, QUERY_ENCODE_SET)
        )
    }

    fn select_params(&self) -> Result<String, ODataError> {
        let spec = QuerySpec::for_mapping(self.descriptor.mapping());
        Ok(QueryParams::compile(&spec, self.descriptor.mapping())?.encode())
    }

    fn validate(
        &self,
        object: serde_json::Value,
        index: Option<usize>,
    ) -> Result<M, ValidationError> {
        serde_json::from_value(object).map_err(|source| ValidationError {
            entity: self.descriptor.entity_name().to_string(),
            index,
            source,
        })
    }
}

impl<M, G: HttpGateway + ?Sized> fmt::Display for EntityManager<'_, M, G> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} manager", self.descriptor.entity_name())
    }
}

fn missing_list_key(body: &str) -> ODataError {
    ODataError::Decoding(format!(
        "Response json has no '{LIST_KEY}' list. Response: {body}"
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::HttpResponse;
    use crate::schema::{FieldMapping, RawEntity};
    use std::cell::RefCell;

    #[derive(Default)]
    struct RecordingGateway {
        urls: RefCell<Vec<String>>,
    }

    impl HttpGateway for RecordingGateway {
        fn request(
            &self,
            _method: Method,
            relative_url: &str,
            _body: Option<&serde_json::Value>,
        ) -> Result<HttpResponse, ODataError> {
            self.urls.borrow_mut().push(relative_url.to_string());
            Ok(HttpResponse::new(200, "OK", r#"{"value": []}"#))
        }
    }

    fn descriptor() -> EntityDescriptor<RawEntity> {
        EntityDescriptor::new(
            "Catalog_Products",
            FieldMapping::new()
                .field("width", "Width")
                .field("length", "Length"),
        )
    }

    #[test]
    fn test_filter_accumulates_with_and() {
        let descriptor = descriptor();
        let gateway = RecordingGateway::default();
        let mut manager = EntityManager::new(&descriptor, &gateway);
        manager
            .filter(Q::lookup("width__gt", 50).unwrap())
            .filter(Q::lookup("length", 500).unwrap());
        assert_eq!(
            manager.current_filter().unwrap().to_string(),
            "width gt 50 and length eq 500"
        );
    }

    #[test]
    fn test_terminal_operations_do_not_mutate_state() {
        let descriptor = descriptor();
        let gateway = RecordingGateway::default();
        let mut manager = EntityManager::new(&descriptor, &gateway);
        manager.filter_lookups([("width", 1)]).unwrap().top(3);

        manager.all(false).unwrap();
        manager.all(false).unwrap();

        let urls = gateway.urls.borrow();
        assert_eq!(urls[0], urls[1]);
        assert_eq!(manager.current_top(), Some(3));
    }

    #[test]
    fn test_display_names_entity() {
        let descriptor = descriptor();
        let gateway = RecordingGateway::default();
        let manager = EntityManager::new(&descriptor, &gateway);
        assert_eq!(manager.to_string(), "Catalog_Products manager");
    }

    #[test]
    fn test_resource_key_is_escaped() {
        let descriptor = descriptor();
        let gateway = RecordingGateway::default();
        let manager = EntityManager::new(&descriptor, &gateway);
        assert_eq!(
            manager.resource_path("6f9619ff-8b86-d011"),
            "Catalog_Products(guid'6f9619ff-8b86-d011')"
        );
        assert_eq!(
            manager.resource_path("a'b?c#d"),
            "Catalog_Products(guid'a%27%27b%3Fc%23d')"
        );
    }

    #[test]
    fn test_canonical_url_uses_select_only() {
        let descriptor = descriptor();
        let gateway = RecordingGateway::default();
        let mut manager = EntityManager::new(&descriptor, &gateway);
        manager.top(1);
        assert_eq!(
            manager.canonical_url("42").unwrap(),
            "Catalog_Products(guid'42')?%24select=Width%2C%20Length"
        );
    }
}
