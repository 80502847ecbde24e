use crate::filter::FilterError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::marker::PhantomData;

/// Untyped wire dictionary, usable as an entity model when no typed
/// struct exists for an entity.
pub type RawEntity = serde_json::Map<String, serde_json::Value>;

/// One declared field of an entity
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Field {
    /// Logical name used in lookups
    pub name: String,
    /// Wire name; the logical name is used when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alias: Option<String>,
    /// Fields of a nested entity, expanded one level in `$select`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nested: Option<FieldMapping>,
}

impl Field {
    pub fn wire_name(&self) -> &str {
        self.alias.as_deref().unwrap_or(&self.name)
    }
}

/// Ordered mapping from logical field names to wire aliases
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FieldMapping {
    fields: Vec<Field>,
}

impl FieldMapping {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare a field with a wire alias
    pub fn field(mut self, name: impl Into<String>, alias: impl Into<String>) -> Self {
        self.fields.push(Field {
            name: name.into(),
            alias: Some(alias.into()),
            nested: None,
        });
        self
    }

    /// Declare a field whose wire name equals its logical name
    pub fn plain(mut self, name: impl Into<String>) -> Self {
        self.fields.push(Field {
            name: name.into(),
            alias: None,
            nested: None,
        });
        self
    }

    /// Declare a field holding a nested entity
    pub fn nested(
        mut self,
        name: impl Into<String>,
        alias: impl Into<String>,
        nested: FieldMapping,
    ) -> Self {
        self.fields.push(Field {
            name: name.into(),
            alias: Some(alias.into()),
            nested: Some(nested),
        });
        self
    }

    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn names(&self) -> Vec<String> {
        self.fields.iter().map(|f| f.name.clone()).collect()
    }

    /// Wire alias for a logical field name
    pub fn resolve(&self, name: &str) -> Result<&str, FilterError> {
        self.fields
            .iter()
            .find(|f| f.name == name)
            .map(Field::wire_name)
            .ok_or_else(|| FilterError::UnknownField {
                field: name.to_string(),
                valid: self.names(),
            })
    }

    /// `$select` paths in declaration order, nested entities expanded once
    pub fn select_paths(&self) -> Vec<String> {
        let mut paths = Vec::new();
        for field in &self.fields {
            match &field.nested {
                Some(nested) if !nested.is_empty() => {
                    for inner in &nested.fields {
                        paths.push(format!("{}/{}", field.wire_name(), inner.wire_name()));
                    }
                }
                _ => paths.push(field.wire_name().to_string()),
            }
        }
        paths
    }
}

/// Immutable pairing of an entity's wire name with its schema.
///
/// `M` is the model the entity is decoded into; its serde field renames
/// are expected to agree with the mapping's aliases.
pub struct EntityDescriptor<M> {
    entity_name: String,
    mapping: FieldMapping,
    _model: PhantomData<fn() -> M>,
}

impl<M> EntityDescriptor<M> {
    pub fn new(entity_name: impl Into<String>, mapping: FieldMapping) -> Self {
        EntityDescriptor {
            entity_name: entity_name.into(),
            mapping,
            _model: PhantomData,
        }
    }

    pub fn entity_name(&self) -> &str {
        &self.entity_name
    }

    pub fn mapping(&self) -> &FieldMapping {
        &self.mapping
    }
}

impl<M> Clone for EntityDescriptor<M> {
    fn clone(&self) -> Self {
        EntityDescriptor::new(self.entity_name.clone(), self.mapping.clone())
    }
}

impl<M> fmt::Debug for EntityDescriptor<M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EntityDescriptor")
            .field("entity_name", &self.entity_name)
            .field("mapping", &self.mapping)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn product_mapping() -> FieldMapping {
        FieldMapping::new()
            .field("id", "Ref_Key")
            .plain("Description")
            .nested(
                "owner",
                "Owner",
                FieldMapping::new().field("id", "Ref_Key").plain("Code"),
            )
    }

    #[test]
    fn test_resolve_alias_and_plain() {
        let mapping = product_mapping();
        assert_eq!(mapping.resolve("id").unwrap(), "Ref_Key");
        assert_eq!(mapping.resolve("Description").unwrap(), "Description");
    }

    #[test]
    fn test_resolve_unknown_lists_valid_fields() {
        let err = product_mapping().resolve("price").unwrap_err();
        assert_eq!(
            err.to_string(),
            "Field 'price' not found. Use one of [\"id\", \"Description\", \"owner\"]"
        );
    }

    #[test]
    fn test_select_paths_expand_nested_once() {
        assert_eq!(
            product_mapping().select_paths(),
            vec!["Ref_Key", "Description", "Owner/Ref_Key", "Owner/Code"]
        );
    }

    #[test]
    fn test_mapping_deserializes_from_field_list() {
        let raw = r#"
            fields = [
                { name = "id", alias = "Ref_Key" },
                { name = "owner", alias = "Owner", nested = [{ name = "Code" }] },
            ]
        "#;

        #[derive(Deserialize)]
        struct Wrapper {
            fields: FieldMapping,
        }

        let wrapper: Wrapper = toml::from_str(raw).unwrap();
        assert_eq!(wrapper.fields.select_paths(), vec!["Ref_Key", "Owner/Code"]);
    }
}
