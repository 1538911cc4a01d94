//! Actions describe one requested operation against a resource
//!
//! Every client call builds exactly one [`Action`] which the [`Fake`](crate::Fake)
//! records and hands to its reaction chain. Tests inspect the recorded actions to
//! assert what the code under test asked for.

use crate::field_selectors::FieldSelector;
use crate::label_selector::{self, parse_label_selector};
use crate::patch::PatchType;
use crate::tracker::{GVK, GVR};
use crate::Result;
use kube::api::ListParams;
use kube::core::{Selector, SelectorExt};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Verb {
    Get,
    List,
    Watch,
    Create,
    Update,
    Delete,
    DeleteCollection,
    Patch,
}

impl Verb {
    pub fn as_str(&self) -> &'static str {
        match self {
            Verb::Get => "get",
            Verb::List => "list",
            Verb::Watch => "watch",
            Verb::Create => "create",
            Verb::Update => "update",
            Verb::Delete => "delete",
            Verb::DeleteCollection => "delete-collection",
            Verb::Patch => "patch",
        }
    }
}

impl fmt::Display for Verb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Label and field restrictions carried by list, watch and delete-collection actions
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ListRestrictions {
    pub labels: Selector,
    pub fields: FieldSelector,
}

impl ListRestrictions {
    /// Parse the selectors out of list parameters; missing selectors match everything
    pub fn from_list_params(params: &ListParams) -> Result<Self> {
        let (labels, fields, _) = extract_from_list_params(params)?;
        Ok(Self {
            labels: labels.unwrap_or_else(label_selector::everything),
            fields: fields.unwrap_or_default(),
        })
    }

    pub fn matches_labels(&self, obj: &Value) -> bool {
        let labels = object_labels(obj);
        self.labels.matches(&labels)
    }

    /// Both selectors must match; unsupported field labels are an error
    pub fn matches(&self, obj: &Value) -> Result<bool> {
        Ok(self.matches_labels(obj) && self.fields.matches(obj)?)
    }
}

/// Parse label selector, field selector and resource version out of list parameters
///
/// Selectors that are absent or empty come back as `None`.
pub fn extract_from_list_params(
    params: &ListParams,
) -> Result<(Option<Selector>, Option<FieldSelector>, Option<String>)> {
    let labels = params
        .label_selector
        .as_deref()
        .filter(|s| !s.trim().is_empty())
        .map(parse_label_selector)
        .transpose()?;
    let fields = params
        .field_selector
        .as_deref()
        .filter(|s| !s.trim().is_empty())
        .map(FieldSelector::parse)
        .transpose()?;
    Ok((labels, fields, params.resource_version.clone()))
}

/// Labels of a JSON object, empty when it has none
pub fn object_labels(obj: &Value) -> BTreeMap<String, String> {
    obj.get("metadata")
        .and_then(|m| m.get("labels"))
        .and_then(Value::as_object)
        .map(|labels| {
            labels
                .iter()
                .filter_map(|(k, v)| v.as_str().map(|v| (k.clone(), v.to_string())))
                .collect()
        })
        .unwrap_or_default()
}

#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    /// Get and Delete address a single object by name
    Name(String),
    /// Create and Update carry the full object
    Object(Value),
    Patch {
        name: String,
        patch_type: PatchType,
        data: Vec<u8>,
    },
    /// List, Watch and DeleteCollection carry selectors
    Restrictions(ListRestrictions),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Action {
    pub verb: Verb,
    pub resource: GVR,
    /// Only set on list actions, which need the kind to build the list type
    pub kind: Option<GVK>,
    pub namespace: String,
    pub subresource: Option<String>,
    pub payload: Payload,
}

impl Action {
    fn new(verb: Verb, resource: GVR, namespace: &str, payload: Payload) -> Self {
        Self {
            verb,
            resource,
            kind: None,
            namespace: namespace.to_string(),
            subresource: None,
            payload,
        }
    }

    fn with_subresource(mut self, subresource: Option<&str>) -> Self {
        self.subresource = subresource
            .filter(|s| !s.is_empty())
            .map(str::to_string);
        self
    }

    pub fn get(resource: GVR, namespace: &str, name: &str) -> Self {
        Self::new(Verb::Get, resource, namespace, Payload::Name(name.to_string()))
    }

    pub fn get_subresource(resource: GVR, subresource: &str, namespace: &str, name: &str) -> Self {
        Self::get(resource, namespace, name).with_subresource(Some(subresource))
    }

    pub fn list(resource: GVR, kind: GVK, namespace: &str, params: &ListParams) -> Result<Self> {
        let restrictions = ListRestrictions::from_list_params(params)?;
        let mut action = Self::new(
            Verb::List,
            resource,
            namespace,
            Payload::Restrictions(restrictions),
        );
        action.kind = Some(kind);
        Ok(action)
    }

    pub fn watch(resource: GVR, namespace: &str, params: &ListParams) -> Result<Self> {
        let restrictions = ListRestrictions::from_list_params(params)?;
        Ok(Self::new(
            Verb::Watch,
            resource,
            namespace,
            Payload::Restrictions(restrictions),
        ))
    }

    pub fn create(resource: GVR, namespace: &str, object: Value) -> Self {
        Self::new(Verb::Create, resource, namespace, Payload::Object(object))
    }

    pub fn update(resource: GVR, namespace: &str, object: Value) -> Self {
        Self::new(Verb::Update, resource, namespace, Payload::Object(object))
    }

    pub fn update_subresource(
        resource: GVR,
        subresource: &str,
        namespace: &str,
        object: Value,
    ) -> Self {
        Self::update(resource, namespace, object).with_subresource(Some(subresource))
    }

    pub fn delete(resource: GVR, namespace: &str, name: &str) -> Self {
        Self::new(Verb::Delete, resource, namespace, Payload::Name(name.to_string()))
    }

    pub fn delete_collection(resource: GVR, namespace: &str, params: &ListParams) -> Result<Self> {
        let restrictions = ListRestrictions::from_list_params(params)?;
        Ok(Self::new(
            Verb::DeleteCollection,
            resource,
            namespace,
            Payload::Restrictions(restrictions),
        ))
    }

    /// Patch the object or, when `subresources` names one, that subresource
    pub fn patch_subresource(
        resource: GVR,
        namespace: &str,
        name: &str,
        patch_type: PatchType,
        data: &[u8],
        subresources: &[&str],
    ) -> Self {
        let payload = Payload::Patch {
            name: name.to_string(),
            patch_type,
            data: data.to_vec(),
        };
        Self::new(Verb::Patch, resource, namespace, payload)
            .with_subresource(subresources.first().copied())
    }

    /// Whether the action targets `verb` on `resource`; either may be `"*"`
    pub fn matches(&self, verb: &str, resource: &str) -> bool {
        (verb == "*" || verb.eq_ignore_ascii_case(self.verb.as_str()))
            && (resource == "*" || resource == self.resource.resource)
    }

    /// Object name for get, delete and patch; object metadata name for create and update
    pub fn name(&self) -> Option<&str> {
        match &self.payload {
            Payload::Name(name) | Payload::Patch { name, .. } => Some(name),
            Payload::Object(obj) => obj
                .get("metadata")
                .and_then(|m| m.get("name"))
                .and_then(Value::as_str),
            Payload::Restrictions(_) => None,
        }
    }

    pub fn object(&self) -> Option<&Value> {
        match &self.payload {
            Payload::Object(obj) => Some(obj),
            _ => None,
        }
    }

    pub fn restrictions(&self) -> Option<&ListRestrictions> {
        match &self.payload {
            Payload::Restrictions(r) => Some(r),
            _ => None,
        }
    }

    pub fn is_status(&self) -> bool {
        self.subresource.as_deref() == Some("status")
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.verb, self.resource.resource)?;
        if let Some(sub) = &self.subresource {
            write!(f, "/{}", sub)?;
        }
        if !self.namespace.is_empty() {
            write!(f, " in {}", self.namespace)?;
        }
        if let Some(name) = self.name() {
            write!(f, " ({})", name)?;
        }
        Ok(())
    }
}
