//! Tower service that answers `kube::Client` requests through the fake's reaction chain

use crate::action::Action;
use crate::clientset::Clientset;
use crate::error::Error;
use crate::patch::PatchType;
use crate::tracker::{GVK, GVR};
use bytes::Bytes;
use futures::future::{BoxFuture, FutureExt};
use http::{Request, Response, StatusCode};
use http_body_util::Full;
use kube::api::ListParams;
use kube::client::Body as KubeBody;
use serde_json::Value;
use std::task::{Context, Poll};
use tower::Service;
use tracing::trace;

type BoxError = Box<dyn std::error::Error + Send + Sync>;
type HttpResult = std::result::Result<Response<Full<Bytes>>, BoxError>;

/// Turn a crate error into a Kubernetes `Status` response
macro_rules! handle_error {
    ($result:expr) => {
        match $result {
            Ok(val) => val,
            Err(e) => return MockService::error_to_response(e),
        }
    };
}

struct ParsedPath {
    group: Option<String>,
    version: String,
    namespace: Option<String>,
    resource: String,
    name: Option<String>,
    subresource: Option<String>,
}

impl ParsedPath {
    fn gvr(&self) -> GVR {
        GVR::new(
            self.group.clone().unwrap_or_default(),
            self.version.clone(),
            self.resource.clone(),
        )
    }

    fn api_version(&self) -> String {
        match &self.group {
            Some(g) => format!("{}/{}", g, self.version),
            None => self.version.clone(),
        }
    }

    fn namespace(&self) -> &str {
        self.namespace.as_deref().unwrap_or("")
    }

    fn subresources(&self) -> Vec<&str> {
        self.subresource.iter().map(String::as_str).collect()
    }
}

/// HTTP front end for a [`Clientset`]
///
/// Every request becomes one [`Action`] on the clientset's fake.
#[derive(Clone)]
pub struct MockService {
    clientset: Clientset,
}

impl MockService {
    pub fn new(clientset: Clientset) -> Self {
        Self { clientset }
    }

    /// Split an API path into its parts
    ///
    /// - /apis/tekton.dev/v1beta1/namespaces/default/runs
    /// - /apis/tekton.dev/v1beta1/namespaces/default/runs/run-1/status
    /// - /apis/tekton.dev/v1beta1/runs (all namespaces)
    fn parse_path(path: &str) -> Option<ParsedPath> {
        let parts: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();

        let (group, version_idx) = match parts.first() {
            Some(&"api") => (None, 1),
            Some(&"apis") if parts.len() > 2 => (Some(parts[1].to_string()), 2),
            _ => return None,
        };

        if parts.len() < version_idx + 2 {
            return None;
        }
        let version = parts[version_idx].to_string();

        let (namespace, rest) = if parts.get(version_idx + 1) == Some(&"namespaces") {
            if parts.len() < version_idx + 4 {
                return None;
            }
            (
                Some(parts[version_idx + 2].to_string()),
                &parts[version_idx + 3..],
            )
        } else {
            (None, &parts[version_idx + 1..])
        };

        Some(ParsedPath {
            group,
            version,
            namespace,
            resource: rest[0].to_string(),
            name: rest.get(1).map(|s| s.to_string()),
            subresource: rest.get(2).map(|s| s.to_string()),
        })
    }

    /// Best-effort singular kind for an unregistered plural
    fn resource_to_kind(resource: &str) -> String {
        let singular = if let Some(base) = resource.strip_suffix("ies") {
            format!("{}y", base)
        } else if resource.ends_with("ses")
            || resource.ends_with("xes")
            || resource.ends_with("zes")
        {
            resource[..resource.len() - 2].to_string()
        } else if let Some(base) = resource.strip_suffix('s') {
            base.to_string()
        } else {
            resource.to_string()
        };

        let mut chars = singular.chars();
        match chars.next() {
            Some(first) => first.to_ascii_uppercase().to_string() + chars.as_str(),
            None => singular,
        }
    }

    fn kind_for(&self, parsed: &ParsedPath) -> GVK {
        self.clientset
            .registry()
            .lookup(&parsed.gvr())
            .map(|m| m.gvk)
            .unwrap_or_else(|| {
                GVK::new(
                    parsed.group.clone().unwrap_or_default(),
                    parsed.version.clone(),
                    Self::resource_to_kind(&parsed.resource),
                )
            })
    }

    fn parse_list_params(query: Option<&str>) -> (ListParams, bool) {
        let mut params = ListParams::default();
        let mut watch = false;

        for pair in query.unwrap_or_default().split('&') {
            let Some((key, value)) = pair.split_once('=') else {
                continue;
            };
            let value = urlencoding::decode(value)
                .map(|v| v.into_owned())
                .unwrap_or_else(|_| value.to_string());

            match key {
                "labelSelector" => params.label_selector = Some(value),
                "fieldSelector" => params.field_selector = Some(value),
                "limit" => params.limit = value.parse().ok(),
                "continue" => params.continue_token = Some(value),
                "resourceVersion" => params.resource_version = Some(value),
                "timeoutSeconds" => params.timeout = value.parse().ok(),
                "watch" => watch = value == "true" || value == "1",
                _ => {}
            }
        }

        (params, watch)
    }

    /// Fill in type information a client may have left out of a request body
    fn object_from_body(parsed: &ParsedPath, kind: &GVK, body: &Bytes) -> crate::Result<Value> {
        let mut obj: Value = serde_json::from_slice(body)?;
        let fields = obj.as_object_mut().ok_or_else(|| {
            Error::InvalidRequest("request body must be a JSON object".to_string())
        })?;
        fields
            .entry("apiVersion")
            .or_insert_with(|| Value::String(parsed.api_version()));
        fields
            .entry("kind")
            .or_insert_with(|| Value::String(kind.kind.clone()));
        Ok(obj)
    }

    fn invoke(&self, action: Action) -> crate::Result<Value> {
        let (verb, resource) = (action.verb, action.resource.to_string());
        self.clientset
            .fake()
            .invokes_raw(action)?
            .ok_or_else(|| Error::NoReaction {
                verb: verb.to_string(),
                resource,
            })
    }

    async fn handle_request(&self, req: Request<KubeBody>) -> HttpResult {
        let method = req.method().clone();
        let path = req.uri().path().to_string();
        let query = req.uri().query().map(|s| s.to_string());
        let content_type = req
            .headers()
            .get(http::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(|s| s.to_string());

        let body_bytes = {
            use http_body_util::BodyExt;
            req.into_body().collect().await?.to_bytes()
        };

        trace!("Mock service request: {} {}", method, path);

        let Some(parsed) = Self::parse_path(&path) else {
            return Self::error_response(StatusCode::NOT_FOUND, &format!("unknown path {}", path));
        };

        match method.as_str() {
            "GET" => self.handle_get(&parsed, query.as_deref()),
            "POST" => self.handle_post(&parsed, body_bytes),
            "PUT" => self.handle_put(&parsed, body_bytes),
            "PATCH" => self.handle_patch(&parsed, body_bytes, content_type.as_deref()),
            "DELETE" => self.handle_delete(&parsed, query.as_deref()),
            _ => Self::error_response(StatusCode::METHOD_NOT_ALLOWED, "Method not allowed"),
        }
    }

    fn handle_get(&self, parsed: &ParsedPath, query: Option<&str>) -> HttpResult {
        let namespace = parsed.namespace();

        if let Some(name) = &parsed.name {
            let action = match &parsed.subresource {
                Some(sub) => Action::get_subresource(parsed.gvr(), sub, namespace, name),
                None => Action::get(parsed.gvr(), namespace, name),
            };
            let obj = handle_error!(self.invoke(action));
            return Self::success_response(obj);
        }

        let (params, watch) = Self::parse_list_params(query);
        if watch {
            return Self::error_response(
                StatusCode::METHOD_NOT_ALLOWED,
                "watch is not served over HTTP; use the typed client's watch",
            );
        }

        let action = handle_error!(Action::list(
            parsed.gvr(),
            self.kind_for(parsed),
            namespace,
            &params
        ));
        let restrictions = action.restrictions().cloned().unwrap_or_default();
        let mut list = handle_error!(self.invoke(action));

        if let Some(items) = list.get_mut("items").and_then(Value::as_array_mut) {
            items.retain(|item| restrictions.matches_labels(item));
        }

        Self::success_response(list)
    }

    fn handle_post(&self, parsed: &ParsedPath, body: Bytes) -> HttpResult {
        let kind = self.kind_for(parsed);
        let obj = handle_error!(Self::object_from_body(parsed, &kind, &body));
        let created = handle_error!(self.invoke(Action::create(
            parsed.gvr(),
            parsed.namespace(),
            obj
        )));
        Self::success_response(created)
    }

    fn handle_put(&self, parsed: &ParsedPath, body: Bytes) -> HttpResult {
        if parsed.name.is_none() {
            return Self::error_response(StatusCode::BAD_REQUEST, "Name required for PUT");
        }

        let kind = self.kind_for(parsed);
        let obj = handle_error!(Self::object_from_body(parsed, &kind, &body));
        let action = match &parsed.subresource {
            Some(sub) => Action::update_subresource(parsed.gvr(), sub, parsed.namespace(), obj),
            None => Action::update(parsed.gvr(), parsed.namespace(), obj),
        };
        let updated = handle_error!(self.invoke(action));
        Self::success_response(updated)
    }

    fn handle_patch(
        &self,
        parsed: &ParsedPath,
        body: Bytes,
        content_type: Option<&str>,
    ) -> HttpResult {
        let Some(name) = &parsed.name else {
            return Self::error_response(StatusCode::BAD_REQUEST, "Name required for PATCH");
        };

        let patch_type = match content_type {
            Some(ct) => handle_error!(ct.parse::<PatchType>()),
            None => PatchType::StrategicMergePatch,
        };

        let action = Action::patch_subresource(
            parsed.gvr(),
            parsed.namespace(),
            name,
            patch_type,
            &body,
            &parsed.subresources(),
        );
        let patched = handle_error!(self.invoke(action));
        Self::success_response(patched)
    }

    fn handle_delete(&self, parsed: &ParsedPath, query: Option<&str>) -> HttpResult {
        let namespace = parsed.namespace();

        let action = match &parsed.name {
            Some(name) => Action::delete(parsed.gvr(), namespace, name),
            None => {
                let (params, _) = Self::parse_list_params(query);
                handle_error!(Action::delete_collection(parsed.gvr(), namespace, &params))
            }
        };

        let deleted = handle_error!(self.invoke(action));
        Self::success_response(deleted)
    }

    fn error_to_response(err: Error) -> HttpResult {
        let status = err.to_error_response();
        let code = StatusCode::from_u16(status.code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

        let body = serde_json::json!({
            "kind": "Status",
            "apiVersion": "v1",
            "status": status.status,
            "message": status.message,
            "reason": status.reason,
            "code": status.code
        });

        Ok(Response::builder()
            .status(code)
            .header(http::header::CONTENT_TYPE, "application/json")
            .body(Full::new(Bytes::from(body.to_string())))?)
    }

    fn error_response(status: StatusCode, message: &str) -> HttpResult {
        let body = serde_json::json!({
            "kind": "Status",
            "apiVersion": "v1",
            "status": "Failure",
            "message": message,
            "reason": status.canonical_reason().unwrap_or_default().replace(' ', ""),
            "code": status.as_u16()
        });

        Ok(Response::builder()
            .status(status)
            .header(http::header::CONTENT_TYPE, "application/json")
            .body(Full::new(Bytes::from(body.to_string())))?)
    }

    fn success_response(data: Value) -> HttpResult {
        Ok(Response::builder()
            .status(StatusCode::OK)
            .header(http::header::CONTENT_TYPE, "application/json")
            .body(Full::new(Bytes::from(data.to_string())))?)
    }
}

impl Service<Request<KubeBody>> for MockService {
    type Response = Response<Full<Bytes>>;
    type Error = BoxError;
    type Future = BoxFuture<'static, std::result::Result<Self::Response, Self::Error>>;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<std::result::Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, req: Request<KubeBody>) -> Self::Future {
        let this = self.clone();
        async move { this.handle_request(req).await }.boxed()
    }
}
