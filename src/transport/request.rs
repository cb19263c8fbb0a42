use crate::error::StratusError;
use reqwest::Method;
use serde::Serialize;
use serde_json::Value;
use url::Url;

const PLACEHOLDER: &str = "{}";

/// Description of one API call, independent of any credential.
///
/// `template` is a path relative to the API base URL; every `{}` in it is replaced, in order,
/// by the next positional argument, percent-encoded as part of its path segment.
#[derive(Debug, Clone)]
pub struct ApiRequest {
    method: Method,
    template: String,
    args: Vec<String>,
    query: Vec<(String, String)>,
    body: Option<Value>,
}

impl ApiRequest {
    pub fn new(method: Method, template: impl Into<String>) -> Self {
        Self {
            method,
            template: template.into(),
            args: Vec::new(),
            query: Vec::new(),
            body: None,
        }
    }

    pub fn get(template: impl Into<String>) -> Self {
        Self::new(Method::GET, template)
    }

    pub fn post(template: impl Into<String>) -> Self {
        Self::new(Method::POST, template)
    }

    pub fn patch(template: impl Into<String>) -> Self {
        Self::new(Method::PATCH, template)
    }

    pub fn delete(template: impl Into<String>) -> Self {
        Self::new(Method::DELETE, template)
    }

    #[must_use]
    pub fn arg(mut self, value: impl Into<String>) -> Self {
        self.args.push(value.into());
        self
    }

    /// Append the fields of `filter` as query parameters.
    ///
    /// `filter` must serialize to a JSON object. Null fields are skipped, scalars are rendered
    /// as text and arrays repeat the key once per element.
    pub fn filter<T: Serialize>(mut self, filter: &T) -> Result<Self, StratusError> {
        let Value::Object(fields) = serde_json::to_value(filter)? else {
            return Err(StratusError::Unexpected(
                "query filter must serialize to an object".to_string(),
            ));
        };

        for (key, value) in fields {
            match value {
                Value::Null => {}
                Value::Array(items) => {
                    for item in items {
                        if let Some(text) = scalar_text(item) {
                            self.query.push((key.clone(), text));
                        }
                    }
                }
                other => {
                    if let Some(text) = scalar_text(other) {
                        self.query.push((key, text));
                    }
                }
            }
        }
        Ok(self)
    }

    pub fn json<T: Serialize>(mut self, body: &T) -> Result<Self, StratusError> {
        self.body = Some(serde_json::to_value(body)?);
        Ok(self)
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn body(&self) -> Option<&Value> {
        self.body.as_ref()
    }

    /// Resolve the path template and query against `base`.
    pub fn url(&self, base: &Url) -> Result<Url, StratusError> {
        let placeholders = self.template.matches(PLACEHOLDER).count();
        if placeholders != self.args.len() {
            return Err(StratusError::Unexpected(format!(
                "path template {:?} expects {} argument(s), got {}",
                self.template,
                placeholders,
                self.args.len()
            )));
        }

        let mut args = self.args.iter();
        let segments: Vec<String> = self
            .template
            .split('/')
            .filter(|segment| !segment.is_empty())
            .map(|segment| {
                let mut rendered = String::with_capacity(segment.len());
                let mut parts = segment.split(PLACEHOLDER);
                if let Some(head) = parts.next() {
                    rendered.push_str(head);
                }
                for part in parts {
                    // Counts were checked above.
                    rendered.push_str(args.next().map_or("", String::as_str));
                    rendered.push_str(part);
                }
                rendered
            })
            .collect();

        let mut url = base.clone();
        url.path_segments_mut()
            .map_err(|()| StratusError::Unexpected(format!("base URL cannot hold a path: {base}")))?
            .pop_if_empty()
            .extend(segments.iter());

        if !self.query.is_empty() {
            url.query_pairs_mut().extend_pairs(self.query.iter());
        }
        Ok(url)
    }
}

fn scalar_text(value: Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s),
        Value::Bool(b) => Some(b.to_string()),
        Value::Number(n) => Some(n.to_string()),
        Value::Null | Value::Array(_) | Value::Object(_) => None,
    }
}
