//! Immutable request descriptions.
//!
//! An `ApiRequest` can be turned into a `reqwest::RequestBuilder` any number
//! of times, so the retry path rebuilds it with a fresh token instead of
//! mutating a shared request. Multipart bodies are kept as raw parts for the
//! same reason: `reqwest::multipart::Form` cannot be cloned.

use reqwest::{multipart, Client, Method, RequestBuilder};
use serde::Serialize;

use super::error::Result;

/// Whether a request carries the bearer token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Auth {
    Bearer,
    /// Login, registration and token refresh.
    Anonymous,
}

/// Which try of a request this is. A request gets at most one retry after a
/// token refresh.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Attempt {
    First,
    Retry,
}

impl Attempt {
    pub fn is_retry(&self) -> bool {
        matches!(self, Attempt::Retry)
    }
}

#[derive(Debug, Clone)]
pub enum FormValue {
    Text(String),
    File {
        file_name: String,
        mime: &'static str,
        bytes: Vec<u8>,
    },
}

#[derive(Debug, Clone)]
pub enum Body {
    Empty,
    Json(serde_json::Value),
    Multipart(Vec<(String, FormValue)>),
}

#[derive(Debug, Clone)]
pub struct ApiRequest {
    method: Method,
    path: String,
    query: Vec<(String, String)>,
    body: Body,
    auth: Auth,
}

impl ApiRequest {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            query: Vec::new(),
            body: Body::Empty,
            auth: Auth::Bearer,
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::GET, path)
    }

    pub fn post(path: impl Into<String>) -> Self {
        Self::new(Method::POST, path)
    }

    pub fn delete(path: impl Into<String>) -> Self {
        Self::new(Method::DELETE, path)
    }

    pub fn json<B: Serialize>(mut self, body: &B) -> Result<Self> {
        let value = serde_json::to_value(body).map_err(|e| {
            super::ApiError::InvalidResponse(format!("Failed to encode request body: {}", e))
        })?;
        self.body = Body::Json(value);
        Ok(self)
    }

    pub fn multipart(mut self, parts: Vec<(String, FormValue)>) -> Self {
        self.body = Body::Multipart(parts);
        self
    }

    pub fn query(mut self, key: &str, value: impl ToString) -> Self {
        self.query.push((key.to_string(), value.to_string()));
        self
    }

    /// Add a query parameter only when a value is present. An absent value is
    /// left out of the URL entirely rather than sent empty.
    pub fn query_opt(self, key: &str, value: Option<impl ToString>) -> Self {
        match value {
            Some(v) => self.query(key, v),
            None => self,
        }
    }

    pub fn anonymous(mut self) -> Self {
        self.auth = Auth::Anonymous;
        self
    }

    pub fn requires_auth(&self) -> bool {
        self.auth == Auth::Bearer
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn query_pairs(&self) -> &[(String, String)] {
        &self.query
    }

    pub fn url(&self, base_url: &str) -> String {
        format!(
            "{}/{}",
            base_url.trim_end_matches('/'),
            self.path.trim_start_matches('/')
        )
    }

    /// Build a sendable request. `token` is attached as a bearer header only
    /// for authenticated requests.
    pub fn build(&self, http: &Client, base_url: &str, token: Option<&str>) -> Result<RequestBuilder> {
        let mut builder = http.request(self.method.clone(), self.url(base_url));
        if !self.query.is_empty() {
            builder = builder.query(&self.query);
        }
        if let (Auth::Bearer, Some(token)) = (self.auth, token) {
            builder = builder.bearer_auth(token);
        }
        builder = match &self.body {
            Body::Empty => builder,
            Body::Json(value) => builder.json(value),
            Body::Multipart(parts) => {
                let mut form = multipart::Form::new();
                for (name, value) in parts {
                    form = match value {
                        FormValue::Text(text) => form.text(name.clone(), text.clone()),
                        FormValue::File {
                            file_name,
                            mime,
                            bytes,
                        } => {
                            let part = multipart::Part::bytes(bytes.clone())
                                .file_name(file_name.clone())
                                .mime_str(mime)?;
                            form.part(name.clone(), part)
                        }
                    };
                }
                builder.multipart(form)
            }
        };
        Ok(builder)
    }
}
