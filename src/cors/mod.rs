//! CORS header sets for functions: the shared default applied as a tower-http layer, and
//! per-request header maps for handlers that choose their policy at runtime.

use axum::http::{
    header::{
        ACCESS_CONTROL_ALLOW_CREDENTIALS, ACCESS_CONTROL_ALLOW_HEADERS, ACCESS_CONTROL_ALLOW_METHODS,
        ACCESS_CONTROL_ALLOW_ORIGIN,
    },
    HeaderMap, HeaderName, HeaderValue, Method,
};
use serde_json::{Map, Value};
use thiserror::Error;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};

use crate::config::SecurityConfig;

pub const DEFAULT_ALLOW_HEADERS: &[&str] = &["authorization", "x-client-info", "apikey", "content-type"];
pub const DEFAULT_ALLOW_METHODS: &[&str] = &["GET", "POST", "PUT", "PATCH", "DELETE", "OPTIONS"];

#[derive(Debug, Clone, PartialEq, Error)]
pub enum CorsError {
    #[error("Credentials cannot be allowed with a wildcard origin")]
    CredentialsWithWildcard,

    #[error("Invalid {name} value: {value}")]
    InvalidValue { name: &'static str, value: String },
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct CorsOptions {
    /// Allowed origin; `None` or `"*"` means any.
    pub origin: Option<String>,
    pub credentials: bool,
    pub additional_headers: Vec<String>,
    pub additional_methods: Vec<String>,
}

impl CorsOptions {
    pub fn origin(mut self, origin: impl Into<String>) -> Self {
        self.origin = Some(origin.into());
        self
    }

    pub fn credentials(mut self, credentials: bool) -> Self {
        self.credentials = credentials;
        self
    }

    pub fn additional_headers<I, S>(mut self, headers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.additional_headers = headers.into_iter().map(Into::into).collect();
        self
    }

    pub fn additional_methods<I, S>(mut self, methods: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.additional_methods = methods.into_iter().map(Into::into).collect();
        self
    }

    pub fn allow_origin(&self) -> &str {
        self.origin.as_deref().unwrap_or("*")
    }

    fn is_wildcard(&self) -> bool {
        self.allow_origin() == "*"
    }

    fn header_names(&self) -> Vec<String> {
        DEFAULT_ALLOW_HEADERS
            .iter()
            .map(|h| h.to_string())
            .chain(self.additional_headers.iter().cloned())
            .collect()
    }

    fn method_names(&self) -> Vec<String> {
        DEFAULT_ALLOW_METHODS
            .iter()
            .map(|m| m.to_string())
            .chain(self.additional_methods.iter().cloned())
            .collect()
    }

    pub fn allow_headers(&self) -> String {
        self.header_names().join(", ")
    }

    pub fn allow_methods(&self) -> String {
        self.method_names().join(", ")
    }

    fn check(&self) -> Result<(), CorsError> {
        if self.credentials && self.is_wildcard() {
            return Err(CorsError::CredentialsWithWildcard);
        }
        Ok(())
    }

    /// Header name/value pairs in response order.
    pub fn pairs(&self) -> Result<Vec<(HeaderName, String)>, CorsError> {
        self.check()?;

        let mut pairs = vec![
            (ACCESS_CONTROL_ALLOW_ORIGIN, self.allow_origin().to_string()),
            (ACCESS_CONTROL_ALLOW_HEADERS, self.allow_headers()),
            (ACCESS_CONTROL_ALLOW_METHODS, self.allow_methods()),
        ];
        if self.credentials {
            pairs.push((ACCESS_CONTROL_ALLOW_CREDENTIALS, "true".to_string()));
        }
        Ok(pairs)
    }

    pub fn headers(&self) -> Result<HeaderMap, CorsError> {
        let mut headers = HeaderMap::new();
        for (name, value) in self.pairs()? {
            let value = HeaderValue::from_str(&value).map_err(|_| CorsError::InvalidValue {
                name: "header",
                value: value.clone(),
            })?;
            headers.insert(name, value);
        }
        Ok(headers)
    }

    /// The same headers as a JSON object, for echoing in response bodies.
    pub fn to_json(&self) -> Result<Value, CorsError> {
        let map: Map<String, Value> = self
            .pairs()?
            .into_iter()
            .map(|(name, value)| (canonical_name(&name), Value::String(value)))
            .collect();
        Ok(Value::Object(map))
    }

    pub fn to_layer(&self) -> Result<CorsLayer, CorsError> {
        self.check()?;

        let origin = if self.is_wildcard() {
            AllowOrigin::from(Any)
        } else {
            AllowOrigin::exact(parse_value("origin", self.allow_origin())?)
        };
        Ok(self.base_layer()?.allow_origin(origin))
    }

    fn base_layer(&self) -> Result<CorsLayer, CorsError> {
        let headers = self
            .header_names()
            .iter()
            .map(|h| {
                HeaderName::from_bytes(h.as_bytes()).map_err(|_| CorsError::InvalidValue {
                    name: "header",
                    value: h.clone(),
                })
            })
            .collect::<Result<Vec<_>, _>>()?;
        let methods = self
            .method_names()
            .iter()
            .map(|m| {
                Method::from_bytes(m.as_bytes()).map_err(|_| CorsError::InvalidValue {
                    name: "method",
                    value: m.clone(),
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(CorsLayer::new()
            .allow_headers(headers)
            .allow_methods(methods)
            .allow_credentials(self.credentials))
    }
}

/// Layer for every function that does not manage its own CORS headers.
pub fn shared_layer(security: &SecurityConfig) -> Result<CorsLayer, CorsError> {
    let origins: Vec<&str> = security
        .cors_origins
        .iter()
        .map(|o| o.trim())
        .filter(|o| !o.is_empty())
        .collect();

    let options = CorsOptions::default().credentials(security.cors_allow_credentials);

    match origins.as_slice() {
        [] => options.to_layer(),
        origins if origins.contains(&"*") => options.to_layer(),
        [single] => options.origin(*single).to_layer(),
        many => {
            let values = many
                .iter()
                .map(|o| parse_value("origin", o))
                .collect::<Result<Vec<_>, _>>()?;
            Ok(options
                .origin(many[0])
                .base_layer()?
                .allow_origin(AllowOrigin::list(values)))
        }
    }
}

fn parse_value(name: &'static str, value: &str) -> Result<HeaderValue, CorsError> {
    HeaderValue::from_str(value).map_err(|_| CorsError::InvalidValue {
        name,
        value: value.to_string(),
    })
}

/// `access-control-allow-origin` -> `Access-Control-Allow-Origin`
fn canonical_name(name: &HeaderName) -> String {
    name.as_str()
        .split('-')
        .map(|part| {
            let mut chars = part.chars();
            match chars.next() {
                Some(first) => first.to_ascii_uppercase().to_string() + chars.as_str(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join("-")
}
