use clap::Args;
use reqwest::{header::HeaderMap, Method};
use serde_json::{json, Map, Value};

use crate::cli::utils::output_value;
use crate::cli::{FunctionsClient, OutputFormat};

#[derive(Args, Debug)]
pub struct CorsArgs {
    #[arg(long, default_value = "basic", help = "basic, custom-origin, with-credentials, additional-headers, multiple-origins")]
    pub scenario: String,

    #[arg(long, help = "Origin header to send")]
    pub origin: Option<String>,

    #[arg(long, help = "Send an OPTIONS preflight instead of a GET")]
    pub preflight: bool,
}

pub async fn handle(args: CorsArgs, client: &FunctionsClient, output_format: OutputFormat) -> anyhow::Result<()> {
    let method = if args.preflight { Method::OPTIONS } else { Method::GET };
    let mut builder = client
        .request(method.clone(), "cors-sdk-demo")
        .query(&[("scenario", args.scenario.as_str())]);
    if let Some(origin) = &args.origin {
        builder = builder.header(reqwest::header::ORIGIN, origin);
    }
    if args.preflight {
        builder = builder.header(reqwest::header::ACCESS_CONTROL_REQUEST_METHOD, "POST");
    }

    let response = client.send(builder).await?;

    let report = json!({
        "scenario": args.scenario,
        "method": method.as_str(),
        "status": response.status.as_u16(),
        "corsHeaders": cors_headers(&response.headers),
        "body": response.body,
    });
    output_value(output_format, &format!("{} {} -> {}", method, args.scenario, response.status), &report)
}

/// The `access-control-*` response headers, by lower-case name.
pub fn cors_headers(headers: &HeaderMap) -> Value {
    let map: Map<String, Value> = headers
        .iter()
        .filter(|(name, _)| name.as_str().starts_with("access-control-"))
        .map(|(name, value)| {
            (
                name.as_str().to_string(),
                Value::from(value.to_str().unwrap_or_default()),
            )
        })
        .collect();
    Value::Object(map)
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::header::{HeaderValue, ACCESS_CONTROL_ALLOW_ORIGIN, CONTENT_TYPE};

    #[test]
    fn keeps_only_cors_headers() {
        let mut headers = HeaderMap::new();
        headers.insert(ACCESS_CONTROL_ALLOW_ORIGIN, HeaderValue::from_static("*"));
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        assert_eq!(cors_headers(&headers), json!({"access-control-allow-origin": "*"}));
    }
}
