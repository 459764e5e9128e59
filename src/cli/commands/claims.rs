use reqwest::Method;

use crate::cli::utils::output_response;
use crate::cli::{FunctionsClient, OutputFormat};

pub async fn handle(client: &FunctionsClient, output_format: OutputFormat) -> anyhow::Result<()> {
    if !client.has_token() {
        anyhow::bail!("no token given; pass --token or set PLAYGROUND_TOKEN (see `playground token`)");
    }

    let response = client.invoke(Method::GET, "get-claims-demo", None).await?;
    let message = response
        .body
        .get("message")
        .and_then(|m| m.as_str())
        .unwrap_or("Claims retrieved")
        .to_string();
    output_response(output_format, &message, &response)
}
