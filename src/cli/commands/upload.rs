use std::path::PathBuf;

use anyhow::Context;
use clap::Args;
use reqwest::Method;
use serde_json::{json, Value};

use crate::cli::utils::output_value;
use crate::cli::{FunctionsClient, OutputFormat};

#[derive(Args, Debug)]
pub struct UploadArgs {
    #[arg(help = "File to upload")]
    pub file: PathBuf,

    #[arg(long, help = "Target bucket (server default when omitted)")]
    pub bucket: Option<String>,
}

/// Ask the server for a signed URL, then PUT the file to it.
pub async fn handle(args: UploadArgs, client: &FunctionsClient, output_format: OutputFormat) -> anyhow::Result<()> {
    let file_name = args
        .file
        .file_name()
        .and_then(|n| n.to_str())
        .context("file path has no usable file name")?
        .to_string();
    let bytes = tokio::fs::read(&args.file)
        .await
        .with_context(|| format!("failed to read {}", args.file.display()))?;

    let mut request = json!({"fileName": file_name});
    if let Some(bucket) = &args.bucket {
        request["bucketName"] = Value::from(bucket.as_str());
    }

    let signed = client.invoke(Method::POST, "generate-upload-url", Some(&request)).await?;
    if !signed.status.is_success() {
        anyhow::bail!(
            "could not get an upload URL: {} ({})",
            signed.error_message().unwrap_or("unknown error"),
            signed.status
        );
    }
    let signed_url = signed
        .body
        .get("signedUrl")
        .and_then(Value::as_str)
        .context("server reply has no signedUrl")?;

    let size = bytes.len();
    let uploaded = client.put_bytes(signed_url, bytes).await?;
    if !uploaded.status.is_success() {
        anyhow::bail!("upload failed with {}: {}", uploaded.status, uploaded.body);
    }

    output_value(
        output_format,
        &format!("Uploaded {} ({} bytes)", file_name, size),
        &json!({
            "path": signed.body.get("path"),
            "bucketName": signed.body.get("bucketName"),
            "bytes": size,
        }),
    )
}
