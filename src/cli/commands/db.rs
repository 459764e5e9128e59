use clap::Subcommand;
use reqwest::Method;
use tokio::io::AsyncReadExt;

use crate::cli::utils::{output_response, parse_json_object};
use crate::cli::{FunctionsClient, OutputFormat};
use crate::dispatch::OperationRequest;
use crate::filter::FilterWhere;
use crate::types::{RecordId, Table};

#[derive(Subcommand)]
pub enum DbCommands {
    #[command(about = "Create a record (data from --data or stdin)")]
    Create {
        #[arg(help = "Table name (todos, countries, messages)")]
        table: Table,
        #[arg(long, help = "Record as a JSON object")]
        data: Option<String>,
    },

    #[command(about = "Read records, optionally filtered by column equality")]
    Read {
        #[arg(help = "Table name (todos, countries, messages)")]
        table: Table,
        #[arg(long, help = "Filters as a JSON object, e.g. '{\"user_id\":\"u1\"}'")]
        filter: Option<String>,
    },

    #[command(about = "Update one record by id (data from --data or stdin)")]
    Update {
        #[arg(help = "Table name (todos, countries, messages)")]
        table: Table,
        #[arg(help = "Record id")]
        id: String,
        #[arg(long, help = "Changed fields as a JSON object")]
        data: Option<String>,
    },

    #[command(about = "Delete one record by id")]
    Delete {
        #[arg(help = "Table name (todos, countries, messages)")]
        table: Table,
        #[arg(help = "Record id")]
        id: String,
    },
}

pub async fn handle(cmd: DbCommands, client: &FunctionsClient, output_format: OutputFormat) -> anyhow::Result<()> {
    let request = build_request(cmd).await?;
    let message = format!("{} on {}", request.kind(), request.table());

    let response = client
        .invoke(Method::POST, "db-ops", Some(&request.to_json()))
        .await?;
    output_response(output_format, &message, &response)
}

async fn build_request(cmd: DbCommands) -> anyhow::Result<OperationRequest> {
    let request = match cmd {
        DbCommands::Create { table, data } => OperationRequest::Create {
            table,
            data: parse_json_object(&data_or_stdin(data).await?, "data")?,
        },
        DbCommands::Read { table, filter } => OperationRequest::Read {
            table,
            filters: match filter {
                Some(raw) => FilterWhere::from_map(&parse_json_object(&raw, "filter")?)?,
                None => FilterWhere::new(),
            },
        },
        DbCommands::Update { table, id, data } => OperationRequest::Update {
            table,
            id: parse_id(&id),
            data: parse_json_object(&data_or_stdin(data).await?, "data")?,
        },
        DbCommands::Delete { table, id } => OperationRequest::Delete { table, id: parse_id(&id) },
    };

    request.validate()?;
    Ok(request)
}

/// Numeric ids are sent as numbers, anything else as text.
pub fn parse_id(raw: &str) -> RecordId {
    raw.parse::<i64>().map(RecordId::Int).unwrap_or_else(|_| RecordId::Text(raw.to_string()))
}

async fn data_or_stdin(data: Option<String>) -> anyhow::Result<String> {
    match data {
        Some(data) => Ok(data),
        None => {
            let mut buf = String::new();
            tokio::io::stdin().read_to_string(&mut buf).await?;
            Ok(buf)
        }
    }
}
