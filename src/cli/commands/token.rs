use clap::Args;
use serde_json::json;

use crate::auth::{Claims, JwtKeys};
use crate::cli::utils::output_value;
use crate::cli::OutputFormat;
use crate::config::config;

#[derive(Args, Debug)]
pub struct TokenArgs {
    #[arg(long, help = "Subject (user id)")]
    pub sub: Option<String>,

    #[arg(long, help = "Email claim")]
    pub email: Option<String>,

    #[arg(long, default_value = "authenticated", help = "Role claim (anon, authenticated, service_role)")]
    pub role: String,

    #[arg(long, help = "Lifetime in hours (defaults to JWT_EXPIRY_HOURS)")]
    pub hours: Option<u64>,
}

pub fn handle(args: TokenArgs, output_format: OutputFormat) -> anyhow::Result<()> {
    let token = mint(&args)?;

    match output_format {
        OutputFormat::Text => println!("{}", token),
        OutputFormat::Json => output_value(output_format, "Token issued", &json!({"token": token}))?,
    }
    Ok(())
}

/// Sign a token with the configured secret so the local server will accept it.
pub fn mint(args: &TokenArgs) -> anyhow::Result<String> {
    let security = &config().security;
    let keys = JwtKeys::from_config(security)?;

    let mut claims = Claims::new(
        args.sub.clone(),
        args.email.clone(),
        args.role.clone(),
        args.hours.unwrap_or(security.jwt_expiry_hours),
    );
    if let Some(aud) = &security.jwt_audience {
        claims = claims.with_audience(aud.clone());
    }

    Ok(keys.sign(&claims)?)
}
