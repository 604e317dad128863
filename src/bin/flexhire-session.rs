use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, Subcommand};

use flexhire_gateway::modules;
use flexhire_gateway::modules::logger::LogTarget;
use flexhire_gateway::session::transport::DEFAULT_GATEWAY_URL;
use flexhire_gateway::session::{
    HttpGatewayClient, JsonFileStore, SessionController, SessionOptions, UserProfile, Visibility,
};

#[derive(Parser)]
#[command(name = "flexhire-session")]
#[command(about = "Sign in to Flexhire through the gateway and manage profile visibility", long_about = None)]
struct Cli {
    /// Gateway GraphQL endpoint
    #[arg(long, env = "FLEXHIRE_GATEWAY_URL", default_value = DEFAULT_GATEWAY_URL)]
    gateway: String,

    /// API key; defaults to the one remembered from the last sign-in
    #[arg(long, env = "FLEXHIRE_SESSION_API_KEY")]
    api_key: Option<String>,

    /// Seconds to wait for each gateway call
    #[arg(long, default_value_t = 30)]
    timeout: u64,

    /// Print the profile as JSON
    #[arg(long)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Sign in and show the profile
    Login,
    /// Sign in and change profile visibility (private, public, clients_only)
    SetVisibility { visibility: Visibility },
}

fn render(profile: &UserProfile, json: bool) -> Result<String, String> {
    if json {
        return serde_json::to_string_pretty(profile)
            .map_err(|e| format!("failed to serialize profile: {}", e));
    }

    let mut out = format!("{}\n", profile.name);
    if let Some(avatar) = &profile.avatar_url {
        out.push_str(&format!("Avatar: {}\n", avatar));
    }
    out.push_str(&format!("Visibility: {}\n", profile.visibility));

    out.push_str("Skills:\n");
    for skill in &profile.skills {
        match skill.experience_years {
            Some(years) => out.push_str(&format!("  - {} ({} years)\n", skill.name, years)),
            None => out.push_str(&format!("  - {}\n", skill.name)),
        }
    }

    out.push_str("Job Applications:\n");
    for job in &profile.job_applications {
        out.push_str(&format!("  - {}\n", job.title));
    }

    Ok(out)
}

#[tokio::main]
async fn main() -> Result<(), String> {
    let cli = Cli::parse();
    let _log_guard = modules::logger::init_logger(LogTarget::session());

    let transport = Arc::new(HttpGatewayClient::new(cli.gateway.clone())?);
    let store = Arc::new(JsonFileStore::in_data_dir()?);
    let options = SessionOptions {
        request_timeout: Duration::from_secs(cli.timeout.max(1)),
    };
    let session = SessionController::new(transport, store, options);

    let api_key = cli
        .api_key
        .clone()
        .or_else(|| session.remembered_credential().map(str::to_string))
        .unwrap_or_default();

    let mut profile = session
        .submit_credential(api_key)
        .await
        .map_err(|e| e.to_string())?;

    if let Commands::SetVisibility { visibility } = cli.command {
        session
            .change_visibility(visibility)
            .await
            .map_err(|e| e.to_string())?;
        if let Some(updated) = session.profile().await {
            profile = updated;
        }
    }

    print!("{}", render(&profile, cli.json)?);
    Ok(())
}
