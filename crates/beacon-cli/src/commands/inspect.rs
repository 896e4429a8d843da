use std::net::IpAddr;
use std::sync::Arc;

use beacon_analytics::{
    BuildOptions, CustomDataProviders, MemorySession, PayloadBuilder, ProviderRegistry,
    SessionHandle, TrackingRequest,
};
use beacon_core::{RequestMethod, TrackingPayload};
use clap::Args;
use colored::Colorize;

use super::SettingsArgs;

#[derive(Args)]
pub struct InspectCommand {
    /// Request path and query, e.g. "/landing?ua=1&utm_source=news"
    pub uri: String,

    #[command(flatten)]
    pub settings: SettingsArgs,

    /// Host header of the simulated request
    #[arg(long, default_value = "localhost")]
    pub host: String,

    #[arg(long)]
    pub user_agent: Option<String>,

    #[arg(long)]
    pub referer: Option<String>,

    /// Raw Cookie header, e.g. "__uamobile=abc"
    #[arg(long)]
    pub cookie: Option<String>,

    /// Value of the X-DCMGUID device header
    #[arg(long)]
    pub device_id: Option<String>,

    #[arg(long)]
    pub client_ip: Option<IpAddr>,

    /// Print the payload as JSON
    #[arg(long)]
    pub json: bool,
}

impl InspectCommand {
    pub fn execute(self) -> anyhow::Result<()> {
        let settings = self.settings.load()?;
        let providers = CustomDataProviders::new(
            settings.custom_data_providers.clone(),
            ProviderRegistry::with_builtins(),
        );

        let request = self.request();
        let options = BuildOptions {
            path: Some(request.path.clone()),
            referer: self.referer.clone(),
            event: None,
        };
        let payload = PayloadBuilder::new(&settings, &providers).build(&request, &options)?;

        if self.json {
            println!("{}", serde_json::to_string_pretty(&payload)?);
        } else {
            print_payload(&payload)?;
        }
        Ok(())
    }

    fn request(&self) -> TrackingRequest {
        let mut request = TrackingRequest::from_uri(&self.uri)
            .with_header("host", &self.host)
            .with_session(SessionHandle(Arc::new(MemorySession::new())));

        let headers = [
            ("user-agent", &self.user_agent),
            ("referer", &self.referer),
            ("cookie", &self.cookie),
            ("x-dcmguid", &self.device_id),
        ];
        for (name, value) in headers {
            if let Some(value) = value {
                request = request.with_header(name, value);
            }
        }
        if let Some(ip) = self.client_ip {
            request = request.with_remote_addr(ip);
        }
        request
    }
}

/// Form fields carried by the payload, in wire order
fn payload_fields(payload: &TrackingPayload) -> anyhow::Result<Vec<(String, String)>> {
    let encoded = match payload.request_method {
        RequestMethod::Get => payload
            .url
            .split_once('?')
            .map(|(_, query)| query)
            .unwrap_or(""),
        RequestMethod::Post => payload.body.as_str(),
    };
    Ok(serde_urlencoded::from_str(encoded)?)
}

fn print_payload(payload: &TrackingPayload) -> anyhow::Result<()> {
    println!();
    println!(
        "{} {}",
        payload.request_method.as_str().bright_white().bold(),
        payload.url.bright_cyan()
    );
    println!(
        "{} {}={} (path {}, {}s)",
        "Cookie:".bright_white().bold(),
        payload.cookie.name,
        payload.visitor_id.bright_yellow(),
        payload.cookie.path,
        payload.cookie.persistence
    );
    println!("{} {}", "User-Agent:".bright_white().bold(), payload.user_agent);
    println!();
    for (key, value) in payload_fields(payload)? {
        println!("  {:<10} {}", key.bright_green(), value);
    }
    println!();
    Ok(())
}
