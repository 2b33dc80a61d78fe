//! Auth command - show which tier each service resolved to.

use anyhow::Result;
use broker_auth::{Resolution, TierOutcome};
use broker_sdk::Service;
use clap::Args;
use serde::Serialize;
use std::path::Path;

use crate::output::{self, CommandResult, OutputFormat};

/// Arguments for the auth command.
#[derive(Args, Debug)]
pub struct AuthArgs {
    /// Show every tier considered, not only the winner
    #[arg(long)]
    pub trail: bool,
}

/// Resolution summary for one service.
#[derive(Debug, Serialize)]
pub struct ServiceAuth {
    pub service: &'static str,
    pub base_url: Option<String>,
    pub mode: Option<&'static str>,
    pub authenticated: bool,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub tiers: Vec<TierOutput>,
}

/// One tier in the trail.
#[derive(Debug, Serialize)]
pub struct TierOutput {
    pub tier: &'static str,
    pub outcome: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

/// Execute the auth command.
pub async fn execute(args: AuthArgs, config: Option<&Path>, json: bool) -> Result<()> {
    let format = OutputFormat::from_json_flag(json);
    let broker = super::connect(config).await?;

    let services: Vec<ServiceAuth> = [Service::Inference, Service::Embeddings, Service::Speech]
        .into_iter()
        .map(|service| {
            let resolution = broker.resolution(service);
            ServiceAuth {
                service: service.as_str(),
                base_url: base_url(&broker, service),
                mode: resolution.map(|r| r.decision.mode().as_str()),
                authenticated: resolution.is_some_and(|r| r.decision.is_authenticated()),
                tiers: if args.trail {
                    resolution.map(trail).unwrap_or_default()
                } else {
                    Vec::new()
                },
            }
        })
        .collect();

    match format {
        OutputFormat::Json => CommandResult::success(services).print(format)?,
        OutputFormat::Text => print_text(&services),
    }
    Ok(())
}

fn base_url(broker: &broker_sdk::Broker, service: Service) -> Option<String> {
    match service {
        Service::Inference => Some(broker.inference().client().base_url().to_string()),
        Service::Embeddings => Some(broker.embeddings().client().base_url().to_string()),
        Service::Speech => broker
            .speech()
            .ok()
            .map(|gateway| gateway.client().base_url().to_string()),
    }
}

fn trail(resolution: &Resolution) -> Vec<TierOutput> {
    resolution
        .attempts
        .iter()
        .map(|attempt| {
            let (outcome, reason) = match &attempt.outcome {
                TierOutcome::Selected => ("selected", None),
                TierOutcome::Skipped { reason } => ("skipped", Some((*reason).to_string())),
                TierOutcome::Failed { reason } => ("failed", Some(reason.clone())),
            };
            TierOutput {
                tier: attempt.tier.as_str(),
                outcome,
                reason,
            }
        })
        .collect()
}

fn print_text(services: &[ServiceAuth]) {
    output::section("Authentication");
    for service in services {
        let label = match service.mode {
            Some(mode) => format!("{}: {mode}", service.service),
            None => format!("{}: disabled", service.service),
        };
        output::status(&label, service.authenticated);
        if let Some(url) = &service.base_url {
            output::key_value("base url", url);
        }
        for tier in &service.tiers {
            let line = match &tier.reason {
                Some(reason) => format!("{} ({reason})", tier.outcome),
                None => tier.outcome.to_string(),
            };
            output::key_value(tier.tier, &line);
        }
    }

    if services.iter().any(|s| s.mode == Some("open")) {
        output::warning("open mode: requests are sent without credentials");
    }
}
