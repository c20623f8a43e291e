//! Subcommand implementations.

use anyhow::{bail, Context, Result};
use std::sync::Arc;
use tracing::info;

use vapormail_core::{
    AdaptivePoller, MailClient, PollEvent, PollSubject, RetrievalConfig,
};

fn build_client() -> Result<(Arc<MailClient>, RetrievalConfig)> {
    let config = RetrievalConfig::load().context("failed to load configuration")?;
    let client = MailClient::new(&config).context("failed to build mail client")?;
    Ok((Arc::new(client), config))
}

/// Splits `login@domain` into its parts.
fn parse_address(address: &str) -> Result<(String, String)> {
    match address.split_once('@') {
        Some((login, domain)) if !login.is_empty() && !domain.is_empty() => {
            Ok((login.to_string(), domain.to_string()))
        }
        _ => bail!("address must have the form login@domain, got {address:?}"),
    }
}

pub async fn domains() -> Result<()> {
    let (client, _config) = build_client()?;
    for domain in client.list_domains().await {
        println!("{domain}");
    }
    Ok(())
}

pub async fn new_address(domain: Option<String>) -> Result<()> {
    let (client, _config) = build_client()?;

    let domain = match domain {
        Some(d) => d,
        None => client
            .list_domains()
            .await
            .into_iter()
            .next()
            .context("no domains available")?,
    };

    println!("{}@{domain}", MailClient::random_login());
    Ok(())
}

pub async fn inbox(address: &str) -> Result<()> {
    let (login, domain) = parse_address(address)?;
    let (client, _config) = build_client()?;

    let messages = client.list_messages(&login, &domain).await?;
    if messages.is_empty() {
        println!("inbox is empty");
        return Ok(());
    }

    for message in messages {
        println!("{:>10}  {:<32}  {}", message.id, message.from, message.subject);
    }
    Ok(())
}

pub async fn read(address: &str, id: u64) -> Result<()> {
    let (login, domain) = parse_address(address)?;
    let (client, _config) = build_client()?;

    let message = client.get_message(&login, &domain, id).await?;
    println!("From:    {}", message.from);
    println!("Subject: {}", message.subject);
    println!("Date:    {}", message.date);
    println!();
    println!("{}", message.preferred_body().unwrap_or("(no body)"));
    Ok(())
}

pub async fn watch(address: &str) -> Result<()> {
    let (login, domain) = parse_address(address)?;
    let (client, config) = build_client()?;

    let (poller, mut events) = AdaptivePoller::new(Arc::clone(&client), config.poll);
    poller.set_subject(Some(PollSubject::new(login, domain)));

    info!(address, "watching inbox, press Ctrl-C to stop");

    loop {
        tokio::select! {
            event = events.recv() => {
                match event {
                    Some(PollEvent::Messages { subject, messages }) => {
                        let health = client.current_health();
                        println!(
                            "[{}] {} message(s), score {}{}",
                            subject.address(),
                            messages.len(),
                            health.score,
                            health
                                .last_successful_path
                                .as_deref()
                                .map(|p| format!(", via {p}"))
                                .unwrap_or_default(),
                        );
                        for message in messages {
                            println!("{:>10}  {:<32}  {}", message.id, message.from, message.subject);
                        }
                    }
                    Some(PollEvent::Failure { subject, message, consecutive_failures }) => {
                        eprintln!(
                            "[{}] fetch failed ({consecutive_failures} in a row): {message}",
                            subject.address(),
                        );
                    }
                    None => break,
                }
            }
            _ = tokio::signal::ctrl_c() => {
                poller.set_subject(None);
                break;
            }
        }
    }

    Ok(())
}
