pub mod slack;
pub mod traits;

pub use slack::SlackChannel;
pub use traits::{Channel, ChannelMessage};

use crate::agent::{respond, Intent};
use crate::config::Config;
use crate::knowledge::{self, KnowledgeBase};
use crate::nlu::{self, Nlu};
use crate::util::truncate_with_ellipsis;
use anyhow::Result;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

const CHANNEL_QUEUE_CAPACITY: usize = 100;
const LOG_PREVIEW_CHARS: usize = 80;
const DOCTOR_TIMEOUT_SECS: u64 = 10;

#[derive(Clone)]
struct ChannelRuntimeContext {
    channels_by_name: Arc<HashMap<String, Arc<dyn Channel>>>,
    nlu: Arc<dyn Nlu>,
    knowledge: Arc<dyn KnowledgeBase>,
    confidence_threshold: f64,
    request_timeout: Duration,
}

/// Keep a channel listening, reconnecting with doubling backoff.
///
/// A listener that returns `Ok` ended its session cleanly (Slack sent
/// `goodbye`), so the delay drops back to the floor. The task ends once the
/// dispatcher has hung up.
fn spawn_supervised_listener(
    ch: Arc<dyn Channel>,
    tx: tokio::sync::mpsc::Sender<ChannelMessage>,
    initial_backoff_secs: u64,
    max_backoff_secs: u64,
) -> tokio::task::JoinHandle<()> {
    let floor = initial_backoff_secs.max(1);
    let ceiling = max_backoff_secs.max(floor);

    tokio::spawn(async move {
        let component = format!("channel:{}", ch.name());
        let mut delay = floor;

        while !tx.is_closed() {
            crate::health::mark_component_ok(&component);
            let session = ch.listen(tx.clone()).await;
            if tx.is_closed() {
                break;
            }

            match session {
                Ok(()) => {
                    delay = floor;
                    tracing::info!(
                        "{} session closed by server; reconnecting in {delay}s",
                        ch.name()
                    );
                    crate::health::mark_component_error(&component, "session closed by server");
                }
                Err(e) => {
                    tracing::error!(
                        "{} listener failed: {e:#}; reconnecting in {delay}s",
                        ch.name()
                    );
                    crate::health::mark_component_error(&component, format!("{e:#}"));
                }
            }

            crate::health::bump_component_restart(&component);
            tokio::time::sleep(Duration::from_secs(delay)).await;
            delay = delay.saturating_mul(2).min(ceiling);
        }
    })
}

fn log_worker_join_result(result: Result<(), tokio::task::JoinError>) {
    if let Err(error) = result {
        tracing::error!("Message worker crashed: {error}");
    }
}

/// Handle one inbound message end to end.
///
/// NLU, knowledge lookup and the reply post all share `request_timeout`.
/// Failures are logged and the message is dropped; an NLU failure or a
/// timeout produces no reply at all.
async fn process_channel_message(ctx: Arc<ChannelRuntimeContext>, msg: ChannelMessage) {
    println!(
        "  💬 [{}:{}] from {}: {}",
        msg.channel,
        msg.conversation,
        msg.sender,
        truncate_with_ellipsis(&msg.content, LOG_PREVIEW_CHARS)
    );

    let Some(target_channel) = ctx.channels_by_name.get(&msg.channel).cloned() else {
        tracing::warn!("No channel registered as `{}`; dropping message", msg.channel);
        return;
    };

    let started_at = Instant::now();
    let handled = tokio::time::timeout(ctx.request_timeout, async {
        let (intent, reply) = match respond(
            ctx.nlu.as_ref(),
            ctx.knowledge.as_ref(),
            &msg.content,
            ctx.confidence_threshold,
        )
        .await
        {
            Ok(done) => done,
            Err(e) => {
                tracing::error!(
                    "Unable to get a response from {} for message {}: {e}",
                    ctx.nlu.name(),
                    msg.id
                );
                return;
            }
        };

        println!(
            "  🤖 Reply [{}] ({}ms): {}",
            intent.label(),
            started_at.elapsed().as_millis(),
            truncate_with_ellipsis(&reply, LOG_PREVIEW_CHARS)
        );

        if let Err(e) = target_channel.send(&reply, &msg.sender).await {
            tracing::error!("Failed to reply on {}: {e}", target_channel.name());
        }
    })
    .await;

    if handled.is_err() {
        tracing::error!(
            "Message {} abandoned after {}ms",
            msg.id,
            ctx.request_timeout.as_millis()
        );
    }
}

/// Fan inbound messages out to one worker task each, at most
/// `max_in_flight_messages` at a time. Returns once the inbound queue closes
/// and every worker has finished.
async fn run_message_dispatch_loop(
    mut rx: tokio::sync::mpsc::Receiver<ChannelMessage>,
    ctx: Arc<ChannelRuntimeContext>,
    max_in_flight_messages: usize,
) {
    let in_flight = Arc::new(tokio::sync::Semaphore::new(max_in_flight_messages.max(1)));
    let mut workers = tokio::task::JoinSet::new();

    while let Some(msg) = rx.recv().await {
        while let Some(finished) = workers.try_join_next() {
            log_worker_join_result(finished);
        }

        let Ok(slot) = Arc::clone(&in_flight).acquire_owned().await else {
            break;
        };
        let ctx = Arc::clone(&ctx);
        workers.spawn(async move {
            process_channel_message(ctx, msg).await;
            drop(slot);
        });
    }

    while let Some(finished) = workers.join_next().await {
        log_worker_join_result(finished);
    }
}

fn slack_channel(config: &Config) -> SlackChannel {
    SlackChannel::new(
        config.slack.bot_token.clone(),
        &config.slack.api_base_url,
        Duration::from_secs(config.slack.ping_interval_secs),
    )
}

/// Answer a single message without Slack: NLU, selection and reply only.
pub async fn ask_once(config: &Config, text: &str) -> Result<(Intent, String)> {
    config.validate_for_ask()?;
    let nlu = nlu::create_nlu(&config.wit);
    let kb = knowledge::create_knowledge_base(&config.wolfram);
    respond(
        nlu.as_ref(),
        kb.as_ref(),
        text,
        config.bot.confidence_threshold,
    )
    .await
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum HealthState {
    Healthy,
    Unhealthy,
    Timeout,
}

fn classify_health_result(
    result: &std::result::Result<bool, tokio::time::error::Elapsed>,
) -> HealthState {
    match result {
        Ok(true) => HealthState::Healthy,
        Ok(false) => HealthState::Unhealthy,
        Err(_) => HealthState::Timeout,
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
struct DoctorSummary {
    healthy: u32,
    unhealthy: u32,
    timed_out: u32,
    skipped: u32,
}

async fn run_doctor_checks(config: &Config, timeout: Duration) -> DoctorSummary {
    let mut summary = DoctorSummary::default();

    let slack = slack_channel(config);
    let nlu = nlu::create_nlu(&config.wit);
    let kb = knowledge::create_knowledge_base(&config.wolfram);

    let checks: [(&str, bool); 3] = [
        ("Slack", !config.slack.bot_token.is_empty()),
        ("Wit.ai", !config.wit.access_token.is_empty()),
        ("Wolfram", !config.wolfram.app_id.is_empty()),
    ];

    for (name, configured) in checks {
        if !configured {
            summary.skipped += 1;
            println!("  ⚪ {name:<9} not configured");
            continue;
        }

        let result = match name {
            "Slack" => tokio::time::timeout(timeout, slack.health_check()).await,
            "Wit.ai" => tokio::time::timeout(timeout, nlu.health_check()).await,
            _ => tokio::time::timeout(timeout, kb.health_check()).await,
        };

        match classify_health_result(&result) {
            HealthState::Healthy => {
                summary.healthy += 1;
                println!("  ✅ {name:<9} healthy");
            }
            HealthState::Unhealthy => {
                summary.unhealthy += 1;
                println!("  ❌ {name:<9} unhealthy (auth/config/network)");
            }
            HealthState::Timeout => {
                summary.timed_out += 1;
                println!("  ⏱️  {name:<9} timed out (>{}s)", timeout.as_secs());
            }
        }
    }

    summary
}

/// Run health checks for Slack and both upstream APIs.
pub async fn doctor_channels(config: Config) -> Result<()> {
    println!("🩺 WolfyBot Doctor");
    println!();

    let summary = run_doctor_checks(&config, Duration::from_secs(DOCTOR_TIMEOUT_SECS)).await;

    println!();
    println!(
        "Summary: {} healthy, {} unhealthy, {} timed out, {} not configured",
        summary.healthy, summary.unhealthy, summary.timed_out, summary.skipped
    );
    Ok(())
}

/// Connect to Slack and answer messages until Ctrl-C.
pub async fn start_channels(config: Config) -> Result<()> {
    config.validate_for_run()?;

    let nlu: Arc<dyn Nlu> = Arc::from(nlu::create_nlu(&config.wit));
    let knowledge: Arc<dyn KnowledgeBase> =
        Arc::from(knowledge::create_knowledge_base(&config.wolfram));
    let slack: Arc<dyn Channel> = Arc::new(slack_channel(&config));

    if !slack.health_check().await {
        tracing::warn!("Slack auth.test failed; the listener will keep retrying");
    }

    let gateway_handle = if config.gateway.enabled {
        let addr = config.gateway.socket_addr()?;
        Some(tokio::spawn(async move {
            if let Err(e) = crate::gateway::run_gateway(addr).await {
                tracing::error!("{e:#}");
                crate::health::mark_component_error("gateway", e.to_string());
            }
        }))
    } else {
        None
    };

    let mut channels_by_name = HashMap::new();
    channels_by_name.insert(slack.name().to_string(), Arc::clone(&slack));

    let ctx = Arc::new(ChannelRuntimeContext {
        channels_by_name: Arc::new(channels_by_name),
        nlu,
        knowledge,
        confidence_threshold: config.bot.confidence_threshold,
        request_timeout: Duration::from_secs(config.bot.request_timeout_secs.max(1)),
    });

    let (tx, rx) = tokio::sync::mpsc::channel::<ChannelMessage>(CHANNEL_QUEUE_CAPACITY);
    let listener = spawn_supervised_listener(
        slack,
        tx,
        config.bot.initial_backoff_secs,
        config.bot.max_backoff_secs,
    );

    println!("🐺 WolfyBot is running (Ctrl-C to stop)");
    println!(
        "  🎯 Confidence threshold: {}",
        config.bot.confidence_threshold
    );
    crate::health::mark_component_ok("channels");

    tokio::select! {
        () = run_message_dispatch_loop(rx, ctx, config.bot.max_in_flight_messages) => {
            tracing::warn!("Message dispatch loop ended");
        }
        signal = tokio::signal::ctrl_c() => {
            if let Err(e) = signal {
                tracing::error!("Failed to listen for Ctrl-C: {e}");
            }
            println!("\n👋 Shutting down");
        }
    }

    listener.abort();
    if let Some(handle) = gateway_handle {
        handle.abort();
    }
    Ok(())
}
