//! Watch command implementation.
//!
//! Drives the sessions the way a long-running host would: a periodic tick
//! sends keepalives and drains updates, and rediscovery runs as soon as a
//! device times out and on a slower fixed schedule. Devices are reported as
//! unavailable, never dropped.

use std::collections::{BTreeMap, HashMap};
use std::time::Duration;

use chrono::Local;
use colored::*;
use serde_json::json;
use tokio::time::{interval, Instant, MissedTickBehavior};
use tracing::{debug, info};

use hvc_core::protocol::Reading;
use hvc_core::{DeviceSession, SessionHealth, SessionRegistry};

use crate::cli::WatchArgs;
use crate::commands::Context;
use crate::error::CliError;
use crate::output::{get_formatter, health_label, DeviceSummary, OutputFormatter};
use crate::target::{connect, resolve, Target};

type HealthMap = BTreeMap<String, SessionHealth>;

/// Run the watch command
pub async fn run_watch(args: WatchArgs, ctx: &Context) -> Result<(), CliError> {
    if args.interval == 0 || args.rediscover == 0 {
        return Err(CliError::InvalidArgument(
            "Intervals must be greater than zero".to_string(),
        ));
    }

    let formatter = get_formatter(ctx.json);
    let target = resolve(&args.target, ctx).await?;
    let mut registry = connect(&target, ctx).await?;

    if !ctx.json {
        println!("Watching {} device(s) (press Ctrl+C to stop)...\n", registry.len());
    }

    let mut seen: HashMap<String, Instant> = HashMap::new();
    let mut health = HealthMap::new();
    for session in registry.iter() {
        print_update(formatter.as_ref(), ctx.json, &DeviceSummary::from_session(session), session);
        seen.insert(session.unique_id().to_string(), session.last_update());
    }

    let mut ticker = interval(Duration::from_secs(args.interval));
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut rediscovery = interval(Duration::from_secs(args.rediscover * 60));
    rediscovery.set_missed_tick_behavior(MissedTickBehavior::Delay);
    // Both intervals fire immediately; the sessions are fresh.
    ticker.tick().await;
    rediscovery.tick().await;

    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            _ = &mut shutdown => {
                debug!("Interrupted, closing sessions");
                break;
            }
            _ = ticker.tick() => {
                let current = registry.tick();
                let changes = Transitions::between(&health, &current);
                report(formatter.as_ref(), ctx.json, &registry, &current, &changes, &mut seen);
                health = current;
                if changes.went_quiet {
                    rediscover(&target, ctx, &mut registry, &health).await;
                    rediscovery.reset();
                }
            }
            _ = rediscovery.tick() => {
                rediscover(&target, ctx, &mut registry, &health).await;
            }
        }
    }

    registry.close_all();
    Ok(())
}

/// Health changes from one tick to the next.
#[derive(Debug, Default, PartialEq)]
struct Transitions {
    /// Ids whose health differs from the previous tick, new ids included
    changed: Vec<String>,
    /// Some device timed out on this tick
    went_quiet: bool,
}

impl Transitions {
    fn between(previous: &HealthMap, current: &HealthMap) -> Self {
        let mut transitions = Self::default();
        for (unique_id, state) in current {
            if previous.get(unique_id) == Some(state) {
                continue;
            }
            if *state == SessionHealth::TimedOut {
                transitions.went_quiet = true;
            }
            transitions.changed.push(unique_id.clone());
        }
        transitions
    }
}

/// What to do with a session found by rediscovery.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Adoption {
    /// Unknown device, add it
    Insert,
    /// Known device that is not online, swap in the fresh session
    Replace,
    /// Known device that is online, keep the existing session
    Discard,
}

fn adoption(registry: &SessionRegistry, health: &HealthMap, unique_id: &str) -> Adoption {
    if !registry.contains(unique_id) {
        Adoption::Insert
    } else if health.get(unique_id).is_some_and(SessionHealth::is_available) {
        Adoption::Discard
    } else {
        Adoption::Replace
    }
}

/// Fold rediscovered sessions into `registry`. Returns the decision per id.
fn absorb(
    registry: &mut SessionRegistry,
    health: &HealthMap,
    found: SessionRegistry,
) -> Vec<(String, Adoption)> {
    let mut decisions = Vec::new();
    for mut session in found.into_sessions() {
        let unique_id = session.unique_id().to_string();
        let decision = adoption(registry, health, &unique_id);
        match decision {
            Adoption::Insert => {
                info!(%unique_id, "New device found");
                registry.insert(session);
            }
            Adoption::Replace => {
                info!(%unique_id, "Device is back, replacing its session");
                registry.replace(session);
            }
            Adoption::Discard => session.close(),
        }
        decisions.push((unique_id, decision));
    }
    decisions
}

/// Look for the target again, replacing sessions of devices that are not
/// currently healthy and adding any new ones.
async fn rediscover(
    target: &Target,
    ctx: &Context,
    registry: &mut SessionRegistry,
    health: &HealthMap,
) {
    match connect(target, ctx).await {
        Ok(found) => {
            absorb(registry, health, found);
        }
        Err(e) => debug!(error = %e, "Rediscovery found nothing"),
    }
}

/// Print health transitions and freshly received documents.
fn report(
    formatter: &dyn OutputFormatter,
    json: bool,
    registry: &SessionRegistry,
    current: &HealthMap,
    changes: &Transitions,
    seen: &mut HashMap<String, Instant>,
) {
    for (unique_id, state) in current {
        let Some(session) = registry.get(unique_id) else {
            continue;
        };
        let summary = DeviceSummary::from_session(session).with_health(state);

        if changes.changed.contains(unique_id) {
            print_health(json, &summary, state);
        }

        let updated = session.last_update();
        if seen.get(unique_id) != Some(&updated) {
            seen.insert(unique_id.clone(), updated);
            print_update(formatter, json, &summary, session);
        }
    }
}

fn print_health(json: bool, summary: &DeviceSummary, state: &SessionHealth) {
    if json {
        println!(
            "{}",
            json!({
                "event": "health",
                "time": Local::now().to_rfc3339(),
                "device": summary
            })
        );
        return;
    }

    let label = health_label(state);
    let label = if state.is_available() {
        label.green()
    } else {
        label.yellow()
    };
    println!(
        "{} {} ({}) is {}",
        Local::now().format("%H:%M:%S").to_string().dimmed(),
        summary.name.bold(),
        summary.unique_id,
        label
    );
}

fn print_update(
    formatter: &dyn OutputFormatter,
    json: bool,
    summary: &DeviceSummary,
    session: &DeviceSession,
) {
    let readings: Vec<Reading> = Reading::from_document(session.document())
        .into_iter()
        .filter(|reading| reading.enabled_by_default)
        .collect();

    if json {
        println!(
            "{}",
            json!({
                "event": "update",
                "time": Local::now().to_rfc3339(),
                "device": summary,
                "readings": readings
            })
        );
    } else {
        println!(
            "{} {}\n",
            Local::now().format("%H:%M:%S").to_string().dimmed(),
            formatter.format_readings(summary, &readings)
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hvc_core::{Document, SessionTimings};
    use std::net::UdpSocket as StdUdpSocket;

    async fn session(id: &str, appliance: &StdUdpSocket) -> DeviceSession {
        let document = Document::try_from(json!({"unique_id": id})).unwrap();
        DeviceSession::connect(document, appliance.local_addr().unwrap(), SessionTimings::default())
            .await
            .unwrap()
    }

    fn health(entries: &[(&str, SessionHealth)]) -> HealthMap {
        entries
            .iter()
            .map(|(id, state)| (id.to_string(), state.clone()))
            .collect()
    }

    #[test]
    fn test_transitions_first_tick_reports_everything() {
        let current = health(&[("a", SessionHealth::Online), ("b", SessionHealth::Online)]);

        let changes = Transitions::between(&HealthMap::new(), &current);

        assert_eq!(changes.changed, vec!["a", "b"]);
        assert!(!changes.went_quiet);
    }

    #[test]
    fn test_transitions_flag_newly_quiet_device_once() {
        let previous = health(&[("a", SessionHealth::Online), ("b", SessionHealth::Online)]);
        let current = health(&[("a", SessionHealth::Online), ("b", SessionHealth::TimedOut)]);

        let changes = Transitions::between(&previous, &current);
        assert_eq!(changes.changed, vec!["b"]);
        assert!(changes.went_quiet);

        // Still quiet on the next tick: no new transition, no new rediscovery.
        let changes = Transitions::between(&current, &current);
        assert_eq!(changes, Transitions::default());
    }

    #[test]
    fn test_transitions_failure_is_not_quiet() {
        let previous = health(&[("a", SessionHealth::Online)]);
        let current = health(&[("a", SessionHealth::Failed("closed".to_string()))]);

        let changes = Transitions::between(&previous, &current);
        assert_eq!(changes.changed, vec!["a"]);
        assert!(!changes.went_quiet);
    }

    #[tokio::test]
    async fn test_absorb_replaces_only_unavailable_devices() {
        let appliance = StdUdpSocket::bind("127.0.0.1:0").unwrap();
        let mut registry = SessionRegistry::new();
        registry.insert(session("online", &appliance).await);
        registry.insert(session("quiet", &appliance).await);
        let states = health(&[
            ("online", SessionHealth::Online),
            ("quiet", SessionHealth::TimedOut),
        ]);
        let online_port = registry.get("online").unwrap().local_addr().unwrap().port();
        let quiet_port = registry.get("quiet").unwrap().local_addr().unwrap().port();

        let mut found = SessionRegistry::new();
        found.insert(session("online", &appliance).await);
        found.insert(session("quiet", &appliance).await);
        found.insert(session("fresh", &appliance).await);

        let decisions = absorb(&mut registry, &states, found);

        assert_eq!(
            decisions,
            vec![
                ("fresh".to_string(), Adoption::Insert),
                ("online".to_string(), Adoption::Discard),
                ("quiet".to_string(), Adoption::Replace),
            ]
        );
        assert_eq!(registry.len(), 3);
        assert!(registry.iter().all(|s| !s.is_closed()));
        assert_eq!(
            registry.get("online").unwrap().local_addr().unwrap().port(),
            online_port
        );
        assert_ne!(
            registry.get("quiet").unwrap().local_addr().unwrap().port(),
            quiet_port
        );
    }

    #[tokio::test]
    async fn test_quiet_device_is_kept_in_registry() {
        let appliance = StdUdpSocket::bind("127.0.0.1:0").unwrap();
        let mut registry = SessionRegistry::new();
        registry.insert(session("quiet", &appliance).await);
        let states = health(&[("quiet", SessionHealth::TimedOut)]);

        // Rediscovery found nobody: the device stays, marked unavailable.
        absorb(&mut registry, &states, SessionRegistry::new());

        assert!(registry.contains("quiet"));
        assert!(!states["quiet"].is_available());
    }
}
