//! Line-oriented command layer on stdin.

use std::fmt::Write as _;
use std::io::{self, BufRead as _};
use std::sync::Arc;
use std::thread;

use anyhow::{Context as _, Result, bail};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use slotwatch_core::{SlotWatchService, SubscriberId, SubscriptionKey, Unsubscribed};

const HELP: &str = "Commands:
  types                                          list appointment types
  locations <type>                               list locations for a type
  subscribe <user> <type> @ <loc>[, <loc>...|*]  subscribe to slots
  unsubscribe <user> <type> @ <loc>[, <loc>...|*] remove subscriptions
  list <user>                                    show subscriptions
  clear <user>                                   remove every subscription
  help                                           show this text";

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Locations {
    All,
    Named(Vec<String>),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Command {
    Help,
    Types,
    Locations(String),
    Subscribe {
        subscriber: SubscriberId,
        appointment_type: String,
        locations: Locations,
    },
    Unsubscribe {
        subscriber: SubscriberId,
        appointment_type: String,
        locations: Locations,
    },
    List(SubscriberId),
    Clear(SubscriberId),
}

pub(crate) fn parse_command(line: &str) -> Result<Command> {
    let line = line.trim();
    let (verb, rest) = line.split_once(char::is_whitespace).unwrap_or((line, ""));
    let rest = rest.trim();

    let command = match verb.to_lowercase().as_str() {
        "help" | "" => Command::Help,
        "types" => Command::Types,
        "locations" => {
            if rest.is_empty() {
                bail!("usage: locations <type>");
            }
            Command::Locations(rest.to_owned())
        }
        "list" => Command::List(parse_subscriber(rest)?),
        "clear" => Command::Clear(parse_subscriber(rest)?),
        "subscribe" => {
            let (subscriber, appointment_type, locations) = parse_selection(rest)?;
            Command::Subscribe {
                subscriber,
                appointment_type,
                locations,
            }
        }
        "unsubscribe" => {
            let (subscriber, appointment_type, locations) = parse_selection(rest)?;
            Command::Unsubscribe {
                subscriber,
                appointment_type,
                locations,
            }
        }
        other => bail!("unknown command {other:?}; try `help`"),
    };
    Ok(command)
}

fn parse_subscriber(raw: &str) -> Result<SubscriberId> {
    raw.trim()
        .parse()
        .map(SubscriberId)
        .with_context(|| format!("invalid user id {raw:?}"))
}

fn parse_selection(rest: &str) -> Result<(SubscriberId, String, Locations)> {
    let (user, selection) = rest
        .split_once(char::is_whitespace)
        .context("usage: <user> <type> @ <loc>[, <loc>...|*]")?;
    let (appointment_type, locations) = selection
        .split_once('@')
        .context("separate the type from its locations with `@`")?;

    let appointment_type = appointment_type.trim();
    if appointment_type.is_empty() {
        bail!("missing appointment type");
    }

    let locations = locations.trim();
    let locations = if locations == "*" {
        Locations::All
    } else {
        let named: Vec<String> = locations
            .split(',')
            .map(str::trim)
            .filter(|location| !location.is_empty())
            .map(str::to_owned)
            .collect();
        if named.is_empty() {
            bail!("missing locations");
        }
        Locations::Named(named)
    };

    Ok((parse_subscriber(user)?, appointment_type.to_owned(), locations))
}

/// Run a command against the service and build the reply shown to the user.
pub(crate) fn execute(service: &SlotWatchService, command: Command) -> String {
    match command {
        Command::Help => HELP.to_owned(),
        Command::Types => numbered(&service.appointment_types()),
        Command::Locations(appointment_type) => match service.locations_for(&appointment_type) {
            Ok(locations) if locations.is_empty() => {
                format!("No locations are published for {appointment_type}.")
            }
            Ok(locations) => numbered(&locations),
            Err(err) => err.to_string(),
        },
        Command::Subscribe {
            subscriber,
            appointment_type,
            locations,
        } => {
            let added = match locations {
                Locations::All => match service.locations_for(&appointment_type) {
                    Ok(published) if published.is_empty() => {
                        return format!("No locations are published for {appointment_type}.");
                    }
                    _ => service.subscribe_all_locations(subscriber, &appointment_type),
                },
                Locations::Named(names) => {
                    service.subscribe(subscriber, &appointment_type, names.as_slice())
                }
            };
            match added {
                Ok(keys) if keys.is_empty() => "Already subscribed to all of those.".to_owned(),
                Ok(keys) => {
                    let names: Vec<&str> = keys.iter().map(|key| key.location.as_str()).collect();
                    format!(
                        "Subscription confirmed. You'll be alerted for {appointment_type} at {}.",
                        names.join(", ")
                    )
                }
                Err(err) => format!("Subscription failed: {err}"),
            }
        }
        Command::Unsubscribe {
            subscriber,
            appointment_type,
            locations,
        } => {
            let keys: Vec<SubscriptionKey> = match locations {
                Locations::All => service
                    .subscriptions(subscriber)
                    .into_iter()
                    .filter(|key| key.appointment_type == appointment_type)
                    .collect(),
                Locations::Named(names) => names
                    .into_iter()
                    .map(|location| SubscriptionKey::new(appointment_type.clone(), location))
                    .collect(),
            };
            match service.unsubscribe(subscriber, &keys) {
                Unsubscribed { removed: 0, .. } => {
                    "No matching subscriptions to remove.".to_owned()
                }
                Unsubscribed { remaining: 0, .. } => {
                    "All your subscriptions have been removed.".to_owned()
                }
                Unsubscribed { removed, remaining } => format!(
                    "Removed {removed} subscription(s); {remaining} remaining."
                ),
            }
        }
        Command::List(subscriber) => {
            let keys = service.subscriptions(subscriber);
            if keys.is_empty() {
                return "You have no subscriptions.".to_owned();
            }
            let mut reply = String::from("Your subscriptions:");
            for key in keys {
                let _infallible = write!(reply, "\n- {key}");
            }
            reply
        }
        Command::Clear(subscriber) => match service.clear_all(subscriber) {
            0 => "You had no subscriptions to clear.".to_owned(),
            cleared => format!("All {cleared} of your subscriptions have been cleared."),
        },
    }
}

fn numbered(items: &[String]) -> String {
    items
        .iter()
        .enumerate()
        .map(|(index, item)| format!("{:>3}. {item}", index + 1))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Answer commands from stdin until shutdown or end of input.
#[expect(clippy::print_stdout, reason = "command replies are the console's output")]
pub(crate) async fn run(service: Arc<SlotWatchService>, shutdown: CancellationToken) {
    let mut lines = spawn_stdin_reader();
    println!("{HELP}");

    loop {
        let line = tokio::select! {
            () = shutdown.cancelled() => break,
            line = lines.recv() => line,
        };
        let Some(line) = line else {
            debug!("Console input closed");
            break;
        };
        if line.trim().is_empty() {
            continue;
        }

        match parse_command(&line) {
            Ok(command) => println!("{}", execute(&service, command)),
            Err(err) => {
                warn!(input = %line, error = %err, "Rejected console command");
                println!("{err}");
            }
        }
    }
}

// Blocking stdin reads live on their own thread so they never hold up runtime shutdown.
fn spawn_stdin_reader() -> mpsc::UnboundedReceiver<String> {
    let (sender, receiver) = mpsc::unbounded_channel();
    thread::spawn(move || {
        for line in io::stdin().lock().lines() {
            let Ok(line) = line else {
                break;
            };
            if sender.send(line).is_err() {
                break;
            }
        }
    });
    receiver
}

#[cfg(test)]
mod tests {
    use slotwatch_core::SubscriptionRegistry;

    use super::*;

    const ALICE: SubscriberId = SubscriberId(42);

    fn service() -> SlotWatchService {
        SlotWatchService::new(
            Arc::new(slotwatch_provider_njmvc::catalog()),
            Arc::new(SubscriptionRegistry::new()),
        )
    }

    #[test]
    fn parses_subscribe_with_named_locations() {
        let command = parse_command("subscribe 42 REAL ID @ OAKLAND, BAYONNE").expect("valid");
        assert_eq!(
            command,
            Command::Subscribe {
                subscriber: ALICE,
                appointment_type: "REAL ID".to_owned(),
                locations: Locations::Named(vec!["OAKLAND".to_owned(), "BAYONNE".to_owned()]),
            },
            "named locations"
        );
    }

    #[test]
    fn parses_wildcard_and_simple_commands() {
        assert_eq!(
            parse_command("unsubscribe 42 RENEWAL: CDL @ *").expect("valid"),
            Command::Unsubscribe {
                subscriber: ALICE,
                appointment_type: "RENEWAL: CDL".to_owned(),
                locations: Locations::All,
            },
            "wildcard"
        );
        assert_eq!(parse_command("list 42").expect("valid"), Command::List(ALICE), "list");
        assert_eq!(parse_command("CLEAR 42").expect("valid"), Command::Clear(ALICE), "clear");
        assert_eq!(
            parse_command("locations REAL ID").expect("valid"),
            Command::Locations("REAL ID".to_owned()),
            "locations"
        );
    }

    #[test]
    fn rejects_malformed_commands() {
        for line in [
            "subscribe 42 REAL ID",
            "subscribe x REAL ID @ OAKLAND",
            "subscribe 42 REAL ID @ ,",
            "list",
            "frobnicate",
        ] {
            assert!(parse_command(line).is_err(), "{line:?} must be rejected");
        }
    }

    #[test]
    fn subscribe_list_unsubscribe_round() {
        let service = service();

        let reply = execute(
            &service,
            parse_command("subscribe 42 REAL ID @ OAKLAND, NEWARK").expect("valid"),
        );
        assert!(reply.contains("OAKLAND, NEWARK"), "confirmation lists locations: {reply}");

        let listed = execute(&service, Command::List(ALICE));
        assert!(listed.contains("- REAL ID @ NEWARK"), "listed: {listed}");

        let removed = execute(
            &service,
            parse_command("unsubscribe 42 REAL ID @ *").expect("valid"),
        );
        assert_eq!(removed, "All your subscriptions have been removed.", "wildcard removal");
        assert_eq!(
            execute(&service, Command::List(ALICE)),
            "You have no subscriptions.",
            "nothing left"
        );
    }

    #[test]
    fn unknown_location_is_reported() {
        let service = service();
        let reply = execute(
            &service,
            parse_command("subscribe 42 REAL ID @ ATLANTIS").expect("valid"),
        );
        assert!(reply.starts_with("Subscription failed"), "failure reply: {reply}");
    }

    #[test]
    fn wildcard_subscribe_without_published_locations() {
        let service = service();
        let reply = execute(
            &service,
            parse_command("subscribe 42 RENEWAL: CDL @ *").expect("valid"),
        );
        assert_eq!(
            reply, "No locations are published for RENEWAL: CDL.",
            "nothing to subscribe to"
        );
        assert!(service.subscriptions(ALICE).is_empty(), "no subscriptions added");
    }

    #[test]
    fn clear_reports_when_nothing_to_clear() {
        let service = service();
        assert_eq!(
            execute(&service, Command::Clear(ALICE)),
            "You had no subscriptions to clear.",
            "empty clear"
        );
    }
}
