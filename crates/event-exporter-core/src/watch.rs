// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Cluster-wide Event subscription.
//!
//! The kube watcher reports every object state it sees, including relists
//! and modifications. Events are treated as create-once facts, so the stream
//! is narrowed to add notifications before it reaches the dispatcher:
//!
//! - `Apply` of an object not seen before is an add; later applies of the same
//!   object are updates and are dropped.
//! - `Delete` forgets the object and is otherwise dropped.
//! - During a relist (`Init` .. `InitDone`) unseen objects are adds, and
//!   objects absent from the relist are forgotten once it completes.

use event_sinks::dispatcher::EventHandler;
use event_sinks::event::ObservedEvent;
use futures::{Stream, StreamExt};
use k8s_openapi::api::core::v1::Event;
use kube::runtime::{watcher, WatchStreamExt};
use kube::{Api, Client, Resource, ResourceExt};
use std::collections::HashSet;
use tracing::{debug, warn};

/// Subscribes to Events in all namespaces, unfiltered. Reconnects with the
/// watcher's default backoff.
pub fn watch_events(
    client: Client,
) -> impl Stream<Item = Result<watcher::Event<Event>, watcher::Error>> + Send {
    let events: Api<Event> = Api::all(client);
    watcher(events, watcher::Config::default()).default_backoff()
}

/// Reduces watcher notifications to add notifications.
#[derive(Debug, Default)]
pub struct AddFilter {
    known: HashSet<String>,
    relist: Option<HashSet<String>>,
}

impl AddFilter {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the object when the notification is the first sighting of it.
    pub fn admit<K: Resource>(&mut self, notification: watcher::Event<K>) -> Option<K> {
        match notification {
            watcher::Event::Apply(obj) => self.first_sighting(obj),
            watcher::Event::Delete(obj) => {
                self.known.remove(&object_key(&obj));
                None
            }
            watcher::Event::Init => {
                debug!("Event watch relist started");
                self.relist = Some(HashSet::new());
                None
            }
            watcher::Event::InitApply(obj) => {
                if let Some(relist) = self.relist.as_mut() {
                    relist.insert(object_key(&obj));
                }
                self.first_sighting(obj)
            }
            watcher::Event::InitDone => {
                if let Some(relist) = self.relist.take() {
                    self.known.retain(|key| relist.contains(key));
                }
                debug!("Event watch relist done, tracking {} events", self.known.len());
                None
            }
        }
    }

    fn first_sighting<K: Resource>(&mut self, obj: K) -> Option<K> {
        self.known.insert(object_key(&obj)).then_some(obj)
    }
}

fn object_key<K: Resource>(obj: &K) -> String {
    match obj.uid() {
        Some(uid) => uid,
        None => format!(
            "{}/{}",
            obj.namespace().unwrap_or_default(),
            obj.name_any()
        ),
    }
}

/// Feeds add notifications to `handler`, one at a time and in delivery order.
///
/// Each `on_add` completes before the next notification is pulled, so a slow
/// log sink slows the whole loop down. Returns only if the stream ends.
pub async fn run_watch<S, H>(stream: S, handler: &H)
where
    S: Stream<Item = Result<watcher::Event<Event>, watcher::Error>>,
    H: EventHandler + Sync + ?Sized,
{
    let mut filter = AddFilter::new();
    let mut stream = std::pin::pin!(stream);

    while let Some(notification) = stream.next().await {
        match notification {
            Ok(notification) => {
                if let Some(event) = filter.admit(notification) {
                    handler.on_add(&ObservedEvent::from(&event)).await;
                }
            }
            Err(e) => warn!("Event watch error: {e}"),
        }
    }

    warn!("Event watch stream ended");
}
