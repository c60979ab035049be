//! Runs [`PolygonFeatureSync`] fetches as tasks on the current thread.
//!
//! The driver owns the state machine. Commands arrive through a
//! [`SyncHandle`]; every fetch the machine asks for is spawned onto a local
//! [`JoinSet`], so completions are applied one at a time between commands. A
//! fetch task that panics still completes its request, as a failure. `run`
//! must be polled inside a [`tokio::task::LocalSet`].

use std::collections::HashMap;
use std::rc::Rc;

use polymap_map::MapSurface;
use tokio::sync::{mpsc, oneshot};
use tokio::task::{self, JoinSet};

use super::{FetchOutcome, FetchRequest, PolygonFeatureSync};
use crate::draw::{DrawController, DrawEvent};
use crate::error::{DriverStopped, QueryError, SyncError};
use crate::model::DrawId;
use crate::name::NameProvider;
use crate::overpass::FeatureQuery;

/// Work sent to a running [`SyncDriver`].
#[derive(Debug)]
pub enum Command {
    DrawEvent(DrawEvent),
    ActivateDraw,
    DeleteDraw(DrawId),
    RetryCreate(DrawId),
    ZoomToFeature {
        feature_id: String,
        polygon_id: Option<DrawId>,
        reply: oneshot::Sender<bool>,
    },
}

/// Cloneable sender of [`Command`]s. The driver stops once every handle is
/// dropped and every fetch task has finished.
#[derive(Debug, Clone)]
pub struct SyncHandle {
    tx: mpsc::UnboundedSender<Command>,
}

impl SyncHandle {
    fn send(&self, command: Command) -> Result<(), DriverStopped> {
        self.tx.send(command).map_err(|_| DriverStopped)
    }

    /// Forward a draw controller event.
    pub fn draw_event(&self, event: DrawEvent) -> Result<(), DriverStopped> {
        self.send(Command::DrawEvent(event))
    }

    pub fn activate_draw(&self) -> Result<(), DriverStopped> {
        self.send(Command::ActivateDraw)
    }

    pub fn delete_draw(&self, id: DrawId) -> Result<(), DriverStopped> {
        self.send(Command::DeleteDraw(id))
    }

    pub fn retry_create(&self, id: DrawId) -> Result<(), DriverStopped> {
        self.send(Command::RetryCreate(id))
    }

    /// Frame a fetched feature. Resolves to whether it was found.
    pub async fn zoom_to_feature(
        &self,
        feature_id: impl Into<String>,
        polygon_id: Option<DrawId>,
    ) -> Result<bool, DriverStopped> {
        let (reply, response) = oneshot::channel();
        self.send(Command::ZoomToFeature {
            feature_id: feature_id.into(),
            polygon_id,
            reply,
        })?;
        response.await.map_err(|_| DriverStopped)
    }
}

/// Executes a [`PolygonFeatureSync`] against a query service and a name
/// provider.
pub struct SyncDriver<S, D, Q, N> {
    sync: PolygonFeatureSync<S, D>,
    query: Rc<Q>,
    names: Rc<N>,
    commands: mpsc::UnboundedReceiver<Command>,
}

impl<S, D, Q, N> SyncDriver<S, D, Q, N>
where
    S: MapSurface,
    D: DrawController,
    Q: FeatureQuery + 'static,
    N: NameProvider + 'static,
{
    pub fn new(sync: PolygonFeatureSync<S, D>, query: Q, names: N) -> (Self, SyncHandle) {
        let (tx, commands) = mpsc::unbounded_channel();
        let driver = Self {
            sync,
            query: Rc::new(query),
            names: Rc::new(names),
            commands,
        };
        (driver, SyncHandle { tx })
    }

    /// The machine, for subscribing to its feeds before `run`.
    pub fn sync(&self) -> &PolygonFeatureSync<S, D> {
        &self.sync
    }

    /// Process commands and completions until every handle is dropped and
    /// nothing is in flight. Returns the machine in its final state.
    pub async fn run(self) -> PolygonFeatureSync<S, D> {
        let Self {
            mut sync,
            query,
            names,
            mut commands,
        } = self;
        let mut fetches = JoinSet::new();
        let mut in_flight: HashMap<task::Id, FetchRequest> = HashMap::new();
        let mut open = true;

        log::debug!("Sync driver started");
        while open || !fetches.is_empty() {
            tokio::select! {
                command = commands.recv(), if open => match command {
                    Some(command) => {
                        for request in apply(&mut sync, command) {
                            let spawned = fetches.spawn_local(fetch(
                                request.clone(),
                                Rc::clone(&query),
                                Rc::clone(&names),
                            ));
                            in_flight.insert(spawned.id(), request);
                        }
                    }
                    None => {
                        log::debug!("All sync handles dropped, draining {} fetches", fetches.len());
                        open = false;
                    }
                },
                Some(joined) = fetches.join_next_with_id(), if !fetches.is_empty() => {
                    let outcome = match joined {
                        Ok((id, outcome)) => {
                            in_flight.remove(&id);
                            Some(outcome)
                        }
                        Err(e) => match in_flight.remove(&e.id()) {
                            Some(request) => {
                                log::error!(
                                    "Fetch {:?} for {} failed: {}",
                                    request.ticket(),
                                    request.feature().id,
                                    e
                                );
                                Some(failed(request, e.to_string()))
                            }
                            None => {
                                log::error!("Untracked fetch task failed: {}", e);
                                None
                            }
                        },
                    };
                    if let Some(outcome) = outcome {
                        sync.complete(outcome);
                    }
                }
            }
        }

        log::debug!("Sync driver stopped with {} records", sync.len());
        sync
    }
}

fn apply<S: MapSurface, D: DrawController>(
    sync: &mut PolygonFeatureSync<S, D>,
    command: Command,
) -> Vec<FetchRequest> {
    match command {
        Command::DrawEvent(event) => sync.handle_draw_event(event),
        Command::ActivateDraw => {
            sync.activate_draw();
            Vec::new()
        }
        Command::DeleteDraw(id) => {
            sync.delete_draw(&id);
            Vec::new()
        }
        Command::RetryCreate(id) => sync.retry_create(&id).into_iter().collect(),
        Command::ZoomToFeature {
            feature_id,
            polygon_id,
            reply,
        } => {
            let found = sync.zoom_to_feature(&feature_id, polygon_id.as_ref());
            // The caller may have stopped waiting.
            let _ = reply.send(found);
            Vec::new()
        }
    }
}

async fn fetch<Q, N>(request: FetchRequest, query: Rc<Q>, names: Rc<N>) -> FetchOutcome
where
    Q: FeatureQuery,
    N: NameProvider,
{
    match request {
        FetchRequest::Create { ticket, feature } => {
            let (name, features) = tokio::join!(
                names.name_for(&feature),
                query.query_features(&feature.geometry)
            );
            let result = match (name, features) {
                (None, _) => Err(SyncError::NameCancelled),
                (Some(_), Err(e)) => Err(SyncError::Query(e)),
                (Some(name), Ok(features)) => Ok((name, features)),
            };
            FetchOutcome::Create {
                ticket,
                feature,
                result,
            }
        }
        FetchRequest::Update { ticket, feature } => {
            let result = query.query_features(&feature.geometry).await;
            FetchOutcome::Update {
                ticket,
                feature,
                result,
            }
        }
    }
}

/// Outcome for a request whose task never produced one.
fn failed(request: FetchRequest, reason: String) -> FetchOutcome {
    let error = QueryError::TaskFailed(reason);
    match request {
        FetchRequest::Create { ticket, feature } => FetchOutcome::Create {
            ticket,
            feature,
            result: Err(SyncError::Query(error)),
        },
        FetchRequest::Update { ticket, feature } => FetchOutcome::Update {
            ticket,
            feature,
            result: Err(error),
        },
    }
}
