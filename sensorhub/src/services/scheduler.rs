use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::{self, Instant, MissedTickBehavior};

use crate::devices::{Edge, EdgeSource};
use crate::errors::HubError;

/// Work bound to one source and one topic.
#[async_trait]
pub trait Action: Send + 'static {
    async fn run(&mut self);
}

enum Task {
    Periodic {
        name: String,
        interval: Duration,
        action: Box<dyn Action>,
    },
    EdgeTrigger {
        name: String,
        source: Box<dyn EdgeSource>,
        on_asserted: Box<dyn Action>,
        on_cleared: Box<dyn Action>,
    },
}

/// Collects the hub's tasks before any of them runs.
#[derive(Default)]
pub struct Scheduler {
    tasks: Vec<Task>,
}

impl Scheduler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// Runs `action` every `interval`, the first time one full interval
    /// after [`start`](Self::start).
    pub fn register_periodic<A: Action>(&mut self, name: &str, interval: Duration, action: A) -> Result<(), HubError> {
        if interval.is_zero() {
            return Err(HubError::Scheduler(format!("{name}: interval must be greater than zero")));
        }

        self.tasks.push(Task::Periodic {
            name: name.to_string(),
            interval,
            action: Box::new(action),
        });

        Ok(())
    }

    /// Runs `on_asserted` or `on_cleared` once per level change of `source`.
    /// The input is assumed cleared until it reports otherwise.
    pub fn register_edge_trigger<A, C>(&mut self, name: &str, source: Box<dyn EdgeSource>, on_asserted: A, on_cleared: C)
    where
        A: Action,
        C: Action,
    {
        self.tasks.push(Task::EdgeTrigger {
            name: name.to_string(),
            source,
            on_asserted: Box::new(on_asserted),
            on_cleared: Box::new(on_cleared),
        });
    }

    /// Spawns one worker per task. Must be called inside a tokio runtime.
    pub fn start(self) -> Result<SchedulerHandle, HubError> {
        let (stop, stopped) = watch::channel(false);
        let mut workers = Vec::with_capacity(self.tasks.len());

        for task in self.tasks {
            let worker = match task {
                Task::Periodic { name, interval, action } => {
                    tracing::info!("scheduling {} every {:?}", name, interval);
                    tokio::spawn(run_periodic(interval, action, stopped.clone()))
                }
                Task::EdgeTrigger { name, mut source, on_asserted, on_cleared } => {
                    let (edges, received) = mpsc::unbounded_channel();
                    source.subscribe(edges)?;
                    tracing::info!("listening for {} edges", name);
                    tokio::spawn(run_edge_trigger(source, received, on_asserted, on_cleared, stopped.clone()))
                }
            };
            workers.push(worker);
        }

        Ok(SchedulerHandle { stop, workers })
    }
}

pub struct SchedulerHandle {
    stop: watch::Sender<bool>,
    workers: Vec<JoinHandle<()>>,
}

impl SchedulerHandle {
    /// Stops every timer and edge listener and waits for the workers to exit.
    /// A tick that is in progress is abandoned.
    pub async fn shutdown(self) {
        let _ = self.stop.send(true);

        for worker in self.workers {
            if let Err(e) = worker.await {
                tracing::error!("Scheduler worker failed: {}", e);
            }
        }
    }
}

async fn run_periodic(interval: Duration, mut action: Box<dyn Action>, mut stopped: watch::Receiver<bool>) {
    let mut ticker = time::interval_at(Instant::now() + interval, interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = ticker.tick() => {}
            _ = stopped.changed() => break,
        }

        tokio::select! {
            _ = action.run() => {}
            _ = stopped.changed() => break,
        }
    }
}

async fn run_edge_trigger(
    source: Box<dyn EdgeSource>,
    mut edges: mpsc::UnboundedReceiver<Edge>,
    mut on_asserted: Box<dyn Action>,
    mut on_cleared: Box<dyn Action>,
    mut stopped: watch::Receiver<bool>,
) {
    let mut level = Edge::Cleared;

    loop {
        let edge = tokio::select! {
            edge = edges.recv() => edge,
            _ = stopped.changed() => break,
        };

        let Some(edge) = edge else { break };
        if edge == level {
            continue;
        }
        level = edge;

        let action = match edge {
            Edge::Asserted => &mut on_asserted,
            Edge::Cleared => &mut on_cleared,
        };

        tokio::select! {
            _ = action.run() => {}
            _ = stopped.changed() => break,
        }
    }

    // releases the interrupt handler
    drop(source);
}
