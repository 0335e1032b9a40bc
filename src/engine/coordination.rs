use chrono::{DateTime, Utc};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock};
use tokio::runtime::Handle;
use tokio::sync::broadcast::{self, error::RecvError};

use crate::agents::{Agent, NameSource};
use crate::config::SimulationConfig;
use crate::engine::detection::DeadlockDetector;
use crate::engine::{Pacing, StopSignal, TableContext};
use crate::error::{Result, SimulationError};
use crate::resources::Utensil;
use crate::types::{AgentView, Generation, SimulationEvent, TableSnapshot};

/// One started table: philosophers, utensils and the signal that retires them.
///
/// Never mutated after construction; a restart builds a new one.
#[derive(Debug)]
pub struct Population {
    generation: Generation,
    agents: Vec<Arc<Agent>>,
    utensils: Vec<Arc<Utensil>>,
    stop: StopSignal,
    started_at: DateTime<Utc>,
    deadlock_reported: AtomicBool,
}

impl Population {
    /// Lays out `count` utensils in a ring. Philosopher `i` takes utensil `i`
    /// as its right and utensil `i - 1` (wrapping) as its left.
    fn build(generation: Generation, count: usize, table: &TableContext) -> Self {
        let utensils: Vec<Arc<Utensil>> = (0..count)
            .map(|seat| Arc::new(Utensil::new(seat, table.event_capacity)))
            .collect();

        let agents = NameSource::new()
            .take(count)
            .enumerate()
            .map(|(seat, identity)| {
                let left = utensils[(seat + count - 1) % count].clone();
                let right = utensils[seat].clone();
                Arc::new(Agent::new(
                    seat,
                    identity,
                    generation,
                    left,
                    right,
                    table.clone(),
                ))
            })
            .collect();

        Self {
            generation,
            agents,
            utensils,
            stop: StopSignal::new(),
            started_at: Utc::now(),
            deadlock_reported: AtomicBool::new(false),
        }
    }

    pub fn generation(&self) -> Generation {
        self.generation
    }

    pub fn agents(&self) -> &[Arc<Agent>] {
        &self.agents
    }

    pub fn utensils(&self) -> &[Arc<Utensil>] {
        &self.utensils
    }

    pub fn len(&self) -> usize {
        self.agents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.agents.is_empty()
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    pub fn is_stopped(&self) -> bool {
        self.stop.is_stopped()
    }

    pub fn is_deadlocked(&self) -> bool {
        DeadlockDetector::is_deadlocked(self.agents.iter().map(|a| a.state()))
    }

    // True only for the first caller.
    fn claim_deadlock_report(&self) -> bool {
        !self.deadlock_reported.swap(true, Ordering::SeqCst)
    }
}

struct Lifecycle {
    population_count: usize,
    last_generation: Generation,
}

/// Owns the table and is the single object observers talk to.
///
/// Start, stop and resize are serialized; readers always see either the old
/// population or the complete new one.
pub struct Coordinator {
    table: TableContext,
    lifecycle: Mutex<Lifecycle>,
    current: RwLock<Option<Arc<Population>>>,
    events: broadcast::Sender<SimulationEvent>,
}

impl Coordinator {
    pub fn new(config: &SimulationConfig) -> Self {
        let table = TableContext::from_config(config);
        let (events, _) = broadcast::channel(table.event_capacity);
        Self {
            table,
            lifecycle: Mutex::new(Lifecycle {
                population_count: config.population,
                last_generation: 0,
            }),
            current: RwLock::new(None),
            events,
        }
    }

    /// Replaces any running table with a fresh one of the configured size.
    ///
    /// Must be called from within a tokio runtime.
    pub fn start(&self) -> Result<()> {
        let runtime = Handle::try_current().map_err(|_| SimulationError::NoRuntime)?;
        let mut lifecycle = self.lock_lifecycle();
        self.start_locked(&mut lifecycle, &runtime)
    }

    /// Signals every philosopher to leave. Does not wait for them.
    pub fn stop(&self) {
        let _lifecycle = self.lock_lifecycle();
        self.stop_current();
    }

    /// Stops the table and starts a new one with `count` philosophers.
    ///
    /// The size is checked first; a rejected size leaves the running table alone.
    pub fn change_population(&self, count: usize) -> Result<()> {
        if count == 0 {
            log::warn!("rejected population size {}", count);
            return Err(SimulationError::InvalidPopulation(count));
        }
        let runtime = Handle::try_current().map_err(|_| SimulationError::NoRuntime)?;

        let mut lifecycle = self.lock_lifecycle();
        lifecycle.population_count = count;
        self.start_locked(&mut lifecycle, &runtime)
    }

    /// Starts over if the table is deadlocked, and thaws in any case.
    /// Returns whether a new table was started.
    pub fn restart(&self) -> Result<bool> {
        let restarted = if self.is_deadlocked() {
            self.start()?;
            true
        } else {
            false
        };
        self.thaw();
        Ok(restarted)
    }

    pub fn set_speed(&self, speed: u32) {
        self.table.pacing.set_speed(speed);
    }

    pub fn speed(&self) -> u32 {
        self.table.pacing.speed()
    }

    /// Only records the flag; philosophers do not consult it.
    pub fn freeze(&self) {
        self.table.pacing.freeze();
    }

    pub fn thaw(&self) {
        self.table.pacing.thaw();
    }

    pub fn is_frozen(&self) -> bool {
        self.table.pacing.is_frozen()
    }

    pub fn pacing(&self) -> &Pacing {
        &self.table.pacing
    }

    pub fn population_count(&self) -> usize {
        self.lock_lifecycle().population_count
    }

    pub fn population(&self) -> Option<Arc<Population>> {
        self.read_current().clone()
    }

    pub fn agents(&self) -> Vec<Arc<Agent>> {
        self.population()
            .map(|p| p.agents().to_vec())
            .unwrap_or_default()
    }

    pub fn utensils(&self) -> Vec<Arc<Utensil>> {
        self.population()
            .map(|p| p.utensils().to_vec())
            .unwrap_or_default()
    }

    pub fn is_running(&self) -> bool {
        self.population().is_some_and(|p| !p.is_stopped())
    }

    /// Re-reads every philosopher's live state.
    pub fn is_deadlocked(&self) -> bool {
        self.population().is_some_and(|p| p.is_deadlocked())
    }

    pub fn log_append(&self, entry: impl Into<String>) {
        self.table.log.append(entry);
    }

    pub fn drain_log(&self) -> String {
        self.table.log.drain()
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SimulationEvent> {
        self.events.subscribe()
    }

    pub fn snapshot(&self) -> TableSnapshot {
        let population = self.population();
        let (agents, utensils, deadlocked) = match &population {
            Some(p) => {
                let agents: Vec<AgentView> = p
                    .agents()
                    .iter()
                    .map(|a| AgentView {
                        identity: a.identity().to_string(),
                        state: a.state(),
                    })
                    .collect();
                let deadlocked = DeadlockDetector::is_deadlocked(agents.iter().map(|a| a.state));
                let utensils = p.utensils().iter().map(|u| u.is_held()).collect();
                (agents, utensils, deadlocked)
            }
            None => (Vec::new(), Vec::new(), false),
        };

        TableSnapshot {
            agents,
            utensils,
            deadlocked,
            speed: self.speed(),
            frozen: self.is_frozen(),
            started_at: population.as_ref().map(|p| p.started_at()),
            taken_at: Utc::now(),
        }
    }

    fn start_locked(&self, lifecycle: &mut Lifecycle, runtime: &Handle) -> Result<()> {
        if lifecycle.population_count == 0 {
            return Err(SimulationError::InvalidPopulation(0));
        }
        self.stop_current();

        lifecycle.last_generation += 1;
        let generation = lifecycle.last_generation;
        let population = Arc::new(Population::build(
            generation,
            lifecycle.population_count,
            &self.table,
        ));

        // Wire the fan-in before anything can publish.
        for utensil in population.utensils() {
            runtime.spawn(forward_events(
                utensil.subscribe(),
                population.clone(),
                self.events.clone(),
            ));
        }
        for agent in population.agents() {
            runtime.spawn(forward_events(
                agent.subscribe(),
                population.clone(),
                self.events.clone(),
            ));
        }

        self.table.log.accept_generation(generation);
        *self.write_current() = Some(population.clone());

        for agent in population.agents() {
            runtime.spawn(agent.clone().run(population.stop.clone()));
        }

        log::info!(
            "started population {} with {} philosophers",
            generation,
            population.len()
        );
        let _ = self.events.send(SimulationEvent::PopulationStarted {
            count: population.len(),
        });
        Ok(())
    }

    fn stop_current(&self) {
        self.table.log.close();
        if let Some(population) = self.read_current().as_ref() {
            if !population.is_stopped() {
                population.stop.stop();
                log::info!("stopped population {}", population.generation());
            }
        }
    }

    fn lock_lifecycle(&self) -> MutexGuard<'_, Lifecycle> {
        self.lifecycle.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn read_current(&self) -> std::sync::RwLockReadGuard<'_, Option<Arc<Population>>> {
        self.current.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write_current(&self) -> std::sync::RwLockWriteGuard<'_, Option<Arc<Population>>> {
        self.current.write().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for Coordinator {
    fn default() -> Self {
        Self::new(&SimulationConfig::default())
    }
}

impl Drop for Coordinator {
    fn drop(&mut self) {
        self.stop_current();
    }
}

/// Re-publishes one child's events on the coordinator channel and checks for
/// deadlock after every philosopher change. Ends with its population.
async fn forward_events(
    mut rx: broadcast::Receiver<SimulationEvent>,
    population: Arc<Population>,
    events: broadcast::Sender<SimulationEvent>,
) {
    loop {
        let event = tokio::select! {
            received = rx.recv() => received,
            _ = population.stop.stopped() => break,
        };
        match event {
            Ok(event) => {
                let agent_change = event.is_agent_change();
                let _ = events.send(event);
                if agent_change && population.is_deadlocked() && population.claim_deadlock_report()
                {
                    log::warn!(
                        "deadlock: all {} philosophers hold their right utensil",
                        population.len()
                    );
                    let _ = events.send(SimulationEvent::DeadlockDetected {
                        count: population.len(),
                    });
                }
            }
            Err(RecvError::Lagged(skipped)) => {
                log::debug!("observer lagged, skipped {} events", skipped);
            }
            Err(RecvError::Closed) => break,
        }
    }
}
