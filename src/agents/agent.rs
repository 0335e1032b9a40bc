use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::sync::broadcast;

use crate::engine::{StopSignal, TableContext};
use crate::error::{Result, SimulationError};
use crate::lifecycle::{AgentStateMachine, LifecycleEvent};
use crate::resources::Utensil;
use crate::types::{AgentState, Generation, Seat, SimulationEvent};

/// A philosopher seated between two utensils.
///
/// Utensils are shared with the neighbours and owned by the population; the
/// table context belongs to the coordinator.
#[derive(Debug)]
pub struct Agent {
    seat: Seat,
    identity: String,
    generation: Generation,
    state: Mutex<AgentState>,
    left: Arc<Utensil>,
    right: Arc<Utensil>,
    table: TableContext,
    events: broadcast::Sender<SimulationEvent>,
}

impl Agent {
    pub fn new(
        seat: Seat,
        identity: String,
        generation: Generation,
        left: Arc<Utensil>,
        right: Arc<Utensil>,
        table: TableContext,
    ) -> Self {
        let (events, _) = broadcast::channel(table.event_capacity.max(1));
        Self {
            seat,
            identity,
            generation,
            state: Mutex::new(AgentState::Thinking),
            left,
            right,
            table,
            events,
        }
    }

    pub fn seat(&self) -> Seat {
        self.seat
    }

    pub fn identity(&self) -> &str {
        &self.identity
    }

    pub fn generation(&self) -> Generation {
        self.generation
    }

    pub fn state(&self) -> AgentState {
        *self.lock_state()
    }

    pub fn left(&self) -> &Arc<Utensil> {
        &self.left
    }

    pub fn right(&self) -> &Arc<Utensil> {
        &self.right
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SimulationEvent> {
        self.events.subscribe()
    }

    /// Runs the philosopher until `stop` fires.
    ///
    /// A stop observed while sleeping or waiting for a utensil ends the loop
    /// quietly. Utensils held at that moment are left as they are; the whole
    /// population is discarded on stop.
    pub async fn run(self: Arc<Self>, stop: StopSignal) {
        match self.cycle(&stop).await {
            Err(SimulationError::Cancelled) => {
                log::trace!("{} left the table", self.identity);
            }
            Err(e) => {
                log::error!("{} stopped unexpectedly: {}", self.identity, e);
            }
            Ok(()) => {}
        }
    }

    async fn cycle(&self, stop: &StopSignal) -> Result<()> {
        self.announce();
        loop {
            self.pause(self.table.pacing.sleep_time(), stop).await?;
            self.advance(LifecycleEvent::Rested)?;

            self.right.acquire(stop).await?;
            self.advance(LifecycleEvent::RightAcquired)?;

            // The gap between the two pickups is what makes the deadlock reachable.
            self.pause(self.table.pacing.gap_time(), stop).await?;
            self.left.acquire(stop).await?;
            self.advance(LifecycleEvent::LeftAcquired)?;

            self.pause(self.table.pacing.eat_time(), stop).await?;
            self.right.release();
            self.left.release();
            self.advance(LifecycleEvent::Finished)?;
        }
    }

    async fn pause(&self, duration: Duration, stop: &StopSignal) -> Result<()> {
        if stop.is_stopped() {
            return Err(SimulationError::Cancelled);
        }
        tokio::select! {
            _ = tokio::time::sleep(duration) => Ok(()),
            _ = stop.stopped() => Err(SimulationError::Cancelled),
        }
    }

    fn advance(&self, event: LifecycleEvent) -> Result<()> {
        let mut state = self.lock_state();
        let new_state = AgentStateMachine::transition(&mut *state, event)?;
        self.report(new_state);
        Ok(())
    }

    fn announce(&self) {
        let state = self.lock_state();
        self.report(*state);
    }

    // Runs under the state lock so log and notification never lag the state.
    fn report(&self, state: AgentState) {
        log::trace!("{} ({}): {}", self.identity, self.seat, state);
        self.table.log.append_from(
            self.generation,
            format!("{}: {}\n", self.identity, state.display_name()),
        );
        let _ = self.events.send(SimulationEvent::AgentChanged {
            seat: self.seat,
            identity: self.identity.clone(),
            state,
        });
    }

    fn lock_state(&self) -> MutexGuard<'_, AgentState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
