//! Scenario runner driving a loaded scene through a channel model.
//!
//! High-level flow for one run:
//! 1) Build the configured channel model with the scene's seed and hand it
//!    the object registry through `simulation_start`.
//! 2) Fan every scheduled transmission out to all other nodes via
//!    `compute_transmission`, collecting the produced events in the
//!    time-ordered queue; the sender's completion time is extended by the
//!    model's reported HARQ delay.
//! 3) Drain the queue in time order, tallying deliveries and interference
//!    per receiver.

use rand::SeedableRng;
use rand::rngs::StdRng;

use crate::channel::{ChannelModel, ChannelModelCellular, ChannelModelDirect, ChannelModelSimple, TransmissionContext};
use crate::scene::{ModelKind, Scene};
use crate::scheduler::{EventQueue, NetworkEventKind};
use crate::settings::ModulationEntry;
use crate::timing::{schedule_at, transmission_time};
use crate::types::{NetworkMessage, ObjectRegistry, SimNanos};

/// Aggregate outcome of one scene run.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct SimulationReport {
    /// Transmissions fanned out.
    pub sent: u64,
    /// Receive-start/receive-end pairs delivered.
    pub delivered: u64,
    /// Interference pairs observed.
    pub interfered: u64,
    /// Time of the last drained event, if any event was scheduled.
    pub last_event_time: Option<SimNanos>,
}

/// Instantiate the channel model a scene selects, seeded from the scene.
pub fn build_model(scene: &Scene) -> Box<dyn ChannelModel> {
    match scene.model {
        ModelKind::Simple => Box::new(ChannelModelSimple::new(scene.simple.clone())),
        ModelKind::Direct => Box::new(ChannelModelDirect::new(scene.direct.clone(), StdRng::seed_from_u64(scene.seed))),
        ModelKind::Cellular => Box::new(ChannelModelCellular::new(scene.cellular.clone(), StdRng::seed_from_u64(scene.seed))),
    }
}

/// Modulation row the sending layer reads transmission parameters from.
fn modulation_row(scene: &Scene, index: usize) -> ModulationEntry {
    let table = match scene.model {
        ModelKind::Simple => &scene.simple.modulation,
        ModelKind::Direct => &scene.direct.modulation,
        ModelKind::Cellular => &scene.cellular.modulation,
    };
    crate::channel::modulation_row(table, index)
}

/// Run a validated scene to completion and report the outcome.
pub fn run_scene(scene: &Scene) -> SimulationReport {
    let registry = ObjectRegistry::new(scene.objects.clone());
    let mut model = build_model(scene);
    model.simulation_start(&registry);

    let mut queue = EventQueue::new();
    let mut report = SimulationReport::default();

    let mut transmissions = scene.transmissions.clone();
    transmissions.sort_by_key(|tx| tx.start_time);

    for tx in &transmissions {
        let Some(sender) = registry.get(tx.sender).cloned() else {
            continue;
        };

        let row = modulation_row(scene, model.modulation_index(&sender));
        let mut message = NetworkMessage::new(sender.id, tx.length_bits, row.bits_per_signal, row.code_rate());
        if tx.wired {
            message = message.wired();
        }

        for receiver in registry.iter().filter(|r| r.id != sender.id) {
            let mut ctx = TransmissionContext {
                now: tx.start_time,
                registry: &registry,
                events: &mut queue,
            };
            model.compute_transmission(&sender, receiver, &mut message, &mut ctx);
        }
        report.sent += 1;

        let busy_until = schedule_at(
            schedule_at(tx.start_time, transmission_time(tx.length_bits, row.data_rate)),
            model.transmission_end_delay(),
        );
        log::debug!("node {} send complete at {} ns", sender.id, busy_until);
    }

    while let Some(event) = queue.pop_next() {
        match event.kind {
            NetworkEventKind::ReceiveEnd => {
                report.delivered += 1;
                log::debug!(
                    "node {} received message from {} at {} ns",
                    event.target,
                    event.message.sender,
                    event.time
                );
            }
            NetworkEventKind::InterferenceEnd => {
                report.interfered += 1;
                log::debug!(
                    "node {} saw interference from {} until {} ns",
                    event.target,
                    event.message.sender,
                    event.time
                );
            }
            NetworkEventKind::ReceiveStart | NetworkEventKind::InterferenceStart => {}
        }
        report.last_event_time = Some(event.time);
    }

    log::info!(
        "scene complete: {} sent, {} delivered, {} interfered",
        report.sent,
        report.delivered,
        report.interfered
    );
    report
}
