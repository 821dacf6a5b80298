//! A traffic light cycling through red, green and orange, interrupted
//! by an operator switching it to manual control.
//!
//! Run with: `cargo run --example traffic_light`

use feldspar::{
    Atomic, AtomicModel, Bag, CoupledModel, Duration, Simulation, SimulationOptions,
};
use serde_json::json;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Phase {
    Red,
    Green,
    Orange,
    Manual,
}

struct TrafficLight {
    phase: Phase,
}

impl Atomic for TrafficLight {
    fn initialize(&mut self) {
        self.phase = Phase::Red;
    }

    fn time_advance(&self) -> Duration {
        match self.phase {
            Phase::Red => Duration::base(60),
            Phase::Green => Duration::base(50),
            Phase::Orange => Duration::base(10),
            Phase::Manual => Duration::INFINITY,
        }
    }

    fn internal_transition(&mut self) {
        self.phase = match self.phase {
            Phase::Red => Phase::Green,
            Phase::Green => Phase::Orange,
            Phase::Orange => Phase::Red,
            Phase::Manual => Phase::Manual,
        };
    }

    fn external_transition(&mut self, _elapsed: Duration, input: &Bag) {
        if input.values("command").iter().any(|v| v == &json!("to_manual")) {
            self.phase = Phase::Manual;
        }
    }

    fn output(&mut self, output: &mut Bag) {
        let next = match self.phase {
            Phase::Red => "green",
            Phase::Green => "orange",
            Phase::Orange => "red",
            Phase::Manual => "manual",
        };
        output.post("state", json!(next));
    }
}

/// Sends the manual-override command after a fixed delay.
struct Operator {
    delay: i64,
    sent: bool,
}

impl Atomic for Operator {
    fn initialize(&mut self) {
        self.sent = false;
    }

    fn time_advance(&self) -> Duration {
        if self.sent {
            Duration::INFINITY
        } else {
            Duration::base(self.delay)
        }
    }

    fn internal_transition(&mut self) {
        self.sent = true;
    }

    fn output(&mut self, output: &mut Bag) {
        output.post("out", json!("to_manual"));
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let mut light = AtomicModel::new("light", TrafficLight { phase: Phase::Red })
        .with_input("command")
        .with_output("state");
    light.observe_output(
        "state",
        Box::new(|observation| {
            println!(
                "t={:<6} light switches to {}",
                observation.time.to_string(),
                observation.payload.as_ref().unwrap()
            );
            Ok(())
        }),
    )?;

    let mut crossing = CoupledModel::new("crossing");
    crossing.add_child(light.into())?;
    crossing.add_child(
        AtomicModel::new("operator", Operator { delay: 250, sent: false })
            .with_output("out")
            .into(),
    )?;
    crossing.add_internal_coupling("operator", "out", "light", "command")?;

    let mut simulation = Simulation::new(
        crossing.into(),
        SimulationOptions::new().with_duration(Duration::base(1000)),
    )?;
    simulation.simulate()?;

    println!("\nfinal time : {}", simulation.time());
    println!("stats      : {}", simulation.export_stats());
    Ok(())
}
