//! Integration tests for the simulation driver.
//!
//! These tests verify end-to-end simulation scenarios including:
//! - Periodic atomic models driven to a duration bound
//! - Coupled models routing outputs into external transitions
//! - Confluent firing when input arrives exactly at expiry
//! - Observer detachment on failure
//! - Precision-level enforcement
//! - A multi-phase traffic-light model

use std::cell::RefCell;
use std::rc::Rc;

use serde_json::json;

use feldspar::{
    Atomic, AtomicModel, Bag, CoupledModel, Duration, Scale, Simulation, SimulationError,
    SimulationOptions, Status, TimePoint,
};

// ============================================================================
// Test Models
// ============================================================================

/// Fires every 25 time units, forever.
struct Metronome;

impl Atomic for Metronome {
    fn time_advance(&self) -> Duration {
        Duration::base(25)
    }
}

/// Emits one value on "out" after a fixed delay, then goes passive.
struct OneShot {
    delay: i64,
    value: serde_json::Value,
    fired: bool,
}

impl OneShot {
    fn new(delay: i64) -> Self {
        OneShot {
            delay,
            value: json!(42),
            fired: false,
        }
    }

    fn emitting(mut self, value: serde_json::Value) -> Self {
        self.value = value;
        self
    }
}

impl Atomic for OneShot {
    fn initialize(&mut self) {
        self.fired = false;
    }

    fn time_advance(&self) -> Duration {
        if self.fired {
            Duration::INFINITY
        } else {
            Duration::base(self.delay)
        }
    }

    fn internal_transition(&mut self) {
        self.fired = true;
    }

    fn output(&mut self, output: &mut Bag) {
        output.post("out", self.value.clone());
    }
}

/// Record of one delivery to a collector model.
#[derive(Clone, Debug)]
struct Delivery {
    elapsed: Duration,
    values: Vec<serde_json::Value>,
    confluent: bool,
}

/// Passive model that records everything arriving on "in".
struct Collector {
    deliveries: Rc<RefCell<Vec<Delivery>>>,
}

impl Atomic for Collector {
    fn time_advance(&self) -> Duration {
        Duration::INFINITY
    }

    fn external_transition(&mut self, elapsed: Duration, input: &Bag) {
        self.deliveries.borrow_mut().push(Delivery {
            elapsed,
            values: input.values("in").to_vec(),
            confluent: false,
        });
    }
}

// ============================================================================
// Scenarios
// ============================================================================

#[test]
fn test_single_atomic_runs_to_bound() {
    let mut simulation = Simulation::new(
        AtomicModel::new("metronome", Metronome).into(),
        SimulationOptions::new().with_duration(Duration::base(100)),
    )
    .unwrap();
    simulation.simulate().unwrap();

    assert_eq!(simulation.status(), Status::Done);
    assert_eq!(simulation.transition_stats().internal, 4);
    assert_eq!(simulation.time(), &TimePoint::new(100, Scale::BASE));
}

#[test]
fn test_coupled_routing_delivers_exactly_once() {
    let deliveries = Rc::new(RefCell::new(Vec::new()));

    let mut net = CoupledModel::new("net");
    net.add_child(AtomicModel::new("source", OneShot::new(10)).with_output("out").into())
        .unwrap();
    net.add_child(
        AtomicModel::new(
            "sink",
            Collector {
                deliveries: Rc::clone(&deliveries),
            },
        )
        .with_input("in")
        .into(),
    )
    .unwrap();
    net.add_internal_coupling("source", "out", "sink", "in").unwrap();

    let mut simulation = Simulation::new(net.into(), SimulationOptions::new()).unwrap();
    simulation.simulate().unwrap();

    assert_eq!(simulation.status(), Status::Done);
    let stats = simulation.transition_stats();
    assert_eq!(stats.internal, 1);
    assert_eq!(stats.external, 1);

    let deliveries = deliveries.borrow();
    assert_eq!(deliveries.len(), 1);
    assert_eq!(deliveries[0].elapsed, Duration::base(10));
    assert_eq!(deliveries[0].values, vec![json!(42)]);
}

#[test]
fn test_simultaneous_events_fire_confluent() {
    /// Scheduled at the same instant as its peer; records whether the
    /// input arrived through the confluent path.
    struct Clashing {
        deliveries: Rc<RefCell<Vec<Delivery>>>,
        fired: bool,
    }

    impl Atomic for Clashing {
        fn initialize(&mut self) {
            self.fired = false;
        }

        fn time_advance(&self) -> Duration {
            if self.fired {
                Duration::INFINITY
            } else {
                Duration::base(50)
            }
        }

        fn internal_transition(&mut self) {
            self.fired = true;
        }

        fn external_transition(&mut self, elapsed: Duration, input: &Bag) {
            self.deliveries.borrow_mut().push(Delivery {
                elapsed,
                values: input.values("in").to_vec(),
                confluent: false,
            });
        }

        fn confluent_transition(&mut self, input: &Bag) {
            self.fired = true;
            self.deliveries.borrow_mut().push(Delivery {
                elapsed: Duration::ZERO,
                values: input.values("in").to_vec(),
                confluent: true,
            });
        }
    }

    let deliveries = Rc::new(RefCell::new(Vec::new()));

    let mut net = CoupledModel::new("net");
    net.add_child(AtomicModel::new("a", OneShot::new(50)).with_output("out").into())
        .unwrap();
    net.add_child(
        AtomicModel::new(
            "b",
            Clashing {
                deliveries: Rc::clone(&deliveries),
                fired: false,
            },
        )
        .with_input("in")
        .into(),
    )
    .unwrap();
    net.add_internal_coupling("a", "out", "b", "in").unwrap();

    let mut simulation = Simulation::new(net.into(), SimulationOptions::new()).unwrap();
    simulation.simulate().unwrap();

    let stats = simulation.transition_stats();
    assert_eq!(stats.internal, 1, "only A takes the plain internal path");
    assert_eq!(stats.confluent, 1);
    assert_eq!(stats.external, 0);

    let deliveries = deliveries.borrow();
    assert_eq!(deliveries.len(), 1);
    assert!(deliveries[0].confluent);
    assert_eq!(deliveries[0].values, vec![json!(42)]);
}

#[test]
fn test_failing_port_observer_is_detached() {
    // Outputs every cycle so the observers have something to see.
    struct Ticking;
    impl Atomic for Ticking {
        fn time_advance(&self) -> Duration {
            Duration::base(10)
        }

        fn output(&mut self, output: &mut Bag) {
            output.post("tick", json!("tick"));
        }
    }
    let mut model = AtomicModel::new("ticking", Ticking).with_output("tick");

    let failures = Rc::new(RefCell::new(0u32));
    let notifications = Rc::new(RefCell::new(0u32));
    {
        let failures = Rc::clone(&failures);
        model
            .observe_output(
                "tick",
                Box::new(move |_| {
                    *failures.borrow_mut() += 1;
                    Err("observer failure".into())
                }),
            )
            .unwrap();
    }
    {
        let notifications = Rc::clone(&notifications);
        model
            .observe_output(
                "tick",
                Box::new(move |observation| {
                    assert!(observation.payload.is_some());
                    *notifications.borrow_mut() += 1;
                    Ok(())
                }),
            )
            .unwrap();
    }

    let mut simulation = Simulation::new(
        model.into(),
        SimulationOptions::new().with_duration(Duration::base(30)),
    )
    .unwrap();
    simulation.simulate().unwrap();

    assert_eq!(simulation.status(), Status::Done);
    assert_eq!(*failures.borrow(), 1, "failing observer fires once, then detaches");
    assert_eq!(*notifications.borrow(), 3, "surviving observer sees every cycle");
}

#[test]
fn test_unrepresentable_time_advance_aborts() {
    /// Declared at femto precision but advancing by teraseconds.
    struct OutOfRange;

    impl Atomic for OutOfRange {
        fn time_advance(&self) -> Duration {
            Duration::new(1000, Scale::TERA)
        }

        fn precision(&self) -> Scale {
            Scale::FEMTO
        }
    }

    let mut simulation =
        Simulation::new(AtomicModel::new("coarse", OutOfRange).into(), SimulationOptions::new())
            .unwrap();
    let error = simulation.simulate().unwrap_err();

    assert!(matches!(error, SimulationError::InvalidDuration { .. }));
    assert_eq!(simulation.status(), Status::Aborted);
    assert!(simulation.last_error().is_some());
}

// ============================================================================
// Multiscale scheduling
// ============================================================================

#[test]
fn test_components_at_different_scales_interleave() {
    /// Fires every 400 milliseconds, scheduling at milli precision.
    struct FastLane;

    impl Atomic for FastLane {
        fn time_advance(&self) -> Duration {
            Duration::new(400, Scale::MILLI)
        }

        fn precision(&self) -> Scale {
            Scale::MILLI
        }
    }

    let mut net = CoupledModel::new("net");
    net.add_child(AtomicModel::new("fast", FastLane).into()).unwrap();
    net.add_child(AtomicModel::new("slow", Metronome).into()).unwrap();

    let mut simulation = Simulation::new(
        net.into(),
        SimulationOptions::new().with_duration(Duration::base(50)),
    )
    .unwrap();
    simulation.simulate().unwrap();

    // 125 sub-second firings interleave exactly with 2 whole-second ones.
    let stats = simulation.transition_stats();
    assert_eq!(stats.internal, 125 + 2);
    assert_eq!(simulation.time(), &TimePoint::new(50, Scale::BASE));
}

#[test]
fn test_coarse_precision_model_truncates_the_clock() {
    /// Schedules in kiloseconds only.
    struct Coarse;

    impl Atomic for Coarse {
        fn time_advance(&self) -> Duration {
            Duration::new(1, Scale::KILO)
        }

        fn precision(&self) -> Scale {
            Scale::KILO
        }
    }

    // Starting mid-quantum at t = 500, the first kilosecond advance
    // truncates the clock onto the KILO grid.
    let mut simulation = Simulation::new(
        AtomicModel::new("coarse", Coarse).into(),
        SimulationOptions::new()
            .with_duration(Duration::new(2, Scale::KILO))
            .with_virtual_time(TimePoint::new(500, Scale::BASE)),
    )
    .unwrap();
    simulation.simulate().unwrap();

    assert_eq!(simulation.transition_stats().internal, 2);
    assert_eq!(simulation.time(), &TimePoint::new(2000, Scale::BASE));
    assert_eq!(simulation.time().precision(), Scale::KILO);
}

// ============================================================================
// Traffic light
// ============================================================================

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum LightPhase {
    Red,
    Green,
    Orange,
    Manual,
}

struct TrafficLight {
    phase: LightPhase,
    visited: Rc<RefCell<Vec<LightPhase>>>,
}

impl TrafficLight {
    fn new(visited: Rc<RefCell<Vec<LightPhase>>>) -> Self {
        TrafficLight {
            phase: LightPhase::Red,
            visited,
        }
    }
}

impl Atomic for TrafficLight {
    fn initialize(&mut self) {
        self.phase = LightPhase::Red;
    }

    fn time_advance(&self) -> Duration {
        match self.phase {
            LightPhase::Red => Duration::base(60),
            LightPhase::Green => Duration::base(50),
            LightPhase::Orange => Duration::base(10),
            LightPhase::Manual => Duration::INFINITY,
        }
    }

    fn internal_transition(&mut self) {
        self.phase = match self.phase {
            LightPhase::Red => LightPhase::Green,
            LightPhase::Green => LightPhase::Orange,
            LightPhase::Orange => LightPhase::Red,
            LightPhase::Manual => LightPhase::Manual,
        };
        self.visited.borrow_mut().push(self.phase);
    }

    fn external_transition(&mut self, _elapsed: Duration, input: &Bag) {
        if input.values("command").iter().any(|v| v == &json!("to_manual")) {
            self.phase = LightPhase::Manual;
            self.visited.borrow_mut().push(self.phase);
        }
    }
}

#[test]
fn test_traffic_light_phase_cycle() {
    let visited = Rc::new(RefCell::new(Vec::new()));
    let mut simulation = Simulation::new(
        AtomicModel::new("light", TrafficLight::new(Rc::clone(&visited)))
            .with_input("command")
            .into(),
        SimulationOptions::new().with_duration(Duration::base(1000)),
    )
    .unwrap();
    simulation.simulate().unwrap();

    // One full cycle is 120 units (60 + 50 + 10); eight cycles complete
    // within 1000 units and the ninth red phase is still running.
    let visited = visited.borrow();
    assert_eq!(visited.len(), 24);
    for cycle in visited.chunks(3) {
        assert_eq!(
            cycle,
            &[LightPhase::Green, LightPhase::Orange, LightPhase::Red]
        );
    }
    assert_eq!(simulation.transition_stats().internal, 24);
}

#[test]
fn test_traffic_light_pinned_to_manual() {
    let visited = Rc::new(RefCell::new(Vec::new()));

    let mut net = CoupledModel::new("crossing");
    net.add_child(
        AtomicModel::new("light", TrafficLight::new(Rc::clone(&visited)))
            .with_input("command")
            .into(),
    )
    .unwrap();
    net.add_child(
        AtomicModel::new("operator", OneShot::new(30).emitting(json!("to_manual")))
            .with_output("out")
            .into(),
    )
    .unwrap();
    net.add_internal_coupling("operator", "out", "light", "command").unwrap();

    let mut simulation = Simulation::new(net.into(), SimulationOptions::new()).unwrap();
    simulation.simulate().unwrap();

    // The operator interrupts the first red phase at t = 30; the light
    // pins to manual and nothing remains scheduled.
    assert_eq!(simulation.status(), Status::Done);
    assert_eq!(simulation.time(), &TimePoint::new(30, Scale::BASE));
    assert_eq!(visited.borrow().last(), Some(&LightPhase::Manual));
    let stats = simulation.transition_stats();
    assert_eq!(stats.external, 1);
    assert_eq!(stats.internal, 1, "the operator's own firing");
}
