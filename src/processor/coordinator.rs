//! The coupled-model processor.

use std::collections::HashMap;

use crate::duration::Duration;
use crate::error::SimResult;
use crate::event_set::{EventSet, SchedulerKind};
use crate::model::CoupledModel;
use crate::port::Bag;
use crate::scale::Scale;
use crate::time_cache::TimeCache;
use crate::time_point::TimePoint;

use super::{Processor, TransitionStats};

/// Drives the children of one coupled model.
///
/// Children are addressed by their index in the child vector. The
/// coordinator schedules them in its own [`EventSet`], tracks their
/// elapsed baselines in a [`TimeCache`], and routes produced bags
/// through the coupling tables: internal couplings feed sibling
/// influencee bags, external output couplings feed the reusable parent
/// bag, and external input couplings are applied when the parent routes
/// input down.
pub struct Coordinator {
    name: String,
    children: Vec<Processor>,
    event_set: EventSet<usize>,
    time_cache: TimeCache<usize>,
    /// Per source child: output port -> (target child, target port).
    internal_routes: Vec<HashMap<String, Vec<(usize, String)>>>,
    /// Per source child: output port -> own output ports.
    output_routes: Vec<HashMap<String, Vec<String>>>,
    /// Own input port -> (target child, target port).
    input_routes: HashMap<String, Vec<(usize, String)>>,
    /// Children to transition this cycle, in discovery order.
    synchronize: Vec<usize>,
    in_sync: Vec<bool>,
    /// Routed inputs per child, reused across cycles.
    influencees: Vec<Bag>,
    /// Outputs routed up to the parent, reused across cycles.
    parent_bag: Bag,
    precision: Scale,
}

impl Coordinator {
    pub(crate) fn new(model: CoupledModel, scheduler: SchedulerKind, time: &TimePoint) -> Self {
        let CoupledModel {
            name,
            children,
            internal_couplings,
            input_couplings,
            output_couplings,
            ..
        } = model;

        let children: Vec<Processor> = children
            .into_iter()
            .map(|child| Processor::build(child, scheduler, time))
            .collect();
        let count = children.len();

        let mut internal_routes = vec![HashMap::<String, Vec<(usize, String)>>::new(); count];
        for c in internal_couplings {
            internal_routes[c.source]
                .entry(c.source_port)
                .or_default()
                .push((c.target, c.target_port));
        }
        let mut output_routes = vec![HashMap::<String, Vec<String>>::new(); count];
        for c in output_couplings {
            output_routes[c.source]
                .entry(c.source_port)
                .or_default()
                .push(c.target_port);
        }
        let mut input_routes = HashMap::<String, Vec<(usize, String)>>::new();
        for c in input_couplings {
            input_routes
                .entry(c.source_port)
                .or_default()
                .push((c.target, c.target_port));
        }

        let precision = children
            .iter()
            .map(Processor::precision)
            .min()
            .unwrap_or(Scale::BASE);

        Coordinator {
            name,
            event_set: EventSet::new(scheduler, time.clone()),
            time_cache: TimeCache::new(time.clone()),
            internal_routes,
            output_routes,
            input_routes,
            synchronize: Vec::new(),
            in_sync: vec![false; count],
            influencees: vec![Bag::new(); count],
            parent_bag: Bag::new(),
            precision,
            children,
        }
    }

    /// The wrapped model's name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Finest scheduling scale among the children.
    pub fn precision(&self) -> Scale {
        self.precision
    }

    /// Initializes every child, schedules the finite ones, and reports
    /// the maximum child elapsed plus the imminent duration.
    pub(crate) fn initialize(&mut self, time: &TimePoint) -> SimResult<(Duration, Duration)> {
        self.event_set.set_current_time(time.clone());
        self.time_cache.set_current_time(time.clone());
        self.synchronize.clear();
        self.in_sync.iter_mut().for_each(|flag| *flag = false);
        self.influencees.iter_mut().for_each(Bag::clear);
        self.parent_bag.clear();

        let mut max_elapsed = Duration::ZERO;
        for child in 0..self.children.len() {
            let precision = self.children[child].precision();
            let (elapsed, planned) = self.children[child].initialize(time)?;
            if !planned.is_infinite() {
                // A child that already sat `elapsed` in its state fires
                // after the remaining share of its planned duration. The
                // common zero-elapsed case keeps the planned scale.
                let remaining = if elapsed.is_zero() {
                    planned
                } else {
                    planned - elapsed
                };
                self.event_set.plan_event(child, remaining)?;
            }
            self.time_cache.retain_event(child, elapsed, precision);
            if elapsed > max_elapsed {
                max_elapsed = elapsed;
            }
        }
        Ok((max_elapsed, self.event_set.imminent_duration()))
    }

    /// Collects the outputs of every imminent child and routes them
    /// through the internal and external output couplings.
    pub(crate) fn collect_outputs(&mut self, time: &TimePoint, _elapsed: Duration) -> SimResult<&Bag> {
        self.event_set.set_current_time(time.clone());
        self.time_cache.set_current_time(time.clone());
        self.parent_bag.clear();

        let mut imminent = Vec::new();
        self.event_set.each_imminent_event(|child| imminent.push(child));

        for child in imminent {
            if !self.in_sync[child] {
                self.in_sync[child] = true;
                self.synchronize.push(child);
            }
            let elapsed = self.time_cache.elapsed_duration_of(&child);
            let bag = self.children[child].collect_outputs(time, elapsed)?;
            for (port, values) in bag.ports() {
                if let Some(targets) = self.internal_routes[child].get(port) {
                    for (target, target_port) in targets {
                        self.influencees[*target]
                            .extend(target_port.clone(), values.iter().cloned());
                        if !self.in_sync[*target] {
                            self.in_sync[*target] = true;
                            self.synchronize.push(*target);
                        }
                    }
                }
                if let Some(own_ports) = self.output_routes[child].get(port) {
                    for own_port in own_ports {
                        self.parent_bag.extend(own_port.clone(), values.iter().cloned());
                    }
                }
            }
        }
        Ok(&self.parent_bag)
    }

    /// Routes parent input down, transitions every synchronized child
    /// exactly once, and reschedules each according to its new planned
    /// duration. Returns the new imminent duration.
    pub(crate) fn perform_transitions(
        &mut self,
        time: &TimePoint,
        _elapsed: Duration,
        input: &Bag,
    ) -> SimResult<Duration> {
        self.event_set.set_current_time(time.clone());
        self.time_cache.set_current_time(time.clone());

        for (port, values) in input.ports() {
            if let Some(targets) = self.input_routes.get(port) {
                for (target, target_port) in targets {
                    self.influencees[*target].extend(target_port.clone(), values.iter().cloned());
                    if !self.in_sync[*target] {
                        self.in_sync[*target] = true;
                        self.synchronize.push(*target);
                    }
                }
            }
        }

        let synchronized = std::mem::take(&mut self.synchronize);
        for &child in &synchronized {
            let precision = self.children[child].precision();
            let elapsed = self.time_cache.elapsed_duration_of(&child);
            let planned =
                self.children[child].perform_transitions(time, elapsed, &self.influencees[child])?;
            if planned.is_infinite() {
                self.event_set.cancel_event(&child);
            } else {
                self.event_set.plan_event(child, planned)?;
            }
            self.time_cache.retain_event(child, Duration::ZERO, precision);
        }

        for &child in &synchronized {
            self.in_sync[child] = false;
            self.influencees[child].clear();
        }

        Ok(self.event_set.imminent_duration())
    }

    /// Remaining duration until the earliest child event.
    pub(crate) fn imminent_duration(&mut self) -> Duration {
        self.event_set.imminent_duration()
    }

    pub(crate) fn accumulate_stats(&self, into: &mut TransitionStats) {
        for child in &self.children {
            child.accumulate_stats(into);
        }
    }

    pub(crate) fn clear_bags(&mut self) {
        self.parent_bag.clear();
        self.influencees.iter_mut().for_each(Bag::clear);
        self.synchronize.clear();
        self.in_sync.iter_mut().for_each(|flag| *flag = false);
        for child in &mut self.children {
            child.clear_bags();
        }
    }
}
