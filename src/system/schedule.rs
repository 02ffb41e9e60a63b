use std::time::Instant;

use log::{error, info, warn};

use crate::{
    config::KernelConfig,
    error::{EcsError, Result},
    query,
    time::FixedTimestep,
    World,
};

use super::{command::CommandQueue, AnySystem, System};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerState {
    Stopped,
    Running,
}

/// A system that failed during a pass without taking the pass down with it
#[derive(Debug, Clone, PartialEq)]
pub struct SystemFailure {
    pub system: String,
    pub error: EcsError,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct PassReport {
    pub failures: Vec<SystemFailure>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct TickReport {
    /// Number of fixed frames simulated during the tick
    pub passes: u32,
    pub failures: Vec<SystemFailure>,
}

pub type RenderHook = Box<dyn FnMut(&World, f32)>;

/// Runs registered systems, in registration order, once per fixed simulation frame.
///
/// # Implementation
/// Each system's commands are applied to the world as soon as it returns, so later systems in the
/// same pass observe the writes of earlier ones. The host drives the loop by calling
/// [Scheduler::tick] from whatever timer or display callback it has; the scheduler only converts
/// elapsed time into a whole number of passes.
pub struct Scheduler {
    systems: Vec<Box<dyn AnySystem>>,
    commands: CommandQueue,
    state: SchedulerState,
    timestep: FixedTimestep,
    render_hook: Option<RenderHook>,
    pass_count: u64,
    /// Non-fatal failures of the tick that a fatal error cut short
    interrupted_failures: Vec<SystemFailure>,
}

impl Scheduler {
    pub fn new(config: &KernelConfig) -> Self {
        Self {
            systems: Vec::new(),
            commands: CommandQueue::new(),
            state: SchedulerState::Stopped,
            timestep: FixedTimestep::new(config.frame_duration(), config.max_skip_frames),
            render_hook: None,
            pass_count: 0,
            interrupted_failures: Vec::new(),
        }
    }

    pub fn add_system(&mut self, system: System) {
        self.systems.push(Box::new(system));
    }

    pub fn add_boxed(&mut self, system: Box<dyn AnySystem>) {
        self.systems.push(system);
    }

    pub fn system_names(&self) -> impl Iterator<Item = &str> {
        self.systems.iter().map(|system| system.name())
    }

    /// Called once per tick, after all of the tick's passes, with the leftover frame fraction.
    pub fn set_render_hook(&mut self, hook: impl FnMut(&World, f32) + 'static) {
        self.render_hook = Some(Box::new(hook));
    }

    pub fn state(&self) -> SchedulerState {
        self.state
    }

    pub fn is_running(&self) -> bool {
        self.state == SchedulerState::Running
    }

    /// Total passes run since the scheduler was created
    pub fn pass_count(&self) -> u64 {
        self.pass_count
    }

    /// Failures collected by the last tick that ended in a fatal error, in the order they
    /// happened. Cleared by [Scheduler::start].
    pub fn interrupted_failures(&self) -> &[SystemFailure] {
        &self.interrupted_failures
    }

    /// Starts issuing passes on subsequent ticks, measuring elapsed time from `now`. Does nothing
    /// if already running.
    pub fn start(&mut self, now: Instant) {
        if self.is_running() {
            return;
        }
        self.state = SchedulerState::Running;
        self.timestep.start(now);
        self.interrupted_failures.clear();
        info!("scheduler started with {} systems", self.systems.len());
    }

    /// Takes effect before the next tick. Stopping an already stopped scheduler does nothing.
    pub fn stop(&mut self) {
        if !self.is_running() {
            return;
        }
        self.state = SchedulerState::Stopped;
        self.timestep.reset();
        info!("scheduler stopped after {} passes", self.pass_count);
    }

    /// Runs as many passes as the time since the last tick allows, then the render hook.
    /// A tick while stopped does nothing.
    ///
    /// A fatal error stops the scheduler and is returned; the render hook is skipped. Failures
    /// from the passes already run are kept in [Scheduler::interrupted_failures].
    pub fn tick(&mut self, world: &mut World, now: Instant) -> Result<TickReport> {
        let mut report = TickReport::default();
        if !self.is_running() {
            return Ok(report);
        }

        let frames = self.timestep.advance(now);
        for _ in 0..frames {
            match self.run_pass(world) {
                Ok(pass) => {
                    report.passes += 1;
                    report.failures.extend(pass.failures);
                }
                Err(e) => {
                    if !report.failures.is_empty() {
                        error!(
                            "stopping scheduler: {e} (after {} failed system runs this tick)",
                            report.failures.len()
                        );
                    } else {
                        error!("stopping scheduler: {e}");
                    }
                    self.interrupted_failures = report.failures;
                    self.stop();
                    return Err(e);
                }
            }
        }

        if let Some(hook) = self.render_hook.as_mut() {
            hook(world, self.timestep.alpha());
        }

        Ok(report)
    }

    /// Runs every system once, in registration order. Non-fatal failures are logged and collected
    /// in the report; a fatal one ends the pass and is returned.
    pub fn run_pass(&mut self, world: &mut World) -> Result<PassReport> {
        let mut report = PassReport::default();

        for system in self.systems.iter_mut() {
            let outcome = Self::run_system(system.as_mut(), &mut self.commands, world);
            if let Err(error) = outcome {
                if error.is_fatal() {
                    return Err(error);
                }
                warn!("system `{}` failed: {error}", system.name());
                report.failures.push(SystemFailure {
                    system: system.name().to_owned(),
                    error,
                });
            }
        }

        self.pass_count += 1;
        Ok(report)
    }

    fn run_system(
        system: &mut dyn AnySystem,
        commands: &mut CommandQueue,
        world: &mut World,
    ) -> Result<()> {
        let data = query::resolve(world, system.query())?;

        if let Err(e) = system.run(&data, commands) {
            commands.clear();
            return Err(e);
        }

        commands.apply(world)
    }
}

#[cfg(test)]
mod tests {
    use std::{cell::RefCell, rc::Rc, time::Duration};

    use super::*;
    use crate::{
        component::{
            schema::{Kind, Schema},
            ComponentId,
        },
        query::Query,
        state,
    };

    const POSITION: ComponentId = 0;
    const COUNTER: ComponentId = 1;

    fn init_logger() {
        let _ = env_logger::builder().is_test(true).try_init();
    }

    fn config() -> KernelConfig {
        KernelConfig {
            timestep_hz: 100,
            max_skip_frames: 5,
            ..KernelConfig::default()
        }
    }

    fn world() -> World {
        let mut world = World::new(&config());
        world
            .register_type(
                POSITION,
                Schema::new("position")
                    .field("x", Kind::Number)
                    .field("y", Kind::Number),
            )
            .unwrap();
        world
            .register_type(COUNTER, Schema::new("counter").field("n", Kind::Number))
            .unwrap();
        world
    }

    fn counting_system() -> System {
        System::new(
            "count",
            Query::builder().component(COUNTER).build(),
            |data, commands| {
                for e in &data.entities {
                    let n = e.number(COUNTER, "n").unwrap_or(0.0);
                    commands.update(e.entity, COUNTER, state! { "n" => n + 1.0 });
                }
                Ok(())
            },
        )
    }

    #[test]
    fn single_pass_applies_update() {
        init_logger();
        let mut world = world();
        let e = world
            .build_entity(vec![(POSITION, state! { "x" => 0, "y" => 0 })])
            .unwrap();

        let mut scheduler = Scheduler::new(&config());
        scheduler.add_system(System::new(
            "move",
            Query::builder().component(POSITION).build(),
            |data, commands| {
                for entity in &data.entities {
                    commands.update(entity.entity, POSITION, state! { "x" => 1, "y" => 0 });
                }
                Ok(())
            },
        ));

        scheduler.run_pass(&mut world).unwrap();
        assert_eq!(
            world.find_component(e, POSITION),
            Ok(state! { "x" => 1, "y" => 0 })
        );
    }

    #[test]
    fn later_systems_observe_earlier_writes() {
        let mut world = world();
        let e = world
            .build_entity(vec![(COUNTER, state! { "n" => 0 })])
            .unwrap();

        let seen = Rc::new(RefCell::new(Vec::new()));
        let mut scheduler = Scheduler::new(&config());
        scheduler.add_system(counting_system());
        {
            let seen = seen.clone();
            scheduler.add_system(System::new(
                "observe",
                Query::builder().component(COUNTER).build(),
                move |data, _| {
                    seen.borrow_mut().extend(data.entities.iter().map(|e| e.number(COUNTER, "n")));
                    Ok(())
                },
            ));
        }

        scheduler.run_pass(&mut world).unwrap();
        scheduler.run_pass(&mut world).unwrap();

        assert_eq!(*seen.borrow(), vec![Some(1.0), Some(2.0)]);
        assert_eq!(world.find_component(e, COUNTER), Ok(state! { "n" => 2 }));
    }

    #[test]
    fn failing_system_is_isolated() {
        init_logger();
        let mut world = world();
        let e = world
            .build_entity(vec![(COUNTER, state! { "n" => 0 })])
            .unwrap();

        let mut scheduler = Scheduler::new(&config());
        scheduler.add_system(System::new(
            "broken",
            Query::builder().component(COUNTER).build(),
            |data, commands| {
                // Pushed before failing, so discarded with the rest of the run
                for entity in &data.entities {
                    commands.update(entity.entity, COUNTER, state! { "n" => 100 });
                }
                Err(EcsError::system("broken", "bad input"))
            },
        ));
        scheduler.add_system(counting_system());

        let report = scheduler.run_pass(&mut world).unwrap();
        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].system, "broken");
        assert_eq!(world.find_component(e, COUNTER), Ok(state! { "n" => 1 }));
    }

    #[test]
    fn partially_applied_commands_remain() {
        let mut world = world();
        let e = world
            .build_entity(vec![(COUNTER, state! { "n" => 0 })])
            .unwrap();

        let mut scheduler = Scheduler::new(&config());
        scheduler.add_system(System::new(
            "half",
            Query::builder().component(COUNTER).build(),
            |data, commands| {
                for entity in &data.entities {
                    commands.update(entity.entity, COUNTER, state! { "n" => 7 });
                    commands.update(entity.entity, COUNTER, state! { "bogus" => 1 });
                }
                Ok(())
            },
        ));

        let report = scheduler.run_pass(&mut world).unwrap();
        assert!(matches!(
            report.failures[0].error,
            EcsError::InvalidComponentState { .. }
        ));
        assert_eq!(world.find_component(e, COUNTER), Ok(state! { "n" => 7 }));
    }

    #[test]
    fn fatal_error_stops_the_loop() {
        init_logger();
        let config = KernelConfig {
            max_entities: 2,
            ..config()
        };
        let mut world = World::new(&config);
        world
            .register_type(COUNTER, Schema::new("counter").field("n", Kind::Number))
            .unwrap();

        let mut scheduler = Scheduler::new(&config);
        scheduler.add_system(System::new("spawner", Query::default(), |_, commands| {
            commands.spawn(vec![(COUNTER, state! { "n" => 0 })]);
            Ok(())
        }));

        let t0 = Instant::now();
        scheduler.start(t0);
        let result = scheduler.tick(&mut world, t0 + Duration::from_millis(50));

        assert_eq!(result, Err(EcsError::EntityLimitExceeded { limit: 2 }));
        assert!(!scheduler.is_running());
        assert_eq!(world.entity_count(), 2);
    }

    #[test]
    fn fatal_tick_keeps_earlier_failures() {
        init_logger();
        let config = KernelConfig {
            max_entities: 2,
            ..config()
        };
        let mut world = World::new(&config);
        world
            .register_type(COUNTER, Schema::new("counter").field("n", Kind::Number))
            .unwrap();

        let mut scheduler = Scheduler::new(&config);
        scheduler.add_system(System::new("flaky", Query::default(), |_, _| {
            Err(EcsError::system("flaky", "always fails"))
        }));
        scheduler.add_system(System::new("spawner", Query::default(), |_, commands| {
            commands.spawn(vec![(COUNTER, state! { "n" => 0 })]);
            Ok(())
        }));

        let t0 = Instant::now();
        scheduler.start(t0);
        let result = scheduler.tick(&mut world, t0 + Duration::from_millis(50));

        // The third pass hits the entity limit; the two passes before it each lost `flaky`
        assert_eq!(result, Err(EcsError::EntityLimitExceeded { limit: 2 }));
        assert!(!scheduler.is_running());
        let failed: Vec<&str> = scheduler
            .interrupted_failures()
            .iter()
            .map(|failure| failure.system.as_str())
            .collect();
        assert_eq!(failed, vec!["flaky", "flaky"]);

        scheduler.start(t0 + Duration::from_secs(1));
        assert!(scheduler.interrupted_failures().is_empty());
    }

    #[test]
    fn tick_runs_one_pass_per_frame() {
        let mut world = world();
        let e = world
            .build_entity(vec![(COUNTER, state! { "n" => 0 })])
            .unwrap();

        let renders = Rc::new(RefCell::new(0));
        let mut scheduler = Scheduler::new(&config());
        scheduler.add_system(counting_system());
        {
            let renders = renders.clone();
            scheduler.set_render_hook(move |_, _| *renders.borrow_mut() += 1);
        }

        let t0 = Instant::now();
        // Stopped: nothing happens
        let report = scheduler.tick(&mut world, t0).unwrap();
        assert_eq!(report.passes, 0);
        assert_eq!(*renders.borrow(), 0);

        scheduler.start(t0);
        let report = scheduler.tick(&mut world, t0 + Duration::from_millis(35)).unwrap();
        assert_eq!(report.passes, 3);
        assert_eq!(*renders.borrow(), 1);

        // A long stall is clamped to max_skip_frames
        let report = scheduler.tick(&mut world, t0 + Duration::from_secs(10)).unwrap();
        assert_eq!(report.passes, 5);
        assert_eq!(world.find_component(e, COUNTER), Ok(state! { "n" => 8 }));
        assert_eq!(scheduler.pass_count(), 8);
    }

    #[test]
    fn stop_is_idempotent() {
        let mut world = world();
        let mut scheduler = Scheduler::new(&config());
        scheduler.add_system(counting_system());

        let t0 = Instant::now();
        scheduler.start(t0);
        scheduler.stop();
        scheduler.stop();
        assert_eq!(scheduler.state(), SchedulerState::Stopped);

        let report = scheduler.tick(&mut world, t0 + Duration::from_secs(1)).unwrap();
        assert_eq!(report, TickReport::default());
    }
}
