//! Measurement Orchestration
//!
//! Drives one run: a heap collection, `warmup` discarded trials, then the
//! measured trials in ascending order, each preceded by a heap collection.
//! The collected durations are reduced to a [`Summary`].
//!
//! ```text
//! Idle ─▶ Warmup(k of warmup) ─▶ Measuring(i of n) ─▶ Aggregating ─▶ Done
//!   │            │                      │
//!   └────────────┴──────────────────────┴──────────────────────────▶ Failed
//! ```
//!
//! The first failing trial aborts the run; there is no partial summary.

use crate::config::MeasureConfig;
use crate::error::{MeasureError, TrialFailure};
use crate::executor::{TrialExecutor, WorkFn, select_executor};
use crate::heap::{HeapControl, SystemHeap};
use isobench_stats::{Summary, compute_summary};
use std::fmt::Display;
use std::hint::black_box;
use std::io::Write;
use std::ops::RangeInclusive;
use tracing::{debug, trace};

const MAX_PREALLOCATED_SAMPLES: usize = 1 << 16;

/// Where a run currently stands
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunPhase {
    /// No run in progress
    Idle,
    /// Running discarded warmup trials
    Warmup {
        /// Warmup trials finished so far
        completed: u64,
        /// Configured warmup count
        total: u64,
    },
    /// Running measured trials
    Measuring {
        /// Measured trials finished so far
        completed: u64,
        /// Resolved trial count
        total: u64,
    },
    /// Reducing the sample set
    Aggregating,
    /// Summary produced
    Done,
    /// A trial or the configuration failed
    Failed,
}

impl RunPhase {
    /// Whether the run has finished, successfully or not
    pub fn is_terminal(self) -> bool {
        matches!(self, RunPhase::Done | RunPhase::Failed)
    }
}

/// Measures how long a work unit takes on average
pub struct ExecutionTime<'a> {
    config: MeasureConfig,
    executor: Box<dyn TrialExecutor + 'a>,
    heap: Box<dyn HeapControl + 'a>,
    io: Option<Box<dyn Write + 'a>>,
    phase: RunPhase,
}

impl<'a> ExecutionTime<'a> {
    /// Create an orchestrator, selecting the executor from config and host capability
    pub fn new(config: MeasureConfig) -> Self {
        let executor = select_executor(&config);
        Self {
            config,
            executor,
            heap: Box::new(SystemHeap),
            io: None,
            phase: RunPhase::Idle,
        }
    }

    /// Create an orchestrator with an explicit executor
    pub fn with_executor(config: MeasureConfig, executor: impl TrialExecutor + 'a) -> Self {
        Self {
            config,
            executor: Box::new(executor),
            heap: Box::new(SystemHeap),
            io: None,
            phase: RunPhase::Idle,
        }
    }

    /// Replace the heap hooks used before warmup and before each measured trial
    pub fn with_heap(mut self, heap: impl HeapControl + 'a) -> Self {
        self.heap = Box::new(heap);
        self
    }

    /// Stream each measured duration to `sink` as it completes
    pub fn with_progress(mut self, sink: impl Write + 'a) -> Self {
        self.io = Some(Box::new(sink));
        self
    }

    /// The configuration this orchestrator was built with
    pub fn config(&self) -> &MeasureConfig {
        &self.config
    }

    /// Name of the selected executor
    pub fn executor_name(&self) -> &'static str {
        self.executor.name()
    }

    /// Current phase of the most recent run
    pub fn phase(&self) -> RunPhase {
        self.phase
    }

    /// Measure `work` over `config.samples` trials
    pub fn run<F, R>(&mut self, work: F) -> Result<Summary, MeasureError>
    where
        F: FnMut() -> R,
    {
        self.measure(None, &mut infallible(work))
    }

    /// Measure `work` over exactly `times` trials
    pub fn run_times<F, R>(&mut self, times: u64, work: F) -> Result<Summary, MeasureError>
    where
        F: FnMut() -> R,
    {
        self.measure(Some(times), &mut infallible(work))
    }

    /// Measure a fallible `work` over `config.samples` trials; an `Err` aborts the run
    pub fn run_fallible<F, R, E>(&mut self, work: F) -> Result<Summary, MeasureError>
    where
        F: FnMut() -> Result<R, E>,
        E: Display,
    {
        self.measure(None, &mut fallible(work))
    }

    /// Measure a fallible `work` over exactly `times` trials
    pub fn run_times_fallible<F, R, E>(
        &mut self,
        times: u64,
        work: F,
    ) -> Result<Summary, MeasureError>
    where
        F: FnMut() -> Result<R, E>,
        E: Display,
    {
        self.measure(Some(times), &mut fallible(work))
    }

    /// Run the warmup cycles only, returning how many were executed
    pub fn run_warmup<F, R>(&mut self, work: F) -> Result<u64, MeasureError>
    where
        F: FnMut() -> R,
    {
        let result = self.warmup(&mut infallible(work));
        self.phase = match result {
            Ok(_) => RunPhase::Idle,
            Err(_) => RunPhase::Failed,
        };
        result
    }

    fn measure(
        &mut self,
        times: Option<u64>,
        work: &mut WorkFn<'_>,
    ) -> Result<Summary, MeasureError> {
        let result = self.measure_phases(times, work);
        self.phase = match result {
            Ok(_) => RunPhase::Done,
            Err(_) => RunPhase::Failed,
        };
        result
    }

    fn measure_phases(
        &mut self,
        times: Option<u64>,
        work: &mut WorkFn<'_>,
    ) -> Result<Summary, MeasureError> {
        let trials = self.bench_range(times)?;
        let total = *trials.end();

        self.warmup(work)?;

        debug!(
            trials = total,
            executor = self.executor.name(),
            "starting measurement"
        );

        // Counts come straight from user input; grow past this instead of reserving it all.
        let reserve = usize::try_from(total).map_or(MAX_PREALLOCATED_SAMPLES, |n| {
            n.min(MAX_PREALLOCATED_SAMPLES)
        });
        let mut samples = Vec::with_capacity(reserve);
        for index in trials {
            self.phase = RunPhase::Measuring {
                completed: index - 1,
                total,
            };
            self.heap.collect();

            let seconds = self.executor.run_trial(work)?;
            trace!(trial = index, seconds, "trial complete");
            samples.push(seconds);

            if let Some(io) = self.io.as_mut() {
                write!(io, "{seconds:9.6}").map_err(MeasureError::Progress)?;
                io.flush().map_err(MeasureError::Progress)?;
            }
        }
        if let Some(io) = self.io.as_mut() {
            writeln!(io).map_err(MeasureError::Progress)?;
            io.flush().map_err(MeasureError::Progress)?;
        }

        self.phase = RunPhase::Aggregating;
        let summary = compute_summary(&samples);
        debug!(
            average = summary.average,
            std_dev = summary.std_dev,
            samples = summary.sample_count,
            "measurement complete"
        );
        Ok(summary)
    }

    /// Trial indices `1..=n`; `n` is the explicit count or `config.samples`
    fn bench_range(&self, times: Option<u64>) -> Result<RangeInclusive<u64>, MeasureError> {
        let count = times.unwrap_or(self.config.samples);
        if count < 1 {
            return Err(MeasureError::InvalidTrialCount(count));
        }
        Ok(1..=count)
    }

    fn warmup(&mut self, work: &mut WorkFn<'_>) -> Result<u64, MeasureError> {
        let total = self.config.warmup;
        self.heap.collect();
        for completed in 0..total {
            self.phase = RunPhase::Warmup { completed, total };
            self.executor.run_trial(work)?;
        }
        trace!(warmup = total, "warmup complete");
        Ok(total)
    }
}

fn infallible<F, R>(mut work: F) -> impl FnMut() -> Result<(), TrialFailure>
where
    F: FnMut() -> R,
{
    move || {
        black_box(work());
        Ok(())
    }
}

fn fallible<F, R, E>(mut work: F) -> impl FnMut() -> Result<(), TrialFailure>
where
    F: FnMut() -> Result<R, E>,
    E: Display,
{
    move || match work() {
        Ok(value) => {
            black_box(value);
            Ok(())
        }
        Err(e) => Err(TrialFailure::from_error(&e)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::heap::NoopHeap;
    use std::cell::{Cell, RefCell};
    use std::rc::Rc;

    /// Executor that records invocations and returns a fixed duration
    struct FixedExecutor {
        seconds: f64,
        calls: Rc<Cell<u64>>,
        invoke: bool,
    }

    impl FixedExecutor {
        fn new(seconds: f64) -> (Self, Rc<Cell<u64>>) {
            let calls = Rc::new(Cell::new(0));
            let executor = Self {
                seconds,
                calls: Rc::clone(&calls),
                invoke: false,
            };
            (executor, calls)
        }

        fn invoking(mut self) -> Self {
            self.invoke = true;
            self
        }
    }

    impl TrialExecutor for FixedExecutor {
        fn name(&self) -> &'static str {
            "fixed"
        }

        fn run_trial(&self, work: &mut WorkFn<'_>) -> Result<f64, MeasureError> {
            self.calls.set(self.calls.get() + 1);
            if self.invoke {
                work()?;
            }
            Ok(self.seconds)
        }
    }

    /// Executor replaying a scripted list of durations
    struct ScriptedExecutor {
        durations: RefCell<Vec<f64>>,
    }

    impl TrialExecutor for ScriptedExecutor {
        fn name(&self) -> &'static str {
            "scripted"
        }

        fn run_trial(&self, _work: &mut WorkFn<'_>) -> Result<f64, MeasureError> {
            Ok(self.durations.borrow_mut().remove(0))
        }
    }

    #[derive(Clone, Default)]
    struct CountingHeap {
        collections: Rc<Cell<u64>>,
    }

    impl HeapControl for CountingHeap {
        fn collect(&self) {
            self.collections.set(self.collections.get() + 1);
        }
        fn suspend(&self) {}
        fn resume(&self) {}
    }

    #[test]
    fn test_default_bench_range() {
        let (executor, calls) = FixedExecutor::new(0.1);
        let config = MeasureConfig::default().with_warmup(0);
        let mut execution = ExecutionTime::with_executor(config, executor).with_heap(NoopHeap);

        let summary = execution.run(|| "x".repeat(1024)).unwrap();

        assert_eq!(calls.get(), 30);
        assert_eq!(summary.sample_count, 30);
        assert!((summary.average - 0.1).abs() < 1e-12);
        assert!(summary.std_dev < 1e-12);
    }

    #[test]
    fn test_custom_number_of_samples() {
        let (executor, calls) = FixedExecutor::new(0.1);
        let config = MeasureConfig::default().with_warmup(0);
        let mut execution = ExecutionTime::with_executor(config, executor);

        let summary = execution.run_times(3, || "x".repeat(1024)).unwrap();

        assert_eq!(calls.get(), 3);
        assert_eq!(summary.sample_count, 3);
    }

    #[test]
    fn test_warmup_cycles_add_to_invocations() {
        let (executor, calls) = FixedExecutor::new(0.1);
        let config = MeasureConfig::default().with_warmup(1);
        let mut execution = ExecutionTime::with_executor(config, executor);

        let summary = execution.run_times(1, || "x").unwrap();

        assert_eq!(calls.get(), 2);
        assert_eq!(summary.sample_count, 1);
    }

    #[test]
    fn test_zero_trials_rejected_before_any_trial() {
        let (executor, calls) = FixedExecutor::new(0.1);
        let mut execution = ExecutionTime::with_executor(MeasureConfig::default(), executor);

        let err = execution.run_times(0, || "x").unwrap_err();

        assert_eq!(err.to_string(), "Repeat value: 0 needs to be greater than 0");
        assert_eq!(calls.get(), 0);
        assert_eq!(execution.phase(), RunPhase::Failed);
    }

    #[test]
    fn test_zero_samples_in_config_rejected() {
        let (executor, calls) = FixedExecutor::new(0.1);
        let config = MeasureConfig::default().with_samples(0);
        let mut execution = ExecutionTime::with_executor(config, executor);

        assert!(matches!(
            execution.run(|| "x"),
            Err(MeasureError::InvalidTrialCount(0))
        ));
        assert_eq!(calls.get(), 0);
    }

    #[test]
    fn test_run_warmup_returns_count() {
        let (executor, calls) = FixedExecutor::new(0.1);
        let executor = executor.invoking();
        let mut invoked = 0;
        let mut execution = ExecutionTime::with_executor(MeasureConfig::default(), executor);

        let count = execution
            .run_warmup(|| {
                invoked += 1;
                "x".repeat(1_000_000)
            })
            .unwrap();

        drop(execution);
        assert_eq!(count, 1);
        assert_eq!(calls.get(), 1);
        assert_eq!(invoked, 1);
    }

    #[test]
    fn test_heap_collected_before_warmup_and_each_trial() {
        let (executor, _calls) = FixedExecutor::new(0.1);
        let heap = CountingHeap::default();
        let collections = Rc::clone(&heap.collections);
        let config = MeasureConfig::default().with_warmup(2);
        let mut execution = ExecutionTime::with_executor(config, executor).with_heap(heap);

        execution.run_times(4, || ()).unwrap();

        // Once before warmup, once per measured trial
        assert_eq!(collections.get(), 1 + 4);
    }

    #[test]
    fn test_failure_aborts_run() {
        let (executor, calls) = FixedExecutor::new(0.1);
        let executor = executor.invoking();
        let config = MeasureConfig::default().with_warmup(0);
        let mut execution = ExecutionTime::with_executor(config, executor);

        let mut attempts = 0;
        let err = execution
            .run_times_fallible(5, || {
                attempts += 1;
                if attempts == 3 {
                    Err("boo")
                } else {
                    Ok(())
                }
            })
            .unwrap_err();

        assert_eq!(err.failure().map(|f| f.message.as_str()), Some("boo"));
        assert_eq!(calls.get(), 3);
        assert_eq!(execution.phase(), RunPhase::Failed);
    }

    #[test]
    fn test_huge_trial_count_fails_without_preallocating() {
        let (executor, calls) = FixedExecutor::new(0.1);
        let executor = executor.invoking();
        let config = MeasureConfig::default().with_warmup(0);
        let mut execution = ExecutionTime::with_executor(config, executor);

        let mut attempts = 0;
        let err = execution
            .run_times_fallible(u64::MAX, || {
                attempts += 1;
                if attempts == 3 {
                    Err("stop")
                } else {
                    Ok(())
                }
            })
            .unwrap_err();

        assert!(matches!(err, MeasureError::WorkUnit(_)));
        assert_eq!(calls.get(), 3);
        assert_eq!(execution.phase(), RunPhase::Failed);
    }

    #[test]
    fn test_warmup_failure_aborts_run() {
        let (executor, calls) = FixedExecutor::new(0.1);
        let executor = executor.invoking();
        let mut execution = ExecutionTime::with_executor(MeasureConfig::default(), executor);

        let err = execution
            .run_fallible(|| -> Result<(), String> { Err("warmup boom".to_string()) })
            .unwrap_err();

        assert_eq!(err.failure().map(|f| f.message.as_str()), Some("warmup boom"));
        assert_eq!(calls.get(), 1);
    }

    #[test]
    fn test_samples_reduced_in_order() {
        let executor = ScriptedExecutor {
            durations: RefCell::new(vec![0.5, 0.1, 0.3]),
        };
        let config = MeasureConfig::default().with_warmup(0);
        let mut execution = ExecutionTime::with_executor(config, executor);

        let summary = execution.run_times(3, || ()).unwrap();

        assert!((summary.average - 0.3).abs() < 1e-12);
        assert!(summary.average >= 0.1 && summary.average <= 0.5);
        assert!(summary.std_dev > 0.0);
        assert_eq!(execution.phase(), RunPhase::Done);
    }

    #[test]
    fn test_progress_sink_output() {
        let executor = ScriptedExecutor {
            durations: RefCell::new(vec![0.25, 0.125, 1.5]),
        };
        let mut sink = Vec::new();
        {
            let config = MeasureConfig::default().with_warmup(0);
            let mut execution =
                ExecutionTime::with_executor(config, executor).with_progress(&mut sink);
            execution.run_times(3, || ()).unwrap();
        }

        let output = String::from_utf8(sink).unwrap();
        assert_eq!(output, " 0.250000 0.125000 1.500000\n");
    }

    #[test]
    fn test_in_process_run_measures_real_work() {
        let config = MeasureConfig::default()
            .with_warmup(0)
            .with_subprocess(false);
        let mut execution = ExecutionTime::new(config);
        assert_eq!(execution.executor_name(), "in-process");

        let summary = execution.run_times(3, || "x".repeat(1_000)).unwrap();

        assert_eq!(summary.sample_count, 3);
        assert!(summary.average < 0.02);
    }

    #[test]
    fn test_phase_terminal() {
        assert!(RunPhase::Done.is_terminal());
        assert!(RunPhase::Failed.is_terminal());
        assert!(!RunPhase::Idle.is_terminal());
        assert!(!RunPhase::Aggregating.is_terminal());
    }
}
