use std::sync::Arc;

use anyhow::Error;
use futures_util::future::BoxFuture;
use tokio::{
    sync::{Semaphore, watch},
    task::JoinHandle,
    time::{Instant, sleep_until},
};
use tracing::{debug, error, info, warn};

use crate::models::job::JobDescriptor;

type JobFuture = BoxFuture<'static, Result<(), Error>>;
type JobFn = Arc<dyn Fn() -> JobFuture + Send + Sync>;

struct ScheduledJob {
    descriptor: JobDescriptor,
    job_fn: JobFn,
    in_flight: Arc<Semaphore>,
}

/// Timer-driven executor for producer jobs. One in-flight run per job id;
/// overlapping ticks are skipped, missed ticks coalesce or replay per the
/// descriptor, and ticks later than the misfire grace are dropped.
pub struct JobScheduler {
    jobs: Vec<ScheduledJob>,
    handles: Vec<JoinHandle<()>>,
    in_flight: Vec<(String, Arc<Semaphore>)>,
    shutdown_tx: watch::Sender<bool>,
    running_tx: watch::Sender<bool>,
}

impl JobScheduler {
    pub fn new() -> Self {
        let (shutdown_tx, _) = watch::channel(false);
        let (running_tx, _) = watch::channel(false);

        Self {
            jobs: Vec::new(),
            handles: Vec::new(),
            in_flight: Vec::new(),
            shutdown_tx,
            running_tx,
        }
    }

    /// Registers a job; takes effect at the next `start`. Job errors are
    /// logged at the invocation boundary and never prevent later ticks.
    pub fn schedule<F, Fut>(&mut self, descriptor: JobDescriptor, job_fn: F)
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), Error>> + Send + 'static,
    {
        info!(
            job = %descriptor.id,
            interval_secs = descriptor.interval.as_secs_f64(),
            "Job scheduled"
        );

        self.jobs.push(ScheduledJob {
            descriptor,
            job_fn: Arc::new(move || Box::pin(job_fn())),
            in_flight: Arc::new(Semaphore::new(1)),
        });
    }

    pub fn start(&mut self) {
        if *self.running_tx.borrow() {
            warn!("Scheduler is already running");
            return;
        }

        for job in self.jobs.drain(..) {
            let shutdown = self.shutdown_tx.subscribe();
            self.in_flight
                .push((job.descriptor.id.clone(), job.in_flight.clone()));
            self.handles.push(tokio::spawn(run_job(job, shutdown)));
        }

        self.running_tx.send_replace(true);
        info!("Scheduler started");
    }

    /// Stops ticking, then waits for every in-flight job body to finish.
    pub async fn stop(&mut self) {
        if !*self.running_tx.borrow() {
            return;
        }

        info!("Stopping scheduler");
        self.shutdown_tx.send_replace(true);

        for handle in self.handles.drain(..) {
            let _ = handle.await;
        }

        for (id, in_flight) in &self.in_flight {
            if let Ok(_permit) = in_flight.acquire().await {
                debug!(job = %id, "In-flight run drained");
            }
        }

        self.running_tx.send_replace(false);
        info!("Scheduler stopped");
    }

    pub fn running_state(&self) -> watch::Receiver<bool> {
        self.running_tx.subscribe()
    }

    pub fn is_running(&self) -> bool {
        *self.running_tx.borrow()
    }
}

impl Default for JobScheduler {
    fn default() -> Self {
        Self::new()
    }
}

async fn run_job(job: ScheduledJob, mut shutdown: watch::Receiver<bool>) {
    let ScheduledJob {
        descriptor,
        job_fn,
        in_flight,
    } = job;

    let mut next_fire = Instant::now() + descriptor.interval;

    loop {
        tokio::select! {
            _ = shutdown.changed() => break,
            _ = sleep_until(next_fire) => {}
        }

        let now = Instant::now();
        let lateness = now.saturating_duration_since(next_fire);
        next_fire = next_fire_time(next_fire, now, &descriptor);

        if lateness > descriptor.misfire_grace {
            info!(
                job = %descriptor.id,
                lateness_ms = lateness.as_millis() as u64,
                "Missed tick beyond misfire grace, dropping run"
            );
            continue;
        }

        // max_instances = 1: a tick arriving while the previous body still
        // holds the permit is skipped, not queued.
        let permit = match in_flight.clone().try_acquire_owned() {
            Ok(permit) => permit,
            Err(_) => {
                warn!(job = %descriptor.id, "Previous run still in flight, skipping tick");
                continue;
            }
        };

        let id = descriptor.id.clone();
        let job_fn = job_fn.clone();

        tokio::spawn(async move {
            let _permit = permit;
            if let Err(e) = job_fn().await {
                error!(job = %id, error = %e, "Job run failed");
            }
        });
    }

    debug!(job = %descriptor.id, "Job loop stopped");
}

/// With coalesce, any pile of missed ticks collapses into the single run that
/// just fired; without it, each missed tick replays immediately in turn.
fn next_fire_time(scheduled: Instant, now: Instant, descriptor: &JobDescriptor) -> Instant {
    if descriptor.coalesce {
        now + descriptor.interval
    } else {
        scheduled + descriptor.interval
    }
}
