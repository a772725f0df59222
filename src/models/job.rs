use std::time::Duration;

/// Scheduler-internal description of one recurring job. `max_instances` is
/// fixed at 1 for every job and enforced structurally by the scheduler.
#[derive(Debug, Clone)]
pub struct JobDescriptor {
    pub id: String,
    pub interval: Duration,

    /// If multiple ticks were missed, run once rather than once per tick.
    pub coalesce: bool,

    /// A tick firing later than this is dropped instead of run late.
    pub misfire_grace: Duration,
}

impl JobDescriptor {
    pub fn new(id: impl Into<String>, interval: Duration) -> Self {
        Self {
            id: id.into(),
            interval,
            coalesce: true,
            misfire_grace: Duration::from_secs(30),
        }
    }

    pub fn with_misfire_grace(mut self, grace: Duration) -> Self {
        self.misfire_grace = grace;
        self
    }

    pub fn with_coalesce(mut self, coalesce: bool) -> Self {
        self.coalesce = coalesce;
        self
    }
}
