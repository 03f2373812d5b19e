use chrono::{DateTime, Duration, Utc};
use log::info;

const FIRST_INTERVAL_SECS: i64 = 2;
const MAX_INTERVAL_SECS: i64 = 10;

/// Logs the progression of a long iteration
///
/// Nothing is logged for iterations shorter than two seconds. After that the
/// interval between two lines grows by two seconds, up to ten.
pub(crate) struct Progress {
    prefix: String,
    total: u64,
    last_log_at: DateTime<Utc>,
    interval: Duration,
    logged: bool,
}

impl Progress {
    pub(crate) fn new(prefix: String, total: u64) -> Self {
        Progress {
            prefix,
            total,
            last_log_at: Utc::now(),
            interval: Duration::seconds(FIRST_INTERVAL_SECS),
            logged: false,
        }
    }

    pub(crate) fn update(&mut self, done: u64) {
        if self.total == 0 || Utc::now().signed_duration_since(self.last_log_at) <= self.interval {
            return;
        }
        let percentage = done as f64 / self.total as f64 * 100.0;
        info!("[{}] {:.0}% done", self.prefix, percentage.min(100.0));

        self.last_log_at = Utc::now();
        self.logged = true;
        self.interval = (self.interval + Duration::seconds(FIRST_INTERVAL_SECS))
            .min(Duration::seconds(MAX_INTERVAL_SECS));
    }

    pub(crate) fn finish(self) {
        if self.logged {
            info!("[{}] Done", self.prefix);
        }
    }
}

/// Runs `f` on every item, logging the progression under `prefix`
pub(crate) fn for_each_with_log<I, F>(prefix: &str, total: usize, items: I, mut f: F)
where
    I: IntoIterator,
    F: FnMut(I::Item),
{
    let mut progress = Progress::new(prefix.to_owned(), total as u64);
    for (done, item) in items.into_iter().enumerate() {
        f(item);
        progress.update(done as u64 + 1);
    }
    progress.finish();
}
