use biometrics::{Collector, Counter, Moments};

pub(crate) static CLIENT_REQUESTS: Counter = Counter::new("medicare.client.requests");
pub(crate) static CLIENT_REQUEST_ERRORS: Counter = Counter::new("medicare.client.request_errors");
pub(crate) static CLIENT_REQUEST_DURATION: Moments =
    Moments::new("medicare.client.request_duration_seconds");

pub(crate) static DISPATCH_SUBMISSIONS: Counter = Counter::new("medicare.dispatch.submissions");
pub(crate) static DISPATCH_IGNORED: Counter = Counter::new("medicare.dispatch.ignored");
pub(crate) static DISPATCH_TRUNCATED: Counter = Counter::new("medicare.dispatch.truncated");
pub(crate) static DISPATCH_ATTEMPTS: Counter = Counter::new("medicare.dispatch.attempts");
pub(crate) static DISPATCH_TIMEOUTS: Counter = Counter::new("medicare.dispatch.timeouts");
pub(crate) static DISPATCH_RETRIES: Counter = Counter::new("medicare.dispatch.retries");
pub(crate) static DISPATCH_COMPLETIONS: Counter = Counter::new("medicare.dispatch.completions");
pub(crate) static DISPATCH_FAILURES: Counter = Counter::new("medicare.dispatch.failures");
pub(crate) static DISPATCH_RETRY_BACKOFF: Moments =
    Moments::new("medicare.dispatch.retry_backoff_seconds");

pub(crate) static SESSION_REJECTED: Counter = Counter::new("medicare.session.rejected");

/// Register this crate's biometrics with the provided collector.
pub fn register_biometrics(collector: Collector) {
    collector.register_counter(&CLIENT_REQUESTS);
    collector.register_counter(&CLIENT_REQUEST_ERRORS);
    collector.register_moments(&CLIENT_REQUEST_DURATION);

    collector.register_counter(&DISPATCH_SUBMISSIONS);
    collector.register_counter(&DISPATCH_IGNORED);
    collector.register_counter(&DISPATCH_TRUNCATED);
    collector.register_counter(&DISPATCH_ATTEMPTS);
    collector.register_counter(&DISPATCH_TIMEOUTS);
    collector.register_counter(&DISPATCH_RETRIES);
    collector.register_counter(&DISPATCH_COMPLETIONS);
    collector.register_counter(&DISPATCH_FAILURES);
    collector.register_moments(&DISPATCH_RETRY_BACKOFF);

    collector.register_counter(&SESSION_REJECTED);
}
