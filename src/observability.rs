use biometrics::{Collector, Counter, Moments};

pub(crate) static CLIENT_REQUESTS: Counter = Counter::new("airchat.client.requests");
pub(crate) static CLIENT_REQUEST_ERRORS: Counter = Counter::new("airchat.client.request_errors");
pub(crate) static CLIENT_REQUEST_DURATION: Moments =
    Moments::new("airchat.client.request_duration_seconds");

pub(crate) static STREAM_CHUNKS: Counter = Counter::new("airchat.stream.chunks");
pub(crate) static STREAM_ERRORS: Counter = Counter::new("airchat.stream.errors");
pub(crate) static STREAM_BYTES: Counter = Counter::new("airchat.stream.bytes");

pub(crate) static EXCHANGE_COMMITTED: Counter = Counter::new("airchat.exchange.committed");
pub(crate) static EXCHANGE_ROLLED_BACK: Counter = Counter::new("airchat.exchange.rolled_back");
pub(crate) static EXCHANGE_PLACEHOLDERS: Counter = Counter::new("airchat.exchange.placeholders");
pub(crate) static EXCHANGE_FRAGMENTS: Counter = Counter::new("airchat.exchange.fragments");
pub(crate) static EXCHANGE_DURATION: Moments =
    Moments::new("airchat.exchange.duration_seconds");

/// Register this crate's biometrics with the provided collector.
pub fn register_biometrics(collector: Collector) {
    collector.register_counter(&CLIENT_REQUESTS);
    collector.register_counter(&CLIENT_REQUEST_ERRORS);
    collector.register_moments(&CLIENT_REQUEST_DURATION);

    collector.register_counter(&STREAM_CHUNKS);
    collector.register_counter(&STREAM_ERRORS);
    collector.register_counter(&STREAM_BYTES);

    collector.register_counter(&EXCHANGE_COMMITTED);
    collector.register_counter(&EXCHANGE_ROLLED_BACK);
    collector.register_counter(&EXCHANGE_PLACEHOLDERS);
    collector.register_counter(&EXCHANGE_FRAGMENTS);
    collector.register_moments(&EXCHANGE_DURATION);
}
