//! Insights - observability for slotlog.
//!
//! Unified tracing, zero-cost when disabled.
//!
//! # Usage
//!
//! ```toml
//! slotlog = { version = "0.1", features = ["tracing"] }
//! ```
//! ```rust,ignore
//! tracing_subscriber::fmt::init();
//! ```
//!
//! ## Tracy profiler
//! ```toml
//! slotlog = { version = "0.1", features = ["tracy"] }
//! ```
//! ```rust,ignore
//! slotlog::init_tracy();
//! ```

/// Initialize the Tracy profiler (call once at startup).
#[cfg(feature = "tracy")]
pub fn init_tracy() {
    use tracing_subscriber::layer::SubscriberExt;
    tracing::subscriber::set_global_default(
        tracing_subscriber::registry().with(tracing_tracy::TracyLayer::default()),
    )
    .expect("setup tracy layer");
}

#[cfg(not(feature = "tracy"))]
pub fn init_tracy() {}

#[cfg(feature = "tracing")]
#[inline]
pub fn record_join(size: u32) {
    let _span = tracing::trace_span!("join", size).entered();
}

#[cfg(not(feature = "tracing"))]
#[inline(always)]
pub fn record_join(_size: u32) {}

#[cfg(feature = "tracing")]
#[inline]
pub fn record_close(joined: u32) {
    let _span = tracing::debug_span!("close", joined).entered();
}

#[cfg(not(feature = "tracing"))]
#[inline(always)]
pub fn record_close(_joined: u32) {}

#[cfg(feature = "tracing")]
#[inline]
pub fn record_switch() {
    let _span = tracing::debug_span!("switch").entered();
}

#[cfg(not(feature = "tracing"))]
#[inline(always)]
pub fn record_switch() {}

#[cfg(feature = "tracing")]
#[inline]
pub fn record_promote() {
    let _span = tracing::debug_span!("promote").entered();
}

#[cfg(not(feature = "tracing"))]
#[inline(always)]
pub fn record_promote() {}

#[cfg(feature = "tracing")]
#[inline]
pub fn record_pool_exhausted() {
    let _span = tracing::warn_span!("pool_exhausted").entered();
}

#[cfg(not(feature = "tracing"))]
#[inline(always)]
pub fn record_pool_exhausted() {}
