//! BanditLab Core — domain types, canonical parameters, indicators, sub-strategies.
//!
//! This crate contains the pieces the learning engine builds on:
//! - Domain types (candles, three-valued trading signals)
//! - Canonical parameter sets with order-independent identity
//! - Indicator helpers (EMA, RSI, rolling extremes)
//! - The `SignalStrategy` trait and a registry with a no-op fallback

pub mod domain;
pub mod indicators;
pub mod params;
pub mod strategy;

#[cfg(test)]
mod send_sync_checks {
    use super::*;

    fn assert_send<T: Send>() {}
    fn assert_sync<T: Sync>() {}

    #[test]
    fn domain_types_are_send_sync() {
        assert_send::<domain::Candle>();
        assert_sync::<domain::Candle>();
        assert_send::<domain::Signal>();
        assert_sync::<domain::Signal>();
    }

    #[test]
    fn param_types_are_send_sync() {
        assert_send::<params::ParamSet>();
        assert_sync::<params::ParamSet>();
        assert_send::<params::ArmKey>();
        assert_sync::<params::ArmKey>();
    }

    #[test]
    fn registry_is_send_sync() {
        assert_send::<strategy::StrategyRegistry>();
        assert_sync::<strategy::StrategyRegistry>();
    }
}
