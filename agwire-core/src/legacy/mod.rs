//! Conversion from AG-UI events to the legacy event vocabulary.
//!
//! A [`LegacyConverter`] is created per run and fed that run's events in
//! order. It is not shared between threads; callers that receive one run's
//! events on several tasks must serialize them first.

mod converter;
mod events;
mod predict;

pub use converter::{
    AnomalyKind, AnomalyPolicy, ConversionAnomaly, ConverterConfig, LegacyConverter,
};
pub use events::LegacyEvent;
pub use predict::{parse_complete_args, parse_mappings, PredictStateMapping, PREDICT_STATE_EVENT};
