pub mod briefing;
pub mod config;
pub mod domain;
pub mod errors;
pub mod segments;

pub use briefing::{
    analyze_daily_briefing, BriefingEngine, BriefingInput, BriefingOutcome, BriefingResult,
    BriefingThresholds, ContextAction,
};
pub use config::{AppConfig, ConfigError, ConfigOverrides, LoadOptions, LogFormat};
pub use domain::customer::{coerce_float, CustomerRecord};
pub use domain::segment::{aggregate_by_segment, SegmentAggregate};
pub use errors::{ApplicationError, BriefingError};
pub use segments::{compute_kpis, score_rfm, segment_overview, CustomerKpis, RfmInput, RfmScore};
