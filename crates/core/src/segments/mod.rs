//! Segment analytics
//!
//! Deterministic summaries the assistant serves next to the daily briefing:
//! dashboard KPIs, RFM scoring, and per-segment overviews with canned
//! insights and recommendations.

mod insights;
mod kpis;
mod rfm;

pub use insights::{
    segment_insights, segment_overview, segment_recommendations, SegmentInsights, SegmentPriority,
    SegmentSummary,
};
pub use kpis::{compute_kpis, CustomerKpis, SegmentCount};
pub use rfm::{interpret_rfm_segment, rfm_distribution, score_rfm, RfmInput, RfmScore};
