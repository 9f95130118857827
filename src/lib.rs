//! # recall-engine - spaced-repetition scoring and review scheduling
//!
//! Pure, deterministic computations over a learner's question history:
//!
//! - **Decay Model** - recency weighting of attempts and forgetting projection
//! - **Score Calculator** - attempt validation and mastery estimation
//! - **Statistics Aggregator** - subject and subject/week roll-ups, weak areas
//! - **Practice Selector** - fairness-constrained review queue
//!
//! Nothing here reads a clock, touches storage or keeps state between calls.
//! Callers pass `now` explicitly and own persistence through
//! [`store::HistoryStore`].
//!
//! ## 模块结构
//!
//! - [`decay`] - recency weight, forgetting projection
//! - [`score`] - `record_attempt`, `compute_mastery`
//! - [`stats`] - `aggregate`, summary, practice activity
//! - [`selector`] - `select_practice_set`, practice order
//! - [`engine`] - [`ReviewEngine`] façade over the above
//! - [`store`] - versioned history seam and in-memory store
//! - [`cache`] - snapshot fingerprints and caller-owned memoization
//! - [`snapshot`] - JSON snapshot in, report out
//! - [`config`] - [`EngineConfig`] with env overrides
//! - [`sanitize`] - range checks and clamping
//! - [`types`] - shared types and default constants
//!
//! ## 使用示例
//!
//! ```rust
//! use chrono::{Duration, TimeZone, Utc};
//! use recall_engine::{EngineConfig, QuestionHistory, ReviewEngine};
//!
//! let engine = ReviewEngine::new(EngineConfig::default()).unwrap();
//! let t0 = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
//!
//! let history = engine
//!     .record_attempt(&QuestionHistory::new(), 0.8, t0, "mitochondria")
//!     .unwrap();
//! let mastery = engine.compute_mastery(&history, t0 + Duration::days(3)).unwrap();
//! assert!(mastery.value.unwrap() < 0.8);
//! ```

// ============================================================================
// 模块声明
// ============================================================================

pub mod cache;
pub mod config;
pub mod decay;
pub mod engine;
pub mod error;
pub mod logging;
pub mod sanitize;
pub mod score;
pub mod selector;
pub mod snapshot;
pub mod stats;
pub mod store;
pub mod types;

// ============================================================================
// 重新导出
// ============================================================================

/// 重新导出所有公共类型
pub use types::*;

pub use cache::{SnapshotCache, SnapshotKey};
pub use config::EngineConfig;
pub use engine::ReviewEngine;
pub use error::{EngineError, EngineResult};
pub use score::ScoreCalculator;
pub use selector::{PracticeOrder, PracticeSelector, SelectionOptions};
pub use snapshot::{build_report, PracticeReport, PracticeSnapshot};
pub use stats::{PracticeActivity, StatisticsAggregator, StatisticsSummary};
pub use store::{HistoryStore, MemoryHistoryStore, StoreError};
