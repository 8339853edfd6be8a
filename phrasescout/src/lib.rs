pub mod cache;
pub mod config;
pub mod corpus;
pub mod errors;
pub mod extract;
pub mod filters;
pub mod metrics;
pub mod pool;
pub mod results;
pub mod search;

pub use cache::IdCache;
pub use config::{CliOverrides, EncodingMode, ScoutConfig};
pub use corpus::{collect_documents, collect_from_config, CorpusSearch};
pub use errors::{SearchError, SearchResult};
pub use extract::{DocumentSource, PlainTextExtractor, TextExtractor};
pub use filters::DocumentFilter;
pub use metrics::{PoolMetrics, PoolStats};
pub use pool::{
    ExtractRequest, Job, MatchHandle, MatchRequest, Task, TaskHandle, TaskId, TaskOutput,
    TextHandle, WorkerPool,
};
pub use results::{DocumentMatches, Match, MatchReport};
pub use search::{match_text, MatchOptions, SearchSpec, WindowMatcher};
