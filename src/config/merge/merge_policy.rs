//! Merge rules: defaults, override order, conflict handling.

use config::Config;
use config::ConfigBuilder;
use config::ConfigError;

/// Create a Config builder with merge policy defaults applied.
///
/// Later sources replace whole values; lists are never concatenated.
pub fn builder_with_defaults() -> Result<ConfigBuilder<config::builder::DefaultState>, ConfigError>
{
    Config::builder()
        .set_default("search.endpoint", "http://localhost:9200")?
        .set_default("search.connect_timeout_secs", 10i64)?
        .set_default("search.request_timeout_secs", 30i64)?
        .set_default("context.default_size", 5i64)?
        .set_default("context.step", 5i64)?
        .set_default("context.max_size", 10_000i64)?
        .set_default("context.default_sort", "desc")
}
