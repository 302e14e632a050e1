//! Environment source: ANCHORVIEW__SECTION__KEY, e.g. ANCHORVIEW__SEARCH__INDEX.

use config::builder::DefaultState;
use config::ConfigBuilder;
use config::Environment;

pub const ENV_PREFIX: &str = "ANCHORVIEW";
pub const ENV_SEPARATOR: &str = "__";

/// Add the environment layer. Comma-separated values are split into lists
/// for the list-valued keys only.
pub fn add_to_builder(builder: ConfigBuilder<DefaultState>) -> ConfigBuilder<DefaultState> {
    builder.add_source(
        Environment::with_prefix(ENV_PREFIX)
            .separator(ENV_SEPARATOR)
            .try_parsing(true)
            .list_separator(",")
            .with_list_parse_key("context.tie_breaker_fields")
            .with_list_parse_key("context.lookup_offsets_days"),
    )
}
