//! Readers and statistics for the text outputs the simulation and the
//! evolutionary search leave behind.

pub mod feats;
pub mod goodsets;
pub mod robustness;
pub mod sense;

pub use feats::{
    feature_buckets, feature_file, posterior_mean, read_feature_points, read_sync_grid, sync_file,
    sync_stats, FeatsSeries, FeatureBuckets, SyncGrid, SyncStats, TissueFeature, FEATURE_BUCKETS,
};
pub use goodsets::extract_good_sets;
pub use robustness::{count_passes, write_robust_sets, RobustnessConfig};
pub use sense::{
    num_check, param_label, parse_feature_file, sanitize, sense_stats, FeatureStats,
    FeatureTable, PARAM_NAMES,
};
