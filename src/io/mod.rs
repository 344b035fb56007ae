pub mod metrics_tsv;
pub mod phy;

pub use metrics_tsv::{read_metrics_tsv, read_metrics_tsv_with_config, MetricsReaderConfig};
pub use phy::export_to_phy;
