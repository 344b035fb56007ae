//! Export of curation output to a phy folder.
use std::fs::File;
use std::io::BufWriter;
use std::path::PathBuf;

use anyhow::{bail, Context, Result};

use crate::analyzer::Sorting;
use crate::curation::ClassifiedUnits;

/// Annotation key naming the sorting's phy export folder.
pub const PHY_FOLDER_ANNOTATION: &str = "phy_folder";
/// File name of the exported prediction table.
pub const PREDICTION_FILENAME: &str = "cluster_prediction.tsv";

/// Write the classification outcome as `cluster_prediction.tsv` into the
/// sorting's annotated phy folder.
///
/// The sorting must carry a `phy_folder` annotation pointing at an existing
/// directory; nothing is written otherwise.
pub fn export_to_phy(sorting: &Sorting, classified: &ClassifiedUnits) -> Result<PathBuf> {
    let Some(folder) = sorting.annotation(PHY_FOLDER_ANNOTATION) else {
        bail!("phy folder not found in sorting annotations");
    };
    let folder = PathBuf::from(folder);
    if !folder.is_dir() {
        bail!("phy folder {} is not a directory", folder.display());
    }

    let path = folder.join(PREDICTION_FILENAME);
    let file =
        File::create(&path).with_context(|| format!("failed to create {}", path.display()))?;
    let mut writer = csv::WriterBuilder::new()
        .delimiter(b'\t')
        .from_writer(BufWriter::new(file));

    writer.write_record(&["cluster_id", "prediction", "probability"])?;
    for (unit_id, label, confidence) in classified.iter() {
        writer.write_record(&[
            unit_id.to_string(),
            label.to_string(),
            confidence.to_string(),
        ])?;
    }
    writer.flush()?;

    log::info!(
        "wrote {} predictions to {}",
        classified.len(),
        path.display()
    );
    Ok(path)
}
