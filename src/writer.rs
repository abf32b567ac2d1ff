use std::{
    fs::File,
    io::{BufWriter, Write},
    path::Path,
};

use crate::{TracksmithError, track::TrackModel};

/// Write an assembled track model as JSON
pub fn write_model(file: &Path, model: &TrackModel) -> Result<(), TracksmithError> {
    let model_file = File::create(file).map_err(|e| TracksmithError::WriterError { source: e })?;
    let mut model_file_writer = BufWriter::new(model_file);
    serde_json::to_writer_pretty(&mut model_file_writer, model)
        .map_err(|e| TracksmithError::ExportSerializeError { source: e })?;
    writeln!(model_file_writer).map_err(|e| TracksmithError::WriterError { source: e })?;
    model_file_writer
        .flush()
        .map_err(|e| TracksmithError::WriterError { source: e })?;
    Ok(())
}
