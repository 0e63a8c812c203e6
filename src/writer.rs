use std::{
    fs::File,
    io::{BufWriter, Write},
    path::PathBuf,
    sync::mpsc::Receiver,
};

use crate::{WayfarerError, geolocation::WatchEvent};

/// Drains the trace channel into a JSONL file, one event per line, until
/// every sender is gone. The resulting file replays through `ReplaySource`.
pub fn write_trace(
    file: &PathBuf,
    trace_receiver: Receiver<WatchEvent>,
) -> Result<(), WayfarerError> {
    let trace_file = File::create(file).map_err(|e| WayfarerError::WriterError { source: e })?;
    let mut trace_writer = BufWriter::new(trace_file);
    for event in &trace_receiver {
        let _ = writeln!(
            trace_writer,
            "{}",
            serde_json::to_string(&event).unwrap()
        )
        .map_err(|e| {
            println!("Error while writing watch event to trace file: {}", e);
        });
    }
    trace_writer
        .flush()
        .map_err(|e| WayfarerError::WriterError { source: e })?;
    Ok(())
}
