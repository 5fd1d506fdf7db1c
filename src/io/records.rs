//! CSV tables of segments and onset times

use std::io::{Read, Write};
use std::path::Path;

use crate::analysis::segmenter::SegmentRecord;
use crate::error::SegmentationError;

/// Write segment records with a `time,env_max,env_mean,env_std,env_delta` header
pub fn write_segments<W: Write>(writer: W, records: &[SegmentRecord]) -> Result<(), SegmentationError> {
    let mut csv_writer = csv::Writer::from_writer(writer);
    for record in records {
        csv_writer.serialize(record)?;
    }
    // An empty table still carries its header
    if records.is_empty() {
        csv_writer.write_record(["time", "env_max", "env_mean", "env_std", "env_delta"])?;
    }
    csv_writer.flush()?;
    Ok(())
}

/// Write segment records to a CSV file
pub fn write_segments_csv(path: &Path, records: &[SegmentRecord]) -> Result<(), SegmentationError> {
    let file = std::fs::File::create(path)?;
    write_segments(file, records)?;
    log::debug!("Wrote {} segments to {}", records.len(), path.display());
    Ok(())
}

/// Read segment records written by [`write_segments`]
pub fn read_segments<R: Read>(reader: R) -> Result<Vec<SegmentRecord>, SegmentationError> {
    let mut csv_reader = csv::Reader::from_reader(reader);
    csv_reader
        .deserialize()
        .map(|row| row.map_err(SegmentationError::from))
        .collect()
}

/// Read the `time` column of a CSV table
///
/// Other columns are ignored, so segment tables and bare onset lists both work.
///
/// # Errors
///
/// Returns `SegmentationError::InvalidInput` if there is no `time` column or a
/// value is not a number.
pub fn read_onset_times<R: Read>(reader: R) -> Result<Vec<f64>, SegmentationError> {
    let mut csv_reader = csv::Reader::from_reader(reader);
    let column = csv_reader
        .headers()?
        .iter()
        .position(|h| h.trim() == "time")
        .ok_or_else(|| SegmentationError::InvalidInput("CSV has no 'time' column".to_string()))?;

    let mut times = Vec::new();
    for row in csv_reader.records() {
        let row = row?;
        let field = row.get(column).unwrap_or("").trim();
        let time = field.parse::<f64>().map_err(|_| {
            SegmentationError::InvalidInput(format!("Invalid onset time '{}'", field))
        })?;
        times.push(time);
    }
    Ok(times)
}

/// Read onset times from a CSV file
pub fn read_onset_times_csv(path: &Path) -> Result<Vec<f64>, SegmentationError> {
    read_onset_times(std::fs::File::open(path)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(time: f64) -> SegmentRecord {
        SegmentRecord {
            time,
            env_max: -10.0,
            env_mean: -20.0,
            env_std: 3.0,
            env_delta: 25.0,
        }
    }

    #[test]
    fn test_segments_table() {
        let mut buffer = Vec::new();
        write_segments(&mut buffer, &[record(0.5), record(2.0)]).unwrap();
        let text = String::from_utf8(buffer.clone()).unwrap();
        assert!(text.starts_with("time,env_max,env_mean,env_std,env_delta\n"));

        let parsed = read_segments(buffer.as_slice()).unwrap();
        assert_eq!(parsed, vec![record(0.5), record(2.0)]);
    }

    #[test]
    fn test_empty_table_has_header() {
        let mut buffer = Vec::new();
        write_segments(&mut buffer, &[]).unwrap();
        assert_eq!(
            String::from_utf8(buffer).unwrap(),
            "time,env_max,env_mean,env_std,env_delta\n"
        );
    }

    #[test]
    fn test_read_onset_times_any_layout() {
        let csv = ",time,env_delta\n0,0.25,4.0\n1,1.5,7.0\n";
        assert_eq!(read_onset_times(csv.as_bytes()).unwrap(), vec![0.25, 1.5]);
    }

    #[test]
    fn test_read_onset_times_errors() {
        assert!(read_onset_times("onset\n0.1\n".as_bytes()).is_err());
        assert!(read_onset_times("time\nabc\n".as_bytes()).is_err());
    }
}
