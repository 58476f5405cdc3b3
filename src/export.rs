//! CSV export and import of vehicle trajectories.

use crate::{Error, Result, Track};
use serde::{Deserialize, Serialize};
use std::io::Write;
use std::path::Path;

/// The CSV header, matching the fields of [TrajectoryRecord].
pub const COLUMNS: [&str; 5] = ["id", "timestep", "alpha", "lane", "speed"];

/// One recorded sample of one vehicle.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct TrajectoryRecord {
    /// The vehicle's index on the track.
    pub id: usize,
    /// The simulated time of the sample, in s.
    pub timestep: f64,
    /// The position along the ring, in m.
    pub alpha: f64,
    /// The lane, 0 being the rightmost.
    pub lane: usize,
    /// The velocity in m/s.
    pub speed: f64,
}

/// The name of the file the trajectories of one simulated density are written to.
pub fn file_name(central: bool, lane_count: usize, density: f64) -> String {
    let mode = if central { "central" } else { "individual" };
    format!(
        "data_{}_{}lane_density_{}.csv",
        mode,
        lane_count,
        density.round() as i64
    )
}

/// Flattens the recorded histories of every vehicle on the track.
/// Vehicles are numbered lane by lane from the rightmost, in position order.
pub fn trajectory_records(track: &Track) -> Vec<TrajectoryRecord> {
    let dt = track.dt();
    track
        .lanes()
        .iter()
        .flat_map(|lane| lane.vehicles())
        .filter_map(|id| track.get_vehicle(*id))
        .enumerate()
        .flat_map(|(id, vehicle)| {
            vehicle
                .history()
                .iter()
                .enumerate()
                .map(move |(idx, sample)| TrajectoryRecord {
                    id,
                    timestep: idx as f64 * dt,
                    alpha: sample.pos,
                    lane: sample.lane,
                    speed: sample.vel,
                })
        })
        .collect()
}

/// Writes the records as CSV. The header row is written even when there are no records.
pub fn write_records<W: Write>(writer: W, records: &[TrajectoryRecord]) -> Result<()> {
    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(writer);
    writer.write_record(COLUMNS)?;
    for record in records {
        writer.serialize(record)?;
    }
    writer.flush()?;
    Ok(())
}

/// Writes the trajectories of every vehicle on the track to a CSV file.
/// Returns the number of rows written.
pub fn write_trajectories(path: impl AsRef<Path>, track: &Track) -> Result<usize> {
    let records = trajectory_records(track);
    let file = std::fs::File::create(path.as_ref())?;
    write_records(std::io::BufWriter::new(file), &records)?;
    log::info!(
        "Wrote {} trajectory samples to {}",
        records.len(),
        path.as_ref().display()
    );
    Ok(records.len())
}

/// Reads trajectory records from any CSV source with a header row.
pub fn read_records<R: std::io::Read>(reader: R) -> Result<Vec<TrajectoryRecord>> {
    let mut reader = csv::Reader::from_reader(reader);
    let records = reader.deserialize().collect::<csv::Result<Vec<_>>>()?;
    Ok(records)
}

/// Reads a trajectory file written by [write_trajectories].
pub fn read_trajectories(path: impl AsRef<Path>) -> Result<Vec<TrajectoryRecord>> {
    let path = path.as_ref();
    let records = read_records(std::fs::File::open(path)?)?;
    if records.is_empty() {
        return Err(Error::EmptyTrajectories(path.display().to_string()));
    }
    Ok(records)
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::{LaneChangeStrategy, TrackAttributes, VehicleAttributes};
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn recording_track() -> Track {
        Track::new(&TrackAttributes {
            road_length: 100.0,
            lane_count: 2,
            dt: 0.5,
            strategy: LaneChangeStrategy::Traditional,
            control: None,
            record_history: true,
        })
        .unwrap()
    }

    #[test]
    fn file_names() {
        assert_eq!(file_name(true, 2, 77.77), "data_central_2lane_density_78.csv");
        assert_eq!(file_name(false, 1, 0.0), "data_individual_1lane_density_0.csv");
        assert_eq!(file_name(false, 3, 15.4), "data_individual_3lane_density_15.csv");
    }

    #[test]
    fn records_follow_history() {
        let mut track = recording_track();
        let attrs = VehicleAttributes::default();
        track.add_vehicle(0, 10.0, 5.0, &attrs).unwrap();
        track.add_vehicle(1, 60.0, 8.0, &attrs).unwrap();
        let mut rng = StdRng::seed_from_u64(3);
        for _ in 0..4 {
            track.step(&mut rng).unwrap();
        }

        let records = trajectory_records(&track);
        assert_eq!(records.len(), 10);
        let first: Vec<_> = records.iter().filter(|r| r.id == 0).collect();
        assert_eq!(first.len(), 5);
        assert_eq!(first[0].timestep, 0.0);
        assert_eq!(first[0].alpha, 10.0);
        assert_eq!(first[0].speed, 5.0);
        assert_eq!(first[4].timestep, 2.0);
        assert!(records.iter().all(|r| (0.0..100.0).contains(&r.alpha)));
    }

    #[test]
    fn csv_layout() {
        let records = vec![
            TrajectoryRecord {
                id: 0,
                timestep: 0.0,
                alpha: 12.5,
                lane: 1,
                speed: 3.0,
            },
            TrajectoryRecord {
                id: 1,
                timestep: 1.0,
                alpha: 40.0,
                lane: 0,
                speed: 0.5,
            },
        ];
        let mut buf = vec![];
        write_records(&mut buf, &records).unwrap();
        let text = String::from_utf8(buf.clone()).unwrap();
        assert_eq!(text.lines().next(), Some("id,timestep,alpha,lane,speed"));
        assert_eq!(text.lines().count(), 3);
        assert_eq!(read_records(buf.as_slice()).unwrap(), records);
    }

    #[test]
    fn empty_file_keeps_header() {
        let mut buf = vec![];
        write_records(&mut buf, &[]).unwrap();
        assert_eq!(String::from_utf8(buf.clone()).unwrap(), "id,timestep,alpha,lane,speed\n");
        assert!(read_records(buf.as_slice()).unwrap().is_empty());

        let track = recording_track();
        assert!(trajectory_records(&track).is_empty());
    }

    #[test]
    fn ids_follow_lane_order() {
        let mut track = recording_track();
        let attrs = VehicleAttributes::default();
        track.add_vehicle(1, 20.0, 0.0, &attrs).unwrap();
        track.add_vehicle(0, 70.0, 0.0, &attrs).unwrap();
        track.add_vehicle(0, 30.0, 0.0, &attrs).unwrap();

        let records = trajectory_records(&track);
        let placed: Vec<_> = records.iter().map(|r| (r.id, r.lane, r.alpha)).collect();
        assert_eq!(placed, vec![(0, 0, 30.0), (1, 0, 70.0), (2, 1, 20.0)]);
    }

    #[test]
    fn rejects_malformed_rows() {
        let text = "id,timestep,alpha,lane,speed\n0,0.0,abc,0,1.0\n";
        assert!(read_records(text.as_bytes()).is_err());
    }
}
