use std::io::Write;

use pelletloc::{input, output, pipeline, Config};

const DEMAND: &str = "\
Index,Latitude,Longitude,2017,2018
0,24.66818,71.33144,4000.0,5000.0
1,24.66818,71.41106,14000.0,15000.0
2,24.66818,71.49069,4500.0,5000.0
3,24.74782,71.33144,900.5,1200.25
";

#[test]
fn csv_in_csv_out() {
    let dir = tempfile::tempdir().unwrap();
    let demand_path = dir.path().join("demand.csv");
    std::fs::File::create(&demand_path)
        .unwrap()
        .write_all(DEMAND.as_bytes())
        .unwrap();

    let table = input::load_demand_csv(&demand_path).unwrap();
    assert_eq!(table.years(), &[2017, 2018]);
    let distances = pipeline::site_distances(&table);

    let out = pipeline::run(&table, &distances, &[2018], &Config::default()).unwrap();
    let out_path = dir.path().join("records.csv");
    output::write_csv(&out_path, &out.records).unwrap();

    let mut reader = csv::Reader::from_path(&out_path).unwrap();
    let headers: Vec<String> = reader.headers().unwrap().iter().map(String::from).collect();
    assert_eq!(headers, ["year", "data_type", "source_index", "destination_index", "value"]);

    let rows: Vec<csv::StringRecord> = reader.records().map(Result::unwrap).collect();
    assert_eq!(rows.len(), out.records.len());
    let depot_rows: Vec<&csv::StringRecord> = rows.iter().filter(|r| &r[1] == "depot_location").collect();
    assert_eq!(depot_rows.len(), out.depots.len());
    for row in depot_rows {
        assert_eq!(&row[0], "2018");
        assert_eq!(&row[3], "0");
        let index: usize = row[2].parse().unwrap();
        assert!(index < table.len());
    }
}

#[test]
fn external_distance_matrix_is_used() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("distance.csv");
    let mut file = std::fs::File::create(&path).unwrap();
    writeln!(file, ",0,1,2").unwrap();
    writeln!(file, "0,0.0,10.0,20.0").unwrap();
    writeln!(file, "1,10.0,0.0,10.0").unwrap();
    writeln!(file, "2,20.0,10.0,0.0").unwrap();
    drop(file);

    let matrix = input::load_distance_csv(&path).unwrap();
    assert!(matrix.ensure_square(3).is_ok());
    assert_eq!(matrix.get(0, 2), 20.0);
}
