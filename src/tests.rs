use crate::*;
use regex::Regex;
use std::fs;
use std::path::Path;
use std::sync::Arc;

fn init_log() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn read_basic() -> Gtfs {
    init_log();
    Gtfs::from_path("fixtures/basic").expect("impossible to read gtfs")
}

/// A writable copy of a fixture directory
fn copy_fixture(name: &str) -> tempfile::TempDir {
    let dir = tempfile::tempdir().expect("impossible to create temp dir");
    for entry in fs::read_dir(Path::new("fixtures").join(name)).unwrap() {
        let entry = entry.unwrap();
        fs::copy(entry.path(), dir.path().join(entry.file_name())).unwrap();
    }
    dir
}

fn stop(id: &str, name: &str) -> Record {
    Record::from_iter([("stop_id", id), ("stop_name", name)])
}

#[test]
fn read_stops() {
    let gtfs = read_basic();
    assert_eq!(2, gtfs.count("stops").unwrap());
    let stop = gtfs.get_stop("stop_0").unwrap().unwrap();
    assert_eq!(Some("Stop 0"), stop.get("stop_name"));
    assert_eq!(Some("48.8566"), stop.get("stop_lat"));
    assert_eq!(None, gtfs.get_stop("stop_9").unwrap());
}

#[test]
fn read_quoted_fields_and_bom() {
    let gtfs = read_basic();
    let route = gtfs.get_route("route_x").unwrap().unwrap();
    assert_eq!(Some("\"Route X\""), route.get("route_long_name"));
    assert_eq!(Some("North, then south"), route.get("route_desc"));

    let agency = gtfs.get_agency("agency_0").unwrap().unwrap();
    assert_eq!(Some("Agency 0"), agency.get("agency_name"));
}

#[test]
fn lazy_load_is_idempotent() {
    let gtfs = read_basic();
    assert!(!gtfs.is_loaded("stops"));
    let first = gtfs.table("stops").unwrap();
    let second = gtfs.table("stops").unwrap();
    assert!(gtfs.is_loaded("stops"));
    assert!(Arc::ptr_eq(&first, &second));

    gtfs.add_stops([stop("stop_2", "Stop 2")]).unwrap();
    assert_eq!(3, first.read().len());
    assert_eq!(3, gtfs.count("stops").unwrap());
}

#[test]
fn file_is_read_once() {
    init_log();
    let dir = copy_fixture("basic");
    let gtfs = Gtfs::from_path(dir.path()).unwrap();
    assert_eq!(2, gtfs.count("stops").unwrap());

    fs::write(dir.path().join("stops.txt"), "stop_id,stop_name\nother,Other\n").unwrap();
    assert_eq!(2, gtfs.count("stops").unwrap());
    assert!(gtfs.get_stop("other").unwrap().is_none());

    gtfs.reset("stops").unwrap();
    assert_eq!(0, gtfs.count("stops").unwrap(), "reset does not read the file again");
}

#[test]
fn reset_before_first_access() {
    let gtfs = read_basic();
    gtfs.reset("trips").unwrap();
    assert!(gtfs.is_loaded("trips"));
    assert_eq!(0, gtfs.count("trips").unwrap());
    assert!(matches!(gtfs.reset("modes"), Err(Error::UnknownTable(_))));
}

#[test]
fn navigate_parents() {
    let gtfs = read_basic();
    let trip = gtfs.get_trip("trip_0").unwrap().unwrap();
    let route = gtfs.get_route_of_trip(&trip).unwrap().unwrap();
    assert_eq!(Some("route_0"), route.get("route_id"));
    let agency = gtfs.get_agency_of_route(&route).unwrap().unwrap();
    assert_eq!(Some("agency_0"), agency.get("agency_id"));

    let stop_time = gtfs.get_stop_time("trip_0", "2").unwrap().unwrap();
    assert_eq!(
        Some("stop_1"),
        gtfs.get_stop_of_stop_time(&stop_time)
            .unwrap()
            .unwrap()
            .get("stop_id")
    );
    assert_eq!(
        Some("route_0"),
        gtfs.get_route_of_stop_time(&stop_time)
            .unwrap()
            .unwrap()
            .get("route_id")
    );
    assert_eq!(
        Some("service_0"),
        gtfs.get_calendar_of_stop_time(&stop_time)
            .unwrap()
            .unwrap()
            .get("service_id")
    );
}

#[test]
fn dangling_references_are_not_errors() {
    let gtfs = read_basic();
    let trip = gtfs.get_trip("trip_2").unwrap().unwrap();
    assert_eq!(None, gtfs.get_route_of_trip(&trip).unwrap());

    let orphan = Record::from_iter([("trip_id", "trip_9"), ("stop_sequence", "1")]);
    assert_eq!(None, gtfs.get_route_of_stop_time(&orphan).unwrap());
}

#[test]
fn missing_foreign_key() {
    let gtfs = read_basic();
    let trip = Record::from_iter([("trip_id", "t2")]);
    match gtfs.get_parent(&trip, "routes") {
        Err(Error::MissingForeignKey { field }) => assert_eq!("route_id", field),
        other => panic!("unexpected result {:?}", other),
    }
    assert!(matches!(
        gtfs.get_children_of_parent(&trip, "calendar_dates"),
        Err(Error::MissingForeignKey { .. })
    ));
}

#[test]
fn parent_found_in_added_records() {
    let gtfs = Gtfs::in_memory();
    gtfs.add_trips([Record::from_iter([("trip_id", "t1"), ("route_id", "r1")])])
        .unwrap();
    gtfs.add_routes([Record::from_iter([("route_id", "r1"), ("route_short_name", "R1")])])
        .unwrap();
    let trip = gtfs.get_trip("t1").unwrap().unwrap();
    let route = gtfs.get_parent(&trip, "routes").unwrap().unwrap();
    assert_eq!(Some("R1"), route.get("route_short_name"));
}

#[test]
fn absence_versus_wrong_deepness() {
    let gtfs = read_basic();
    assert_eq!(None, gtfs.get("stops", "nowhere").unwrap());
    assert_eq!(None, gtfs.get_by_keys("stop_times", "trip_0", "9").unwrap());
    assert!(matches!(
        gtfs.get_by_keys("stops", "stop_0", "1"),
        Err(Error::WrongDeepness {
            expected: 2,
            actual: 1,
            ..
        })
    ));
    assert!(matches!(
        gtfs.get("stop_times", "trip_0"),
        Err(Error::WrongDeepness { .. })
    ));
    assert!(matches!(
        gtfs.get_parent(&Record::new(), "stop_times"),
        Err(Error::WrongDeepness { .. })
    ));
    assert!(matches!(gtfs.get("levels", "l1"), Err(Error::UnknownTable(_))));
}

#[test]
fn children_of_trip() {
    let gtfs = read_basic();
    let trip = gtfs.get_trip("trip_0").unwrap().unwrap();
    let stop_times = gtfs.stop_times_of_trip(&trip).unwrap().unwrap();
    assert_eq!(vec!["1", "2"], stop_times.keys().collect::<Vec<_>>());

    let stops: Vec<String> = gtfs
        .stops_of_trip(&trip)
        .unwrap()
        .iter()
        .filter_map(|s| s.text("stop_id"))
        .collect();
    assert_eq!(vec!["stop_0", "stop_1"], stops);

    assert_eq!(2, gtfs.frequencies_of_trip(&trip).unwrap().unwrap().len());
    assert_eq!(2, gtfs.shape_points_of_trip(&trip).unwrap().unwrap().len());

    let calendar = gtfs.get_calendar("service_0").unwrap().unwrap();
    let mut dates = Vec::new();
    gtfs.for_each_child(&calendar, "calendar_dates", |d| dates.push(d.text("date")))
        .unwrap();
    assert_eq!(
        vec![Some("20240501".to_owned()), Some("20240508".to_owned())],
        dates
    );

    let lonely = Record::from_iter([("trip_id", "trip_2")]);
    assert_eq!(None, gtfs.stop_times_of_trip(&lonely).unwrap());
    assert_eq!(None, gtfs.children("stop_times", "trip_9").unwrap());
    assert!(matches!(
        gtfs.children("stops", "stop_0"),
        Err(Error::WrongDeepness { .. })
    ));
}

#[test]
fn no_dangling_buckets() {
    let gtfs = read_basic();
    let stop_times = gtfs.children("stop_times", "trip_0").unwrap().unwrap();
    let records: Vec<Record> = stop_times.values().cloned().collect();

    assert_eq!(1, gtfs.remove_stop_times(&records[..1]).unwrap());
    assert!(gtfs.children("stop_times", "trip_0").unwrap().is_some());
    assert_eq!(1, gtfs.remove_stop_times(&records[1..]).unwrap());
    assert!(gtfs.children("stop_times", "trip_0").unwrap().is_none());
    assert!(gtfs
        .table("stop_times")
        .unwrap()
        .read()
        .children("trip_0")
        .is_none());

    assert_eq!(0, gtfs.remove_stop_times(&records).unwrap());
    assert_eq!(2, gtfs.records("stop_times").unwrap().len());
}

#[test]
fn last_write_wins() {
    let gtfs = read_basic();
    gtfs.add_stops([stop("stop_9", "First")]).unwrap();
    gtfs.add_stops([stop("stop_9", "Second")]).unwrap();
    assert_eq!(
        Some("Second"),
        gtfs.get_stop("stop_9").unwrap().unwrap().get("stop_name")
    );
    assert_eq!(3, gtfs.count("stops").unwrap());
}

#[test]
fn add_checks_every_record_first() {
    let gtfs = read_basic();
    let nameless = Record::from_iter([("stop_name", "No id")]);
    match gtfs.add_stops([stop("stop_8", "Stop 8"), nameless]) {
        Err(Error::MissingIndexKey { table, field }) => {
            assert_eq!("stops", table);
            assert_eq!("stop_id", field);
        }
        other => panic!("unexpected result {:?}", other),
    }
    assert_eq!(2, gtfs.count("stops").unwrap());
    assert_eq!(None, gtfs.get_stop("stop_8").unwrap());
}

#[test]
fn singleton_table() {
    let gtfs = read_basic();
    let feed_info = gtfs.get_feed_info().unwrap().unwrap();
    assert_eq!(Some("Example"), feed_info.get("feed_publisher_name"));

    assert!(matches!(
        gtfs.add_one("feed_info", feed_info.clone()),
        Err(Error::NotAddable(_))
    ));
    assert!(matches!(
        gtfs.count("feed_info"),
        Err(Error::AmbiguousCount(_))
    ));

    let mut other = feed_info;
    other.set("feed_lang", "en");
    gtfs.set_feed_info(Some(other)).unwrap();
    assert_eq!(
        Some("en"),
        gtfs.get_feed_info().unwrap().unwrap().get("feed_lang")
    );
    gtfs.set_feed_info(None).unwrap();
    assert_eq!(None, gtfs.get_feed_info().unwrap());
    assert!(matches!(
        gtfs.get_singleton("stops"),
        Err(Error::ShapeMismatch { .. })
    ));
}

#[test]
fn set_checks_shape() {
    let gtfs = read_basic();
    assert!(matches!(
        gtfs.set("stops", Container::Singleton(None)),
        Err(Error::ShapeMismatch { .. })
    ));
    assert!(matches!(
        gtfs.set("stops", Container::empty(&Indexing::single("stop_code"))),
        Err(Error::ShapeMismatch { .. })
    ));
    assert!(!gtfs.is_loaded("stops"), "a rejected container is not stored");

    let stops = Container::from_records(&Indexing::single("stop_id"), [stop("s", "S")]).unwrap();
    gtfs.set("stops", stops).unwrap();
    assert_eq!(1, gtfs.count("stops").unwrap());
}

#[test]
fn count_is_defined_for_flat_tables() {
    let gtfs = read_basic();
    assert_eq!(3, gtfs.count("trips").unwrap());
    assert_eq!(2, gtfs.count("fare_rules").unwrap(), "identical rules collapse");
    assert!(matches!(
        gtfs.count("stop_times"),
        Err(Error::AmbiguousCount(_))
    ));
}

#[test]
fn editing_set_records_refreshes_identity() {
    let gtfs = read_basic();
    gtfs.for_each_mut("fare_rules", |rule| {
        rule.set("route_id", "route_0");
    })
    .unwrap();
    assert_eq!(1, gtfs.count("fare_rules").unwrap());

    let rule = Record::from_iter([("fare_id", "fare_0"), ("route_id", "route_0")]);
    assert_eq!(1, gtfs.remove_fare_rules(&[rule]).unwrap());
    assert_eq!(0, gtfs.count("fare_rules").unwrap());
}

#[test]
fn iteration_follows_file_order() {
    let gtfs = read_basic();
    let mut visited = Vec::new();
    gtfs.for_each_stop_time(|st| {
        visited.push(format!(
            "{}/{}",
            st.get("trip_id").unwrap_or_default(),
            st.get("stop_sequence").unwrap_or_default()
        ))
    })
    .unwrap();
    assert_eq!(vec!["trip_0/1", "trip_0/2", "trip_1/1", "trip_1/2"], visited);

    let mut count = 0;
    gtfs.for_each("feed_info", |_| count += 1).unwrap();
    assert_eq!(1, count);
}

#[test]
fn actual_columns_with_extra_fields() {
    let gtfs = read_basic();
    let declared: Vec<String> = gtfs.schema().columns_of("routes").unwrap().to_vec();
    assert_eq!(declared, gtfs.actual_columns("routes").unwrap());

    gtfs.for_each_mut("routes", |route| {
        if route.get("route_id") == Some("route_0") {
            route.set("network", "Metro");
            route.set("temp", "x");
        }
    })
    .unwrap();
    let columns = gtfs.actual_columns("routes").unwrap();
    assert_eq!(declared.len() + 2, columns.len());
    assert_eq!(&["network", "temp"], &columns[declared.len()..]);

    let stops = gtfs.actual_columns("stops").unwrap();
    assert_eq!(gtfs.schema().columns_of("stops").unwrap(), &stops[..]);
}

#[test]
fn export_copies_untouched_tables() {
    let gtfs = read_basic();
    let output = tempfile::tempdir().unwrap();
    gtfs.export(output.path()).unwrap();

    for file in ["routes.txt", "agency.txt", "stop_times.txt", "feed_info.txt"] {
        assert_eq!(
            fs::read(Path::new("fixtures/basic").join(file)).unwrap(),
            fs::read(output.path().join(file)).unwrap(),
            "{} should be copied as is",
            file
        );
    }
    assert!(!output.path().join("modes.txt").exists());
    assert!(!gtfs.is_loaded("routes"));
}

#[test]
fn export_serializes_mutated_tables() {
    let gtfs = read_basic();
    gtfs.for_each_mut("routes", |route| {
        if route.get("route_id") == Some("route_0") {
            route.set("route_desc", "New description");
            route.set("temp", serde_json::json!({"key": "value"}));
        }
    })
    .unwrap();

    let output = tempfile::tempdir().unwrap();
    fs::write(output.path().join("stale.txt"), "previous export").unwrap();
    gtfs.export(output.path()).unwrap();
    assert!(!output.path().join("stale.txt").exists());

    let content = fs::read_to_string(output.path().join("routes.txt")).unwrap();
    let header = content.lines().next().unwrap();
    let original = fs::read_to_string("fixtures/basic/routes.txt").unwrap();
    assert_eq!(
        format!("{},temp", original.lines().next().unwrap()),
        header
    );

    let exported = Gtfs::from_path(output.path()).unwrap();
    let route = exported.get_route("route_0").unwrap().unwrap();
    assert_eq!(Some("New description"), route.get("route_desc"));
    assert_eq!(Some(r#"{"key":"value"}"#), route.get("temp"));
    let route_x = exported.get_route("route_x").unwrap().unwrap();
    assert_eq!(Some("\"Route X\""), route_x.get("route_long_name"));
    assert_eq!(Some(""), route_x.get("temp"));
}

#[test]
fn round_trip_keeps_records() {
    let gtfs = read_basic();
    let output = tempfile::tempdir().unwrap();
    for table in ["stops", "trips", "stop_times", "fare_rules", "feed_info"] {
        gtfs.table(table).unwrap();
    }
    gtfs.export(output.path()).unwrap();

    let exported = Gtfs::from_path(output.path()).unwrap();
    for table in ["stops", "trips", "stop_times", "fare_rules", "feed_info"] {
        let before = gtfs.records(table).unwrap();
        let after = exported.records(table).unwrap();
        assert_eq!(before.len(), after.len(), "{}", table);
        for (b, a) in before.iter().zip(&after) {
            for (field, value) in b.iter() {
                assert_eq!(Some(value), a.value(field), "{}.{}", table, field);
            }
        }
    }
}

#[test]
fn export_refuses_source_directory() {
    init_log();
    let parent = tempfile::tempdir().unwrap();
    let source = parent.path().join("feed");
    fs::create_dir(&source).unwrap();
    fs::copy("fixtures/basic/stops.txt", source.join("stops.txt")).unwrap();

    let gtfs = Gtfs::from_path(&source).unwrap();
    assert!(matches!(
        gtfs.export(&source),
        Err(Error::InvalidOutputPath { .. })
    ));
    assert!(matches!(
        gtfs.export(parent.path()),
        Err(Error::InvalidOutputPath { .. })
    ));
    assert!(source.join("stops.txt").exists());
}

#[test]
fn export_writes_loaded_tables_even_when_empty() {
    init_log();
    let gtfs = Gtfs::in_memory();
    gtfs.add_stops([stop("stop_0", "Stop 0")]).unwrap();
    assert_eq!(0, gtfs.count("calendar").unwrap());

    let output = tempfile::tempdir().unwrap();
    gtfs.export(output.path()).unwrap();
    let mut files: Vec<String> = fs::read_dir(output.path())
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    files.sort();
    assert_eq!(vec!["calendar.txt".to_owned(), "stops.txt".to_owned()], files);

    let content = fs::read_to_string(output.path().join("stops.txt")).unwrap();
    let columns = gtfs.schema().columns_of("stops").unwrap().join(",");
    assert_eq!(
        format!("{}\nstop_0,,Stop 0{}\n", columns, ",".repeat(9)),
        content
    );
    let calendar = fs::read_to_string(output.path().join("calendar.txt")).unwrap();
    let columns = gtfs.schema().columns_of("calendar").unwrap().join(",");
    assert_eq!(format!("{}\n", columns), calendar);
}

#[test]
fn reset_table_is_exported_as_header() {
    init_log();
    let gtfs = Gtfs::in_memory();
    gtfs.reset("stops").unwrap();

    let output = tempfile::tempdir().unwrap();
    gtfs.export(output.path()).unwrap();
    let columns = gtfs.schema().columns_of("stops").unwrap().join(",");
    assert_eq!(
        format!("{}\n", columns),
        fs::read_to_string(output.path().join("stops.txt")).unwrap()
    );
}

#[test]
fn unterminated_quote_only_loses_its_row() {
    init_log();
    let gtfs = Gtfs::from_path("fixtures/unterminated").unwrap();
    assert_eq!(3, gtfs.count("stops").unwrap());
    assert_eq!(None, gtfs.get_stop("stop_1").unwrap());
    assert_eq!(
        Some("Stop 2"),
        gtfs.get_stop("stop_2").unwrap().unwrap().get("stop_name")
    );
    assert!(gtfs.get_stop("stop_3").unwrap().is_some());
}

#[test]
fn unterminated_quote_fails_in_strict_mode() {
    init_log();
    let gtfs = GtfsReader::default()
        .strict(true)
        .read_from_path("fixtures/unterminated")
        .unwrap();
    match gtfs.count("stops") {
        Err(Error::MalformedRow { line, .. }) => assert_eq!(3, line),
        other => panic!("unexpected result {:?}", other),
    }
}

#[test]
fn set_waits_for_readers_without_blocking_the_store() {
    use std::sync::mpsc;
    use std::time::Duration;

    init_log();
    let gtfs = Arc::new(read_basic());
    let (started_tx, started_rx) = mpsc::channel();
    let (done_tx, done_rx) = mpsc::channel();

    let reader = {
        let gtfs = Arc::clone(&gtfs);
        let done_tx = done_tx.clone();
        std::thread::spawn(move || {
            let mut routes = 0;
            gtfs.for_each("stops", |_| {
                let _ = started_tx.send(());
                std::thread::sleep(Duration::from_millis(100));
                routes = gtfs.count("routes").unwrap();
            })
            .unwrap();
            done_tx.send(routes).unwrap();
        })
    };
    started_rx.recv().unwrap();
    let writer = {
        let gtfs = Arc::clone(&gtfs);
        std::thread::spawn(move || {
            gtfs.set("stops", Container::empty(&Indexing::single("stop_id")))
                .unwrap();
            done_tx.send(0).unwrap();
        })
    };

    for _ in 0..2 {
        done_rx
            .recv_timeout(Duration::from_secs(10))
            .expect("threads are stuck on each other");
    }
    reader.join().unwrap();
    writer.join().unwrap();
    assert_eq!(0, gtfs.count("stops").unwrap());
}

#[test]
fn set_accepts_agency_with_required_key() {
    let gtfs = read_basic();
    let agencies = Container::from_records(
        &Indexing::single("agency_id"),
        [Record::from_iter([("agency_id", "a1"), ("agency_name", "A1")])],
    )
    .unwrap();
    gtfs.set("agency", agencies).unwrap();
    assert_eq!(1, gtfs.count("agency").unwrap());
    assert_eq!(
        Indexing::optional_single("agency_id"),
        gtfs.table("agency").unwrap().read().indexing()
    );

    let fresh = Gtfs::in_memory();
    fresh
        .set("agency", Container::empty(&Indexing::single("agency_id")))
        .unwrap();
    assert_eq!(0, fresh.count("agency").unwrap());
}

#[test]
fn malformed_rows_are_skipped() {
    init_log();
    let gtfs = Gtfs::from_path("fixtures/malformed").unwrap();
    assert_eq!(2, gtfs.count("stops").unwrap());
    assert_eq!(None, gtfs.get_stop("stop_1").unwrap());
    assert!(gtfs.get_stop("stop_2").unwrap().is_some());
}

#[test]
fn malformed_rows_fail_in_strict_mode() {
    init_log();
    let gtfs = GtfsReader::default()
        .strict(true)
        .read_from_path("fixtures/malformed")
        .unwrap();
    match gtfs.count("stops") {
        Err(Error::MalformedRow {
            file_name,
            line,
            line_in_error,
        }) => {
            assert_eq!("stops.txt", file_name);
            assert_eq!(3, line);
            assert_eq!(4, line_in_error.headers.len());
            assert_eq!(5, line_in_error.values.len());
        }
        other => panic!("unexpected result {:?}", other),
    }
    assert!(!gtfs.is_loaded("stops"));
}

#[test]
fn fixups_repair_rows() {
    init_log();
    let gtfs = GtfsReader::default()
        .strict(true)
        .fixup(
            "stops",
            Regex::new(r",(Some, other stop),").unwrap(),
            ",\"$1\",",
        )
        .read_from_path("fixtures/malformed")
        .unwrap();
    assert_eq!(3, gtfs.count("stops").unwrap());
    let stop = gtfs.get_stop("stop_1").unwrap().unwrap();
    assert_eq!(Some("Some, other stop"), stop.get("stop_desc"));
    assert_eq!(Some("S1"), stop.get("stop_code"));
}

#[test]
fn missing_index_columns() {
    init_log();
    let gtfs = Gtfs::from_path("fixtures/missing_columns").unwrap();
    match gtfs.table("stop_times") {
        Err(Error::MissingIndexColumns { file_name, columns }) => {
            assert_eq!("stop_times.txt", file_name);
            assert_eq!(vec!["stop_sequence".to_owned()], columns);
        }
        other => panic!("unexpected result {:?}", other.map(|_| ())),
    }
    assert!(!gtfs.is_loaded("stop_times"));

    let agency = gtfs.get_agency("").unwrap().unwrap();
    assert_eq!(Some("Only agency"), agency.get("agency_name"));

    let route = gtfs.get_route("route_0").unwrap().unwrap();
    assert!(matches!(
        gtfs.get_agency_of_route(&route),
        Err(Error::MissingForeignKey { .. })
    ));
}

#[test]
fn missing_files_give_empty_tables() {
    let gtfs = Gtfs::from_path("fixtures/missing_columns").unwrap();
    assert_eq!(0, gtfs.count("stops").unwrap());
    assert_eq!(None, gtfs.get_feed_info().unwrap());
    assert!(matches!(
        GtfsReader::default().read_from_path("fixtures/basic/stops.txt"),
        Err(Error::NotADirectory(_))
    ));
}

#[test]
fn hooks() {
    init_log();
    let gtfs = GtfsReader::default()
        .post_import(|table, record| {
            if table == "stops" {
                let id = record.get("stop_id").unwrap_or_default().to_uppercase();
                record.set("stop_id", id);
                record.set("imported", true);
            }
        })
        .pre_export(|table, record| {
            if table == "stops" {
                record.remove("imported");
                record.set("exported", "yes");
            }
        })
        .read_from_path("fixtures/basic")
        .unwrap();

    let stop = gtfs.get_stop("stop_0").unwrap().unwrap();
    assert_eq!(Some("STOP_0"), stop.get("stop_id"), "hooks do not re-index");
    assert_eq!(Some("true".to_owned()), stop.text("imported"));

    let output = tempfile::tempdir().unwrap();
    gtfs.export(output.path()).unwrap();
    let content = fs::read_to_string(output.path().join("stops.txt")).unwrap();
    let header = content.lines().next().unwrap();
    assert!(header.ends_with(",exported"));
    assert!(!header.contains("imported"));

    let stored = gtfs.get_stop("stop_0").unwrap().unwrap();
    assert!(stored.contains("imported"));
    assert!(!stored.contains("exported"));
}

#[test]
fn schema_override() {
    init_log();
    let schema = Schema::gtfs()
        .to_builder()
        .table("modes", &["mode_id", "mode_name"], Indexing::single("mode_id"))
        .without_table("pathways")
        .build()
        .unwrap();
    let gtfs = GtfsReader::default()
        .schema(schema)
        .read_from_path("fixtures/basic")
        .unwrap();

    let tram = gtfs.get("modes", "tram").unwrap().unwrap();
    assert_eq!(Some("Tram"), tram.get("mode_name"));
    assert!(matches!(gtfs.get_pathway("pathway_1"), Err(Error::UnknownTable(_))));

    let output = tempfile::tempdir().unwrap();
    gtfs.export(output.path()).unwrap();
    assert!(output.path().join("modes.txt").exists());
    assert!(!output.path().join("pathways.txt").exists());
}

#[test]
fn schema_json_round_trip() {
    let schema = Schema::gtfs();
    let json = schema.to_json().unwrap();
    assert_eq!(schema, Schema::from_json(&json).unwrap());
}

#[test]
fn tables_introduced_at_runtime() {
    init_log();
    let gtfs = Gtfs::in_memory();
    assert!(matches!(gtfs.table("notes"), Err(Error::UnknownTable(_))));

    let notes = Container::from_records(
        &Indexing::single("note_id"),
        [Record::from_iter([("note_id", "n1"), ("text", "Closed on sundays")])],
    )
    .unwrap();
    gtfs.set("notes", notes).unwrap();
    assert_eq!(Some(&"notes".to_owned()), gtfs.table_names().last());
    assert_eq!(
        Some("Closed on sundays"),
        gtfs.get("notes", "n1").unwrap().unwrap().get("text")
    );
    assert_eq!(
        vec!["note_id".to_owned(), "text".to_owned()],
        gtfs.actual_columns("notes").unwrap()
    );
    assert!(matches!(
        gtfs.set("notes", Container::empty(&Indexing::UnorderedSet)),
        Err(Error::ShapeMismatch { .. })
    ));

    let output = tempfile::tempdir().unwrap();
    gtfs.export(output.path()).unwrap();
    assert_eq!(
        "note_id,text\nn1,Closed on sundays\n",
        fs::read_to_string(output.path().join("notes.txt")).unwrap()
    );

    gtfs.reset("notes").unwrap();
    assert_eq!(0, gtfs.count("notes").unwrap());
}
