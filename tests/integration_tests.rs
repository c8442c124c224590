use std::io::Write;
use std::path::Path;

use asteroid_app::error::{HandlerError, Stage};
use asteroid_app::event::{Event, MassesDataset, RemoteDataset};
use asteroid_app::fetch::BasicClient;
use asteroid_app::handlers::{download_benner, download_exoplanets, parse_masses, run_all};
use asteroid_app::masses::{MassError, MassPolicy};
use asteroid_app::store::MemoryStore;
use tempfile::{NamedTempFile, TempDir};

const BUCKET: &str = "asteroid-files";

const BENNER_REPORT: &str = "\
Delta-v for spacecraft rendezvous
Rank  Percentile  Name  Designation  dv  H  a  e  i
--------------------------------------------------
  1   99.00  (1) Ceres            1      -       5.2  3.34  2.77  0.076  10.6
  this line is not a ranked row
  2   98.50      2001 FO32      6.85  18.2  1.60  0.380  39.1
";

const MASS_TABLE: &str = "\
Ceres 123.45 kg
Ceres 200.00 kg
Vesta 50.0 kg
325.45 kg
";

fn source_file(contents: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(contents.as_bytes()).unwrap();
    file
}

fn remote(path: &Path, filename: &str) -> Option<RemoteDataset> {
    Some(RemoteDataset {
        url: path.to_str().unwrap().to_string(),
        filename: filename.to_string(),
    })
}

fn masses(path: &Path) -> Option<MassesDataset> {
    Some(MassesDataset {
        filename: "massd.json".to_string(),
        path: path.to_path_buf(),
        policy: MassPolicy::First,
    })
}

fn empty_event() -> Event {
    Event {
        bucket_name: BUCKET.to_string(),
        benner: None,
        exoplanets: None,
        masses: None,
    }
}

fn missing_path(dir: &TempDir) -> std::path::PathBuf {
    dir.path().join("not-there.txt")
}

#[tokio::test]
async fn test_benner_report_is_stored_as_csv() {
    let report = source_file(BENNER_REPORT);
    let event = Event {
        benner: remote(report.path(), "benner.csv"),
        ..empty_event()
    };
    let store = MemoryStore::new();

    let ack = download_benner(&event, &BasicClient::new(), &store)
        .await
        .unwrap();
    assert_eq!(ack.bucket, BUCKET);
    assert_eq!(ack.key, "benner.csv");

    let stored = store.get(BUCKET, "benner.csv").unwrap();
    assert_eq!(stored.content_type, "text/csv");
    assert_eq!(
        stored.body.as_ref(),
        b"pdes,dv,H,a,e,i\r\n\
          1 -,5.2,3.34,2.77,0.076,10.6\r\n\
          2001 FO32,6.85,18.2,1.60,0.380,39.1\r\n"
            .as_slice()
    );
}

#[tokio::test]
async fn test_benner_without_dataset_is_an_event_error() {
    let store = MemoryStore::new();

    let err = download_benner(&empty_event(), &BasicClient::new(), &store)
        .await
        .unwrap_err();
    assert!(matches!(err, HandlerError::MissingDataset(_)));
    assert_eq!(err.stage(), Stage::Event);
    assert!(store.is_empty());
}

#[tokio::test]
async fn test_exoplanet_bytes_are_forwarded_unmodified() {
    let catalog = "koi_sma,kepoi_name\n0.0853,K00752.01\n";
    let source = source_file(catalog);
    let event = Event {
        exoplanets: remote(source.path(), "exoplanet.csv"),
        ..empty_event()
    };
    let store = MemoryStore::new();

    download_exoplanets(&event, &BasicClient::new(), &store)
        .await
        .unwrap();

    let stored = store.get(BUCKET, "exoplanet.csv").unwrap();
    assert_eq!(stored.body.as_ref(), catalog.as_bytes());
}

#[tokio::test]
async fn test_exoplanet_download_and_upload_failures_differ() {
    let dir = tempfile::tempdir().unwrap();
    let unreachable = Event {
        exoplanets: remote(&missing_path(&dir), "exoplanet.csv"),
        ..empty_event()
    };
    let download_err =
        download_exoplanets(&unreachable, &BasicClient::new(), &MemoryStore::new())
            .await
            .unwrap_err();

    let source = source_file("koi_sma\n");
    let reachable = Event {
        exoplanets: remote(source.path(), "exoplanet.csv"),
        ..empty_event()
    };
    let upload_err = download_exoplanets(
        &reachable,
        &BasicClient::new(),
        &MemoryStore::failing("access denied"),
    )
    .await
    .unwrap_err();

    assert!(matches!(download_err, HandlerError::Download { .. }));
    assert!(matches!(upload_err, HandlerError::Upload { .. }));
    assert_eq!(download_err.stage(), Stage::Download);
    assert_eq!(upload_err.stage(), Stage::Upload);
    assert_ne!(download_err.stage().message(), upload_err.stage().message());
}

#[tokio::test]
async fn test_mass_table_is_stored_as_json() {
    let table = source_file(MASS_TABLE);
    let event = Event {
        masses: masses(table.path()),
        ..empty_event()
    };
    let store = MemoryStore::new();

    let ack = parse_masses(&event, &store).await.unwrap();
    assert_eq!(ack.key, "massd.json");

    let stored = store.get(BUCKET, "massd.json").unwrap();
    assert_eq!(stored.content_type, "application/json");
    assert_eq!(
        stored.body.as_ref(),
        br#"{"Ceres": 123.45, "Vesta": 50.0}"#.as_slice()
    );
}

#[tokio::test]
async fn test_mass_table_without_summary_line_fails_before_upload() {
    let table = source_file("Ceres 123.45 kg\nVesta 50.0 kg\n");
    let event = Event {
        masses: masses(table.path()),
        ..empty_event()
    };
    let store = MemoryStore::new();

    let err = parse_masses(&event, &store).await.unwrap_err();
    assert!(matches!(
        err,
        HandlerError::Masses(MassError::MissingUnnamedEntry)
    ));
    assert_eq!(err.stage(), Stage::Transform);
    assert!(store.is_empty());
}

#[tokio::test]
async fn test_mass_table_open_failure_is_preserved() {
    let dir = tempfile::tempdir().unwrap();
    let event = Event {
        masses: masses(&missing_path(&dir)),
        ..empty_event()
    };

    let err = parse_masses(&event, &MemoryStore::new()).await.unwrap_err();
    assert!(matches!(err, HandlerError::Masses(MassError::Open { .. })));
    assert_eq!(err.stage(), Stage::Read);
    assert_ne!(err.stage().message(), Stage::Download.message());
}

#[tokio::test]
async fn test_mass_upload_failure_is_reported_as_upload() {
    let table = source_file(MASS_TABLE);
    let event = Event {
        masses: masses(table.path()),
        ..empty_event()
    };

    let err = parse_masses(&event, &MemoryStore::failing("bucket is gone"))
        .await
        .unwrap_err();
    assert!(matches!(err, HandlerError::Masses(MassError::Upload { .. })));
    assert_eq!(err.stage(), Stage::Upload);
}

#[tokio::test]
async fn test_run_all_collects_acks_in_order() {
    let report = source_file(BENNER_REPORT);
    let catalog = source_file("koi_sma\n");
    let table = source_file(MASS_TABLE);
    let event = Event {
        bucket_name: BUCKET.to_string(),
        benner: remote(report.path(), "benner.csv"),
        exoplanets: remote(catalog.path(), "exoplanet.csv"),
        masses: masses(table.path()),
    };
    let store = MemoryStore::new();

    let acks = run_all(&event, &BasicClient::new(), &store).await.unwrap();

    let keys: Vec<_> = acks.iter().map(|ack| ack.key.as_str()).collect();
    assert_eq!(keys, vec!["benner.csv", "exoplanet.csv", "massd.json"]);
    assert_eq!(store.len(), 3);
}

#[tokio::test]
async fn test_run_all_reports_first_failure_but_runs_the_rest() {
    let dir = tempfile::tempdir().unwrap();
    let catalog = source_file("koi_sma\n");
    let table = source_file("Ceres 1.0 kg\n");
    let event = Event {
        bucket_name: BUCKET.to_string(),
        benner: remote(&missing_path(&dir), "benner.csv"),
        exoplanets: remote(catalog.path(), "exoplanet.csv"),
        masses: masses(table.path()),
    };
    let store = MemoryStore::new();

    let err = run_all(&event, &BasicClient::new(), &store)
        .await
        .unwrap_err();

    assert_eq!(err.stage(), Stage::Download);
    // exoplanets still ran; masses failed on its own
    assert!(store.get(BUCKET, "exoplanet.csv").is_some());
    assert!(store.get(BUCKET, "massd.json").is_none());
}

#[tokio::test]
async fn test_run_all_with_no_datasets_fails() {
    let err = run_all(&empty_event(), &BasicClient::new(), &MemoryStore::new())
        .await
        .unwrap_err();
    assert!(matches!(err, HandlerError::NothingRun(_)));
}
