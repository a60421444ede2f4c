//! End-to-end runs of the engine against temporary source and library trees.

use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use showart_core::{
    run_pipeline_with_control, run_stage, run_stage_with_control, EngineControl, EngineOptions, Event,
    EventKind, ExtractError, Extractor, RetryPolicy, Stage, StageStatus,
};
use tempfile::{tempdir, TempDir};
use zip::write::SimpleFileOptions;

/// Unpacks `.zip` archives in-process so the tests do not depend on 7-Zip.
#[derive(Debug)]
struct ZipExtractor;

impl Extractor for ZipExtractor {
    fn is_available(&self) -> bool {
        true
    }

    fn extract(&self, archive: &Path, destination: &Path) -> Result<(), ExtractError> {
        let file = File::open(archive)?;
        zip::ZipArchive::new(file)
            .and_then(|mut zip| zip.extract(destination))
            .map_err(|err| ExtractError::Failed {
                code: Some(2),
                stderr: err.to_string(),
            })
    }
}

/// Fails for archives with the given base name, extracts everything else.
#[derive(Debug)]
struct FailingFor(&'static str);

impl Extractor for FailingFor {
    fn is_available(&self) -> bool {
        true
    }

    fn extract(&self, archive: &Path, destination: &Path) -> Result<(), ExtractError> {
        if archive.file_stem().and_then(|s| s.to_str()) == Some(self.0) {
            return Err(ExtractError::Failed {
                code: Some(2),
                stderr: "ERROR: Can not open the file as archive".to_string(),
            });
        }
        ZipExtractor.extract(archive, destination)
    }
}

struct Fixture {
    source: TempDir,
    target: TempDir,
}

impl Fixture {
    fn new(shows: &[&str]) -> Self {
        let fixture = Self {
            source: tempdir().unwrap(),
            target: tempdir().unwrap(),
        };
        for show in shows {
            fs::create_dir_all(fixture.show(show)).unwrap();
        }
        fixture
    }

    fn options(&self) -> EngineOptions {
        EngineOptions::new(self.source.path(), vec![self.target.path().to_path_buf()])
    }

    fn show(&self, name: &str) -> PathBuf {
        self.target.path().join(name)
    }

    fn src(&self, name: &str) -> PathBuf {
        self.source.path().join(name)
    }

    fn write_zip(&self, name: &str, entries: &[&str]) -> PathBuf {
        let path = self.src(name);
        let mut writer = zip::ZipWriter::new(File::create(&path).unwrap());
        for entry in entries {
            writer.start_file(*entry, SimpleFileOptions::default()).unwrap();
            writer.write_all(entry.as_bytes()).unwrap();
        }
        writer.finish().unwrap();
        path
    }
}

fn touch(path: &Path, contents: &[u8]) {
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, contents).unwrap();
}

fn control() -> EngineControl {
    EngineControl::new()
        .with_extractor(ZipExtractor)
        .with_retry(RetryPolicy::immediate(5))
}

#[test]
fn scenario_a_archive_is_extracted_and_pruned() {
    let fx = Fixture::new(&["South Park (1997)"]);
    let archive = fx.write_zip(
        "South Park (1997).zip",
        &["South Park (1997).jpg", "S01E01.png", "Extras/still.JPEG", "readme.txt", "Extras/info.nfo"],
    );
    fx.write_zip("Unrelated (2001).zip", &["a.jpg"]);

    let cb = |_: Stage, _: EventKind, _: &Path, _: &str| {};
    let report = run_stage_with_control(Stage::Extract, &fx.options(), &control(), &cb).unwrap();

    assert_eq!(report.status, StageStatus::Completed);
    assert!(report.errors.is_empty(), "{:?}", report.errors);
    assert!(!archive.exists());
    assert!(fx.src("Unrelated (2001).zip").exists());

    let out = fx.src("South Park (1997)");
    assert!(out.join("South Park (1997).jpg").exists());
    assert!(out.join("S01E01.png").exists());
    assert!(out.join("Extras").join("still.JPEG").exists());
    assert!(!out.join("readme.txt").exists());
    assert!(!out.join("Extras").join("info.nfo").exists());
}

#[test]
fn failed_extraction_leaves_archive_and_continues() {
    let fx = Fixture::new(&["Dark (2017)", "Loki (2021)"]);
    let broken = fx.write_zip("Dark (2017).zip", &["poster.jpg"]);
    let good = fx.write_zip("Loki (2021).zip", &["Loki (2021).jpg", "notes.txt"]);

    let control = EngineControl::new()
        .with_extractor(FailingFor("Dark (2017)"))
        .with_retry(RetryPolicy::immediate(5));
    let cb = |_: Stage, _: EventKind, _: &Path, _: &str| {};
    let report = run_stage_with_control(Stage::Extract, &fx.options(), &control, &cb).unwrap();

    assert!(broken.exists());
    assert!(!good.exists());
    assert!(fx.src("Loki (2021)").join("Loki (2021).jpg").exists());
    assert!(!fx.src("Loki (2021)").join("notes.txt").exists());
    assert_eq!(report.changed, 1);
    assert_eq!(report.errors.len(), 1);
    assert!(report.errors[0].contains("Can not open the file as archive"));
}

#[test]
fn scenario_b_loose_season_poster_overwrites_library_copy() {
    let fx = Fixture::new(&["Loki (2021)"]);
    touch(&fx.src("Loki (2021) - Season 1.jpg"), b"new poster");
    let existing = fx.show("Loki (2021)").join("season01-poster.jpg");
    touch(&existing, b"stale poster that is longer than the new one");

    let cb = |_: Stage, _: EventKind, _: &Path, _: &str| {};
    let report = run_stage(Stage::Posters, &fx.options(), &cb).unwrap();

    assert_eq!(report.changed, 1);
    assert!(!fx.src("Loki (2021) - Season 1.jpg").exists());
    assert_eq!(fs::read(&existing).unwrap(), b"new poster");
}

#[test]
fn scenario_c_thumbnail_is_renamed_then_relocated() {
    let fx = Fixture::new(&["Show (2020)"]);
    touch(&fx.show("Show (2020)").join("Season 01").join("S01E07 - Pinkeye.mkv"), b"");
    touch(&fx.src("Show (2020)").join("S01E07 - Pinkeye.jpg"), b"thumb");

    let cb = |_: Stage, _: EventKind, _: &Path, _: &str| {};
    run_stage(Stage::EpisodeThumbs, &fx.options(), &cb).unwrap();
    let renamed = fx.src("Show (2020)").join("S01E07 - Pinkeye-thumb.jpg");
    assert!(renamed.exists());
    assert!(!fx.src("Show (2020)").join("S01E07 - Pinkeye.jpg").exists());

    let report = run_stage(Stage::Relocate, &fx.options(), &cb).unwrap();
    assert_eq!(report.changed, 1);
    assert!(fx
        .show("Show (2020)")
        .join("Season 01")
        .join("S01E07 - Pinkeye-thumb.jpg")
        .exists());
    assert!(!fx.src("Show (2020)").exists());
}

#[test]
fn scenario_d_unmatched_thumbnail_is_reported() {
    let fx = Fixture::new(&["Show (2020)"]);
    touch(&fx.show("Show (2020)").join("Season 01").join("S01E07 - Pinkeye.mkv"), b"");
    let image = fx.src("Show (2020)").join("S01E09 - Missing.jpg");
    touch(&image, b"thumb");

    let events = Mutex::new(Vec::new());
    let cb = |stage: Stage, kind: EventKind, path: &Path, detail: &str| {
        events.lock().unwrap().push(Event::new(stage, kind, path, detail));
    };
    let report = run_stage(Stage::EpisodeThumbs, &fx.options(), &cb).unwrap();

    assert!(image.exists());
    assert_eq!(report.unrecognized, 1);
    let events = events.into_inner().unwrap();
    let miss = events
        .iter()
        .find(|e| e.kind == EventKind::EpisodeKeyNotFound)
        .expect("miss reported");
    assert_eq!(miss.path, image);
    assert!(miss.detail.contains("key not found"));
}

#[test]
fn full_pipeline_is_idempotent() {
    let fx = Fixture::new(&["South Park (1997)", "Loki (2021)"]);
    let south_park = fx.show("South Park (1997)");
    touch(&south_park.join("Season 01").join("S01E01 - Cartman Gets an Anal Probe.mkv"), b"");
    fs::create_dir(south_park.join("Specials")).unwrap();
    fx.write_zip(
        "South Park (1997).zip",
        &[
            "South Park (1997).jpg",
            "South Park (1997) - Season 1.jpg",
            "South Park (1997) - Season 0.png",
            "fanart - Backdrop.png",
            "s01 e01.jpg",
            "readme.txt",
        ],
    );
    touch(&fx.src("Loki (2021) - Backdrop.jpg"), b"backdrop");
    touch(&fx.src("Loki (2021).jpg"), b"poster");

    let cb = |_: Stage, _: EventKind, _: &Path, _: &str| {};
    let control = control();
    let first = run_pipeline_with_control(&fx.options(), &control, &cb).unwrap();
    assert_eq!(first.len(), Stage::ALL.len());
    for report in &first {
        assert!(report.errors.is_empty(), "{}: {:?}", report.stage, report.errors);
    }

    assert!(south_park.join("folder.jpg").exists());
    assert!(south_park.join("season01-poster.jpg").exists());
    assert!(south_park.join("season-specials-poster.png").exists());
    assert!(south_park.join("backdrop.png").exists());
    assert!(south_park
        .join("Season 01")
        .join("S01E01 - Cartman Gets an Anal Probe-thumb.jpg")
        .exists());
    assert!(fx.show("Loki (2021)").join("backdrop.jpg").exists());
    assert!(fx.show("Loki (2021)").join("folder.jpg").exists());
    assert!(!fx.src("South Park (1997)").exists());
    assert!(!fx.src("South Park (1997).zip").exists());

    let second = run_pipeline_with_control(&fx.options(), &control, &cb).unwrap();
    for report in &second {
        assert_eq!(report.changed, 0, "{}", report.stage);
        assert!(report.errors.is_empty(), "{}: {:?}", report.stage, report.errors);
    }
    assert_eq!(second[0].status, StageStatus::NoArchives);
}

#[test]
fn relocation_without_season_folder_keeps_file() {
    let fx = Fixture::new(&["Show (2020)"]);
    let thumb = fx.src("Show (2020)").join("S02E01 - Later-thumb.jpg");
    touch(&thumb, b"thumb");

    let cb = |_: Stage, _: EventKind, _: &Path, _: &str| {};
    let report = run_stage(Stage::Relocate, &fx.options(), &cb).unwrap();

    assert!(thumb.exists());
    assert_eq!(report.errors.len(), 1);
    assert!(report.errors[0].contains("cannot determine destination"));
}

#[test]
fn no_targets_and_no_archives_are_outcomes() {
    let fx = Fixture::new(&[]);
    let cb = |_: Stage, _: EventKind, _: &Path, _: &str| {};
    let control = control();

    for stage in Stage::ALL {
        let report = run_stage_with_control(stage, &fx.options(), &control, &cb).unwrap();
        assert_eq!(report.status, StageStatus::NoTargets);
        assert!(report.errors.is_empty());
    }

    fs::create_dir(fx.show("Loki (2021)")).unwrap();
    let report = run_stage_with_control(Stage::Extract, &fx.options(), &control, &cb).unwrap();
    assert_eq!(report.status, StageStatus::NoArchives);

    fx.write_zip("Other (1999).zip", &["x.jpg"]);
    let report = run_stage_with_control(Stage::Extract, &fx.options(), &control, &cb).unwrap();
    assert_eq!(report.status, StageStatus::NoMatches);
    assert!(fx.src("Other (1999).zip").exists());
}
