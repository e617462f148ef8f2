use std::{path::Path, sync::Mutex};

use geo::{MultiPolygon, Rect, coord};
use ucmap::{
    FieldDef, ID_CASE, ID_CROP, ID_METEO, ID_SOIL, NODATA, NoProgress, Progress, ShapeLayer, UcmBuilder,
    UcmError, UnitsDb, collect_units, export_units, repair_id_case,
};

fn rect(x0: f64, y0: f64, x1: f64, y1: f64) -> MultiPolygon<f64> {
    MultiPolygon(vec![Rect::new(coord! { x: x0, y: y0 }, coord! { x: x1, y: y1 }).to_polygon()])
}

fn write_layer<const N: usize>(path: &Path, fields: Vec<FieldDef>, rows: &[(MultiPolygon<f64>, [&str; N])]) -> ShapeLayer {
    let mut layer = ShapeLayer::create(path, fields).unwrap();
    for (polygon, values) in rows {
        layer.push_record(polygon, values).unwrap();
    }
    layer.save().unwrap();
    ShapeLayer::open(path).unwrap()
}

#[derive(Default)]
struct Stages(Mutex<Vec<String>>);

impl Progress for Stages {
    fn start(&self, label: &str, _: u64) { self.0.lock().unwrap().push(label.to_string()) }
    fn set_text(&self, label: &str) { self.0.lock().unwrap().push(label.to_string()) }
    fn close(&self) { self.0.lock().unwrap().push("close".into()) }
}

/// Two crop polygons; the second has no meteo cell under it.
fn two_polygon_inputs(dir: &Path) -> (ShapeLayer, ShapeLayer, ShapeLayer) {
    let crop = write_layer(&dir.join("crop.shp"), vec![FieldDef::character("CROP", 5)], &[
        (rect(0.0, 0.0, 100.0, 100.0), ["C1"]),
        (rect(100.0, 0.0, 200.0, 100.0), ["C2"]),
    ]);
    let meteo = write_layer(&dir.join("meteo.shp"), vec![FieldDef::character("METEO", 5)], &[
        (rect(0.0, 0.0, 100.0, 80.0), ["M1"]),
    ]);
    let soil = write_layer(&dir.join("soil.shp"), vec![FieldDef::character("SOIL", 5)], &[
        (rect(0.0, 0.0, 100.0, 100.0), ["S1"]),
        (rect(100.0, 0.0, 200.0, 100.0), ["S2"]),
    ]);
    (crop, soil, meteo)
}

#[test]
fn polygon_without_meteo_is_dropped() {
    let dir = tempfile::tempdir().unwrap();
    let (crop, soil, meteo) = two_polygon_inputs(dir.path());
    let output = dir.path().join("out/ucm.shp");

    let ucm = UcmBuilder::new("CROP", "SOIL", "METEO", 10.0)
        .build(&crop, &soil, &meteo, &output, &NoProgress)
        .unwrap();
    assert_eq!(ucm.record_count(), 1);

    let reopened = ShapeLayer::open(&output).unwrap();
    assert_eq!(reopened.record_count(), 1);
    for name in [ID_CASE, ID_CROP, ID_SOIL, ID_METEO] {
        assert!(reopened.exist_field(name), "{name} missing");
    }

    let read = |name: &str| reopened.read_string(0, &reopened.field_index(name).unwrap()).unwrap();
    assert_eq!(read(ID_CASE), "MM1SS1CC1");
    assert_eq!(read(ID_CROP), "C1");
    assert_eq!(read(ID_SOIL), "S1");
    assert_eq!(read(ID_METEO), "M1");

    // The crop input is untouched.
    assert_eq!(ShapeLayer::open(&dir.path().join("crop.shp")).unwrap().fields().len(), 1);
}

#[test]
fn stages_are_reported_in_order() {
    let dir = tempfile::tempdir().unwrap();
    let (crop, soil, meteo) = two_polygon_inputs(dir.path());
    let stages = Stages::default();

    UcmBuilder::new("CROP", "SOIL", "METEO", 10.0)
        .build(&crop, &soil, &meteo, &dir.path().join("ucm.shp"), &stages)
        .unwrap();

    let stages = stages.0.into_inner().unwrap();
    assert_eq!(stages.len(), 9);
    assert_eq!(stages[0], "[1/8] Rasterize crop (reference)...");
    assert_eq!(stages[7], "[8/8] Write UCM...");
    assert_eq!(stages[8], "close");
}

#[test]
fn duplicate_cases_export_one_row() {
    let dir = tempfile::tempdir().unwrap();
    let crop = write_layer(
        &dir.path().join("crop.shp"),
        vec![FieldDef::character(ID_CROP, 5), FieldDef::numeric("HA", 10, 2)],
        &[
            (rect(0.0, 0.0, 100.0, 100.0), ["C1", "1.5"]),
            (rect(100.0, 0.0, 200.0, 100.0), ["C2", "2"]),
            (rect(200.0, 0.0, 300.0, 100.0), ["C1", "4"]),
        ],
    );
    let soil = write_layer(&dir.path().join("soil.shp"), vec![FieldDef::numeric("SOIL", 4, 0)], &[
        (rect(0.0, 0.0, 300.0, 100.0), ["7"]),
    ]);
    let meteo = write_layer(&dir.path().join("meteo.shp"), vec![FieldDef::numeric("CELL", 6, 0)], &[
        (rect(0.0, 0.0, 300.0, 100.0), ["1001"]),
    ]);

    let ucm = UcmBuilder::new(ID_CROP, "SOIL", "CELL", 20.0)
        .build(&crop, &soil, &meteo, &dir.path().join("ucm.shp"), &NoProgress)
        .unwrap();
    assert_eq!(ucm.record_count(), 3);

    let units = collect_units(&ucm).unwrap();
    assert_eq!(units.len(), 2);
    assert_eq!(units[0].id_case, "M1001S7CC1");
    assert_eq!(units[0].area_ha, 1.5);
    assert_eq!(units[1].id_case, "M1001S7CC2");

    let mut db = UnitsDb::open(&dir.path().join("units.db")).unwrap();
    assert_eq!(export_units(&ucm, &mut db).unwrap(), 2);
    assert_eq!(db.read_units().unwrap(), units);
}

#[test]
fn repair_of_a_built_map_changes_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let (crop, soil, meteo) = two_polygon_inputs(dir.path());
    let output = dir.path().join("ucm.shp");
    UcmBuilder::new("CROP", "SOIL", "METEO", 10.0)
        .build(&crop, &soil, &meteo, &output, &NoProgress)
        .unwrap();

    for _ in 0..2 {
        let mut ucm = ShapeLayer::open(&output).unwrap();
        assert_eq!(repair_id_case(&mut ucm, ID_CROP, ID_SOIL, ID_METEO).unwrap(), 0);
        assert_eq!(ucm.compact().unwrap(), 0);
        assert_eq!(ucm.read_string(0, &ucm.field_index(ID_CASE).unwrap()).unwrap(), "MM1SS1CC1");
    }
}

#[test]
fn repair_drops_records_that_lost_an_identifier() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("ucm.shp");
    write_layer(
        &path,
        vec![
            FieldDef::character(ID_CROP, 5),
            FieldDef::character(ID_SOIL, 5),
            FieldDef::character(ID_METEO, 5),
            FieldDef::character(ID_CASE, 20),
        ],
        &[
            (rect(0.0, 0.0, 1.0, 1.0), ["C1", "S1", "M1", ""]),
            (rect(1.0, 0.0, 2.0, 1.0), ["C2", NODATA, "M1", "MM1SS1CC2"]),
        ],
    );

    let mut ucm = ShapeLayer::open(&path).unwrap();
    assert_eq!(repair_id_case(&mut ucm, ID_CROP, ID_SOIL, ID_METEO).unwrap(), 1);
    ucm.compact().unwrap();

    let reopened = ShapeLayer::open(&path).unwrap();
    assert_eq!(reopened.record_count(), 1);
    assert_eq!(reopened.read_string(0, &reopened.field_index(ID_CASE).unwrap()).unwrap(), "MM1SS1CC1");
}

#[test]
fn missing_overlay_field_fails_the_zonal_stage() {
    let dir = tempfile::tempdir().unwrap();
    let (crop, soil, meteo) = two_polygon_inputs(dir.path());

    let err = UcmBuilder::new("CROP", "SOIL_CODE", "METEO", 10.0)
        .build(&crop, &soil, &meteo, &dir.path().join("ucm.shp"), &NoProgress)
        .unwrap_err();
    assert!(matches!(err, UcmError::ZonalStatistic(_)));
    assert!(err.to_string().starts_with("ZonalStatisticsShape: "));
}

#[test]
fn missing_crop_field_is_rejected_before_cloning() {
    let dir = tempfile::tempdir().unwrap();
    let (crop, soil, meteo) = two_polygon_inputs(dir.path());
    let output = dir.path().join("ucm.shp");

    let err = UcmBuilder::new("CROP_ID", "SOIL", "METEO", 10.0)
        .build(&crop, &soil, &meteo, &output, &NoProgress)
        .unwrap_err();
    assert!(matches!(err, UcmError::Schema(_)));
    assert!(!output.exists());
}

#[test]
fn building_onto_the_crop_path_keeps_the_crop() {
    let dir = tempfile::tempdir().unwrap();
    let (crop, soil, meteo) = two_polygon_inputs(dir.path());
    let builder = UcmBuilder::new("CROP", "SOIL", "METEO", 10.0);

    for output in [dir.path().join("crop.shp"), dir.path().join("./crop.shp"), dir.path().join("crop")] {
        let err = builder.build(&crop, &soil, &meteo, &output, &NoProgress).unwrap_err();
        assert!(matches!(err, UcmError::LayerOpen { .. }), "{}: {err}", output.display());

        let reopened = ShapeLayer::open(&dir.path().join("crop.shp")).unwrap();
        assert_eq!(reopened.record_count(), 2);
        assert_eq!(reopened.fields().len(), 1);
    }
}

#[test]
fn numeric_id_meteo_on_the_crop_is_replaced_by_text_ids() {
    let dir = tempfile::tempdir().unwrap();
    let (_, soil, meteo) = two_polygon_inputs(dir.path());
    let crop = write_layer(
        &dir.path().join("crop_meteo.shp"),
        vec![FieldDef::character("CROP", 5), FieldDef::numeric(ID_METEO, 6, 0)],
        &[
            (rect(0.0, 0.0, 100.0, 100.0), ["C1", "3"]),
            (rect(100.0, 0.0, 200.0, 100.0), ["C2", "4"]),
        ],
    );

    let ucm = UcmBuilder::new("CROP", "SOIL", "METEO", 10.0)
        .build(&crop, &soil, &meteo, &dir.path().join("ucm.shp"), &NoProgress)
        .unwrap();
    assert_eq!(ucm.record_count(), 1);
    assert_eq!(ucm.read_string(0, &ucm.field_index(ID_METEO).unwrap()).unwrap(), "M1");
    assert_eq!(ucm.read_string(0, &ucm.field_index(ID_CASE).unwrap()).unwrap(), "MM1SS1CC1");
}

#[test]
fn narrow_id_case_on_the_crop_holds_full_cases() {
    let dir = tempfile::tempdir().unwrap();
    let (_, soil, meteo) = two_polygon_inputs(dir.path());
    let crop = write_layer(
        &dir.path().join("crop_case.shp"),
        vec![FieldDef::character("CROP", 5), FieldDef::character(ID_CASE, 4)],
        &[
            (rect(0.0, 0.0, 100.0, 100.0), ["C1", "OLD"]),
            (rect(100.0, 0.0, 200.0, 100.0), ["C2", "OLD"]),
        ],
    );
    let output = dir.path().join("ucm.shp");

    UcmBuilder::new("CROP", "SOIL", "METEO", 10.0)
        .build(&crop, &soil, &meteo, &output, &NoProgress)
        .unwrap();

    let reopened = ShapeLayer::open(&output).unwrap();
    let case = reopened.field_index(ID_CASE).unwrap();
    assert_eq!(reopened.field_def(&case).unwrap().width, 20);
    assert_eq!(reopened.read_string(0, &case).unwrap(), "MM1SS1CC1");
}

#[test]
fn existing_id_crop_is_kept_when_another_field_names_the_crop() {
    let dir = tempfile::tempdir().unwrap();
    let (_, soil, meteo) = two_polygon_inputs(dir.path());
    let crop = write_layer(
        &dir.path().join("crop_ids.shp"),
        vec![FieldDef::character("CROP", 5), FieldDef::character(ID_CROP, 5)],
        &[
            (rect(0.0, 0.0, 100.0, 100.0), ["C1", "X"]),
            (rect(100.0, 0.0, 200.0, 100.0), ["C2", "Y"]),
        ],
    );
    let output = dir.path().join("ucm.shp");

    UcmBuilder::new("CROP", "SOIL", "METEO", 10.0)
        .build(&crop, &soil, &meteo, &output, &NoProgress)
        .unwrap();

    let reopened = ShapeLayer::open(&output).unwrap();
    assert_eq!(reopened.record_count(), 1);
    assert_eq!(reopened.read_string(0, &reopened.field_index(ID_CROP).unwrap()).unwrap(), "X");
    assert_eq!(reopened.read_string(0, &reopened.field_index(ID_CASE).unwrap()).unwrap(), "MM1SS1CC1");
}

#[test]
fn failed_case_write_still_closes_progress() {
    let dir = tempfile::tempdir().unwrap();
    let (crop, soil, meteo) = two_polygon_inputs(dir.path());
    let stages = Stages::default();

    let err = UcmBuilder::new("CROP", "SOIL", "METEO", 10.0)
        .with_id_case_width(0)
        .build(&crop, &soil, &meteo, &dir.path().join("ucm.shp"), &stages)
        .unwrap_err();
    assert!(matches!(err, UcmError::Schema(_)));

    let stages = stages.0.into_inner().unwrap();
    assert_eq!(stages[stages.len() - 2], "[8/8] Write UCM...");
    assert_eq!(stages.last().map(String::as_str), Some("close"));
}
