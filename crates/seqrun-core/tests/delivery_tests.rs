mod common;

use std::fs;
use std::path::Path;
use tempfile::tempdir;

use common::{touch, write_pre_casava_tree, write_run_info, FC_ID, FLOWCELL};
use seqrun_core::layout::DeliveryRoot;
use seqrun_core::scanner::WalkOptions;
use seqrun_core::transfer::{CopyTransfer, PlannedAction};
use seqrun_core::{
    AppConfig, DeliveryEngine, DeliveryRequest, Field, FieldValue, FlowcellTable, LaneInfo,
    LayoutConvention, LayoutTransformer, Row, SampleInfo, SilentReporter,
};

fn config_for(root: &Path) -> AppConfig {
    AppConfig {
        archive_root: root.join("archive").to_string_lossy().into_owned(),
        production_root: root.join("production").to_string_lossy().into_owned(),
        project_root: root.join("projects").to_string_lossy().into_owned(),
        ..Default::default()
    }
}

fn list(value: Option<FieldValue>) -> Vec<String> {
    match value {
        Some(FieldValue::List(items)) => items,
        other => panic!("expected a list, got {:?}", other),
    }
}

#[test]
fn test_collect_files_attributes_pre_casava_output() {
    let tmp = tempdir().unwrap();
    let production = tmp.path().join("production");
    let descriptor = write_run_info(&production);
    let fc_dir = write_pre_casava_tree(&production);

    let fc = FlowcellTable::open(&descriptor).unwrap().unwrap();
    let collected = fc
        .collect_files(&fc_dir, None, &WalkOptions::default())
        .unwrap();

    assert_eq!(collected.search_root(), Some(fc_dir.as_path()));
    assert_eq!(
        list(collected.get_entry("1_TTAGGC", Field::Files).unwrap()),
        vec![
            fc_dir.join("1_120829_AA001AAAXX_nophix_10_1_fastq.txt").to_string_lossy().into_owned(),
            fc_dir.join("1_120829_AA001AAAXX_nophix_10_2_fastq.txt").to_string_lossy().into_owned(),
        ]
    );
    assert_eq!(
        list(collected.get_entry("1_TTAGGC", Field::Results).unwrap()),
        vec![fc_dir
            .join("1_120829_AA001AAAXX_nophix_10-sort-dup")
            .join("1_120829_AA001AAAXX_nophix_10-sort-dup.bam")
            .to_string_lossy()
            .into_owned()]
    );
    assert_eq!(
        list(collected.get_entry("2_ATCACG", Field::Files).unwrap()).len(),
        1
    );
    assert_eq!(collected.lane_files_for("1").len(), 1);
    assert!(collected.lane_files_for("1")[0].ends_with("nophix.bc_metrics"));
    assert!(collected.lane_files_for("2")[0].ends_with("unmatched_1_fastq.txt"));

    // Every attributed file lives in exactly one row.
    let mut attributed: Vec<&String> = collected
        .iter()
        .flat_map(|r| r.sample.files.iter().chain(r.sample.results.iter()))
        .collect();
    let total = attributed.len();
    attributed.sort();
    attributed.dedup();
    assert_eq!(attributed.len(), total);
    assert_eq!(total, 4);

    // The source table is untouched.
    assert!(fc.iter().all(|r| r.sample.files.is_empty()));
}

#[test]
fn test_collect_files_for_one_project() {
    let tmp = tempdir().unwrap();
    let production = tmp.path().join("production");
    let descriptor = write_run_info(&production);
    let fc_dir = write_pre_casava_tree(&production);

    let fc = FlowcellTable::open(&descriptor).unwrap().unwrap();
    let collected = fc
        .collect_files(&fc_dir, Some("J.Doe_00_02"), &WalkOptions::default())
        .unwrap();
    assert_eq!(collected.len(), 4);
    assert_eq!(collected.lanes(), vec!["2"]);
    assert_eq!(
        list(collected.get_entry("2_ATCACG", Field::Files).unwrap()).len(),
        1
    );
}

#[test]
fn test_pre_casava_to_single_flowcell_delivery() {
    let tmp = tempdir().unwrap();
    let production = tmp.path().join("production");
    write_run_info(&production);
    write_pre_casava_tree(&production);

    let engine = DeliveryEngine::new(config_for(tmp.path()));
    let request = DeliveryRequest {
        project: "J.Doe_00_01".to_string(),
        flowcell: Some(FLOWCELL.to_string()),
        from_pre_casava: true,
        to_pre_casava: true,
        transfer_dir: None,
    };
    let outcome = engine.deliver(&request, &SilentReporter).unwrap().unwrap();
    assert_eq!(outcome.tables.len(), 1);
    // Three sample files and one lane file.
    assert_eq!(outcome.plan.transfer_count(), 4);

    let data = tmp.path().join("projects/j_doe_00_01/data").join(FC_ID);
    let intermediate = tmp.path().join("projects/j_doe_00_01/intermediate").join(FC_ID);
    let (descriptor, table) = &outcome.tables[0];
    assert_eq!(descriptor, &data.join("project_run_info.yaml"));
    assert_eq!(
        list(table.get_entry("1_TTAGGC", Field::Files).unwrap())[0],
        data.join("1_120829_AA001AAAXX_nophix_10_1_fastq.txt").to_string_lossy()
    );

    let dry = outcome.plan.execute(&CopyTransfer, true, &SilentReporter).unwrap();
    assert_eq!(dry.succeeded, 0);
    assert!(!data.exists());

    let summary = outcome.plan.execute(&CopyTransfer, false, &SilentReporter).unwrap();
    assert_eq!(summary.failed, 0);
    assert!(data.join("1_120829_AA001AAAXX_nophix_10_2_fastq.txt").is_file());
    assert!(data.join("1_120829_AA001AAAXX_nophix.bc_metrics").is_file());
    assert!(intermediate
        .join("1_120829_AA001AAAXX_nophix_10-sort-dup/1_120829_AA001AAAXX_nophix_10-sort-dup.bam")
        .is_file());

    let delivered = FlowcellTable::open(descriptor).unwrap().unwrap();
    assert_eq!(delivered.len(), 7);
    assert_eq!(delivered.fc_id().unwrap(), FC_ID);
    for file in list(delivered.get_entry("1_TTAGGC", Field::Files).unwrap()) {
        assert!(Path::new(&file).starts_with(&data));
    }
}

#[test]
fn test_pre_casava_to_per_sample_delivery() {
    let tmp = tempdir().unwrap();
    let production = tmp.path().join("production");
    write_run_info(&production);
    write_pre_casava_tree(&production);

    let engine = DeliveryEngine::new(config_for(tmp.path()));
    let request = DeliveryRequest {
        project: "J.Doe_00_01".to_string(),
        flowcell: Some(FLOWCELL.to_string()),
        from_pre_casava: true,
        transfer_dir: Some("delivery".to_string()),
        ..Default::default()
    };
    let outcome = engine.deliver(&request, &SilentReporter).unwrap().unwrap();
    assert_eq!(outcome.tables.len(), 7);

    let sample_dir = tmp
        .path()
        .join("projects/delivery/data/P1_106F_index6")
        .join(FC_ID);
    let (descriptor, table) = outcome
        .tables
        .iter()
        .find(|(_, t)| t.row_by_name("P1_106F_index6").is_some())
        .unwrap();
    assert_eq!(descriptor, &sample_dir.join("P1_106F_index6-bcbb-config.yaml"));
    assert_eq!(table.len(), 1);
    assert_eq!(
        table.lane_files_for("1"),
        &[sample_dir
            .join("1_120829_AA001AAAXX_nophix.bc_metrics")
            .to_string_lossy()
            .into_owned()]
    );
    let results = list(table.get_entry("1_TTAGGC", Field::Results).unwrap());
    assert!(Path::new(&results[0]).starts_with(&sample_dir));

    outcome
        .plan
        .execute(&CopyTransfer, false, &SilentReporter)
        .unwrap();
    let written = fs::read_to_string(descriptor).unwrap();
    assert!(written.contains("P1_106F_index6"));
    assert!(!written.contains("P1_107_index7"));
}

#[test]
fn test_casava_delivery_prefers_compressed_reads() {
    let tmp = tempdir().unwrap();
    let sample_dir = tmp
        .path()
        .join("production/J.Doe_00_04/P001_101_index3/120924_CC003CCCXX");
    fs::create_dir_all(&sample_dir).unwrap();
    fs::write(
        sample_dir.join("P001_101_index3-bcbb-config.yaml"),
        "\
fc_date: '120924'
fc_name: CC003CCCXX
details:
  - lane: '1'
    flowcell_id: CC003CCCXX
    analysis: Align_standard_seqcap
    multiplex:
      - {name: P001_101_index3, sample_prj: J.Doe_00_04, sequence: TGACCA, barcode_id: 3}
",
    )
    .unwrap();
    touch(&sample_dir.join("P001_101_index3_TGACCA_L001_R1_001.fastq"));
    touch(&sample_dir.join("P001_101_index3_TGACCA_L001_R1_001.fastq.gz"));
    touch(&sample_dir.join("P001_101_index3-sort.bam"));

    let engine = DeliveryEngine::new(config_for(tmp.path()));
    let request = DeliveryRequest {
        project: "J.Doe_00_04".to_string(),
        ..Default::default()
    };
    let outcome = engine.deliver(&request, &SilentReporter).unwrap().unwrap();
    assert_eq!(outcome.tables.len(), 1);

    let target = tmp
        .path()
        .join("projects/j_doe_00_04/data/P001_101_index3/120924_CC003CCCXX");
    let (_, table) = &outcome.tables[0];
    assert_eq!(
        list(table.get_entry("1_TGACCA", Field::Files).unwrap()),
        vec![target
            .join("P001_101_index3_TGACCA_L001_R1_001.fastq.gz")
            .to_string_lossy()
            .into_owned()]
    );
}

#[test]
fn test_casava_input_to_pre_casava_output_is_refused() {
    let tmp = tempdir().unwrap();
    let engine = DeliveryEngine::new(config_for(tmp.path()));
    let request = DeliveryRequest {
        project: "J.Doe_00_01".to_string(),
        to_pre_casava: true,
        ..Default::default()
    };
    assert!(engine.deliver(&request, &SilentReporter).unwrap().is_none());
}

#[test]
fn test_missing_run_info_yields_nothing() {
    let tmp = tempdir().unwrap();
    let engine = DeliveryEngine::new(config_for(tmp.path()));
    assert!(engine
        .gather_pre_casava("J.Doe_00_01", FLOWCELL, &SilentReporter)
        .unwrap()
        .is_none());
}

#[test]
fn test_per_sample_delivery_keeps_every_lane_of_a_sample() {
    let tmp = tempdir().unwrap();
    let fc_dir = tmp.path().join("production").join(FLOWCELL);
    let row = |lane: &str, name: &str, id: u32, seq: &str| {
        Row::new(
            LaneInfo {
                lane: lane.to_string(),
                flowcell_id: Some("AA001AAAXX".to_string()),
                ..Default::default()
            },
            SampleInfo {
                name: name.to_string(),
                barcode_id: Some(id),
                sequence: Some(seq.to_string()),
                sample_prj: Some("J.Doe_00_03".to_string()),
                ..Default::default()
            },
        )
    };
    let mut fc = FlowcellTable::from_rows(vec![
        row("1", "P3_101_index1", 1, "ATCACG"),
        row("1", "P3_102_index2", 2, "CGATGT"),
        row("2", "P3_101_index1", 1, "ATCACG"),
    ])
    .unwrap();
    fc.set_flowcell_metadata(Some("120829".to_string()), Some("AA001AAAXX".to_string()));
    for (key, name) in [
        ("1_ATCACG", "1_120829_AA001AAAXX_nophix_1_1_fastq.txt"),
        ("1_CGATGT", "1_120829_AA001AAAXX_nophix_2_1_fastq.txt"),
        ("2_ATCACG", "2_120829_AA001AAAXX_nophix_1_1_fastq.txt"),
    ] {
        let path = fc_dir.join(name);
        touch(&path);
        fc.append_to_entry(key, Field::Files, path.to_string_lossy().into_owned())
            .unwrap();
    }
    fc.set_search_root(&fc_dir);

    let root = DeliveryRoot::new(&tmp.path().join("projects"), "J.Doe_00_03", None);
    let outcome = LayoutTransformer::new(root, LayoutConvention::PerSample)
        .transform(&fc)
        .unwrap();

    assert_eq!(outcome.tables.len(), 2);
    let descriptors = outcome
        .plan
        .actions()
        .iter()
        .filter(|a| matches!(a, PlannedAction::WriteDescriptor { .. }))
        .count();
    assert_eq!(descriptors, 2);
    assert_eq!(outcome.plan.transfer_count(), 3);

    let sample_dir = tmp
        .path()
        .join("projects/j_doe_00_03/data/P3_101_index1")
        .join(FC_ID);
    let (descriptor, table) = &outcome.tables[0];
    assert_eq!(descriptor, &sample_dir.join("P3_101_index1-bcbb-config.yaml"));
    assert_eq!(table.lanes(), vec!["1", "2"]);

    let summary = outcome
        .plan
        .execute(&CopyTransfer, false, &SilentReporter)
        .unwrap();
    assert_eq!(summary.failed, 0);

    let delivered = FlowcellTable::open(descriptor).unwrap().unwrap();
    assert_eq!(delivered.lanes(), vec!["1", "2"]);
    for key in ["1_ATCACG", "2_ATCACG"] {
        let files = list(delivered.get_entry(key, Field::Files).unwrap());
        assert_eq!(files.len(), 1);
        assert!(Path::new(&files[0]).starts_with(&sample_dir));
        assert!(Path::new(&files[0]).is_file());
    }
}
