mod common;

use std::collections::BTreeSet;
use std::fs;
use tempfile::tempdir;

use common::{write_run_info, FC_ID, RUN_INFO};
use seqrun_core::flowcell::descriptor::parse_hierarchical;
use seqrun_core::{Error, Field, FieldValue, FlowcellTable};

fn fixture() -> FlowcellTable {
    let descriptor = parse_hierarchical(RUN_INFO).unwrap();
    let mut fc = FlowcellTable::from_rows(descriptor.rows).unwrap();
    fc.set_flowcell_metadata(descriptor.fc_date, descriptor.fc_name);
    fc
}

fn triples(fc: &FlowcellTable) -> BTreeSet<(String, String, Vec<String>)> {
    fc.iter()
        .map(|r| {
            let mut files = r.sample.files.clone();
            files.sort();
            (r.lane.lane.clone(), r.sample.name.clone(), files)
        })
        .collect()
}

#[test]
fn test_load_subset_and_projects() {
    let tmp = tempdir().unwrap();
    write_run_info(tmp.path());

    let mut fc = FlowcellTable::new();
    let missing = tmp.path().join("missing");
    let found = fc
        .load(&[missing, tmp.path().join(common::FLOWCELL)], "run_info.yaml")
        .unwrap();
    assert!(found);
    assert_eq!(fc.len(), 11);
    assert_eq!(fc.projects(), vec!["J.Doe_00_01", "J.Doe_00_02"]);
    assert_eq!(fc.fc_id().unwrap(), FC_ID);

    let sub = fc.subset(Field::SampleProject, "J.Doe_00_01");
    assert_eq!(sub.len(), 7);
    assert!(sub
        .filename()
        .unwrap()
        .ends_with("run_info-pruned.yaml"));
    assert_eq!(sub.fc_id().unwrap(), FC_ID);
}

#[test]
fn test_load_without_descriptor_is_not_an_error() {
    let tmp = tempdir().unwrap();
    let mut fc = FlowcellTable::new();
    assert!(!fc.load(&[tmp.path()], "run_info.yaml").unwrap());
    assert!(fc.is_empty());
    assert!(FlowcellTable::open(&tmp.path().join("run_info.yaml"))
        .unwrap()
        .is_none());
}

#[test]
fn test_barcode_mappings_for_lane() {
    let fc = fixture();
    let id_to_name = fc.barcode_id_to_name("1");
    assert_eq!(id_to_name.len(), 7);
    assert_eq!(id_to_name[&10], "P1_106F_index6");
    assert_eq!(fc.barcode_id_to_sequence("1")[&10], "TTAGGC");
    assert_eq!(fc.barcode_name_to_id("2")["P2_104_index4a"], 19);
    assert_eq!(fc.barcode_sequence_to_name("2")["TTAGGC"], "P2_103_index3a");
    assert_eq!(fc.barcodes("2"), vec![5, 7, 17, 19]);
    assert!(fc.barcode_id_to_name("3").is_empty());
}

#[test]
fn test_subset_matches_exactly_the_rows_with_the_value() {
    let fc = fixture();
    for (field, value) in [
        (Field::Lane, FieldValue::from("2")),
        (Field::Sequence, FieldValue::from("ATCACG")),
        (Field::BarcodeId, FieldValue::from(10u32)),
        (Field::Name, FieldValue::from("nobody")),
    ] {
        let sub = fc.subset(field, value.clone());
        let expected: Vec<_> = fc.iter().filter(|r| r.matches(field, &value)).collect();
        assert_eq!(sub.iter().collect::<Vec<_>>(), expected);
        assert!(sub.len() <= fc.len());
    }
}

#[test]
fn test_hierarchical_round_trip_is_stable() {
    let mut fc = fixture();
    fc.append_to_entry("1_TTAGGC", Field::Files, "/fc/b_2.fastq".to_string())
        .unwrap();
    fc.append_to_entry("1_TTAGGC", Field::Files, "/fc/a_1.fastq".to_string())
        .unwrap();

    let first = fc.serialize_to_hierarchical().unwrap();
    let reparsed = parse_hierarchical(&first).unwrap();
    let mut again = FlowcellTable::from_rows(reparsed.rows).unwrap();
    again.set_flowcell_metadata(reparsed.fc_date, reparsed.fc_name);

    assert_eq!(triples(&again), triples(&fc));
    assert_eq!(
        again.get_entry("1_TTAGGC", Field::Files).unwrap(),
        Some(FieldValue::List(vec![
            "/fc/a_1.fastq".to_string(),
            "/fc/b_2.fastq".to_string()
        ]))
    );
    assert_eq!(again.serialize_to_hierarchical().unwrap(), first);
}

#[test]
fn test_renumber_lanes_to_unique() {
    let mut fc = fixture();
    fc.append_lane_file("1", "/fc/1_120829_AA001AAAXX_nophix.bc_metrics".to_string());
    fc.append_lane_file("2", "/fc/2_120829_AA001AAAXX_nophix.bc_metrics".to_string());
    let unique = fc.renumber_lanes_to_unique();

    assert_eq!(unique.len(), 11);
    let lanes: Vec<String> = unique.iter().map(|r| r.lane.lane.clone()).collect();
    let expected: Vec<String> = (1..=11).map(|i| i.to_string()).collect();
    assert_eq!(lanes, expected);
    assert_eq!(fc.lanes(), vec!["1", "2"]);
    assert!(unique.is_unique_lanes());

    // Rows 1..=7 came from lane 1, rows 8..=11 from lane 2.
    for lane in 1..=11 {
        let original = if lane <= 7 { "1" } else { "2" };
        assert_eq!(
            unique.lane_files_for(&lane.to_string()),
            fc.lane_files_for(original),
            "lane {}",
            lane
        );
    }
    let last = unique.subset(Field::Lane, "11");
    assert_eq!(
        last.lane_files_for("11"),
        &["/fc/2_120829_AA001AAAXX_nophix.bc_metrics".to_string()]
    );
    assert_eq!(fc.lane_files().len(), 2);

    let names: Vec<&str> = unique.iter().map(|r| r.sample.name.as_str()).collect();
    let original: Vec<&str> = fc.iter().map(|r| r.sample.name.as_str()).collect();
    assert_eq!(names, original);

    let yaml = unique.serialize_to_hierarchical().unwrap();
    assert!(!yaml.contains("multiplex"));
    assert!(yaml.contains("description: J.Doe_00_02_P2_104_index4a"));
}

#[test]
fn test_samplesheet_descriptor() {
    let tmp = tempdir().unwrap();
    let dir = tmp.path().join("120924_SN0002_0003_CC003CCCXX");
    fs::create_dir_all(&dir).unwrap();
    let path = dir.join("C003CCCXX.csv");
    fs::write(
        &path,
        "FCID,Lane,SampleID,SampleRef,Index,Description,Control,Recipe,Operator,SampleProject\n\
         C003CCCXX,1,P001_101_index3,hg19,TGACCA,J__Doe_00_04,N,R1,NN,J__Doe_00_04\n\
         C003CCCXX,1,P001_102_index6,hg19,ACAGTG,J__Doe_00_04,N,R1,NN,J__Doe_00_04\n\
         C003CCCXX,2,P002_101_index3,hg19,TGACCA,J__Doe_00_05,N,R1,NN,J__Doe_00_05\n",
    )
    .unwrap();

    let fc = FlowcellTable::open(&path).unwrap().unwrap();
    assert_eq!(fc.len(), 3);
    for row in fc.iter() {
        let project = row.sample.sample_prj.as_deref().unwrap().replace("__", ".");
        assert_eq!(
            row.lane.description.as_deref(),
            Some(format!("Lane {}, {}", row.lane.lane, project).as_str())
        );
        assert!(row.sample.files.is_empty());
        assert!(row.sample.results.is_empty());
    }
    assert_eq!(fc.fc_id().unwrap(), "120924_CC003CCCXX");
    assert_eq!(fc.lanes(), vec!["1", "2"]);
}

#[test]
fn test_duplicate_key_in_descriptor_is_rejected() {
    let text = "\
details:
  - lane: 1
    multiplex:
      - {name: S1, barcode_id: 1, sequence: ATCACG}
      - {name: S2, barcode_id: 2, sequence: ATCACG}
";
    let rows = parse_hierarchical(text).unwrap().rows;
    assert!(matches!(
        FlowcellTable::from_rows(rows),
        Err(Error::DuplicateKey(key)) if key == "1_ATCACG"
    ));
}
