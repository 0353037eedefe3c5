#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};

pub const FLOWCELL: &str = "120829_SN0001_0001_AA001AAAXX";
pub const FC_ID: &str = "120829_AA001AAAXX";

/// Two lanes: lane 1 with seven samples of J.Doe_00_01, lane 2 with four
/// samples of J.Doe_00_02.
pub const RUN_INFO: &str = "\
fc_date: '120829'
fc_name: AA001AAAXX
details:
  - lane: '1'
    description: Lane 1, J.Doe_00_01
    flowcell_id: AA001AAAXX
    analysis: Align_standard_seqcap
    genome_build: hg19
    multiplex:
      - {barcode_id: 1, barcode_type: SampleSheet, name: P1_101F_index1, sample_prj: J.Doe_00_01, sequence: ATCACG}
      - {barcode_id: 2, barcode_type: SampleSheet, name: P1_102F_index2, sample_prj: J.Doe_00_01, sequence: CGATGT}
      - {barcode_id: 3, barcode_type: SampleSheet, name: P1_103_index3, sample_prj: J.Doe_00_01, sequence: TGACCA}
      - {barcode_id: 4, barcode_type: SampleSheet, name: P1_104F_index4, sample_prj: J.Doe_00_01, sequence: ACAGTG}
      - {barcode_id: 8, barcode_type: SampleSheet, name: P1_105F_index5, sample_prj: J.Doe_00_01, sequence: GCCAAT}
      - {barcode_id: 10, barcode_type: SampleSheet, name: P1_106F_index6, sample_prj: J.Doe_00_01, sequence: TTAGGC}
      - {barcode_id: 12, barcode_type: SampleSheet, name: P1_107_index7, sample_prj: J.Doe_00_01, sequence: CAGATC}
  - lane: '2'
    description: Lane 2, J.Doe_00_02
    flowcell_id: AA001AAAXX
    analysis: Align_standard_seqcap
    genome_build: hg19
    multiplex:
      - {barcode_id: 5, barcode_type: SampleSheet, name: P2_101_index19a, sample_prj: J.Doe_00_02, sequence: ATCACG}
      - {barcode_id: 7, barcode_type: SampleSheet, name: P2_102_index12a, sample_prj: J.Doe_00_02, sequence: CGATGT}
      - {barcode_id: 17, barcode_type: SampleSheet, name: P2_103_index3a, sample_prj: J.Doe_00_02, sequence: TTAGGC}
      - {barcode_id: 19, barcode_type: SampleSheet, name: P2_104_index4a, sample_prj: J.Doe_00_02, sequence: TGACCA}
";

pub fn touch(path: &Path) {
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, "x").unwrap();
}

/// Write the descriptor into `<root>/<FLOWCELL>/run_info.yaml` and return
/// its path.
pub fn write_run_info(root: &Path) -> PathBuf {
    let path = root.join(FLOWCELL).join("run_info.yaml");
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(&path, RUN_INFO).unwrap();
    path
}

/// Pre-demultiplexed output for lane 1 barcode 10 and lane 2 barcode 5,
/// plus lane files and files that belong to no sample.
///
/// ```text
/// <FLOWCELL>/
///   1_120829_AA001AAAXX_nophix.bc_metrics
///   1_120829_AA001AAAXX_nophix_10_1_fastq.txt
///   1_120829_AA001AAAXX_nophix_10_2_fastq.txt
///   2_120829_AA001AAAXX_nophix_5_1_fastq.txt
///   2_120829_AA001AAAXX_unmatched_1_fastq.txt
///   01_analysis_start.txt
///   slurm-1234.out
///   1_120829_AA001AAAXX_nophix_10-sort-dup/
///     1_120829_AA001AAAXX_nophix_10-sort-dup.bam
/// ```
pub fn write_pre_casava_tree(root: &Path) -> PathBuf {
    let fc = root.join(FLOWCELL);
    for name in [
        "1_120829_AA001AAAXX_nophix.bc_metrics",
        "1_120829_AA001AAAXX_nophix_10_1_fastq.txt",
        "1_120829_AA001AAAXX_nophix_10_2_fastq.txt",
        "2_120829_AA001AAAXX_nophix_5_1_fastq.txt",
        "2_120829_AA001AAAXX_unmatched_1_fastq.txt",
        "01_analysis_start.txt",
        "slurm-1234.out",
        "1_120829_AA001AAAXX_nophix_10-sort-dup/1_120829_AA001AAAXX_nophix_10-sort-dup.bam",
    ] {
        touch(&fc.join(name));
    }
    fc
}
