// End-to-end tests: run the driver binary against stub tools on PATH and
// check stage sequencing, failure reporting, and the metric report.

use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::Path;
use std::process::{Command, Output};
use anyhow::Result;
use tempfile::TempDir;

const BIN: &str = env!("CARGO_BIN_EXE_seqtovar-pipelines");

const HISAT2_STUB: &str = r#"#!/bin/sh
if [ "$1" = "--version" ]; then echo "hisat2-align-s version 2.2.1"; exit 0; fi
out=""
prev=""
for a in "$@"; do
  if [ "$prev" = "-S" ]; then out="$a"; fi
  prev="$a"
done
: > "$out"
"#;

const SAMTOOLS_STUB: &str = r#"#!/bin/sh
if [ "$1" = "--version" ]; then echo "samtools 1.20"; exit 0; fi
sub="$1"; shift
out=""; prev=""; last=""
for a in "$@"; do
  if [ "$prev" = "-o" ]; then out="$a"; fi
  prev="$a"; last="$a"
done
case "$sub" in
  sort) : > "$out";;
  index) : > "$last.bai";;
  view) printf '@HD\tVN:1.6\nr1\t0\tchr1\t1\t10\t4M\t*\t0\t0\tACGT\tIIII\nr2\t0\tchr1\t1\t20\t4M\t*\t0\t0\tACGT\tIIII\nr3\t0\tchr1\t1\t30\t4M\t*\t0\t0\tACGT\tIIII\n' > "$out";;
esac
exit 0
"#;

const PICARD_STUB: &str = r#"#!/bin/sh
if [ "$2" = "--version" ]; then echo "Version:3.1.1" >&2; exit 0; fi
out=""; met=""; prev=""
for a in "$@"; do
  case "$prev" in
    -O) out="$a";;
    -M) met="$a";;
  esac
  prev="$a"
done
: > "$out"
if [ -n "$met" ]; then : > "$met"; fi
exit 0
"#;

const GATK_STUB: &str = r#"#!/bin/sh
if [ "$1" = "--version" ]; then echo "The Genome Analysis Toolkit (GATK) v4.5.0.0"; exit 0; fi
sub="$1"; shift
out=""; prev=""
for a in "$@"; do
  if [ "$prev" = "-O" ]; then out="$a"; fi
  prev="$a"
done
if [ "$sub" = "HaplotypeCaller" ]; then
  {
    printf '##fileformat=VCFv4.2\n#CHROM\tPOS\tID\tREF\tALT\tQUAL\tFILTER\tINFO\n'
    for p in 100 200 300 400 500; do
      printf 'chr1\t%s\t.\tA\tG\t60.0\tPASS\tDP=30\n' "$p"
    done
  } > "$out"
else
  : > "$out"
fi
exit 0
"#;

const GATK_FAILING_STUB: &str = r#"#!/bin/sh
if [ "$1" = "--version" ]; then echo "The Genome Analysis Toolkit (GATK) v4.5.0.0"; exit 0; fi
echo "A USER ERROR has occurred" >&2
exit 7
"#;

fn write_stub(dir: &Path, name: &str, contents: &str) -> Result<()> {
    let path = dir.join(name);
    fs::write(&path, contents)?;
    fs::set_permissions(&path, fs::Permissions::from_mode(0o755))?;
    Ok(())
}

struct TestRun {
    work_dir: TempDir,
    stub_dir: TempDir,
}

impl TestRun {
    fn new() -> Result<Self> {
        let work_dir = TempDir::new()?;
        let stub_dir = TempDir::new()?;

        write_stub(stub_dir.path(), "hisat2", HISAT2_STUB)?;
        write_stub(stub_dir.path(), "samtools", SAMTOOLS_STUB)?;
        write_stub(stub_dir.path(), "picard", PICARD_STUB)?;
        write_stub(stub_dir.path(), "gatk", GATK_STUB)?;

        // Operator-supplied inputs for sample SAMPLE1.
        for name in [
            "SAMPLE1_1.fastq",
            "SAMPLE1_2.fastq",
            "known_indels.vcf",
            "known_snps.vcf",
        ] {
            fs::write(work_dir.path().join(name), "")?;
        }

        Ok(TestRun { work_dir, stub_dir })
    }

    fn invoke(&self, argv: &[&str]) -> Result<Output> {
        let path = format!(
            "{}:{}",
            self.stub_dir.path().display(),
            std::env::var("PATH")?
        );
        let output = Command::new(BIN)
            .args(argv)
            .current_dir(self.work_dir.path())
            .env("PATH", path)
            .output()?;
        Ok(output)
    }
}

const FULL_ARGV: [&str; 10] = [
    "-i", "SAMPLE1",
    "-r", "grch38_index",
    "-v", "grch38.fa",
    "-k", "known_indels.vcf",
    "-s", "known_snps.vcf",
];

#[test]
fn pipeline_runs_all_stages_and_reports_metrics() -> Result<()> {
    let run = TestRun::new()?;
    let output = run.invoke(&FULL_ARGV)?;
    let stdout = String::from_utf8_lossy(&output.stdout);

    assert!(
        output.status.success(),
        "driver failed:\nstdout: {}\nstderr: {}",
        stdout,
        String::from_utf8_lossy(&output.stderr)
    );

    // Every intermediate the naming convention promises must exist.
    for name in [
        "SAMPLE1.bam",
        "SAMPLE1_sorted.bam",
        "SAMPLE1_sorted_rg.bam",
        "SAMPLE1_marked_dups.bam",
        "SAMPLE1_marked_dups_metrics.txt",
        "SAMPLE1_dups_sorted.bam",
        "SAMPLE1_dups_sorted.bam.bai",
        "recal_SAMPLE1.report",
        "SAMPLE1_recal.bam",
        "SAMPLE1.vcf",
        "SAMPLE1_recal.sam",
    ] {
        assert!(
            run.work_dir.path().join(name).exists(),
            "missing intermediate {}",
            name
        );
    }

    // Stub SAM has MAPQ 10/20/30; stub VCF has 5 records at QUAL 60.
    let lines: Vec<&str> = stdout.lines().collect();
    let mapq_label = lines
        .iter()
        .position(|l| *l == "Mean MAPQ Score From Recalibrated hisat2 Alignment")
        .expect("missing MAPQ label");
    assert_eq!(lines[mapq_label + 1], "20");

    let count_label = lines
        .iter()
        .position(|l| *l == "Total Number of Variants Called by HaplotypeCaller")
        .expect("missing variant count label");
    assert_eq!(lines[count_label + 1], "5");

    let qual_label = lines
        .iter()
        .position(|l| *l == "Mean QUAL Score from VCF File")
        .expect("missing QUAL label");
    assert_eq!(lines[qual_label + 1], "60");

    Ok(())
}

#[test]
fn missing_required_argument_fails_before_any_stage_runs() -> Result<()> {
    let run = TestRun::new()?;

    // Drop the known-indels flag; clap must reject the invocation.
    let argv = [
        "-i", "SAMPLE1",
        "-r", "grch38_index",
        "-v", "grch38.fa",
        "-s", "known_snps.vcf",
    ];
    let output = run.invoke(&argv)?;

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("required"), "unexpected stderr: {}", stderr);
    // The aligner never ran, so the raw alignment was never created.
    assert!(!run.work_dir.path().join("SAMPLE1.bam").exists());

    Ok(())
}

#[test]
fn failing_stage_halts_the_pipeline_with_the_tool_diagnostics() -> Result<()> {
    let run = TestRun::new()?;
    write_stub(run.stub_dir.path(), "gatk", GATK_FAILING_STUB)?;

    let output = run.invoke(&FULL_ARGV)?;

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(
        stderr.contains("gatk failed"),
        "unexpected stderr: {}",
        stderr
    );
    assert!(
        stderr.contains("A USER ERROR has occurred"),
        "stderr tail of the failing tool not reported: {}",
        stderr
    );
    // Stages upstream of the recalibrator completed; nothing downstream ran.
    assert!(run.work_dir.path().join("SAMPLE1_dups_sorted.bam").exists());
    assert!(!run.work_dir.path().join("SAMPLE1_recal.bam").exists());
    assert!(!run.work_dir.path().join("SAMPLE1.vcf").exists());

    Ok(())
}
