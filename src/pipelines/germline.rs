use std::path::PathBuf;
use std::sync::Arc;
use log::{info, warn};
use crate::config::defs::{
    GatkSubcommand, PicardSubcommand, PipelineError, RunConfig, SamtoolsSubcommand,
    GATK_TAG, HISAT2_TAG, PICARD_TAG, SAMTOOLS_TAG,
};
use crate::utils::command::{check_versions, generate_cli, gatk, hisat2, picard, samtools, ToolConfig};
use crate::utils::exec::run_stage;
use crate::utils::file::SamplePaths;
use crate::utils::metrics::{mean_mapq, vcf_metrics};

/// One external invocation plus the files it reads and writes. Inputs are
/// checked before the stage runs and outputs after it exits, so a failed
/// upstream tool can never feed garbage to the next one silently.
pub struct Stage {
    pub name: &'static str,
    pub tool: &'static str,
    pub args: Vec<String>,
    pub inputs: Vec<PathBuf>,
    pub outputs: Vec<PathBuf>,
}

fn tool_error(tool: &str, error: impl ToString) -> PipelineError {
    PipelineError::ToolExecution {
        tool: tool.to_string(),
        error: error.to_string(),
    }
}

/// Builds the fixed stage sequence for one sample. Every intermediate name
/// comes from `SamplePaths`, so each stage's output is the next stage's
/// input by construction.
pub fn stage_plan(config: &RunConfig, paths: &SamplePaths) -> Result<Vec<Stage>, PipelineError> {
    let args = &config.args;
    let threads = args.threads;
    let known_indels = PathBuf::from(&args.known_indels_file);
    let known_snps = PathBuf::from(&args.known_snps_file);
    let mut stages = Vec::new();

    let align = ToolConfig::Hisat2(hisat2::Hisat2Config {
        index: args.input_ref_name.clone(),
        mate1: paths.fastq_r1(),
        mate2: paths.fastq_r2(),
        out_alignment: paths.raw_bam(),
        threads,
    });
    stages.push(Stage {
        name: "align",
        tool: HISAT2_TAG,
        args: generate_cli(HISAT2_TAG, &align).map_err(|e| tool_error(HISAT2_TAG, e))?,
        inputs: vec![paths.fastq_r1(), paths.fastq_r2()],
        outputs: vec![paths.raw_bam()],
    });

    let sort = ToolConfig::Samtools(samtools::SamtoolsConfig {
        subcommand: SamtoolsSubcommand::Sort,
        input: paths.raw_bam(),
        output: Some(paths.sorted_bam()),
        threads,
    });
    stages.push(Stage {
        name: "sort",
        tool: SAMTOOLS_TAG,
        args: generate_cli(SAMTOOLS_TAG, &sort).map_err(|e| tool_error(SAMTOOLS_TAG, e))?,
        inputs: vec![paths.raw_bam()],
        outputs: vec![paths.sorted_bam()],
    });

    let tag_read_groups = ToolConfig::Picard(picard::PicardConfig {
        subcommand: PicardSubcommand::AddOrReplaceReadGroups,
        input: paths.sorted_bam(),
        output: paths.read_group_bam(),
        metrics: None,
    });
    stages.push(Stage {
        name: "tag_read_groups",
        tool: PICARD_TAG,
        args: generate_cli(PICARD_TAG, &tag_read_groups).map_err(|e| tool_error(PICARD_TAG, e))?,
        inputs: vec![paths.sorted_bam()],
        outputs: vec![paths.read_group_bam()],
    });

    let mark_duplicates = ToolConfig::Picard(picard::PicardConfig {
        subcommand: PicardSubcommand::MarkDuplicates,
        input: paths.read_group_bam(),
        output: paths.marked_dups_bam(),
        metrics: Some(paths.marked_dups_metrics()),
    });
    stages.push(Stage {
        name: "mark_duplicates",
        tool: PICARD_TAG,
        args: generate_cli(PICARD_TAG, &mark_duplicates).map_err(|e| tool_error(PICARD_TAG, e))?,
        inputs: vec![paths.read_group_bam()],
        outputs: vec![paths.marked_dups_bam(), paths.marked_dups_metrics()],
    });

    let resort = ToolConfig::Samtools(samtools::SamtoolsConfig {
        subcommand: SamtoolsSubcommand::Sort,
        input: paths.marked_dups_bam(),
        output: Some(paths.dups_sorted_bam()),
        threads,
    });
    stages.push(Stage {
        name: "sort_marked",
        tool: SAMTOOLS_TAG,
        args: generate_cli(SAMTOOLS_TAG, &resort).map_err(|e| tool_error(SAMTOOLS_TAG, e))?,
        inputs: vec![paths.marked_dups_bam()],
        outputs: vec![paths.dups_sorted_bam()],
    });

    let index = ToolConfig::Samtools(samtools::SamtoolsConfig {
        subcommand: SamtoolsSubcommand::Index,
        input: paths.dups_sorted_bam(),
        output: None,
        threads,
    });
    stages.push(Stage {
        name: "index",
        tool: SAMTOOLS_TAG,
        args: generate_cli(SAMTOOLS_TAG, &index).map_err(|e| tool_error(SAMTOOLS_TAG, e))?,
        inputs: vec![paths.dups_sorted_bam()],
        outputs: vec![paths.dups_sorted_bai()],
    });

    let build_recal = ToolConfig::Gatk(gatk::GatkConfig {
        subcommand: GatkSubcommand::BaseRecalibrator,
        input: paths.dups_sorted_bam(),
        output: paths.recal_report(),
        reference: args.input_vcf_ref_loc.clone(),
        known_sites: vec![known_indels.clone(), known_snps.clone()],
        recal_report: None,
    });
    stages.push(Stage {
        name: "build_recalibration_report",
        tool: GATK_TAG,
        args: generate_cli(GATK_TAG, &build_recal).map_err(|e| tool_error(GATK_TAG, e))?,
        inputs: vec![
            paths.dups_sorted_bam(),
            paths.dups_sorted_bai(),
            known_indels,
            known_snps,
        ],
        outputs: vec![paths.recal_report()],
    });

    let apply_recal = ToolConfig::Gatk(gatk::GatkConfig {
        subcommand: GatkSubcommand::ApplyBqsr,
        input: paths.dups_sorted_bam(),
        output: paths.recal_bam(),
        reference: args.input_vcf_ref_loc.clone(),
        known_sites: Vec::new(),
        recal_report: Some(paths.recal_report()),
    });
    stages.push(Stage {
        name: "apply_recalibration",
        tool: GATK_TAG,
        args: generate_cli(GATK_TAG, &apply_recal).map_err(|e| tool_error(GATK_TAG, e))?,
        inputs: vec![paths.dups_sorted_bam(), paths.recal_report()],
        outputs: vec![paths.recal_bam()],
    });

    let call_variants = ToolConfig::Gatk(gatk::GatkConfig {
        subcommand: GatkSubcommand::HaplotypeCaller,
        input: paths.recal_bam(),
        output: paths.vcf(),
        reference: args.input_vcf_ref_loc.clone(),
        known_sites: Vec::new(),
        recal_report: None,
    });
    stages.push(Stage {
        name: "call_variants",
        tool: GATK_TAG,
        args: generate_cli(GATK_TAG, &call_variants).map_err(|e| tool_error(GATK_TAG, e))?,
        inputs: vec![paths.recal_bam()],
        outputs: vec![paths.vcf()],
    });

    let to_text = ToolConfig::Samtools(samtools::SamtoolsConfig {
        subcommand: SamtoolsSubcommand::View,
        input: paths.recal_bam(),
        output: Some(paths.recal_sam()),
        threads,
    });
    stages.push(Stage {
        name: "convert_to_text",
        tool: SAMTOOLS_TAG,
        args: generate_cli(SAMTOOLS_TAG, &to_text).map_err(|e| tool_error(SAMTOOLS_TAG, e))?,
        inputs: vec![paths.recal_bam()],
        outputs: vec![paths.recal_sam()],
    });

    Ok(stages)
}

async fn run_stages(config: &RunConfig, stages: &[Stage]) -> Result<(), PipelineError> {
    for stage in stages {
        for input in &stage.inputs {
            if !input.exists() {
                return Err(PipelineError::MissingStageInput {
                    stage: stage.name.to_string(),
                    path: input.clone(),
                });
            }
        }

        info!("Running stage {} ({})", stage.name, stage.tool);
        let output = run_stage(stage.tool, &stage.args, config.args.verbose)
            .await
            .map_err(|e| tool_error(stage.tool, e))?;
        if !output.success() {
            return Err(tool_error(
                &output.tool,
                format!(
                    "stage '{}' exited with {}; last stderr lines:\n{}",
                    stage.name,
                    output.status,
                    output.stderr_tail.join("\n")
                ),
            ));
        }

        for expected in &stage.outputs {
            if !expected.exists() {
                return Err(PipelineError::MissingStageOutput {
                    stage: stage.name.to_string(),
                    tool: stage.tool.to_string(),
                    path: expected.clone(),
                });
            }
        }
    }
    Ok(())
}

async fn report_metrics(paths: &SamplePaths) -> Result<(), PipelineError> {
    println!("Mean MAPQ Score From Recalibrated hisat2 Alignment");
    match mean_mapq(&paths.recal_sam())
        .await
        .map_err(|e| PipelineError::MetricExtraction(e.to_string()))?
    {
        Some(mean) => println!("{}", mean),
        None => warn!(
            "No alignment records in {}; mean MAPQ is undefined",
            paths.recal_sam().display()
        ),
    }

    let metrics = vcf_metrics(&paths.vcf())
        .await
        .map_err(|e| PipelineError::MetricExtraction(e.to_string()))?;

    println!("Total Number of Variants Called by HaplotypeCaller");
    println!("{}", metrics.record_count);

    println!("Mean QUAL Score from VCF File");
    match metrics.mean_qual {
        Some(mean) => println!("{}", mean),
        None => warn!(
            "No variant records in {}; mean QUAL is undefined",
            paths.vcf().display()
        ),
    }

    Ok(())
}

pub async fn run(config: Arc<RunConfig>) -> Result<(), PipelineError> {
    println!("\n-------------\n Germline Variants\n-------------\n");
    info!("Sample: {}", config.args.input_sample_name);

    check_versions(&[HISAT2_TAG, SAMTOOLS_TAG, PICARD_TAG, GATK_TAG])
        .await
        .map_err(|e| PipelineError::InvalidConfig(e.to_string()))?;

    let paths = SamplePaths::new(&config.cwd, &config.args.input_sample_name);
    let stages = stage_plan(&config, &paths)?;

    run_stages(&config, &stages).await?;
    report_metrics(&paths).await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::path::Path;
    use log::LevelFilter;
    use crate::cli::Arguments;

    fn test_config() -> RunConfig {
        RunConfig {
            cwd: PathBuf::from(""),
            args: Arguments {
                input_sample_name: "SAMPLE1".to_string(),
                input_ref_name: "grch38_index".to_string(),
                input_vcf_ref_loc: "grch38.fa".to_string(),
                known_indels_file: "known_indels.vcf".to_string(),
                known_snps_file: "known_snps.vcf".to_string(),
                verbose: false,
                threads: 4,
            },
            log_level: LevelFilter::Info,
        }
    }

    fn test_plan() -> Vec<Stage> {
        let config = test_config();
        let paths = SamplePaths::new(&config.cwd, &config.args.input_sample_name);
        stage_plan(&config, &paths).unwrap()
    }

    #[test]
    fn plan_runs_the_stages_in_the_fixed_order() {
        let names: Vec<&str> = test_plan().iter().map(|s| s.name).collect();
        assert_eq!(
            names,
            vec![
                "align",
                "sort",
                "tag_read_groups",
                "mark_duplicates",
                "sort_marked",
                "index",
                "build_recalibration_report",
                "apply_recalibration",
                "call_variants",
                "convert_to_text",
            ]
        );
    }

    #[test]
    fn no_stage_consumes_an_output_of_a_later_stage() {
        let config = test_config();
        let stages = test_plan();

        // Files the operator supplies; everything else must come from an
        // earlier stage.
        let paths = SamplePaths::new(&config.cwd, &config.args.input_sample_name);
        let mut available: HashSet<PathBuf> = HashSet::from([
            paths.fastq_r1(),
            paths.fastq_r2(),
            PathBuf::from(&config.args.known_indels_file),
            PathBuf::from(&config.args.known_snps_file),
        ]);

        for stage in &stages {
            for input in &stage.inputs {
                assert!(
                    available.contains(input),
                    "stage '{}' consumes {} before any earlier stage produces it",
                    stage.name,
                    input.display()
                );
            }
            for output in &stage.outputs {
                available.insert(output.clone());
            }
        }
    }

    #[test]
    fn every_declared_input_and_output_appears_in_the_argv() {
        // The index stage is the one exception: its .bai output is implied
        // by the tool, not named on the command line.
        for stage in test_plan() {
            for input in &stage.inputs {
                if stage.name == "build_recalibration_report"
                    && input == &Path::new("").join("SAMPLE1_dups_sorted.bam.bai")
                {
                    continue;
                }
                assert!(
                    stage.args.iter().any(|a| a == &input.to_string_lossy()),
                    "stage '{}' argv does not name input {}",
                    stage.name,
                    input.display()
                );
            }
            if stage.name == "index" {
                continue;
            }
            for output in &stage.outputs {
                assert!(
                    stage.args.iter().any(|a| a == &output.to_string_lossy()),
                    "stage '{}' argv does not name output {}",
                    stage.name,
                    output.display()
                );
            }
        }
    }

    #[test]
    fn plan_derives_the_expected_file_names() {
        let stages = test_plan();
        let sort = stages.iter().find(|s| s.name == "sort").unwrap();
        assert_eq!(sort.outputs, vec![PathBuf::from("SAMPLE1_sorted.bam")]);
        let call = stages.iter().find(|s| s.name == "call_variants").unwrap();
        assert_eq!(call.outputs, vec![PathBuf::from("SAMPLE1.vcf")]);
    }

    #[tokio::test]
    async fn missing_stage_input_aborts_before_spawning() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = test_config();
        config.cwd = dir.path().to_path_buf();
        let paths = SamplePaths::new(&config.cwd, &config.args.input_sample_name);
        let stages = stage_plan(&config, &paths).unwrap();

        // No FASTQ files exist in the temp dir, so the align stage must be
        // rejected without running hisat2.
        let err = run_stages(&config, &stages).await.unwrap_err();
        match err {
            PipelineError::MissingStageInput { stage, path } => {
                assert_eq!(stage, "align");
                assert_eq!(path, paths.fastq_r1());
            }
            other => panic!("expected MissingStageInput, got {other}"),
        }
    }
}
