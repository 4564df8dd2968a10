/// Functions and structs for building command-line invocations of the
/// external tools in the pipeline.

use anyhow::{anyhow, Result};
use log::debug;
use crate::config::defs::{HISAT2_TAG, SAMTOOLS_TAG, PICARD_TAG, GATK_TAG, TOOL_VERSIONS};

pub mod hisat2 {
    use std::path::PathBuf;
    use anyhow::anyhow;
    use tokio::process::Command;
    use crate::config::defs::HISAT2_TAG;
    use crate::utils::exec::{read_child_output_to_vec, ChildStream};

    pub struct Hisat2Config {
        pub index: String,
        pub mate1: PathBuf,
        pub mate2: PathBuf,
        pub out_alignment: PathBuf,
        pub threads: usize,
    }

    pub async fn hisat2_presence_check() -> anyhow::Result<String> {
        let args: Vec<&str> = vec!["--version"];

        let mut child = Command::new(HISAT2_TAG)
            .args(&args)
            .stdin(std::process::Stdio::piped())
            .stdout(std::process::Stdio::piped())
            .stderr(std::process::Stdio::piped())
            .spawn()
            .map_err(|e| anyhow!("Failed to spawn: {}. Is hisat2 installed?", e))?;

        let lines = read_child_output_to_vec(&mut child, ChildStream::Stdout).await?;
        let first_line = lines
            .first()
            .ok_or_else(|| anyhow!("No output from hisat2 --version"))?;
        let version = first_line
            .split_whitespace()
            .nth(2)
            .ok_or_else(|| anyhow!("Invalid hisat2 --version output: {}", first_line))?
            .to_string();
        if version.is_empty() {
            return Err(anyhow!("Empty version number in hisat2 --version output: {}", first_line));
        }
        Ok(version)
    }

    pub fn arg_generator(config: &Hisat2Config) -> Vec<String> {
        let mut args_vec: Vec<String> = Vec::new();
        args_vec.push("-x".to_string());
        args_vec.push(config.index.clone());
        args_vec.push("-1".to_string());
        args_vec.push(config.mate1.to_string_lossy().to_string());
        args_vec.push("-2".to_string());
        args_vec.push(config.mate2.to_string_lossy().to_string());
        args_vec.push("-S".to_string());
        args_vec.push(config.out_alignment.to_string_lossy().to_string());
        args_vec.push("-p".to_string());
        args_vec.push(config.threads.to_string());
        args_vec
    }
}

pub mod samtools {
    use std::path::PathBuf;
    use anyhow::anyhow;
    use tokio::process::Command;
    use crate::config::defs::{SamtoolsSubcommand, SAMTOOLS_TAG};
    use crate::utils::exec::{read_child_output_to_vec, ChildStream};

    pub struct SamtoolsConfig {
        pub subcommand: SamtoolsSubcommand,
        pub input: PathBuf,
        pub output: Option<PathBuf>,
        pub threads: usize,
    }

    pub async fn samtools_presence_check() -> anyhow::Result<String> {
        let args: Vec<&str> = vec!["--version"];

        let mut child = Command::new(SAMTOOLS_TAG)
            .args(&args)
            .stdin(std::process::Stdio::piped())
            .stdout(std::process::Stdio::piped())
            .stderr(std::process::Stdio::piped())
            .spawn()
            .map_err(|e| anyhow!("Failed to spawn: {}. Is samtools installed?", e))?;

        let lines = read_child_output_to_vec(&mut child, ChildStream::Stdout).await?;
        let first_line = lines
            .first()
            .ok_or_else(|| anyhow!("No output from samtools --version"))?;
        let version = first_line
            .split_whitespace()
            .nth(1)
            .ok_or_else(|| anyhow!("Invalid samtools --version output: {}", first_line))?
            .to_string();
        if version.is_empty() {
            return Err(anyhow!("Empty version number in samtools --version output: {}", first_line));
        }
        Ok(version)
    }

    pub fn arg_generator(config: &SamtoolsConfig) -> Vec<String> {
        let mut args_vec: Vec<String> = Vec::new();
        args_vec.push(config.subcommand.tag().to_string());

        match config.subcommand {
            SamtoolsSubcommand::Sort => {
                args_vec.push("-@".to_string());
                args_vec.push(config.threads.to_string());
                if let Some(output) = &config.output {
                    args_vec.push("-o".to_string());
                    args_vec.push(output.to_string_lossy().to_string());
                }
                args_vec.push(config.input.to_string_lossy().to_string());
            }
            SamtoolsSubcommand::Index => {
                args_vec.push(config.input.to_string_lossy().to_string());
            }
            SamtoolsSubcommand::View => {
                args_vec.push("-h".to_string());
                if let Some(output) = &config.output {
                    args_vec.push("-o".to_string());
                    args_vec.push(output.to_string_lossy().to_string());
                }
                args_vec.push(config.input.to_string_lossy().to_string());
            }
        }

        args_vec
    }
}

pub mod picard {
    use std::path::PathBuf;
    use anyhow::anyhow;
    use tokio::process::Command;
    use crate::config::defs::{
        PicardSubcommand, PICARD_TAG, RG_ID, RG_LIBRARY, RG_PLATFORM, RG_SAMPLE, RG_UNIT,
    };
    use crate::utils::exec::{read_child_output_to_vec, ChildStream};

    pub struct PicardConfig {
        pub subcommand: PicardSubcommand,
        pub input: PathBuf,
        pub output: PathBuf,
        pub metrics: Option<PathBuf>,
    }

    pub async fn picard_presence_check() -> anyhow::Result<String> {
        let args: Vec<&str> = vec!["MarkDuplicates", "--version"];

        let mut child = Command::new(PICARD_TAG)
            .args(&args)
            .stdin(std::process::Stdio::piped())
            .stdout(std::process::Stdio::piped())
            .stderr(std::process::Stdio::piped())
            .spawn()
            .map_err(|e| anyhow!("Failed to spawn: {}. Is picard installed?", e))?;

        // picard prints its version banner on stderr
        let lines = read_child_output_to_vec(&mut child, ChildStream::Stderr).await?;
        let version_line = lines
            .iter()
            .find(|line| !line.trim().is_empty())
            .ok_or_else(|| anyhow!("No output from picard MarkDuplicates --version"))?;
        Ok(version_line.trim().to_string())
    }

    pub fn arg_generator(config: &PicardConfig) -> Vec<String> {
        let mut args_vec: Vec<String> = Vec::new();
        args_vec.push(config.subcommand.tag().to_string());
        args_vec.push("-I".to_string());
        args_vec.push(config.input.to_string_lossy().to_string());
        args_vec.push("-O".to_string());
        args_vec.push(config.output.to_string_lossy().to_string());

        match config.subcommand {
            PicardSubcommand::AddOrReplaceReadGroups => {
                args_vec.push("-SORT_ORDER".to_string());
                args_vec.push("coordinate".to_string());
                args_vec.push("-RGID".to_string());
                args_vec.push(RG_ID.to_string());
                args_vec.push("-RGLB".to_string());
                args_vec.push(RG_LIBRARY.to_string());
                args_vec.push("-RGPL".to_string());
                args_vec.push(RG_PLATFORM.to_string());
                args_vec.push("-RGSM".to_string());
                args_vec.push(RG_SAMPLE.to_string());
                args_vec.push("-CREATE_INDEX".to_string());
                args_vec.push("True".to_string());
                args_vec.push("-RGPU".to_string());
                args_vec.push(RG_UNIT.to_string());
            }
            PicardSubcommand::MarkDuplicates => {
                if let Some(metrics) = &config.metrics {
                    args_vec.push("-M".to_string());
                    args_vec.push(metrics.to_string_lossy().to_string());
                }
            }
        }

        args_vec
    }
}

pub mod gatk {
    use std::path::PathBuf;
    use anyhow::anyhow;
    use tokio::process::Command;
    use crate::config::defs::{GatkSubcommand, GATK_TAG};
    use crate::utils::exec::{read_child_output_to_vec, ChildStream};

    pub struct GatkConfig {
        pub subcommand: GatkSubcommand,
        pub input: PathBuf,
        pub output: PathBuf,
        pub reference: String,
        pub known_sites: Vec<PathBuf>,
        pub recal_report: Option<PathBuf>,
    }

    pub async fn gatk_presence_check() -> anyhow::Result<String> {
        let args: Vec<&str> = vec!["--version"];

        let mut child = Command::new(GATK_TAG)
            .args(&args)
            .stdin(std::process::Stdio::piped())
            .stdout(std::process::Stdio::piped())
            .stderr(std::process::Stdio::piped())
            .spawn()
            .map_err(|e| anyhow!("Failed to spawn: {}. Is gatk installed?", e))?;

        let lines = read_child_output_to_vec(&mut child, ChildStream::Stdout).await?;
        let version_line = lines
            .iter()
            .find(|line| line.contains("(GATK)"))
            .or_else(|| lines.iter().find(|line| !line.trim().is_empty()))
            .ok_or_else(|| anyhow!("No output from gatk --version"))?;
        let version = version_line
            .split_whitespace()
            .last()
            .ok_or_else(|| anyhow!("Invalid gatk --version output: {}", version_line))?
            .to_string();
        if version.is_empty() {
            return Err(anyhow!("Empty version number in gatk --version output: {}", version_line));
        }
        Ok(version)
    }

    pub fn arg_generator(config: &GatkConfig) -> Vec<String> {
        let mut args_vec: Vec<String> = Vec::new();
        args_vec.push(config.subcommand.tag().to_string());

        match config.subcommand {
            GatkSubcommand::BaseRecalibrator => {
                args_vec.push("-I".to_string());
                args_vec.push(config.input.to_string_lossy().to_string());
                args_vec.push("-R".to_string());
                args_vec.push(config.reference.clone());
                for sites in &config.known_sites {
                    args_vec.push("--known-sites".to_string());
                    args_vec.push(sites.to_string_lossy().to_string());
                }
                args_vec.push("-O".to_string());
                args_vec.push(config.output.to_string_lossy().to_string());
            }
            GatkSubcommand::ApplyBqsr => {
                args_vec.push("-R".to_string());
                args_vec.push(config.reference.clone());
                args_vec.push("-I".to_string());
                args_vec.push(config.input.to_string_lossy().to_string());
                if let Some(report) = &config.recal_report {
                    args_vec.push("--bqsr-recal-file".to_string());
                    args_vec.push(report.to_string_lossy().to_string());
                }
                args_vec.push("-O".to_string());
                args_vec.push(config.output.to_string_lossy().to_string());
            }
            GatkSubcommand::HaplotypeCaller => {
                args_vec.push("-I".to_string());
                args_vec.push(config.input.to_string_lossy().to_string());
                args_vec.push("-O".to_string());
                args_vec.push(config.output.to_string_lossy().to_string());
                args_vec.push("-R".to_string());
                args_vec.push(config.reference.clone());
            }
        }

        args_vec
    }
}

pub enum ToolConfig {
    Hisat2(hisat2::Hisat2Config),
    Samtools(samtools::SamtoolsConfig),
    Picard(picard::PicardConfig),
    Gatk(gatk::GatkConfig),
}

pub fn generate_cli(tool: &str, config: &ToolConfig) -> Result<Vec<String>> {
    let cmd = match (tool, config) {
        (HISAT2_TAG, ToolConfig::Hisat2(c)) => hisat2::arg_generator(c),
        (SAMTOOLS_TAG, ToolConfig::Samtools(c)) => samtools::arg_generator(c),
        (PICARD_TAG, ToolConfig::Picard(c)) => picard::arg_generator(c),
        (GATK_TAG, ToolConfig::Gatk(c)) => gatk::arg_generator(c),
        _ => return Err(anyhow!("Unknown tool: {}", tool)),
    };

    Ok(cmd)
}

pub async fn check_version(tool: &str) -> Result<String> {
    let version = match tool {
        HISAT2_TAG => hisat2::hisat2_presence_check().await,
        SAMTOOLS_TAG => samtools::samtools_presence_check().await,
        PICARD_TAG => picard::picard_presence_check().await,
        GATK_TAG => gatk::gatk_presence_check().await,
        _ => return Err(anyhow!("Unknown tool: {}", tool)),
    };
    Ok(version?)
}

/// Verifies every tool is on PATH before any stage runs.
pub async fn check_versions(tools: &[&str]) -> Result<()> {
    for tool in tools {
        let version = check_version(tool).await?;
        match TOOL_VERSIONS.get(tool) {
            Some(tested) => debug!("Found {} version {} (tested with {})", tool, version, tested),
            None => debug!("Found {} version {}", tool, version),
        }
    }
    Ok(())
}
