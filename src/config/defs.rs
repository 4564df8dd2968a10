use std::collections::HashMap;
use std::path::PathBuf;
use lazy_static::lazy_static;
use log::LevelFilter;
use thiserror::Error;
use crate::cli::Arguments;

// External software
pub const HISAT2_TAG: &str = "hisat2";
pub const SAMTOOLS_TAG: &str = "samtools";
pub const PICARD_TAG: &str = "picard";
pub const GATK_TAG: &str = "gatk";

lazy_static! {
    pub static ref TOOL_VERSIONS: HashMap<&'static str, f32> = {
        let mut m = HashMap::new();
        m.insert(HISAT2_TAG, 2.2);
        m.insert(SAMTOOLS_TAG, 1.20);
        m.insert(PICARD_TAG, 3.1);
        m.insert(GATK_TAG, 4.5);

        m
    };
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SamtoolsSubcommand {
    Sort,
    Index,
    View,
}

impl SamtoolsSubcommand {
    pub fn tag(&self) -> &'static str {
        match self {
            SamtoolsSubcommand::Sort => "sort",
            SamtoolsSubcommand::Index => "index",
            SamtoolsSubcommand::View => "view",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PicardSubcommand {
    AddOrReplaceReadGroups,
    MarkDuplicates,
}

impl PicardSubcommand {
    pub fn tag(&self) -> &'static str {
        match self {
            PicardSubcommand::AddOrReplaceReadGroups => "AddOrReplaceReadGroups",
            PicardSubcommand::MarkDuplicates => "MarkDuplicates",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum GatkSubcommand {
    BaseRecalibrator,
    ApplyBqsr,
    HaplotypeCaller,
}

impl GatkSubcommand {
    pub fn tag(&self) -> &'static str {
        match self {
            GatkSubcommand::BaseRecalibrator => "BaseRecalibrator",
            GatkSubcommand::ApplyBqsr => "ApplyBQSR",
            GatkSubcommand::HaplotypeCaller => "HaplotypeCaller",
        }
    }
}

// Read-group fields required by the gatk variant caller
pub const RG_ID: &str = "1";
pub const RG_LIBRARY: &str = "lib1";
pub const RG_PLATFORM: &str = "illumina";
pub const RG_SAMPLE: &str = "Sample1";
pub const RG_UNIT: &str = "unit1";

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Stage '{stage}' requires missing input: {path}")]
    MissingStageInput { stage: String, path: PathBuf },

    #[error("Stage '{stage}' ({tool}) did not produce expected output: {path}")]
    MissingStageOutput {
        stage: String,
        tool: String,
        path: PathBuf,
    },

    #[error("{tool} failed: {error}")]
    ToolExecution { tool: String, error: String },

    #[error("Metric extraction failed: {0}")]
    MetricExtraction(String),
}

pub struct RunConfig {
    pub cwd: PathBuf,
    pub args: Arguments,
    pub log_level: LevelFilter,
}
