use clap::Parser;

#[derive(Parser, Debug, Clone, Default)]
#[command(name = "seqtovar-pipelines", version = "0.1.0")]
pub struct Arguments {

    #[arg(short = 'i', long = "input_sample_name", help = "Base sample name")]
    pub input_sample_name: String,

    #[arg(short = 'r', long = "input_ref_name", help = "Name of the hisat2 index")]
    pub input_ref_name: String,

    #[arg(short = 'v', long = "input_vcf_ref_loc", help = "Relative or absolute location of the reference sequence for gatk")]
    pub input_vcf_ref_loc: String,

    #[arg(short = 'k', long = "known_indels_file", help = "Name of the known indels file for base recalibration")]
    pub known_indels_file: String,

    #[arg(short = 's', long = "known_snps_file", help = "Name of the known SNPs file for base recalibration")]
    pub known_snps_file: String,

    #[arg(long = "verbose", action)]
    pub verbose: bool,

    #[arg(long, default_value_t = 4)]
    pub threads: usize,
}
