use std::path::{Path, PathBuf};

/// Naming-convention contract for one sample: every intermediate file name
/// is a pure function of the sample name, derived in one place so that a
/// rename touches nothing but this type.
#[derive(Debug, Clone)]
pub struct SamplePaths {
    dir: PathBuf,
    sample: String,
}

impl SamplePaths {
    pub fn new(dir: &Path, sample: &str) -> Self {
        SamplePaths {
            dir: dir.to_path_buf(),
            sample: sample.to_string(),
        }
    }

    pub fn sample(&self) -> &str {
        &self.sample
    }

    fn named(&self, name: String) -> PathBuf {
        self.dir.join(name)
    }

    pub fn fastq_r1(&self) -> PathBuf {
        self.named(format!("{}_1.fastq", self.sample))
    }

    pub fn fastq_r2(&self) -> PathBuf {
        self.named(format!("{}_2.fastq", self.sample))
    }

    pub fn raw_bam(&self) -> PathBuf {
        self.named(format!("{}.bam", self.sample))
    }

    pub fn sorted_bam(&self) -> PathBuf {
        self.named(format!("{}_sorted.bam", self.sample))
    }

    pub fn read_group_bam(&self) -> PathBuf {
        self.named(format!("{}_sorted_rg.bam", self.sample))
    }

    pub fn marked_dups_bam(&self) -> PathBuf {
        self.named(format!("{}_marked_dups.bam", self.sample))
    }

    pub fn marked_dups_metrics(&self) -> PathBuf {
        self.named(format!("{}_marked_dups_metrics.txt", self.sample))
    }

    pub fn dups_sorted_bam(&self) -> PathBuf {
        self.named(format!("{}_dups_sorted.bam", self.sample))
    }

    pub fn dups_sorted_bai(&self) -> PathBuf {
        self.named(format!("{}_dups_sorted.bam.bai", self.sample))
    }

    pub fn recal_report(&self) -> PathBuf {
        self.named(format!("recal_{}.report", self.sample))
    }

    pub fn recal_bam(&self) -> PathBuf {
        self.named(format!("{}_recal.bam", self.sample))
    }

    pub fn recal_sam(&self) -> PathBuf {
        self.named(format!("{}_recal.sam", self.sample))
    }

    pub fn vcf(&self) -> PathBuf {
        self.named(format!("{}.vcf", self.sample))
    }
}
