/// Summary metrics extracted from the pipeline's final outputs.

use std::path::Path;
use anyhow::{anyhow, Result};
use tokio::fs::File;
use tokio::io::{AsyncBufReadExt, BufReader};

const SAM_HEADER_MARKER: char = '@';
const VCF_COMMENT_MARKER: char = '#';
// SAM field 5 (1-indexed) is MAPQ; VCF field 6 is QUAL.
const SAM_MAPQ_FIELD: usize = 4;
const VCF_QUAL_FIELD: usize = 5;
const VCF_MISSING_QUAL: &str = ".";

#[derive(Debug, PartialEq)]
pub struct VcfMetrics {
    pub record_count: u64,
    pub mean_qual: Option<f64>,
}

/// Mean MAPQ over all alignment records of a text-form (SAM) alignment.
/// Returns `None` when the file holds no records, so callers can tell
/// "no reads" apart from a mean of zero.
pub async fn mean_mapq(sam_path: &Path) -> Result<Option<f64>> {
    let file = File::open(sam_path)
        .await
        .map_err(|e| anyhow!("Failed to open {}: {}", sam_path.display(), e))?;
    let mut lines = BufReader::new(file).lines();

    let mut sum: f64 = 0.0;
    let mut n: u64 = 0;
    while let Some(line) = lines.next_line().await? {
        if line.starts_with(SAM_HEADER_MARKER) || line.trim().is_empty() {
            continue;
        }
        let field = line.split('\t').nth(SAM_MAPQ_FIELD).ok_or_else(|| {
            anyhow!(
                "SAM record with fewer than {} fields in {}: '{}'",
                SAM_MAPQ_FIELD + 1,
                sam_path.display(),
                line
            )
        })?;
        let mapq: u64 = field
            .parse()
            .map_err(|e| anyhow!("Invalid MAPQ value '{}' in {}: {}", field, sam_path.display(), e))?;
        sum += mapq as f64;
        n += 1;
    }

    if n > 0 {
        Ok(Some(sum / n as f64))
    } else {
        Ok(None)
    }
}

/// Record count and mean QUAL of a VCF. Records with a missing QUAL (`.`)
/// are counted but excluded from the mean; a VCF with no data lines yields
/// a count of zero and no mean.
pub async fn vcf_metrics(vcf_path: &Path) -> Result<VcfMetrics> {
    let file = File::open(vcf_path)
        .await
        .map_err(|e| anyhow!("Failed to open {}: {}", vcf_path.display(), e))?;
    let mut lines = BufReader::new(file).lines();

    let mut record_count: u64 = 0;
    let mut qual_sum: f64 = 0.0;
    let mut qual_n: u64 = 0;
    while let Some(line) = lines.next_line().await? {
        if line.starts_with(VCF_COMMENT_MARKER) || line.trim().is_empty() {
            continue;
        }
        record_count += 1;
        let field = line.split('\t').nth(VCF_QUAL_FIELD).ok_or_else(|| {
            anyhow!(
                "VCF record with fewer than {} fields in {}: '{}'",
                VCF_QUAL_FIELD + 1,
                vcf_path.display(),
                line
            )
        })?;
        if field == VCF_MISSING_QUAL {
            continue;
        }
        let qual: f64 = field
            .parse()
            .map_err(|e| anyhow!("Invalid QUAL value '{}' in {}: {}", field, vcf_path.display(), e))?;
        qual_sum += qual;
        qual_n += 1;
    }

    let mean_qual = if qual_n > 0 {
        Some(qual_sum / qual_n as f64)
    } else {
        None
    };
    Ok(VcfMetrics {
        record_count,
        mean_qual,
    })
}
