//! Operon context lookup against NCBI eutils.
//!
//! Rebuilds the genome neighborhood ("operon") for a regulator protein: the
//! IPG report gives the regulator's coding-sequence coordinates, the nuccore
//! CDS FASTA gives the neighboring genes, and a strand-aware walk picks the
//! genes that are plausibly co-transcribed. Parsing and the walk are pure;
//! only the two fetches do I/O.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;

use crate::config::config;

/// Neighbors starting further than this from the regulator are never
/// considered co-transcribed.
const MAX_NEIGHBOR_DISTANCE: i64 = 8000;

#[derive(Debug, thiserror::Error)]
pub enum OperonError {
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("eutils returned status {0}")]
    BadStatus(reqwest::StatusCode),
    #[error("no CDS entry in the IPG report for {0}")]
    MissingCds(String),
    #[error("regulator {0} not found in genome {1}")]
    RegulatorNotFound(String, String),
}

/// Strand a coding sequence is read from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Strand {
    #[serde(rename = "+")]
    Forward,
    #[serde(rename = "-")]
    Reverse,
}

impl Strand {
    fn from_symbol(symbol: &str) -> Option<Self> {
        match symbol {
            "+" => Some(Strand::Forward),
            "-" => Some(Strand::Reverse),
            _ => None,
        }
    }
}

/// Coding-sequence coordinates extracted from an IPG report. `start` and
/// `stop` stay strings here because they are matched as substrings against
/// FASTA headers, not interpreted numerically.
#[derive(Debug, Clone, PartialEq)]
pub struct CdsLocation {
    pub accver: String,
    pub start: String,
    pub stop: String,
    pub strand: Strand,
}

/// One gene parsed from a `fasta_cds_aa` header line.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GeneMeta {
    pub alias: String,
    pub description: String,
    pub link: String,
    pub direction: Strand,
    pub start: u64,
    pub stop: u64,
}

/// Operon lookup result as served to the catalog.
#[derive(Debug, Clone, Serialize)]
pub struct OperonContext {
    pub operon: Vec<GeneMeta>,
    #[serde(rename = "regIndex")]
    pub reg_index: usize,
    pub genome: String,
}

static CDS_ELEMENT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"<CDS\b([^>]*?)/?>").expect("CDS element pattern"));
static XML_ATTR: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"(\w+)="([^"]*)""#).expect("attribute pattern"));
static NON_DIGIT: Lazy<Regex> = Lazy::new(|| Regex::new(r"\D").expect("digit filter pattern"));

/// Pull the first `<CDS>` element's coordinates out of an IPG efetch report.
/// The report is a full XML document but a single element's attributes are
/// all that matters here.
pub fn parse_ipg_report(xml: &str) -> Option<CdsLocation> {
    let attributes = CDS_ELEMENT.captures(xml)?.get(1)?.as_str();

    let mut accver = None;
    let mut start = None;
    let mut stop = None;
    let mut strand = None;
    for attr in XML_ATTR.captures_iter(attributes) {
        let value = attr[2].to_owned();
        match &attr[1] {
            "accver" => accver = Some(value),
            "start" => start = Some(value),
            "stop" => stop = Some(value),
            "strand" => strand = Strand::from_symbol(&value),
            _ => {}
        }
    }

    Some(CdsLocation {
        accver: accver?,
        start: start?,
        stop: stop?,
        strand: strand?,
    })
}

/// Collect the FASTA header lines (one per gene, in genome order) from a
/// `fasta_cds_aa` payload.
pub fn collect_headers(fasta: &str) -> Vec<String> {
    fasta
        .lines()
        .filter(|line| line.starts_with('>'))
        .map(str::to_owned)
        .collect()
}

/// Find the regulator's gene among the headers by its CDS coordinates.
pub fn locate_regulator(headers: &[String], start: &str, stop: &str) -> Option<usize> {
    headers
        .iter()
        .position(|header| header.contains(start) && header.contains(stop))
}

/// Parse one CDS FASTA header into gene metadata. Returns `None` when the
/// header carries no usable location, which terminates a neighbor walk.
pub fn parse_fasta_header(header: &str) -> Option<GeneMeta> {
    let mut alias = String::new();
    let mut description = String::new();
    let mut link = String::new();
    let mut location = None;

    for field in header.split(" [") {
        if let Some(rest) = field.strip_prefix("locus_tag=") {
            alias = rest.trim_end_matches(']').to_owned();
        } else if let Some(rest) = field.strip_prefix("protein=") {
            description = rest.trim_end_matches(']').replace('\'', "");
        } else if let Some(rest) = field.strip_prefix("protein_id=") {
            link = rest.trim_end_matches(']').to_owned();
        } else if let Some(rest) = field.strip_prefix("location=") {
            location = parse_location(rest.trim_end_matches(']'));
        }
    }

    let (direction, start, stop) = location?;
    Some(GeneMeta {
        alias,
        description,
        link,
        direction,
        start,
        stop,
    })
}

fn parse_location(raw: &str) -> Option<(Strand, u64, u64)> {
    let (direction, span) = match raw.strip_prefix("complement(") {
        Some(inner) => (Strand::Reverse, inner.trim_end_matches(')')),
        None => (Strand::Forward, raw),
    };
    let (start, stop) = span.split_once("..")?;
    // Coordinates may carry partial-CDS markers like `<` and `>`.
    let start = NON_DIGIT.replace_all(start, "").parse().ok()?;
    let stop = NON_DIGIT.replace_all(stop, "").parse().ok()?;
    Some((direction, start, stop))
}

/// Assemble the operon around the regulator at `index`.
///
/// Inclusion rules, applied in both directions:
/// - immediately adjacent genes are always taken;
/// - co-directional runs are followed;
/// - a gene expressed divergently from the regulator switches the tracked
///   strand so the divergent run is captured too (it may be another
///   regulator);
/// - convergent genes, genes starting more than 8 kb away, and unparseable
///   headers stop the walk.
///
/// Returns the gene list and the regulator's index within it.
pub fn assemble_operon(
    headers: &[String],
    index: usize,
    seq_start: u64,
    strand: Strand,
) -> (Vec<GeneMeta>, usize) {
    let mut genes: Vec<GeneMeta> = Vec::new();

    if index > 0 {
        if let Some(down) = parse_fasta_header(&headers[index - 1]) {
            let mut gene_strand = strand;
            if strand == Strand::Forward && down.direction == Strand::Reverse {
                gene_strand = down.direction;
            }
            let mut downstream = vec![down.clone()];
            extend_run(
                headers,
                gene_strand,
                -1,
                down,
                &mut downstream,
                (index - 1) as i64,
                seq_start as i64,
            );
            downstream.reverse();
            genes = downstream;
        }
    }

    if let Some(regulator) = parse_fasta_header(&headers[index]) {
        genes.push(regulator);
    }
    let regulator_index = genes.len().saturating_sub(1);

    if index + 1 < headers.len() {
        if let Some(up) = parse_fasta_header(&headers[index + 1]) {
            let mut gene_strand = strand;
            if strand == Strand::Reverse && up.direction == Strand::Forward {
                gene_strand = up.direction;
            }
            genes.push(up.clone());
            extend_run(
                headers,
                gene_strand,
                1,
                up,
                &mut genes,
                (index + 1) as i64,
                seq_start as i64,
            );
        }
    }

    (genes, regulator_index)
}

fn extend_run(
    headers: &[String],
    gene_strand: Strand,
    step: i64,
    mut current: GeneMeta,
    genes: &mut Vec<GeneMeta>,
    mut index: i64,
    seq_start: i64,
) {
    while gene_strand == current.direction {
        let next_index = index + step;
        if next_index < 0 || next_index as usize >= headers.len() {
            break;
        }
        let Some(next) = parse_fasta_header(&headers[next_index as usize]) else {
            break;
        };
        if (seq_start - next.start as i64).abs() > MAX_NEIGHBOR_DISTANCE {
            break;
        }

        if gene_strand == Strand::Reverse && next.direction == Strand::Forward && step > 0 {
            genes.push(next.clone());
        } else if gene_strand == Strand::Forward && next.direction == Strand::Reverse && step < 0 {
            genes.push(next.clone());
        } else if gene_strand == next.direction {
            genes.push(next.clone());
        }
        index = next_index;
        current = next;
    }
}

pub struct OperonService {
    client: reqwest::Client,
    base_url: String,
}

impl OperonService {
    pub fn new() -> Result<Self, OperonError> {
        let http = &config().http;
        let client = reqwest::Client::builder()
            .user_agent(http.user_agent.clone())
            .timeout(std::time::Duration::from_secs(http.timeout_secs))
            .build()?;
        Ok(Self {
            client,
            base_url: http.eutils_base_url.clone(),
        })
    }

    /// Point the service at a different eutils endpoint (local stubs).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Full lookup: protein accession to operon gene list plus the
    /// regulator's index within it.
    pub async fn operon_context(&self, accession: &str) -> Result<OperonContext, OperonError> {
        tracing::info!(accession, "fetching operon context");

        let cds = self.fetch_cds(accession).await?;
        let fasta = self.fetch_genome(&cds.accver).await?;
        let headers = collect_headers(&fasta);
        tracing::debug!(genes = headers.len(), genome = %cds.accver, "genome fetched");

        let index = locate_regulator(&headers, &cds.start, &cds.stop)
            .ok_or_else(|| OperonError::RegulatorNotFound(accession.to_owned(), cds.accver.clone()))?;
        let regulator = parse_fasta_header(&headers[index])
            .ok_or_else(|| OperonError::RegulatorNotFound(accession.to_owned(), cds.accver.clone()))?;

        let (operon, reg_index) =
            assemble_operon(&headers, index, regulator.start, regulator.direction);
        tracing::info!(genes = operon.len(), reg_index, "operon assembled");

        Ok(OperonContext {
            operon,
            reg_index,
            genome: cds.accver,
        })
    }

    async fn fetch_cds(&self, accession: &str) -> Result<CdsLocation, OperonError> {
        let response = self
            .client
            .get(format!("{}/efetch.fcgi", self.base_url))
            .query(&[("db", "protein"), ("id", accession), ("rettype", "ipg")])
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(OperonError::BadStatus(response.status()));
        }
        let body = response.text().await?;
        parse_ipg_report(&body).ok_or_else(|| OperonError::MissingCds(accession.to_owned()))
    }

    async fn fetch_genome(&self, accver: &str) -> Result<String, OperonError> {
        let response = self
            .client
            .get(format!("{}/efetch.fcgi", self.base_url))
            .query(&[("db", "nuccore"), ("id", accver), ("rettype", "fasta_cds_aa")])
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(OperonError::BadStatus(response.status()));
        }
        Ok(response.text().await?)
    }
}
