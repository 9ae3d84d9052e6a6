//! W3C Data Quality Vocabulary export, serialized as Turtle.
//!
//! The dataset is a `dcat:Dataset`; each column is a `schema:PropertyValue`
//! linked through `schema:variableMeasured`. Every statistic becomes one
//! `dqv:QualityMeasurement` of a `dqv:Metric` that is defined once per
//! document. A `prov:Activity` records the extraction run.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use serde_json::Value;

use crate::error::{MetascribeError, Result};

use super::assembler::{ColumnRecord, ColumnStatsRecord, MetadataRecord};
use super::json::ensure_parent;

const DATASET_NS: &str = "http://example.org/dataset/";

const PREFIXES: &[(&str, &str)] = &[
    ("dqv", "http://www.w3.org/ns/dqv#"),
    ("dcat", "http://www.w3.org/ns/dcat#"),
    ("prov", "http://www.w3.org/ns/prov#"),
    ("dcterms", "http://purl.org/dc/terms/"),
    ("foaf", "http://xmlns.com/foaf/0.1/"),
    ("skos", "http://www.w3.org/2004/02/skos/core#"),
    ("schema", "http://schema.org/"),
    ("rdfs", "http://www.w3.org/2000/01/rdf-schema#"),
    ("xsd", "http://www.w3.org/2001/XMLSchema#"),
    ("dataset", DATASET_NS),
    ("metrics", "http://example.org/metrics/"),
];

const TOOL: &str = "dataset:MetadataExtractionTool";

// =============================================================================
// Metrics
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Metric {
    ColumnCount,
    DataType,
    MissingValues,
    UniqueValues,
    MeanValue,
    StandardDeviation,
    MinimumValue,
    MaximumValue,
}

impl Metric {
    const ALL: [Metric; 8] = [
        Metric::ColumnCount,
        Metric::DataType,
        Metric::MissingValues,
        Metric::UniqueValues,
        Metric::MeanValue,
        Metric::StandardDeviation,
        Metric::MinimumValue,
        Metric::MaximumValue,
    ];

    fn local_name(&self) -> &'static str {
        match self {
            Metric::ColumnCount => "columnCount",
            Metric::DataType => "dataType",
            Metric::MissingValues => "missingValues",
            Metric::UniqueValues => "uniqueValues",
            Metric::MeanValue => "meanValue",
            Metric::StandardDeviation => "standardDeviation",
            Metric::MinimumValue => "minimumValue",
            Metric::MaximumValue => "maximumValue",
        }
    }

    fn label(&self) -> &'static str {
        match self {
            Metric::ColumnCount => "Column Count",
            Metric::DataType => "Data Type",
            Metric::MissingValues => "Missing Values",
            Metric::UniqueValues => "Unique Values",
            Metric::MeanValue => "Mean Value",
            Metric::StandardDeviation => "Standard Deviation",
            Metric::MinimumValue => "Minimum Value",
            Metric::MaximumValue => "Maximum Value",
        }
    }

    fn description(&self) -> &'static str {
        match self {
            Metric::ColumnCount => "Total number of columns in the dataset",
            Metric::DataType => "Semantic data type of the column",
            Metric::MissingValues => "Number of missing/null values in the column",
            Metric::UniqueValues => "Number of unique values in the column",
            Metric::MeanValue => "Average value of the numerical column",
            Metric::StandardDeviation => "Standard deviation of the numerical column",
            Metric::MinimumValue => "Minimum value in the numerical column",
            Metric::MaximumValue => "Maximum value in the numerical column",
        }
    }

    fn dimension(&self) -> &'static str {
        match self {
            Metric::ColumnCount | Metric::MissingValues | Metric::UniqueValues => "dqv:completeness",
            Metric::DataType => "dqv:consistency",
            _ => "dqv:accuracy",
        }
    }

    fn iri(&self) -> String {
        format!("metrics:{}", self.local_name())
    }
}

struct Measurement {
    computed_on: String,
    metric: Metric,
    value: String,
}

// =============================================================================
// Rendering
// =============================================================================

/// Render the record as a Turtle document.
///
/// Blank nodes are numbered in emission order, so the same record always
/// renders to the same text.
pub fn to_turtle(record: &MetadataRecord) -> String {
    let dataset = resource_iri(&record.dataset_name, None);
    let mut out = String::new();

    for (prefix, ns) in PREFIXES {
        out.push_str(&format!("@prefix {}: <{}> .\n", prefix, ns));
    }
    out.push('\n');

    let mut measurements = vec![Measurement {
        computed_on: dataset.clone(),
        metric: Metric::ColumnCount,
        value: integer(record.columns.len()),
    }];
    let mut column_iris = Vec::with_capacity(record.columns.len());
    let mut column_blocks = String::new();

    for column in &record.columns {
        let iri = resource_iri(&record.dataset_name, Some(&column.name));
        column_blocks.push_str(&column_block(&iri, column));
        measurements.extend(column_measurements(&iri, column));
        column_iris.push(iri);
    }

    // Dataset
    let mut props = vec![("dcterms:title", literal(&record.dataset_name))];
    if let Some(description) = &record.dataset_description {
        props.push(("dcterms:description", literal(description)));
    }
    props.push(("dcterms:created", date_time(&record.generated_timestamp)));
    if !column_iris.is_empty() {
        props.push(("schema:variableMeasured", column_iris.join(", ")));
    }
    out.push_str(&block(&dataset, "dcat:Dataset", &props));

    // Metric definitions, each once
    for metric in Metric::ALL {
        if measurements.iter().any(|m| m.metric == metric) {
            out.push_str(&block(
                &metric.iri(),
                "dqv:Metric",
                &[
                    ("skos:prefLabel", literal(metric.label())),
                    ("dcterms:description", literal(metric.description())),
                    ("dqv:inDimension", metric.dimension().to_string()),
                ],
            ));
        }
    }

    out.push_str(&column_blocks);

    for (i, m) in measurements.iter().enumerate() {
        out.push_str(&block(
            &format!("_:m{}", i + 1),
            "dqv:QualityMeasurement",
            &[
                ("dqv:computedOn", m.computed_on.clone()),
                ("dqv:isMeasurementOf", m.metric.iri()),
                ("dqv:value", m.value.clone()),
            ],
        ));
    }

    // Provenance
    out.push_str(&block(
        "_:extraction",
        "prov:Activity",
        &[
            ("rdfs:label", literal("Dataset Metadata Extraction")),
            ("prov:startedAtTime", date_time(&record.generated_timestamp)),
            ("prov:used", dataset.clone()),
            ("prov:wasAssociatedWith", TOOL.to_string()),
        ],
    ));
    out.push_str(&block(
        TOOL,
        "prov:SoftwareAgent",
        &[
            ("rdfs:label", literal("Dataset Metadata Extraction Tool")),
            (
                "dcterms:description",
                literal(
                    "AI-powered tool for extracting dataset metadata with column descriptions and type classification",
                ),
            ),
            ("dcterms:hasVersion", literal(&record.tool_version)),
        ],
    ));

    out
}

/// Write the Turtle document, creating the parent directory if needed.
pub fn write_turtle(record: &MetadataRecord, path: impl AsRef<Path>) -> Result<()> {
    let path = path.as_ref();
    ensure_parent(path)?;

    let file = File::create(path).map_err(|e| {
        MetascribeError::Persistence(format!("Failed to create file '{}': {}", path.display(), e))
    })?;
    let mut writer = BufWriter::new(file);
    writer
        .write_all(to_turtle(record).as_bytes())
        .and_then(|_| writer.flush())
        .map_err(|e| {
            MetascribeError::Persistence(format!("Failed to write '{}': {}", path.display(), e))
        })?;

    tracing::info!(path = %path.display(), "wrote DQV metadata");
    Ok(())
}

fn column_block(iri: &str, column: &ColumnRecord) -> String {
    let mut props = vec![("schema:name", literal(&column.name))];
    if let Some(description) = &column.description {
        props.push(("schema:description", literal(description)));
    }
    if let Some(t) = column.semantic_type {
        props.push(("schema:valueReference", literal(t.as_str())));
    }
    block(iri, "schema:PropertyValue", &props)
}

fn column_measurements(iri: &str, column: &ColumnRecord) -> Vec<Measurement> {
    let measure = |metric: Metric, value: String| Measurement {
        computed_on: iri.to_string(),
        metric,
        value,
    };

    let mut out = Vec::new();
    if let Some(t) = column.semantic_type {
        out.push(measure(Metric::DataType, literal(t.as_str())));
    }
    out.push(measure(Metric::MissingValues, integer(column.missing_values)));
    out.push(measure(Metric::UniqueValues, integer(column.unique_values)));

    if let ColumnStatsRecord::Numeric { mean, std, min, max } = &column.stats {
        let numeric = [
            (Metric::MeanValue, mean),
            (Metric::StandardDeviation, std),
            (Metric::MinimumValue, min),
            (Metric::MaximumValue, max),
        ];
        for (metric, value) in numeric {
            if let Some(x) = value.as_f64() {
                out.push(measure(metric, double(x)));
            }
        }
    }
    out
}

/// One subject with its `rdf:type` and predicate list.
fn block(subject: &str, class: &str, props: &[(&str, String)]) -> String {
    let mut out = format!("{} a {}", subject, class);
    for (predicate, object) in props {
        out.push_str(&format!(" ;\n    {} {}", predicate, object));
    }
    out.push_str(" .\n\n");
    out
}

/// Full IRI for the dataset, or one of its columns.
///
/// Spaces and hyphens become underscores; other characters outside the
/// unreserved set are percent-encoded.
fn resource_iri(dataset: &str, column: Option<&str>) -> String {
    let mut path = clean_segment(dataset);
    if let Some(column) = column {
        path.push_str("/column/");
        path.push_str(&clean_segment(column));
    }
    format!("<{}{}>", DATASET_NS, path)
}

fn clean_segment(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.replace([' ', '-'], "_").chars() {
        if c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '~') {
            out.push(c);
        } else {
            let mut buf = [0u8; 4];
            for byte in c.encode_utf8(&mut buf).bytes() {
                out.push_str(&format!("%{:02X}", byte));
            }
        }
    }
    out
}

fn literal(text: &str) -> String {
    let mut out = String::with_capacity(text.len() + 2);
    out.push('"');
    for c in text.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\\""),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            _ => out.push(c),
        }
    }
    out.push('"');
    out
}

fn integer(n: usize) -> String {
    format!("\"{}\"^^xsd:integer", n)
}

fn double(x: f64) -> String {
    format!("\"{}\"^^xsd:double", Value::from(x))
}

fn date_time(ts: &str) -> String {
    format!("{}^^xsd:dateTime", literal(ts))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    use crate::export::{DatasetFields, FinalizedColumn, IncompletePolicy, MetadataAssembler};
    use crate::inference::StatisticsEngine;
    use crate::schema::{ColumnValues, SemanticType};

    fn column(name: &str, raw: &[&str], t: Option<SemanticType>, d: Option<&str>) -> FinalizedColumn {
        FinalizedColumn {
            name: name.into(),
            semantic_type: t,
            description: d.map(str::to_string),
            statistics: StatisticsEngine::new().compute(&ColumnValues::from_raw(raw.iter().copied())),
            confidence: None,
            confirmed: true,
        }
    }

    fn record(policy: IncompletePolicy, columns: &[FinalizedColumn]) -> MetadataRecord {
        let dataset = DatasetFields {
            name: "Customer Analytics-2024".into(),
            description: Some("Customer \"transactions\"\nwith demographics".into()),
            row_count: 7,
            column_count: columns.len(),
        };
        MetadataAssembler::new()
            .with_policy(policy)
            .assemble(&dataset, columns, Utc.with_ymd_and_hms(2024, 5, 1, 9, 30, 0).unwrap())
            .unwrap()
    }

    #[test]
    fn test_one_measurement_per_statistic() {
        let columns = vec![
            column(
                "age",
                &["18", "25", "30", "45", "62", "18", "25"],
                Some(SemanticType::Continuous),
                Some("Age in years."),
            ),
            column("sex", &["M", "F", "M", "M", "F", "M", "F"], Some(SemanticType::Binary), Some("Sex.")),
        ];
        let ttl = to_turtle(&record(IncompletePolicy::Exclude, &columns));

        // column count + (type, missing, unique) x 2 + mean, std, min, max
        assert_eq!(ttl.matches("a dqv:QualityMeasurement").count(), 1 + 3 * 2 + 4);
        assert_eq!(ttl.matches("a dqv:Metric").count(), 8);
        assert_eq!(ttl.matches("metrics:meanValue a dqv:Metric").count(), 1);
        assert!(ttl.contains("dqv:value \"62.0\"^^xsd:double"));
        assert!(ttl.contains("dqv:value \"2\"^^xsd:integer"));
        assert!(ttl.contains("dqv:value \"binary\""));
    }

    #[test]
    fn test_dataset_and_columns() {
        let columns = vec![column("patient id", &["A1", "A2"], Some(SemanticType::Identifier), Some("Key."))];
        let ttl = to_turtle(&record(IncompletePolicy::Exclude, &columns));

        assert!(ttl.starts_with("@prefix dqv: <http://www.w3.org/ns/dqv#> .\n"));
        assert!(ttl.contains(
            "<http://example.org/dataset/Customer_Analytics_2024> a dcat:Dataset ;\n    dcterms:title \"Customer Analytics-2024\""
        ));
        assert!(ttl.contains("dcterms:description \"Customer \\\"transactions\\\"\\nwith demographics\""));
        assert!(ttl.contains("dcterms:created \"2024-05-01T09:30:00Z\"^^xsd:dateTime"));
        assert!(ttl.contains(
            "schema:variableMeasured <http://example.org/dataset/Customer_Analytics_2024/column/patient_id>"
        ));
        assert!(ttl.contains("schema:valueReference \"identifier\""));
        assert!(ttl.contains("prov:wasAssociatedWith dataset:MetadataExtractionTool"));
        // No numeric column, so no accuracy metrics.
        assert!(!ttl.contains("metrics:meanValue"));
    }

    #[test]
    fn test_flagged_column_has_no_type_measurement() {
        let columns = vec![column("notes", &["a b", "c d"], None, None)];
        let ttl = to_turtle(&record(IncompletePolicy::Flag, &columns));

        assert!(!ttl.contains("metrics:dataType"));
        assert!(!ttl.contains("schema:valueReference"));
        assert_eq!(ttl.matches("a dqv:QualityMeasurement").count(), 3);
    }

    #[test]
    fn test_deterministic() {
        let columns = vec![column("x", &["1", "2"], Some(SemanticType::Binary), Some("X."))];
        let r = record(IncompletePolicy::Exclude, &columns);
        assert_eq!(to_turtle(&r), to_turtle(&r));
    }

    #[test]
    fn test_clean_segment_encodes_reserved() {
        assert_eq!(clean_segment("a b-c"), "a_b_c");
        assert_eq!(clean_segment("x/y"), "x%2Fy");
        assert_eq!(clean_segment("é"), "%C3%A9");
    }
}
