//! Main annotation pipeline.
//!
//! Statistics → heuristic guess → prompts → LLM → parsed suggestion, one
//! column at a time. LLM failures never abort a dataset: the column keeps
//! its heuristic type and a placeholder description for human review.

use std::fs;
use std::path::Path;
use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::annotation::{AnnotationSession, ColumnAnnotation, DatasetInfo, DescriptionOrigin, SampleRows};
use crate::config::MetascribeConfig;
use crate::error::{MetascribeError, Result};
use crate::inference::{HeuristicDetector, StatisticsEngine};
use crate::input::{ContextExtractor, DataTable, Parser, PlainTextExtractor, SourceMetadata};
use crate::llm::{
    ColumnProfile, Description, GenerationParams, LlmProvider, PromptBuilder, TypeClassification,
    parse_classification, parse_description, placeholder_description,
};

/// The annotation engine.
pub struct Annotator {
    config: MetascribeConfig,
    parser: Parser,
    statistics: StatisticsEngine,
    detector: HeuristicDetector,
    prompts: PromptBuilder,
    extractor: Box<dyn ContextExtractor + Send + Sync>,
    llm_provider: Option<Arc<dyn LlmProvider>>,
}

impl Annotator {
    /// Create an annotator with default configuration and no LLM.
    pub fn new() -> Self {
        Self::with_config(MetascribeConfig::default())
    }

    /// Create an annotator with custom configuration.
    ///
    /// The provider named in the configuration is not built here; see
    /// [`LlmSettings::build_provider`](crate::config::LlmSettings::build_provider).
    pub fn with_config(config: MetascribeConfig) -> Self {
        let statistics = StatisticsEngine::new().with_sample_size(config.prompts.max_sample_values);
        let detector = HeuristicDetector::with_config(config.heuristics.clone());
        let prompts = PromptBuilder::with_config(config.prompts.clone());

        Self {
            config,
            parser: Parser::new(),
            statistics,
            detector,
            prompts,
            extractor: Box::new(PlainTextExtractor::new()),
            llm_provider: None,
        }
    }

    /// Add an LLM provider for descriptions and type refinement.
    pub fn with_llm(mut self, provider: Arc<dyn LlmProvider>) -> Self {
        self.llm_provider = Some(provider);
        self
    }

    /// Replace the context document extractor.
    pub fn with_extractor(mut self, extractor: impl ContextExtractor + Send + Sync + 'static) -> Self {
        self.extractor = Box::new(extractor);
        self
    }

    pub fn config(&self) -> &MetascribeConfig {
        &self.config
    }

    pub fn has_llm(&self) -> bool {
        self.llm_provider.is_some()
    }

    /// Parse a data file, enforcing the configured size limit.
    pub fn load(&self, path: impl AsRef<Path>) -> Result<(DataTable, SourceMetadata)> {
        let path = path.as_ref();
        let size = fs::metadata(path)
            .map_err(|e| MetascribeError::Io {
                path: path.to_path_buf(),
                source: e,
            })?
            .len();
        let limit = self.config.input.max_file_size_mb.saturating_mul(1024 * 1024);
        if size > limit {
            return Err(MetascribeError::UnsupportedFormat(format!(
                "'{}' is {:.1} MB, above the {} MB limit",
                path.display(),
                size as f64 / (1024.0 * 1024.0),
                self.config.input.max_file_size_mb
            )));
        }
        self.parser.parse_file(path)
    }

    /// Statistics and heuristic guess for one column of a table.
    pub fn profile_column(&self, table: &DataTable, name: &str) -> Result<ColumnAnnotation> {
        let position = table
            .column_index(name)
            .ok_or_else(|| MetascribeError::ColumnNotFound(name.to_string()))?;
        let values = table.typed_column(name)?;
        let stats = self.statistics.compute(&values);
        let guess = self.detector.detect_named(name, values.kind(), &stats);

        debug!(
            column = name,
            kind = %values.kind(),
            heuristic = %guess.semantic_type,
            rule = guess.rule.describe(),
            "profiled column"
        );

        Ok(ColumnAnnotation::new(name, position, stats, guess))
    }

    /// Profile every column of an in-memory table into a pending session.
    pub fn start_session(
        &self,
        table: &DataTable,
        source: SourceMetadata,
        name: Option<&str>,
        description: Option<&str>,
    ) -> Result<AnnotationSession> {
        let columns = table
            .headers
            .iter()
            .map(|header| self.profile_column(table, header))
            .collect::<Result<Vec<_>>>()?;

        let name = name
            .map(str::to_string)
            .filter(|n| !n.trim().is_empty())
            .unwrap_or_else(|| source.stem());
        let dataset = DatasetInfo::new(name, table.row_count(), table.column_count())
            .with_description(description.map(str::to_string));
        let sample = SampleRows {
            headers: table.headers.clone(),
            rows: table.head(self.config.prompts.sample_rows).to_vec(),
        };

        Ok(AnnotationSession::new(dataset, source, columns).with_sample(sample))
    }

    /// Load, profile and annotate a data file in one go.
    pub fn annotate_file(
        &self,
        path: impl AsRef<Path>,
        name: Option<&str>,
        description: Option<&str>,
    ) -> Result<AnnotationSession> {
        let (table, source) = self.load(path)?;
        let mut session = self.start_session(&table, source, name, description)?;
        self.annotate_all(&mut session)?;
        Ok(session)
    }

    /// Attach a supplementary document to the session's prompts.
    pub fn add_context(&self, session: &mut AnnotationSession, path: impl AsRef<Path>) -> Result<()> {
        let document = self.extractor.extract(path.as_ref())?;
        info!(document = %document.name, chars = document.text.len(), "added context document");
        session.context.push(document);
        session.touch();
        Ok(())
    }

    /// Annotate every unconfirmed column in order.
    pub fn annotate_all(&self, session: &mut AnnotationSession) -> Result<()> {
        let names: Vec<String> = session.unconfirmed().iter().map(|c| c.name.clone()).collect();
        for name in names {
            self.annotate_column(session, &name)?;
        }
        Ok(())
    }

    /// Ask the LLM for a description and a type for one column.
    ///
    /// Without a provider the column stays pending. Confirmed columns are left alone.
    pub fn annotate_column(&self, session: &mut AnnotationSession, column: &str) -> Result<()> {
        let Some(llm) = self.llm_provider.as_deref() else {
            debug!(column, "no LLM configured, keeping heuristic guess");
            return Ok(());
        };

        let Some((classification, description)) = self.suggest(llm, session, column)? else {
            debug!(column, "already confirmed, skipping");
            return Ok(());
        };

        info!(
            column,
            semantic_type = %classification.semantic_type(),
            confidence = ?classification.confidence(),
            "annotated column"
        );
        session.column_mut(column)?.apply_suggestion(classification, description);
        session.touch();
        Ok(())
    }

    /// Description and classification calls for one column; `None` when confirmed.
    fn suggest(
        &self,
        llm: &dyn LlmProvider,
        session: &AnnotationSession,
        column: &str,
    ) -> Result<Option<(TypeClassification, Option<Description>)>> {
        let col = session
            .column(column)
            .ok_or_else(|| MetascribeError::ColumnNotFound(column.to_string()))?;
        if col.status.is_decided() {
            return Ok(None);
        }

        let ctx = session.prompt_context(column);
        let profile = profile_of(col);
        let params = llm.config().generation_params();

        let description = if col.description_origin == Some(DescriptionOrigin::Human) {
            None
        } else {
            let prompt = self.prompts.description_prompt(&ctx, &profile);
            self.log_prompt(column, "description", &prompt);
            match self.call(llm, &prompt, &params, column)? {
                Ok(raw) => Some(parse_description(&raw, column)),
                Err(err) => {
                    // Endpoint unavailable; skip the classification call.
                    let placeholder = Description {
                        text: placeholder_description(column),
                        is_placeholder: true,
                    };
                    let classification = TypeClassification::from_provider_error(&col.heuristic, &err);
                    return Ok(Some((classification, Some(placeholder))));
                }
            }
        };

        let current = description
            .as_ref()
            .map(|d| d.text.as_str())
            .or(col.description.as_deref());
        let prompt = self.prompts.classification_prompt(&ctx, &profile, current);
        self.log_prompt(column, "classification", &prompt);
        let classification = match self.call(llm, &prompt, &params, column)? {
            Ok(raw) => parse_classification(&raw, &col.heuristic),
            Err(err) => TypeClassification::from_provider_error(&col.heuristic, &err),
        };

        Ok(Some((classification, description)))
    }

    /// Re-run type classification using the column's current description.
    pub fn reclassify(&self, session: &mut AnnotationSession, column: &str) -> Result<()> {
        let Some(llm) = self.llm_provider.as_deref() else {
            return Err(MetascribeError::Config(
                "re-classification needs an LLM provider".to_string(),
            ));
        };

        let classification = {
            let col = session
                .column(column)
                .ok_or_else(|| MetascribeError::ColumnNotFound(column.to_string()))?;
            let ctx = session.prompt_context(column);
            let prompt =
                self.prompts
                    .classification_prompt(&ctx, &profile_of(col), col.description.as_deref());
            self.log_prompt(column, "classification", &prompt);
            match self.call(llm, &prompt, &llm.config().generation_params(), column)? {
                Ok(raw) => parse_classification(&raw, &col.heuristic),
                Err(err) => TypeClassification::from_provider_error(&col.heuristic, &err),
            }
        };

        info!(column, semantic_type = %classification.semantic_type(), "re-classified column");
        session.column_mut(column)?.apply_reclassification(classification);
        session.touch();
        Ok(())
    }

    /// One provider call. The outer error is fatal, the inner one is recoverable.
    fn call(
        &self,
        llm: &dyn LlmProvider,
        prompt: &str,
        params: &GenerationParams,
        column: &str,
    ) -> Result<std::result::Result<String, MetascribeError>> {
        match llm.generate(prompt, params) {
            Ok(raw) => {
                if self.config.logging.show_prompts {
                    debug!(column, provider = llm.name(), reply = %raw, "LLM reply");
                }
                Ok(Ok(raw))
            }
            Err(err) if err.is_recoverable() => {
                warn!(column, provider = llm.name(), error = %err, "AI suggestion unavailable");
                Ok(Err(err))
            }
            Err(err) => Err(err),
        }
    }

    fn log_prompt(&self, column: &str, kind: &str, prompt: &str) {
        if self.config.logging.show_prompts {
            debug!(column, kind, prompt = %prompt, "LLM prompt");
        }
    }
}

impl Default for Annotator {
    fn default() -> Self {
        Self::new()
    }
}

fn profile_of(col: &ColumnAnnotation) -> ColumnProfile<'_> {
    ColumnProfile {
        name: &col.name,
        kind: col.kind,
        statistics: &col.statistics,
        heuristic: &col.heuristic,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    use crate::annotation::{AI_UNAVAILABLE, AnnotationStatus};
    use crate::llm::{MockProvider, MockReply};
    use crate::schema::SemanticType;

    fn create_test_file(content: &str) -> NamedTempFile {
        let mut file = tempfile::Builder::new().suffix(".csv").tempfile().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file.flush().unwrap();
        file
    }

    const PATIENTS: &str = "age,sex,patient_id\n18,M,A001\n25,F,A002\n30,M,A003\n45,M,A004\n62,F,A005\n";

    #[test]
    fn test_without_llm_columns_stay_pending() {
        let file = create_test_file(PATIENTS);
        let session = Annotator::new().annotate_file(file.path(), Some("patients"), None).unwrap();

        assert_eq!(session.dataset.name, "patients");
        assert_eq!(session.columns.len(), 3);
        assert!(session.columns.iter().all(|c| c.status == AnnotationStatus::Pending));
        assert_eq!(session.column("sex").unwrap().heuristic.semantic_type, SemanticType::Binary);
        assert_eq!(
            session.column("patient_id").unwrap().heuristic.semantic_type,
            SemanticType::Identifier
        );
    }

    #[test]
    fn test_mock_llm_annotates_every_column() {
        let file = create_test_file(PATIENTS);
        let mock = Arc::new(MockProvider::new());
        let annotator = Annotator::new().with_llm(mock.clone());
        let session = annotator.annotate_file(file.path(), None, None).unwrap();

        assert!(session.columns.iter().all(|c| c.status == AnnotationStatus::Suggested));
        assert!(session.columns.iter().all(|c| c.is_complete()));
        assert_eq!(
            session.column("sex").unwrap().description.as_deref(),
            Some("This column records the sex of each record.")
        );
        // two calls per column
        assert_eq!(mock.prompts().len(), 6);
        // later prompts see earlier columns
        assert!(mock.prompts()[4].contains("- age ("));
    }

    #[test]
    fn test_timeout_falls_back_to_heuristic() {
        let file = create_test_file(PATIENTS);
        let mock = Arc::new(MockProvider::new().with_timeouts(3));
        let annotator = Annotator::new().with_llm(mock.clone());
        let session = annotator.annotate_file(file.path(), None, None).unwrap();

        let sex = session.column("sex").unwrap();
        assert_eq!(sex.semantic_type, Some(SemanticType::Binary));
        assert_eq!(
            sex.description.as_deref(),
            Some("This column represents sex data in the dataset.")
        );
        assert_eq!(sex.description_origin, Some(DescriptionOrigin::Placeholder));
        assert!(sex.warnings.iter().any(|w| w == AI_UNAVAILABLE));
        // one timed-out call per column, no retry of the classification
        assert_eq!(mock.prompts().len(), 3);
    }

    #[test]
    fn test_empty_description_reply_still_classifies() {
        let file = create_test_file("sex\nM\nF\nM\n");
        let mock = Arc::new(
            MockProvider::new()
                .with_text("")
                .with_text(r#"{"type": "categorical", "confidence": {"categorical": 0.7}}"#),
        );
        let annotator = Annotator::new().with_llm(mock.clone());
        let session = annotator.annotate_file(file.path(), None, None).unwrap();

        assert_eq!(mock.prompts().len(), 2);
        let sex = session.column("sex").unwrap();
        assert_eq!(sex.description_origin, Some(DescriptionOrigin::Placeholder));
        assert_eq!(sex.semantic_type, Some(SemanticType::Categorical));
        assert_eq!(sex.confidence_score(), Some(0.7));
    }

    #[test]
    fn test_human_description_not_regenerated() {
        let file = create_test_file(PATIENTS);
        let mock = Arc::new(MockProvider::new());
        let annotator = Annotator::new().with_llm(mock.clone());
        let (table, source) = annotator.load(file.path()).unwrap();
        let mut session = annotator.start_session(&table, source, None, None).unwrap();

        session.edit_description("age", "Age at enrolment in years.").unwrap();
        annotator.annotate_column(&mut session, "age").unwrap();

        assert_eq!(mock.prompts().len(), 1);
        assert!(mock.prompts()[0].contains("Description: Age at enrolment in years."));
        assert_eq!(
            session.column("age").unwrap().description.as_deref(),
            Some("Age at enrolment in years.")
        );
    }

    #[test]
    fn test_reclassify_replaces_type() {
        let file = create_test_file(PATIENTS);
        let mock = Arc::new(
            MockProvider::new()
                .with_text("Sex of the patient.")
                .with_text(r#"{"type": "binary", "confidence": 0.9}"#)
                .with_text(r#"{"type": "categorical", "confidence": {"categorical": 0.7}}"#),
        );
        let annotator = Annotator::new().with_llm(mock);
        let (table, source) = annotator.load(file.path()).unwrap();
        let mut session = annotator.start_session(&table, source, None, None).unwrap();

        annotator.annotate_column(&mut session, "sex").unwrap();
        assert_eq!(session.column("sex").unwrap().semantic_type, Some(SemanticType::Binary));

        session.edit_description("sex", "Gender identity, free choice of labels.").unwrap();
        annotator.reclassify(&mut session, "sex").unwrap();

        let sex = session.column("sex").unwrap();
        assert_eq!(sex.semantic_type, Some(SemanticType::Categorical));
        assert_eq!(sex.confidence_score(), Some(0.7));
        assert_eq!(sex.status, AnnotationStatus::Edited);
    }

    #[test]
    fn test_reclassify_without_llm_is_error() {
        let file = create_test_file(PATIENTS);
        let annotator = Annotator::new();
        let mut session = annotator.annotate_file(file.path(), None, None).unwrap();
        assert!(annotator.reclassify(&mut session, "sex").is_err());
    }

    #[test]
    fn test_confirmed_columns_skipped() {
        let file = create_test_file(PATIENTS);
        let mock = Arc::new(MockProvider::new().with_reply(MockReply::ConnectionFailure));
        let annotator = Annotator::new().with_llm(mock.clone());
        let (table, source) = annotator.load(file.path()).unwrap();
        let mut session = annotator.start_session(&table, source, None, None).unwrap();
        session.edit_description("age", "Age.").unwrap();
        session.confirm("age", None).unwrap();

        annotator.annotate_all(&mut session).unwrap();
        assert_eq!(session.column("age").unwrap().status, AnnotationStatus::Confirmed);
        // sex failed once on the connection, patient_id took two calls
        assert_eq!(mock.prompts().len(), 3);
    }

    #[test]
    fn test_file_size_limit() {
        let file = create_test_file(PATIENTS);
        let mut config = MetascribeConfig::default();
        config.input.max_file_size_mb = 0;
        let err = Annotator::with_config(config).load(file.path()).unwrap_err();
        assert!(matches!(err, MetascribeError::UnsupportedFormat(_)));
    }

    #[test]
    fn test_add_context_reaches_prompts() {
        let file = create_test_file(PATIENTS);
        let mut doc = tempfile::Builder::new().suffix(".txt").tempfile().unwrap();
        write!(doc, "Patients were enrolled at three sites.").unwrap();

        let mock = Arc::new(MockProvider::new());
        let annotator = Annotator::new().with_llm(mock.clone());
        let (table, source) = annotator.load(file.path()).unwrap();
        let mut session = annotator.start_session(&table, source, None, None).unwrap();
        annotator.add_context(&mut session, doc.path()).unwrap();
        annotator.annotate_column(&mut session, "age").unwrap();

        assert_eq!(session.context.len(), 1);
        assert!(mock.prompts().iter().all(|p| p.contains("enrolled at three sites")));
    }
}
