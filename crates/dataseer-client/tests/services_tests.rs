//! Pipeline runs through gated service handles and a real child-process labeler

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use dataseer_client::{GatedClassifier, GatedLabeler, WapitiLabeler};
use dataseer_core::{BatchClassifier, ClassScores, Result, SequenceLabeler};
use dataseer_extractor::{ClassificationCascade, DatasetPipeline, SectionRelevanceFilter};

struct KeywordBinary;

#[async_trait]
impl BatchClassifier for KeywordBinary {
    async fn classify(&self, texts: &[String]) -> Result<Vec<ClassScores>> {
        Ok(texts
            .iter()
            .map(|t| {
                let p = if t.contains("GenBank") { 0.96 } else { 0.05 };
                ClassScores::from([("dataset".to_string(), p), ("no_dataset".to_string(), 1.0 - p)])
            })
            .collect())
    }

    fn name(&self) -> &str {
        "binary"
    }
}

struct SequenceTypes;

#[async_trait]
impl BatchClassifier for SequenceTypes {
    async fn classify(&self, texts: &[String]) -> Result<Vec<ClassScores>> {
        Ok(texts
            .iter()
            .map(|_| ClassScores::from([("Sequence data:DNA".to_string(), 0.7)]))
            .collect())
    }

    fn name(&self) -> &str {
        "first"
    }
}

fn gated(inner: Arc<dyn BatchClassifier>) -> Arc<dyn BatchClassifier> {
    Arc::new(GatedClassifier::new(inner, 1, Duration::from_secs(5)))
}

const TEI: &str = r#"<TEI><text><body>
    <div><head>Methods</head><p>Reads were deposited in GenBank. Assembly followed.</p></div>
</body></text></TEI>"#;

#[cfg(unix)]
#[tokio::test]
async fn test_pipeline_with_process_labeler() {
    // appends a positive label column to every feature line
    let sed = WapitiLabeler::with_command("sed", vec!["-e".to_string(), "s/$/ <dataset>/".to_string()]);
    let labeler: Arc<dyn SequenceLabeler> =
        Arc::new(GatedLabeler::new(Arc::new(sed), 1, Duration::from_secs(5)));

    let cascade = ClassificationCascade::new(gated(Arc::new(KeywordBinary)), gated(Arc::new(SequenceTypes)));
    let pipeline = DatasetPipeline::new(cascade, SectionRelevanceFilter::new(labeler));

    let doc = pipeline.process_tei(TEI).await.unwrap();
    assert_eq!(doc.data_instances().len(), 1);

    let dataset = &doc.datasets()[0];
    assert_eq!(dataset.data_type, "Sequence data");
    assert_eq!(dataset.subtype.as_deref(), Some("DNA"));
    assert_eq!(doc.sections()[0].subtype.as_deref(), Some("dataseer"));
}

#[test]
fn test_labeler_timeout_leaves_document_unannotated() {
    struct Stuck;

    #[async_trait]
    impl SequenceLabeler for Stuck {
        async fn label(&self, _features: &str) -> Result<Vec<String>> {
            tokio::time::sleep(Duration::from_secs(60)).await;
            Ok(Vec::new())
        }

        fn name(&self) -> &str {
            "stuck"
        }
    }

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_time()
        .build()
        .unwrap();

    let doc = runtime.block_on(async {
        let labeler: Arc<dyn SequenceLabeler> =
            Arc::new(GatedLabeler::new(Arc::new(Stuck), 1, Duration::from_millis(30)));
        let cascade =
            ClassificationCascade::new(gated(Arc::new(KeywordBinary)), gated(Arc::new(SequenceTypes)));
        DatasetPipeline::new(cascade, SectionRelevanceFilter::new(labeler))
            .process_tei(TEI)
            .await
            .unwrap()
    });

    assert!(doc.data_instances().is_empty());
    assert!(doc.sections().iter().all(|s| s.subtype.is_none()));
}

#[test]
fn test_gated_stub_outside_runtime_macro() {
    let classifier = gated(Arc::new(KeywordBinary));
    let scores = tokio_test::block_on(classifier.classify(&["GenBank accession".to_string()])).unwrap();
    assert_eq!(scores[0].get("dataset"), Some(&0.96));
}
