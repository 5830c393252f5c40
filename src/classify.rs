//! Classification entry point: folder of images → folder of meaningful images.
//!
//! Images are handled strictly one at a time: read, classify, route, then
//! the next. A failed image is recorded and left in place unless
//! `fail_fast` is set; a rejected credential always stops the run.

use crate::config::ClassifyConfig;
use crate::error::{ItemError, SiftError};
use crate::output::{ClassificationOutput, ClassificationStats, ImageOutcome, RouteOutcome};
use crate::pipeline::discover::{self, ImageFile};
use crate::pipeline::route;
use crate::pipeline::vision::{resolve_classifier, ImageClassifier};
use crate::prompts::Verdict;
use std::path::Path;
use std::time::Instant;
use tracing::{debug, info, warn};

pub use crate::pipeline::discover::list_images;

/// Classify every image in `input_folder` and route the meaningful ones.
///
/// # Errors
/// - [`SiftError::MissingApiKey`] / [`SiftError::ProviderNotConfigured`]
///   before any file is touched
/// - [`SiftError::InputFolderNotFound`] when the input is not a directory
/// - [`SiftError::AuthError`] on HTTP 401/403
/// - [`SiftError::ClassificationAborted`] on the first failure with `fail_fast`
pub async fn classify_folder(
    input_folder: impl AsRef<Path>,
    config: &ClassifyConfig,
) -> Result<ClassificationOutput, SiftError> {
    let start = Instant::now();
    let input_folder = input_folder.as_ref().to_path_buf();

    // ── Step 1: Resolve the classifier (credential check) ────────────────
    let classifier = resolve_classifier(config)?;

    // ── Step 2: Validate folders ─────────────────────────────────────────
    if !input_folder.is_dir() {
        return Err(SiftError::InputFolderNotFound { path: input_folder });
    }
    let output_folder = config.output_folder.clone();
    tokio::fs::create_dir_all(&output_folder)
        .await
        .map_err(|e| SiftError::OutputDirFailed {
            path: output_folder.clone(),
            source: e,
        })?;
    if same_dir(&input_folder, &output_folder).await {
        return Err(SiftError::InvalidConfig(format!(
            "output folder '{}' is the input folder",
            output_folder.display()
        )));
    }

    // ── Step 3: List images ──────────────────────────────────────────────
    let paths = discover::list_images(&input_folder)?;
    let total = paths.len();
    info!(
        "Classifying {} image(s) from {} with {}",
        total,
        input_folder.display(),
        classifier.name()
    );

    let cb = config.progress_callback.as_ref();
    if let Some(cb) = cb {
        cb.on_run_start(total);
    }

    // ── Step 4: Classify and route, one image at a time ──────────────────
    let mut images = Vec::with_capacity(total);
    let mut stats = ClassificationStats::default();

    for (i, path) in paths.iter().enumerate() {
        let item = i + 1;
        let name = discover::file_name(path);
        if let Some(cb) = cb {
            cb.on_item_start(item, total, &name);
        }

        let outcome = classify_one(classifier.as_ref(), path, &output_folder, config).await;
        stats.processed += 1;

        match (&outcome.error, &outcome.result) {
            (Some(err), _) => {
                stats.failed += 1;
                warn!("{}", err);
                if let Some(cb) = cb {
                    cb.on_item_error(item, total, &name, &err.to_string());
                }
                if let ItemError::Unauthorized { status, .. } = err {
                    return Err(SiftError::AuthError {
                        provider: classifier.name().to_string(),
                        detail: format!("HTTP {status} for '{name}'"),
                    });
                }
                if config.fail_fast {
                    return Err(SiftError::ClassificationAborted {
                        name,
                        source: err.clone(),
                    });
                }
            }
            (None, Some(result)) => {
                if result.is_meaningful() {
                    stats.meaningful += 1;
                    if matches!(outcome.routed, Some(RouteOutcome::SkippedExisting(_))) {
                        stats.skipped_existing += 1;
                    }
                } else {
                    stats.discarded += 1;
                    if result.verdict == Verdict::Ambiguous {
                        stats.ambiguous += 1;
                    }
                }
                info!("{}: {}", name, result.verdict.label());
                if let Some(cb) = cb {
                    cb.on_item_complete(item, total, &name, result.verdict.label());
                }
            }
            (None, None) => {}
        }

        images.push(outcome);
    }

    stats.total_duration_ms = start.elapsed().as_millis() as u64;
    info!(
        "Processed {} image(s): {} meaningful, {} discarded, {} failed",
        stats.processed, stats.meaningful, stats.discarded, stats.failed
    );
    if let Some(cb) = cb {
        cb.on_run_complete(total, stats.processed - stats.failed);
    }

    Ok(ClassificationOutput {
        input_folder,
        output_folder,
        images,
        stats,
    })
}

/// Read, classify and (if meaningful) route a single image. Never fails;
/// problems end up in `ImageOutcome::error`.
async fn classify_one(
    classifier: &dyn ImageClassifier,
    path: &Path,
    output_folder: &Path,
    config: &ClassifyConfig,
) -> ImageOutcome {
    let start = Instant::now();
    let mut outcome = ImageOutcome {
        name: discover::file_name(path),
        source: path.to_path_buf(),
        result: None,
        routed: None,
        error: None,
        duration_ms: 0,
    };

    let result = match ImageFile::read(path).await {
        Ok(image) => classifier.classify(&image).await,
        Err(e) => Err(e),
    };

    match result {
        Ok(result) => {
            debug!("{}: model answered {:?}", outcome.name, result.response);
            if result.is_meaningful() {
                match route::route_image(path, output_folder, config.route_mode, config.on_conflict)
                    .await
                {
                    Ok(routed) => outcome.routed = Some(routed),
                    Err(e) => {
                        outcome.error = Some(ItemError::RouteFailed {
                            name: outcome.name.clone(),
                            detail: e.to_string(),
                        })
                    }
                }
            }
            outcome.result = Some(result);
        }
        Err(e) => outcome.error = Some(e),
    }

    outcome.duration_ms = start.elapsed().as_millis() as u64;
    outcome
}

async fn same_dir(a: &Path, b: &Path) -> bool {
    match (tokio::fs::canonicalize(a).await, tokio::fs::canonicalize(b).await) {
        (Ok(a), Ok(b)) => a == b,
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::output::ClassificationResult;
    use async_trait::async_trait;
    use std::sync::Arc;

    /// Says yes to names containing "cat", fails on "broken", no otherwise.
    struct NameClassifier;

    #[async_trait]
    impl ImageClassifier for NameClassifier {
        async fn classify(&self, image: &ImageFile) -> Result<ClassificationResult, ItemError> {
            if image.name.contains("broken") {
                return Err(ItemError::RequestFailed {
                    name: image.name.clone(),
                    detail: "connection reset".into(),
                });
            }
            let (verdict, response) = if image.name.contains("cat") {
                (Verdict::Meaningful, "SI")
            } else {
                (Verdict::NotMeaningful, "NO")
            };
            Ok(ClassificationResult {
                verdict,
                response: response.into(),
            })
        }
    }

    fn setup(names: &[&str]) -> (tempfile::TempDir, std::path::PathBuf, std::path::PathBuf) {
        let tmp = tempfile::tempdir().unwrap();
        let input = tmp.path().join("in");
        std::fs::create_dir(&input).unwrap();
        for name in names {
            std::fs::write(input.join(name), name.as_bytes()).unwrap();
        }
        let output = tmp.path().join("out");
        (tmp, input, output)
    }

    fn config(output: &Path) -> ClassifyConfig {
        ClassifyConfig::builder()
            .output_folder(output)
            .classifier(Arc::new(NameClassifier))
            .build()
            .unwrap()
    }

    #[tokio::test]
    async fn routes_only_meaningful_images() {
        let (_tmp, input, output) = setup(&["cat.png", "lines.png", "notes.txt"]);
        let out = classify_folder(&input, &config(&output)).await.unwrap();

        assert_eq!(out.stats.processed, 2);
        assert_eq!(out.stats.meaningful, 1);
        assert_eq!(out.stats.discarded, 1);
        assert!(output.join("cat.png").exists());
        assert!(!output.join("lines.png").exists());
        assert!(input.join("cat.png").exists(), "copy leaves the source");
        assert_eq!(
            out.images[0].routed,
            Some(RouteOutcome::Copied(output.join("cat.png")))
        );
    }

    #[tokio::test]
    async fn failures_are_recorded_and_run_continues() {
        let (_tmp, input, output) = setup(&["a_broken.jpg", "b_cat.jpg"]);
        let out = classify_folder(&input, &config(&output)).await.unwrap();

        assert_eq!(out.stats.failed, 1);
        assert_eq!(out.stats.meaningful, 1);
        assert!(out.images[0].error.is_some());
        assert!(output.join("b_cat.jpg").exists());
    }

    #[tokio::test]
    async fn fail_fast_stops_at_first_failure() {
        let (_tmp, input, output) = setup(&["a_broken.jpg", "b_cat.jpg"]);
        let mut cfg = config(&output);
        cfg.fail_fast = true;

        let err = classify_folder(&input, &cfg).await.unwrap_err();
        assert!(matches!(
            err,
            SiftError::ClassificationAborted { ref name, .. } if name == "a_broken.jpg"
        ));
        assert!(!output.join("b_cat.jpg").exists());
    }

    #[tokio::test]
    async fn missing_input_folder() {
        let tmp = tempfile::tempdir().unwrap();
        let err = classify_folder(tmp.path().join("nope"), &config(&tmp.path().join("out")))
            .await
            .unwrap_err();
        assert!(matches!(err, SiftError::InputFolderNotFound { .. }));
    }

    #[tokio::test]
    async fn output_equal_to_input_is_rejected() {
        let (_tmp, input, _output) = setup(&["cat.png"]);
        let err = classify_folder(&input, &config(&input)).await.unwrap_err();
        assert!(matches!(err, SiftError::InvalidConfig(_)));
    }

    #[tokio::test]
    async fn unauthorized_always_aborts() {
        struct Rejecting;
        #[async_trait]
        impl ImageClassifier for Rejecting {
            async fn classify(&self, image: &ImageFile) -> Result<ClassificationResult, ItemError> {
                Err(ItemError::Unauthorized {
                    name: image.name.clone(),
                    status: 403,
                })
            }
        }

        let (_tmp, input, output) = setup(&["cat.png", "dog.png"]);
        let cfg = ClassifyConfig::builder()
            .output_folder(&output)
            .classifier(Arc::new(Rejecting))
            .build()
            .unwrap();
        let err = classify_folder(&input, &cfg).await.unwrap_err();
        assert!(matches!(err, SiftError::AuthError { .. }));
    }
}
