//! Batch execution and the per-image failure policy.
//!
//! Requests in one batch are joined concurrently and come back in
//! submission order; batches themselves are driven one after another by
//! [`crate::labeler`]. With `return_exceptions` every slot gets a result,
//! failures included. Without it the first failure cancels the rest of the
//! batch and is returned as a fatal error.

use crate::error::{ClassifyError, PageLabelError};
use crate::label::PageLabel;
use crate::pipeline::classify::{classify_request, PageClassifier};
use crate::pipeline::encode::ClassificationRequest;
use futures::future::{join_all, try_join_all};

/// Number of batches needed for `len` items: `ceil(len / batch_size)`.
pub fn batch_count(len: usize, batch_size: usize) -> usize {
    len.div_ceil(batch_size.max(1))
}

/// Classify one batch.
///
/// The returned vector has exactly one entry per request, in request order.
pub async fn run_batch(
    classifier: &dyn PageClassifier,
    requests: &[ClassificationRequest],
    return_exceptions: bool,
) -> Result<Vec<Result<PageLabel, ClassifyError>>, PageLabelError> {
    if return_exceptions {
        let results = join_all(
            requests
                .iter()
                .map(|request| classify_request(classifier, request)),
        )
        .await;
        return Ok(results);
    }

    let labels = try_join_all(requests.iter().map(|request| async move {
        classify_request(classifier, request)
            .await
            .map_err(|source| PageLabelError::ClassificationFailed {
                path: request.path.clone(),
                source,
            })
    }))
    .await?;

    Ok(labels.into_iter().map(Ok).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use edgequake_llm::ImageData;
    use std::path::PathBuf;

    /// Labels by position in the file name; fails for names containing "bad".
    struct ByName;

    #[async_trait]
    impl PageClassifier for ByName {
        async fn classify(
            &self,
            request: &ClassificationRequest,
            _image: &ImageData,
        ) -> Result<PageLabel, ClassifyError> {
            let name = request.path.to_string_lossy();
            if name.contains("bad") {
                Err(ClassifyError::LlmFailed {
                    detail: "boom".into(),
                })
            } else if name.starts_with('1') {
                Ok(PageLabel::CoverPage)
            } else {
                Ok(PageLabel::TextPage)
            }
        }
    }

    fn request(name: &str) -> ClassificationRequest {
        ClassificationRequest {
            path: PathBuf::from(name),
            image: Some(ImageData::new("eA==".to_string(), "image/png")),
            read_error: None,
        }
    }

    #[test]
    fn batch_count_is_ceiling() {
        assert_eq!(batch_count(0, 3), 0);
        assert_eq!(batch_count(1, 3), 1);
        assert_eq!(batch_count(3, 3), 1);
        assert_eq!(batch_count(4, 3), 2);
        assert_eq!(batch_count(10, 1), 10);
        for len in 0..25 {
            for size in 1..7 {
                let chunks = (0..len).collect::<Vec<_>>();
                assert_eq!(chunks.chunks(size).count(), batch_count(len, size));
            }
        }
    }

    #[tokio::test]
    async fn results_follow_submission_order() {
        let reqs = vec![request("1_doc.png"), request("2_doc.png"), request("3_doc.png")];
        let out = run_batch(&ByName, &reqs, false).await.unwrap();
        assert_eq!(
            out,
            vec![
                Ok(PageLabel::CoverPage),
                Ok(PageLabel::TextPage),
                Ok(PageLabel::TextPage)
            ]
        );
    }

    #[tokio::test]
    async fn tolerated_failure_stays_in_its_slot() {
        let reqs = vec![request("1_doc.png"), request("2_bad.png"), request("3_doc.png")];
        let out = run_batch(&ByName, &reqs, true).await.unwrap();
        assert_eq!(out.len(), 3);
        assert!(out[0].is_ok());
        assert!(out[1].is_err());
        assert!(out[2].is_ok());
    }

    #[tokio::test]
    async fn untolerated_failure_aborts_batch() {
        let reqs = vec![request("1_doc.png"), request("2_bad.png")];
        let err = run_batch(&ByName, &reqs, false).await.unwrap_err();
        match err {
            PageLabelError::ClassificationFailed { path, .. } => {
                assert_eq!(path, PathBuf::from("2_bad.png"))
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn missing_payload_is_failed_without_classifier() {
        let mut req = request("1_doc.png");
        req.image = None;
        req.read_error = Some("gone".into());
        let out = tokio_test::block_on(run_batch(&ByName, &[req], true)).unwrap();
        assert_eq!(
            out,
            vec![Err(ClassifyError::MissingImage {
                detail: "gone".into()
            })]
        );
    }
}
