//! Assembling the `BatchAnnotateImages` request

use crate::error::{Error, Result};
use crate::image::{classify, ImageReference};
use crate::rpc::{self, feature};
use base64::{engine::general_purpose, Engine as _};
use serde_json::{json, Map, Value};
use std::time::Duration;
use tonic::metadata::{Ascii, MetadataKey, MetadataValue};
use tonic::Request;

/// Per-call transport options, attached verbatim to the outgoing request
#[derive(Debug, Clone, Default)]
pub struct CallOptions {
    pub timeout: Option<Duration>,
    pub metadata: Vec<(String, String)>,
}

impl CallOptions {
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.push((key.into(), value.into()));
        self
    }

    /// Wrap `message` in a `tonic::Request` carrying these options
    pub fn into_request<T>(self, message: T) -> Result<Request<T>> {
        let mut request = Request::new(message);
        if let Some(timeout) = self.timeout {
            request.set_timeout(timeout);
        }
        for (key, value) in self.metadata {
            let name = MetadataKey::<Ascii>::from_bytes(key.as_bytes())
                .map_err(|_| Error::InvalidMetadata(format!("key {key:?}")))?;
            let value = MetadataValue::<Ascii>::try_from(value.as_str())
                .map_err(|_| Error::InvalidMetadata(format!("value for {key:?}")))?;
            request.metadata_mut().insert(name, value);
        }
        Ok(request)
    }
}

/// Build the feature record for `kind`, leaving `max_results` unset when absent
pub fn feature_spec(kind: feature::Type, max_results: Option<i32>) -> Result<rpc::Feature> {
    let mut feature = rpc::Feature::default();
    feature.set_type(kind);
    if let Some(n) = max_results {
        if n <= 0 {
            return Err(Error::InvalidMaxResults(n));
        }
        feature.max_results = n;
    }
    Ok(feature)
}

/// Classify every image in order and pair each with `feature`.
///
/// The first invalid reference aborts the whole batch.
pub fn build_batch(
    images: Vec<ImageReference>,
    feature: &rpc::Feature,
) -> Result<Vec<rpc::AnnotateImageRequest>> {
    images
        .into_iter()
        .map(|image| {
            Ok(rpc::AnnotateImageRequest {
                image: Some(classify(image)?.into()),
                features: vec![feature.clone()],
                image_context: None,
            })
        })
        .collect()
}

/// Render a batch in the protobuf JSON mapping, with image bytes in base64
pub fn batch_to_json(requests: &[rpc::AnnotateImageRequest]) -> Value {
    let requests: Vec<Value> = requests.iter().map(request_to_json).collect();
    json!({ "requests": requests })
}

fn request_to_json(request: &rpc::AnnotateImageRequest) -> Value {
    let mut image = Map::new();
    if let Some(img) = &request.image {
        if !img.content.is_empty() {
            image.insert(
                "content".into(),
                general_purpose::STANDARD.encode(&img.content).into(),
            );
        }
        if let Some(source) = &img.source {
            let mut src = Map::new();
            if !source.gcs_image_uri.is_empty() {
                src.insert("gcsImageUri".into(), source.gcs_image_uri.clone().into());
            }
            if !source.image_uri.is_empty() {
                src.insert("imageUri".into(), source.image_uri.clone().into());
            }
            image.insert("source".into(), Value::Object(src));
        }
    }

    let features: Vec<Value> = request
        .features
        .iter()
        .map(|f| {
            let mut feature = Map::new();
            feature.insert("type".into(), f.r#type().as_str_name().into());
            if f.max_results != 0 {
                feature.insert("maxResults".into(), f.max_results.into());
            }
            if !f.model.is_empty() {
                feature.insert("model".into(), f.model.clone().into());
            }
            Value::Object(feature)
        })
        .collect();

    json!({ "image": image, "features": features })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_feature_spec() {
        let f = feature_spec(feature::Type::LabelDetection, None).unwrap();
        assert_eq!(f.r#type(), feature::Type::LabelDetection);
        assert_eq!(f.max_results, 0);

        let f = feature_spec(feature::Type::FaceDetection, Some(3)).unwrap();
        assert_eq!(f.max_results, 3);

        assert!(matches!(
            feature_spec(feature::Type::FaceDetection, Some(0)),
            Err(Error::InvalidMaxResults(0))
        ));
    }

    #[test]
    fn test_build_batch_preserves_order() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"local").unwrap();

        let feature = feature_spec(feature::Type::FaceDetection, None).unwrap();
        let images: Vec<ImageReference> = vec![
            "gs://bucket/a.jpg".into(),
            file.path().into(),
            "http://example.com/c.jpg".into(),
        ];
        let batch = build_batch(images, &feature).unwrap();

        assert_eq!(batch.len(), 3);
        for request in &batch {
            assert_eq!(request.features, vec![feature.clone()]);
        }
        let images: Vec<&rpc::Image> = batch.iter().map(|r| r.image.as_ref().unwrap()).collect();
        assert_eq!(
            images[0].source.as_ref().unwrap().gcs_image_uri,
            "gs://bucket/a.jpg"
        );
        assert_eq!(images[1].content, b"local");
        assert_eq!(
            images[2].source.as_ref().unwrap().image_uri,
            "http://example.com/c.jpg"
        );
    }

    #[test]
    fn test_build_batch_keeps_duplicates() {
        let feature = feature_spec(feature::Type::LogoDetection, None).unwrap();
        let images: Vec<ImageReference> =
            vec!["http://example.com/x.jpg".into(), "http://example.com/x.jpg".into()];
        assert_eq!(build_batch(images, &feature).unwrap().len(), 2);
    }

    #[test]
    fn test_build_batch_fails_whole() {
        let feature = feature_spec(feature::Type::FaceDetection, None).unwrap();
        let images: Vec<ImageReference> = vec!["gs://bucket/a.jpg".into(), "nope.jpg".into()];
        assert!(matches!(
            build_batch(images, &feature),
            Err(Error::InvalidImageReference(_))
        ));
    }

    #[test]
    fn test_empty_batch() {
        let feature = feature_spec(feature::Type::WebDetection, None).unwrap();
        assert!(build_batch(vec![], &feature).unwrap().is_empty());
    }

    #[test]
    fn test_call_options_into_request() {
        let request = CallOptions::default()
            .timeout(Duration::from_secs(5))
            .header("x-goog-user-project", "demo")
            .into_request(())
            .unwrap();
        let value = request.metadata().get("x-goog-user-project").unwrap();
        assert_eq!(value.to_str().unwrap(), "demo");
        assert!(request.metadata().get("grpc-timeout").is_some());

        let res = CallOptions::default()
            .header("bad key", "v")
            .into_request(());
        assert!(matches!(res, Err(Error::InvalidMetadata(_))));
    }

    #[test]
    fn test_batch_to_json() {
        let feature = feature_spec(feature::Type::TextDetection, Some(2)).unwrap();
        let batch = vec![
            rpc::AnnotateImageRequest {
                image: Some(crate::ImagePayload::Content(b"hi".to_vec()).into()),
                features: vec![feature.clone()],
                image_context: None,
            },
            rpc::AnnotateImageRequest {
                image: Some(crate::ImagePayload::GcsImageUri("gs://b/o.jpg".into()).into()),
                features: vec![feature],
                image_context: None,
            },
        ];

        let value = batch_to_json(&batch);
        assert_eq!(
            value,
            json!({
                "requests": [
                    {
                        "image": { "content": "aGk=" },
                        "features": [{ "type": "TEXT_DETECTION", "maxResults": 2 }]
                    },
                    {
                        "image": { "source": { "gcsImageUri": "gs://b/o.jpg" } },
                        "features": [{ "type": "TEXT_DETECTION", "maxResults": 2 }]
                    }
                ]
            })
        );
    }
}
