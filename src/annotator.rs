//! The per-feature helper methods and the `BatchAnnotateImages` dispatch

use crate::batch::{build_batch, feature_spec, CallOptions};
use crate::error::{Error, Result};
use crate::feature;
use crate::image::ImageReference;
use crate::rpc::{self, image_annotator_client::ImageAnnotatorClient};
use tonic::metadata::MetadataMap;
use tonic::transport::Channel;
use tonic::{Request, Response};
use tracing::*;

type TResult<T> = std::result::Result<T, tonic::Status>;

/// The remote `BatchAnnotateImages` call
#[tonic::async_trait]
pub trait BatchAnnotate: Send {
    async fn batch_annotate_images(
        &mut self,
        request: Request<rpc::BatchAnnotateImagesRequest>,
    ) -> TResult<Response<rpc::BatchAnnotateImagesResponse>>;
}

#[tonic::async_trait]
impl BatchAnnotate for ImageAnnotatorClient<Channel> {
    async fn batch_annotate_images(
        &mut self,
        request: Request<rpc::BatchAnnotateImagesRequest>,
    ) -> TResult<Response<rpc::BatchAnnotateImagesResponse>> {
        ImageAnnotatorClient::<Channel>::batch_annotate_images(self, request).await
    }
}

/// Arguments shared by every feature method
#[derive(Debug, Default)]
pub struct FeatureRequest {
    pub images: Vec<ImageReference>,
    /// Appended after `images`
    pub image: Option<ImageReference>,
    pub max_results: Option<i32>,
    pub options: CallOptions,
}

impl FeatureRequest {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn image(mut self, image: impl Into<ImageReference>) -> Self {
        self.image = Some(image.into());
        self
    }

    pub fn images<I, T>(mut self, images: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<ImageReference>,
    {
        self.images.extend(images.into_iter().map(Into::into));
        self
    }

    pub fn max_results(mut self, max_results: i32) -> Self {
        self.max_results = Some(max_results);
        self
    }

    pub fn options(mut self, options: CallOptions) -> Self {
        self.options = options;
        self
    }

    /// All references in dispatch order
    fn into_images(self) -> (Vec<ImageReference>, Option<i32>, CallOptions) {
        let mut images = self.images;
        if let Some(image) = self.image {
            images.push(image);
        }
        (images, self.max_results, self.options)
    }
}

/// Convenience client wrapping any `BatchAnnotate` implementation
pub struct ImageAnnotator<C> {
    client: C,
}

impl<C: BatchAnnotate> ImageAnnotator<C> {
    pub fn new(client: C) -> Self {
        ImageAnnotator { client }
    }

    pub fn client(&self) -> &C {
        &self.client
    }

    pub fn into_inner(self) -> C {
        self.client
    }

    /// Request `kind` for every image in `request` in one batch call
    pub async fn annotate<F>(
        &mut self,
        kind: rpc::feature::Type,
        request: FeatureRequest,
        callback: Option<F>,
    ) -> Result<rpc::BatchAnnotateImagesResponse>
    where
        F: FnOnce(&rpc::BatchAnnotateImagesResponse, &MetadataMap),
    {
        let (images, max_results, options) = request.into_images();
        let feature = feature_spec(kind, max_results)?;
        self.dispatch(images, feature, options, callback).await
    }

    /// Like `annotate`, with the feature picked by helper method name
    pub async fn call<F>(
        &mut self,
        name: &str,
        request: FeatureRequest,
        callback: Option<F>,
    ) -> Result<rpc::BatchAnnotateImagesResponse>
    where
        F: FnOnce(&rpc::BatchAnnotateImagesResponse, &MetadataMap),
    {
        let method =
            feature::lookup(name).ok_or_else(|| Error::UnknownFeature(name.to_string()))?;
        self.annotate(method.kind, request, callback).await
    }

    /// Classify every image, then send the whole batch in a single RPC.
    ///
    /// Nothing is sent if any image fails to classify. The response and any
    /// RPC error come back exactly as the client returned them.
    #[tracing::instrument(skip_all, fields(feature = feature.r#type().as_str_name(), images = images.len()))]
    pub async fn dispatch<F>(
        &mut self,
        images: Vec<ImageReference>,
        feature: rpc::Feature,
        options: CallOptions,
        callback: Option<F>,
    ) -> Result<rpc::BatchAnnotateImagesResponse>
    where
        F: FnOnce(&rpc::BatchAnnotateImagesResponse, &MetadataMap),
    {
        let requests = build_batch(images, &feature)?;
        debug!("built batch of {} requests", requests.len());

        let request = options.into_request(rpc::BatchAnnotateImagesRequest {
            requests,
            parent: String::new(),
        })?;

        let response = self.client.batch_annotate_images(request).await?;
        let (metadata, response, _) = response.into_parts();
        info!("batch annotate returned {} responses", response.responses.len());

        if let Some(callback) = callback {
            callback(&response, &metadata);
        }
        Ok(response)
    }
}

/// Callback type for the named helpers, which never take one
type NoCallback = fn(&rpc::BatchAnnotateImagesResponse, &MetadataMap);

macro_rules! feature_methods {
    ($($name:ident => $kind:ident),* $(,)?) => {
        impl<C: BatchAnnotate> ImageAnnotator<C> {
            $(
                pub async fn $name(
                    &mut self,
                    request: FeatureRequest,
                ) -> Result<rpc::BatchAnnotateImagesResponse> {
                    self.annotate(rpc::feature::Type::$kind, request, None::<NoCallback>)
                        .await
                }
            )*
        }
    };
}

feature_methods! {
    face_detection => FaceDetection,
    landmark_detection => LandmarkDetection,
    logo_detection => LogoDetection,
    label_detection => LabelDetection,
    text_detection => TextDetection,
    document_text_detection => DocumentTextDetection,
    safe_search_detection => SafeSearchDetection,
    image_properties_detection => ImageProperties,
    crop_hints_detection => CropHints,
    web_detection => WebDetection,
    product_search_detection => ProductSearch,
    object_localization_detection => ObjectLocalization,
}
