//! Helpers on top of the generated Cloud Vision `ImageAnnotator` client.
//!
//! Each detection feature gets a named method (`face_detection`,
//! `label_detection`, ...) that takes local files, open handles, HTTP(S) URLs
//! or `gs://` URLs and turns them into one `BatchAnnotateImages` call.

pub mod annotator;
pub mod batch;
pub mod config;
pub mod error;
pub mod feature;
pub mod image;

pub use annotator::{BatchAnnotate, FeatureRequest, ImageAnnotator};
pub use batch::{batch_to_json, build_batch, CallOptions};
pub use crate::config::{connect, ClientConfig};
pub use error::{Error, Result};
pub use feature::{registry, FeatureMethod};
pub use image::{classify, ImagePayload, ImageReference};

/// The generated protocol types and the `ImageAnnotator` RPC stubs
#[allow(clippy::all)]
pub mod rpc {
    pub mod google {
        pub mod rpc {
            tonic::include_proto!("google.rpc");
        }

        pub mod r#type {
            tonic::include_proto!("google.r#type");
        }

        pub mod cloud {
            pub mod vision {
                pub mod v1 {
                    tonic::include_proto!("google.cloud.vision.v1");
                }
            }
        }
    }

    pub use google::cloud::vision::v1::*;
}

#[cfg(test)]
mod tests {
    use super::rpc::google::r#type::Color;
    use prost::Message;

    #[test]
    fn test_color_with_alpha_wrapper_decodes() {
        // red = 1.0 (fixed32), then alpha as a FloatValue { value: 0.5 } message
        let mut bytes = vec![0x0d];
        bytes.extend_from_slice(&1.0f32.to_le_bytes());
        bytes.extend_from_slice(&[0x22, 0x05, 0x0d]);
        bytes.extend_from_slice(&0.5f32.to_le_bytes());

        let color = Color::decode(bytes.as_slice()).unwrap();
        assert_eq!(color.red, 1.0);
        assert_eq!(color.green, 0.0);
    }
}
