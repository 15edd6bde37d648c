//! The table of per-feature helper methods, derived from `Feature.Type`

use crate::rpc::feature::Type;
use once_cell::sync::Lazy;
use serde::Serialize;

/// Every `Feature.Type` the protocol defines, in declaration order
pub const FEATURE_KINDS: [Type; 13] = [
    Type::Unspecified,
    Type::FaceDetection,
    Type::LandmarkDetection,
    Type::LogoDetection,
    Type::LabelDetection,
    Type::TextDetection,
    Type::DocumentTextDetection,
    Type::SafeSearchDetection,
    Type::ImageProperties,
    Type::CropHints,
    Type::WebDetection,
    Type::ProductSearch,
    Type::ObjectLocalization,
];

/// One helper method: the feature it requests and the name it is exposed under
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FeatureMethod {
    #[serde(serialize_with = "kind_name")]
    pub kind: Type,
    pub name: String,
}

fn kind_name<S: serde::Serializer>(kind: &Type, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_str(kind.as_str_name())
}

static REGISTRY: Lazy<Vec<FeatureMethod>> = Lazy::new(|| {
    FEATURE_KINDS
        .iter()
        .filter(|kind| **kind != Type::Unspecified)
        .map(|kind| FeatureMethod {
            kind: *kind,
            name: method_name(*kind),
        })
        .collect()
});

/// `FACE_DETECTION` -> `face_detection`, `CROP_HINTS` -> `crop_hints_detection`
pub fn method_name(kind: Type) -> String {
    let mut name = kind.as_str_name().to_lowercase();
    if !name.contains("detection") {
        name.push_str("_detection");
    }
    name
}

/// All helper methods, excluding the unspecified sentinel
pub fn registry() -> &'static [FeatureMethod] {
    &REGISTRY
}

pub fn lookup(name: &str) -> Option<&'static FeatureMethod> {
    REGISTRY.iter().find(|m| m.name == name)
}
