//! Read-only description of one ad placement.
//!
//! An [`AdConfiguration`] is what the builders consume: the requested ad
//! formats, sizes, and per-format parameters. It also keeps the legacy
//! single-format and interstitial-flag properties so that older callers keep
//! working without migrating.

use serde::{de, Deserialize, Deserializer, Serialize, Serializer};
use serde_repr::{Deserialize_repr, Serialize_repr};
use std::collections::BTreeSet;
use validator::{Validate, ValidationError, ValidationErrors};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AdFormat {
    Banner,
    Video,
    Native,
}

/// The kind of ad unit a configuration was created for. Interstitial kinds
/// are full screen by nature and request banner and video unless told
/// otherwise.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AdUnitKind {
    #[default]
    Banner,
    Interstitial,
    MediationInterstitial,
    Native,
}

impl AdUnitKind {
    pub fn is_interstitial(self) -> bool {
        matches!(
            self,
            AdUnitKind::Interstitial | AdUnitKind::MediationInterstitial
        )
    }

    pub fn default_formats(self) -> BTreeSet<AdFormat> {
        match self {
            AdUnitKind::Banner => BTreeSet::from([AdFormat::Banner]),
            AdUnitKind::Interstitial | AdUnitKind::MediationInterstitial => {
                BTreeSet::from([AdFormat::Banner, AdFormat::Video])
            }
            AdUnitKind::Native => BTreeSet::from([AdFormat::Native]),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Validate)]
pub struct AdSize {
    #[validate(range(min = 1))]
    pub w: i64,
    #[validate(range(min = 1))]
    pub h: i64,
}

impl AdSize {
    pub fn new(w: i64, h: i64) -> Self {
        AdSize { w, h }
    }

    /// A size with no area; never sent on the wire.
    pub fn is_empty(&self) -> bool {
        self.w <= 0 || self.h <= 0
    }
}

/// Minimum share of the screen an interstitial may occupy, each axis in 0..=1.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Validate)]
pub struct SizePercentage {
    #[validate(range(min = 0.0, max = 1.0))]
    pub w: f64,
    #[validate(range(min = 0.0, max = 1.0))]
    pub h: f64,
}

// OpenRTB 2.5 table 5.9. Interstitial, slider and floating share value 5.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VideoPlacement {
    InStream,
    InBanner,
    InArticle,
    InFeed,
    Interstitial,
    Slider,
    Floating,
}

static PLACEMENT_NAMES: phf::Map<&'static str, VideoPlacement> = phf::phf_map! {
    "instream" => VideoPlacement::InStream,
    "inbanner" => VideoPlacement::InBanner,
    "inarticle" => VideoPlacement::InArticle,
    "infeed" => VideoPlacement::InFeed,
    "interstitial" => VideoPlacement::Interstitial,
    "slider" => VideoPlacement::Slider,
    "floating" => VideoPlacement::Floating,
};

impl VideoPlacement {
    pub fn ortb_value(self) -> i64 {
        match self {
            VideoPlacement::InStream => 1,
            VideoPlacement::InBanner => 2,
            VideoPlacement::InArticle => 3,
            VideoPlacement::InFeed => 4,
            VideoPlacement::Interstitial | VideoPlacement::Slider | VideoPlacement::Floating => 5,
        }
    }

    pub fn from_ortb_value(value: i64) -> Option<Self> {
        match value {
            1 => Some(VideoPlacement::InStream),
            2 => Some(VideoPlacement::InBanner),
            3 => Some(VideoPlacement::InArticle),
            4 => Some(VideoPlacement::InFeed),
            5 => Some(VideoPlacement::Interstitial),
            _ => None,
        }
    }

    /// Case-insensitive lookup; `In-Stream`, `in_stream` and `InStream` all match.
    pub fn from_name(name: &str) -> Option<Self> {
        let key: String = name
            .chars()
            .filter(|c| *c != '-' && *c != '_')
            .map(|c| c.to_ascii_lowercase())
            .collect();
        PLACEMENT_NAMES.get(key.as_str()).copied()
    }
}

impl Serialize for VideoPlacement {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_i64(self.ortb_value())
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawPlacement {
    Value(i64),
    Name(String),
}

impl RawPlacement {
    fn resolve<E: de::Error>(self) -> Result<VideoPlacement, E> {
        match self {
            RawPlacement::Value(v) => VideoPlacement::from_ortb_value(v)
                .ok_or_else(|| E::custom(format!("invalid video placement: {}", v))),
            RawPlacement::Name(name) => VideoPlacement::from_name(&name)
                .ok_or_else(|| E::custom(format!("unknown video placement: {}", name))),
        }
    }
}

impl<'de> Deserialize<'de> for VideoPlacement {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        RawPlacement::deserialize(deserializer)?.resolve()
    }
}

/// Config-side placement: `0` is the "undefined" value and means unset.
fn placement_or_unset<'de, D>(deserializer: D) -> Result<Option<VideoPlacement>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<RawPlacement>::deserialize(deserializer)? {
        None | Some(RawPlacement::Value(0)) => Ok(None),
        Some(raw) => raw.resolve().map(Some),
    }
}

// OpenRTB 2.5 table 5.6 (API frameworks)
#[repr(i64)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize_repr, Deserialize_repr)]
pub enum Api {
    Vpaid1 = 1,
    Vpaid2 = 2,
    Mraid1 = 3,
    Ormma = 4,
    Mraid2 = 5,
    Mraid3 = 6,
    Omid1 = 7,
}

// OpenRTB 2.5 table 5.10
#[repr(i64)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize_repr, Deserialize_repr)]
pub enum PlaybackMethod {
    AutoPlaySoundOn = 1,
    AutoPlaySoundOff = 2,
    ClickToPlay = 3,
    MouseOver = 4,
    EnterSoundOn = 5,
    EnterSoundOff = 6,
}

pub(crate) fn api_values(apis: &[Api]) -> Vec<i64> {
    apis.iter().map(|a| *a as i64).collect()
}

#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VideoParameters {
    #[serde(deserialize_with = "placement_or_unset")]
    pub placement: Option<VideoPlacement>,
    pub linearity: Option<i64>,
    pub api: Option<Vec<Api>>,
    pub min_duration: Option<i64>,
    pub max_duration: Option<i64>,
    pub start_delay: Option<i64>,
    pub playback_methods: Option<Vec<PlaybackMethod>>,
}

impl Validate for VideoParameters {
    fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();

        if let Some(linearity) = self.linearity {
            if !(1..=2).contains(&linearity) {
                let mut error = ValidationError::new("range");
                error.message = Some("video.linearity must be 1 (linear) or 2 (non-linear)".into());
                errors.add("linearity", error);
            }
        }

        for (field, value) in [
            ("min_duration", self.min_duration),
            ("max_duration", self.max_duration),
        ] {
            if value.is_some_and(|v| v < 0) {
                let mut error = ValidationError::new("range");
                error.message = Some(format!("video.{} must not be negative", field).into());
                errors.add(field, error);
            }
        }

        if let (Some(min), Some(max)) = (self.min_duration, self.max_duration) {
            if min > max {
                let mut error = ValidationError::new("duration_order");
                error.message = Some("video.min_duration exceeds video.max_duration".into());
                errors.add("min_duration", error);
            }
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BannerParameters {
    pub api: Option<Vec<Api>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct AdConfiguration {
    pub ad_unit_kind: AdUnitKind,
    pub ad_formats: BTreeSet<AdFormat>,
    /// Single-format property from before multiformat support. Read only
    /// when `ad_formats` is empty.
    pub ad_format: Option<AdFormat>,
    /// Legacy explicit interstitial flag.
    pub is_interstitial_ad: bool,
    #[validate(nested)]
    pub size: Option<AdSize>,
    #[validate(nested)]
    pub additional_sizes: Vec<AdSize>,
    #[validate(nested)]
    pub min_size_percentage: Option<SizePercentage>,
    #[validate(nested)]
    pub video_parameters: VideoParameters,
    pub banner_parameters: BannerParameters,
}

impl Default for AdConfiguration {
    fn default() -> Self {
        Self::new()
    }
}

impl AdConfiguration {
    /// Configuration for an in-line banner view.
    pub fn new() -> Self {
        Self::for_kind(AdUnitKind::Banner)
    }

    pub fn interstitial() -> Self {
        Self::for_kind(AdUnitKind::Interstitial)
    }

    pub fn mediation_interstitial() -> Self {
        Self::for_kind(AdUnitKind::MediationInterstitial)
    }

    pub fn native() -> Self {
        Self::for_kind(AdUnitKind::Native)
    }

    pub fn for_kind(ad_unit_kind: AdUnitKind) -> Self {
        AdConfiguration {
            ad_unit_kind,
            ad_formats: BTreeSet::new(),
            ad_format: None,
            is_interstitial_ad: false,
            size: None,
            additional_sizes: Vec::new(),
            min_size_percentage: None,
            video_parameters: VideoParameters::default(),
            banner_parameters: BannerParameters::default(),
        }
    }

    pub fn with_formats<I>(mut self, formats: I) -> Self
    where
        I: IntoIterator<Item = AdFormat>,
    {
        self.ad_formats = formats.into_iter().collect();
        self
    }

    pub fn with_size(mut self, w: i64, h: i64) -> Self {
        self.size = Some(AdSize::new(w, h));
        self
    }

    /// Explicit formats win over the legacy single format, which wins over
    /// the ad-unit default.
    pub fn resolved_formats(&self) -> BTreeSet<AdFormat> {
        if !self.ad_formats.is_empty() {
            return self.ad_formats.clone();
        }
        if let Some(format) = self.ad_format {
            return BTreeSet::from([format]);
        }
        self.ad_unit_kind.default_formats()
    }

    pub fn presents_as_interstitial(&self) -> bool {
        self.is_interstitial_ad || self.ad_unit_kind.is_interstitial()
    }

    /// Primary size followed by the additional sizes, duplicates and empty
    /// sizes dropped.
    pub fn all_sizes(&self) -> Vec<AdSize> {
        let mut sizes: Vec<AdSize> = Vec::new();
        for size in self.size.iter().chain(self.additional_sizes.iter()) {
            if !size.is_empty() && !sizes.contains(size) {
                sizes.push(*size);
            }
        }
        sizes
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn banner_view_defaults_to_banner_only() {
        let cfg = AdConfiguration::new();
        assert_eq!(cfg.resolved_formats(), BTreeSet::from([AdFormat::Banner]));
        assert!(!cfg.presents_as_interstitial());
    }

    #[test]
    fn interstitial_kinds_default_to_multiformat() {
        for cfg in [
            AdConfiguration::interstitial(),
            AdConfiguration::mediation_interstitial(),
        ] {
            assert!(cfg.presents_as_interstitial());
            assert_eq!(
                cfg.resolved_formats(),
                BTreeSet::from([AdFormat::Banner, AdFormat::Video])
            );
        }
    }

    #[test]
    fn explicit_formats_win_over_legacy_format() {
        let mut cfg = AdConfiguration::new().with_formats([AdFormat::Video]);
        cfg.ad_format = Some(AdFormat::Native);
        assert_eq!(cfg.resolved_formats(), BTreeSet::from([AdFormat::Video]));

        cfg.ad_formats.clear();
        assert_eq!(cfg.resolved_formats(), BTreeSet::from([AdFormat::Native]));
    }

    #[test]
    fn legacy_interstitial_flag_marks_banner_view() {
        let mut cfg = AdConfiguration::new();
        cfg.is_interstitial_ad = true;
        assert!(cfg.presents_as_interstitial());
    }

    #[test]
    fn all_sizes_keeps_order_and_drops_duplicates() {
        let mut cfg = AdConfiguration::new().with_size(320, 50);
        cfg.additional_sizes = vec![AdSize::new(300, 250), AdSize::new(320, 50)];
        assert_eq!(
            cfg.all_sizes(),
            vec![AdSize::new(320, 50), AdSize::new(300, 250)]
        );
        assert!(AdConfiguration::interstitial().all_sizes().is_empty());
    }

    #[test]
    fn all_sizes_skips_sizes_without_area() {
        let mut cfg = AdConfiguration::new().with_size(0, 0);
        cfg.additional_sizes = vec![AdSize::new(300, -1), AdSize::new(728, 90)];
        assert!(AdSize::new(0, 50).is_empty());
        assert!(!AdSize::new(1, 1).is_empty());
        assert_eq!(cfg.all_sizes(), vec![AdSize::new(728, 90)]);
    }

    #[test]
    fn placement_table_matches_openrtb() {
        assert_eq!(VideoPlacement::InStream.ortb_value(), 1);
        assert_eq!(VideoPlacement::InFeed.ortb_value(), 4);
        assert_eq!(VideoPlacement::Interstitial.ortb_value(), 5);
        assert_eq!(VideoPlacement::Slider.ortb_value(), 5);
        assert_eq!(VideoPlacement::Floating.ortb_value(), 5);
        assert_eq!(VideoPlacement::from_ortb_value(0), None);
        assert_eq!(VideoPlacement::from_ortb_value(6), None);
    }

    #[test]
    fn placement_parses_names_and_numbers() {
        assert_eq!(
            VideoPlacement::from_name("In-Stream"),
            Some(VideoPlacement::InStream)
        );
        assert_eq!(
            VideoPlacement::from_name("INTERSTITIAL"),
            Some(VideoPlacement::Interstitial)
        );
        assert_eq!(VideoPlacement::from_name("outstream"), None);

        let p: VideoPlacement = serde_json::from_value(serde_json::json!("in_article")).unwrap();
        assert_eq!(p, VideoPlacement::InArticle);
        let p: VideoPlacement = serde_json::from_value(serde_json::json!(2)).unwrap();
        assert_eq!(p, VideoPlacement::InBanner);
        assert!(serde_json::from_value::<VideoPlacement>(serde_json::json!(9)).is_err());
    }

    #[test]
    fn zero_placement_in_parameters_means_unset() {
        let params: VideoParameters =
            serde_json::from_value(serde_json::json!({ "placement": 0 })).unwrap();
        assert_eq!(params.placement, None);

        let params: VideoParameters =
            serde_json::from_value(serde_json::json!({ "placement": null })).unwrap();
        assert_eq!(params.placement, None);

        let params: VideoParameters = serde_json::from_value(serde_json::json!({})).unwrap();
        assert_eq!(params.placement, None);

        let params: VideoParameters =
            serde_json::from_value(serde_json::json!({ "placement": "slider" })).unwrap();
        assert_eq!(params.placement, Some(VideoPlacement::Slider));

        assert!(serde_json::from_value::<VideoParameters>(serde_json::json!({ "placement": 9 })).is_err());
        assert!(serde_json::from_value::<VideoParameters>(serde_json::json!({ "placement": -1 })).is_err());
    }

    #[test]
    fn api_serializes_as_integer() {
        let v = serde_json::to_value(vec![Api::Mraid2, Api::Omid1]).unwrap();
        assert_eq!(v, serde_json::json!([5, 7]));
    }

    #[test]
    fn validation_rejects_bad_sizes_and_durations() {
        let cfg = AdConfiguration::new().with_size(0, 50);
        assert!(cfg.validate().is_err());

        let mut cfg = AdConfiguration::new().with_formats([AdFormat::Video]);
        cfg.video_parameters.min_duration = Some(30);
        cfg.video_parameters.max_duration = Some(15);
        assert!(cfg.validate().is_err());

        cfg.video_parameters.max_duration = Some(60);
        cfg.video_parameters.linearity = Some(3);
        assert!(cfg.validate().is_err());

        cfg.video_parameters.linearity = Some(2);
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn validation_rejects_min_size_percentage_out_of_range() {
        let mut cfg = AdConfiguration::interstitial();
        cfg.min_size_percentage = Some(SizePercentage { w: 0.2, h: 1.5 });
        assert!(cfg.validate().is_err());
        cfg.min_size_percentage = Some(SizePercentage { w: 0.2, h: 0.2 });
        assert!(cfg.validate().is_ok());
    }
}
