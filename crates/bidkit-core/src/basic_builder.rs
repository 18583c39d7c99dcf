use std::sync::Arc;

use crate::ad_config::{api_values, AdConfiguration, AdFormat};
use crate::builder::{BuildError, MissingProperty, ParameterBuilder};
use crate::config::SdkConfiguration;
use crate::openrtb::{Banner, BidRequest, Format, Imp, Native, Video};
use crate::targeting::{self, normalize_coppa, SharedTargeting};

/// Value of `imp.displaymanager` for every impression this SDK produces.
pub const DISPLAY_MANAGER: &str = "prebid-mobile";

pub const SUPPORTED_VIDEO_MIME_TYPES: &[&str] = &[
    "video/mp4",
    "video/quicktime",
    "video/x-m4v",
    "video/3gpp",
    "video/3gpp2",
];

// VAST 2.0 and VAST 2.0 wrapper
pub const VIDEO_PROTOCOLS: &[i64] = &[2, 5];
// Video finishes on completion or user exit
pub const VIDEO_PLAYBACK_END: i64 = 2;
// Download delivery
pub const VIDEO_DELIVERY: &[i64] = &[3];
// Full screen ad position
pub const VIDEO_POSITION: i64 = 7;
pub const VIDEO_DEFAULT_LINEARITY: i64 = 1;
pub const NATIVE_VERSION: &str = "1.2";

pub fn supported_video_mime_types() -> Vec<String> {
    SUPPORTED_VIDEO_MIME_TYPES
        .iter()
        .map(|m| m.to_string())
        .collect()
}

/// Fills impression metadata, the banner/video/native objects and the
/// regulatory block from the placement and SDK settings.
pub struct BasicParameterBuilder {
    ad_configuration: Option<Arc<AdConfiguration>>,
    sdk_configuration: Option<Arc<SdkConfiguration>>,
    sdk_version: Option<String>,
    targeting: SharedTargeting,
}

impl BasicParameterBuilder {
    pub fn new(
        ad_configuration: Option<Arc<AdConfiguration>>,
        sdk_configuration: Option<Arc<SdkConfiguration>>,
        sdk_version: Option<String>,
        targeting: SharedTargeting,
    ) -> Self {
        BasicParameterBuilder {
            ad_configuration,
            sdk_configuration,
            sdk_version,
            targeting,
        }
    }

    pub fn set_ad_configuration(&mut self, ad_configuration: Option<Arc<AdConfiguration>>) {
        self.ad_configuration = ad_configuration;
    }

    pub fn set_sdk_configuration(&mut self, sdk_configuration: Option<Arc<SdkConfiguration>>) {
        self.sdk_configuration = sdk_configuration;
    }

    pub fn set_sdk_version(&mut self, sdk_version: Option<String>) {
        self.sdk_version = sdk_version;
    }

    fn missing_properties(&self) -> Vec<MissingProperty> {
        let mut missing = Vec::new();
        if self.ad_configuration.is_none() {
            missing.push(MissingProperty::AdConfiguration);
        }
        if self.sdk_configuration.is_none() {
            missing.push(MissingProperty::SdkConfiguration);
        }
        if self.sdk_version.as_deref().map_or(true, str::is_empty) {
            missing.push(MissingProperty::SdkVersion);
        }
        missing
    }

    fn banner(ad_config: &AdConfiguration) -> Banner {
        Banner {
            format: ad_config
                .all_sizes()
                .into_iter()
                .map(|s| Format { w: s.w, h: s.h })
                .collect(),
            api: ad_config
                .banner_parameters
                .api
                .as_deref()
                .map(api_values),
        }
    }

    fn video(ad_config: &AdConfiguration) -> Video {
        let params = &ad_config.video_parameters;
        let interstitial = ad_config.presents_as_interstitial();

        // Full screen video has no in-page placement to report.
        let placement = if interstitial {
            None
        } else {
            params.placement.map(|p| p.ortb_value())
        };
        let size = if interstitial {
            None
        } else {
            ad_config.size.filter(|s| !s.is_empty())
        };

        Video {
            mimes: Some(supported_video_mime_types()),
            minduration: params.min_duration,
            maxduration: params.max_duration,
            protocols: Some(VIDEO_PROTOCOLS.to_vec()),
            w: size.map(|s| s.w),
            h: size.map(|s| s.h),
            startdelay: params.start_delay,
            placement,
            linearity: Some(params.linearity.unwrap_or(VIDEO_DEFAULT_LINEARITY)),
            playbackmethod: params
                .playback_methods
                .as_ref()
                .map(|methods| methods.iter().map(|m| *m as i64).collect()),
            playbackend: Some(VIDEO_PLAYBACK_END),
            delivery: Some(VIDEO_DELIVERY.to_vec()),
            pos: Some(VIDEO_POSITION),
            api: params.api.as_deref().map(api_values),
        }
    }
}

impl ParameterBuilder for BasicParameterBuilder {
    fn name(&self) -> &'static str {
        "basic"
    }

    fn build(&self, request: &mut BidRequest) -> Result<(), BuildError> {
        let (Some(ad_config), Some(sdk_config), Some(sdk_version)) = (
            self.ad_configuration.as_deref(),
            self.sdk_configuration.as_deref(),
            self.sdk_version.as_deref().filter(|v| !v.is_empty()),
        ) else {
            let err = BuildError::InvalidProperties {
                missing: self.missing_properties(),
            };
            log::error!("{}", err);
            return Err(err);
        };

        let formats = ad_config.resolved_formats();
        let mut imp = Imp {
            displaymanager: Some(DISPLAY_MANAGER.to_string()),
            displaymanagerver: Some(sdk_version.to_string()),
            instl: Some(i64::from(ad_config.presents_as_interstitial())),
            secure: Some(1),
            clickbrowser: Some(sdk_config.click_browser()),
            ..Default::default()
        };

        if formats.contains(&AdFormat::Banner) {
            imp.banner = Some(Self::banner(ad_config));
        }
        if formats.contains(&AdFormat::Video) {
            imp.video = Some(Self::video(ad_config));
        }
        if formats.contains(&AdFormat::Native) {
            imp.native = Some(Native {
                ver: Some(NATIVE_VERSION.to_string()),
                ..Default::default()
            });
        }

        let coppa = normalize_coppa(targeting::read(&self.targeting).coppa());
        if coppa.is_some() {
            request.regs.coppa = coppa;
        }

        log::debug!(
            "basic builder: imp id={}, formats={:?}, instl={:?}, coppa={:?}",
            imp.id,
            formats,
            imp.instl,
            coppa
        );
        request.push_imp(imp);
        Ok(())
    }
}
