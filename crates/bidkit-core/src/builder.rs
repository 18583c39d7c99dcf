//! Composable contributors to a bid request.
//!
//! Each [`ParameterBuilder`] fills one slice of a [`BidRequest`]. Builders
//! never fail the caller: a builder that cannot run logs a diagnostic and
//! leaves the request as it found it. [`BuilderChain`] runs several of them
//! in order and keeps going past failures.

use std::fmt;

use crate::openrtb::BidRequest;

/// Inputs a builder refuses to run without.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MissingProperty {
    AdConfiguration,
    SdkConfiguration,
    SdkVersion,
}

impl fmt::Display for MissingProperty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            MissingProperty::AdConfiguration => "ad configuration",
            MissingProperty::SdkConfiguration => "sdk configuration",
            MissingProperty::SdkVersion => "sdk version",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiagnosticKind {
    InvalidProperties,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BuildError {
    #[error("Invalid properties: missing {}", join(.missing))]
    InvalidProperties { missing: Vec<MissingProperty> },
}

fn join(missing: &[MissingProperty]) -> String {
    missing
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

impl BuildError {
    pub fn kind(&self) -> DiagnosticKind {
        match self {
            BuildError::InvalidProperties { .. } => DiagnosticKind::InvalidProperties,
        }
    }
}

pub trait ParameterBuilder {
    /// Short name used in diagnostics.
    fn name(&self) -> &'static str;

    /// Populates `request`. On `Err` the request is unchanged.
    fn build(&self, request: &mut BidRequest) -> Result<(), BuildError>;
}

pub type DynParameterBuilder = Box<dyn ParameterBuilder + Send + Sync>;

#[derive(Debug, Default)]
pub struct ChainReport {
    pub failures: Vec<(&'static str, BuildError)>,
}

impl ChainReport {
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Runs builders in insertion order against one request.
#[derive(Default)]
pub struct BuilderChain {
    builders: Vec<DynParameterBuilder>,
}

impl BuilderChain {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push<B>(&mut self, builder: B) -> &mut Self
    where
        B: ParameterBuilder + Send + Sync + 'static,
    {
        self.builders.push(Box::new(builder));
        self
    }

    pub fn with<B>(mut self, builder: B) -> Self
    where
        B: ParameterBuilder + Send + Sync + 'static,
    {
        self.push(builder);
        self
    }

    pub fn len(&self) -> usize {
        self.builders.len()
    }

    pub fn is_empty(&self) -> bool {
        self.builders.is_empty()
    }

    pub fn run(&self, request: &mut BidRequest) -> ChainReport {
        let mut report = ChainReport::default();
        for builder in &self.builders {
            if let Err(e) = builder.build(request) {
                // the builder itself reports the failure
                log::debug!("builder '{}' skipped: {}", builder.name(), e);
                report.failures.push((builder.name(), e));
            }
        }
        log::debug!(
            "builder chain finished: {} builder(s), {} failure(s), {} imp(s)",
            self.builders.len(),
            report.failures.len(),
            request.imp.len()
        );
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::basic_builder::BasicParameterBuilder;
    use crate::openrtb::Imp;
    use crate::targeting::Targeting;
    use std::cell::RefCell;
    use std::sync::Once;

    thread_local! {
        static RECORDS: RefCell<Vec<(log::Level, String)>> = const { RefCell::new(Vec::new()) };
    }

    struct CaptureLogger;

    impl log::Log for CaptureLogger {
        fn enabled(&self, _metadata: &log::Metadata) -> bool {
            true
        }

        fn log(&self, record: &log::Record) {
            RECORDS.with(|r| {
                r.borrow_mut()
                    .push((record.level(), record.args().to_string()))
            });
        }

        fn flush(&self) {}
    }

    static LOGGER: CaptureLogger = CaptureLogger;

    // Records are per thread, so parallel tests do not see each other.
    fn capture_logs() {
        static INIT: Once = Once::new();
        INIT.call_once(|| {
            let _ = log::set_logger(&LOGGER);
            log::set_max_level(log::LevelFilter::Trace);
        });
        RECORDS.with(|r| r.borrow_mut().clear());
    }

    struct TagBuilder(&'static str);

    impl ParameterBuilder for TagBuilder {
        fn name(&self) -> &'static str {
            "tag"
        }

        fn build(&self, request: &mut BidRequest) -> Result<(), BuildError> {
            request.push_imp(Imp {
                tagid: Some(self.0.to_string()),
                ..Default::default()
            });
            Ok(())
        }
    }

    struct FailingBuilder;

    impl ParameterBuilder for FailingBuilder {
        fn name(&self) -> &'static str {
            "failing"
        }

        fn build(&self, _request: &mut BidRequest) -> Result<(), BuildError> {
            Err(BuildError::InvalidProperties {
                missing: vec![MissingProperty::SdkVersion],
            })
        }
    }

    #[test]
    fn error_message_keeps_invalid_properties_phrase() {
        let err = BuildError::InvalidProperties {
            missing: vec![
                MissingProperty::AdConfiguration,
                MissingProperty::SdkVersion,
            ],
        };
        assert_eq!(err.kind(), DiagnosticKind::InvalidProperties);
        assert_eq!(
            err.to_string(),
            "Invalid properties: missing ad configuration, sdk version"
        );
    }

    #[test]
    fn chain_runs_in_order_and_continues_past_failures() {
        let chain = BuilderChain::new()
            .with(TagBuilder("first"))
            .with(FailingBuilder)
            .with(TagBuilder("second"));
        assert_eq!(chain.len(), 3);

        let mut req = BidRequest::new();
        let report = chain.run(&mut req);

        let tags: Vec<_> = req.imp.iter().filter_map(|i| i.tagid.as_deref()).collect();
        assert_eq!(tags, ["first", "second"]);
        assert!(!report.is_clean());
        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].0, "failing");
        assert_eq!(report.failures[0].1.kind(), DiagnosticKind::InvalidProperties);
    }

    #[test]
    fn empty_chain_leaves_request_alone() {
        let chain = BuilderChain::new();
        assert!(chain.is_empty());
        let mut req = BidRequest::new();
        let before = req.clone();
        assert!(chain.run(&mut req).is_clean());
        assert_eq!(req, before);
    }

    #[test]
    fn failed_build_is_reported_once_above_debug() {
        capture_logs();
        let chain = BuilderChain::new().with(BasicParameterBuilder::new(
            None,
            None,
            None,
            Targeting::shared(),
        ));
        let mut req = BidRequest::new();
        let report = chain.run(&mut req);
        assert_eq!(report.failures.len(), 1);

        let loud: Vec<_> = RECORDS.with(|r| {
            r.borrow()
                .iter()
                .filter(|(level, _)| *level <= log::Level::Warn)
                .cloned()
                .collect()
        });
        assert_eq!(loud.len(), 1, "records: {:?}", loud);
        assert_eq!(loud[0].0, log::Level::Error);
        assert!(loud[0].1.contains("Invalid properties"));
    }
}
