//! Core modules for the kiosk

pub mod timer;
pub mod flow;
pub mod resolver;
pub mod registry;
pub mod kiosk;
pub mod boundary;
pub mod client;
pub mod source;
pub mod sampler;
pub mod api;

pub use timer::{FlowTimer, TimerKind, TimerToken};
pub use flow::{FlowEngine, FlowTimings};
pub use resolver::{IdentityResolver, RuleTable, VipRule, default_rules};
pub use registry::{RegistryLimits, SessionRegistry};
pub use kiosk::{Kiosk, KioskOutput};
pub use boundary::{FrameSource, IdentityClassifier, LogSink, NoOverlay, Overlay, PhotoSink};
pub use client::RecognitionClient;
pub use source::DirectoryFrameSource;
pub use sampler::{Collaborators, KioskCommand, KioskHandle, SamplingLoop};
pub use api::{create_router, run_server};
