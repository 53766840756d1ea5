//! Proximity watcher for the Minyan proximity core.
//!
//! This crate turns location samples into at-most-once notifications about
//! nearby events. It owns the decision logic only; the event service, the
//! location subsystem and the notification transport are injected as
//! trait objects.
//!
//! # Modules
//!
//! - [`config`] -- YAML configuration (`minyan-config.yaml`)
//! - [`services`] -- Collaborator traits and the [`WatcherServices`] bundle
//! - [`window`] -- The "today, not yet started" query window
//! - [`format`] -- Notification text
//! - [`check`] -- One proximity check and its [`CheckReport`]
//! - [`watcher`] -- The [`ProximityWatcher`] state machine

pub mod check;
pub mod config;
pub mod format;
pub mod services;
pub mod watcher;
pub mod window;

pub use check::{CheckReport, QueryOutcome, check_nearby_events, check_nearby_events_in};
pub use config::{
    ApiConfig, ConfigError, LedgerConfig, LoggingConfig, ReplayConfig, StorageBackend,
    StorageConfig, WatcherConfig,
};
pub use format::{format_distance, format_start_time, proximity_notification};
pub use services::{
    CurrentLocationProvider, EventQueryService, LocalNotification, LocationProvider,
    LocationSubscription, NotificationDispatcher, ServiceError, SubscriptionHandle,
    WatcherServices,
};
pub use watcher::ProximityWatcher;
pub use window::{QueryWindow, today_window};
