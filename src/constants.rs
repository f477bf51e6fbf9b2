//! # Constants
//!
//! Default values and well-known names used throughout the controller.

/// Default re-queue while an operation classifies running (seconds)
pub const DEFAULT_REQUEUE_IN_FLIGHT_SECS: u64 = 10;

/// Default steady-state poll interval (seconds)
pub const DEFAULT_REQUEUE_STEADY_SECS: u64 = 30;

/// Default re-queue when a referenced resource has no external id yet (seconds)
pub const DEFAULT_REQUEUE_PENDING_REFERENCE_SECS: u64 = 10;

/// First step of the per-resource error back-off (seconds)
pub const DEFAULT_ERROR_BACKOFF_BASE_SECS: u64 = 5;

/// Cap of the per-resource error back-off (seconds)
pub const DEFAULT_ERROR_BACKOFF_MAX_SECS: u64 = 300;

/// Deadline for synchronous job polling during delete (seconds)
pub const DEFAULT_JOB_POLL_DEADLINE_SECS: u64 = 120;

/// Job polling back-off: initial delay, factor 2, cap
pub const JOB_POLL_INITIAL_SECS: u64 = 1;
pub const JOB_POLL_MAX_SECS: u64 = 30;

/// Concurrent reconciles per managed kind
pub const DEFAULT_WORKER_CONCURRENCY: u16 = 10;

/// Default metrics and probe server port
pub const DEFAULT_METRICS_PORT: u16 = 5000;

/// Server startup timeout (seconds)
pub const DEFAULT_SERVER_STARTUP_TIMEOUT_SECS: u64 = 10;

/// Server readiness poll interval (milliseconds)
pub const DEFAULT_SERVER_POLL_INTERVAL_MS: u64 = 50;

/// Default tracing filter
pub const DEFAULT_LOG_FILTER: &str = "cf_provider_controller=info";

/// Field manager used for every write
pub const FIELD_MANAGER: &str = "cf-provider-controller";

/// Annotation carrying the authoritative CF GUID
pub const EXTERNAL_NAME_ANNOTATION: &str = "crossplane.io/external-name";

/// Finalizer held while the `Delete` management policy is granted
pub const FINALIZER: &str = "finalizer.managedresource.crossplane.io";

/// Annotation written by `cfctl reconcile` to force a tick
pub const RECONCILE_REQUESTED_ANNOTATION: &str = "cloudfoundry.crossplane.io/reconcile-requested-at";

/// Provider config used when `providerConfigRef` is omitted
pub const DEFAULT_PROVIDER_CONFIG: &str = "default";

/// Identity provider assumed for members without an explicit origin
pub const DEFAULT_ORIGIN: &str = "uaa";

/// Tokens are refreshed this many seconds before they expire
pub const TOKEN_EXPIRY_MARGIN_SECS: u64 = 30;

/// Timeout of a single CF or deploy-service HTTP request (seconds)
pub const PROVIDER_REQUEST_TIMEOUT_SECS: u64 = 60;
