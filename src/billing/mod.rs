pub mod entitlements;
pub mod event;
pub mod reconcile;

pub use entitlements::Purchase;
pub use event::{EventKind, LineItem, NormalizedEvent, PaymentEvent};
pub use reconcile::{ReconcileReport, Reconciler, StepFailure};
