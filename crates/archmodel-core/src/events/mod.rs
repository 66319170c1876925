//! Change notification for the model.
//!
//! Every mutation of a table, column or relationship is reported as a
//! [`ModelEvent`] through the schema's [`EventBus`]. Undo managers and views
//! subscribe with a [`ModelListener`]; multi-step cascades are bracketed by
//! compound-edit signals so they can be grouped into one undoable unit.

mod bus;
mod event;
mod listeners;
mod subscription;

pub use bus::EventBus;
pub use event::{Child, ModelEvent, ObjectRef, Property, PropertyValue};
pub use listeners::{CompoundEditTracker, CountingListener, EventLog, ModelListener};
pub use subscription::{SubscriptionEntry, SubscriptionId, SubscriptionScope};
