//! Batch-edit scopes.
//!
//! A table in secondary-change mode holds back the events sourced from it
//! and suspends the cascades its key changes would trigger, so a caller can
//! build up a multi-step edit (typically a relationship with its mappings)
//! without listeners seeing the steps in between. Leaving the mode delivers
//! the held events in order and, when magic is enabled, brings the table's
//! exported relationships back in line with its key.
//!
//! A table with magic disabled keeps emitting events but suspends the
//! automatic key cascades until it is re-enabled; nothing is replayed then.
//!
//! Prefer the guard forms: they restore the mode on every exit path.

use std::ops::{Deref, DerefMut};

use crate::error::Result;
use crate::model::TableId;

use super::Schema;

/// Holds a table in secondary-change mode until dropped or finished.
///
/// Dereferences to the [`Schema`] so the batch can be performed through it.
pub struct SecondaryChange<'a> {
    schema: &'a mut Schema,
    table: TableId,
    entered: bool,
}

impl SecondaryChange<'_> {
    /// The table held in secondary-change mode.
    pub fn table(&self) -> TableId {
        self.table
    }

    /// Leave secondary-change mode, reporting any failure of the catch-up
    /// cascade. Dropping the guard does the same but can only log failures.
    pub fn finish(mut self) -> Result<()> {
        let entered = std::mem::replace(&mut self.entered, false);
        if entered {
            self.schema.exit_secondary_change(self.table)
        } else {
            Ok(())
        }
    }
}

impl Deref for SecondaryChange<'_> {
    type Target = Schema;

    fn deref(&self) -> &Schema {
        &*self.schema
    }
}

impl DerefMut for SecondaryChange<'_> {
    fn deref_mut(&mut self) -> &mut Schema {
        &mut *self.schema
    }
}

impl Drop for SecondaryChange<'_> {
    fn drop(&mut self) {
        if !self.entered {
            return;
        }
        if let Err(e) = self.schema.exit_secondary_change(self.table) {
            tracing::warn!(table = %self.table, error = %e, "secondary change exit failed");
        }
    }
}

/// Holds a table with magic disabled until dropped, then restores the
/// previous setting.
pub struct MagicDisabled<'a> {
    schema: &'a mut Schema,
    table: TableId,
    previous: bool,
}

impl MagicDisabled<'_> {
    pub fn table(&self) -> TableId {
        self.table
    }
}

impl Deref for MagicDisabled<'_> {
    type Target = Schema;

    fn deref(&self) -> &Schema {
        &*self.schema
    }
}

impl DerefMut for MagicDisabled<'_> {
    fn deref_mut(&mut self) -> &mut Schema {
        &mut *self.schema
    }
}

impl Drop for MagicDisabled<'_> {
    fn drop(&mut self) {
        if let Some(t) = self.schema.tables.get_mut(&self.table) {
            t.set_magic_enabled(self.previous);
        }
    }
}

impl Schema {
    /// Put a table in secondary-change mode for the lifetime of the guard.
    ///
    /// If the table is already in the mode the guard leaves it untouched.
    pub fn secondary_change(&mut self, table: TableId) -> Result<SecondaryChange<'_>> {
        let entered = self.enter_secondary_change(table)?;
        Ok(SecondaryChange {
            schema: self,
            table,
            entered,
        })
    }

    /// Run `f` with a table in secondary-change mode.
    ///
    /// The mode is left whether or not `f` succeeds; an error from `f` takes
    /// precedence over one from leaving the mode.
    pub fn with_secondary_change<T>(
        &mut self,
        table: TableId,
        f: impl FnOnce(&mut Schema) -> Result<T>,
    ) -> Result<T> {
        let entered = self.enter_secondary_change(table)?;
        let result = f(self);
        let exited = if entered {
            self.exit_secondary_change(table)
        } else {
            Ok(())
        };
        let value = result?;
        exited.map(|_| value)
    }

    /// Enter or leave secondary-change mode directly.
    ///
    /// Calls must be paired. Entering twice or leaving when not in the mode
    /// does nothing.
    pub fn set_secondary_change_mode(&mut self, table: TableId, on: bool) -> Result<()> {
        if on {
            self.enter_secondary_change(table).map(|_| ())
        } else if self.table_ref(table)?.is_secondary_change_mode() {
            self.exit_secondary_change(table)
        } else {
            Ok(())
        }
    }

    /// Disable a table's automatic key cascades for the lifetime of the guard.
    pub fn magic_disabled(&mut self, table: TableId) -> Result<MagicDisabled<'_>> {
        let t = self.table_mut(table)?;
        let previous = t.is_magic_enabled();
        t.set_magic_enabled(false);
        Ok(MagicDisabled {
            schema: self,
            table,
            previous,
        })
    }

    /// Run `f` with a table's automatic key cascades disabled.
    pub fn with_magic_disabled<T>(
        &mut self,
        table: TableId,
        f: impl FnOnce(&mut Schema) -> Result<T>,
    ) -> Result<T> {
        let mut guard = self.magic_disabled(table)?;
        f(&mut *guard)
    }

    /// Enable or disable a table's automatic key cascades.
    ///
    /// Re-enabling does not replay anything that happened while disabled.
    pub fn set_magic_enabled(&mut self, table: TableId, enabled: bool) -> Result<()> {
        self.table_mut(table)?.set_magic_enabled(enabled);
        tracing::debug!(%table, enabled, "magic toggled");
        Ok(())
    }

    /// Returns whether the mode was entered by this call.
    pub(crate) fn enter_secondary_change(&mut self, table: TableId) -> Result<bool> {
        let t = self.table_mut(table)?;
        if t.is_secondary_change_mode() {
            return Ok(false);
        }
        t.set_secondary_change_mode(true);
        tracing::debug!(%table, "secondary change mode entered");
        Ok(true)
    }

    pub(crate) fn exit_secondary_change(&mut self, table: TableId) -> Result<()> {
        let Some(t) = self.tables.get_mut(&table) else {
            self.deferred.shift_remove(&table);
            return Ok(());
        };
        t.set_secondary_change_mode(false);
        let magic = t.is_magic_enabled();
        tracing::debug!(%table, "secondary change mode left");

        self.flush_deferred(table);

        if magic && self.needs_reconcile(table)? {
            let description = format!("update keys exported by {}", self.table_ref(table)?.name());
            self.compound_edit(description, |s| s.reconcile_exported(table))?;
        }
        Ok(())
    }
}
