//! Owner lifecycle and the translation cascade.
//!
//! Deleting an owner removes its translation records. A non-forced delete of a
//! soft-deletable owner tombstones them instead when translation soft deletes
//! are enabled, so `restore` can bring them back.

use crate::entity::{Entity, OwnerRef, Translatable};
use crate::error::Result;
use crate::overlay::{TranslationLedger, Translator};
use tracing::{debug, info};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LifecycleEvent {
    Created(OwnerRef),
    Updated(OwnerRef),
    Deleting { owner: OwnerRef, force: bool },
    Restoring(OwnerRef),
}

impl LifecycleEvent {
    pub fn owner(&self) -> &OwnerRef {
        match self {
            Self::Created(owner) | Self::Updated(owner) | Self::Restoring(owner) => owner,
            Self::Deleting { owner, .. } => owner,
        }
    }
}

/// Hook fired on owner create/update/delete/restore.
///
/// Observers run before the cascade; an error aborts the operation.
pub trait LifecycleObserver: Send + Sync {
    fn on_event(&self, event: &LifecycleEvent) -> Result<()>;
}

impl Translator {
    /// Register an observer for owner lifecycle events.
    pub fn observe(&mut self, observer: Box<dyn LifecycleObserver>) {
        self.observers.push(observer);
    }

    pub(crate) fn dispatch(&self, event: &LifecycleEvent) -> Result<()> {
        debug!(
            "Dispatching {:?} for {} to {} observers",
            event,
            event.owner(),
            self.observers.len()
        );
        for observer in &self.observers {
            observer.on_event(event)?;
        }
        Ok(())
    }

    /// Cascade an owner delete to its translation records. Returns the number
    /// of records removed or tombstoned.
    pub fn on_deleting<T: Translatable + ?Sized>(&self, owner: &mut T, force: bool) -> Result<usize> {
        let owner_ref = owner.owner();
        self.dispatch(&LifecycleEvent::Deleting {
            owner: owner_ref.clone(),
            force,
        })?;

        let count = if self.soft_deletes() && owner.soft_deletable() && !force {
            let count = self.database().soft_delete_translations(&owner_ref)?;
            info!("Soft-deleted {} translations of {}", count, owner_ref);
            count
        } else {
            let count = self.database().delete_translations(&owner_ref)?;
            info!("Deleted {} translations of {}", count, owner_ref);
            count
        };
        self.metrics().record_deleted(count);

        if let Some(ledger) = owner.translations_mut() {
            ledger.clear();
        }
        Ok(count)
    }

    /// Bring back the records tombstoned by a soft delete. A no-op unless
    /// translation soft deletes are enabled and the owner is soft-deletable.
    pub fn on_restoring<T: Translatable + ?Sized>(&self, owner: &mut T) -> Result<usize> {
        self.dispatch(&LifecycleEvent::Restoring(owner.owner()))?;
        self.restore_cascade(owner)
    }

    fn restore_cascade<T: Translatable + ?Sized>(&self, owner: &mut T) -> Result<usize> {
        if !self.soft_deletes() || !owner.soft_deletable() {
            return Ok(0);
        }

        let owner_ref = owner.owner();
        let count = self.database().restore_translations(&owner_ref)?;
        info!("Restored {} translations of {}", count, owner_ref);

        if owner.translations().is_some() {
            let records = self.database().load_translations(&owner_ref)?;
            owner.set_translations(TranslationLedger::new(records));
        }
        Ok(count)
    }

    /// Delete an owner. Soft-deletable owners are tombstoned, everything else
    /// is removed.
    pub fn delete(&self, entity: &mut Entity) -> Result<()> {
        if !entity.soft_deletable() {
            return self.force_delete(entity);
        }

        self.on_deleting(entity, false)?;
        self.database().soft_delete_entity(entity)
    }

    /// Remove an owner row and hard-delete its translation records.
    pub fn force_delete(&self, entity: &mut Entity) -> Result<()> {
        self.on_deleting(entity, true)?;
        self.database().force_delete_entity(entity)
    }

    /// Restore a soft-deleted owner. Returns `false` when it was not trashed.
    ///
    /// Observers see `Restoring` before the row or its records change.
    pub fn restore(&self, entity: &mut Entity) -> Result<bool> {
        if !entity.soft_deletable() || !entity.is_trashed() {
            return Ok(false);
        }

        self.dispatch(&LifecycleEvent::Restoring(entity.owner()))?;
        self.database().restore_entity(entity)?;
        self.restore_cascade(entity)?;
        Ok(true)
    }
}
