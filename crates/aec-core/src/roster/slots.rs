use uuid::Uuid;

use super::Roster;
use crate::actor::Actor;
use crate::audit::{AuditAction, EntityType};
use crate::error::{CoreError, Result};
use crate::schedule::{RecurringSlot, SlotDraft};
use crate::storage::RecordStore;

impl<S: RecordStore> Roster<S> {
    /// Validate and store a new slot under a fresh id.
    pub fn create_slot(&self, actor: &Actor, draft: SlotDraft) -> Result<RecurringSlot> {
        draft.validate()?;
        let slot = RecurringSlot::from_draft(Uuid::new_v4().to_string(), draft);
        self.store.insert_slot(&slot)?;
        tracing::debug!(slot_id = %slot.id, actor = %actor.id, "slot created");

        self.audit().record(
            actor,
            AuditAction::CreateSlot,
            EntityType::RecurringSlot,
            &slot.id,
            format!("Slot created: {}", slot.label()),
            self.now(),
        )?;
        Ok(slot)
    }

    /// Replace every field of an existing slot.
    ///
    /// Sessions already materialized from it keep their old values.
    pub fn update_slot(&self, actor: &Actor, slot_id: &str, draft: SlotDraft) -> Result<RecurringSlot> {
        draft.validate()?;
        let slot = RecurringSlot::from_draft(slot_id, draft);
        if !self.store.update_slot(&slot)? {
            return Err(CoreError::not_found("slot", slot_id));
        }
        tracing::debug!(slot_id, actor = %actor.id, "slot updated");

        self.audit().record(
            actor,
            AuditAction::EditSlot,
            EntityType::RecurringSlot,
            slot_id,
            format!("Slot edited: {}", slot.label()),
            self.now(),
        )?;
        Ok(slot)
    }

    /// Remove a slot. Its sessions stay and keep pointing at the old id.
    pub fn delete_slot(&self, actor: &Actor, slot_id: &str) -> Result<RecurringSlot> {
        let slot = self
            .store
            .slot(slot_id)?
            .ok_or_else(|| CoreError::not_found("slot", slot_id))?;
        if !self.store.delete_slot(slot_id)? {
            return Err(CoreError::not_found("slot", slot_id));
        }
        tracing::debug!(slot_id, actor = %actor.id, "slot deleted");

        self.audit().record(
            actor,
            AuditAction::DeleteSlot,
            EntityType::RecurringSlot,
            slot_id,
            format!("Slot deleted: {}", slot.label()),
            self.now(),
        )?;
        Ok(slot)
    }

    pub fn list_slots(&self) -> Result<Vec<RecurringSlot>> {
        Ok(self.store.slots()?)
    }

    pub fn slot(&self, slot_id: &str) -> Result<Option<RecurringSlot>> {
        Ok(self.store.slot(slot_id)?)
    }
}
