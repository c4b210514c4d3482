use hourglass_rs::SafeTimeProvider;
use tracing::info;

use crate::decimal::Money;
use crate::errors::{EngineError, Result};
use crate::events::Event;
use crate::records::{Member, NewMember};
use crate::store::{Reader, Store};
use crate::types::MemberId;

/// member registration and maintenance
pub struct MemberRegistry<'a, S: Store> {
    store: &'a S,
}

impl<'a, S: Store> MemberRegistry<'a, S> {
    pub fn new(store: &'a S) -> Self {
        Self { store }
    }

    /// register a member; (national id, stage) must be unused
    pub fn register(&self, member: NewMember, time_provider: &SafeTimeProvider) -> Result<Member> {
        if member.stage < 1 {
            return Err(EngineError::InvalidStage { stage: member.stage });
        }
        if member.total_obligation.is_negative() {
            return Err(EngineError::InvalidObligation {
                amount: member.total_obligation,
            });
        }

        self.store.transaction(|tx| {
            let row = tx.insert_member(member, time_provider.now())?;
            tx.record(Event::MemberRegistered {
                member_id: row.id,
                national_id: row.national_id.clone(),
                stage: row.stage,
                timestamp: row.registered_at,
            });
            info!(member_id = %row.id, national_id = %row.national_id, stage = row.stage, "member registered");
            Ok(row)
        })
    }

    /// change the agreed total; existing installments are left as they are
    pub fn update_total_obligation(
        &self,
        member_id: MemberId,
        amount: Money,
        time_provider: &SafeTimeProvider,
    ) -> Result<Member> {
        if amount.is_negative() {
            return Err(EngineError::InvalidObligation { amount });
        }

        self.store.transaction(|tx| {
            let mut member = tx
                .member(member_id)?
                .ok_or(EngineError::MemberNotFound { id: member_id })?;
            let old_amount = member.total_obligation;
            member.total_obligation = amount;
            tx.update_member(&member)?;

            tx.record(Event::ObligationChanged {
                member_id,
                old_amount,
                new_amount: amount,
                timestamp: time_provider.now(),
            });
            info!(%member_id, %old_amount, new_amount = %amount, "total obligation changed");
            Ok(member)
        })
    }

    /// delete a member together with everything hanging off it
    pub fn remove(&self, member_id: MemberId, time_provider: &SafeTimeProvider) -> Result<()> {
        self.store.transaction(|tx| {
            if !tx.delete_member(member_id)? {
                return Err(EngineError::MemberNotFound { id: member_id });
            }
            tx.record(Event::MemberRemoved {
                member_id,
                timestamp: time_provider.now(),
            });
            info!(%member_id, "member removed");
            Ok(())
        })
    }

    pub fn find(&self, member_id: MemberId) -> Result<Member> {
        self.store.read(|r| {
            r.member(member_id)?
                .ok_or(EngineError::MemberNotFound { id: member_id })
        })
    }

    pub fn find_by_key(&self, national_id: &str, stage: u32) -> Result<Member> {
        self.store.read(|r| {
            r.member_by_key(national_id, stage)?
                .ok_or_else(|| EngineError::MemberKeyNotFound {
                    national_id: national_id.to_string(),
                    stage,
                })
        })
    }

    pub fn in_stage(&self, stage: u32) -> Result<Vec<Member>> {
        self.store.read(|r| r.members_in_stage(stage))
    }
}
